//! Account data codec
//!
//! Addresses stay typed `Pubkey`s everywhere inside the client. Text only
//! appears at the edge: `parse_address` on the way in and `Pubkey`'s base58
//! `Display` on the way out.

use solana_program::program_pack::Pack;
use solana_sdk::pubkey::Pubkey;
use spl_token::state::Account as TokenAccount;
use std::str::FromStr;
use token_escrow::Escrow;

use crate::error::SwapError;

/// Decodes an escrow record. Any width other than `Escrow::LEN` is corruption.
pub fn decode_escrow(data: &[u8]) -> Result<Escrow, SwapError> {
    if data.len() != Escrow::LEN {
        return Err(SwapError::MalformedAccountData {
            expected: Escrow::LEN,
            actual: data.len(),
        });
    }
    Ok(Escrow::unpack_unchecked(data)?)
}

pub fn encode_escrow(escrow: &Escrow) -> [u8; Escrow::LEN] {
    let mut data = [0u8; Escrow::LEN];
    escrow.pack_into_slice(&mut data);
    data
}

/// Decodes an initialized SPL token account.
pub fn decode_token_account(address: &Pubkey, data: &[u8]) -> Result<TokenAccount, SwapError> {
    TokenAccount::unpack(data).map_err(|_| SwapError::InvalidTokenAccount(*address))
}

/// Parses a base58 address.
pub fn parse_address(value: &str) -> Result<Pubkey, SwapError> {
    Pubkey::from_str(value.trim()).map_err(|_| SwapError::InvalidAddress(value.to_string()))
}
