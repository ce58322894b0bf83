//! Escrow authority derivation
//!
//! Every escrow created by a deployment shares one program-derived authority.
//! It owns the temp token accounts while trades are open and only the program
//! can sign for it.

use solana_program::pubkey::Pubkey;

/// Seed prefix for the escrow authority PDA
pub const ESCROW_AUTHORITY_SEED: &[u8] = b"escrow";

/// Derives the escrow authority address and bump for `program_id`.
///
/// Seeds are `["escrow", program_id]`. Clients and the processor must both use
/// this function; any other seed yields an address the program rejects.
pub fn find_escrow_authority(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[ESCROW_AUTHORITY_SEED, program_id.as_ref()], program_id)
}
