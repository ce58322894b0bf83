//! Associated token accounts
//!
//! Derives a wallet's canonical token account for a mint and builds the
//! idempotent create instruction, so a phase can fund a missing destination
//! inside its own transaction.

use solana_program::system_program;
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};

/// Associated token account program id (mainnet/devnet/localnet)
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Pubkey =
    solana_sdk::pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");

/// `CreateIdempotent` discriminant of the associated token account program
const CREATE_IDEMPOTENT: u8 = 1;

/// Where a party receives tokens during a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// An existing token account.
    Account(Pubkey),
    /// `owner`'s associated token account for `mint`, created in the same
    /// transaction when it does not exist yet.
    Associated { owner: Pubkey, mint: Pubkey },
}

impl Destination {
    /// Token account address the tokens land in.
    pub fn address(&self) -> Pubkey {
        match self {
            Destination::Account(address) => *address,
            Destination::Associated { owner, mint } => get_associated_token_address(owner, mint),
        }
    }

    /// Instruction creating the destination, `None` for an existing account.
    pub fn create_instruction(&self, payer: &Pubkey) -> Option<Instruction> {
        match self {
            Destination::Account(_) => None,
            Destination::Associated { owner, mint } => {
                Some(create_associated_token_account_idempotent(payer, owner, mint))
            }
        }
    }
}

/// Derives the associated token account (ATA) for an owner and mint.
pub fn get_associated_token_address(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[owner.as_ref(), spl_token::id().as_ref(), mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
    .0
}

/// Builds a `CreateIdempotent` instruction. Succeeds without changes when the
/// account already exists for the same owner.
pub fn create_associated_token_account_idempotent(
    payer: &Pubkey,
    owner: &Pubkey,
    mint: &Pubkey,
) -> Instruction {
    let ata = get_associated_token_address(owner, mint);

    Instruction {
        program_id: ASSOCIATED_TOKEN_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(ata, false),
            AccountMeta::new_readonly(*owner, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new_readonly(system_program::id(), false),
            AccountMeta::new_readonly(spl_token::id(), false),
        ],
        data: vec![CREATE_IDEMPOTENT],
    }
}
