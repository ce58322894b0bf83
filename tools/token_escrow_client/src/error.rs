//! Client error types

use solana_program::program_error::ProgramError;
use solana_sdk::{instruction::InstructionError, pubkey::Pubkey, transaction::TransactionError};
use spl_token::error::TokenError;
use thiserror::Error;
use token_escrow::EscrowError;

use crate::ledger::LedgerError;

/// Everything a swap phase can fail with. Each variant is terminal for the
/// call that produced it; nothing here is retried automatically.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SwapError {
    /// Account data is not exactly one escrow record wide
    #[error("Malformed account data: expected {expected} bytes, got {actual}")]
    MalformedAccountData { expected: usize, actual: usize },

    /// No account, an empty account or a closed record at the escrow address
    #[error("Escrow not found at {0}")]
    EscrowNotFound(Pubkey),

    /// Caller is not the initializer stored in the escrow record
    #[error("Initializer mismatch: escrow belongs to {expected}, caller is {actual}")]
    InitializerMismatch { expected: Pubkey, actual: Pubkey },

    /// Another transaction closed the escrow first
    #[error("Escrow {0} already settled; the trade is no longer available")]
    EscrowAlreadySettled(Pubkey),

    /// Deposit, payment or fee exceeds what the paying account holds
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(TransactionError),

    #[error("Escrow program {0} is not deployed")]
    ProgramNotDeployed(Pubkey),

    #[error("Invalid token account: {0}")]
    InvalidTokenAccount(Pubkey),

    #[error("Postcondition failed: {0}")]
    PostconditionFailed(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// The escrow program rejected the transaction with one of its own codes
    #[error("Escrow program error: {0}")]
    Program(EscrowError),

    #[error("Transaction rejected: {0}")]
    Rejected(TransactionError),

    #[error(transparent)]
    Ledger(LedgerError),

    #[error("Failed to build instruction: {0}")]
    Instruction(#[from] ProgramError),
}

impl From<LedgerError> for SwapError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Rejected(tx_err) => classify_rejection(tx_err),
            other => SwapError::Ledger(other),
        }
    }
}

/// Maps a ledger rejection onto the swap error taxonomy.
///
/// Custom code 1 is `InsufficientFunds` for the token program and
/// `ResultWithNegativeLamports` for the system program; both mean the payer
/// is short.
pub fn classify_rejection(err: TransactionError) -> SwapError {
    match &err {
        TransactionError::InsufficientFundsForFee
        | TransactionError::InsufficientFundsForRent { .. }
        | TransactionError::InstructionError(_, InstructionError::InsufficientFunds) => {
            SwapError::InsufficientFunds(err)
        }
        TransactionError::InstructionError(_, InstructionError::Custom(code)) => {
            if *code == TokenError::InsufficientFunds as u32 {
                SwapError::InsufficientFunds(err)
            } else if let Some(escrow_error) = EscrowError::from_code(*code) {
                SwapError::Program(escrow_error)
            } else {
                SwapError::Rejected(err)
            }
        }
        _ => SwapError::Rejected(err),
    }
}
