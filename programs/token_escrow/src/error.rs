//! Error types

use solana_program::program_error::ProgramError;
use thiserror::Error;

/// First custom code. Keeps escrow codes clear of SPL token codes, which reach
/// clients through the same `InstructionError::Custom` slot when a CPI fails.
pub const ERROR_CODE_OFFSET: u32 = 6000;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum EscrowError {
    #[error("Invalid instruction")]
    InvalidInstruction = 6000,

    #[error("Escrow account is not rent exempt")]
    NotRentExempt,

    #[error("Expected amount mismatch")]
    ExpectedAmountMismatch,

    #[error("Amount overflow")]
    AmountOverflow,

    #[error("Escrow not initialized")]
    EscrowNotInitialized,

    #[error("Initializer mismatch")]
    InitializerMismatch,

    #[error("Account does not match escrow record")]
    AccountMismatch,

    #[error("Invalid escrow authority")]
    InvalidAuthority,
}

impl EscrowError {
    pub const ALL: [EscrowError; 8] = [
        EscrowError::InvalidInstruction,
        EscrowError::NotRentExempt,
        EscrowError::ExpectedAmountMismatch,
        EscrowError::AmountOverflow,
        EscrowError::EscrowNotInitialized,
        EscrowError::InitializerMismatch,
        EscrowError::AccountMismatch,
        EscrowError::InvalidAuthority,
    ];

    /// Maps a `ProgramError::Custom` code back to the escrow error it came from.
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|e| *e as u32 == code)
    }
}

impl From<EscrowError> for ProgramError {
    fn from(e: EscrowError) -> Self {
        ProgramError::Custom(e as u32)
    }
}
