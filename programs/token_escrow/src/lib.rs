//! Token Escrow Program (Native Solana)
//!
//! This program lets an initializer lock token A behind a program-derived
//! authority and name how much of token B they want in return. A taker settles
//! the trade atomically with `Exchange`, or the initializer reclaims the
//! deposit with `Cancel`.

pub mod authority;
pub mod error;
pub mod instruction;
pub mod processor;
pub mod state;

#[cfg(not(feature = "no-entrypoint"))]
mod entrypoint;

pub use solana_program;

// Re-export for clients and tests
pub use authority::find_escrow_authority;
pub use error::EscrowError;
pub use instruction::EscrowInstruction;
pub use state::Escrow;
