//! Token Escrow Client
//!
//! Off-chain side of the token escrow: reads escrow records, builds the
//! Init / Exchange / Cancel transactions and submits each lifecycle phase as
//! one atomic transaction through a [`Ledger`].

pub mod associated;
pub mod codec;
pub mod config;
pub mod encoder;
pub mod error;
pub mod ledger;
pub mod swap;

pub use associated::Destination;
pub use config::ClientConfig;
pub use error::SwapError;
pub use ledger::{Ledger, LedgerError};
pub use swap::{InitEscrowReceipt, PreparedInit, SwapOrchestrator};
