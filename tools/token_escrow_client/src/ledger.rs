//! Ledger access
//!
//! The orchestrator only needs four things from the chain: raw account reads,
//! the rent-exempt minimum for a given size, a recent blockhash and atomic
//! submission with confirmation. `Ledger` names exactly that, so the same
//! orchestration runs against an RPC node or an in-process test bank.

use solana_client::{client_error::ClientError, nonblocking::rpc_client::RpcClient};
use solana_sdk::{
    account::Account, hash::Hash, pubkey::Pubkey, signature::Signature,
    transaction::{Transaction, TransactionError},
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The ledger executed or simulated the transaction and refused it
    #[error("Transaction rejected: {0}")]
    Rejected(TransactionError),

    /// Network, serialization or node failure; nothing is known about state
    #[error("Ledger transport error: {0}")]
    Transport(String),
}

#[allow(async_fn_in_trait)]
pub trait Ledger {
    /// Returns `None` when no account lives at `address`.
    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>, LedgerError>;

    async fn minimum_balance_for_rent_exemption(&self, data_len: usize)
        -> Result<u64, LedgerError>;

    async fn latest_blockhash(&self) -> Result<Hash, LedgerError>;

    /// Submits one signed transaction and waits for confirmation.
    async fn send_and_confirm(&self, transaction: &Transaction)
        -> Result<Signature, LedgerError>;
}

impl Ledger for RpcClient {
    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>, LedgerError> {
        self.get_account_with_commitment(address, self.commitment())
            .await
            .map(|response| response.value)
            .map_err(into_ledger_error)
    }

    async fn minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, LedgerError> {
        self.get_minimum_balance_for_rent_exemption(data_len)
            .await
            .map_err(into_ledger_error)
    }

    async fn latest_blockhash(&self) -> Result<Hash, LedgerError> {
        self.get_latest_blockhash().await.map_err(into_ledger_error)
    }

    async fn send_and_confirm(&self, transaction: &Transaction) -> Result<Signature, LedgerError> {
        self.send_and_confirm_transaction(transaction)
            .await
            .map_err(into_ledger_error)
    }
}

// Preflight failures and on-chain failures both carry a TransactionError
fn into_ledger_error(err: ClientError) -> LedgerError {
    match err.get_transaction_error() {
        Some(tx_err) => LedgerError::Rejected(tx_err),
        None => LedgerError::Transport(err.to_string()),
    }
}
