//! Instruction encoding
//!
//! Init needs no chain state. Exchange and Cancel are built from the escrow
//! record as it currently sits on the ledger, so the initializer's addresses
//! always come from the record rather than from the caller.

use solana_sdk::{instruction::Instruction, pubkey::Pubkey};
use token_escrow::{find_escrow_authority, instruction, Escrow};
use tracing::debug;

use crate::{codec::decode_escrow, error::SwapError, ledger::Ledger};

/// An instruction plus the escrow record it was built against.
#[derive(Debug, Clone)]
pub struct BoundInstruction {
    pub instruction: Instruction,
    pub record: Escrow,
}

/// Builds `InitEscrow`. `expected_amount` is what the taker must pay, not the
/// deposit.
pub fn build_init_escrow(
    program_id: &Pubkey,
    initializer: &Pubkey,
    temp_token_account: &Pubkey,
    receiving_token_account: &Pubkey,
    escrow: &Pubkey,
    expected_amount: u64,
) -> Result<Instruction, SwapError> {
    Ok(instruction::init_escrow(
        program_id,
        initializer,
        temp_token_account,
        receiving_token_account,
        escrow,
        expected_amount,
    )?)
}

/// Reads the live escrow record at `escrow`.
///
/// A missing account, an account owned by another program, empty data or a
/// closed record all mean there is no trade to act on.
pub async fn load_open_escrow<L: Ledger>(
    ledger: &L,
    program_id: &Pubkey,
    escrow: &Pubkey,
) -> Result<Escrow, SwapError> {
    let account = ledger
        .get_account(escrow)
        .await?
        .ok_or(SwapError::EscrowNotFound(*escrow))?;
    if account.owner != *program_id || account.data.is_empty() {
        return Err(SwapError::EscrowNotFound(*escrow));
    }
    let record = decode_escrow(&account.data)?;
    if !record.is_initialized {
        return Err(SwapError::EscrowNotFound(*escrow));
    }
    Ok(record)
}

/// Builds `Exchange` against the record currently at `escrow`.
pub async fn build_exchange<L: Ledger>(
    ledger: &L,
    program_id: &Pubkey,
    taker: &Pubkey,
    taker_pay_account: &Pubkey,
    taker_receive_account: &Pubkey,
    escrow: &Pubkey,
    expected_amount: u64,
) -> Result<BoundInstruction, SwapError> {
    let record = load_open_escrow(ledger, program_id, escrow).await?;
    let instruction = exchange_from_record(
        program_id,
        taker,
        taker_pay_account,
        taker_receive_account,
        escrow,
        &record,
        expected_amount,
    )?;
    Ok(BoundInstruction { instruction, record })
}

/// Builds `Cancel` against the record currently at `escrow`. Fails before
/// anything is submitted when `initializer` is not the stored initializer.
pub async fn build_cancel<L: Ledger>(
    ledger: &L,
    program_id: &Pubkey,
    initializer: &Pubkey,
    escrow: &Pubkey,
) -> Result<BoundInstruction, SwapError> {
    let record = load_open_escrow(ledger, program_id, escrow).await?;
    let instruction = cancel_from_record(program_id, initializer, escrow, &record)?;
    Ok(BoundInstruction { instruction, record })
}

pub fn exchange_from_record(
    program_id: &Pubkey,
    taker: &Pubkey,
    taker_pay_account: &Pubkey,
    taker_receive_account: &Pubkey,
    escrow: &Pubkey,
    record: &Escrow,
    expected_amount: u64,
) -> Result<Instruction, SwapError> {
    let (authority, bump) = find_escrow_authority(program_id);
    debug!("Escrow authority: {} (bump {})", authority, bump);

    Ok(instruction::exchange(
        program_id,
        taker,
        taker_pay_account,
        taker_receive_account,
        &record.temp_token_account_pubkey,
        &record.initializer_pubkey,
        &record.initializer_token_to_receive_account_pubkey,
        escrow,
        &authority,
        expected_amount,
    )?)
}

pub fn cancel_from_record(
    program_id: &Pubkey,
    initializer: &Pubkey,
    escrow: &Pubkey,
    record: &Escrow,
) -> Result<Instruction, SwapError> {
    if record.initializer_pubkey != *initializer {
        return Err(SwapError::InitializerMismatch {
            expected: record.initializer_pubkey,
            actual: *initializer,
        });
    }
    let (authority, _) = find_escrow_authority(program_id);

    Ok(instruction::cancel(
        program_id,
        initializer,
        &record.temp_token_account_pubkey,
        escrow,
        &authority,
    )?)
}
