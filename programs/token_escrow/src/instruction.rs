//! Instruction definitions

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    sysvar,
};

/// Escrow instructions. Borsh encodes the variant index as a leading tag byte
/// followed by the fields, so `InitEscrow` is `[0, amount_le..]`.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub enum EscrowInstruction {
    /// Start the trade by populating a pre-allocated escrow account and
    /// handing the temp token account to the escrow authority
    ///
    /// Accounts expected:
    /// 0. `[signer]` Initializer
    /// 1. `[writable]` Temp token account holding the deposit
    /// 2. `[]` Initializer's token account that receives the taker's payment
    /// 3. `[writable]` Escrow account (allocated, owned by this program)
    /// 4. `[]` Rent sysvar
    /// 5. `[]` Token program
    InitEscrow {
        /// Amount of token B the taker must pay
        amount: u64,
    },

    /// Settle the trade
    ///
    /// Accounts expected:
    /// 0. `[signer]` Taker
    /// 1. `[writable]` Taker's token account paying token B
    /// 2. `[writable]` Taker's token account receiving token A
    /// 3. `[writable]` Temp token account (owned by the escrow authority)
    /// 4. `[writable]` Initializer's main account (receives rent refunds)
    /// 5. `[writable]` Initializer's token account receiving token B
    /// 6. `[writable]` Escrow account
    /// 7. `[]` Token program
    /// 8. `[]` Escrow authority (PDA)
    Exchange {
        /// Expected amount restated by the taker; must match the escrow record
        amount: u64,
    },

    /// Cancel the trade and give the temp token account back to the initializer
    ///
    /// Accounts expected:
    /// 0. `[writable, signer]` Initializer (receives the escrow rent refund)
    /// 1. `[writable]` Temp token account (owned by the escrow authority)
    /// 2. `[writable]` Escrow account
    /// 3. `[]` Token program
    /// 4. `[]` Escrow authority (PDA)
    Cancel,
}

/// Creates an `InitEscrow` instruction.
///
/// No escrow state is read here; the account order is the contract the
/// processor parses against.
pub fn init_escrow(
    program_id: &Pubkey,
    initializer: &Pubkey,
    temp_token_account: &Pubkey,
    receiving_token_account: &Pubkey,
    escrow_account: &Pubkey,
    expected_amount: u64,
) -> Result<Instruction, ProgramError> {
    let data = EscrowInstruction::InitEscrow {
        amount: expected_amount,
    }
    .try_to_vec()
    .map_err(|_| ProgramError::InvalidInstructionData)?;

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*initializer, true),
            AccountMeta::new(*temp_token_account, false),
            AccountMeta::new_readonly(*receiving_token_account, false),
            AccountMeta::new(*escrow_account, false),
            AccountMeta::new_readonly(sysvar::rent::id(), false),
            AccountMeta::new_readonly(spl_token::id(), false),
        ],
        data,
    })
}

/// Creates an `Exchange` instruction.
#[allow(clippy::too_many_arguments)]
pub fn exchange(
    program_id: &Pubkey,
    taker: &Pubkey,
    taker_paying_token_account: &Pubkey,
    taker_receiving_token_account: &Pubkey,
    temp_token_account: &Pubkey,
    initializer: &Pubkey,
    initializer_receiving_token_account: &Pubkey,
    escrow_account: &Pubkey,
    escrow_authority: &Pubkey,
    expected_amount: u64,
) -> Result<Instruction, ProgramError> {
    let data = EscrowInstruction::Exchange {
        amount: expected_amount,
    }
    .try_to_vec()
    .map_err(|_| ProgramError::InvalidInstructionData)?;

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*taker, true),
            AccountMeta::new(*taker_paying_token_account, false),
            AccountMeta::new(*taker_receiving_token_account, false),
            AccountMeta::new(*temp_token_account, false),
            AccountMeta::new(*initializer, false),
            AccountMeta::new(*initializer_receiving_token_account, false),
            AccountMeta::new(*escrow_account, false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(*escrow_authority, false),
        ],
        data,
    })
}

/// Creates a `Cancel` instruction.
pub fn cancel(
    program_id: &Pubkey,
    initializer: &Pubkey,
    temp_token_account: &Pubkey,
    escrow_account: &Pubkey,
    escrow_authority: &Pubkey,
) -> Result<Instruction, ProgramError> {
    let data = EscrowInstruction::Cancel
        .try_to_vec()
        .map_err(|_| ProgramError::InvalidInstructionData)?;

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*initializer, true),
            AccountMeta::new(*temp_token_account, false),
            AccountMeta::new(*escrow_account, false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(*escrow_authority, false),
        ],
        data,
    })
}
