//! Instruction processing

use borsh::BorshDeserialize;
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed},
    program_error::ProgramError,
    program_pack::{IsInitialized, Pack},
    pubkey::Pubkey,
    rent::Rent,
    sysvar::Sysvar,
};
use spl_token::{instruction::AuthorityType, state::Account as TokenAccount};

use crate::{
    authority::{find_escrow_authority, ESCROW_AUTHORITY_SEED},
    error::EscrowError,
    instruction::EscrowInstruction,
    state::Escrow,
};

pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = EscrowInstruction::try_from_slice(instruction_data)
            .map_err(|_| EscrowError::InvalidInstruction)?;

        match instruction {
            EscrowInstruction::InitEscrow { amount } => {
                msg!("Instruction: InitEscrow");
                Self::process_init_escrow(program_id, accounts, amount)
            }
            EscrowInstruction::Exchange { amount } => {
                msg!("Instruction: Exchange");
                Self::process_exchange(program_id, accounts, amount)
            }
            EscrowInstruction::Cancel => {
                msg!("Instruction: Cancel");
                Self::process_cancel(program_id, accounts)
            }
        }
    }

    fn process_init_escrow(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        amount: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let initializer = next_account_info(account_info_iter)?;
        let temp_token_account = next_account_info(account_info_iter)?;
        let token_to_receive_account = next_account_info(account_info_iter)?;
        let escrow_account = next_account_info(account_info_iter)?;
        let rent_sysvar = next_account_info(account_info_iter)?;
        let token_program = next_account_info(account_info_iter)?;

        if !initializer.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }
        assert_owned_by(token_to_receive_account, &spl_token::id())?;
        assert_token_program(token_program)?;
        assert_owned_by(escrow_account, program_id)?;

        let rent = Rent::from_account_info(rent_sysvar)?;
        if !rent.is_exempt(escrow_account.lamports(), escrow_account.data_len()) {
            return Err(EscrowError::NotRentExempt.into());
        }

        let escrow = Escrow::unpack_unchecked(&escrow_account.data.borrow())?;
        if escrow.is_initialized() {
            return Err(ProgramError::AccountAlreadyInitialized);
        }

        let escrow = Escrow::new(
            *initializer.key,
            *temp_token_account.key,
            *token_to_receive_account.key,
            amount,
        );
        Escrow::pack(escrow, &mut escrow_account.data.borrow_mut())?;

        // Hand the deposit to the escrow authority
        let (authority, _bump) = find_escrow_authority(program_id);
        invoke(
            &spl_token::instruction::set_authority(
                token_program.key,
                temp_token_account.key,
                Some(&authority),
                AuthorityType::AccountOwner,
                initializer.key,
                &[],
            )?,
            &[
                temp_token_account.clone(),
                initializer.clone(),
                token_program.clone(),
            ],
        )?;

        msg!(
            "Escrow initialized: escrow={}, expected_amount={}",
            escrow_account.key,
            amount
        );
        Ok(())
    }

    fn process_exchange(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        amount: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let taker = next_account_info(account_info_iter)?;
        let taker_sending_token_account = next_account_info(account_info_iter)?;
        let taker_receiving_token_account = next_account_info(account_info_iter)?;
        let temp_token_account = next_account_info(account_info_iter)?;
        let initializer_main_account = next_account_info(account_info_iter)?;
        let initializer_receiving_token_account = next_account_info(account_info_iter)?;
        let escrow_account = next_account_info(account_info_iter)?;
        let token_program = next_account_info(account_info_iter)?;
        let authority_account = next_account_info(account_info_iter)?;

        if !taker.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let escrow = load_open_escrow(program_id, escrow_account)?;
        if escrow.temp_token_account_pubkey != *temp_token_account.key
            || escrow.initializer_pubkey != *initializer_main_account.key
            || escrow.initializer_token_to_receive_account_pubkey
                != *initializer_receiving_token_account.key
        {
            return Err(EscrowError::AccountMismatch.into());
        }
        if amount != escrow.expected_amount {
            msg!(
                "Expected amount mismatch: restated={}, stored={}",
                amount,
                escrow.expected_amount
            );
            return Err(EscrowError::ExpectedAmountMismatch.into());
        }
        assert_token_program(token_program)?;
        let bump = assert_escrow_authority(program_id, authority_account)?;

        let temp_token_info = TokenAccount::unpack(&temp_token_account.data.borrow())?;
        let deposit = temp_token_info.amount;

        // Taker pays the initializer
        invoke(
            &spl_token::instruction::transfer(
                token_program.key,
                taker_sending_token_account.key,
                initializer_receiving_token_account.key,
                taker.key,
                &[],
                escrow.expected_amount,
            )?,
            &[
                taker_sending_token_account.clone(),
                initializer_receiving_token_account.clone(),
                taker.clone(),
                token_program.clone(),
            ],
        )?;

        let authority_seeds: &[&[u8]] = &[ESCROW_AUTHORITY_SEED, program_id.as_ref(), &[bump]];

        // Authority releases the deposit to the taker
        invoke_signed(
            &spl_token::instruction::transfer(
                token_program.key,
                temp_token_account.key,
                taker_receiving_token_account.key,
                authority_account.key,
                &[],
                deposit,
            )?,
            &[
                temp_token_account.clone(),
                taker_receiving_token_account.clone(),
                authority_account.clone(),
                token_program.clone(),
            ],
            &[authority_seeds],
        )?;

        invoke_signed(
            &spl_token::instruction::close_account(
                token_program.key,
                temp_token_account.key,
                initializer_main_account.key,
                authority_account.key,
                &[],
            )?,
            &[
                temp_token_account.clone(),
                initializer_main_account.clone(),
                authority_account.clone(),
                token_program.clone(),
            ],
            &[authority_seeds],
        )?;

        close_escrow_account(escrow_account, initializer_main_account)?;

        msg!(
            "Escrow exchanged: escrow={}, paid={}, released={}",
            escrow_account.key,
            escrow.expected_amount,
            deposit
        );
        Ok(())
    }

    fn process_cancel(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let initializer = next_account_info(account_info_iter)?;
        let temp_token_account = next_account_info(account_info_iter)?;
        let escrow_account = next_account_info(account_info_iter)?;
        let token_program = next_account_info(account_info_iter)?;
        let authority_account = next_account_info(account_info_iter)?;

        if !initializer.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let escrow = load_open_escrow(program_id, escrow_account)?;
        if escrow.initializer_pubkey != *initializer.key {
            return Err(EscrowError::InitializerMismatch.into());
        }
        if escrow.temp_token_account_pubkey != *temp_token_account.key {
            return Err(EscrowError::AccountMismatch.into());
        }
        assert_token_program(token_program)?;
        let bump = assert_escrow_authority(program_id, authority_account)?;

        let authority_seeds: &[&[u8]] = &[ESCROW_AUTHORITY_SEED, program_id.as_ref(), &[bump]];

        // Give the temp account back to the initializer
        invoke_signed(
            &spl_token::instruction::set_authority(
                token_program.key,
                temp_token_account.key,
                Some(initializer.key),
                AuthorityType::AccountOwner,
                authority_account.key,
                &[],
            )?,
            &[
                temp_token_account.clone(),
                authority_account.clone(),
                token_program.clone(),
            ],
            &[authority_seeds],
        )?;

        close_escrow_account(escrow_account, initializer)?;

        msg!("Escrow cancelled: escrow={}", escrow_account.key);
        Ok(())
    }
}

fn assert_owned_by(account: &AccountInfo, owner: &Pubkey) -> ProgramResult {
    if account.owner != owner {
        Err(ProgramError::IncorrectProgramId)
    } else {
        Ok(())
    }
}

fn assert_token_program(token_program: &AccountInfo) -> ProgramResult {
    if *token_program.key != spl_token::id() {
        return Err(ProgramError::IncorrectProgramId);
    }
    Ok(())
}

/// Checks the supplied authority account against the derived one and returns
/// the bump for signing.
fn assert_escrow_authority(
    program_id: &Pubkey,
    authority_account: &AccountInfo,
) -> Result<u8, ProgramError> {
    let (authority, bump) = find_escrow_authority(program_id);
    if authority != *authority_account.key {
        return Err(EscrowError::InvalidAuthority.into());
    }
    Ok(bump)
}

/// Reads the escrow record, failing unless it belongs to this program and is live.
/// A closed escrow is owned by the system program again, so both cases surface
/// the same error.
fn load_open_escrow(
    program_id: &Pubkey,
    escrow_account: &AccountInfo,
) -> Result<Escrow, ProgramError> {
    if escrow_account.owner != program_id || escrow_account.data_is_empty() {
        return Err(EscrowError::EscrowNotInitialized.into());
    }
    let escrow = Escrow::unpack_unchecked(&escrow_account.data.borrow())?;
    if !escrow.is_initialized() {
        return Err(EscrowError::EscrowNotInitialized.into());
    }
    Ok(escrow)
}

/// Drains the escrow account into `destination` and zeroes its data. The
/// runtime reclaims the zero-lamport account once the transaction commits.
fn close_escrow_account(escrow_account: &AccountInfo, destination: &AccountInfo) -> ProgramResult {
    let refunded = destination
        .lamports()
        .checked_add(escrow_account.lamports())
        .ok_or(EscrowError::AmountOverflow)?;

    **destination.lamports.borrow_mut() = refunded;
    **escrow_account.lamports.borrow_mut() = 0;
    escrow_account.data.borrow_mut().fill(0);
    Ok(())
}
