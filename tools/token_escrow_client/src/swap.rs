//! Swap orchestration
//!
//! Each lifecycle phase is one atomic transaction. The orchestrator reads
//! the state it needs, builds every instruction for the phase, submits them
//! together and then re-reads the escrow to confirm the phase took effect.
//! A failed submission leaves the ledger as it was, so nothing here rolls
//! anything back and nothing is retried.
//!
//! Destinations given as an owner resolve to that owner's associated token
//! account, created inside the phase's transaction when missing.

use solana_program::program_pack::Pack;
use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};
use spl_token::state::Account as TokenAccount;
use token_escrow::Escrow;
use tracing::{debug, info, warn};

use crate::{
    associated::Destination,
    codec::{decode_escrow, decode_token_account},
    encoder::{self, load_open_escrow},
    error::{classify_rejection, SwapError},
    ledger::{Ledger, LedgerError},
};

/// Addresses created by a successful Init.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitEscrowReceipt {
    pub escrow: Pubkey,
    pub temp_token_account: Pubkey,
    pub receiving_token_account: Pubkey,
    pub signature: Signature,
}

/// A signed Init transaction that has not been submitted yet.
#[derive(Debug, Clone)]
pub struct PreparedInit {
    pub transaction: Transaction,
    pub escrow: Pubkey,
    pub temp_token_account: Pubkey,
    pub receiving_token_account: Pubkey,
}

/// Drives Init, Exchange and Cancel against one escrow program deployment.
///
/// The program id is fixed for the orchestrator's lifetime; the escrow
/// authority is re-derived from it for every phase.
pub struct SwapOrchestrator<L> {
    ledger: L,
    program_id: Pubkey,
}

impl<L: Ledger> SwapOrchestrator<L> {
    pub fn new(ledger: L, program_id: Pubkey) -> Self {
        Self { ledger, program_id }
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Fails with `ProgramNotDeployed` unless an executable account lives at
    /// the program id.
    pub async fn ensure_program_deployed(&self) -> Result<(), SwapError> {
        match self.ledger.get_account(&self.program_id).await? {
            Some(account) if account.executable => Ok(()),
            _ => Err(SwapError::ProgramNotDeployed(self.program_id)),
        }
    }

    // ============================================================================
    // INIT
    // ============================================================================

    /// Builds and signs the Init transaction without submitting it.
    ///
    /// The transaction creates the receiving account if it is an associated
    /// one, allocates a fresh temp token account for the deposit account's
    /// mint, moves `deposit_amount` into it, allocates a fresh escrow account
    /// and runs `InitEscrow`. The initializer pays the fees.
    pub async fn prepare_init_escrow(
        &self,
        initializer: &Keypair,
        deposit_account: &Pubkey,
        receiving: &Destination,
        deposit_amount: u64,
        expected_amount: u64,
    ) -> Result<PreparedInit, SwapError> {
        let initializer_key = initializer.pubkey();
        let deposit = self.read_token_account(deposit_account).await?;
        let receiving_token_account = receiving.address();

        let temp = Keypair::new();
        let escrow = Keypair::new();
        let token_rent = self
            .ledger
            .minimum_balance_for_rent_exemption(TokenAccount::LEN)
            .await?;
        let escrow_rent = self
            .ledger
            .minimum_balance_for_rent_exemption(Escrow::LEN)
            .await?;
        debug!(
            "Init accounts: temp={} ({} lamports), escrow={} ({} lamports)",
            temp.pubkey(),
            token_rent,
            escrow.pubkey(),
            escrow_rent
        );

        let mut instructions: Vec<Instruction> =
            receiving.create_instruction(&initializer_key).into_iter().collect();
        instructions.extend([
            create_account(
                &initializer_key,
                &temp.pubkey(),
                token_rent,
                TokenAccount::LEN as u64,
                &spl_token::id(),
            ),
            spl_token::instruction::initialize_account3(
                &spl_token::id(),
                &temp.pubkey(),
                &deposit.mint,
                &initializer_key,
            )?,
            spl_token::instruction::transfer(
                &spl_token::id(),
                deposit_account,
                &temp.pubkey(),
                &initializer_key,
                &[],
                deposit_amount,
            )?,
            create_account(
                &initializer_key,
                &escrow.pubkey(),
                escrow_rent,
                Escrow::LEN as u64,
                &self.program_id,
            ),
            encoder::build_init_escrow(
                &self.program_id,
                &initializer_key,
                &temp.pubkey(),
                &receiving_token_account,
                &escrow.pubkey(),
                expected_amount,
            )?,
        ]);

        let blockhash = self.ledger.latest_blockhash().await?;
        let transaction = Transaction::new_signed_with_payer(
            &instructions,
            Some(&initializer_key),
            &[initializer, &temp, &escrow],
            blockhash,
        );

        Ok(PreparedInit {
            transaction,
            escrow: escrow.pubkey(),
            temp_token_account: temp.pubkey(),
            receiving_token_account,
        })
    }

    /// Opens an escrow: locks `deposit_amount` from `deposit_account` and asks
    /// `expected_amount` in return, paid into `receiving`.
    pub async fn init_escrow(
        &self,
        initializer: &Keypair,
        deposit_account: &Pubkey,
        receiving: &Destination,
        deposit_amount: u64,
        expected_amount: u64,
    ) -> Result<InitEscrowReceipt, SwapError> {
        info!(
            "InitEscrow: initializer={}, deposit={}, expected={}",
            initializer.pubkey(),
            deposit_amount,
            expected_amount
        );
        let prepared = self
            .prepare_init_escrow(
                initializer,
                deposit_account,
                receiving,
                deposit_amount,
                expected_amount,
            )
            .await?;

        let signature = self
            .ledger
            .send_and_confirm(&prepared.transaction)
            .await
            .map_err(|err| {
                warn!("InitEscrow rejected: {}", err);
                SwapError::from(err)
            })?;

        let record = match load_open_escrow(&self.ledger, &self.program_id, &prepared.escrow).await
        {
            Ok(record) => record,
            Err(SwapError::EscrowNotFound(_)) => {
                return Err(SwapError::PostconditionFailed(format!(
                    "escrow {} is not initialized after InitEscrow",
                    prepared.escrow
                )))
            }
            Err(err) => return Err(err),
        };
        if record.initializer_pubkey != initializer.pubkey()
            || record.temp_token_account_pubkey != prepared.temp_token_account
            || record.initializer_token_to_receive_account_pubkey
                != prepared.receiving_token_account
            || record.expected_amount != expected_amount
        {
            return Err(SwapError::PostconditionFailed(format!(
                "escrow {} does not hold the requested trade",
                prepared.escrow
            )));
        }

        info!(
            "InitEscrow confirmed: escrow={}, temp_token_account={}, signature={}",
            prepared.escrow, prepared.temp_token_account, signature
        );
        Ok(InitEscrowReceipt {
            escrow: prepared.escrow,
            temp_token_account: prepared.temp_token_account,
            receiving_token_account: prepared.receiving_token_account,
            signature,
        })
    }

    // ============================================================================
    // EXCHANGE
    // ============================================================================

    /// Settles the escrow: the taker pays `expected_amount` from
    /// `taker_pay_account` and receives the deposit in `taker_receive`.
    pub async fn exchange(
        &self,
        taker: &Keypair,
        taker_pay_account: &Pubkey,
        taker_receive: &Destination,
        escrow: &Pubkey,
        expected_amount: u64,
    ) -> Result<Signature, SwapError> {
        info!(
            "Exchange: escrow={}, taker={}, expected={}",
            escrow,
            taker.pubkey(),
            expected_amount
        );
        let built = encoder::build_exchange(
            &self.ledger,
            &self.program_id,
            &taker.pubkey(),
            taker_pay_account,
            &taker_receive.address(),
            escrow,
            expected_amount,
        )
        .await?;
        let mut instructions: Vec<Instruction> =
            taker_receive.create_instruction(&taker.pubkey()).into_iter().collect();
        instructions.push(built.instruction);

        let signature = self
            .submit_settlement(escrow, &instructions, taker)
            .await?;
        self.verify_closed(escrow).await?;

        info!("Exchange confirmed: escrow={}, signature={}", escrow, signature);
        Ok(signature)
    }

    // ============================================================================
    // CANCEL
    // ============================================================================

    /// Cancels the escrow and returns the whole deposit to the initializer.
    ///
    /// The same transaction moves the temp account's balance to
    /// `refund_token_account`, or to the initializer's associated token
    /// account for the deposit mint when none is given, and closes the temp
    /// account.
    pub async fn cancel(
        &self,
        initializer: &Keypair,
        escrow: &Pubkey,
        refund_token_account: Option<Pubkey>,
    ) -> Result<Signature, SwapError> {
        let initializer_key = initializer.pubkey();
        info!("Cancel: escrow={}, initializer={}", escrow, initializer_key);

        let built =
            encoder::build_cancel(&self.ledger, &self.program_id, &initializer_key, escrow).await?;
        let temp = built.record.temp_token_account_pubkey;
        let deposit = self.read_token_account(&temp).await?;
        let refund = match refund_token_account {
            Some(account) => Destination::Account(account),
            None => Destination::Associated {
                owner: initializer_key,
                mint: deposit.mint,
            },
        };
        let refund_address = refund.address();
        debug!("Refunding {} from {} to {}", deposit.amount, temp, refund_address);

        let mut instructions: Vec<Instruction> =
            refund.create_instruction(&initializer_key).into_iter().collect();
        instructions.extend([
            built.instruction,
            spl_token::instruction::transfer(
                &spl_token::id(),
                &temp,
                &refund_address,
                &initializer_key,
                &[],
                deposit.amount,
            )?,
            spl_token::instruction::close_account(
                &spl_token::id(),
                &temp,
                &initializer_key,
                &initializer_key,
                &[],
            )?,
        ]);

        let signature = self
            .submit_settlement(escrow, &instructions, initializer)
            .await?;
        self.verify_closed(escrow).await?;

        info!("Cancel confirmed: escrow={}, signature={}", escrow, signature);
        Ok(signature)
    }

    // ============================================================================
    // READS
    // ============================================================================

    /// Decodes whatever record sits at `escrow`, open or closed. `None` when
    /// the account no longer exists.
    pub async fn escrow_state(&self, escrow: &Pubkey) -> Result<Option<Escrow>, SwapError> {
        match self.ledger.get_account(escrow).await? {
            Some(account) => Ok(Some(decode_escrow(&account.data)?)),
            None => Ok(None),
        }
    }

    pub async fn token_balance(&self, token_account: &Pubkey) -> Result<u64, SwapError> {
        Ok(self.read_token_account(token_account).await?.amount)
    }

    async fn read_token_account(&self, address: &Pubkey) -> Result<TokenAccount, SwapError> {
        let account = self
            .ledger
            .get_account(address)
            .await?
            .ok_or(SwapError::InvalidTokenAccount(*address))?;
        if account.owner != spl_token::id() {
            return Err(SwapError::InvalidTokenAccount(*address));
        }
        decode_token_account(address, &account.data)
    }

    // ============================================================================
    // SUBMISSION
    // ============================================================================

    /// Submits an Exchange or Cancel transaction. A rejection after which the
    /// escrow is no longer open means another transaction settled it first.
    async fn submit_settlement(
        &self,
        escrow: &Pubkey,
        instructions: &[Instruction],
        payer: &Keypair,
    ) -> Result<Signature, SwapError> {
        let blockhash = self.ledger.latest_blockhash().await?;
        let transaction = Transaction::new_signed_with_payer(
            instructions,
            Some(&payer.pubkey()),
            &[payer],
            blockhash,
        );

        match self.ledger.send_and_confirm(&transaction).await {
            Ok(signature) => Ok(signature),
            Err(LedgerError::Rejected(tx_err)) => {
                warn!("Settlement of escrow {} rejected: {}", escrow, tx_err);
                match load_open_escrow(&self.ledger, &self.program_id, escrow).await {
                    Err(SwapError::EscrowNotFound(_)) => {
                        Err(SwapError::EscrowAlreadySettled(*escrow))
                    }
                    _ => Err(classify_rejection(tx_err)),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn verify_closed(&self, escrow: &Pubkey) -> Result<(), SwapError> {
        match load_open_escrow(&self.ledger, &self.program_id, escrow).await {
            Err(SwapError::EscrowNotFound(_)) => Ok(()),
            Ok(_) => Err(SwapError::PostconditionFailed(format!(
                "escrow {escrow} is still open"
            ))),
            Err(err) => Err(err),
        }
    }
}

#[allow(deprecated)]
fn create_account(
    payer: &Pubkey,
    account: &Pubkey,
    lamports: u64,
    space: u64,
    owner: &Pubkey,
) -> Instruction {
    solana_sdk::system_instruction::create_account(payer, account, lamports, space, owner)
}
