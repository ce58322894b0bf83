#![allow(dead_code)]
#![allow(deprecated)]

use solana_program::program_pack::Pack;
use solana_program_test::{processor, BanksClientError, ProgramTest, ProgramTestContext};
use solana_sdk::system_instruction;
use solana_sdk::{
    instruction::{Instruction, InstructionError},
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::{Transaction, TransactionError},
};

use token_escrow::{find_escrow_authority, instruction, state::Escrow};

// ============================================================================
// TEST PROGRAM ID
// ============================================================================

/// Fixed program ID for testing. Actual deployed program ID is determined by
/// the deployment keypair, not this value.
pub fn test_program_id() -> Pubkey {
    solana_sdk::pubkey!("Escrow11111111111111111111111111111111111111")
}

// ============================================================================
// TEST HARNESS HELPERS
// ============================================================================

/// Helper: Build a ProgramTest instance with token_escrow + spl_token
pub fn program_test() -> ProgramTest {
    let program_id = test_program_id();
    let mut program_test = ProgramTest::new(
        "token_escrow",
        program_id,
        processor!(token_escrow::processor::Processor::process),
    );
    program_test.add_program(
        "spl_token",
        spl_token::id(),
        processor!(spl_token::processor::Processor::process),
    );
    program_test
}

/// Helper: Send a transaction with a specific payer and signers, returning the result
pub async fn try_send_tx(
    context: &mut ProgramTestContext,
    payer: &Keypair,
    instructions: &[Instruction],
    signers: &[&Keypair],
) -> Result<(), BanksClientError> {
    let blockhash = context.banks_client.get_latest_blockhash().await.unwrap();
    let mut all_signers = Vec::with_capacity(signers.len() + 1);
    all_signers.push(payer);
    for signer in signers {
        if signer.pubkey() != payer.pubkey() {
            all_signers.push(*signer);
        }
    }

    let tx = Transaction::new_signed_with_payer(
        instructions,
        Some(&payer.pubkey()),
        &all_signers,
        blockhash,
    );
    context.banks_client.process_transaction(tx).await
}

/// Helper: Send a transaction that must succeed
pub async fn send_tx(
    context: &mut ProgramTestContext,
    payer: &Keypair,
    instructions: &[Instruction],
    signers: &[&Keypair],
) {
    try_send_tx(context, payer, instructions, signers)
        .await
        .unwrap();
}

/// Helper: Assert a transaction failed with a specific custom program error code
pub fn assert_custom_error(result: Result<(), BanksClientError>, expected: u32) {
    let err = match result {
        Ok(()) => panic!("Expected custom error {expected}, transaction succeeded"),
        Err(BanksClientError::TransactionError(err)) => err,
        Err(BanksClientError::SimulationError { err, .. }) => err,
        Err(other) => panic!("Expected custom error {expected}, got {other:?}"),
    };
    match err {
        TransactionError::InstructionError(_, InstructionError::Custom(code)) => {
            assert_eq!(code, expected, "unexpected custom error code");
        }
        other => panic!("Expected custom error {expected}, got {other:?}"),
    }
}

// ============================================================================
// SPL TOKEN HELPERS
// ============================================================================

/// Helper: Create a new SPL token mint
pub async fn create_mint(
    context: &mut ProgramTestContext,
    payer: &Keypair,
    mint_authority: &Keypair,
    decimals: u8,
) -> Pubkey {
    let mint = Keypair::new();
    let rent = context.banks_client.get_rent().await.unwrap();
    let mint_rent = rent.minimum_balance(spl_token::state::Mint::LEN);

    let create_mint_ix = system_instruction::create_account(
        &payer.pubkey(),
        &mint.pubkey(),
        mint_rent,
        spl_token::state::Mint::LEN as u64,
        &spl_token::id(),
    );
    let init_mint_ix = spl_token::instruction::initialize_mint2(
        &spl_token::id(),
        &mint.pubkey(),
        &mint_authority.pubkey(),
        None,
        decimals,
    )
    .unwrap();

    send_tx(context, payer, &[create_mint_ix, init_mint_ix], &[&mint]).await;
    mint.pubkey()
}

/// Helper: Instructions that allocate and initialize a token account at `token_account`
pub async fn token_account_instructions(
    context: &mut ProgramTestContext,
    payer: &Pubkey,
    token_account: &Pubkey,
    mint: &Pubkey,
    owner: &Pubkey,
) -> Vec<Instruction> {
    let rent = context.banks_client.get_rent().await.unwrap();
    let token_rent = rent.minimum_balance(spl_token::state::Account::LEN);

    vec![
        system_instruction::create_account(
            payer,
            token_account,
            token_rent,
            spl_token::state::Account::LEN as u64,
            &spl_token::id(),
        ),
        spl_token::instruction::initialize_account3(&spl_token::id(), token_account, mint, owner)
            .unwrap(),
    ]
}

/// Helper: Create an SPL token account for a given mint and owner
pub async fn create_token_account(
    context: &mut ProgramTestContext,
    payer: &Keypair,
    mint: Pubkey,
    owner: Pubkey,
) -> Pubkey {
    let token_account = Keypair::new();
    let ixs = token_account_instructions(
        context,
        &payer.pubkey(),
        &token_account.pubkey(),
        &mint,
        &owner,
    )
    .await;

    send_tx(context, payer, &ixs, &[&token_account]).await;
    token_account.pubkey()
}

/// Helper: Mint tokens to a token account
pub async fn mint_to(
    context: &mut ProgramTestContext,
    payer: &Keypair,
    mint: Pubkey,
    mint_authority: &Keypair,
    destination: Pubkey,
    amount: u64,
) {
    let ix = spl_token::instruction::mint_to(
        &spl_token::id(),
        &mint,
        &destination,
        &mint_authority.pubkey(),
        &[],
        amount,
    )
    .unwrap();

    send_tx(context, payer, &[ix], &[mint_authority]).await;
}

/// Helper: Read an SPL token account
pub async fn get_token_account(
    context: &mut ProgramTestContext,
    token_account: Pubkey,
) -> spl_token::state::Account {
    let account = context
        .banks_client
        .get_account(token_account)
        .await
        .unwrap()
        .unwrap();
    spl_token::state::Account::unpack(&account.data).unwrap()
}

/// Helper: Read SPL token account balance
pub async fn get_token_balance(context: &mut ProgramTestContext, token_account: Pubkey) -> u64 {
    get_token_account(context, token_account).await.amount
}

/// Helper: Read lamports of an account (0 when the account does not exist)
pub async fn get_lamports(context: &mut ProgramTestContext, address: Pubkey) -> u64 {
    context
        .banks_client
        .get_account(address)
        .await
        .unwrap()
        .map(|account| account.lamports)
        .unwrap_or(0)
}

/// Helper: Whether an account exists on the ledger
pub async fn account_exists(context: &mut ProgramTestContext, address: Pubkey) -> bool {
    context
        .banks_client
        .get_account(address)
        .await
        .unwrap()
        .is_some()
}

// ============================================================================
// ESCROW HELPERS
// ============================================================================

/// Helper: Read the escrow record at `escrow`
pub async fn read_escrow(context: &mut ProgramTestContext, escrow: Pubkey) -> Escrow {
    let account = context
        .banks_client
        .get_account(escrow)
        .await
        .unwrap()
        .unwrap();
    Escrow::unpack_unchecked(&account.data).unwrap()
}

/// Addresses of an escrow opened by `open_escrow`
pub struct OpenEscrow {
    pub escrow: Pubkey,
    pub temp_token_account: Pubkey,
}

/// Helper: Build the full Init transaction body: create + fund the temp
/// account, allocate the escrow account, then InitEscrow.
pub async fn init_escrow_instructions(
    context: &mut ProgramTestContext,
    env: &TestEnv,
    temp_token_account: &Pubkey,
    escrow_account: &Pubkey,
    deposit_amount: u64,
    expected_amount: u64,
) -> Vec<Instruction> {
    let initializer = env.initializer.pubkey();
    let mut ixs = token_account_instructions(
        context,
        &initializer,
        temp_token_account,
        &env.mint_a,
        &initializer,
    )
    .await;

    ixs.push(
        spl_token::instruction::transfer(
            &spl_token::id(),
            &env.initializer_token_a,
            temp_token_account,
            &initializer,
            &[],
            deposit_amount,
        )
        .unwrap(),
    );

    let rent = context.banks_client.get_rent().await.unwrap();
    ixs.push(system_instruction::create_account(
        &initializer,
        escrow_account,
        rent.minimum_balance(Escrow::LEN),
        Escrow::LEN as u64,
        &env.program_id,
    ));

    ixs.push(
        instruction::init_escrow(
            &env.program_id,
            &initializer,
            temp_token_account,
            &env.initializer_token_b,
            escrow_account,
            expected_amount,
        )
        .unwrap(),
    );
    ixs
}

/// Helper: Open an escrow for `env.initializer`
pub async fn open_escrow(
    context: &mut ProgramTestContext,
    env: &TestEnv,
    deposit_amount: u64,
    expected_amount: u64,
) -> OpenEscrow {
    let temp = Keypair::new();
    let escrow = Keypair::new();
    let ixs = init_escrow_instructions(
        context,
        env,
        &temp.pubkey(),
        &escrow.pubkey(),
        deposit_amount,
        expected_amount,
    )
    .await;

    send_tx(context, &env.initializer, &ixs, &[&temp, &escrow]).await;
    OpenEscrow {
        escrow: escrow.pubkey(),
        temp_token_account: temp.pubkey(),
    }
}

/// Helper: Build an Exchange instruction for `env.taker` against `open`
pub fn exchange_ix(env: &TestEnv, open: &OpenEscrow, expected_amount: u64) -> Instruction {
    let (authority, _) = find_escrow_authority(&env.program_id);
    instruction::exchange(
        &env.program_id,
        &env.taker.pubkey(),
        &env.taker_token_b,
        &env.taker_token_a,
        &open.temp_token_account,
        &env.initializer.pubkey(),
        &env.initializer_token_b,
        &open.escrow,
        &authority,
        expected_amount,
    )
    .unwrap()
}

/// Helper: Build a Cancel instruction for `initializer` against `open`
pub fn cancel_ix(env: &TestEnv, open: &OpenEscrow, initializer: &Pubkey) -> Instruction {
    let (authority, _) = find_escrow_authority(&env.program_id);
    instruction::cancel(
        &env.program_id,
        initializer,
        &open.temp_token_account,
        &open.escrow,
        &authority,
    )
    .unwrap()
}

// ============================================================================
// TEST ENVIRONMENT
// ============================================================================

/// Two parties, two mints. The initializer holds token A and wants token B;
/// the taker holds token B.
pub struct TestEnv {
    pub program_id: Pubkey,
    pub initializer: Keypair,
    pub taker: Keypair,
    pub mint_authority: Keypair,
    pub mint_a: Pubkey,
    pub mint_b: Pubkey,
    pub initializer_token_a: Pubkey,
    pub initializer_token_b: Pubkey,
    pub taker_token_a: Pubkey,
    pub taker_token_b: Pubkey,
}

pub const INITIAL_TOKEN_A: u64 = 1_000;
pub const INITIAL_TOKEN_B: u64 = 1_000;

/// Helper: Create a baseline environment used by most tests
pub async fn setup_basic_env(context: &mut ProgramTestContext) -> TestEnv {
    let payer = context.payer.insecure_clone();
    let payer_pubkey = payer.pubkey();
    let initializer = Keypair::new();
    let taker = Keypair::new();
    let mint_authority = Keypair::new();

    // Fund both parties
    let fund_ix = system_instruction::transfer(&payer_pubkey, &initializer.pubkey(), 2_000_000_000);
    let fund_ix2 = system_instruction::transfer(&payer_pubkey, &taker.pubkey(), 2_000_000_000);
    send_tx(context, &payer, &[fund_ix, fund_ix2], &[]).await;

    let mint_a = create_mint(context, &payer, &mint_authority, 0).await;
    let mint_b = create_mint(context, &payer, &mint_authority, 0).await;

    let initializer_token_a =
        create_token_account(context, &payer, mint_a, initializer.pubkey()).await;
    let initializer_token_b =
        create_token_account(context, &payer, mint_b, initializer.pubkey()).await;
    let taker_token_a = create_token_account(context, &payer, mint_a, taker.pubkey()).await;
    let taker_token_b = create_token_account(context, &payer, mint_b, taker.pubkey()).await;

    mint_to(context, &payer, mint_a, &mint_authority, initializer_token_a, INITIAL_TOKEN_A).await;
    mint_to(context, &payer, mint_b, &mint_authority, taker_token_b, INITIAL_TOKEN_B).await;

    TestEnv {
        program_id: test_program_id(),
        initializer,
        taker,
        mint_authority,
        mint_a,
        mint_b,
        initializer_token_a,
        initializer_token_b,
        taker_token_a,
        taker_token_b,
    }
}
