//! Token Escrow CLI
//!
//! Drives the escrow lifecycle from the command line.
//!
//! ## Usage
//!
//! ```bash
//! token-escrow --config config/token_escrow.toml init-escrow \
//!     --initializer alice.json --deposit-account <pubkey> \
//!     --receive-mint <pubkey> --deposit-amount 1 --expected-amount 3
//! ```
//!
//! Or point at the config file through the environment:
//!
//! ```bash
//! TOKEN_ESCROW_CONFIG_PATH=token_escrow.toml token-escrow show-escrow --escrow <pubkey>
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair, Signer},
};
use token_escrow_client::{codec::parse_address, ClientConfig, Destination, SwapOrchestrator};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "token-escrow")]
#[command(about = "Open, settle and cancel token escrows")]
struct Args {
    /// Path to configuration file
    /// (default: config/token_escrow.toml or TOKEN_ESCROW_CONFIG_PATH env var)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// RPC endpoint, overrides the configuration file
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Escrow program id, overrides the configuration file
    #[arg(long, global = true)]
    program_id: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Lock a deposit and name the amount expected in return
    InitEscrow {
        /// Initializer keypair file
        #[arg(long)]
        initializer: String,
        /// Token account the deposit is taken from
        #[arg(long, value_parser = parse_address)]
        deposit_account: Pubkey,
        /// Token account that receives the taker's payment
        #[arg(long, value_parser = parse_address, conflicts_with = "receive_mint")]
        receiving_account: Option<Pubkey>,
        /// Mint of the payment; it is received in the initializer's associated
        /// token account, created when missing
        #[arg(long, value_parser = parse_address)]
        receive_mint: Option<Pubkey>,
        #[arg(long)]
        deposit_amount: u64,
        #[arg(long)]
        expected_amount: u64,
    },
    /// Pay the expected amount and receive the deposit
    Exchange {
        /// Taker keypair file
        #[arg(long)]
        taker: String,
        /// Token account the payment is taken from
        #[arg(long, value_parser = parse_address)]
        pay_account: Pubkey,
        /// Token account that receives the deposit
        #[arg(long, value_parser = parse_address, conflicts_with = "receive_mint")]
        receive_account: Option<Pubkey>,
        /// Mint of the deposit; it is received in the taker's associated token
        /// account, created when missing
        #[arg(long, value_parser = parse_address)]
        receive_mint: Option<Pubkey>,
        #[arg(long, value_parser = parse_address)]
        escrow: Pubkey,
        /// Amount the taker agrees to pay; must match the escrow record
        #[arg(long)]
        expected_amount: u64,
    },
    /// Close an open escrow and take the deposit back
    Cancel {
        /// Initializer keypair file
        #[arg(long)]
        initializer: String,
        #[arg(long, value_parser = parse_address)]
        escrow: Pubkey,
        /// Token account the deposit is returned to (default: the
        /// initializer's associated token account for the deposit mint)
        #[arg(long, value_parser = parse_address)]
        refund_account: Option<Pubkey>,
    },
    /// Print the escrow record
    ShowEscrow {
        #[arg(long, value_parser = parse_address)]
        escrow: Pubkey,
    },
    /// Print a token account balance
    TokenBalance {
        #[arg(long, value_parser = parse_address)]
        token_account: Pubkey,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = resolve_config(&args)?;
    info!("RPC URL: {}", config.rpc_url);
    info!("Program ID: {}", config.program_id);

    let program_id = config.program_id()?;
    let client = RpcClient::new_with_commitment(config.rpc_url.clone(), config.commitment_config());
    let orchestrator = SwapOrchestrator::new(client, program_id);

    match args.command {
        Command::InitEscrow {
            initializer,
            deposit_account,
            receiving_account,
            receive_mint,
            deposit_amount,
            expected_amount,
        } => {
            let initializer = read_keypair(&initializer)?;
            let receiving = destination(receiving_account, initializer.pubkey(), receive_mint)?;
            handle_init_escrow(
                &orchestrator,
                &initializer,
                &deposit_account,
                &receiving,
                deposit_amount,
                expected_amount,
            )
            .await
        }
        Command::Exchange {
            taker,
            pay_account,
            receive_account,
            receive_mint,
            escrow,
            expected_amount,
        } => {
            let taker = read_keypair(&taker)?;
            let receive = destination(receive_account, taker.pubkey(), receive_mint)?;
            orchestrator.ensure_program_deployed().await?;
            let signature = orchestrator
                .exchange(&taker, &pay_account, &receive, &escrow, expected_amount)
                .await?;
            println!("Exchange signature: {signature}");
            Ok(())
        }
        Command::Cancel {
            initializer,
            escrow,
            refund_account,
        } => {
            let initializer = read_keypair(&initializer)?;
            orchestrator.ensure_program_deployed().await?;
            let signature = orchestrator.cancel(&initializer, &escrow, refund_account).await?;
            println!("Cancel signature: {signature}");
            Ok(())
        }
        Command::ShowEscrow { escrow } => handle_show_escrow(&orchestrator, &escrow).await,
        Command::TokenBalance { token_account } => {
            let balance = orchestrator.token_balance(&token_account).await?;
            println!("Token account: {token_account}");
            println!("Balance: {balance}");
            Ok(())
        }
    }
}

// ============================================================================
// COMMAND HANDLERS
// ============================================================================

async fn handle_init_escrow(
    orchestrator: &SwapOrchestrator<RpcClient>,
    initializer: &Keypair,
    deposit_account: &Pubkey,
    receiving: &Destination,
    deposit_amount: u64,
    expected_amount: u64,
) -> Result<()> {
    orchestrator.ensure_program_deployed().await?;
    info!("Initializer: {}", initializer.pubkey());

    let receipt = orchestrator
        .init_escrow(
            initializer,
            deposit_account,
            receiving,
            deposit_amount,
            expected_amount,
        )
        .await?;

    println!("InitEscrow signature: {}", receipt.signature);
    println!("Escrow: {}", receipt.escrow);
    println!("Temp token account: {}", receipt.temp_token_account);
    println!("Receiving token account: {}", receipt.receiving_token_account);
    Ok(())
}

async fn handle_show_escrow(
    orchestrator: &SwapOrchestrator<RpcClient>,
    escrow: &Pubkey,
) -> Result<()> {
    let Some(record) = orchestrator.escrow_state(escrow).await? else {
        println!("Escrow: {escrow}");
        println!("Status: closed");
        return Ok(());
    };

    println!("Escrow: {escrow}");
    println!("Initialized: {}", record.is_initialized);
    println!("Initializer: {}", record.initializer_pubkey);
    println!("Temp token account: {}", record.temp_token_account_pubkey);
    println!(
        "Receiving token account: {}",
        record.initializer_token_to_receive_account_pubkey
    );
    println!("Expected amount: {}", record.expected_amount);
    Ok(())
}

// ============================================================================
// HELPERS
// ============================================================================

/// Resolves configuration. Priority: CLI flag > env var > default file, with
/// `--rpc-url` / `--program-id` overriding whatever the file says.
fn resolve_config(args: &Args) -> Result<ClientConfig> {
    let loaded = ClientConfig::load_from_path(args.config.as_deref())?;
    let config = match loaded {
        Some(config) => config.with_overrides(args.rpc_url.clone(), args.program_id.clone()),
        None => {
            if let Some(path) = &args.config {
                anyhow::bail!("Configuration file '{}' not found", path);
            }
            let program_id = args
                .program_id
                .clone()
                .context("--program-id is required when no configuration file is present")?;
            ClientConfig::new(args.rpc_url.clone(), program_id)
        }
    };
    config.validate()?;
    Ok(config)
}

fn read_keypair(path: &str) -> Result<Keypair> {
    read_keypair_file(path)
        .map_err(|err| anyhow::anyhow!("Failed to read keypair '{}': {}", path, err))
}

/// An explicit token account, or `owner`'s associated token account for `mint`.
fn destination(
    account: Option<Pubkey>,
    owner: Pubkey,
    mint: Option<Pubkey>,
) -> Result<Destination> {
    match (account, mint) {
        (Some(account), _) => Ok(Destination::Account(account)),
        (None, Some(mint)) => Ok(Destination::Associated { owner, mint }),
        (None, None) => anyhow::bail!("Either a token account or a mint must be given"),
    }
}
