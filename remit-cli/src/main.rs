//! Remit CLI
//!
//! Command-line interface for the transfer API.

use anyhow::Result;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use remit_client::{RemitClient, TransferOutcome};
use remit_types::{
    Currency, DeviceContext, GatewayKind, QuoteId, QuoteRequest, Recipient, TransactionId,
};

#[derive(Parser)]
#[command(name = "remit")]
#[command(author, version, about = "Transfer API CLI client", long_about = None)]
struct Cli {
    /// Base URL of the transfer API
    #[arg(long, env = "REMIT_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    /// Sender user ID (UUID) sent as the caller identity
    #[arg(long, env = "REMIT_USER_ID")]
    user: Option<Uuid>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Price a transfer
    Quote {
        /// Amount to send in smallest currency unit (cents)
        #[arg(long)]
        amount: i64,
        /// Currency to send (ZAR, USD, MWK, MZN)
        #[arg(long, default_value = "ZAR")]
        from: String,
        /// Currency the recipient receives
        #[arg(long, default_value = "USD")]
        to: String,
        /// Request express processing
        #[arg(long)]
        express: bool,
    },
    /// Commit a quote into a transaction
    Send {
        /// Quote ID from a previous `quote` call
        #[arg(long)]
        quote: String,
        /// Recipient user ID (UUID)
        #[arg(long, conflicts_with = "to_email")]
        to_user: Option<Uuid>,
        /// Recipient email address
        #[arg(long)]
        to_email: Option<String>,
        #[arg(long)]
        idempotency_key: Option<String>,
        /// Device fingerprint reported to the risk checks
        #[arg(long, default_value = "cli")]
        fingerprint: String,
        /// Country code of the caller
        #[arg(long, default_value = "ZA")]
        country: String,
    },
    /// Complete secondary verification of a held transfer
    Verify {
        /// Transaction ID
        id: String,
        /// Verification token from the `send` response
        #[arg(long)]
        token: String,
        /// One-time password delivered out of band
        #[arg(long)]
        otp: String,
    },
    /// Initiate settlement of a pending transaction
    Pay {
        /// Transaction ID
        id: String,
        /// Gateway to charge through (card, eft, open_banking)
        #[arg(long, default_value = "card")]
        gateway: String,
        /// Gateway-specific fields as a JSON object
        #[arg(long, default_value = "{}")]
        fields: String,
    },
    /// Get a transaction with its transition history
    Status {
        /// Transaction ID
        id: String,
    },
    /// Cancel a pending transaction
    Cancel {
        /// Transaction ID
        id: String,
    },
    /// List your transactions
    List,
    /// Check API health
    Health,
}

fn parse_currency(s: &str) -> Result<Currency> {
    s.to_uppercase()
        .parse()
        .map_err(|_| anyhow::anyhow!("Unknown currency: {}. Supported: ZAR, USD, MWK, MZN", s))
}

fn parse_gateway(s: &str) -> Result<GatewayKind> {
    s.parse()
        .map_err(|_| anyhow::anyhow!("Unknown gateway: {}. Supported: card, eft, open_banking", s))
}

fn parse_quote_id(s: &str) -> Result<QuoteId> {
    s.parse().map_err(|_| anyhow::anyhow!("Invalid quote ID: {}", s))
}

fn parse_transaction_id(s: &str) -> Result<TransactionId> {
    s.parse()
        .map_err(|_| anyhow::anyhow!("Invalid transaction ID: {}", s))
}

fn device(fingerprint: String, country: String) -> DeviceContext {
    DeviceContext {
        fingerprint,
        ip_country: country.clone(),
        declared_country: country,
        latitude: 0.0,
        longitude: 0.0,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut client = RemitClient::new(&cli.api_url);
    if let Some(user) = cli.user {
        client = client.with_user(user);
    }

    match cli.command {
        Commands::Health => {
            let healthy = client.health().await?;
            if healthy {
                println!("✓ API is healthy");
            } else {
                println!("✗ API is not healthy");
                std::process::exit(1);
            }
        }

        Commands::Quote {
            amount,
            from,
            to,
            express,
        } => {
            let req = QuoteRequest {
                send_amount: amount,
                from_currency: parse_currency(&from)?,
                to_currency: parse_currency(&to)?,
                express,
            };
            let quote = client.quote(&req).await?;
            println!("{}", serde_json::to_string_pretty(&quote)?);
        }

        Commands::Send {
            quote,
            to_user,
            to_email,
            idempotency_key,
            fingerprint,
            country,
        } => {
            let quote_id = parse_quote_id(&quote)?;
            let recipient = match (to_user, to_email) {
                (Some(id), _) => Recipient::User(id),
                (None, Some(email)) => Recipient::Email(email),
                (None, None) => anyhow::bail!("specify --to-user or --to-email"),
            };
            let outcome = client
                .create_transaction(
                    quote_id,
                    recipient,
                    idempotency_key,
                    device(fingerprint, country),
                )
                .await?;
            match outcome {
                TransferOutcome::Created(tx) => {
                    println!("{}", serde_json::to_string_pretty(&tx)?);
                }
                TransferOutcome::VerificationPending(held) => {
                    println!("Verification required. Complete with:");
                    println!(
                        "  remit verify {} --token {} --otp <otp>",
                        held.transaction_id, held.token
                    );
                }
            }
        }

        Commands::Verify { id, token, otp } => {
            let tx = client
                .verify_transaction(parse_transaction_id(&id)?, token, otp)
                .await?;
            println!("{}", serde_json::to_string_pretty(&tx)?);
        }

        Commands::Pay { id, gateway, fields } => {
            let fields: serde_json::Value = serde_json::from_str(&fields)
                .map_err(|e| anyhow::anyhow!("--fields must be a JSON object: {}", e))?;
            let payment = client
                .process_payment(parse_transaction_id(&id)?, parse_gateway(&gateway)?, fields)
                .await?;
            println!("{}", serde_json::to_string_pretty(&payment)?);
        }

        Commands::Status { id } => {
            let detail = client.get_transaction(parse_transaction_id(&id)?).await?;
            println!("{}", serde_json::to_string_pretty(&detail)?);
        }

        Commands::Cancel { id } => {
            let tx = client.cancel_transaction(parse_transaction_id(&id)?).await?;
            println!("{}", serde_json::to_string_pretty(&tx)?);
        }

        Commands::List => {
            let txs = client.list_transactions().await?;
            println!("{}", serde_json::to_string_pretty(&txs)?);
        }
    }

    Ok(())
}
