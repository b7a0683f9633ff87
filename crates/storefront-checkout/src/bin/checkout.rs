//! # Checkout CLI
//!
//! Checks out one user's cart against a local database and prints the
//! payment response as JSON.
//!
//! ## Usage
//! ```bash
//! # Seed first
//! cargo run -p storefront-db --bin seed
//!
//! # Check out the demo cart with a coupon
//! cargo run -p storefront-checkout --bin checkout -- --user user-demo --coupon SAVE20
//!
//! # Instant, always-approving gateway
//! cargo run -p storefront-checkout --bin checkout -- --latency-ms 0 --decline-rate 0
//!
//! # List charges that were taken without an order
//! cargo run -p storefront-checkout --bin checkout -- --pending-charges
//! ```
//!
//! ## Exit Codes
//! - `0` - order created
//! - `1` - payment declined or timed out
//! - `2` - rejected before payment (cart, coupon)
//! - `3` - charged but not fulfilled
//!
//! Settings come from `STOREFRONT_*` variables; flags override them.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use storefront_checkout::{
    init_tracing, CheckoutConfig, CheckoutError, CheckoutReceipt, CheckoutRequest, CheckoutResult,
    CheckoutService, PaymentResponse,
};
use storefront_db::Database;

#[derive(Debug, Parser)]
#[command(name = "checkout", about = "Check out a storefront cart")]
struct Args {
    /// Database file path
    #[arg(short, long)]
    db: Option<PathBuf>,

    /// Whose cart to check out
    #[arg(short, long, default_value = "user-demo")]
    user: String,

    /// Coupon code to apply
    #[arg(short, long)]
    coupon: Option<String>,

    /// Payment method passed to the gateway
    #[arg(short, long)]
    method: Option<String>,

    /// Simulated gateway latency in milliseconds
    #[arg(long)]
    latency_ms: Option<u64>,

    /// Simulated gateway decline probability (0.0 - 1.0)
    #[arg(long)]
    decline_rate: Option<f64>,

    /// Payment timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// List unresolved charged-but-unfulfilled entries and exit
    #[arg(long)]
    pending_charges: bool,
}

impl Args {
    fn apply(&self, config: &mut CheckoutConfig) {
        if let Some(db) = &self.db {
            config.database_path = db.clone();
        }
        if let Some(method) = &self.method {
            config.payment_method = method.clone();
        }
        if let Some(ms) = self.latency_ms {
            config.gateway_latency = Duration::from_millis(ms);
        }
        if let Some(rate) = self.decline_rate {
            config.gateway_decline_rate = rate;
        }
        if let Some(ms) = self.timeout_ms {
            config.payment_timeout = Duration::from_millis(ms);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let mut config = CheckoutConfig::load().context("loading configuration")?;
    args.apply(&mut config);
    config.validate().context("validating configuration")?;

    init_tracing(&config.log_filter);

    let db = Database::new(config.db_config())
        .await
        .with_context(|| format!("opening {}", config.database_path.display()))?;

    if args.pending_charges {
        let pending = db.reconciliations().pending(100).await?;
        println!("{}", serde_json::to_string_pretty(&pending)?);
        db.close().await;
        return Ok(ExitCode::SUCCESS);
    }

    let service = CheckoutService::new(
        db.clone(),
        Arc::new(config.gateway()),
        config.checkout_options(),
    );
    let request = CheckoutRequest {
        coupon_code: args.coupon.clone(),
        payment_method: None,
    };

    let code = match service.checkout(&args.user, request).await {
        Ok(receipt) => {
            eprintln!(
                "Order {} created: {} charged (discount {})",
                receipt.order.order_number, receipt.amount, receipt.breakdown.discount
            );
            print_response(Ok(receipt))?;
            ExitCode::SUCCESS
        }
        Err(err @ (CheckoutError::Validation(_) | CheckoutError::Coupon(_))) => {
            eprintln!("Checkout rejected: {err}");
            ExitCode::from(2)
        }
        Err(err @ CheckoutError::Payment { .. }) => {
            eprintln!("{err}");
            print_response(Err(err))?;
            ExitCode::from(1)
        }
        Err(err @ CheckoutError::Commit { .. }) => {
            eprintln!("{err}");
            print_response(Err(err))?;
            ExitCode::from(3)
        }
        Err(err @ CheckoutError::Internal(_)) => {
            db.close().await;
            return Err(err).context("checkout failed");
        }
    };

    db.close().await;
    Ok(code)
}

fn print_response(outcome: CheckoutResult<CheckoutReceipt>) -> anyhow::Result<()> {
    let response = PaymentResponse::from_outcome(outcome)?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
