//! Easykart storefront client.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog
//! easykart products
//! easykart product 12
//!
//! # Edit the cart
//! easykart add 12 -c 2
//! easykart update 12=3 7=0
//! easykart remove 12
//! easykart cart
//!
//! # Session
//! easykart login --token <TOKEN>
//! easykart whoami
//! easykart logout
//! ```
//!
//! The cart and credential token live in `EASYKART_DATA_DIR` and survive
//! restarts. Every command waits for the session to resolve before it runs.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use secrecy::SecretString;
use sentry::integrations::tracing as sentry_tracing;
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use easykart_core::{ProductId, Quantity};
use easykart_storefront::app::{Storefront, parse_edits};
use easykart_storefront::catalog::{CartView, ProductRecord};
use easykart_storefront::config::StorefrontConfig;
use easykart_storefront::error::{AppError, Result};
use easykart_storefront::session::{IdentityClient, Session};

#[derive(Parser)]
#[command(name = "easykart")]
#[command(author, version, about = "Easykart storefront client")]
struct Cli {
    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog products
    Products,
    /// Show one product
    Product {
        /// Product identifier
        id: String,
    },
    /// Add a product to the cart
    Add {
        /// Product identifier
        id: String,

        /// Units to add
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        count: u32,
    },
    /// Remove a product line from the cart
    Remove {
        /// Product identifier
        id: String,
    },
    /// Show the cart with prices and totals
    Cart,
    /// Set quantities in one commit (`ID=QTY`, 0 removes the line)
    Update {
        #[arg(required = true)]
        edits: Vec<String>,
    },
    /// Empty the cart
    Clear,
    /// Show the signed-in user
    Whoami,
    /// Store a credential token and resolve the user
    Login {
        /// Credential token issued by the identity service
        #[arg(long)]
        token: String,
    },
    /// Forget the stored credential token
    Logout,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::debug!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Logs go to stderr so command output on stdout stays clean.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "easykart_storefront=info,easykart=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing();
            return fail(&AppError::from(e));
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    match run(cli, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&e),
    }
}

#[allow(clippy::print_stderr)]
fn fail(err: &AppError) -> ExitCode {
    err.report();
    eprintln!("error: {err}");
    ExitCode::from(err.exit_code())
}

async fn run(cli: Cli, config: &StorefrontConfig) -> Result<()> {
    let mut storefront = Storefront::start(config).await?;
    let json = cli.json;

    match cli.command {
        Commands::Products => {
            let products = storefront.products().await?;
            if json {
                print_json(&products);
            } else {
                print_products(&products);
            }
        }
        Commands::Product { id } => {
            let product = storefront.product(&ProductId::from(id)).await?;
            if json {
                print_json(&product);
            } else {
                print_product(&product);
            }
        }
        Commands::Add { id, count } => {
            let delta = Quantity::new(count)
                .ok_or_else(|| AppError::InvalidInput("count must be at least 1".to_string()))?;
            let product = storefront.add_product(ProductId::from(id), delta).await?;
            tracing::info!(product_id = %product.id, count, "Added to cart");
            print_line(
                json,
                &format!("Added {count} x {} ({} in cart)", product.name, storefront.total_count()),
            );
        }
        Commands::Remove { id } => {
            let id = ProductId::from(id);
            if storefront.remove_line(&id) {
                print_line(json, &format!("Removed {id} ({} in cart)", storefront.total_count()));
            } else {
                print_line(json, &format!("{id} is not in the cart"));
            }
        }
        Commands::Cart => {
            let view = storefront.cart_view().await;
            if json {
                print_json(&view);
            } else {
                print_cart(&view);
            }
        }
        Commands::Update { edits } => {
            let edits = parse_edits(&edits)?;
            let accepted = storefront.update_quantities(&edits)?;
            print_line(
                json,
                &format!(
                    "Updated {accepted} of {} lines ({} in cart)",
                    edits.len(),
                    storefront.total_count()
                ),
            );
        }
        Commands::Clear => {
            storefront.clear_cart();
            print_line(json, "Cart cleared");
        }
        Commands::Whoami => print_session(json, storefront.session()),
        Commands::Login { token } => {
            let identity = IdentityClient::new(config)?;
            let session = storefront
                .sign_in(&SecretString::from(token), &identity)
                .await?;
            if !session.is_authenticated() {
                return Err(AppError::InvalidInput(
                    "token was stored but the identity service did not accept it".to_string(),
                ));
            }
            print_session(json, session);
        }
        Commands::Logout => {
            storefront.sign_out()?;
            print_line(json, "Signed out");
        }
    }

    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(body) => println!("{body}"),
        Err(e) => tracing::error!(error = %e, "Failed to encode output"),
    }
}

#[allow(clippy::print_stdout)]
fn print_line(json: bool, message: &str) {
    if json {
        print_json(&serde_json::json!({ "message": message }));
    } else {
        println!("{message}");
    }
}

#[allow(clippy::print_stdout)]
fn print_products(products: &[ProductRecord]) {
    if products.is_empty() {
        println!("No products");
        return;
    }
    for product in products {
        println!("{:>8}  {:<40}  {:>10}", product.id, product.name, product.price.round_dp(2));
    }
}

#[allow(clippy::print_stdout)]
fn print_product(product: &ProductRecord) {
    println!("{} ({})", product.name, product.id);
    println!("Price: {}", product.price.round_dp(2));
    if let Some(category) = &product.category {
        println!("Category: {category}");
    }
    if let Some(rating) = product.rating {
        println!("Rating: {rating:.1}");
    }
    if let Some(description) = &product.description {
        println!();
        println!("{description}");
    }
}

#[allow(clippy::print_stdout)]
fn print_cart(view: &CartView) {
    if view.totals.total_count == 0 {
        println!("Your cart is empty");
        return;
    }

    for line in &view.lines {
        println!(
            "{:>8}  {:<32}  {:>4} x {:>10} = {:>10}",
            line.product_id,
            line.name,
            line.quantity,
            line.unit_price,
            line.line_subtotal()
        );
    }
    for failure in &view.failed {
        println!("{:>8}  (details unavailable: {})", failure.product_id, failure.error);
    }

    println!();
    println!("Items:    {}", view.totals.total_count);
    println!("Subtotal: {}", view.totals.subtotal);
    println!("Total:    {}", view.totals.total);
}

#[allow(clippy::print_stdout)]
fn print_session(json: bool, session: &Session) {
    if json {
        print_json(&session.user());
        return;
    }
    match session.user() {
        Some(user) => {
            let name = user.full_name.as_deref().unwrap_or("(no name)");
            match &user.email {
                Some(email) => println!("{name} <{email}> (user {})", user.id),
                None => println!("{name} (user {})", user.id),
            }
        }
        None => println!("Not signed in"),
    }
}
