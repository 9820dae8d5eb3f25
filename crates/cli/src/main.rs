//! Bubblemart CLI - shop, check out and run the back-office from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (the token is kept under BUBBLEMART_DATA_DIR)
//! bubblemart login -e ada@example.com
//!
//! # Browse and fill the cart
//! bubblemart products gift
//! bubblemart cart add 65f1c0ffee 2
//! bubblemart cart set 65f1cart01 3
//!
//! # Check out; gift carts need delivery details
//! bubblemart checkout --sender Ada --receiver Grace \
//!     --address "1 Marina, Lagos" --phone +2348012345678
//!
//! # Back from the payment page
//! bubblemart verify 65f1order1
//!
//! # Back-office
//! bubblemart admin orders
//! bubblemart admin product-logs 65f1c0ffee
//! ```
//!
//! # Environment Variables
//!
//! See `bubblemart_storefront::config`. `SENTRY_DSN` enables error tracking.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use bubblemart_core::{ContactInfo, ProductKind, ProductUpdate};
use bubblemart_storefront::services::Registration;
use bubblemart_storefront::{ClientConfig, ClientState};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod error;
mod render;

use error::CliError;

#[derive(Parser)]
#[command(name = "bubblemart")]
#[command(author, version, about = "Bubblemart terminal client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "BUBBLEMART_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account
    Register {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "BUBBLEMART_PASSWORD", hide_env_values = true)]
        password: String,

        /// Repeat the password (defaults to --password)
        #[arg(long)]
        confirm_password: Option<String>,
    },
    /// Sign out and forget the stored token
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List products of one type (`log` or `gift`)
    Products {
        kind: ProductKind,

        /// Follow every page
        #[arg(long)]
        all: bool,
    },
    /// Show one product
    Product {
        id: String,

        /// Fetch the back-office view
        #[arg(long)]
        admin: bool,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Check out the cart and get a payment link
    Checkout(ContactArgs),
    /// List your orders
    Orders,
    /// Show one order
    Order { id: String },
    /// Pay for an order: opens the receipt, resumes or starts a payment
    Pay { order_id: String },
    /// Verify the payment of an order
    Verify {
        order_id: String,

        /// Known payment reference (order already paid)
        #[arg(long)]
        reference: Option<String>,
    },
    /// List credentials you have bought
    Logs {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Back-office commands
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart and its total
    Show,
    /// Add a product
    Add {
        product_id: String,
        #[arg(default_value_t = 1)]
        quantity: u32,
    },
    /// Change the quantity of a line
    Set { line_id: String, quantity: u32 },
    /// Remove a line
    Remove { line_id: String },
    /// Empty the cart
    Clear,
}

/// Delivery details, needed when the cart holds a gift.
#[derive(clap::Args)]
struct ContactArgs {
    #[arg(long)]
    sender: Option<String>,
    #[arg(long)]
    receiver: Option<String>,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    note: Option<String>,
}

impl ContactArgs {
    fn into_contact(self) -> Option<ContactInfo> {
        let any = self.sender.is_some()
            || self.receiver.is_some()
            || self.address.is_some()
            || self.phone.is_some();
        any.then(|| ContactInfo {
            sender_name: self.sender.unwrap_or_default(),
            receiver_name: self.receiver.unwrap_or_default(),
            receiver_address: self.address.unwrap_or_default(),
            receiver_phone_number: self.phone.unwrap_or_default(),
            short_note: self.note.unwrap_or_default(),
            ..ContactInfo::default()
        })
    }
}

#[derive(Subcommand)]
enum AdminAction {
    /// List every order
    Orders,
    /// List customers
    Users,
    /// Show one customer
    User { id: String },
    /// List payment records
    Payments,
    /// Create a product
    ProductCreate {
        #[arg(long)]
        name: String,
        #[arg(long = "type")]
        kind: ProductKind,
        /// Units in stock (log products count their credentials instead)
        #[arg(long, default_value_t = 0)]
        quantity: u32,
        #[arg(long)]
        amount: Decimal,
        #[arg(long, default_value = "")]
        image: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Credential as `email:password`; repeat for each
        #[arg(long = "log")]
        logs: Vec<String>,
    },
    /// Update a product
    ProductUpdate {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        quantity: Option<u32>,
        #[arg(long)]
        amount: Option<Decimal>,
        #[arg(long)]
        image: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Replacement credential pool as `email:password`; repeat for each
        #[arg(long = "log")]
        logs: Vec<String>,
    },
    /// Delete a product
    ProductDelete { id: String },
    /// List the credentials of a log product
    ProductLogs {
        product_id: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Change one credential
    LogUpdate {
        id: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Delete one credential
    LogDelete { id: String },
    /// Upload a product image
    Upload { path: PathBuf },
    /// Delete an uploaded image
    UploadDelete { path: String },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
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

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            render::failure(&e.to_string());
            std::process::exit(2);
        }
    };

    // Must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bubblemart_storefront=info,bubblemart_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let state = match ClientState::from_config(config) {
        Ok(state) => state,
        Err(e) => {
            render::failure(&e.user_message("Failed to start"));
            std::process::exit(2);
        }
    };
    let mut events = state.events().subscribe();

    let result = run(&state, cli.command).await;
    let toasted = render::drain_events(&mut events);

    if let Err(e) = result {
        tracing::debug!(error = %e, "Command failed");
        if !toasted {
            render::failure(&e.user_message("Something went wrong, please try again"));
        }
        if let Some(errors) = e.field_errors() {
            render::field_errors(errors);
        }
        std::process::exit(1);
    }
}

async fn run(state: &ClientState, command: Commands) -> Result<(), CliError> {
    // Login and registration start from a clean session.
    if !matches!(command, Commands::Login { .. } | Commands::Register { .. })
        && let Err(e) = state.session().load_app().await
    {
        tracing::warn!(error = %e, "Could not restore session");
    }

    match command {
        Commands::Login { email, password } => {
            commands::account::login(state, &email, &password).await?;
        }
        Commands::Register {
            name,
            email,
            password,
            confirm_password,
        } => {
            let registration = Registration {
                name,
                email,
                confirm_password: confirm_password.unwrap_or_else(|| password.clone()),
                password,
            };
            commands::account::register(state, &registration).await?;
        }
        Commands::Logout => commands::account::logout(state),
        Commands::Whoami => commands::account::whoami(state).await?,
        Commands::Products { kind, all } => commands::catalog::list(state, kind, all).await?,
        Commands::Product { id, admin } => commands::catalog::show(state, &id, admin).await?,
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(state).await?,
            CartAction::Add {
                product_id,
                quantity,
            } => commands::cart::add(state, &product_id, quantity).await?,
            CartAction::Set { line_id, quantity } => {
                commands::cart::set(state, &line_id, quantity).await?;
            }
            CartAction::Remove { line_id } => commands::cart::remove(state, &line_id).await?,
            CartAction::Clear => commands::cart::clear(state).await?,
        },
        Commands::Checkout(contact) => {
            commands::orders::checkout(state, contact.into_contact()).await?;
        }
        Commands::Orders => commands::orders::list(state, false).await?,
        Commands::Order { id } => commands::orders::show(state, &id).await?,
        Commands::Pay { order_id } => commands::orders::pay(state, &order_id).await?,
        Commands::Verify {
            order_id,
            reference,
        } => commands::orders::verify(state, &order_id, reference.as_deref()).await?,
        Commands::Logs { page } => commands::orders::purchased_logs(state, page).await?,
        Commands::Admin { action } => run_admin(state, action).await?,
    }
    Ok(())
}

async fn run_admin(state: &ClientState, action: AdminAction) -> Result<(), CliError> {
    use commands::admin;

    match action {
        AdminAction::Orders => commands::orders::list(state, true).await,
        AdminAction::Users => admin::users(state).await,
        AdminAction::User { id } => admin::user(state, &id).await,
        AdminAction::Payments => admin::payments(state).await,
        AdminAction::ProductCreate {
            name,
            kind,
            quantity,
            amount,
            image,
            description,
            logs,
        } => {
            admin::create_product(
                state,
                admin::ProductInput {
                    name,
                    kind,
                    quantity,
                    amount,
                    image,
                    description,
                    logs,
                },
            )
            .await
        }
        AdminAction::ProductUpdate {
            id,
            name,
            quantity,
            amount,
            image,
            description,
            logs,
        } => {
            let update = ProductUpdate {
                name,
                quantity,
                amount,
                image,
                description,
                logs: None,
            };
            admin::update_product(state, &id, update, &logs).await
        }
        AdminAction::ProductDelete { id } => admin::delete_product(state, &id).await,
        AdminAction::ProductLogs { product_id, page } => {
            admin::product_logs(state, &product_id, page).await
        }
        AdminAction::LogUpdate {
            id,
            email,
            password,
        } => admin::update_log(state, &id, &email, &password).await,
        AdminAction::LogDelete { id } => admin::delete_log(state, &id).await,
        AdminAction::Upload { path } => admin::upload(state, &path).await,
        AdminAction::UploadDelete { path } => admin::delete_upload(state, &path).await,
    }
}
