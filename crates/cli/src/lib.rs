pub mod commands;
pub mod logging;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "stockroom",
    about = "Stockroom fulfillment CLI",
    long_about = "Operate the fulfillment core: schema, demo data, price lists and orders.",
    after_help = "Examples:\n  stockroom seed\n  stockroom checkout --customer 1 --line 3:5"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo catalog, stock and discount rules")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, DB connectivity and schema readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Show effective unit prices and stock for every variant")]
    PriceList {
        #[arg(long, help = "Customer whose discount rules apply")]
        customer: Option<i64>,
        #[arg(
            long,
            default_value_t = 1,
            allow_negative_numbers = true,
            help = "Assumed order quantity"
        )]
        quantity: i64,
    },
    #[command(about = "Place a single-line order allocated first-expire-first-out")]
    Order {
        #[arg(long)]
        customer: i64,
        #[arg(long)]
        variant: i64,
        #[arg(long, allow_negative_numbers = true)]
        quantity: i64,
    },
    #[command(about = "Place an order against one named batch")]
    BatchOrder {
        #[arg(long)]
        customer: i64,
        #[arg(long)]
        batch: i64,
        #[arg(long, allow_negative_numbers = true)]
        quantity: i64,
    },
    #[command(about = "Fulfil a whole cart in one all-or-nothing transaction")]
    Checkout {
        #[arg(long)]
        customer: i64,
        #[arg(
            long = "line",
            value_name = "VARIANT:QTY",
            allow_hyphen_values = true,
            help = "Cart line; repeat for more lines"
        )]
        lines: Vec<String>,
    },
    #[command(about = "Read back an order with its lines and grand total")]
    ShowOrder {
        #[arg(long)]
        order: i64,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    logging::init();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::PriceList { customer, quantity } => commands::price_list::run(customer, quantity),
        Command::Order { customer, variant, quantity } => {
            commands::order::run_line(customer, variant, quantity)
        }
        Command::BatchOrder { customer, batch, quantity } => {
            commands::order::run_batch(customer, batch, quantity)
        }
        Command::Checkout { customer, lines } => commands::checkout::run(customer, &lines),
        Command::ShowOrder { order } => commands::order::run_show(order),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
