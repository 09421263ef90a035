use clap::Parser;
use log::*;

mod command_def;
mod command_handler;
mod erc20;
mod formatting;
mod ledger_client;
mod progress;

use crate::{command_def::Arguments, command_handler::handle_command};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();
    let args = Arguments::parse();
    debug!("Using payment server at {}", args.server);
    if let Err(e) = handle_command(args).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
