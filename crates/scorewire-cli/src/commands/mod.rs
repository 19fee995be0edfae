mod fetch;
mod strategies;

use serde_json::Value;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub async fn run(cli: &Cli) -> Result<Value, CliError> {
    match &cli.command {
        Command::Fetch(args) => fetch::run(args).await,
        Command::Strategies => strategies::run(),
    }
}
