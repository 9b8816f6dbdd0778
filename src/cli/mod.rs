pub mod output;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::client::DevClient;
use output::{output_list, output_success, output_value};

#[derive(Parser)]
#[command(name = "devctl")]
#[command(about = "devctl - Command-line client for the development /dev gateway")]
#[command(version)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "DEV_GATEWAY_URL",
        default_value = "http://localhost:3000",
        help = "Base URL of the service"
    )]
    pub url: String,

    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "List every account id")]
    ListAccounts,

    #[command(about = "Create an account and print its admin API key")]
    CreateAccount {
        #[arg(help = "Account id")]
        id: String,
    },

    #[command(about = "Destroy an account with its roles and secrets")]
    DestroyAccount {
        #[arg(help = "Account id")]
        id: String,
    },

    #[command(about = "Print the API key of a role")]
    ApiKey {
        #[arg(help = "Role id as <account>:<kind>:<id>")]
        role_id: String,
    },

    #[command(about = "Print a secret value")]
    GetSecret {
        #[arg(help = "Resource id as <account>:<kind>:<id>")]
        resource_id: String,
        #[arg(long, help = "Specific version (defaults to the latest)")]
        version: Option<u32>,
    },

    #[command(about = "Store a new secret version")]
    SetSecret {
        #[arg(help = "Resource id as <account>:<kind>:<id>")]
        resource_id: String,
        #[arg(help = "Secret value")]
        value: String,
    },

    #[command(about = "Load a policy document from a file")]
    LoadPolicy {
        #[arg(help = "Policy resource id as <account>:policy:<id>")]
        resource_id: String,
        #[arg(help = "Path to the policy file")]
        file: PathBuf,
    },

    #[command(about = "Destroy every account")]
    Purge,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let client = DevClient::new(&cli.url).with_context(|| format!("bad --url '{}'", cli.url))?;

    match cli.command {
        Commands::ListAccounts => {
            let accounts = client.list_accounts().await?;
            output_list(&output_format, "accounts", &accounts, "No accounts")
        }
        Commands::CreateAccount { id } => {
            let created = client.create_account(&id).await?;
            match output_format {
                OutputFormat::Json => output_success(
                    &output_format,
                    &format!("Created account '{}'", created.id),
                    Some(serde_json::to_value(&created)?),
                ),
                OutputFormat::Text => output_value(&output_format, "api_key", &created.api_key),
            }
        }
        Commands::DestroyAccount { id } => {
            client.destroy_account(&id).await?;
            output_success(&output_format, &format!("Destroyed account '{}'", id), None)
        }
        Commands::ApiKey { role_id } => {
            let api_key = client.retrieve_api_key(&role_id).await?;
            output_value(&output_format, "api_key", &api_key)
        }
        Commands::GetSecret {
            resource_id,
            version,
        } => {
            let value = client.get_secret(&resource_id, version).await?;
            output_value(&output_format, "value", &value)
        }
        Commands::SetSecret { resource_id, value } => {
            client.create_secret(&resource_id, &value).await?;
            output_success(&output_format, &format!("Stored '{}'", resource_id), None)
        }
        Commands::LoadPolicy { resource_id, file } => {
            let policy = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            client.load_policy(&resource_id, &policy).await?;
            output_success(
                &output_format,
                &format!("Loaded {} into '{}'", file.display(), resource_id),
                None,
            )
        }
        Commands::Purge => {
            let summary = client.purge().await?;
            output_success(
                &output_format,
                &format!("Purged {} account(s)", summary.purged_accounts),
                Some(json!(summary)),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subcommands() {
        let cli = Cli::parse_from(["devctl", "get-secret", "cucumber:variable:x", "--version", "2"]);
        match cli.command {
            Commands::GetSecret {
                resource_id,
                version,
            } => {
                assert_eq!(resource_id, "cucumber:variable:x");
                assert_eq!(version, Some(2));
            }
            _ => panic!("expected get-secret"),
        }
    }

    #[test]
    fn json_flag_is_global() {
        let cli = Cli::parse_from(["devctl", "list-accounts", "--json"]);
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Json));
        let cli = Cli::parse_from(["devctl", "--url", "http://gw:8080", "purge"]);
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Text));
        assert_eq!(cli.url, "http://gw:8080");
    }
}
