//! Command-line driver for the storefront API. Prints one JSON document per
//! line on stdout.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use ortho_config::OrthoConfig;
use serde::Serialize;
use serde_json::json;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use storefront_client::domain::{BoxId, FetchOutcome, LoginCredentials};
use storefront_client::{ClientSettings, StorefrontClient};

const DEFAULT_SESSION_FILE: &str = ".storefront-session.json";

/// `storefront` command arguments.
#[derive(Debug, Parser)]
#[command(name = "storefront", about = "Blind-box storefront API client", version)]
struct CliArgs {
    /// API root, overriding `STOREFRONT_API_BASE`.
    #[arg(long = "api-base", value_name = "url", global = true)]
    api_base: Option<String>,
    /// Session file, overriding `STOREFRONT_SESSION_FILE`.
    #[arg(long = "session-file", value_name = "path", global = true)]
    session_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Log in and store the session.
    Login {
        /// Account name.
        username: String,
        /// Account password.
        password: String,
    },
    /// Forget the stored session.
    Logout,
    /// Show the logged-in account.
    Whoami,
    /// List catalog entries.
    Boxes {
        /// Include unpublished entries (administrators only).
        #[arg(long)]
        all: bool,
    },
    /// List user accounts (administrators only).
    Users,
    /// Search published entries.
    Search {
        /// Search keyword.
        keyword: String,
    },
    /// Buy one draw.
    Buy {
        /// Catalog entry id.
        box_id: i64,
    },
    /// Delete a catalog entry (administrators only).
    DeleteBox {
        /// Catalog entry id.
        id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .with_writer(io::stderr)
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let args = CliArgs::parse();
    let settings = resolve_settings(&args)?;
    let client = StorefrontClient::connect(&settings).wrap_err("configure client")?;
    run(&client, args.command).await
}

fn resolve_settings(args: &CliArgs) -> Result<ClientSettings> {
    let mut settings = ClientSettings::load_from_iter([OsString::from("storefront")])
        .map_err(|error| eyre!("load configuration: {error}"))?;
    if let Some(base) = &args.api_base {
        settings.api_base = Some(base.clone());
    }
    settings.session_file = args
        .session_file
        .clone()
        .or(settings.session_file)
        .or_else(|| Some(PathBuf::from(DEFAULT_SESSION_FILE)));
    Ok(settings)
}

async fn run(client: &StorefrontClient, command: Command) -> Result<()> {
    let mut out = io::stdout().lock();
    match command {
        Command::Login { username, password } => {
            let credentials = LoginCredentials::try_from_parts(&username, &password)?;
            let outcome = client.auth().login(&credentials).await?;
            emit(
                &mut out,
                &json!({
                    "userId": outcome.user_id,
                    "username": outcome.username,
                    "role": outcome.role,
                }),
            )
        }
        Command::Logout => {
            client.auth().logout()?;
            emit(&mut out, &json!({ "loggedIn": false }))
        }
        Command::Whoami => emit(&mut out, &client.auth().current_user().await?),
        Command::Boxes { all } => {
            let catalog = client.catalog();
            let outcome = if all {
                catalog.fetch_all().await
            } else {
                catalog.fetch().await
            };
            settle(outcome)?;
            for entry in &catalog.snapshot().items {
                emit(&mut out, &**entry)?;
            }
            Ok(())
        }
        Command::Users => {
            let users = client.users();
            settle(users.fetch().await)?;
            for user in &users.snapshot().items {
                emit(&mut out, &**user)?;
            }
            Ok(())
        }
        Command::Search { keyword } => {
            for entry in client.storefront().search(&keyword).await? {
                emit(&mut out, &entry)?;
            }
            Ok(())
        }
        Command::Buy { box_id } => {
            let result = client.storefront().buy(BoxId::new(box_id)).await?;
            let variant = result.variant.map(|item| item.name);
            emit(
                &mut out,
                &json!({
                    "variant": variant,
                    "isNew": result.is_new,
                    "balance": result.balance,
                }),
            )
        }
        Command::DeleteBox { id } => {
            client.admin_catalog().remove(BoxId::new(id)).await?;
            emit(&mut out, &json!({ "deleted": id }))
        }
    }
}

fn settle(outcome: FetchOutcome) -> Result<()> {
    match outcome {
        FetchOutcome::Applied { .. } => Ok(()),
        FetchOutcome::Failed { message } => Err(eyre!(message)),
        FetchOutcome::NotPermitted => Err(eyre!("administrator role required")),
        other => Err(eyre!("fetch did not complete: {other:?}")),
    }
}

fn emit(out: &mut impl Write, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    //! Unit tests for argument handling.

    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&["storefront", "boxes", "--all"], true)]
    #[case(&["storefront", "boxes"], false)]
    fn boxes_accepts_the_all_flag(#[case] argv: &[&str], #[case] expected: bool) {
        let args = CliArgs::try_parse_from(argv).expect("arguments should parse");
        let Command::Boxes { all } = args.command else {
            panic!("expected the boxes command");
        };
        assert_eq!(all, expected);
    }

    #[test]
    fn global_overrides_follow_the_subcommand() {
        let args = CliArgs::try_parse_from([
            "storefront",
            "delete-box",
            "7",
            "--api-base",
            "http://shop.test/api",
        ])
        .expect("arguments should parse");
        assert_eq!(args.api_base.as_deref(), Some("http://shop.test/api"));
        assert!(matches!(args.command, Command::DeleteBox { id: 7 }));
    }

    #[rstest]
    #[case(FetchOutcome::Applied { count: 0 }, true)]
    #[case(FetchOutcome::NotPermitted, false)]
    #[case(FetchOutcome::Failed { message: "down".to_owned() }, false)]
    fn only_applied_fetches_settle(#[case] outcome: FetchOutcome, #[case] ok: bool) {
        assert_eq!(settle(outcome).is_ok(), ok);
    }

    #[test]
    fn emitted_values_are_json_lines() {
        let mut buffer = Vec::new();
        emit(&mut buffer, &json!({"id": 1})).expect("emit");
        emit(&mut buffer, &json!({"id": 2})).expect("emit");
        assert_eq!(String::from_utf8(buffer).expect("utf8"), "{\"id\":1}\n{\"id\":2}\n");
    }
}
