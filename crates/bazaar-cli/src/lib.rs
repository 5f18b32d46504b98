// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Operator CLI for a bazaar deployment: schema migration, session tokens,
//! role changes and database inspection.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode as ProcessExitCode;

use bazaar_core::{ExitCode, MachineError};
use clap::{error::ErrorKind, ArgAction, Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

pub const CRATE_NAME: &str = "bazaar-cli";

const BAZAAR_HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
Usage: {usage}

Options:
{options}

Commands:
{subcommands}
{after-help}";

#[derive(Parser)]
#[command(name = "bazaar")]
#[command(version)]
#[command(about = "Bazaar marketplace operations CLI")]
#[command(help_template = BAZAAR_HELP_TEMPLATE)]
#[command(
    after_help = "Environment:\n  BAZAAR_TOKEN_SECRET   Session token signing secret\n  RUST_LOG              Log filter override"
)]
struct Cli {
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    #[arg(long, global = true, default_value_t = false)]
    quiet: bool,
    #[arg(long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema.
    Migrate {
        #[arg(long)]
        db: PathBuf,
    },
    /// Issue or check session tokens.
    Token {
        #[command(subcommand)]
        command: TokenCommand,
    },
    User {
        #[command(subcommand)]
        command: UserCommand,
    },
    /// Set the marketplace commission as a ratio, e.g. 0.12.
    SetCommission {
        #[arg(long)]
        db: PathBuf,
        #[arg(long)]
        rate: f64,
    },
    /// Print schema version, row counts and settings.
    InspectDb {
        #[arg(long)]
        db: PathBuf,
    },
    Version,
}

#[derive(Subcommand)]
enum TokenCommand {
    Issue {
        #[arg(long)]
        sub: String,
        #[arg(long, default_value_t = 3600)]
        ttl_secs: i64,
        /// Falls back to BAZAAR_TOKEN_SECRET.
        #[arg(long)]
        secret: Option<String>,
    },
    Verify {
        #[arg(long)]
        token: String,
        #[arg(long)]
        secret: Option<String>,
    },
}

#[derive(Subcommand)]
enum UserCommand {
    /// Set a user's role, provisioning the user if needed.
    Promote {
        #[arg(long)]
        db: PathBuf,
        #[arg(long)]
        user: String,
        #[arg(long, default_value = "admin")]
        role: String,
    },
}

#[derive(Debug)]
pub(crate) struct CliError {
    exit_code: ExitCode,
    machine: MachineError,
}

impl CliError {
    pub(crate) fn usage(message: &str) -> Self {
        Self {
            exit_code: ExitCode::Usage,
            machine: MachineError::new("usage_error", message),
        }
    }

    pub(crate) fn validation(message: String) -> Self {
        Self {
            exit_code: ExitCode::Validation,
            machine: MachineError::new("validation_error", &message),
        }
    }

    pub(crate) fn dependency(message: String) -> Self {
        Self {
            exit_code: ExitCode::DependencyFailure,
            machine: MachineError::new("dependency_failure", &message),
        }
    }

    pub(crate) fn internal(message: String) -> Self {
        Self {
            exit_code: ExitCode::Internal,
            machine: MachineError::new("internal_error", &message),
        }
    }

    pub(crate) fn with_detail(mut self, key: &str, value: &str) -> Self {
        self.machine = self.machine.with_detail(key, value);
        self
    }
}

#[derive(Clone, Copy)]
pub(crate) struct OutputMode {
    pub json: bool,
    pub quiet: bool,
}

pub fn main_entry() -> ProcessExitCode {
    let wants_json = std::env::args().any(|arg| arg == "--json");
    match run() {
        Ok(()) => ExitCode::Success.into(),
        Err(err) => {
            emit_error(&err, wants_json);
            err.exit_code.into()
        }
    }
}

fn run() -> Result<(), CliError> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{err}");
                return Ok(());
            }
            _ => {
                return Err(CliError::usage("invalid command line arguments")
                    .with_detail("error", &err.to_string()));
            }
        },
    };
    init_logging(cli.quiet, cli.verbose);
    let output = OutputMode {
        json: cli.json,
        quiet: cli.quiet,
    };
    let command = cli
        .command
        .ok_or_else(|| CliError::usage("missing command; see --help"))?;

    let payload = match command {
        Commands::Migrate { db } => commands::migrate(&db)?,
        Commands::Token { command } => match command {
            TokenCommand::Issue {
                sub,
                ttl_secs,
                secret,
            } => commands::issue_token(&sub, ttl_secs, secret)?,
            TokenCommand::Verify { token, secret } => commands::verify_token(&token, secret)?,
        },
        Commands::User { command } => match command {
            UserCommand::Promote { db, user, role } => commands::promote_user(&db, &user, &role)?,
        },
        Commands::SetCommission { db, rate } => commands::set_commission(&db, rate)?,
        Commands::InspectDb { db } => commands::inspect_db(&db)?,
        Commands::Version => commands::version(),
    };
    emit_payload(&payload, output)
}

fn init_logging(quiet: bool, verbose: u8) {
    let default = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// JSON mode prints the payload on one line; otherwise top-level fields
/// print as `key=value`.
fn emit_payload(payload: &Value, output: OutputMode) -> Result<(), CliError> {
    if output.quiet {
        return Ok(());
    }
    if output.json {
        let line = serde_json::to_string(payload).map_err(|e| CliError::internal(e.to_string()))?;
        println!("{line}");
        return Ok(());
    }
    match payload {
        Value::Object(fields) => {
            for (key, value) in fields {
                match value {
                    Value::String(s) => println!("{key}={s}"),
                    other => println!("{key}={other}"),
                }
            }
        }
        other => println!("{other}"),
    }
    Ok(())
}

fn emit_error(error: &CliError, machine_json: bool) {
    if machine_json {
        match serde_json::to_string(&error.machine) {
            Ok(payload) => eprintln!("{payload}"),
            Err(_) => eprintln!(
                "{{\"code\":\"internal_error\",\"message\":\"failed to encode structured error\",\"details\":{{}}}}"
            ),
        }
    } else {
        eprintln!("{}", error.machine.message);
        for (key, value) in &error.machine.details {
            eprintln!("  {key}: {value}");
        }
    }
}
