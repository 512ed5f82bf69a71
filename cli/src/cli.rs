//! CLI argument parsing with clap derive

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands::lifecycle::{CreateArgs, StateArgs, UpdateArgs};
use crate::commands::{self, ConnectionArgs};
use crate::output::OutputContext;

/// Provision machines over SSH from declarative resources
#[derive(Parser)]
#[command(
    name = "rigger",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a resource from its desired model
    Create(CreateArgs),

    /// Refresh tracked state from the machine
    Read(StateArgs),

    /// Converge a resource from its prior state to a desired model
    Update(UpdateArgs),

    /// Remove a resource
    Delete(StateArgs),

    /// List resource kinds
    Kinds,

    /// Print the server host key fingerprint for pinning
    HostKey,

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid or the command fails
    /// before producing a response.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            json,
            quiet,
            no_color,
            connection,
            command,
        } = self;
        let ctx = OutputContext::new(no_color, quiet);
        match command {
            Command::Create(args) => {
                let op = args.operation()?;
                commands::lifecycle::run(&ctx, &connection, args.kind, op, json).await
            }
            Command::Read(args) => {
                let op = args.read()?;
                commands::lifecycle::run(&ctx, &connection, args.kind, op, json).await
            }
            Command::Update(args) => {
                let op = args.operation()?;
                commands::lifecycle::run(&ctx, &connection, args.kind, op, json).await
            }
            Command::Delete(args) => {
                let op = args.delete()?;
                commands::lifecycle::run(&ctx, &connection, args.kind, op, json).await
            }
            Command::Kinds => commands::kinds::run(&ctx, json).map(|()| ExitCode::SUCCESS),
            Command::HostKey => commands::host_key::run(&ctx, &connection, json)
                .await
                .map(|()| ExitCode::SUCCESS),
            Command::Version => {
                commands::version::run(&ctx, json);
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}
