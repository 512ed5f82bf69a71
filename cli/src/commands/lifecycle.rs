//! Lifecycle commands: create, read, update, and delete one resource.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;

use crate::application::registry::{Operation, ResourceKind, Response, dispatch};
use crate::commands::ConnectionArgs;
use crate::infra::image::TarImageHasher;
use crate::infra::machine::LazyMachine;
use crate::infra::ssh_builder::SshSessionBuilder;
use crate::output::{HumanRenderer, OutputContext, json, progress};

/// Arguments for `create`.
#[derive(Args)]
pub struct CreateArgs {
    /// Resource kind (see `rigger kinds`)
    pub kind: ResourceKind,

    /// Desired model as inline JSON, or @path to a JSON file
    #[arg(long)]
    pub desired: String,
}

/// Arguments for `read` and `delete`.
#[derive(Args)]
pub struct StateArgs {
    /// Resource kind (see `rigger kinds`)
    pub kind: ResourceKind,

    /// Tracked state as inline JSON, or @path to a JSON file
    #[arg(long)]
    pub state: String,
}

/// Arguments for `update`.
#[derive(Args)]
pub struct UpdateArgs {
    /// Resource kind (see `rigger kinds`)
    pub kind: ResourceKind,

    /// Prior state as inline JSON, or @path to a JSON file
    #[arg(long)]
    pub prior: String,

    /// Desired model as inline JSON, or @path to a JSON file
    #[arg(long)]
    pub desired: String,
}

impl CreateArgs {
    /// # Errors
    ///
    /// Returns an error if the input is not readable JSON.
    pub fn operation(&self) -> Result<Operation> {
        Ok(Operation::Create {
            desired: parse_input(&self.desired, "desired")?,
        })
    }
}

impl StateArgs {
    /// # Errors
    ///
    /// Returns an error if the input is not readable JSON.
    pub fn read(&self) -> Result<Operation> {
        Ok(Operation::Read {
            state: parse_input(&self.state, "state")?,
        })
    }

    /// # Errors
    ///
    /// Returns an error if the input is not readable JSON.
    pub fn delete(&self) -> Result<Operation> {
        Ok(Operation::Delete {
            state: parse_input(&self.state, "state")?,
        })
    }
}

impl UpdateArgs {
    /// # Errors
    ///
    /// Returns an error if either input is not readable JSON.
    pub fn operation(&self) -> Result<Operation> {
        Ok(Operation::Update {
            prior: parse_input(&self.prior, "prior")?,
            desired: parse_input(&self.desired, "desired")?,
        })
    }
}

/// Parse a `<json|@file>` argument.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the text is not JSON.
pub fn parse_input(raw: &str, role: &str) -> Result<Value> {
    let text = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("cannot read --{role} file {path}"))?,
        None => raw.to_string(),
    };
    serde_json::from_str(&text).with_context(|| format!("--{role} is not valid JSON"))
}

/// Run one lifecycle call and print the response.
///
/// Exits non-zero when the response carries an error diagnostic.
///
/// # Errors
///
/// Returns an error if the provider config cannot be loaded or is invalid.
/// Failures of the call itself are reported as diagnostics instead.
pub async fn run(
    ctx: &OutputContext,
    conn: &ConnectionArgs,
    kind: ResourceKind,
    op: Operation,
    json: bool,
) -> Result<ExitCode> {
    let config = conn.resolve()?;
    if !config.connection.local {
        SshSessionBuilder::from_config(&config.connection).validate()?;
    }

    let op_name = op.name();
    let machine = LazyMachine::new(config);
    let pb = (!json && ctx.show_progress())
        .then(|| progress::spinner(&format!("Running {kind} {op_name}...")));
    let response = dispatch(kind, op, &machine, &TarImageHasher).await;
    if let Some(pb) = &pb {
        if response.has_errors() {
            progress::finish_error(pb, &format!("{kind} {op_name}"));
        } else {
            progress::finish_ok(pb, &format!("{kind} {op_name}"));
        }
    }
    tracing::debug!(connected = machine.is_connected(), "lifecycle call finished");

    render(ctx, kind, op_name, &response, json)?;
    Ok(if response.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn render(
    ctx: &OutputContext,
    kind: ResourceKind,
    op_name: &str,
    response: &Response,
    json: bool,
) -> Result<()> {
    if json {
        println!("{}", json::format_value(response)?);
    } else {
        HumanRenderer::new(ctx).render_response(kind.name(), op_name, response);
    }
    Ok(())
}
