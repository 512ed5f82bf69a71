//! Kinds command: list the registered resource kinds.

use anyhow::Result;

use crate::application::registry::REGISTRY;
use crate::output::{HumanRenderer, OutputContext, json};

/// Run the kinds command.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn run(ctx: &OutputContext, json: bool) -> Result<()> {
    if json {
        let kinds: Vec<serde_json::Value> = REGISTRY
            .iter()
            .map(|k| serde_json::json!({ "name": k.name(), "description": k.description() }))
            .collect();
        println!("{}", json::format_value(&kinds)?);
    } else {
        HumanRenderer::new(ctx).render_kinds();
    }
    Ok(())
}
