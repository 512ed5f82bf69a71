//! Host-key command: print the server's host key fingerprint for pinning.

use anyhow::Result;

use crate::commands::ConnectionArgs;
use crate::domain::ConfigError;
use crate::infra::ssh_builder::probe_host_key;
use crate::output::{HumanRenderer, OutputContext, json, progress};

/// Run the host-key command.
///
/// # Errors
///
/// Returns an error if host or port is not configured, or the server cannot
/// be reached.
pub async fn run(ctx: &OutputContext, conn: &ConnectionArgs, json: bool) -> Result<()> {
    let config = conn.resolve()?;
    let host = config
        .connection
        .host
        .filter(|h| !h.trim().is_empty())
        .ok_or(ConfigError::Missing("host"))?;
    let port = config.connection.port.ok_or(ConfigError::Missing("port"))?;
    let address = format!("{host}:{port}");

    let pb = (!json && ctx.show_progress())
        .then(|| progress::spinner(&format!("Reading host key of {address}...")));
    let fingerprint = match probe_host_key(host, port).await {
        Ok(fp) => {
            if let Some(pb) = &pb {
                pb.finish_and_clear();
            }
            fp
        }
        Err(e) => {
            if let Some(pb) = &pb {
                progress::finish_error(pb, "Host key not read");
            }
            return Err(e);
        }
    };

    if json {
        let obj = serde_json::json!({ "address": address, "fingerprint": fingerprint });
        println!("{}", json::format_value(&obj)?);
    } else {
        HumanRenderer::new(ctx).render_host_key(&address, &fingerprint);
    }
    Ok(())
}
