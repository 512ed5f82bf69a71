//! Parsing of `docker load` output and staging paths for image tarballs.

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::domain::command::Cmd;

/// Remote path a local tarball is staged at before `docker load`.
#[must_use]
pub fn staging_path(local: &Path) -> String {
    let name = local
        .file_name()
        .map_or_else(|| "image.tar".into(), |n| n.to_string_lossy());
    format!("/tmp/rigger-{name}")
}

/// Image reference reported by `docker load`, tagged (`Loaded image: app:1`)
/// or untagged (`Loaded image ID: sha256:...`). The last one wins when a
/// tarball carries several images.
#[must_use]
pub fn parse_loaded_image(output: &str) -> Option<String> {
    output
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            line.strip_prefix("Loaded image ID:")
                .or_else(|| line.strip_prefix("Loaded image:"))
        })
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .next_back()
        .map(str::to_string)
}

/// Content hash over the image config references found in a tarball.
///
/// The references are themselves content-addressed digests, so two archives
/// carrying the same images hash alike whatever their path or compression.
#[must_use]
pub fn content_hash(config_refs: &[String]) -> String {
    let mut hasher = Sha256::new();
    for r in config_refs {
        hasher.update(r.as_bytes());
        hasher.update(b"\n");
    }
    format!("sha256:{}", hex_encode(&hasher.finalize()))
}

#[must_use]
pub fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(char::from(HEX[(b >> 4) as usize]));
        out.push(char::from(HEX[(b & 0xf) as usize]));
    }
    out
}

#[must_use]
pub fn inspect_id_cmd(reference: &str) -> Cmd {
    Cmd::privileged("docker")
        .args(["image", "inspect", "--format", "{{.Id}}"])
        .arg(reference)
}

/// Whether `docker image inspect` failed because the image is gone.
#[must_use]
pub fn is_missing_image(output: &str) -> bool {
    let lower = output.to_ascii_lowercase();
    lower.contains("no such image") || lower.contains("no such object")
}
