//! Image tarball hashing: implements `ImageHasher` over `docker save` and
//! OCI layout archives, plain or gzip-compressed.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use serde::Deserialize;

use crate::application::ports::ImageHasher;
use crate::domain::docker::content_hash;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// One entry of a `docker save` `manifest.json`.
#[derive(Deserialize)]
struct ManifestEntry {
    #[serde(rename = "Config")]
    config: String,
}

/// OCI image layout `index.json`.
#[derive(Deserialize)]
struct OciIndex {
    manifests: Vec<OciDescriptor>,
}

#[derive(Deserialize)]
struct OciDescriptor {
    digest: String,
}

/// Production `ImageHasher` reading the archive from the local filesystem.
pub struct TarImageHasher;

impl ImageHasher for TarImageHasher {
    fn content_hash(&self, path: &Path) -> Result<String> {
        let refs = config_refs(path)?;
        Ok(content_hash(&refs))
    }
}

fn open(path: &Path) -> Result<Box<dyn Read>> {
    let mut file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut magic = [0u8; 2];
    let gzipped = file.read_exact(&mut magic).is_ok() && magic == GZIP_MAGIC;
    file.seek(SeekFrom::Start(0))
        .with_context(|| format!("rewinding {}", path.display()))?;
    let reader = BufReader::new(file);
    Ok(if gzipped {
        Box::new(GzDecoder::new(reader))
    } else {
        Box::new(reader)
    })
}

/// Image config references of the archive: `Config` paths from
/// `manifest.json`, or manifest digests from an OCI `index.json`.
fn config_refs(path: &Path) -> Result<Vec<String>> {
    let mut archive = tar::Archive::new(open(path)?);
    let mut oci: Option<Vec<String>> = None;

    for entry in archive
        .entries()
        .with_context(|| format!("reading {} as tar", path.display()))?
    {
        let mut entry = entry.with_context(|| format!("reading entry of {}", path.display()))?;
        let name = entry.path()?.to_string_lossy().trim_start_matches("./").to_string();
        match name.as_str() {
            "manifest.json" => {
                let manifest: Vec<ManifestEntry> = serde_json::from_reader(&mut entry)
                    .with_context(|| format!("parsing manifest.json in {}", path.display()))?;
                return Ok(manifest.into_iter().map(|m| m.config).collect());
            }
            "index.json" => {
                let index: OciIndex = serde_json::from_reader(&mut entry)
                    .with_context(|| format!("parsing index.json in {}", path.display()))?;
                oci = Some(index.manifests.into_iter().map(|m| m.digest).collect());
            }
            _ => {}
        }
    }
    oci.with_context(|| format!("{} is not an image archive (no manifest.json)", path.display()))
}
