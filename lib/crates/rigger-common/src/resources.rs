//! Desired/observed state records, one per resource kind.
//!
//! These carry no behavior beyond identity. Fields marked "computed" are
//! filled in by the reconciler after querying the target.

use serde::{Deserialize, Deserializer, Serialize};

/// Identity of a resource instance within its kind.
pub trait Resource {
    /// Stable kind name, e.g. `"user"`.
    const KIND: &'static str;

    /// Identity attribute (name, path, or composite).
    fn id(&self) -> String;
}

/// A local account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub name: String,
    /// Computed.
    #[serde(default)]
    pub uid: Option<u32>,
    /// Supplementary group ids.
    #[serde(default)]
    pub groups: Vec<u32>,
}

/// A local group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Group {
    pub name: String,
    /// Computed.
    #[serde(default)]
    pub gid: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Directory {
    pub path: String,
    pub mode: String,
    pub owner: u32,
    pub group: u32,
    /// Directories are left in place on delete unless this is set.
    #[serde(default)]
    pub remove_on_delete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct File {
    pub path: String,
    pub mode: String,
    pub owner: u32,
    pub group: u32,
    pub content: String,
}

/// Ensures a single line is present in a file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineInFile {
    pub path: String,
    pub line: String,
    /// When set, the first line matching this pattern is replaced.
    #[serde(default)]
    pub regexp: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AptPackage {
    #[serde(deserialize_with = "unquoted")]
    pub name: String,
    /// Declares the package must not be installed.
    #[serde(default)]
    pub absent: bool,
}

/// Strip whitespace and literal surrounding quote characters from a package
/// name. Names arrive quoted from some callers and bare from others.
#[must_use]
pub fn normalize_package_name(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c: char| c == '"' || c == '\'')
        .trim()
        .to_string()
}

fn unquoted<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(normalize_package_name(&raw))
}

/// A batch declaration of apt packages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AptPackages {
    pub packages: Vec<AptPackage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AptRepository {
    pub name: String,
    /// ASCII-armored GPG key.
    pub key: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    #[default]
    Rsa,
    Ed25519,
    Ecdsa,
    Dsa,
}

impl KeyType {
    /// Name accepted by `ssh-keygen -t`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rsa => "rsa",
            Self::Ed25519 => "ed25519",
            Self::Ecdsa => "ecdsa",
            Self::Dsa => "dsa",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SshKey {
    /// Private key path; the public key lives at `<path>.pub`.
    pub path: String,
    #[serde(default)]
    pub key_type: KeyType,
    #[serde(default)]
    pub key_size: Option<u32>,
    /// Computed.
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default)]
    pub owner: Option<u32>,
    #[serde(default)]
    pub group: Option<u32>,
    #[serde(default)]
    pub mode: Option<String>,
}

/// One line of an `authorized_keys` file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SshAuthorizedKey {
    pub path: String,
    /// `<algorithm> <base64>` public key.
    pub key: String,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DockerImageLoad {
    /// Local path of the image tarball.
    pub path: String,
    /// Computed: content-addressed id of the loaded image.
    #[serde(default)]
    pub image_sha: Option<String>,
    /// Computed: digest of the tarball's image config reference.
    #[serde(default)]
    pub content_hash: Option<String>,
    /// Remove the image from the target on delete.
    #[serde(default)]
    pub remove_on_delete: bool,
}

impl Resource for User {
    const KIND: &'static str = "user";
    fn id(&self) -> String {
        self.name.clone()
    }
}

impl Resource for Group {
    const KIND: &'static str = "group";
    fn id(&self) -> String {
        self.name.clone()
    }
}

impl Resource for Directory {
    const KIND: &'static str = "directory";
    fn id(&self) -> String {
        self.path.clone()
    }
}

impl Resource for File {
    const KIND: &'static str = "file";
    fn id(&self) -> String {
        self.path.clone()
    }
}

impl Resource for LineInFile {
    const KIND: &'static str = "line_in_file";
    fn id(&self) -> String {
        self.path.clone()
    }
}

impl Resource for AptPackages {
    const KIND: &'static str = "apt_packages";
    fn id(&self) -> String {
        let mut names: Vec<&str> = self.packages.iter().map(|p| p.name.as_str()).collect();
        names.sort_unstable();
        names.join(",")
    }
}

impl Resource for AptRepository {
    const KIND: &'static str = "apt_repository";
    fn id(&self) -> String {
        self.name.clone()
    }
}

impl Resource for SshKey {
    const KIND: &'static str = "ssh_key";
    fn id(&self) -> String {
        self.path.clone()
    }
}

impl Resource for SshAuthorizedKey {
    const KIND: &'static str = "ssh_authorized_key";
    fn id(&self) -> String {
        format!("{}:{}", self.path, self.key)
    }
}

impl Resource for DockerImageLoad {
    const KIND: &'static str = "docker_image_load";
    fn id(&self) -> String {
        self.path.clone()
    }
}
