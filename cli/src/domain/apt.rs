//! Apt package-set planning, repository file layout and `apt-get update`
//! output classification.

use std::collections::{BTreeSet, HashSet};

use rigger_common::AptPackage;

use crate::domain::command::Cmd;

/// Directory holding repository signing keys.
pub const KEYRING_DIR: &str = "/etc/apt/keyrings";

/// Directory holding repository source lists.
pub const SOURCES_DIR: &str = "/etc/apt/sources.list.d";

/// `dpkg-query -f` format: package name and abbreviated status, tab separated.
pub const DPKG_QUERY_FORMAT: &str = "${Package}\t${db:Status-Abbrev}\n";

/// Markers in `apt-get update` output that mean a repository is unusable even
/// though the command exited zero.
const UPDATE_FAILURE_MARKERS: &[&str] = &[
    "Failed to fetch",
    "NO_PUBKEY",
    "EXPKEYSIG",
    "KEYEXPIRED",
    "is not signed",
];

/// Non-interactive `apt-get <action> -y -q`.
#[must_use]
pub fn apt_get(action: &str) -> Cmd {
    Cmd::privileged("env").args(["DEBIAN_FRONTEND=noninteractive", "apt-get", action, "-y", "-q"])
}

#[must_use]
pub fn key_path(name: &str) -> String {
    format!("{KEYRING_DIR}/{name}.asc")
}

#[must_use]
pub fn list_path(name: &str) -> String {
    format!("{SOURCES_DIR}/{name}.list")
}

/// The single `deb` line written to a repository's source list.
#[must_use]
pub fn sources_line(name: &str, arch: &str, codename: &str, url: &str) -> String {
    format!(
        "deb [arch={arch} signed-by={}] {url} {codename} main\n",
        key_path(name)
    )
}

/// Extract the repository URL from a source list written by [`sources_line`].
#[must_use]
pub fn parse_sources_url(list: &str) -> Option<String> {
    let line = list.lines().find(|l| l.trim_start().starts_with("deb "))?;
    let rest = match (line.find('['), line.find(']')) {
        (Some(open), Some(close)) if open < close => &line[close + 1..],
        _ => line.trim_start().strip_prefix("deb")?,
    };
    rest.split_whitespace().next().map(str::to_string)
}

/// Release codename from `/etc/os-release`.
#[must_use]
pub fn parse_codename(os_release: &str) -> Option<String> {
    let lookup = |key: &str| {
        os_release.lines().find_map(|line| {
            let value = line.strip_prefix(key)?.strip_prefix('=')?;
            let value = value.trim().trim_matches('"');
            (!value.is_empty()).then(|| value.to_string())
        })
    };
    lookup("VERSION_CODENAME").or_else(|| lookup("UBUNTU_CODENAME"))
}

/// First line of `apt-get update` output that reports an unusable repository.
#[must_use]
pub fn update_failure(output: &str) -> Option<String> {
    output
        .lines()
        .find(|line| UPDATE_FAILURE_MARKERS.iter().any(|m| line.contains(m)))
        .map(|line| line.trim().to_string())
}

/// Installed package names from `dpkg-query -W -f` [`DPKG_QUERY_FORMAT`] output.
///
/// A package counts as installed when the second status letter is `i`
/// (`ii`, `hi`, ...); removed-but-configured packages (`rc`) do not.
#[must_use]
pub fn parse_installed(output: &str) -> HashSet<String> {
    output
        .lines()
        .filter_map(|line| {
            let (name, status) = line.split_once('\t')?;
            (status.chars().nth(1) == Some('i')).then(|| name.trim().to_string())
        })
        .collect()
}

/// The two batches a package declaration turns into.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PackagePlan {
    pub install: Vec<String>,
    pub remove: Vec<String>,
}

impl PackagePlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.install.is_empty() && self.remove.is_empty()
    }
}

/// Plan the batches to move from the `prior` declaration to `desired`.
///
/// - install: declared present in `desired` and not installed
/// - remove: installed and either declared absent in `desired`, or declared
///   present in `prior` and no longer mentioned in `desired`
///
/// Packages that are not mentioned by either declaration are never touched.
#[must_use]
pub fn plan_packages(
    prior: &[AptPackage],
    desired: &[AptPackage],
    installed: &HashSet<String>,
) -> PackagePlan {
    let mentioned: HashSet<&str> = desired.iter().map(|p| p.name.as_str()).collect();

    let install: BTreeSet<String> = desired
        .iter()
        .filter(|p| !p.absent && !installed.contains(&p.name))
        .map(|p| p.name.clone())
        .collect();

    let declared_absent = desired.iter().filter(|p| p.absent).map(|p| &p.name);
    let dropped = prior
        .iter()
        .filter(|p| !p.absent && !mentioned.contains(p.name.as_str()))
        .map(|p| &p.name);
    let remove: BTreeSet<String> = declared_absent
        .chain(dropped)
        .filter(|name| installed.contains(*name))
        .cloned()
        .collect();

    PackagePlan {
        install: install.into_iter().collect(),
        remove: remove.into_iter().collect(),
    }
}

/// Reflect the installed set back onto a declaration: a package declared
/// present but not installed reads as absent and vice versa.
#[must_use]
pub fn observe_packages(declared: &[AptPackage], installed: &HashSet<String>) -> Vec<AptPackage> {
    declared
        .iter()
        .map(|p| AptPackage {
            name: p.name.clone(),
            absent: !installed.contains(&p.name),
        })
        .collect()
}
