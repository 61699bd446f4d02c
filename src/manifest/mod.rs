mod schema;

pub use schema::*;

use anyhow::{bail, Context, Result};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Registry shipped with the binary
const BUILTIN: &str = include_str!("../../registry/default.yaml");

/// Input source for manifest loading
#[derive(Debug, Clone)]
pub enum ManifestSource {
    Builtin,
    File(PathBuf),
    Url(String),
    Stdin,
}

impl ManifestSource {
    /// Parse from command line argument
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg {
            None => Self::Builtin,
            Some("-") => Self::Stdin,
            Some(s) if s.starts_with("http://") || s.starts_with("https://") => {
                Self::Url(s.to_string())
            }
            Some(s) => Self::File(PathBuf::from(s)),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Builtin => "built-in registry".into(),
            Self::File(path) => path.display().to_string(),
            Self::Url(url) => url.clone(),
            Self::Stdin => "stdin".into(),
        }
    }
}

/// Load and validate a manifest from any supported source
pub fn load(source: &ManifestSource) -> Result<Manifest> {
    let manifest = match source {
        ManifestSource::Builtin => parse_yaml(BUILTIN)?,
        ManifestSource::File(path) => load_from_file(path)?,
        ManifestSource::Url(url) => load_from_url(url)?,
        ManifestSource::Stdin => load_from_stdin()?,
    };

    validate(&manifest)?;
    tracing::debug!(
        source = %source.describe(),
        packages = manifest.packages.len(),
        "loaded manifest"
    );

    Ok(manifest)
}

/// Load manifest from a file (YAML, JSON, or TOML)
fn load_from_file(path: &Path) -> Result<Manifest> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {}", path.display()))?;

    match path.extension().and_then(|e| e.to_str()).unwrap_or("") {
        "yaml" | "yml" => parse_yaml(&content),
        "json" => parse_json(&content),
        "toml" => parse_toml(&content),
        _ => parse_auto(&content),
    }
}

/// Load manifest from URL
fn load_from_url(url: &str) -> Result<Manifest> {
    let response = ureq::get(url)
        .call()
        .with_context(|| format!("Failed to fetch manifest from URL: {}", url))?;

    let content = response
        .into_string()
        .context("Failed to read response body")?;

    if url.ends_with(".toml") {
        parse_toml(&content)
    } else {
        parse_auto(&content)
    }
}

/// Load manifest from stdin
fn load_from_stdin() -> Result<Manifest> {
    let mut content = String::new();
    io::stdin()
        .read_to_string(&mut content)
        .context("Failed to read manifest from stdin")?;

    parse_auto(&content)
}

fn parse_yaml(content: &str) -> Result<Manifest> {
    serde_yaml::from_str(content).context("Failed to parse YAML manifest")
}

fn parse_json(content: &str) -> Result<Manifest> {
    serde_json::from_str(content).context("Failed to parse JSON manifest")
}

fn parse_toml(content: &str) -> Result<Manifest> {
    toml::from_str(content).context("Failed to parse TOML manifest")
}

/// Auto-detect format and parse
fn parse_auto(content: &str) -> Result<Manifest> {
    let trimmed = content.trim();

    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        parse_json(content)
    } else {
        parse_yaml(content)
    }
}

fn validate(manifest: &Manifest) -> Result<()> {
    for (index, request) in manifest.packages.iter().enumerate() {
        if request.name.trim().is_empty() {
            bail!("Package entry #{} has an empty name", index + 1);
        }
    }

    if manifest.settings.helper.trim().is_empty() {
        bail!("settings.helper must name an AUR helper");
    }

    if manifest.settings.query_timeout_secs == 0 || manifest.settings.install_timeout_secs == 0 {
        bail!("settings timeouts must be at least one second");
    }

    Ok(())
}

/// Restrict the registry to the entry matching `query`
pub fn select_only(manifest: &mut Manifest, query: &str) -> Result<()> {
    manifest.packages.retain(|request| request.matches(query));

    if manifest.packages.is_empty() {
        bail!("No registry entry named '{}'", query);
    }

    Ok(())
}
