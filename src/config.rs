//! Package manifest (`rescript.json`) model and per-invocation cache.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Manifest file name looked for at every package root
pub const MANIFEST_FILE: &str = "rescript.json";

/// Typed view over the manifest fields the indexer consumes
///
/// Unknown fields survive in the raw JSON blob stored on the package row,
/// not here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub name: Option<String>,
    pub sources: Option<Value>,
    pub dependencies: Vec<String>,
    #[serde(rename = "dev-dependencies")]
    pub dev_dependencies: Vec<String>,
    #[serde(rename = "bs-dependencies")]
    pub bs_dependencies: Vec<String>,
    #[serde(rename = "bs-dev-dependencies")]
    pub bs_dev_dependencies: Vec<String>,
    #[serde(rename = "compiler-flags")]
    pub compiler_flags: Vec<String>,
}

impl Manifest {
    /// Directories holding human-authored sources, relative to the package root
    ///
    /// # Behavior
    /// `sources` may be a plain string, an array mixing strings and
    /// `{"dir": ...}` objects, or a single `{"dir": ...}` object. An absent
    /// field defaults to `["src"]`; a present but unrecognized form yields
    /// an empty list.
    pub fn source_dirs(&self) -> Vec<String> {
        let sources = match &self.sources {
            None => return vec!["src".to_string()],
            Some(value) => value,
        };

        let mut dirs = Vec::new();
        match sources {
            Value::String(s) => dirs.push(s.clone()),
            Value::Array(items) => {
                for item in items {
                    match item {
                        Value::String(s) => dirs.push(s.clone()),
                        Value::Object(obj) => {
                            if let Some(Value::String(dir)) = obj.get("dir") {
                                dirs.push(dir.clone());
                            }
                        }
                        _ => {}
                    }
                }
            }
            Value::Object(obj) => {
                if let Some(Value::String(dir)) = obj.get("dir") {
                    dirs.push(dir.clone());
                }
            }
            _ => {}
        }
        dirs
    }

    /// All dependency names across the four manifest lists
    ///
    /// Used by monorepo-root detection; dependency resolution during sync
    /// consults only `dependencies`.
    pub fn dependency_union(&self) -> Vec<String> {
        self.dependencies
            .iter()
            .chain(self.dev_dependencies.iter())
            .chain(self.bs_dependencies.iter())
            .chain(self.bs_dev_dependencies.iter())
            .cloned()
            .collect()
    }
}

/// A parsed manifest together with its raw JSON for blob storage
#[derive(Debug, Clone)]
pub struct LoadedManifest {
    pub manifest: Manifest,
    pub raw: Value,
}

impl LoadedManifest {
    /// Parse `<package_dir>/rescript.json`, failing on missing or malformed content
    pub fn read(package_dir: &Path) -> Result<Self> {
        let path = package_dir.join(MANIFEST_FILE);
        let text =
            fs::read_to_string(&path).with_context(|| format!("cannot read {}", path.display()))?;
        let raw: Value = serde_json::from_str(&text)
            .with_context(|| format!("invalid JSON in {}", path.display()))?;
        let manifest: Manifest = serde_json::from_value(raw.clone())
            .with_context(|| format!("unexpected manifest shape in {}", path.display()))?;
        Ok(Self { manifest, raw })
    }

    /// Minimal manifest for packages that ship without a `rescript.json`
    pub fn synthetic(name: &str) -> Self {
        Self {
            manifest: Manifest {
                name: Some(name.to_string()),
                ..Manifest::default()
            },
            raw: serde_json::json!({ "name": name }),
        }
    }

    fn fallback() -> Self {
        Self {
            manifest: Manifest {
                sources: Some(serde_json::json!(["src"])),
                ..Manifest::default()
            },
            raw: serde_json::json!({ "sources": ["src"] }),
        }
    }
}

/// Cache of parsed manifests keyed by package directory
///
/// Owned by one command invocation and dropped with it, so entries cannot
/// go stale across runs. Only touched from the sequential phase.
#[derive(Debug, Default)]
pub struct ManifestCache {
    entries: HashMap<PathBuf, LoadedManifest>,
}

impl ManifestCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parsed manifest for a package directory
    ///
    /// # Behavior
    /// Missing or malformed manifests resolve to the `{"sources": ["src"]}`
    /// fallback, and the result (fallback included) is cached.
    pub fn load(&mut self, package_dir: &Path) -> &LoadedManifest {
        self.entries
            .entry(package_dir.to_path_buf())
            .or_insert_with(|| {
                LoadedManifest::read(package_dir).unwrap_or_else(|_| LoadedManifest::fallback())
            })
    }
}
