//! Responder capability specs and the immutable snapshot shared across a consultation
//!
//! Capability specs are loaded once from a [`CapabilitySource`] and frozen into a
//! [`CapabilitySnapshot`]. Every component receives the snapshot behind an `Arc`,
//! so concurrent responder calls only ever read it.

use crate::error::{Error, Result};
use crate::types::ResponderId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Declared scope of a responder
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopeBoundaries {
    /// Areas the responder covers
    #[serde(default, deserialize_with = "list_or_csv")]
    pub covers: Vec<String>,
    /// Areas the responder explicitly leaves to others
    #[serde(default, deserialize_with = "list_or_csv")]
    pub excludes: Vec<String>,
}

/// Capability description of one responder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilitySpec {
    /// Responder identifier
    pub id: ResponderId,
    /// Phrases that make this responder relevant to a request
    #[serde(default)]
    pub triggers: Vec<String>,
    /// Declared scope
    #[serde(default)]
    pub scope: ScopeBoundaries,
    /// Human-readable framework name (e.g. "Chris Do value-based selling")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    /// Rubric key used by the methodology validator (e.g. "chris_do")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework_id: Option<String>,
    /// Declared potential conflicts with other responders or approaches
    #[serde(default)]
    pub potential_conflicts: HashMap<String, String>,
    /// Context keys this responder declares relevant
    #[serde(default)]
    pub input_schema: Vec<String>,
    /// Responders that usually complement this one
    #[serde(default)]
    pub complementary: Vec<ResponderId>,
}

impl CapabilitySpec {
    /// Create a spec with only an identifier
    pub fn new(id: impl Into<ResponderId>) -> Self {
        Self {
            id: id.into(),
            triggers: Vec::new(),
            scope: ScopeBoundaries::default(),
            framework: None,
            framework_id: None,
            potential_conflicts: HashMap::new(),
            input_schema: Vec::new(),
            complementary: Vec::new(),
        }
    }

    /// Add trigger phrases
    pub fn with_triggers<I, S>(mut self, triggers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.triggers.extend(triggers.into_iter().map(Into::into));
        self
    }

    /// Add covered scope areas
    pub fn with_covers<I, S>(mut self, covers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scope.covers.extend(covers.into_iter().map(Into::into));
        self
    }

    /// Set the declared framework name and rubric key
    pub fn with_framework(mut self, name: impl Into<String>, rubric: Option<&str>) -> Self {
        self.framework = Some(name.into());
        self.framework_id = rubric.map(str::to_string);
        self
    }

    /// Add relevant context keys
    pub fn with_input_schema<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input_schema.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Add a declared potential conflict
    pub fn with_potential_conflict(mut self, key: impl Into<String>, description: impl Into<String>) -> Self {
        self.potential_conflicts.insert(key.into(), description.into());
        self
    }

    /// Add complementary responders
    pub fn with_complementary<I, S>(mut self, responders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ResponderId>,
    {
        self.complementary.extend(responders.into_iter().map(Into::into));
        self
    }

    /// Lowercased words longer than three characters taken from the trigger phrases
    pub fn trigger_words(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.triggers
            .iter()
            .flat_map(|t| t.split_whitespace())
            .filter(|w| w.chars().count() > 3)
            .map(str::to_lowercase)
            .filter(|w| seen.insert(w.clone()))
            .collect()
    }

    /// First word of the framework name, used to group methodology families
    pub fn framework_family(&self) -> Option<&str> {
        self.framework
            .as_deref()
            .and_then(|name| name.split_whitespace().next())
    }
}

/// Immutable, ordered view of every known responder
#[derive(Debug, Clone, Default)]
pub struct CapabilitySnapshot {
    specs: BTreeMap<ResponderId, CapabilitySpec>,
}

impl CapabilitySnapshot {
    /// Create an empty snapshot
    pub fn empty() -> Self {
        Self::default()
    }

    /// Freeze a set of specs; later duplicates replace earlier ones
    pub fn from_specs(specs: impl IntoIterator<Item = CapabilitySpec>) -> Self {
        let specs = specs
            .into_iter()
            .map(|spec| (spec.id.clone(), spec))
            .collect();
        Self { specs }
    }

    /// Load from a source, degrading to an empty snapshot when the source is unavailable
    pub async fn load_or_empty(source: &dyn CapabilitySource) -> Self {
        match source.load().await {
            Ok(specs) => {
                let snapshot = Self::from_specs(specs);
                tracing::info!(
                    source = %source.describe(),
                    responders = snapshot.len(),
                    "Capability snapshot loaded"
                );
                snapshot
            }
            Err(e) => {
                tracing::warn!(
                    source = %source.describe(),
                    error = %e,
                    "Capability source unavailable, starting with empty registry"
                );
                Self::empty()
            }
        }
    }

    /// Look up a responder spec
    pub fn get(&self, id: &str) -> Option<&CapabilitySpec> {
        self.specs.get(id)
    }

    /// Look up a responder spec, reporting a missing capability as an error
    pub fn require(&self, id: &ResponderId) -> Result<&CapabilitySpec> {
        self.specs
            .get(id)
            .ok_or_else(|| Error::MissingCapability(id.clone()))
    }

    /// Whether a spec exists for the responder
    pub fn contains(&self, id: &str) -> bool {
        self.specs.contains_key(id)
    }

    /// Iterate specs in responder-id order
    pub fn iter(&self) -> impl Iterator<Item = &CapabilitySpec> {
        self.specs.values()
    }

    /// Number of responders
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Whether the snapshot is empty
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Wrap in an `Arc` for sharing
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

/// Source of capability specs (durable storage, service, fixtures)
#[async_trait]
pub trait CapabilitySource: Send + Sync {
    /// Load every available spec
    async fn load(&self) -> Result<Vec<CapabilitySpec>>;

    /// Short description for logging
    fn describe(&self) -> String;
}

/// In-memory capability source
#[derive(Debug, Clone, Default)]
pub struct StaticCapabilitySource {
    specs: Vec<CapabilitySpec>,
}

impl StaticCapabilitySource {
    /// Create a source serving the given specs
    pub fn new(specs: Vec<CapabilitySpec>) -> Self {
        Self { specs }
    }
}

#[async_trait]
impl CapabilitySource for StaticCapabilitySource {
    async fn load(&self) -> Result<Vec<CapabilitySpec>> {
        Ok(self.specs.clone())
    }

    fn describe(&self) -> String {
        format!("static({})", self.specs.len())
    }
}

/// Loads one spec per `*.json`, `*.yaml` or `*.yml` file in a directory
#[derive(Debug, Clone)]
pub struct DirectoryCapabilitySource {
    dir: PathBuf,
}

impl DirectoryCapabilitySource {
    /// Create a source reading from `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn read_spec(path: &Path) -> Result<Option<CapabilitySpec>> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let spec = match extension.as_deref() {
            Some("json") => {
                let content = tokio::fs::read_to_string(path).await?;
                serde_json::from_str(&content)?
            }
            Some("yaml") | Some("yml") => {
                let content = tokio::fs::read_to_string(path).await?;
                serde_yaml::from_str(&content)?
            }
            _ => return Ok(None),
        };
        Ok(Some(spec))
    }
}

#[async_trait]
impl CapabilitySource for DirectoryCapabilitySource {
    async fn load(&self) -> Result<Vec<CapabilitySpec>> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| Error::registry(format!("{}: {}", self.dir.display(), e)))?;

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            paths.push(entry.path());
        }
        paths.sort();

        let mut specs = Vec::new();
        for path in paths {
            match Self::read_spec(&path).await {
                Ok(Some(spec)) => specs.push(spec),
                Ok(None) => {}
                // malformed files are skipped
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable capability spec"),
            }
        }
        Ok(specs)
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

/// Accept either a list or a comma-separated string
fn list_or_csv<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ListOrCsv {
        List(Vec<String>),
        Csv(String),
    }

    Ok(match ListOrCsv::deserialize(deserializer)? {
        ListOrCsv::List(items) => items,
        ListOrCsv::Csv(text) => text
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    })
}
