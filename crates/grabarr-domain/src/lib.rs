// SPDX-License-Identifier: GPL-3.0-or-later
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

// ============================================================================
// Value Objects & IDs
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(pub Uuid);

impl EntryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifiers assigned by third-party metadata services. Numeric ids are
/// the preferred linkage key; the IMDb id is carried for display only.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExternalIds {
    #[serde(default)]
    pub tmdb_id: Option<i64>,
    #[serde(default)]
    pub tvdb_id: Option<i64>,
    #[serde(default)]
    pub imdb_id: Option<String>,
}

impl ExternalIds {
    /// The numeric id used for direct collection linkage, if any.
    pub fn linkage_id(&self, kind: MediaKind) -> Option<i64> {
        match kind {
            MediaKind::Movie => self.tmdb_id,
            MediaKind::Series => self.tvdb_id,
        }
    }
}

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Series,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Series => "series",
        }
    }

    /// Runtime assumed when the collection entry does not carry one.
    pub fn default_runtime_minutes(&self) -> u32 {
        match self {
            Self::Movie => 90,
            Self::Series => 45,
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A candidate content item discovered on an indexer feed. Read-only to the
/// engine; produced once per cycle by the fetch collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
    pub title: String,
    /// Opaque, stable per release. Releases without one cannot be deduped.
    pub guid: Option<String>,
    #[serde(default)]
    pub external_ids: ExternalIds,
    #[serde(default)]
    pub size_bytes: Option<u64>,
    #[serde(default)]
    pub season: Option<u32>,
    #[serde(default)]
    pub episode: Option<u32>,
    #[serde(default)]
    pub download_url: Option<String>,
    /// Which feed produced this release.
    pub indexer: String,
    /// Lower is preferred when results from several indexers compete.
    #[serde(default)]
    pub indexer_priority: i32,
}

impl Release {
    pub fn new(title: impl Into<String>, indexer: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            guid: None,
            external_ids: ExternalIds::default(),
            size_bytes: None,
            season: None,
            episode: None,
            download_url: None,
            indexer: indexer.into(),
            indexer_priority: 0,
        }
    }
}

/// A user-managed library item the system is trying to obtain. Owned by the
/// external collection store; the engine only reads per-cycle snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionEntry {
    pub id: EntryId,
    pub kind: MediaKind,
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub external_ids: ExternalIds,
    pub monitored: bool,
    pub has_file: bool,
    #[serde(default)]
    pub quality_profile: Option<String>,
    #[serde(default)]
    pub runtime_minutes: Option<u32>,
}

impl CollectionEntry {
    pub fn new(kind: MediaKind, title: impl Into<String>) -> Self {
        Self {
            id: EntryId::new(),
            kind,
            title: title.into(),
            year: None,
            external_ids: ExternalIds::default(),
            monitored: true,
            has_file: false,
            quality_profile: None,
            runtime_minutes: None,
        }
    }

    pub fn runtime_or_default(&self) -> u32 {
        self.runtime_minutes
            .filter(|&minutes| minutes > 0)
            .unwrap_or_else(|| self.kind.default_runtime_minutes())
    }

    /// Key under which a grab for this entry is remembered within a cycle.
    pub fn grab_key(&self) -> String {
        match self.external_ids.linkage_id(self.kind) {
            Some(id) => format!("{}:{}", self.kind.as_str(), id),
            None => format!("{}:{}", self.kind.as_str(), self.title.to_lowercase()),
        }
    }
}

// ============================================================================
// Quality Profiles
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileQuality {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// Named acquisition policy. The enabled qualities define the allowed tiers
/// in preference order; an empty enabled set accepts any quality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityProfile {
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub qualities: Vec<ProfileQuality>,
    #[serde(default)]
    pub min_custom_format_score: i64,
    #[serde(default = "default_true")]
    pub upgrades_allowed: bool,
    #[serde(default)]
    pub upgrade_until_quality: Option<String>,
    #[serde(default)]
    pub upgrade_until_custom_format_score: i64,
}

impl QualityProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_default: false,
            qualities: Vec::new(),
            min_custom_format_score: 0,
            upgrades_allowed: true,
            upgrade_until_quality: None,
            upgrade_until_custom_format_score: 0,
        }
    }

    /// Fallback profile materialized when an instance has no stored profiles.
    /// Accepts any quality and never blocks on format score.
    pub fn builtin() -> Self {
        Self {
            name: "Any".to_string(),
            is_default: true,
            ..Self::new("Any")
        }
    }

    /// Enabled qualities in stored (preference) order.
    pub fn enabled_qualities(&self) -> impl Iterator<Item = &ProfileQuality> {
        self.qualities.iter().filter(|quality| quality.enabled)
    }

    pub fn accepts_any_quality(&self) -> bool {
        self.enabled_qualities().next().is_none()
    }
}

// ============================================================================
// Custom Formats
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatSpecification {
    #[serde(default)]
    pub pattern: String,
    #[serde(default)]
    pub negate: bool,
    #[serde(default)]
    pub required: bool,
    /// Free-form tag; "resolution" specifications get word-boundary matching.
    #[serde(default)]
    pub implementation: Option<String>,
}

/// A named, regex-based scoring rule contributing signed points to a
/// release's total score. Only `required` specifications participate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFormat {
    pub name: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub specifications: Vec<FormatSpecification>,
}

impl CustomFormat {
    pub fn new(name: impl Into<String>, score: i64) -> Self {
        Self {
            name: name.into(),
            score,
            specifications: Vec::new(),
        }
    }
}

// ============================================================================
// Size Limits
// ============================================================================

/// Per-quality size band, expressed in megabytes per minute of runtime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeLimit {
    #[serde(default)]
    pub min: f64,
    #[serde(default)]
    pub preferred: f64,
    #[serde(default = "default_max_mb_per_minute")]
    pub max: f64,
}

fn default_max_mb_per_minute() -> f64 {
    400.0
}

impl Default for SizeLimit {
    fn default() -> Self {
        Self {
            min: 0.0,
            preferred: 0.0,
            max: 400.0,
        }
    }
}

/// Size bands keyed by quality name, looked up case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SizeTable {
    #[serde(default)]
    pub limits: HashMap<String, SizeLimit>,
}

impl SizeTable {
    pub fn limit_for(&self, quality_name: &str) -> SizeLimit {
        self.limits
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(quality_name))
            .map(|(_, limit)| *limit)
            .unwrap_or_default()
    }
}

// ============================================================================
// Domain Validation
// ============================================================================

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

pub trait Validate {
    fn validate(&self) -> Result<(), Vec<ValidationError>>;
}

impl Validate for QualityProfile {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(ValidationError {
                field: "name",
                message: "name cannot be empty".into(),
            });
        }
        if let Some(cutoff) = &self.upgrade_until_quality {
            if !self.accepts_any_quality()
                && !self
                    .enabled_qualities()
                    .any(|quality| quality.name.eq_ignore_ascii_case(cutoff))
            {
                errors.push(ValidationError {
                    field: "upgrade_until_quality",
                    message: "upgrade cutoff must be one of the enabled qualities".into(),
                });
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Validate for CustomFormat {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(ValidationError {
                field: "name",
                message: "name cannot be empty".into(),
            });
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Validate for SizeLimit {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if self.min > self.preferred {
            errors.push(ValidationError {
                field: "preferred",
                message: "preferred must be >= min".into(),
            });
        }
        if self.preferred > self.max {
            errors.push(ValidationError {
                field: "max",
                message: "max must be >= preferred".into(),
            });
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
