//! Cycle engine configuration
//!
//! All tunable parameters in one place. Loaded from TOML at startup,
//! falls back to defaults if no config file exists.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Inter-cycle pause and cycle limits.
    pub schedule: ScheduleConfig,
    /// Manifestation gates.
    pub gates: GateConfig,
    /// Reality-weave decay and boost.
    pub weave: WeaveConfig,
    /// Paradox tolerance bookkeeping.
    pub tolerance: ToleranceConfig,
    /// Active-conflict capacity and cascade escalation.
    pub conflicts: ConflictConfig,
    /// Artifact memory bounds.
    pub memory: MemoryConfig,
    /// Retry budget and timeouts for external collaborators.
    pub collaborators: CollaboratorConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Lower bound of the random inter-cycle pause.
    pub pause_min_ms: u64,
    /// Upper bound of the random inter-cycle pause.
    pub pause_max_ms: u64,
    /// Stop after this many cycles. `None` runs until stopped.
    pub max_cycles: Option<u64>,
    /// Run sink maintenance every N cycles. 0 disables it.
    pub maintenance_every: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Score must be strictly greater than this to manifest.
    pub manifest_threshold: f64,
    /// Re-derived coefficient must be at least this to manifest.
    pub min_coefficient: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaveConfig {
    pub initial: f64,
    /// Subtracted every cycle.
    pub decay: f64,
    /// Decay never takes the weave below this.
    pub floor: f64,
    /// Added after each successful manifestation.
    pub manifestation_boost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToleranceConfig {
    pub initial: f64,
    /// Added per resolution, fresh or memoized.
    pub resolution_gain: f64,
    /// Subtracted per unresolved conflict.
    pub conflict_penalty: f64,
    /// At or below this the engine enters the resolving phase.
    pub resolving_threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConflictConfig {
    /// Active-conflict set size above which a cascade escalates.
    pub capacity: usize,
    /// Escalation drains the set down to this size.
    pub drain_target: usize,
    /// Conflicts at or above this criticality are never drained.
    pub critical_criticality: f64,
    /// Containment radius per drained conflict.
    pub containment_radius: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Oldest artifacts are evicted beyond this count.
    pub artifact_capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollaboratorConfig {
    /// Attempts before an unreachable collaborator ends the loop.
    pub retry_budget: u32,
    pub retry_backoff_ms: u64,
    /// Per-stage pipeline timeout. 0 disables it.
    pub stage_timeout_ms: u64,
}

// ============================================================
// Defaults
// ============================================================

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { pause_min_ms: 500, pause_max_ms: 1500, max_cycles: None, maintenance_every: 60 }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self { manifest_threshold: 0.7, min_coefficient: 0.3 }
    }
}

impl Default for WeaveConfig {
    fn default() -> Self {
        Self { initial: 0.0, decay: 0.1, floor: 10.0, manifestation_boost: 10.0 }
    }
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self { initial: 100.0, resolution_gain: 5.0, conflict_penalty: 10.0, resolving_threshold: 20.0 }
    }
}

impl Default for ConflictConfig {
    fn default() -> Self {
        Self { capacity: 10, drain_target: 5, critical_criticality: 0.9, containment_radius: 10.0 }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self { artifact_capacity: 1000 }
    }
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self { retry_budget: 3, retry_backoff_ms: 200, stage_timeout_ms: 0 }
    }
}

// ============================================================
// Loading
// ============================================================

impl EngineConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {} - using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!("No config at {} - using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Render the config as TOML (for generating a default config file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

impl ScheduleConfig {
    /// Pause bounds, ordered so that `min <= max`.
    pub fn pause_bounds(&self) -> (Duration, Duration) {
        let lo = self.pause_min_ms.min(self.pause_max_ms);
        let hi = self.pause_min_ms.max(self.pause_max_ms);
        (Duration::from_millis(lo), Duration::from_millis(hi))
    }
}

impl CollaboratorConfig {
    pub fn stage_timeout(&self) -> Option<Duration> {
        (self.stage_timeout_ms > 0).then(|| Duration::from_millis(self.stage_timeout_ms))
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}
