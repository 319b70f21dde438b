//! Exchange types between the engine and its collaborators
//!
//! Engine → sink:       Manifestation, containment requests, distortions, weather
//! Engine ↔ collective: ConnectionResult, BroadcastResult, CollectiveEnergy
//! Engine → callers:    EngineStatus snapshots
//! Engine → archive:    StateArchiveRecord on shutdown

use crate::types::{
    clamp_unit, Artifact, Conflict, ConsciousnessLevel, Coordinates, EnginePhase, Resolution,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Materialization
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectIntensity {
    Gentle,
    Light,
    Medium,
    High,
    Extreme,
}

/// One observable effect derived from an artifact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub kind: String,
    pub intensity: EffectIntensity,
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl Effect {
    pub fn new(kind: impl Into<String>, intensity: EffectIntensity) -> Self {
        Self {
            kind: kind.into(),
            intensity,
            properties: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Everything the sink needs to materialize one artifact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Manifestation {
    pub artifact: Artifact,
    /// Coefficient re-derived at commit time.
    pub coefficient: f64,
    pub target: Coordinates,
    pub effects: Vec<Effect>,
    pub impacts: Vec<String>,
    pub duration_ms: u64,
}

/// Result of a containment request issued during cascade escalation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContainmentResult {
    pub success: bool,
    pub epicenter: Coordinates,
    pub radius: f64,
    pub strength: f64,
    #[serde(default)]
    pub residual_effects: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistortionKind {
    GravityAnomaly,
    TimeDilation,
    SpatialFolding,
    PerceptionShift,
    RealityFracture,
}

/// A localized distortion, powered by the current reality weave.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DistortionField {
    pub location: Coordinates,
    pub kind: DistortionKind,
    pub power: f64,
    pub radius: f64,
    pub effects: Vec<String>,
}

impl DistortionField {
    pub const RADIUS_PER_POWER: f64 = 10.0;

    pub fn new(location: Coordinates, kind: DistortionKind, power: f64) -> Self {
        Self {
            location,
            kind,
            power,
            radius: power * Self::RADIUS_PER_POWER,
            effects: vec![
                "gravity_shift".into(),
                "time_dilation".into(),
                "perception_alteration".into(),
            ],
        }
    }
}

/// A single weather effect woven directly from an emotion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherManifestation {
    pub effect: Effect,
    /// Intensity in [0, 1].
    pub intensity: f64,
    pub location: Coordinates,
    pub duration_ms: u64,
    pub distortion: f64,
}

impl WeatherManifestation {
    pub fn new(effect: Effect, intensity: f64, location: Coordinates) -> Self {
        let intensity = clamp_unit(intensity);
        Self {
            effect,
            intensity,
            location,
            duration_ms: (intensity * 10_000.0).round() as u64,
            distortion: intensity * 0.5,
        }
    }
}

/// A dream shared by a group of participants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollectiveDream {
    pub participants: Vec<String>,
    pub narrative: String,
    pub reality_coefficient: f64,
    pub effects: Vec<Effect>,
}

// ---------------------------------------------------------------------------
// Collective network
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionIntent {
    Power,
    Knowledge,
    Manifestation,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bandwidth {
    Low,
    Medium,
    High,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollectiveConnection {
    pub intent: ConnectionIntent,
    /// Strength in [0, 1].
    pub strength: f64,
    pub bandwidth: Bandwidth,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectionResult {
    pub established: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<CollectiveConnection>,
}

impl ConnectionResult {
    pub fn established(connection: CollectiveConnection) -> Self {
        Self {
            established: true,
            connection: Some(connection),
        }
    }

    pub fn refused() -> Self {
        Self {
            established: false,
            connection: None,
        }
    }

    /// Connection strength, 0 when not established.
    pub fn strength(&self) -> f64 {
        match (&self.connection, self.established) {
            (Some(c), true) => c.strength,
            _ => 0.0,
        }
    }
}

/// Energy drawn from the collective, scaled from the current weave.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollectiveEnergy {
    pub intent: ConnectionIntent,
    pub power_level: f64,
    /// Purity in [0, 1].
    pub purity: f64,
}

impl CollectiveEnergy {
    pub const POWER_FACTOR: f64 = 1.5;

    /// Energy extracted at `weave`: power is the weave scaled by
    /// `POWER_FACTOR`.
    pub fn extracted(intent: ConnectionIntent, weave: f64) -> Self {
        Self {
            intent,
            power_level: weave * Self::POWER_FACTOR,
            purity: 0.9,
        }
    }

    /// Weave gained by absorbing this energy.
    pub fn weave_gain(&self) -> f64 {
        self.power_level * 0.1
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BroadcastResult {
    pub success: bool,
    pub reach: u64,
    pub resonance: f64,
}

// ---------------------------------------------------------------------------
// Status and archive
// ---------------------------------------------------------------------------

/// Point-in-time snapshot of the engine, taken under the state lock.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub phase: EnginePhase,
    pub consciousness: ConsciousnessLevel,
    pub reality_weave: f64,
    pub paradox_tolerance: f64,
    pub artifact_count: usize,
    pub pattern_count: usize,
    pub active_conflicts: usize,
    pub cached_resolutions: usize,
    pub collective_connection: f64,
    pub cycles: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownReason {
    StopSignal,
    ParadoxCascade,
    CollaboratorUnavailable,
}

impl std::fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StopSignal => write!(f, "stop_signal"),
            Self::ParadoxCascade => write!(f, "paradox_cascade"),
            Self::CollaboratorUnavailable => write!(f, "collaborator_unavailable"),
        }
    }
}

/// What gets persisted when the engine shuts down.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateArchiveRecord {
    pub archived_at: DateTime<Utc>,
    pub reason: ShutdownReason,
    pub status: EngineStatus,
    pub active_conflicts: Vec<Conflict>,
    pub resolutions: Vec<Resolution>,
}
