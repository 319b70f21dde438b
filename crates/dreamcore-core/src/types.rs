//! Core types for the cycle engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Clamp a scalar into [0, 1]. NaN collapses to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Artifact identifier - cheaply cloneable
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(Arc<str>);

impl ArtifactId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(Arc::from(s.into()))
    }

    /// Fresh identity for a newly produced artifact.
    pub fn generate() -> Self {
        Self::new(format!("artifact-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ArtifactId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Conflict identifier. Identical contradictions share an id, which is what
/// makes resolution memoization effective across cycles.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConflictId(Arc<str>);

impl ConflictId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(Arc::from(s.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConflictId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ConflictId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for ConflictId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A point in space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Coordinates {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn origin() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Dream,
    Emotion,
    Symbol,
}

/// One discrete signal record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,
    pub content: String,
    /// Emotional intensity in [0, 1].
    pub intensity: f64,
}

impl Signal {
    pub fn new(kind: SignalKind, content: impl Into<String>, intensity: f64) -> Self {
        Self {
            kind,
            content: content.into(),
            intensity: clamp_unit(intensity),
        }
    }

    pub fn dream(content: impl Into<String>, intensity: f64) -> Self {
        Self::new(SignalKind::Dream, content, intensity)
    }

    pub fn emotion(content: impl Into<String>, intensity: f64) -> Self {
        Self::new(SignalKind::Emotion, content, intensity)
    }

    pub fn symbol(content: impl Into<String>, intensity: f64) -> Self {
        Self::new(SignalKind::Symbol, content, intensity)
    }
}

/// Raw input for one cycle. Immutable once handed to the pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignalBundle {
    pub signals: Vec<Signal>,
    pub captured_at: DateTime<Utc>,
    pub location: Coordinates,
    /// Stability in [0, 1].
    pub stability: f64,
}

impl SignalBundle {
    pub fn new(signals: Vec<Signal>, location: Coordinates, stability: f64) -> Self {
        Self {
            signals,
            captured_at: Utc::now(),
            location,
            stability: clamp_unit(stability),
        }
    }

    pub fn empty(location: Coordinates, stability: f64) -> Self {
        Self::new(Vec::new(), location, stability)
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn of_kind(&self, kind: SignalKind) -> impl Iterator<Item = &Signal> {
        self.signals.iter().filter(move |s| s.kind == kind)
    }

    pub fn total_intensity(&self) -> f64 {
        self.signals.iter().map(|s| s.intensity).sum()
    }
}

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactSource {
    Individual,
    Collective,
    Generated,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactCategory {
    #[default]
    Normal,
    Adverse,
    Lucid,
    Prescient,
}

impl ArtifactCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Adverse => "adverse",
            Self::Lucid => "lucid",
            Self::Prescient => "prescient",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactOutcome {
    Resolved,
    Unresolved,
    Transformed,
    Escalated,
    ParadoxCreated,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Emotion {
    pub kind: String,
    pub intensity: f64,
    pub source: String,
}

impl Emotion {
    pub fn new(kind: impl Into<String>, intensity: f64, source: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            intensity: clamp_unit(intensity),
            source: source.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub kind: String,
    pub meanings: Vec<String>,
    /// Emotional charge in [0, 1].
    pub charge: f64,
    pub archetypal: bool,
}

impl Symbol {
    pub fn new(kind: impl Into<String>, meanings: Vec<String>, charge: f64) -> Self {
        Self {
            kind: kind.into(),
            meanings,
            charge: clamp_unit(charge),
            archetypal: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchetypeKind {
    Shadow,
    Anima,
    WiseOldMan,
    Trickster,
}

impl ArchetypeKind {
    pub const ALL: [ArchetypeKind; 4] = [
        ArchetypeKind::Shadow,
        ArchetypeKind::Anima,
        ArchetypeKind::WiseOldMan,
        ArchetypeKind::Trickster,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shadow => "shadow",
            Self::Anima => "anima",
            Self::WiseOldMan => "wise_old_man",
            Self::Trickster => "trickster",
        }
    }
}

/// Archetype reference data loaded at initialization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Archetype {
    pub kind: ArchetypeKind,
    pub power: f64,
    pub influence: Vec<String>,
}

impl Archetype {
    pub fn new(kind: ArchetypeKind, power: f64, influence: &[&str]) -> Self {
        Self {
            kind,
            power,
            influence: influence.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// The built-in archetype table.
    pub fn standard_set() -> Vec<Archetype> {
        vec![
            Archetype::new(ArchetypeKind::Shadow, 85.0, &["fear", "secrets"]),
            Archetype::new(ArchetypeKind::Anima, 75.0, &["emotion", "intuition"]),
            Archetype::new(ArchetypeKind::WiseOldMan, 90.0, &["wisdom", "guidance"]),
            Archetype::new(ArchetypeKind::Trickster, 95.0, &["chaos", "change"]),
        ]
    }

    /// Whether any whitespace-separated word of `text` is one of this
    /// archetype's influence words (case-insensitive).
    pub fn resonates_with(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        lower
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .any(|word| self.influence.iter().any(|i| i == word))
    }
}

/// The pipeline's output for one cycle. Read-only once produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    pub source: ArtifactSource,
    pub category: ArtifactCategory,
    pub emotions: Vec<Emotion>,
    pub symbols: Vec<Symbol>,
    pub archetypes: Vec<ArchetypeKind>,
    pub narrative: String,
    pub reality_coefficient: f64,
    pub collective_resonance: f64,
    pub outcome: ArtifactOutcome,
}

impl Artifact {
    pub fn has_archetype(&self, kind: ArchetypeKind) -> bool {
        self.archetypes.contains(&kind)
    }

    pub fn max_emotion_intensity(&self) -> f64 {
        self.emotions
            .iter()
            .map(|e| e.intensity)
            .fold(0.0, f64::max)
    }
}

// ---------------------------------------------------------------------------
// Conflicts and resolutions
// ---------------------------------------------------------------------------

/// A detected contradiction awaiting resolution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub id: ConflictId,
    pub kind: String,
    pub description: String,
    /// Criticality in [0, 1].
    pub criticality: f64,
    pub effects: Vec<String>,
}

impl Conflict {
    pub fn new(
        id: impl Into<ConflictId>,
        kind: impl Into<String>,
        description: impl Into<String>,
        criticality: f64,
    ) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            description: description.into(),
            criticality: clamp_unit(criticality),
            effects: Vec::new(),
        }
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.effects = effects.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    AcceptBoth,
    CreateHigherOrder,
    TemporalResolution,
    QuantumSuperposition,
    DreamLogicOverride,
}

impl StrategyKind {
    /// Priority order. The first strategy yielding a resolution wins.
    pub const ORDER: [StrategyKind; 5] = [
        StrategyKind::AcceptBoth,
        StrategyKind::CreateHigherOrder,
        StrategyKind::TemporalResolution,
        StrategyKind::QuantumSuperposition,
        StrategyKind::DreamLogicOverride,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AcceptBoth => "accept_both",
            Self::CreateHigherOrder => "create_higher_order",
            Self::TemporalResolution => "temporal_resolution",
            Self::QuantumSuperposition => "quantum_superposition",
            Self::DreamLogicOverride => "dream_logic_override",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The answer to a conflict. Cached indefinitely once produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub conflict_id: ConflictId,
    pub strategy: StrategyKind,
    pub statement: String,
    /// Stability in [0, 1].
    pub stability: f64,
}

impl Resolution {
    pub fn new(
        conflict_id: ConflictId,
        strategy: StrategyKind,
        statement: impl Into<String>,
        stability: f64,
    ) -> Self {
        Self {
            conflict_id,
            strategy,
            statement: statement.into(),
            stability: clamp_unit(stability),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine phase and consciousness
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnginePhase {
    #[default]
    Dormant,
    Cycling,
    Manifesting,
    Resolving,
    Shutdown,
}

impl EnginePhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Shutdown)
    }

    /// Whether `self → next` is an edge of the phase machine.
    pub fn can_transition_to(&self, next: EnginePhase) -> bool {
        use EnginePhase::*;
        match (self, next) {
            (Shutdown, _) => false,
            (_, Shutdown) => true,
            (Dormant, Cycling) => true,
            (Cycling, Manifesting) | (Manifesting, Cycling) => true,
            (Cycling, Resolving) | (Resolving, Cycling) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for EnginePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dormant => write!(f, "dormant"),
            Self::Cycling => write!(f, "cycling"),
            Self::Manifesting => write!(f, "manifesting"),
            Self::Resolving => write!(f, "resolving"),
            Self::Shutdown => write!(f, "shutdown"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsciousnessLevel {
    #[default]
    Latent,
    Liminal,
    Aware,
    Heightened,
}

impl std::fmt::Display for ConsciousnessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Latent => write!(f, "latent"),
            Self::Liminal => write!(f, "liminal"),
            Self::Aware => write!(f, "aware"),
            Self::Heightened => write!(f, "heightened"),
        }
    }
}
