//! Engine state
//!
//! The single mutable state of a running engine: phase, consciousness,
//! the two gauges, the resolver and artifact memory. Shared behind one
//! `Arc<Mutex<_>>` so status snapshots are never torn.

use crate::config::{EngineConfig, ToleranceConfig, WeaveConfig};
use crate::memory::ArtifactMemory;
use crate::resolver::{ConflictResolver, ResolutionContext};
use chrono::Utc;
use dreamcore_core::{
    CollectiveEnergy, ConsciousnessLevel, EnginePhase, EngineStatus, ShutdownReason, StateArchiveRecord,
};
use tracing::{info, warn};

pub const GAUGE_MAX: f64 = 100.0;

/// Clamp a gauge into [0, 100]. NaN collapses to 0.
pub fn clamp_gauge(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, GAUGE_MAX)
    }
}

pub struct EngineState {
    phase: EnginePhase,
    consciousness: ConsciousnessLevel,
    reality_weave: f64,
    paradox_tolerance: f64,
    collective_strength: f64,
    cycles: u64,
    weave: WeaveConfig,
    tolerance: ToleranceConfig,
    pub resolver: ConflictResolver,
    pub memory: ArtifactMemory,
}

impl EngineState {
    pub fn new(config: &EngineConfig) -> Self {
        let mut state = Self {
            phase: EnginePhase::Dormant,
            consciousness: ConsciousnessLevel::Latent,
            reality_weave: clamp_gauge(config.weave.initial),
            paradox_tolerance: clamp_gauge(config.tolerance.initial),
            collective_strength: 0.0,
            cycles: 0,
            weave: config.weave.clone(),
            tolerance: config.tolerance.clone(),
            resolver: ConflictResolver::standard(&config.conflicts),
            memory: ArtifactMemory::new(config.memory.artifact_capacity),
        };
        state.sync_context();
        state
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    pub fn consciousness(&self) -> ConsciousnessLevel {
        self.consciousness
    }

    pub fn reality_weave(&self) -> f64 {
        self.reality_weave
    }

    pub fn paradox_tolerance(&self) -> f64 {
        self.paradox_tolerance
    }

    pub fn collective_strength(&self) -> f64 {
        self.collective_strength
    }

    pub fn is_connected(&self) -> bool {
        self.collective_strength > 0.0
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Move to `next` if the phase machine allows it.
    pub fn transition(&mut self, next: EnginePhase) -> bool {
        if self.phase == next {
            return true;
        }
        if !self.phase.can_transition_to(next) {
            warn!("Ignoring phase transition {} -> {}", self.phase, next);
            return false;
        }
        info!("Phase {} -> {}", self.phase, next);
        self.phase = next;
        true
    }

    pub fn begin_cycle(&mut self) -> u64 {
        self.cycles += 1;
        self.cycles
    }

    pub fn set_collective_strength(&mut self, strength: f64) {
        self.collective_strength = dreamcore_core::clamp_unit(strength);
    }

    pub fn set_reality_weave(&mut self, value: f64) {
        self.reality_weave = clamp_gauge(value);
    }

    /// Per-cycle decay, never below the configured floor.
    pub fn decay_weave(&mut self) {
        let decayed = (self.reality_weave - self.weave.decay).max(self.weave.floor);
        self.reality_weave = clamp_gauge(decayed);
    }

    pub fn boost_weave(&mut self) {
        self.reality_weave = clamp_gauge(self.reality_weave + self.weave.manifestation_boost);
    }

    /// Weave gain from collective energy, capped like any boost.
    pub fn absorb_energy(&mut self, energy: &CollectiveEnergy) {
        self.reality_weave = clamp_gauge(self.reality_weave + energy.weave_gain());
    }

    pub fn adjust_tolerance(&mut self, delta: f64) {
        self.paradox_tolerance = clamp_gauge(self.paradox_tolerance + delta);
        self.sync_context();
    }

    pub fn record_resolution(&mut self) {
        self.adjust_tolerance(self.tolerance.resolution_gain);
    }

    pub fn record_unresolved(&mut self) {
        self.adjust_tolerance(-self.tolerance.conflict_penalty);
    }

    pub fn needs_resolving(&self) -> bool {
        self.paradox_tolerance <= self.tolerance.resolving_threshold
    }

    pub fn resolution_context(&self) -> ResolutionContext {
        ResolutionContext {
            paradox_tolerance: self.paradox_tolerance,
            resolving_threshold: self.tolerance.resolving_threshold,
        }
    }

    fn sync_context(&mut self) {
        let context = self.resolution_context();
        self.resolver.set_context(context);
    }

    /// First match wins: low tolerance, then a strong weave, then an active
    /// manifestation. Otherwise the level is left as it was.
    pub fn recompute_consciousness(&mut self) {
        let next = if self.paradox_tolerance < 50.0 {
            ConsciousnessLevel::Liminal
        } else if self.reality_weave > 70.0 {
            ConsciousnessLevel::Heightened
        } else if self.phase == EnginePhase::Manifesting {
            ConsciousnessLevel::Aware
        } else {
            self.consciousness
        };
        if next != self.consciousness {
            info!("Consciousness {} -> {}", self.consciousness, next);
            self.consciousness = next;
        }
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            phase: self.phase,
            consciousness: self.consciousness,
            reality_weave: self.reality_weave,
            paradox_tolerance: self.paradox_tolerance,
            artifact_count: self.memory.len(),
            pattern_count: self.memory.pattern_count(),
            active_conflicts: self.resolver.active_len(),
            cached_resolutions: self.resolver.cached_len(),
            collective_connection: self.collective_strength,
            cycles: self.cycles,
        }
    }

    pub fn archive_record(&self, reason: ShutdownReason) -> StateArchiveRecord {
        StateArchiveRecord {
            archived_at: Utc::now(),
            reason,
            status: self.status(),
            active_conflicts: self.resolver.active_conflicts(),
            resolutions: self.resolver.resolutions(),
        }
    }
}
