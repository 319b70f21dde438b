//! Manifestation evaluator
//!
//! Two gates: a cheap score gate (`score > threshold`) and a coefficient
//! gate re-derived at commit time (`rc >= min_coefficient`).

use crate::config::GateConfig;
use dreamcore_core::{clamp_unit, Artifact, Conflict};

/// Outcome of running both gates against one artifact.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Score at or below the threshold.
    BelowThreshold { score: f64 },
    /// Score passed but the re-derived coefficient is too weak. Carries the
    /// instability conflict to feed to the resolver.
    Unstable { score: f64, coefficient: f64, conflict: Conflict },
    /// Both gates passed.
    Manifest { score: f64, coefficient: f64 },
}

#[derive(Debug, Clone)]
pub struct Evaluator {
    gates: GateConfig,
}

impl Evaluator {
    pub fn new(gates: GateConfig) -> Self {
        Self { gates }
    }

    pub fn score(&self, artifact: &Artifact) -> f64 {
        let emotion_sum: f64 = artifact.emotions.iter().map(|e| e.intensity).sum();
        let raw = emotion_sum / 10.0
            + artifact.symbols.len() as f64 * 0.1
            + artifact.archetypes.len() as f64 * 0.2
            + artifact.collective_resonance * 0.3;
        clamp_unit(raw * artifact.reality_coefficient)
    }

    pub fn should_manifest(&self, score: f64) -> bool {
        score > self.gates.manifest_threshold
    }

    pub fn reality_coefficient(&self, artifact: &Artifact) -> f64 {
        let symbol_density = artifact.symbols.len() as f64 / 10.0;
        clamp_unit(
            artifact.reality_coefficient
                * (0.4
                    + artifact.collective_resonance * 0.3
                    + artifact.max_emotion_intensity() * 0.2
                    + symbol_density * 0.1),
        )
    }

    pub fn passes_coefficient(&self, coefficient: f64) -> bool {
        coefficient >= self.gates.min_coefficient
    }

    /// Run both gates in order.
    pub fn evaluate(&self, artifact: &Artifact) -> Verdict {
        let score = self.score(artifact);
        if !self.should_manifest(score) {
            return Verdict::BelowThreshold { score };
        }
        let coefficient = self.reality_coefficient(artifact);
        if !self.passes_coefficient(coefficient) {
            let category = artifact.category.as_str();
            let conflict = Conflict::new(
                format!("manifestation_instability:{}", category),
                "manifestation_instability",
                format!("{} artifact scored {:.2} but holds at only {:.2}", category, score, coefficient),
                1.0 - coefficient,
            )
            .with_effects(["reality_doubt"]);
            return Verdict::Unstable { score, coefficient, conflict };
        }
        Verdict::Manifest { score, coefficient }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(GateConfig::default())
    }
}
