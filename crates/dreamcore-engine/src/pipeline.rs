//! Artifact pipeline
//!
//! A fixed, ordered list of stages built once. Each cycle threads a fresh
//! `Draft` through every stage in registration order and wraps the result
//! into an `Artifact`. Nothing in a draft survives past its cycle.
//!
//! Standard order: subconscious → symbol → emotion → coherence.

use dreamcore_core::{
    clamp_unit, Archetype, ArchetypeKind, Artifact, ArtifactCategory, ArtifactId, ArtifactOutcome,
    ArtifactSource, Conflict, Emotion, Error, Result, SignalBundle, SignalKind, Symbol,
};
use std::time::Duration;
use tracing::{debug, warn};

/// Emotion pairs that contradict each other when both run strong.
const OPPOSED_EMOTIONS: [(&str, &str); 5] = [
    ("joy", "fear"),
    ("joy", "sadness"),
    ("love", "hate"),
    ("anger", "calm"),
    ("hope", "despair"),
];

/// Work-in-progress artifact for one cycle.
#[derive(Debug, Clone)]
pub struct Draft {
    pub bundle: SignalBundle,
    pub fragments: Vec<String>,
    pub emotions: Vec<Emotion>,
    pub symbols: Vec<Symbol>,
    pub archetypes: Vec<ArchetypeKind>,
    /// First flag wins; `Normal` when no stage flags anything.
    pub category: Option<ArtifactCategory>,
    pub conflicts: Vec<Conflict>,
    pub reality_coefficient: f64,
    pub collective_resonance: f64,
}

impl Draft {
    pub fn new(bundle: &SignalBundle) -> Self {
        Self {
            bundle: bundle.clone(),
            fragments: Vec::new(),
            emotions: Vec::new(),
            symbols: Vec::new(),
            archetypes: Vec::new(),
            category: None,
            conflicts: Vec::new(),
            reality_coefficient: 0.0,
            collective_resonance: 0.0,
        }
    }

    pub fn flag(&mut self, category: ArtifactCategory) {
        if self.category.is_none() {
            self.category = Some(category);
        }
    }

    pub fn category(&self) -> ArtifactCategory {
        self.category.unwrap_or_default()
    }

    fn tag(&mut self, kind: ArchetypeKind) {
        if !self.archetypes.contains(&kind) {
            self.archetypes.push(kind);
        }
    }

    fn raise(&mut self, conflict: Conflict) {
        if !self.conflicts.iter().any(|c| c.id == conflict.id) {
            self.conflicts.push(conflict);
        }
    }

    fn into_artifact(self) -> Artifact {
        let category = self.category();
        let outcome = if self.conflicts.is_empty() {
            ArtifactOutcome::Resolved
        } else {
            ArtifactOutcome::ParadoxCreated
        };
        Artifact {
            id: ArtifactId::generate(),
            source: ArtifactSource::Generated,
            category,
            emotions: self.emotions,
            symbols: self.symbols,
            archetypes: self.archetypes,
            narrative: self.fragments.join(" / "),
            reality_coefficient: clamp_unit(self.reality_coefficient),
            collective_resonance: clamp_unit(self.collective_resonance),
            outcome,
        }
    }
}

/// What one `process` call yields: the artifact and every conflict raised
/// while producing it.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub artifact: Artifact,
    pub conflicts: Vec<Conflict>,
}

/// One transformer in the pipeline.
#[async_trait::async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;

    async fn transform(&self, draft: Draft) -> Result<Draft>;
}

pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    stage_timeout: Option<Duration>,
}

impl Pipeline {
    pub fn new(stages: Vec<Box<dyn Stage>>, stage_timeout: Option<Duration>) -> Self {
        Self { stages, stage_timeout }
    }

    /// The four standard stages, built against the loaded archetype table.
    pub fn standard(archetypes: &[Archetype], stage_timeout: Option<Duration>) -> Self {
        Self::new(
            vec![
                Box::new(SubconsciousStage::new(archetypes.to_vec())),
                Box::new(SymbolStage::new(archetypes.to_vec())),
                Box::new(EmotionStage),
                Box::new(CoherenceStage),
            ],
            stage_timeout,
        )
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage in order. The first failing stage aborts the call.
    pub async fn process(&self, bundle: &SignalBundle) -> Result<PipelineOutput> {
        let mut draft = Draft::new(bundle);
        for stage in &self.stages {
            draft = match self.stage_timeout {
                Some(limit) => tokio::time::timeout(limit, stage.transform(draft))
                    .await
                    .map_err(|_| Error::stage_failed(stage.name(), format!("timed out after {:?}", limit)))??,
                None => stage.transform(draft).await?,
            };
        }
        let conflicts = draft.conflicts.clone();
        let artifact = draft.into_artifact();
        debug!(
            "Pipeline produced {} ({}, {} emotions, {} symbols, {} archetypes, {} conflicts)",
            artifact.id,
            artifact.category.as_str(),
            artifact.emotions.len(),
            artifact.symbols.len(),
            artifact.archetypes.len(),
            conflicts.len()
        );
        Ok(PipelineOutput { artifact, conflicts })
    }
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace().map(|w| {
        w.trim_matches(|c: char| !c.is_alphanumeric() && c != '_').to_lowercase()
    })
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// Dream signals become narrative fragments; signals that mention an
/// archetype's influence words tag that archetype.
pub struct SubconsciousStage {
    archetypes: Vec<Archetype>,
}

impl SubconsciousStage {
    pub fn new(archetypes: Vec<Archetype>) -> Self {
        Self { archetypes }
    }
}

#[async_trait::async_trait]
impl Stage for SubconsciousStage {
    fn name(&self) -> &str {
        "subconscious"
    }

    async fn transform(&self, mut draft: Draft) -> Result<Draft> {
        let mut tagged = Vec::new();
        let mut lucid = false;
        for signal in &draft.bundle.signals {
            for archetype in &self.archetypes {
                if archetype.resonates_with(&signal.content) {
                    tagged.push(archetype.kind);
                }
            }
            if signal.kind == SignalKind::Dream {
                draft.fragments.push(signal.content.trim().to_string());
                lucid |= words(&signal.content).any(|w| w == "lucid");
            }
        }
        for kind in tagged {
            draft.tag(kind);
        }
        if lucid {
            draft.flag(ArtifactCategory::Lucid);
        }
        Ok(draft)
    }
}

/// Symbol signals become `Symbol` records: first word is the kind, the rest
/// are meanings.
pub struct SymbolStage {
    archetypes: Vec<Archetype>,
}

impl SymbolStage {
    pub fn new(archetypes: Vec<Archetype>) -> Self {
        Self { archetypes }
    }
}

#[async_trait::async_trait]
impl Stage for SymbolStage {
    fn name(&self) -> &str {
        "symbol"
    }

    async fn transform(&self, mut draft: Draft) -> Result<Draft> {
        let mut symbols = Vec::new();
        for signal in draft.bundle.of_kind(SignalKind::Symbol) {
            let mut parts = words(&signal.content).filter(|w| !w.is_empty());
            let kind = parts
                .next()
                .ok_or_else(|| Error::stage_failed("symbol", "symbol signal has no content"))?;
            let meanings: Vec<String> = parts.collect();
            let mut symbol = Symbol::new(kind, meanings, signal.intensity);
            symbol.archetypal = self
                .archetypes
                .iter()
                .any(|a| symbol.meanings.iter().any(|m| a.influence.contains(m)));
            symbols.push(symbol);
        }
        draft.symbols.extend(symbols);
        Ok(draft)
    }
}

/// Emotion signals become `Emotion` records. Strong opposed emotions raise
/// an `emotional_contradiction` conflict; strong fear flags the artifact
/// as adverse.
pub struct EmotionStage;

#[async_trait::async_trait]
impl Stage for EmotionStage {
    fn name(&self) -> &str {
        "emotion"
    }

    async fn transform(&self, mut draft: Draft) -> Result<Draft> {
        let mut emotions = Vec::new();
        for signal in draft.bundle.of_kind(SignalKind::Emotion) {
            let kind = signal.content.trim().to_lowercase();
            if kind.is_empty() {
                return Err(Error::stage_failed("emotion", "emotion signal has no content"));
            }
            emotions.push(Emotion::new(kind, signal.intensity, "signal"));
        }
        draft.emotions.extend(emotions);

        let peak = |name: &str| {
            draft
                .emotions
                .iter()
                .filter(|e| e.kind == name)
                .map(|e| e.intensity)
                .fold(None, |acc: Option<f64>, i| Some(acc.map_or(i, |a| a.max(i))))
        };

        let mut raised = Vec::new();
        for (a, b) in OPPOSED_EMOTIONS {
            if let (Some(ia), Some(ib)) = (peak(a), peak(b)) {
                if ia >= 0.5 && ib >= 0.5 {
                    let (first, second) = if a <= b { (a, b) } else { (b, a) };
                    raised.push(
                        Conflict::new(
                            format!("emotional_contradiction:{}+{}", first, second),
                            "emotional_contradiction",
                            format!("{} and {} held at once", first, second),
                            ia.min(ib),
                        )
                        .with_effects([first, second]),
                    );
                }
            }
        }
        let adverse = ["fear", "dread"]
            .into_iter()
            .any(|name| peak(name).is_some_and(|i| i > 0.7));

        for conflict in raised {
            draft.raise(conflict);
        }
        if adverse {
            draft.flag(ArtifactCategory::Adverse);
        }
        Ok(draft)
    }
}

/// Derives the reality coefficient and collective resonance, and raises a
/// `reality_strain` conflict when an unstable bundle carries too much charge.
pub struct CoherenceStage;

impl CoherenceStage {
    const STRAIN_STABILITY: f64 = 0.3;
    const STRAIN_INTENSITY: f64 = 1.5;
}

#[async_trait::async_trait]
impl Stage for CoherenceStage {
    fn name(&self) -> &str {
        "coherence"
    }

    async fn transform(&self, mut draft: Draft) -> Result<Draft> {
        let stability = draft.bundle.stability;
        if !stability.is_finite() {
            return Err(Error::stage_failed("coherence", "bundle stability is not finite"));
        }

        if stability < Self::STRAIN_STABILITY && draft.bundle.total_intensity() > Self::STRAIN_INTENSITY {
            let category = draft.category();
            draft.raise(
                Conflict::new(
                    format!("reality_strain:{}", category.as_str()),
                    "reality_strain",
                    "unstable signals carrying heavy charge",
                    1.0 - stability,
                )
                .with_effects(["reality_doubt", "perception_shift"]),
            );
            warn!("Reality strain at stability {:.2}", stability);
        }

        let conflict_load = draft.conflicts.len().min(5) as f64 / 5.0;
        draft.reality_coefficient = clamp_unit(stability * 0.6 + (1.0 - conflict_load) * 0.4);

        let dreams: Vec<f64> = draft.bundle.of_kind(SignalKind::Dream).map(|s| s.intensity).collect();
        let mean_dream = if dreams.is_empty() {
            0.0
        } else {
            dreams.iter().sum::<f64>() / dreams.len() as f64
        };
        draft.collective_resonance = clamp_unit(mean_dream + draft.archetypes.len() as f64 * 0.1);

        if stability > 0.8 && draft.archetypes.contains(&ArchetypeKind::WiseOldMan) {
            draft.flag(ArtifactCategory::Prescient);
        }
        Ok(draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dreamcore_core::{Coordinates, Signal};

    fn bundle(signals: Vec<Signal>, stability: f64) -> SignalBundle {
        SignalBundle::new(signals, Coordinates::origin(), stability)
    }

    #[tokio::test]
    async fn subconscious_tags_archetypes_once() {
        let stage = SubconsciousStage::new(Archetype::standard_set());
        let draft = Draft::new(&bundle(
            vec![
                Signal::dream("fear in the hall of secrets", 0.5),
                Signal::dream("more fear", 0.5),
                Signal::emotion("chaos", 0.5),
            ],
            0.5,
        ));
        let draft = stage.transform(draft).await.unwrap();
        assert_eq!(draft.archetypes, vec![ArchetypeKind::Shadow, ArchetypeKind::Trickster]);
        assert_eq!(draft.fragments.len(), 2);
    }

    #[tokio::test]
    async fn symbol_stage_splits_kind_and_meanings() {
        let stage = SymbolStage::new(Archetype::standard_set());
        let draft = Draft::new(&bundle(vec![Signal::symbol("Owl wisdom night", 0.4)], 0.5));
        let draft = stage.transform(draft).await.unwrap();
        let owl = &draft.symbols[0];
        assert_eq!(owl.kind, "owl");
        assert_eq!(owl.meanings, vec!["wisdom".to_string(), "night".to_string()]);
        assert_eq!(owl.charge, 0.4);
        assert!(owl.archetypal);
    }

    #[tokio::test]
    async fn blank_symbol_fails_the_stage() {
        let stage = SymbolStage::new(vec![]);
        let draft = Draft::new(&bundle(vec![Signal::symbol("   ", 0.4)], 0.5));
        let err = stage.transform(draft).await.unwrap_err();
        assert_eq!(err.kind(), dreamcore_core::ErrorKind::PipelineStageFailed);
    }

    #[tokio::test]
    async fn opposed_emotions_raise_sorted_conflict() {
        let draft = Draft::new(&bundle(
            vec![Signal::emotion("joy", 0.6), Signal::emotion("fear", 0.9)],
            0.5,
        ));
        let draft = EmotionStage.transform(draft).await.unwrap();
        assert_eq!(draft.conflicts.len(), 1);
        assert_eq!(draft.conflicts[0].id.as_str(), "emotional_contradiction:fear+joy");
        assert_eq!(draft.conflicts[0].criticality, 0.6);
        assert_eq!(draft.category(), ArtifactCategory::Adverse);
    }

    #[tokio::test]
    async fn weak_opposition_is_no_conflict() {
        let draft = Draft::new(&bundle(
            vec![Signal::emotion("love", 0.49), Signal::emotion("hate", 0.9)],
            0.5,
        ));
        let draft = EmotionStage.transform(draft).await.unwrap();
        assert!(draft.conflicts.is_empty());
    }

    #[tokio::test]
    async fn coherence_coefficient_and_strain() {
        let mut draft = Draft::new(&bundle(
            vec![Signal::dream("a", 0.9), Signal::emotion("x", 0.9)],
            0.2,
        ));
        draft.tag(ArchetypeKind::Anima);
        let draft = CoherenceStage.transform(draft).await.unwrap();
        assert_eq!(draft.conflicts.len(), 1);
        assert_eq!(draft.conflicts[0].id.as_str(), "reality_strain:normal");
        assert!((draft.conflicts[0].criticality - 0.8).abs() < 1e-9);
        // 0.2*0.6 + (1 - 1/5)*0.4
        assert!((draft.reality_coefficient - 0.44).abs() < 1e-9);
        assert!((draft.collective_resonance - 1.0).abs() < 1e-9);
    }

    #[test]
    fn first_flag_wins() {
        let mut draft = Draft::new(&bundle(vec![], 0.5));
        assert_eq!(draft.category(), ArtifactCategory::Normal);
        draft.flag(ArtifactCategory::Lucid);
        draft.flag(ArtifactCategory::Adverse);
        assert_eq!(draft.category(), ArtifactCategory::Lucid);
    }
}
