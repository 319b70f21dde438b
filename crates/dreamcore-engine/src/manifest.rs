//! Manifestation planning
//!
//! Translates an artifact that cleared both gates into the effect list the
//! sink renders. Direct weather and collective dreams reuse the same mapping.

use dreamcore_core::{
    ArchetypeKind, Artifact, ArtifactCategory, ArtifactId, ArtifactOutcome, ArtifactSource,
    CollectiveDream, Coordinates, Effect, EffectIntensity, Manifestation, WeatherManifestation,
};

pub const MANIFESTATION_DURATION_MS: u64 = 10_000;
pub const MANIFESTATION_IMPACTS: [&str; 2] = ["emotional_disturbance", "reality_doubt"];

/// Weather-like effect for a known emotion.
fn emotion_effect(kind: &str, intensity: f64) -> Option<Effect> {
    let effect = match kind {
        "fear" => Effect::new("thunderstorm", EffectIntensity::High).with("ominous", true),
        "joy" => Effect::new("sunshine", EffectIntensity::Gentle).with("warmth", intensity),
        "anger" => Effect::new("heat_wave", EffectIntensity::Extreme).with("oppressive", true),
        "sadness" => Effect::new("gentle_rain", EffectIntensity::Light).with("melancholic", true),
        _ => return None,
    };
    Some(effect)
}

/// Weather woven straight from one emotion, or `None` when the emotion has
/// no weather mapping.
pub fn weather_for(emotion: &str, intensity: f64, location: Coordinates) -> Option<WeatherManifestation> {
    let effect = emotion_effect(emotion, intensity)?;
    Some(WeatherManifestation::new(effect, intensity, location))
}

/// A shared dream on `theme`. It carries no emotions or symbols of its own,
/// so its effects come only from category and archetypes.
pub fn collective_dream(participants: Vec<String>, theme: &str) -> (Artifact, CollectiveDream) {
    let artifact = Artifact {
        id: ArtifactId::generate(),
        source: ArtifactSource::Collective,
        category: ArtifactCategory::Normal,
        emotions: Vec::new(),
        symbols: Vec::new(),
        archetypes: Vec::new(),
        narrative: theme.to_string(),
        reality_coefficient: 0.8,
        collective_resonance: 0.9,
        outcome: ArtifactOutcome::Resolved,
    };
    let dream = CollectiveDream {
        participants,
        narrative: artifact.narrative.clone(),
        reality_coefficient: artifact.reality_coefficient,
        effects: plan_effects(&artifact),
    };
    (artifact, dream)
}

pub fn plan_effects(artifact: &Artifact) -> Vec<Effect> {
    let mut effects: Vec<Effect> = artifact
        .emotions
        .iter()
        .filter_map(|e| emotion_effect(&e.kind, e.intensity))
        .collect();

    for symbol in &artifact.symbols {
        let mut effect = Effect::new(format!("symbolic_{}", symbol.kind), EffectIntensity::Medium)
            .with("charge", symbol.charge);
        if let Some(meaning) = symbol.meanings.first() {
            effect = effect.with("meaning", meaning.as_str());
        }
        effects.push(effect);
    }

    if artifact.category == ArtifactCategory::Adverse {
        effects.push(Effect::new("psychic_storm", EffectIntensity::High).with("fear_amplification", 2.0));
    }
    if artifact.has_archetype(ArchetypeKind::Trickster) {
        effects.push(Effect::new("causal_rift", EffectIntensity::High).with("chaos_factor", 0.8));
    }
    effects
}

pub fn plan(artifact: &Artifact, coefficient: f64, target: Coordinates) -> Manifestation {
    Manifestation {
        artifact: artifact.clone(),
        coefficient,
        target,
        effects: plan_effects(artifact),
        impacts: MANIFESTATION_IMPACTS.iter().map(|s| s.to_string()).collect(),
        duration_ms: MANIFESTATION_DURATION_MS,
    }
}
