//! Materialization sink
//!
//! Turns a committed manifestation into observable effects. Rendering is the
//! sink's business; the engine only hands over the plan and logs failures.

use crate::error::AdapterResult;
use dreamcore_core::{
    CollectiveEnergy, ContainmentResult, Coordinates, DistortionField, Manifestation,
    WeatherManifestation,
};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

#[async_trait::async_trait]
pub trait MaterializationSink: Send + Sync {
    fn name(&self) -> &str;

    async fn materialize(&self, manifestation: &Manifestation) -> AdapterResult<()>;

    /// Isolate the fallout of drained conflicts around `epicenter`.
    async fn contain(&self, epicenter: Coordinates, radius: f64) -> AdapterResult<ContainmentResult>;

    /// Reinforce an established containment field with collective energy.
    async fn inject_energy(&self, _field: &ContainmentResult, _energy: &CollectiveEnergy) -> AdapterResult<()> {
        Ok(())
    }

    /// Cut the contained area off from its surroundings.
    async fn isolate(&self, _epicenter: Coordinates, _radius: f64) -> AdapterResult<()> {
        Ok(())
    }

    async fn distort(&self, field: &DistortionField) -> AdapterResult<()>;

    async fn weave_weather(&self, weather: &WeatherManifestation) -> AdapterResult<()>;

    /// Periodic upkeep. Default: nothing to do.
    async fn maintain(&self) -> AdapterResult<()> {
        Ok(())
    }

    /// Last call before shutdown. Default: nothing to flush.
    async fn seal(&self) -> AdapterResult<()> {
        Ok(())
    }
}

/// Sink that renders manifestations as log lines.
#[derive(Default)]
pub struct TracingSink {
    materialized: AtomicU64,
}

impl TracingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn materialized(&self) -> u64 {
        self.materialized.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl MaterializationSink for TracingSink {
    fn name(&self) -> &str {
        "tracing"
    }

    async fn materialize(&self, manifestation: &Manifestation) -> AdapterResult<()> {
        let effects: Vec<&str> = manifestation.effects.iter().map(|e| e.kind.as_str()).collect();
        info!(
            "Weaving {} at ({:.1}, {:.1}, {:.1}) rc={:.2} effects={:?} for {}ms",
            manifestation.artifact.id,
            manifestation.target.x,
            manifestation.target.y,
            manifestation.target.z,
            manifestation.coefficient,
            effects,
            manifestation.duration_ms
        );
        self.materialized.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn contain(&self, epicenter: Coordinates, radius: f64) -> AdapterResult<ContainmentResult> {
        info!(
            "Containment field at ({:.1}, {:.1}, {:.1}) radius {:.1}",
            epicenter.x, epicenter.y, epicenter.z, radius
        );
        Ok(ContainmentResult {
            success: true,
            epicenter,
            radius,
            strength: 0.95,
            residual_effects: vec!["paradox_echoes".into(), "dream_residue".into()],
        })
    }

    async fn inject_energy(&self, field: &ContainmentResult, energy: &CollectiveEnergy) -> AdapterResult<()> {
        info!(
            "Injecting {:?} energy ({:.1}) into containment field radius {:.1}",
            energy.intent, energy.power_level, field.radius
        );
        Ok(())
    }

    async fn isolate(&self, epicenter: Coordinates, radius: f64) -> AdapterResult<()> {
        info!(
            "Isolating ({:.1}, {:.1}, {:.1}) radius {:.1}",
            epicenter.x, epicenter.y, epicenter.z, radius
        );
        Ok(())
    }

    async fn distort(&self, field: &DistortionField) -> AdapterResult<()> {
        info!(
            "Distortion {:?} at ({:.1}, {:.1}, {:.1}) power {:.1} radius {:.1}",
            field.kind, field.location.x, field.location.y, field.location.z, field.power, field.radius
        );
        Ok(())
    }

    async fn weave_weather(&self, weather: &WeatherManifestation) -> AdapterResult<()> {
        info!(
            "Weather {} at intensity {:.2} for {}ms",
            weather.effect.kind, weather.intensity, weather.duration_ms
        );
        Ok(())
    }

    async fn maintain(&self) -> AdapterResult<()> {
        info!("Reality weave maintenance");
        Ok(())
    }
}
