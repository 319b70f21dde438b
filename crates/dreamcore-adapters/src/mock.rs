//! Scripted collaborators
//!
//! Deterministic stand-ins used by the engine tests to drive whole cycles:
//! each one records what the engine asked of it and can be told to fail.

use crate::archive::StateArchive;
use crate::error::{AdapterError, AdapterResult};
use crate::network::CollectiveNetwork;
use crate::sink::MaterializationSink;
use crate::source::SignalSource;
use dreamcore_core::{
    Archetype, Artifact, ArtifactId, Bandwidth, BroadcastResult, CollectiveConnection,
    CollectiveEnergy, ConnectionIntent, ConnectionResult, ContainmentResult, Coordinates,
    DistortionField, Manifestation, Signal, SignalBundle, StateArchiveRecord,
    WeatherManifestation,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use tokio::sync::Mutex;

/// How a scripted collaborator answers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailMode {
    #[default]
    Healthy,
    Unavailable,
    Rejected,
}

impl FailMode {
    fn check(&self, what: &str) -> AdapterResult<()> {
        match self {
            Self::Healthy => Ok(()),
            Self::Unavailable => Err(AdapterError::unavailable(format!("{} unreachable", what))),
            Self::Rejected => Err(AdapterError::rejected(format!("{} refused", what))),
        }
    }
}

// ---------------------------------------------------------------------------
// Signal source
// ---------------------------------------------------------------------------

/// Replays scripted scan results in order, then repeats the fallback bundle.
pub struct ScriptedSource {
    script: Mutex<VecDeque<AdapterResult<SignalBundle>>>,
    fallback: Option<SignalBundle>,
    ready_failures: AtomicU32,
    scans: AtomicU64,
}

impl ScriptedSource {
    pub fn new(script: Vec<AdapterResult<SignalBundle>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: None,
            ready_failures: AtomicU32::new(0),
            scans: AtomicU64::new(0),
        }
    }

    /// Returns `bundle` on every scan.
    pub fn repeating(bundle: SignalBundle) -> Self {
        Self::new(Vec::new()).with_fallback(bundle)
    }

    /// Every scan fails as unreachable.
    pub fn unreachable() -> Self {
        Self::new(Vec::new())
    }

    pub fn with_fallback(mut self, bundle: SignalBundle) -> Self {
        self.fallback = Some(bundle);
        self
    }

    /// The first `n` readiness checks fail as unreachable.
    pub fn with_ready_failures(self, n: u32) -> Self {
        self.ready_failures.store(n, Ordering::Relaxed);
        self
    }

    pub fn scans(&self) -> u64 {
        self.scans.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl SignalSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted-source"
    }

    async fn ready(&self) -> AdapterResult<()> {
        let remaining = self.ready_failures.load(Ordering::Relaxed);
        if remaining > 0 {
            self.ready_failures.store(remaining - 1, Ordering::Relaxed);
            return Err(AdapterError::unavailable("warming up"));
        }
        Ok(())
    }

    async fn scan_signals(&self) -> AdapterResult<SignalBundle> {
        self.scans.fetch_add(1, Ordering::Relaxed);
        if let Some(next) = self.script.lock().await.pop_front() {
            return next;
        }
        match &self.fallback {
            Some(bundle) => Ok(bundle.clone()),
            None => Err(AdapterError::unavailable("script exhausted")),
        }
    }
}

// ---------------------------------------------------------------------------
// Materialization sink
// ---------------------------------------------------------------------------

/// Records every manifestation and containment request.
#[derive(Default)]
pub struct RecordingSink {
    mode: FailMode,
    manifestations: Mutex<Vec<Manifestation>>,
    containments: Mutex<Vec<(Coordinates, f64)>>,
    injections: Mutex<Vec<CollectiveEnergy>>,
    isolations: Mutex<Vec<(Coordinates, f64)>>,
    distortions: Mutex<Vec<DistortionField>>,
    weather: Mutex<Vec<WeatherManifestation>>,
    maintained: AtomicU64,
    sealed: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mode: FailMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub async fn manifestations(&self) -> Vec<Manifestation> {
        self.manifestations.lock().await.clone()
    }

    pub async fn containments(&self) -> Vec<(Coordinates, f64)> {
        self.containments.lock().await.clone()
    }

    pub async fn injections(&self) -> Vec<CollectiveEnergy> {
        self.injections.lock().await.clone()
    }

    pub async fn isolations(&self) -> Vec<(Coordinates, f64)> {
        self.isolations.lock().await.clone()
    }

    pub async fn distortions(&self) -> Vec<DistortionField> {
        self.distortions.lock().await.clone()
    }

    pub async fn weather(&self) -> Vec<WeatherManifestation> {
        self.weather.lock().await.clone()
    }

    pub fn maintained(&self) -> u64 {
        self.maintained.load(Ordering::Relaxed)
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl MaterializationSink for RecordingSink {
    fn name(&self) -> &str {
        "recording-sink"
    }

    async fn materialize(&self, manifestation: &Manifestation) -> AdapterResult<()> {
        self.mode.check("sink")?;
        self.manifestations.lock().await.push(manifestation.clone());
        Ok(())
    }

    async fn contain(&self, epicenter: Coordinates, radius: f64) -> AdapterResult<ContainmentResult> {
        self.containments.lock().await.push((epicenter, radius));
        Ok(ContainmentResult {
            success: true,
            epicenter,
            radius,
            strength: 1.0,
            residual_effects: Vec::new(),
        })
    }

    async fn inject_energy(&self, _field: &ContainmentResult, energy: &CollectiveEnergy) -> AdapterResult<()> {
        self.injections.lock().await.push(energy.clone());
        Ok(())
    }

    async fn isolate(&self, epicenter: Coordinates, radius: f64) -> AdapterResult<()> {
        self.isolations.lock().await.push((epicenter, radius));
        Ok(())
    }

    async fn distort(&self, field: &DistortionField) -> AdapterResult<()> {
        self.mode.check("sink")?;
        self.distortions.lock().await.push(field.clone());
        Ok(())
    }

    async fn weave_weather(&self, weather: &WeatherManifestation) -> AdapterResult<()> {
        self.mode.check("sink")?;
        self.weather.lock().await.push(weather.clone());
        Ok(())
    }

    async fn maintain(&self) -> AdapterResult<()> {
        self.maintained.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn seal(&self) -> AdapterResult<()> {
        self.sealed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Collective network
// ---------------------------------------------------------------------------

/// Network with a fixed connection strength and scripted nearby signals.
pub struct ScriptedNetwork {
    connect_mode: FailMode,
    strength: f64,
    nearby: Vec<Signal>,
    archetypes: Vec<Archetype>,
    connected: AtomicBool,
    broadcasts: Mutex<Vec<ArtifactId>>,
    extractions: AtomicU32,
    disconnects: AtomicU32,
}

impl Default for ScriptedNetwork {
    fn default() -> Self {
        Self::new(0.9)
    }
}

impl ScriptedNetwork {
    pub fn new(strength: f64) -> Self {
        Self {
            connect_mode: FailMode::Healthy,
            strength,
            nearby: Vec::new(),
            archetypes: Archetype::standard_set(),
            connected: AtomicBool::new(false),
            broadcasts: Mutex::new(Vec::new()),
            extractions: AtomicU32::new(0),
            disconnects: AtomicU32::new(0),
        }
    }

    /// Every connection attempt fails.
    pub fn refusing() -> Self {
        Self {
            connect_mode: FailMode::Unavailable,
            ..Self::new(0.0)
        }
    }

    pub fn with_nearby(mut self, signals: Vec<Signal>) -> Self {
        self.nearby = signals;
        self
    }

    pub fn with_archetypes(mut self, archetypes: Vec<Archetype>) -> Self {
        self.archetypes = archetypes;
        self
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub async fn broadcasts(&self) -> Vec<ArtifactId> {
        self.broadcasts.lock().await.clone()
    }

    pub fn extractions(&self) -> u32 {
        self.extractions.load(Ordering::Relaxed)
    }

    pub fn disconnects(&self) -> u32 {
        self.disconnects.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl CollectiveNetwork for ScriptedNetwork {
    fn name(&self) -> &str {
        "scripted-network"
    }

    async fn connect(&self, intent: ConnectionIntent) -> AdapterResult<ConnectionResult> {
        self.connect_mode.check("collective")?;
        self.connected.store(true, Ordering::Relaxed);
        Ok(ConnectionResult::established(CollectiveConnection {
            intent,
            strength: self.strength,
            bandwidth: Bandwidth::Medium,
        }))
    }

    async fn broadcast(&self, artifact: &Artifact) -> AdapterResult<BroadcastResult> {
        if !self.is_connected() {
            return Err(AdapterError::rejected("not connected"));
        }
        self.broadcasts.lock().await.push(artifact.id.clone());
        Ok(BroadcastResult {
            success: true,
            reach: 1_000,
            resonance: artifact.collective_resonance,
        })
    }

    async fn extract_energy(&self, intent: ConnectionIntent, weave: f64) -> AdapterResult<CollectiveEnergy> {
        if !self.is_connected() {
            return Err(AdapterError::rejected("not connected"));
        }
        self.extractions.fetch_add(1, Ordering::Relaxed);
        Ok(CollectiveEnergy::extracted(intent, weave))
    }

    async fn disconnect(&self) -> AdapterResult<()> {
        self.connected.store(false, Ordering::Relaxed);
        self.disconnects.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn nearby_signals(&self) -> AdapterResult<Vec<Signal>> {
        Ok(self.nearby.clone())
    }

    async fn load_archetypes(&self) -> AdapterResult<Vec<Archetype>> {
        Ok(self.archetypes.clone())
    }
}

// ---------------------------------------------------------------------------
// Archive
// ---------------------------------------------------------------------------

/// Keeps archived records in memory.
#[derive(Default)]
pub struct MemoryArchive {
    records: Mutex<Vec<StateArchiveRecord>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<StateArchiveRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl StateArchive for MemoryArchive {
    async fn archive(&self, record: &StateArchiveRecord) -> AdapterResult<()> {
        self.records.lock().await.push(record.clone());
        Ok(())
    }
}
