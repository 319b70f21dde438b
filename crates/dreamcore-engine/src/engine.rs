//! Engine state controller
//!
//! Drives the cycle loop: collect → pipeline → evaluate → (manifest) →
//! resolve → maintain, then a cancellable random pause. One cycle is in
//! flight at a time; every state mutation happens under the state lock,
//! which is never held across a collaborator call.

use crate::config::EngineConfig;
use crate::evaluator::{Evaluator, Verdict};
use crate::manifest;
use crate::pipeline::Pipeline;
use crate::state::EngineState;
use dreamcore_adapters::{AdapterResult, Collaborators};
use dreamcore_core::{
    Archetype, Artifact, ArtifactId, CollectiveDream, Conflict, ConnectionIntent,
    ContainmentResult, Coordinates, DistortionField, DistortionKind, EnginePhase, EngineStatus,
    Error, ErrorKind, Result, ShutdownReason, WeatherManifestation,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What happened during one cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub cycle: u64,
    pub artifact: Option<ArtifactId>,
    pub score: Option<f64>,
    pub manifested: bool,
    /// Set when a pipeline stage failed and the cycle skipped manifestation.
    pub stage_failure: Option<String>,
    pub resolved: usize,
    pub unresolved: usize,
    pub cascades: usize,
    /// Whether the cycle passed through the resolving phase.
    pub swept: bool,
}

/// Cloneable view onto a running engine.
#[derive(Clone)]
pub struct EngineHandle {
    state: Arc<Mutex<EngineState>>,
    collab: Collaborators,
    cancel: CancellationToken,
}

impl EngineHandle {
    /// Point-in-time snapshot taken under the state lock.
    pub async fn status(&self) -> EngineStatus {
        self.state.lock().await.status()
    }

    /// A retained artifact, if memory still holds it.
    pub async fn artifact(&self, id: &ArtifactId) -> Option<Artifact> {
        self.state.lock().await.memory.get(id).cloned()
    }

    /// Ask the loop to stop. Observed before the next cycle starts.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Weave weather straight from one emotion. `Ok(None)` when the emotion
    /// has no weather mapping.
    pub async fn weather_from_emotion(
        &self,
        emotion: &str,
        intensity: f64,
        location: Coordinates,
    ) -> Result<Option<WeatherManifestation>> {
        let Some(weather) = manifest::weather_for(emotion, intensity, location) else {
            debug!("No weather for emotion {:?}", emotion);
            return Ok(None);
        };
        self.collab
            .sink
            .weave_weather(&weather)
            .await
            .map_err(|e| Error::unavailable("materialization_sink", 1, e.to_string()))?;
        info!("Wove {} from {} ({:.2})", weather.effect.kind, emotion, weather.intensity);
        Ok(Some(weather))
    }

    /// Open a distortion at `location` powered by the current reality weave.
    pub async fn create_distortion(&self, location: Coordinates, kind: DistortionKind) -> Result<DistortionField> {
        let power = self.state.lock().await.reality_weave();
        let field = DistortionField::new(location, kind, power);
        self.collab
            .sink
            .distort(&field)
            .await
            .map_err(|e| Error::unavailable("materialization_sink", 1, e.to_string()))?;
        info!("Opened {:?} distortion, radius {:.1}", kind, field.radius);
        Ok(field)
    }

    /// Share a dream on `theme`. The dream is kept in artifact memory and
    /// broadcast when the collective is connected.
    pub async fn induce_collective_dream(&self, participants: Vec<String>, theme: &str) -> CollectiveDream {
        let (artifact, dream) = manifest::collective_dream(participants, theme);
        info!("Inducing collective dream {} for {} participants", artifact.id, dream.participants.len());

        let connected = self.state.lock().await.is_connected();
        if connected {
            if let Err(e) = self.collab.network.broadcast(&artifact).await {
                warn!("Broadcast of collective dream {} failed: {}", artifact.id, e);
            }
        }
        self.state.lock().await.memory.store(artifact);
        dream
    }
}

pub struct CycleEngine {
    config: EngineConfig,
    pipeline: Pipeline,
    custom_pipeline: bool,
    evaluator: Evaluator,
    collab: Collaborators,
    state: Arc<Mutex<EngineState>>,
    cancel: CancellationToken,
    rng: StdRng,
    sink_failures: u32,
}

impl CycleEngine {
    pub fn new(config: EngineConfig, collab: Collaborators) -> Self {
        let pipeline = Pipeline::standard(&Archetype::standard_set(), config.collaborators.stage_timeout());
        Self {
            evaluator: Evaluator::new(config.gates.clone()),
            state: Arc::new(Mutex::new(EngineState::new(&config))),
            config,
            pipeline,
            custom_pipeline: false,
            collab,
            cancel: CancellationToken::new(),
            rng: StdRng::from_entropy(),
            sink_failures: 0,
        }
    }

    /// Replace the standard pipeline. Initialization keeps it as given.
    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self.custom_pipeline = true;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            state: self.state.clone(),
            collab: self.collab.clone(),
            cancel: self.cancel.clone(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run `op` until it succeeds, retrying only `Unavailable` errors up to
    /// the retry budget.
    async fn retry<T, F, Fut>(&self, collaborator: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AdapterResult<T>>,
    {
        let budget = self.config.collaborators.retry_budget.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_unavailable() && attempt < budget => {
                    warn!("{} unavailable (attempt {}/{}): {}", collaborator, attempt, budget, e);
                    tokio::time::sleep(self.config.collaborators.retry_backoff()).await;
                }
                Err(e) => {
                    error!("{} gave up after {} attempts: {}", collaborator, attempt, e);
                    return Err(Error::unavailable(collaborator, attempt, e.to_string()));
                }
            }
        }
    }

    /// `dormant → cycling`: wait for the signal source, load archetypes,
    /// connect to the collective. A failed connection is not fatal.
    pub async fn initialize(&mut self) -> Result<()> {
        info!("Initializing cycle engine");
        let source = self.collab.source.clone();
        self.retry("signal_source", || source.ready()).await?;

        let archetypes = match self.collab.network.load_archetypes().await {
            Ok(loaded) if !loaded.is_empty() => loaded,
            Ok(_) => Archetype::standard_set(),
            Err(e) => {
                warn!("Failed to load archetypes: {} - using the built-in table", e);
                Archetype::standard_set()
            }
        };
        if !self.custom_pipeline {
            self.pipeline = Pipeline::standard(&archetypes, self.config.collaborators.stage_timeout());
        }
        info!("Loaded {} archetypes, pipeline: {:?}", archetypes.len(), self.pipeline.stage_names());

        let strength = match self.collab.network.connect(ConnectionIntent::Manifestation).await {
            Ok(result) if result.established => result.strength(),
            Ok(_) => {
                warn!("Collective refused the connection - continuing without collective boost");
                0.0
            }
            Err(e) => {
                warn!("Collective connection failed: {} - continuing without collective boost", e);
                0.0
            }
        };

        let mut state = self.state.lock().await;
        state.memory.set_archetypes(archetypes);
        state.set_collective_strength(strength);
        state.transition(EnginePhase::Cycling);
        Ok(())
    }

    /// Run until stopped, the cycle limit is reached, or a terminal error.
    ///
    /// Every exit runs the shutdown sequence. Terminal errors are returned
    /// after it completes.
    pub async fn run(mut self) -> Result<ShutdownReason> {
        if let Err(e) = self.initialize().await {
            self.shutdown(shutdown_reason(&e)).await;
            return Err(e);
        }

        let cancel = self.cancel.clone();
        loop {
            if cancel.is_cancelled() {
                info!("Stop signal observed");
                break;
            }

            match self.run_cycle().await {
                Ok(report) => debug!("{:?}", report),
                Err(e) if e.is_terminal() => {
                    error!("Cycle loop ending: {}", e);
                    self.shutdown(shutdown_reason(&e)).await;
                    return Err(e);
                }
                Err(e) => warn!("Cycle failed: {}", e),
            }

            let cycles = self.state.lock().await.cycles();
            if self.config.schedule.max_cycles.is_some_and(|max| cycles >= max) {
                info!("Reached {} cycles", cycles);
                break;
            }

            let pause = self.next_pause();
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Stop signal during pause");
                    break;
                }
                _ = tokio::time::sleep(pause) => {}
            }
        }

        self.shutdown(ShutdownReason::StopSignal).await;
        Ok(ShutdownReason::StopSignal)
    }

    fn next_pause(&mut self) -> Duration {
        let (lo, hi) = self.config.schedule.pause_bounds();
        let ms = self.rng.gen_range(lo.as_millis() as u64..=hi.as_millis() as u64);
        Duration::from_millis(ms)
    }

    /// One full cycle. Only terminal errors are returned; everything else is
    /// logged and recorded in the report.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let cycle = self.state.lock().await.begin_cycle();
        let mut report = CycleReport { cycle, ..Default::default() };
        debug!("Cycle {} starting", cycle);

        // Collect
        let source = self.collab.source.clone();
        let mut bundle = self.retry("signal_source", || source.scan_signals()).await?;
        if self.state.lock().await.is_connected() {
            match self.collab.network.nearby_signals().await {
                Ok(nearby) => bundle.signals.extend(nearby),
                Err(e) => debug!("No nearby signals: {}", e),
            }
        }

        // Transform
        let mut conflicts: Vec<Conflict> = Vec::new();
        let processed = self.pipeline.process(&bundle).await;
        match processed {
            Ok(output) => {
                report.artifact = Some(output.artifact.id.clone());
                conflicts.extend(output.conflicts);

                // Evaluate
                let verdict = self.evaluator.evaluate(&output.artifact);
                match verdict {
                    Verdict::BelowThreshold { score } => {
                        report.score = Some(score);
                        debug!("{} scored {:.3}, below threshold", output.artifact.id, score);
                    }
                    Verdict::Unstable { score, coefficient, conflict } => {
                        report.score = Some(score);
                        info!(
                            "{} scored {:.3} but coefficient {:.3} is unstable - not manifesting",
                            output.artifact.id, score, coefficient
                        );
                        conflicts.push(conflict);
                    }
                    Verdict::Manifest { score, coefficient } => {
                        report.score = Some(score);
                        report.manifested = self.manifest(&output.artifact, coefficient, bundle.location).await?;
                    }
                }

                self.state.lock().await.memory.store(output.artifact);
            }
            Err(e) => {
                warn!("Cycle {}: {} - skipping manifestation", cycle, e);
                report.stage_failure = Some(e.to_string());
            }
        }

        // Resolve
        let (cascades, fatal) = {
            let mut state = self.state.lock().await;
            let mut fatal = None;
            for conflict in &conflicts {
                match state.resolver.resolve(conflict) {
                    Ok(Some(_)) => {
                        state.record_resolution();
                        report.resolved += 1;
                    }
                    Ok(None) => {
                        state.record_unresolved();
                        report.unresolved += 1;
                    }
                    Err(e) => {
                        state.record_unresolved();
                        report.unresolved += 1;
                        fatal = Some(e);
                        break;
                    }
                }
            }
            (state.resolver.take_cascades(), fatal)
        };
        report.cascades = cascades.len();
        for cascade in &cascades {
            self.contain(cascade.drained.len(), bundle.location).await;
        }
        if let Some(e) = fatal {
            return Err(e);
        }

        // Sweep
        {
            let mut state = self.state.lock().await;
            if state.needs_resolving() {
                info!(
                    "Paradox tolerance at {:.1} - resolving {} active conflicts",
                    state.paradox_tolerance(),
                    state.resolver.active_len()
                );
                state.transition(EnginePhase::Resolving);
                report.swept = true;
                let outcome = state.resolver.resolve_all_active();
                if let Ok(summary) = &outcome {
                    for _ in 0..summary.resolved {
                        state.record_resolution();
                    }
                    report.resolved += summary.resolved;
                    info!("Sweep resolved {}, {} remain", summary.resolved, summary.unresolved);
                }
                state.transition(EnginePhase::Cycling);
                outcome?;
            }
        }

        // Maintain
        let maintenance_due = {
            let mut state = self.state.lock().await;
            state.decay_weave();
            state.recompute_consciousness();
            let every = self.config.schedule.maintenance_every;
            every > 0 && state.cycles() % every == 0
        };
        if maintenance_due {
            if let Err(e) = self.collab.sink.maintain().await {
                warn!("Sink maintenance failed: {}", e);
            }
        }

        Ok(report)
    }

    /// `cycling → manifesting → cycling`. Returns whether the sink accepted
    /// the manifestation. Fails only once the sink has been unreachable for
    /// the whole retry budget in a row.
    async fn manifest(&mut self, artifact: &Artifact, coefficient: f64, target: Coordinates) -> Result<bool> {
        self.state.lock().await.transition(EnginePhase::Manifesting);
        let plan = manifest::plan(artifact, coefficient, target);
        let outcome = self.collab.sink.materialize(&plan).await;

        let (succeeded, connected) = {
            let mut state = self.state.lock().await;
            let succeeded = match &outcome {
                Ok(()) => {
                    self.sink_failures = 0;
                    state.boost_weave();
                    state.recompute_consciousness();
                    info!(
                        "Manifested {} with {} effects (rc {:.2}, weave {:.1})",
                        artifact.id,
                        plan.effects.len(),
                        coefficient,
                        state.reality_weave()
                    );
                    true
                }
                Err(e) => {
                    warn!("Materialization of {} failed: {}", artifact.id, e);
                    if e.is_unavailable() {
                        self.sink_failures += 1;
                    } else {
                        self.sink_failures = 0;
                    }
                    false
                }
            };
            state.transition(EnginePhase::Cycling);
            (succeeded, state.is_connected())
        };

        if let Err(e) = outcome {
            let budget = self.config.collaborators.retry_budget.max(1);
            if e.is_unavailable() && self.sink_failures >= budget {
                return Err(Error::unavailable("materialization_sink", self.sink_failures, e.to_string()));
            }
        }

        if succeeded && connected {
            match self.collab.network.broadcast(artifact).await {
                Ok(result) => debug!(
                    "Broadcast {} reached {} (resonance {:.2})",
                    artifact.id, result.reach, result.resonance
                ),
                Err(e) => warn!("Broadcast of {} failed: {}", artifact.id, e),
            }
        }
        Ok(succeeded)
    }

    async fn contain(&self, drained: usize, epicenter: Coordinates) {
        let radius = self.config.conflicts.containment_radius * drained as f64;
        let field = match self.collab.sink.contain(epicenter, radius).await {
            Ok(result) if result.success => {
                info!(
                    "Contained {} drained conflicts (radius {:.1}, strength {:.2})",
                    drained, result.radius, result.strength
                );
                result
            }
            Ok(_) => {
                warn!("Containment of {} drained conflicts did not hold", drained);
                return;
            }
            Err(e) => {
                warn!("Containment failed: {}", e);
                return;
            }
        };
        self.reinforce(&field).await;
    }

    /// Feed collective power into a standing containment field, then isolate
    /// its area. Without a connection the field is isolated unreinforced.
    async fn reinforce(&self, field: &ContainmentResult) {
        let (connected, weave) = {
            let state = self.state.lock().await;
            (state.is_connected(), state.reality_weave())
        };
        if connected {
            match self.collab.network.extract_energy(ConnectionIntent::Power, weave).await {
                Ok(energy) => {
                    if let Err(e) = self.collab.sink.inject_energy(field, &energy).await {
                        warn!("Energy injection failed: {}", e);
                    }
                    let mut state = self.state.lock().await;
                    state.absorb_energy(&energy);
                    info!(
                        "Absorbed {:.1} collective power, weave {:.1}",
                        energy.power_level,
                        state.reality_weave()
                    );
                }
                Err(e) => warn!("Collective tap failed: {}", e),
            }
        } else {
            debug!("No collective connection - containment runs unreinforced");
        }
        if let Err(e) = self.collab.sink.isolate(field.epicenter, field.radius).await {
            warn!("Isolation failed: {}", e);
        }
    }

    /// Disconnect, archive, seal the sink, then enter `shutdown`.
    async fn shutdown(&mut self, reason: ShutdownReason) {
        info!("Shutting down ({})", reason);
        if let Err(e) = self.collab.network.disconnect().await {
            warn!("Collective disconnect failed: {}", e);
        }

        let record = {
            let mut state = self.state.lock().await;
            state.set_collective_strength(0.0);
            state.archive_record(reason)
        };
        if let Err(e) = self.collab.archive.archive(&record).await {
            error!("Failed to archive engine state: {}", e);
        }
        if let Err(e) = self.collab.sink.seal().await {
            warn!("Failed to seal sink: {}", e);
        }

        self.state.lock().await.transition(EnginePhase::Shutdown);
        self.cancel.cancel();
    }
}

fn shutdown_reason(error: &Error) -> ShutdownReason {
    match error.kind() {
        ErrorKind::CascadeUnrecoverable => ShutdownReason::ParadoxCascade,
        _ => ShutdownReason::CollaboratorUnavailable,
    }
}
