//! Tests for dreamcore-adapters: built-in collaborators, scripted mocks, archive

use dreamcore_adapters::mock::{FailMode, MemoryArchive, RecordingSink, ScriptedNetwork, ScriptedSource};
use dreamcore_adapters::*;
use dreamcore_core::*;
use std::sync::Arc;
use tempfile::TempDir;

fn sample_artifact() -> Artifact {
    Artifact {
        id: ArtifactId::new("artifact-test"),
        source: ArtifactSource::Generated,
        category: ArtifactCategory::Normal,
        emotions: vec![Emotion::new("joy", 0.6, "test")],
        symbols: vec![],
        archetypes: vec![],
        narrative: "a quiet shore".into(),
        reality_coefficient: 0.8,
        collective_resonance: 0.4,
        outcome: ArtifactOutcome::Resolved,
    }
}

fn sample_status() -> EngineStatus {
    EngineStatus {
        phase: EnginePhase::Shutdown,
        consciousness: ConsciousnessLevel::Aware,
        reality_weave: 42.0,
        paradox_tolerance: 80.0,
        artifact_count: 3,
        pattern_count: 1,
        active_conflicts: 0,
        cached_resolutions: 2,
        collective_connection: 0.9,
        cycles: 7,
    }
}

// ===========================================================================
// Ambient signal source
// ===========================================================================

#[tokio::test]
async fn ambient_source_needs_scanners() {
    let empty = AmbientSignalSource::new(vec![], Coordinates::origin());
    let err = empty.ready().await.unwrap_err();
    assert!(err.is_unavailable());

    let synthetic = AmbientSignalSource::synthetic();
    assert!(synthetic.ready().await.is_ok());
}

#[tokio::test]
async fn ambient_source_assembles_bundle_from_all_scanners() {
    let source = AmbientSignalSource::new(
        vec![
            Box::new(SyntheticScanner::seeded(SignalKind::Emotion, &["joy"], 3, 7)),
            Box::new(SyntheticScanner::seeded(SignalKind::Symbol, &["key secrets"], 3, 11)),
        ],
        Coordinates::new(4.0, 5.0, 6.0),
    );
    for _ in 0..10 {
        let bundle = source.scan_signals().await.unwrap();
        assert_eq!(bundle.location, Coordinates::new(4.0, 5.0, 6.0));
        assert!((0.4..1.0).contains(&bundle.stability));
        assert!(bundle.signals.len() <= 6);
        assert!(bundle.of_kind(SignalKind::Dream).next().is_none());
        for signal in &bundle.signals {
            assert!((0.0..=1.0).contains(&signal.intensity));
        }
    }
}

#[tokio::test]
async fn seeded_scanner_is_reproducible() {
    let a = SyntheticScanner::seeded(SignalKind::Dream, &["one", "two", "three"], 4, 42);
    let b = SyntheticScanner::seeded(SignalKind::Dream, &["one", "two", "three"], 4, 42);
    for _ in 0..5 {
        assert_eq!(a.scan().await.unwrap(), b.scan().await.unwrap());
    }
}

#[tokio::test]
async fn empty_vocabulary_scans_nothing() {
    let scanner = SyntheticScanner::new(SignalKind::Symbol, &[], 3);
    assert!(scanner.scan().await.unwrap().is_empty());
}

// ===========================================================================
// Local collective
// ===========================================================================

#[tokio::test]
async fn local_collective_rejects_broadcast_before_connect() {
    let net = LocalCollective::new();
    let err = net.broadcast(&sample_artifact()).await.unwrap_err();
    assert!(matches!(err, AdapterError::Rejected(_)));
    assert_eq!(net.archived_len(), 0);
}

#[tokio::test]
async fn local_collective_connects_broadcasts_and_archives() {
    let net = LocalCollective::new();
    let result = net.connect(ConnectionIntent::Manifestation).await.unwrap();
    assert!(result.established);
    assert!((0.8..=1.0).contains(&result.strength()));
    assert_eq!(net.strength().await, result.strength());

    let artifact = sample_artifact();
    let broadcast = net.broadcast(&artifact).await.unwrap();
    assert!(broadcast.success);
    assert!((1_000..10_000).contains(&broadcast.reach));
    assert_eq!(broadcast.resonance, 0.4);
    assert!(net.is_archived(&artifact.id));

    net.disconnect().await.unwrap();
    assert_eq!(net.strength().await, 0.0);
    assert!(net.broadcast(&artifact).await.is_err());
}

#[tokio::test]
async fn local_collective_energy_needs_a_connection() {
    let net = LocalCollective::new();
    let err = net.extract_energy(ConnectionIntent::Power, 40.0).await.unwrap_err();
    assert!(matches!(err, AdapterError::Rejected(_)));

    net.connect(ConnectionIntent::Power).await.unwrap();
    let energy = net.extract_energy(ConnectionIntent::Power, 40.0).await.unwrap();
    assert_eq!(energy.intent, ConnectionIntent::Power);
    assert_eq!(energy.power_level, 60.0);
    assert_eq!(energy.purity, 0.9);
    assert!((energy.weave_gain() - 6.0).abs() < 1e-9);
}

#[tokio::test]
async fn default_archetypes_are_the_standard_set() {
    let net = LocalCollective::new();
    assert_eq!(net.load_archetypes().await.unwrap(), Archetype::standard_set());
}

// ===========================================================================
// Tracing sink
// ===========================================================================

#[tokio::test]
async fn tracing_sink_counts_and_contains() {
    let sink = TracingSink::new();
    let manifestation = Manifestation {
        artifact: sample_artifact(),
        coefficient: 0.5,
        target: Coordinates::origin(),
        effects: vec![Effect::new("sunshine", EffectIntensity::Gentle)],
        impacts: vec![],
        duration_ms: 10_000,
    };
    sink.materialize(&manifestation).await.unwrap();
    sink.materialize(&manifestation).await.unwrap();
    assert_eq!(sink.materialized(), 2);

    let contained = sink.contain(Coordinates::new(1.0, 1.0, 1.0), 30.0).await.unwrap();
    assert!(contained.success);
    assert_eq!(contained.radius, 30.0);
    assert!(sink.maintain().await.is_ok());
    assert!(sink.seal().await.is_ok());
}

#[tokio::test]
async fn tracing_sink_accepts_distortion_and_weather() {
    let sink = TracingSink::new();
    let field = DistortionField::new(Coordinates::origin(), DistortionKind::SpatialFolding, 12.0);
    assert_eq!(field.radius, 120.0);
    assert_eq!(field.effects.len(), 3);
    sink.distort(&field).await.unwrap();

    let rain = Effect::new("gentle_rain", EffectIntensity::Light);
    let weather = WeatherManifestation::new(rain, 1.4, Coordinates::origin());
    assert_eq!(weather.intensity, 1.0);
    assert_eq!(weather.duration_ms, 10_000);
    sink.weave_weather(&weather).await.unwrap();
    assert_eq!(sink.materialized(), 0);
}

// ===========================================================================
// JSON file archive
// ===========================================================================

#[tokio::test]
async fn json_archive_writes_parseable_record() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("archive");
    let archive = JsonFileArchive::new(&dir);

    let record = StateArchiveRecord {
        archived_at: chrono::Utc::now(),
        reason: ShutdownReason::ParadoxCascade,
        status: sample_status(),
        active_conflicts: vec![Conflict::new("c-1", "test", "left over", 0.95)],
        resolutions: vec![Resolution::new(
            ConflictId::new("c-0"),
            StrategyKind::AcceptBoth,
            "both hold",
            0.7,
        )],
    };
    archive.archive(&record).await.unwrap();

    let files: Vec<_> = std::fs::read_dir(&dir).unwrap().map(|e| e.unwrap().path()).collect();
    assert_eq!(files.len(), 1, "temp file must be renamed away");
    let name = files[0].file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("state-") && name.ends_with(".json"), "{}", name);

    let back: StateArchiveRecord = serde_json::from_str(&std::fs::read_to_string(&files[0]).unwrap()).unwrap();
    assert_eq!(back, record);
}

// ===========================================================================
// Scripted collaborators
// ===========================================================================

#[tokio::test]
async fn scripted_source_replays_then_falls_back() {
    let first = SignalBundle::new(vec![Signal::emotion("joy", 0.9)], Coordinates::origin(), 0.8);
    let fallback = SignalBundle::empty(Coordinates::origin(), 0.5);
    let source = ScriptedSource::new(vec![Ok(first.clone()), Err(AdapterError::unavailable("blip"))])
        .with_fallback(fallback.clone());

    assert_eq!(source.scan_signals().await.unwrap(), first);
    assert!(source.scan_signals().await.unwrap_err().is_unavailable());
    assert_eq!(source.scan_signals().await.unwrap(), fallback);
    assert_eq!(source.scan_signals().await.unwrap(), fallback);
    assert_eq!(source.scans(), 4);
}

#[tokio::test]
async fn scripted_source_ready_failures_count_down() {
    let source = ScriptedSource::unreachable().with_ready_failures(2);
    assert!(source.ready().await.is_err());
    assert!(source.ready().await.is_err());
    assert!(source.ready().await.is_ok());
    assert!(source.scan_signals().await.unwrap_err().is_unavailable());
}

#[tokio::test]
async fn recording_sink_failure_modes() {
    let manifestation = Manifestation {
        artifact: sample_artifact(),
        coefficient: 0.5,
        target: Coordinates::origin(),
        effects: vec![],
        impacts: vec![],
        duration_ms: 1,
    };

    let down = RecordingSink::failing(FailMode::Unavailable);
    assert!(down.materialize(&manifestation).await.unwrap_err().is_unavailable());
    assert!(down.manifestations().await.is_empty());

    let refusing = RecordingSink::failing(FailMode::Rejected);
    let err = refusing.materialize(&manifestation).await.unwrap_err();
    assert!(!err.is_unavailable());

    let healthy = RecordingSink::new();
    healthy.materialize(&manifestation).await.unwrap();
    healthy.seal().await.unwrap();
    assert_eq!(healthy.manifestations().await.len(), 1);
    assert!(healthy.is_sealed());
}

#[tokio::test]
async fn scripted_network_tracks_connection() {
    let net = ScriptedNetwork::new(0.75).with_nearby(vec![Signal::dream("echo", 0.5)]);
    assert!(net.broadcast(&sample_artifact()).await.is_err());

    let result = net.connect(ConnectionIntent::Manifestation).await.unwrap();
    assert_eq!(result.strength(), 0.75);
    net.broadcast(&sample_artifact()).await.unwrap();
    assert_eq!(net.broadcasts().await, vec![ArtifactId::new("artifact-test")]);
    assert_eq!(net.nearby_signals().await.unwrap().len(), 1);

    net.disconnect().await.unwrap();
    assert!(!net.is_connected());
    assert_eq!(net.disconnects(), 1);

    let refusing = ScriptedNetwork::refusing();
    assert!(refusing.connect(ConnectionIntent::Power).await.is_err());
}

#[tokio::test]
async fn collaborators_bundle_is_object_safe() {
    let archive = Arc::new(MemoryArchive::new());
    let collab = Collaborators {
        source: Arc::new(ScriptedSource::repeating(SignalBundle::empty(Coordinates::origin(), 1.0))),
        network: Arc::new(ScriptedNetwork::default()),
        sink: Arc::new(RecordingSink::new()),
        archive: archive.clone(),
    };
    let record = StateArchiveRecord {
        archived_at: chrono::Utc::now(),
        reason: ShutdownReason::StopSignal,
        status: sample_status(),
        active_conflicts: vec![],
        resolutions: vec![],
    };
    collab.archive.archive(&record).await.unwrap();
    assert_eq!(archive.records().await.len(), 1);
    assert_eq!(collab.source.name(), "scripted-source");
}
