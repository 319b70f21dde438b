//! Signal acquisition
//!
//! `SignalSource` is the seam the engine collects through. The built-in
//! `AmbientSignalSource` fans out to one scanner per signal kind and folds the
//! results into a single bundle.

use crate::error::{AdapterError, AdapterResult};
use dreamcore_core::{Coordinates, Signal, SignalBundle, SignalKind};
use futures::future::try_join_all;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::Mutex;
use tracing::debug;

/// Produces one raw signal bundle per cycle.
///
/// Implementations may return an empty bundle but must not block
/// indefinitely.
#[async_trait::async_trait]
pub trait SignalSource: Send + Sync {
    fn name(&self) -> &str;

    /// Called once before the first cycle. Default: always ready.
    async fn ready(&self) -> AdapterResult<()> {
        Ok(())
    }

    async fn scan_signals(&self) -> AdapterResult<SignalBundle>;
}

/// A scanner for a single kind of signal.
#[async_trait::async_trait]
pub trait Scanner: Send + Sync {
    fn kind(&self) -> SignalKind;
    async fn scan(&self) -> AdapterResult<Vec<Signal>>;
}

/// Scanner that samples from a fixed vocabulary.
pub struct SyntheticScanner {
    kind: SignalKind,
    vocabulary: Vec<String>,
    max_per_scan: usize,
    rng: Mutex<StdRng>,
}

impl SyntheticScanner {
    pub fn new(kind: SignalKind, vocabulary: &[&str], max_per_scan: usize) -> Self {
        Self {
            kind,
            vocabulary: vocabulary.iter().map(|s| s.to_string()).collect(),
            max_per_scan,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic variant for reproducible runs.
    pub fn seeded(kind: SignalKind, vocabulary: &[&str], max_per_scan: usize, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..Self::new(kind, vocabulary, max_per_scan)
        }
    }

    pub fn dreams() -> Self {
        Self::new(
            SignalKind::Dream,
            &[
                "a shadow in the stairwell keeping secrets",
                "an old guide offering wisdom at the shore",
                "a city folding into chaos and change",
                "lucid flight over a silver sea",
                "an intuition that the tide is turning",
                "a long corridor of closed doors",
            ],
            2,
        )
    }

    pub fn emotions() -> Self {
        Self::new(
            SignalKind::Emotion,
            &[
                "joy", "fear", "sadness", "anger", "calm", "love", "hate", "hope", "despair", "dread",
            ],
            3,
        )
    }

    pub fn symbols() -> Self {
        Self::new(
            SignalKind::Symbol,
            &[
                "water cleansing renewal",
                "key secrets access",
                "mirror identity intuition",
                "storm chaos change",
                "owl wisdom guidance",
                "door transition",
            ],
            3,
        )
    }
}

#[async_trait::async_trait]
impl Scanner for SyntheticScanner {
    fn kind(&self) -> SignalKind {
        self.kind
    }

    async fn scan(&self) -> AdapterResult<Vec<Signal>> {
        if self.vocabulary.is_empty() {
            return Ok(Vec::new());
        }
        let mut rng = self.rng.lock().await;
        let count = rng.gen_range(0..=self.max_per_scan);
        let signals = (0..count)
            .map(|_| {
                let idx = rng.gen_range(0..self.vocabulary.len());
                Signal::new(self.kind, self.vocabulary[idx].clone(), rng.gen_range(0.0..1.0))
            })
            .collect();
        Ok(signals)
    }
}

/// Default signal source: dream, emotion and symbol scanners run concurrently.
pub struct AmbientSignalSource {
    scanners: Vec<Box<dyn Scanner>>,
    location: Coordinates,
    stability: Mutex<StdRng>,
}

impl AmbientSignalSource {
    pub fn new(scanners: Vec<Box<dyn Scanner>>, location: Coordinates) -> Self {
        Self {
            scanners,
            location,
            stability: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Synthetic dream, emotion and symbol scanners at the origin.
    pub fn synthetic() -> Self {
        Self::new(
            vec![
                Box::new(SyntheticScanner::dreams()),
                Box::new(SyntheticScanner::emotions()),
                Box::new(SyntheticScanner::symbols()),
            ],
            Coordinates::origin(),
        )
    }
}

#[async_trait::async_trait]
impl SignalSource for AmbientSignalSource {
    fn name(&self) -> &str {
        "ambient"
    }

    async fn ready(&self) -> AdapterResult<()> {
        if self.scanners.is_empty() {
            return Err(AdapterError::unavailable("no scanners registered"));
        }
        Ok(())
    }

    async fn scan_signals(&self) -> AdapterResult<SignalBundle> {
        let batches = try_join_all(self.scanners.iter().map(|s| s.scan())).await?;
        let signals: Vec<Signal> = batches.into_iter().flatten().collect();
        let stability = self.stability.lock().await.gen_range(0.4..1.0);
        debug!("Scanned {} signals (stability {:.2})", signals.len(), stability);
        Ok(SignalBundle::new(signals, self.location, stability))
    }
}
