//! Collective network
//!
//! The engine connects once during initialization, broadcasts manifested
//! artifacts, pulls nearby signals while connected, draws energy during
//! containment, and disconnects on shutdown. Failing to connect is
//! recoverable.

use crate::error::{AdapterError, AdapterResult};
use dashmap::DashMap;
use dreamcore_core::{
    Archetype, Artifact, ArtifactId, Bandwidth, BroadcastResult, CollectiveConnection,
    CollectiveEnergy, ConnectionIntent, ConnectionResult, Signal,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::Mutex;
use tracing::{debug, info};

#[async_trait::async_trait]
pub trait CollectiveNetwork: Send + Sync {
    fn name(&self) -> &str;

    async fn connect(&self, intent: ConnectionIntent) -> AdapterResult<ConnectionResult>;

    async fn broadcast(&self, artifact: &Artifact) -> AdapterResult<BroadcastResult>;

    async fn disconnect(&self) -> AdapterResult<()>;

    /// Draw energy scaled from the engine's current `weave`.
    async fn extract_energy(&self, intent: ConnectionIntent, weave: f64) -> AdapterResult<CollectiveEnergy> {
        Ok(CollectiveEnergy::extracted(intent, weave))
    }

    /// Signals observed elsewhere in the collective. Only consulted while
    /// connected. Default: none.
    async fn nearby_signals(&self) -> AdapterResult<Vec<Signal>> {
        Ok(Vec::new())
    }

    /// Archetype reference data. Default: the built-in table.
    async fn load_archetypes(&self) -> AdapterResult<Vec<Archetype>> {
        Ok(Archetype::standard_set())
    }
}

/// In-process collective: random connection strength and reach, archives
/// every successfully broadcast artifact.
pub struct LocalCollective {
    connection: Mutex<Option<CollectiveConnection>>,
    archive: DashMap<ArtifactId, Artifact>,
    rng: Mutex<StdRng>,
}

impl Default for LocalCollective {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalCollective {
    pub fn new() -> Self {
        Self {
            connection: Mutex::new(None),
            archive: DashMap::new(),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn archived_len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_archived(&self, id: &ArtifactId) -> bool {
        self.archive.contains_key(id)
    }

    pub async fn strength(&self) -> f64 {
        self.connection.lock().await.as_ref().map(|c| c.strength).unwrap_or(0.0)
    }
}

#[async_trait::async_trait]
impl CollectiveNetwork for LocalCollective {
    fn name(&self) -> &str {
        "local-collective"
    }

    async fn connect(&self, intent: ConnectionIntent) -> AdapterResult<ConnectionResult> {
        let strength = 0.8 + self.rng.lock().await.gen_range(0.0..0.2);
        let connection = CollectiveConnection {
            intent,
            strength,
            bandwidth: Bandwidth::High,
        };
        *self.connection.lock().await = Some(connection.clone());
        info!("Collective connection established ({:?}, strength {:.2})", intent, strength);
        Ok(ConnectionResult::established(connection))
    }

    async fn broadcast(&self, artifact: &Artifact) -> AdapterResult<BroadcastResult> {
        if self.connection.lock().await.is_none() {
            return Err(AdapterError::rejected("not connected"));
        }
        let reach = self.rng.lock().await.gen_range(1_000..10_000);
        self.archive.insert(artifact.id.clone(), artifact.clone());
        debug!("Broadcast {} to {} minds", artifact.id, reach);
        Ok(BroadcastResult {
            success: true,
            reach,
            resonance: artifact.collective_resonance,
        })
    }

    async fn extract_energy(&self, intent: ConnectionIntent, weave: f64) -> AdapterResult<CollectiveEnergy> {
        if self.connection.lock().await.is_none() {
            return Err(AdapterError::rejected("not connected"));
        }
        let energy = CollectiveEnergy::extracted(intent, weave);
        info!("Collective energy acquired ({:?}, power {:.1})", intent, energy.power_level);
        Ok(energy)
    }

    async fn disconnect(&self) -> AdapterResult<()> {
        *self.connection.lock().await = None;
        info!("Collective connection closed");
        Ok(())
    }

    async fn nearby_signals(&self) -> AdapterResult<Vec<Signal>> {
        let mut rng = self.rng.lock().await;
        let count = rng.gen_range(0..=2);
        let signals = (0..count)
            .map(|i| Signal::dream(format!("a shared dream echo #{}", i), rng.gen_range(0.2..0.9)))
            .collect();
        Ok(signals)
    }
}
