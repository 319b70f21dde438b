//! Collaborator adapters for the dreamcore cycle engine
//!
//! The engine talks to the outside world through four async seams:
//! - `SignalSource`: raw signal bundles, one per cycle
//! - `CollectiveNetwork`: connect, broadcast, disconnect
//! - `MaterializationSink`: renders manifestations, contains cascades
//! - `StateArchive`: persists engine state on shutdown

pub mod archive;
pub mod error;
pub mod mock;
pub mod network;
pub mod sink;
pub mod source;

pub use archive::{JsonFileArchive, StateArchive};
pub use error::{AdapterError, AdapterResult};
pub use network::{CollectiveNetwork, LocalCollective};
pub use sink::{MaterializationSink, TracingSink};
pub use source::{AmbientSignalSource, Scanner, SignalSource, SyntheticScanner};

use std::path::PathBuf;
use std::sync::Arc;

/// The set of collaborators a cycle engine is built with.
#[derive(Clone)]
pub struct Collaborators {
    pub source: Arc<dyn SignalSource>,
    pub network: Arc<dyn CollectiveNetwork>,
    pub sink: Arc<dyn MaterializationSink>,
    pub archive: Arc<dyn StateArchive>,
}

impl Collaborators {
    /// In-process collaborators: synthetic scanners, a local collective,
    /// a logging sink and a JSON archive under `archive_dir`.
    pub fn builtin(archive_dir: impl Into<PathBuf>) -> Self {
        Self {
            source: Arc::new(AmbientSignalSource::synthetic()),
            network: Arc::new(LocalCollective::new()),
            sink: Arc::new(TracingSink::new()),
            archive: Arc::new(JsonFileArchive::new(archive_dir)),
        }
    }
}
