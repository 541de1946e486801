//! Watcher module
//!
//! The seam between live (or static) resource collections and the graph
//! controller. A `ResourceSource` delivers one kind: a snapshot load plus a
//! change subscription that feeds `WatchEvent`s into a shared channel.

mod kube_source;
mod manifest;
mod scope;
mod state;

pub use kube_source::*;
pub use manifest::*;
pub use scope::*;
pub use state::*;

use crate::models::{ObjectError, ResourceKind, ResourceObject};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Event emitted by resource watchers
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// Object was added or updated
    Applied(ResourceObject),
    /// Object was deleted
    Deleted {
        kind: ResourceKind,
        namespace: String,
        name: String,
    },
    /// The watch (re)listed its scope; `objects` is the complete current set
    /// for `namespace` (`None` = every namespace)
    Resynced {
        kind: ResourceKind,
        namespace: Option<String>,
        objects: Vec<ResourceObject>,
    },
    /// Watch error occurred
    Error { kind: ResourceKind, message: String },
}

impl WatchEvent {
    pub fn kind(&self) -> ResourceKind {
        match self {
            WatchEvent::Applied(obj) => obj.kind(),
            WatchEvent::Deleted { kind, .. }
            | WatchEvent::Resynced { kind, .. }
            | WatchEvent::Error { kind, .. } => *kind,
        }
    }
}

/// Errors from loading a kind's collection
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to list {kind}: {source}")]
    Api {
        kind: ResourceKind,
        #[source]
        source: kube::Error,
    },

    #[error("failed to serialize {kind}: {source}")]
    Serialize {
        kind: ResourceKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read manifest {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid object: {0}")]
    InvalidObject(#[from] ObjectError),
}

/// Handle for an active change subscription
///
/// Dropping it (or calling `cancel`) aborts the watch tasks.
#[derive(Debug, Default)]
pub struct Subscription {
    handles: Vec<JoinHandle<()>>,
}

impl Subscription {
    pub fn from_handles(handles: Vec<JoinHandle<()>>) -> Self {
        Self { handles }
    }

    /// A subscription with nothing behind it (static sources)
    pub fn noop() -> Self {
        Self::default()
    }

    /// True while at least one watch task is still running
    pub fn is_active(&self) -> bool {
        self.handles.iter().any(|h| !h.is_finished())
    }

    pub fn cancel(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
        self.handles.clear();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// One kind's collection of objects
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceSource: Send + Sync {
    /// The kind this source delivers
    fn kind(&self) -> ResourceKind;

    /// Snapshot of every object in scope
    async fn load_all(&self, scope: &NamespaceScope) -> Result<Vec<ResourceObject>, SourceError>;

    /// Start delivering changes for `scope` into `events`
    fn subscribe(
        &self,
        scope: &NamespaceScope,
        events: mpsc::UnboundedSender<WatchEvent>,
    ) -> Subscription;
}
