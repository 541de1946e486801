//! Controller readiness and per-kind load state

use crate::models::ResourceKind;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle of one kind's collection: Unloaded → Loaded → Watching
///
/// A kind reaches `Watching` once its subscription is active, even if its
/// snapshot load failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum LoadPhase {
    #[default]
    Unloaded,
    Loaded,
    Watching,
}

impl fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadPhase::Unloaded => write!(f, "Unloaded"),
            LoadPhase::Loaded => write!(f, "Loaded"),
            LoadPhase::Watching => write!(f, "Watching"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KindStatus {
    pub phase: LoadPhase,
    /// Objects currently cached for the kind
    pub objects: usize,
    /// Most recent load or watch failure
    pub last_error: Option<String>,
}

/// State exposed to host UI glue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerStatus {
    /// False until the first load attempt for the current scope completes
    pub ready: bool,
    /// The last load found nothing to show (config maps do not count)
    pub no_resources: bool,
    pub kinds: BTreeMap<ResourceKind, KindStatus>,
}

impl ControllerStatus {
    pub fn kind(&self, kind: ResourceKind) -> Option<&KindStatus> {
        self.kinds.get(&kind)
    }

    /// Kinds whose last load or watch failed
    pub fn failed_kinds(&self) -> impl Iterator<Item = (ResourceKind, &str)> {
        self.kinds
            .iter()
            .filter_map(|(kind, s)| s.last_error.as_deref().map(|e| (*kind, e)))
    }
}
