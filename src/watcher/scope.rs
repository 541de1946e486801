//! Namespace scope selection

use std::collections::BTreeSet;
use std::fmt;

/// The set of namespaces the map is currently showing
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NamespaceScope {
    /// Every namespace in the cluster
    #[default]
    All,
    /// Only the listed namespaces
    Only(BTreeSet<String>),
}

impl NamespaceScope {
    /// Build a scope from a namespace list; an empty list means all namespaces
    pub fn from_namespaces<I, S>(namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = namespaces
            .into_iter()
            .map(Into::into)
            .filter(|ns| !ns.is_empty())
            .collect();
        if set.is_empty() {
            NamespaceScope::All
        } else {
            NamespaceScope::Only(set)
        }
    }

    pub fn contains(&self, namespace: &str) -> bool {
        match self {
            NamespaceScope::All => true,
            NamespaceScope::Only(set) => set.contains(namespace),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, NamespaceScope::All)
    }

    /// Explicit namespaces, `None` when watching everything
    pub fn namespaces(&self) -> Option<impl Iterator<Item = &str>> {
        match self {
            NamespaceScope::All => None,
            NamespaceScope::Only(set) => Some(set.iter().map(String::as_str)),
        }
    }
}

impl fmt::Display for NamespaceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamespaceScope::All => write!(f, "all namespaces"),
            NamespaceScope::Only(set) => {
                let list: Vec<&str> = set.iter().map(String::as_str).collect();
                write!(f, "{}", list.join(","))
            }
        }
    }
}
