/*!
 * Structural Patterns and Contexts
 * Opaque pattern values and resolved graph locations
 */

use crate::core::types::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Opaque structural-graph pattern. The engine never interprets the query
/// text; its only operation is submission to the external Pattern Matcher.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuralPattern(String);

impl StructuralPattern {
    /// Wrap a pattern query. Emptiness is checked at monitor insertion,
    /// not here, so malformed definitions are rejected as a whole.
    pub fn new(query: impl Into<String>) -> Self {
        Self(query.into())
    }

    #[inline]
    pub fn query(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for StructuralPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StructuralPattern {
    fn from(query: &str) -> Self {
        Self::new(query)
    }
}

/// Variables bound by a successful pattern match
pub type Bindings = std::collections::BTreeMap<String, serde_json::Value>;

/// Resolved structural-graph location of a runtime event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralContext {
    /// Graph node the event maps to (0 when unresolved)
    pub node_id: NodeId,
    /// Enclosing scopes, innermost first
    pub scope_chain: Vec<NodeId>,
    /// Semantic-role labels attached to the location
    pub tags: BTreeSet<String>,
}

impl StructuralContext {
    pub fn new(node_id: NodeId, scope_chain: Vec<NodeId>, tags: BTreeSet<String>) -> Self {
        Self {
            node_id,
            scope_chain,
            tags,
        }
    }

    /// The empty context used when resolution fails. Structural and
    /// data-flow patterns never match against it; watchpoints keyed purely
    /// by variable name still record raw values without context tags.
    pub fn unresolved() -> Self {
        Self {
            node_id: 0,
            scope_chain: Vec::new(),
            tags: BTreeSet::new(),
        }
    }

    #[inline]
    pub fn is_unresolved(&self) -> bool {
        self.node_id == 0 && self.scope_chain.is_empty() && self.tags.is_empty()
    }
}
