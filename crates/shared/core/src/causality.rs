//! Causality Chain - copy-on-extend id ledger for audit reconstruction
//!
//! Every message through the pipeline carries a chain linking the final
//! decision back to the external event that triggered it. The chain holds
//! identifiers only, never business payload: reconstructing "why did this
//! order exist" is a matter of joining the recorded ids against persisted
//! records downstream.
//!
//! The type is a value object with no in-place mutators. Workers that
//! contribute an id call [`CausalityChain::extended`] and forward the new
//! value; everyone else forwards the chain untouched.

use crate::identifiers::EventId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of record a link points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkKind {
    /// A detected signal
    Signal,
    /// A planning directive
    Directive,
    /// A trade plan fragment
    Plan,
    /// An order handed to execution
    Order,
}

/// One downstream identifier appended to the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CausalityLink {
    pub kind: LinkKind,
    pub id: Uuid,
}

/// Immutable ledger of ids from the originating event to the final decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CausalityChain {
    origin: EventId,
    links: Vec<CausalityLink>,
}

impl CausalityChain {
    /// Start a chain at the originating external event
    pub fn root(origin: EventId) -> Self {
        Self {
            origin,
            links: Vec::new(),
        }
    }

    /// The external event this chain descends from
    pub fn origin(&self) -> EventId {
        self.origin
    }

    /// All links in append order
    pub fn links(&self) -> &[CausalityLink] {
        &self.links
    }

    /// Return a new chain with one more link; `self` is left untouched
    pub fn extended(&self, kind: LinkKind, id: Uuid) -> Self {
        let mut links = self.links.clone();
        links.push(CausalityLink { kind, id });
        Self {
            origin: self.origin,
            links,
        }
    }

    /// Return a new chain with several links appended in order
    pub fn extended_all(&self, kind: LinkKind, ids: impl IntoIterator<Item = Uuid>) -> Self {
        let mut links = self.links.clone();
        links.extend(ids.into_iter().map(|id| CausalityLink { kind, id }));
        Self {
            origin: self.origin,
            links,
        }
    }

    /// Ids of all links of one kind, in append order
    pub fn ids_of_kind(&self, kind: LinkKind) -> Vec<Uuid> {
        self.links
            .iter()
            .filter(|l| l.kind == kind)
            .map(|l| l.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}
