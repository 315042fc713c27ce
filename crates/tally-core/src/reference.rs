//! # Reference Data
//!
//! Names for the ids stored on documents: branches, warehouses, payment
//! methods and sales representatives.
//!
//! ## Injection
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  tally-db                          tally-core                           │
//! │  ────────                          ──────────                           │
//! │                                                                         │
//! │  ReferenceRepository::load() ──►  ReferenceData ──► impl ReferenceLookup│
//! │  ReferenceCache::refresh()                              │               │
//! │                                                         ▼               │
//! │                              report::by_branch(&records, &lookup)       │
//! │                                                                         │
//! │  There is no process-wide list. Whoever renders a report passes the     │
//! │  lookup in, and decides when to refresh it.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use ts_rs::TS;

/// The kinds of reference list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Branch,
    Warehouse,
    PaymentMethod,
    SalesRep,
}

impl ReferenceKind {
    pub const ALL: [ReferenceKind; 4] = [
        ReferenceKind::Branch,
        ReferenceKind::Warehouse,
        ReferenceKind::PaymentMethod,
        ReferenceKind::SalesRep,
    ];

    /// Backing table name.
    pub const fn table(&self) -> &'static str {
        match self {
            ReferenceKind::Branch => "branches",
            ReferenceKind::Warehouse => "warehouses",
            ReferenceKind::PaymentMethod => "payment_methods",
            ReferenceKind::SalesRep => "sales_reps",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceKind::Branch => write!(f, "branch"),
            ReferenceKind::Warehouse => write!(f, "warehouse"),
            ReferenceKind::PaymentMethod => write!(f, "payment method"),
            ReferenceKind::SalesRep => write!(f, "sales rep"),
        }
    }
}

/// One id → name entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceEntry {
    pub id: String,
    pub name: String,
}

/// Resolves stored ids to display names.
pub trait ReferenceLookup {
    /// Name for `id` in the given list, if known.
    fn name(&self, kind: ReferenceKind, id: &str) -> Option<&str>;

    /// Name for `id`, falling back to the id itself.
    fn label(&self, kind: ReferenceKind, id: &str) -> String {
        self.name(kind, id).unwrap_or(id).to_string()
    }

    fn branch_name(&self, id: &str) -> Option<&str> {
        self.name(ReferenceKind::Branch, id)
    }

    fn warehouse_name(&self, id: &str) -> Option<&str> {
        self.name(ReferenceKind::Warehouse, id)
    }

    fn payment_method_name(&self, id: &str) -> Option<&str> {
        self.name(ReferenceKind::PaymentMethod, id)
    }

    fn sales_rep_name(&self, id: &str) -> Option<&str> {
        self.name(ReferenceKind::SalesRep, id)
    }
}

/// A lookup that knows no names. Reports keep raw ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReferences;

impl ReferenceLookup for NoReferences {
    fn name(&self, _kind: ReferenceKind, _id: &str) -> Option<&str> {
        None
    }
}

/// An in-memory snapshot of all reference lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceData {
    lists: HashMap<ReferenceKind, HashMap<String, String>>,
}

impl ReferenceData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces one list.
    pub fn set(&mut self, kind: ReferenceKind, entries: impl IntoIterator<Item = ReferenceEntry>) {
        let list = entries.into_iter().map(|e| (e.id, e.name)).collect();
        self.lists.insert(kind, list);
    }

    /// Adds or renames a single entry.
    pub fn insert(&mut self, kind: ReferenceKind, id: impl Into<String>, name: impl Into<String>) {
        self.lists
            .entry(kind)
            .or_default()
            .insert(id.into(), name.into());
    }

    /// Entries of one list, sorted by name.
    pub fn entries(&self, kind: ReferenceKind) -> Vec<ReferenceEntry> {
        let mut entries: Vec<ReferenceEntry> = self
            .lists
            .get(&kind)
            .into_iter()
            .flatten()
            .map(|(id, name)| ReferenceEntry {
                id: id.clone(),
                name: name.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        entries
    }

    /// Number of entries across all lists.
    pub fn len(&self) -> usize {
        self.lists.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ReferenceLookup for ReferenceData {
    fn name(&self, kind: ReferenceKind, id: &str) -> Option<&str> {
        self.lists
            .get(&kind)
            .and_then(|list| list.get(id))
            .map(String::as_str)
    }
}
