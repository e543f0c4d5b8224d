//! Patch model, surface ids and the per-cycle result.
use crate::identity::Identity;
use crate::node::{CallbackId, Props};
use indexmap::{IndexMap, IndexSet};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Handle of a rendered element. Permanent for the life of its record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceId(Arc<str>);

impl SurfaceId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        SurfaceId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SurfaceId {
    fn from(id: &str) -> Self {
        SurfaceId(id.into())
    }
}

impl From<String> for SurfaceId {
    fn from(id: String) -> Self {
        SurfaceId(id.into())
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Issues `fw_id_1`, `fw_id_2`, ... Shared by every context of a reconciler
/// so ids never collide on one surface.
#[derive(Debug, Default)]
pub struct IdGenerator {
    issued: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        IdGenerator { issued: AtomicU64::new(0) }
    }

    pub fn next_id(&self) -> SurfaceId {
        let id = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        SurfaceId(format!("fw_id_{}", id).into())
    }

    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }
}

/// Patch action enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatchAction {
    Insert,
    Remove,
    Update,
    Move,
    Replace,
}

impl fmt::Display for PatchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PatchAction::Insert => "INSERT",
            PatchAction::Remove => "REMOVE",
            PatchAction::Update => "UPDATE",
            PatchAction::Move => "MOVE",
            PatchAction::Replace => "REPLACE",
        })
    }
}

/// Marker a consumer sees for a property that must be cleared.
pub const REMOVED_MARKER: &str = "__removed__";

#[derive(Debug, Clone, PartialEq)]
pub enum PropChange {
    Set(serde_json::Value),
    Removed,
}

impl Serialize for PropChange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PropChange::Set(value) => value.serialize(serializer),
            PropChange::Removed => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(REMOVED_MARKER, &true)?;
                map.end()
            }
        }
    }
}

pub type PropDelta = IndexMap<String, PropChange>;

/// One instruction for the patch consumer. Field names on the wire follow
/// the DOM bridge (`html_id`, `parent_html_id`, `before_id`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "UPPERCASE")]
pub enum Patch {
    Insert {
        #[serde(rename = "html_id")]
        surface_id: SurfaceId,
        #[serde(rename = "parent_html_id")]
        parent: SurfaceId,
        html: String,
        props: Props,
        #[serde(rename = "before_id")]
        before: Option<SurfaceId>,
    },
    Remove {
        #[serde(rename = "html_id")]
        surface_id: SurfaceId,
    },
    Update {
        #[serde(rename = "html_id")]
        surface_id: SurfaceId,
        changes: PropDelta,
    },
    Move {
        #[serde(rename = "html_id")]
        surface_id: SurfaceId,
        #[serde(rename = "parent_html_id")]
        parent: SurfaceId,
        #[serde(rename = "before_id")]
        before: Option<SurfaceId>,
    },
    /// Destroy `surface_id` with its subtree and put `new_surface_id` in its place.
    Replace {
        #[serde(rename = "html_id")]
        surface_id: SurfaceId,
        #[serde(rename = "new_html_id")]
        new_surface_id: SurfaceId,
        html: String,
        props: Props,
    },
}

impl Patch {
    pub fn action(&self) -> PatchAction {
        match self {
            Patch::Insert { .. } => PatchAction::Insert,
            Patch::Remove { .. } => PatchAction::Remove,
            Patch::Update { .. } => PatchAction::Update,
            Patch::Move { .. } => PatchAction::Move,
            Patch::Replace { .. } => PatchAction::Replace,
        }
    }

    /// The element the patch targets (the old one, for REPLACE).
    pub fn surface_id(&self) -> &SurfaceId {
        match self {
            Patch::Insert { surface_id, .. }
            | Patch::Remove { surface_id }
            | Patch::Update { surface_id, .. }
            | Patch::Move { surface_id, .. }
            | Patch::Replace { surface_id, .. } => surface_id,
        }
    }
}

/// Client-side script setup for a freshly materialized element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsInitializer {
    #[serde(rename = "type")]
    pub init_type: String,
    pub target_id: SurfaceId,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallbackBinding {
    pub surface_id: SurfaceId,
    pub prop: String,
}

/// A stateful subtree whose build hook failed this cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RebuildFailure {
    pub identity: Identity,
    pub kind: String,
    pub message: String,
}

/// Everything one reconciliation cycle produced besides the new snapshot.
#[derive(Debug, Default, Serialize)]
pub struct ReconciliationResult {
    pub patches: Vec<Patch>,
    pub active_classes: IndexSet<String>,
    pub callbacks: IndexMap<CallbackId, CallbackBinding>,
    pub js_initializers: Vec<JsInitializer>,
    pub failures: Vec<RebuildFailure>,
    pub disposed: Vec<Identity>,
}

impl ReconciliationResult {
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    pub fn count(&self, action: PatchAction) -> usize {
        self.patches.iter().filter(|p| p.action() == action).count()
    }

    pub fn patches_of(&self, action: PatchAction) -> impl Iterator<Item = &Patch> {
        self.patches.iter().filter(move |p| p.action() == action)
    }
}
