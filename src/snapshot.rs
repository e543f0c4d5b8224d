//! The engine's memory of what was last rendered in one context.
use crate::identity::{Identity, Key};
use crate::node::{ElementKind, Props};
use crate::types::SurfaceId;
use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub surface_id: SurfaceId,
    pub kind: ElementKind,
    /// First key found on the node or any wrapper around it.
    pub key: Option<Key>,
    pub props: Props,
    pub parent: SurfaceId,
    pub children: Vec<Identity>,
    /// Stateful identities whose build output resolved to this element.
    pub owners: Vec<Identity>,
}

/// Records in traversal order; a parent always precedes its children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    root: Option<Identity>,
    records: IndexMap<Identity, Record>,
}

impl Snapshot {
    pub fn new() -> Self {
        Snapshot::default()
    }

    pub fn root(&self) -> Option<&Identity> {
        self.root.as_ref()
    }

    pub fn root_record(&self) -> Option<&Record> {
        self.root.as_ref().and_then(|id| self.records.get(id))
    }

    pub fn get(&self, identity: &Identity) -> Option<&Record> {
        self.records.get(identity)
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.records.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Identity, &Record)> {
        self.records.iter()
    }

    /// Surface ids of `identity`'s children, in render order.
    pub fn child_surface_ids(&self, identity: &Identity) -> Vec<&SurfaceId> {
        self.records
            .get(identity)
            .map(|r| r.children.iter().filter_map(|c| self.records.get(c)).map(|c| &c.surface_id).collect())
            .unwrap_or_default()
    }

    pub(crate) fn set_root(&mut self, root: Identity) {
        self.root = Some(root);
    }

    pub(crate) fn insert(&mut self, identity: Identity, record: Record) {
        self.records.insert(identity, record);
    }

    pub(crate) fn set_children(&mut self, identity: &Identity, children: Vec<Identity>) {
        if let Some(record) = self.records.get_mut(identity) {
            record.children = children;
        }
    }
}

/// Serialized as `{"root": .., "records": {"<identity>": record}}` so it can
/// travel as JSON (identities are not string keys on their own).
impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Records<'a>(&'a IndexMap<Identity, Record>);

        impl Serialize for Records<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for (identity, record) in self.0 {
                    map.serialize_entry(&identity.to_string(), record)?;
                }
                map.end()
            }
        }

        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("root", &self.root.as_ref().map(ToString::to_string))?;
        map.serialize_entry("records", &Records(&self.records))?;
        map.end()
    }
}
