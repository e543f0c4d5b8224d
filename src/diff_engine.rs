//! Core diffing engine: node-level diff, keyed child-list diff with move
//! selection, and whole-snapshot removal.
//!
//! One `DiffEngine` lives for exactly one reconciliation cycle of one
//! context. It reads the previous snapshot, walks the new tree once, and
//! hands back the next snapshot together with the ordered patch list.
use crate::config::{MoveStrategy, ReconcilerConfig, ReplaceMode};
use crate::errors::ReconcilerError;
use crate::html_generator::generate_html_stub;
use crate::identity::{Identity, Key};
use crate::lifecycle::Lifecycle;
use crate::node::{
    CSS_CLASS_PROP, CallbackId, Element, ElementKind, LAYOUT_OVERRIDE_PROP, Node, Props, merge_required_classes,
};
use crate::snapshot::{Record, Snapshot};
use crate::types::{
    CallbackBinding, IdGenerator, JsInitializer, Patch, PropChange, PropDelta, RebuildFailure, ReconciliationResult,
    SurfaceId,
};
use lis::LisExt;
use log::{debug, error, trace, warn};
use std::collections::{HashMap, HashSet};

/// A tree position after unwrapping layout wrappers and components down to
/// the element that actually renders.
struct Resolved {
    identity: Identity,
    key: Option<Key>,
    kind: ElementKind,
    /// Element props with the layout overlay applied.
    props: Props,
    children: Vec<Node>,
    owners: Vec<Identity>,
}

/// A child after the stability pass.
enum Slot {
    Matched { surface_id: SurfaceId, old_pos: usize },
    Pending(Resolved),
}

enum Placement {
    Before(Option<SurfaceId>),
    Replacing(SurfaceId),
}

pub(crate) struct DiffEngine<'a> {
    config: &'a ReconcilerConfig,
    ids: &'a IdGenerator,
    old: &'a Snapshot,
    lifecycle: &'a mut Lifecycle,
    new: Snapshot,
    result: ReconciliationResult,
    /// Old identities whose record has been carried into this cycle.
    claimed: HashSet<Identity>,
    /// Old identities destroyed along with a replaced ancestor.
    detached: HashSet<Identity>,
    replaced: HashSet<SurfaceId>,
}

impl<'a> DiffEngine<'a> {
    pub fn new(
        config: &'a ReconcilerConfig,
        ids: &'a IdGenerator,
        old: &'a Snapshot,
        lifecycle: &'a mut Lifecycle,
    ) -> Self {
        DiffEngine {
            config,
            ids,
            old,
            lifecycle,
            new: Snapshot::new(),
            result: ReconciliationResult::default(),
            claimed: HashSet::new(),
            detached: HashSet::new(),
            replaced: HashSet::new(),
        }
    }

    pub fn reconcile(
        mut self,
        root: Option<Node>,
        mount: &SurfaceId,
    ) -> Result<(Snapshot, ReconciliationResult), ReconcilerError> {
        self.lifecycle.begin_cycle();
        debug!(
            "DiffEngine: reconciling into '{}', previous records: {}, new root: {}",
            mount,
            self.old.len(),
            if root.is_some() { "Some" } else { "None" }
        );

        if let Err(err) = self.render_tree(root, mount) {
            self.lifecycle.rollback();
            return Err(err);
        }

        self.lifecycle.dispose_displaced();
        self.remove_stale();
        self.lifecycle.sweep();
        self.result.disposed = self.lifecycle.take_disposed();

        debug!(
            "DiffEngine: cycle complete, {} patches, {} records",
            self.result.patches.len(),
            self.new.len()
        );
        Ok((self.new, self.result))
    }

    /// Resolve and diff the whole new tree. Every lifecycle side effect of
    /// the cycle happens in here, so an error leaves only what `rollback` undoes.
    fn render_tree(&mut self, root: Option<Node>, mount: &SurfaceId) -> Result<(), ReconcilerError> {
        let resolved = match root {
            Some(node) => {
                let base = node.key().cloned().map(Identity::Key).unwrap_or(Identity::Root);
                self.resolve(node, base)?
            }
            None => None,
        };
        let root_identity = resolved.as_ref().map(|r| r.identity.clone());
        let old: &'a Snapshot = self.old;
        self.diff_root(old.root(), resolved, mount)?;
        if let Some(identity) = root_identity {
            self.new.set_root(identity);
        }
        Ok(())
    }

    fn diff_root(
        &mut self,
        old_root: Option<&Identity>,
        new: Option<Resolved>,
        mount: &SurfaceId,
    ) -> Result<(), ReconcilerError> {
        let remounted = old_root
            .and_then(|id| self.reusable(id).map(|record| (id, record)))
            .filter(|(_, record)| record.parent != *mount);
        match (remounted, new) {
            // The old root cannot be swapped in place under a different mount:
            // insert the new one there and let the removal pass drop the old.
            (Some((old_identity, old)), Some(new)) if should_replace(old, &new) => {
                debug!(
                    "DiffEngine: root '{}' changes to {} and moves from '{}' to '{}'",
                    old_identity, new.kind, old.parent, mount
                );
                self.claimed.insert(old_identity.clone());
                self.materialize(new, mount, Placement::Before(None))?;
            }
            (Some((old_identity, old)), Some(new)) => {
                debug!("DiffEngine: root '{}' moves from '{}' to '{}'", old_identity, old.parent, mount);
                self.result.patches.push(Patch::Move {
                    surface_id: old.surface_id.clone(),
                    parent: mount.clone(),
                    before: None,
                });
                self.diff_present(Some(old_identity), new, mount)?;
            }
            (_, new) => {
                self.diff_node(old_root, new, mount)?;
            }
        }
        Ok(())
    }

    /// Diff one tree position. An absent new node yields nothing: its old
    /// record simply does not carry over and the removal pass retires it.
    fn diff_node(
        &mut self,
        old_identity: Option<&Identity>,
        new: Option<Resolved>,
        parent: &SurfaceId,
    ) -> Result<Option<SurfaceId>, ReconcilerError> {
        match new {
            Some(new) => self.diff_present(old_identity, new, parent).map(Some),
            None => Ok(None),
        }
    }

    fn diff_present(
        &mut self,
        old_identity: Option<&Identity>,
        new: Resolved,
        parent: &SurfaceId,
    ) -> Result<SurfaceId, ReconcilerError> {
        let old = old_identity.and_then(|id| self.reusable(id).map(|record| (id, record)));
        match old {
            None => self.materialize(new, parent, Placement::Before(None)),
            Some((old_identity, old)) if should_replace(old, &new) => {
                debug!(
                    "DiffEngine: replacing '{}' ({} -> {}, key {:?} -> {:?})",
                    old_identity, old.kind, new.kind, old.key, new.key
                );
                self.claimed.insert(old_identity.clone());
                match self.config.replace_mode {
                    ReplaceMode::Replace => {
                        self.detach_descendants(old);
                        self.replaced.insert(old.surface_id.clone());
                        self.materialize(new, parent, Placement::Replacing(old.surface_id.clone()))
                    }
                    ReplaceMode::InsertRemove => {
                        self.materialize(new, parent, Placement::Before(Some(old.surface_id.clone())))
                    }
                }
            }
            Some((old_identity, old)) => self.update_node(old_identity, old, new, parent),
        }
    }

    /// Update in place: the record keeps its surface id.
    fn update_node(
        &mut self,
        old_identity: &Identity,
        old: &'a Record,
        new: Resolved,
        parent: &SurfaceId,
    ) -> Result<SurfaceId, ReconcilerError> {
        self.claimed.insert(old_identity.clone());
        let Resolved { identity, key, kind, props, children, owners } = new;
        let surface_id = old.surface_id.clone();

        self.collect_details(&surface_id, &props);
        let changes = diff_props(&old.props, &props, self.config);
        if !changes.is_empty() {
            trace!("DiffEngine: '{}' props changed: {:?}", identity, changes.keys().collect::<Vec<_>>());
            self.result.patches.push(Patch::Update { surface_id: surface_id.clone(), changes });
        }

        self.insert_record(
            &identity,
            Record {
                surface_id: surface_id.clone(),
                kind,
                key,
                props,
                parent: parent.clone(),
                children: Vec::new(),
                owners,
            },
        )?;
        let child_identities = self.diff_children(&identity, &old.children, children, &surface_id)?;
        self.new.set_children(&identity, child_identities);
        Ok(surface_id)
    }

    /// Create a new element (fresh id), then its whole subtree.
    fn materialize(
        &mut self,
        new: Resolved,
        parent: &SurfaceId,
        placement: Placement,
    ) -> Result<SurfaceId, ReconcilerError> {
        let Resolved { identity, key, kind, props, children, owners } = new;
        let surface_id = self.ids.next_id();
        let html = generate_html_stub(&kind, &surface_id, &props);

        self.queue_js_initializers(&surface_id, &kind, &props);
        self.collect_details(&surface_id, &props);

        match placement {
            Placement::Before(before) => {
                debug!(
                    "DiffEngine: insert '{}' as {} under '{}' before {:?}",
                    identity, surface_id, parent, before
                );
                self.result.patches.push(Patch::Insert {
                    surface_id: surface_id.clone(),
                    parent: parent.clone(),
                    html,
                    props: props.clone(),
                    before,
                });
            }
            Placement::Replacing(old_surface_id) => {
                debug!("DiffEngine: replace {} with {} for '{}'", old_surface_id, surface_id, identity);
                self.result.patches.push(Patch::Replace {
                    surface_id: old_surface_id,
                    new_surface_id: surface_id.clone(),
                    html,
                    props: props.clone(),
                });
            }
        }

        self.insert_record(
            &identity,
            Record {
                surface_id: surface_id.clone(),
                kind,
                key,
                props,
                parent: parent.clone(),
                children: Vec::new(),
                owners,
            },
        )?;
        let child_identities = self.diff_children(&identity, &[], children, &surface_id)?;
        self.new.set_children(&identity, child_identities);
        Ok(surface_id)
    }

    /// Reconcile one parent's children. Returns the new child identity list.
    fn diff_children(
        &mut self,
        parent_identity: &Identity,
        old_children: &[Identity],
        new_children: Vec<Node>,
        parent_surface_id: &SurfaceId,
    ) -> Result<Vec<Identity>, ReconcilerError> {
        if old_children.is_empty() && new_children.is_empty() {
            return Ok(Vec::new());
        }

        let resolved = self.resolve_children(parent_identity, new_children)?;
        let identities: Vec<Identity> = resolved.iter().map(|child| child.identity.clone()).collect();
        if resolved.is_empty() {
            return Ok(identities);
        }

        let old: &'a Snapshot = self.old;
        let mut old_positions: HashMap<&Identity, usize> = HashMap::with_capacity(old_children.len());
        for (pos, id) in old_children.iter().enumerate() {
            if self.reusable(id).is_some() {
                old_positions.insert(id, pos);
            } else if !old.contains(id) {
                warn!(
                    "DiffEngine: snapshot has no record for child '{}' of '{}'; it will be recreated",
                    id, parent_identity
                );
            }
        }

        // Stability pass: update matched children in place, in new order.
        let mut slots = Vec::with_capacity(resolved.len());
        for child in resolved {
            match old_positions.get(&child.identity).copied() {
                Some(old_pos) => {
                    let identity = child.identity.clone();
                    let surface_id = self.diff_present(Some(&identity), child, parent_surface_id)?;
                    slots.push(Slot::Matched { surface_id, old_pos });
                }
                None => slots.push(Slot::Pending(child)),
            }
        }

        let positions: Vec<Option<usize>> = slots
            .iter()
            .map(|slot| match slot {
                Slot::Matched { old_pos, .. } => Some(*old_pos),
                Slot::Pending(_) => None,
            })
            .collect();
        let stable = select_stable(&positions, self.config.move_strategy);

        // Each child is placed before the nearest following stable sibling.
        let mut anchors: Vec<Option<SurfaceId>> = vec![None; slots.len()];
        let mut next_stable: Option<SurfaceId> = None;
        for i in (0..slots.len()).rev() {
            anchors[i] = next_stable.clone();
            if let (true, Slot::Matched { surface_id, .. }) = (stable[i], &slots[i]) {
                next_stable = Some(surface_id.clone());
            }
        }

        // Placement pass.
        for ((slot, is_stable), before) in slots.into_iter().zip(stable).zip(anchors) {
            match slot {
                Slot::Matched { .. } if is_stable => {}
                Slot::Matched { surface_id, old_pos } => {
                    debug!(
                        "DiffEngine: move {} (old position {}) under '{}' before {:?}",
                        surface_id, old_pos, parent_surface_id, before
                    );
                    self.result.patches.push(Patch::Move {
                        surface_id,
                        parent: parent_surface_id.clone(),
                        before,
                    });
                }
                Slot::Pending(child) => self.place_new(child, parent_surface_id, before)?,
            }
        }

        Ok(identities)
    }

    /// A child with no old position in this list: either a keyed node that
    /// lived under another parent, or a brand new one.
    fn place_new(
        &mut self,
        child: Resolved,
        parent: &SurfaceId,
        before: Option<SurfaceId>,
    ) -> Result<(), ReconcilerError> {
        let candidate = match child.identity {
            Identity::Key(_) => self.reusable(&child.identity).filter(|old| !should_replace(old, &child)),
            _ => None,
        };
        match candidate {
            Some(old) => {
                debug!(
                    "DiffEngine: re-parent '{}' ({}) from '{}' to '{}' before {:?}",
                    child.identity, old.surface_id, old.parent, parent, before
                );
                self.result.patches.push(Patch::Move {
                    surface_id: old.surface_id.clone(),
                    parent: parent.clone(),
                    before,
                });
                let identity = child.identity.clone();
                self.update_node(&identity, old, child, parent)?;
            }
            None => {
                self.materialize(child, parent, Placement::Before(before))?;
            }
        }
        Ok(())
    }

    fn resolve_children(
        &mut self,
        parent_identity: &Identity,
        new_children: Vec<Node>,
    ) -> Result<Vec<Resolved>, ReconcilerError> {
        let mut resolved = Vec::with_capacity(new_children.len());
        let mut seen: HashSet<Identity> = HashSet::with_capacity(new_children.len());
        let mut ordinal = 0u32;
        for node in new_children {
            let base = match node.key() {
                Some(key) => Identity::Key(key.clone()),
                None => {
                    let slot = Identity::slot(parent_identity, ordinal);
                    ordinal += 1;
                    slot
                }
            };
            if let Some(child) = self.resolve(node, base)? {
                if !seen.insert(child.identity.clone()) {
                    return Err(ReconcilerError::DuplicateIdentity {
                        identity: child.identity.to_string(),
                        parent: parent_identity.to_string(),
                    });
                }
                resolved.push(child);
            }
        }
        Ok(resolved)
    }

    /// Unwrap layout wrappers and components until an element is reached.
    /// The first key met along the way names the position; `base` is used
    /// when there is none. Stateful components are mounted or rebuilt here;
    /// an unkeyed one built by another state is filed as built by its owner.
    fn resolve(&mut self, node: Node, base: Identity) -> Result<Option<Resolved>, ReconcilerError> {
        let mut key: Option<Key> = None;
        let mut overlay = Props::new();
        let mut owners: Vec<Identity> = Vec::new();
        let mut scope = base.clone();
        let mut current = node;

        loop {
            if key.is_none() {
                key = current.key().cloned();
            }
            current = match current {
                Node::Element(Element { kind, mut props, children, required_classes, .. }) => {
                    merge_required_classes(&mut props, &required_classes);
                    if !overlay.is_empty() {
                        props.insert(LAYOUT_OVERRIDE_PROP.to_string(), serde_json::Value::Object(overlay.into_iter().collect()));
                    }
                    let identity = key.clone().map(Identity::Key).unwrap_or(base);
                    return Ok(Some(Resolved { identity, key, kind, props, children, owners }));
                }
                Node::Layout(layout) => {
                    trace!("DiffEngine: unwrapping layout '{}'", layout.name);
                    overlay.extend(layout.props);
                    *layout.child
                }
                Node::Stateless(component) => match component.widget.build() {
                    Some(built) => built,
                    None => return Ok(None),
                },
                Node::Stateful(component) => {
                    let state_identity = component.key.clone().map(Identity::Key).unwrap_or_else(|| scope.clone());
                    if !self.lifecycle.mark_seen(&state_identity) {
                        return Err(ReconcilerError::DuplicateIdentity {
                            identity: state_identity.to_string(),
                            parent: base.to_string(),
                        });
                    }
                    owners.push(state_identity.clone());
                    scope = Identity::built_by(&state_identity);
                    match self.lifecycle.build(&state_identity, component.widget.as_ref()) {
                        Ok(Some(built)) => built,
                        Ok(None) => return Ok(None),
                        Err(err) => {
                            let kind = component.widget.kind_name().to_string();
                            error!("DiffEngine: rebuild of '{}' ({}) failed: {}", state_identity, kind, err);
                            self.result.failures.push(RebuildFailure {
                                identity: state_identity,
                                kind,
                                message: err.to_string(),
                            });
                            return Ok(None);
                        }
                    }
                }
            };
        }
    }

    /// The old record for `identity`, if it can still be carried over.
    fn reusable(&self, identity: &Identity) -> Option<&'a Record> {
        if self.claimed.contains(identity) || self.detached.contains(identity) {
            return None;
        }
        let old: &'a Snapshot = self.old;
        old.get(identity)
    }

    fn insert_record(&mut self, identity: &Identity, record: Record) -> Result<(), ReconcilerError> {
        if self.new.contains(identity) {
            return Err(ReconcilerError::DuplicateIdentity {
                identity: identity.to_string(),
                parent: record.parent.to_string(),
            });
        }
        self.new.insert(identity.clone(), record);
        Ok(())
    }

    /// Everything below a replaced element is gone with it.
    fn detach_descendants(&mut self, replaced: &'a Record) {
        let old: &'a Snapshot = self.old;
        let mut stack: Vec<&'a Identity> = replaced.children.iter().collect();
        while let Some(identity) = stack.pop() {
            if self.claimed.contains(identity) {
                continue;
            }
            if let Some(record) = old.get(identity) {
                self.detached.insert(identity.clone());
                stack.extend(record.children.iter());
            }
        }
    }

    /// Retire every old record whose surface id did not carry over.
    fn remove_stale(&mut self) {
        let old: &'a Snapshot = self.old;
        let retired: HashSet<&SurfaceId> = old
            .iter()
            .filter(|(identity, record)| {
                self.new.get(identity).map(|r| &r.surface_id) != Some(&record.surface_id)
            })
            .map(|(_, record)| &record.surface_id)
            .collect();

        for (identity, record) in old.iter() {
            if !retired.contains(&record.surface_id) {
                continue;
            }
            for owner in &record.owners {
                self.lifecycle.dispose_if_stale(owner);
            }
            if self.replaced.contains(&record.surface_id) {
                trace!("DiffEngine: {} already destroyed by REPLACE", record.surface_id);
                continue;
            }
            if retired.contains(&record.parent) {
                trace!("DiffEngine: {} goes away with its parent {}", record.surface_id, record.parent);
                continue;
            }
            debug!("DiffEngine: remove '{}' ({})", identity, record.surface_id);
            self.result.patches.push(Patch::Remove { surface_id: record.surface_id.clone() });
        }
    }

    fn collect_details(&mut self, surface_id: &SurfaceId, props: &Props) {
        if let Some(classes) = props.get(CSS_CLASS_PROP).and_then(|v| v.as_str()) {
            for class in classes.split_whitespace() {
                if !self.result.active_classes.contains(class) {
                    self.result.active_classes.insert(class.to_string());
                }
            }
        }

        for (prop, value) in props {
            if !(prop.starts_with("on") && prop.ends_with("Name")) {
                continue;
            }
            if let Some(callback) = value.as_str().filter(|s| !s.is_empty()) {
                self.result.callbacks.insert(
                    CallbackId::from(callback),
                    CallbackBinding { surface_id: surface_id.clone(), prop: prop.clone() },
                );
            }
        }
    }

    fn queue_js_initializers(&mut self, surface_id: &SurfaceId, kind: &ElementKind, props: &Props) {
        if *kind == ElementKind::Scrollbar {
            self.result.js_initializers.push(JsInitializer {
                init_type: "SimpleBar".to_string(),
                target_id: surface_id.clone(),
                data: serde_json::Value::Object(serde_json::Map::new()),
            });
        }

        if let Some(clip) = props.get("responsive_clip_path") {
            self.result.js_initializers.push(JsInitializer {
                init_type: "ResponsiveClipPath".to_string(),
                target_id: surface_id.clone(),
                data: clip.clone(),
            });
        }

        if let Some(js_init) = props.get("_js_init") {
            self.result.js_initializers.push(JsInitializer {
                init_type: "generic".to_string(),
                target_id: surface_id.clone(),
                data: js_init.clone(),
            });
        }
    }
}

/// Destroy-and-recreate when the key changed, was lost, or the kind changed.
fn should_replace(old: &Record, new: &Resolved) -> bool {
    match (&old.key, &new.key) {
        (old_key, Some(new_key)) if old_key.as_ref() != Some(new_key) => true,
        (Some(_), None) => true,
        _ => old.kind != new.kind,
    }
}

/// Property delta: changed or added props carry the new value, props that
/// disappeared carry an explicit removal.
pub(crate) fn diff_props(old: &Props, new: &Props, config: &ReconcilerConfig) -> PropDelta {
    let mut changes = PropDelta::new();
    for (name, value) in new {
        if config.is_ignored(name) {
            continue;
        }
        if old.get(name) != Some(value) {
            changes.insert(name.clone(), PropChange::Set(value.clone()));
        }
    }
    for name in old.keys() {
        if !config.is_ignored(name) && !new.contains_key(name) {
            changes.insert(name.clone(), PropChange::Removed);
        }
    }
    changes
}

/// Mark which matched children keep their place. `None` entries are new
/// children and never stable.
pub(crate) fn select_stable(positions: &[Option<usize>], strategy: MoveStrategy) -> Vec<bool> {
    match strategy {
        MoveStrategy::Greedy => {
            let mut highest: Option<usize> = None;
            positions
                .iter()
                .map(|pos| match *pos {
                    None => false,
                    Some(pos) if highest.is_some_and(|h| pos < h) => false,
                    Some(pos) => {
                        highest = Some(pos);
                        true
                    }
                })
                .collect()
        }
        MoveStrategy::Lis => {
            let (indices, sequence): (Vec<usize>, Vec<usize>) = positions
                .iter()
                .enumerate()
                .filter_map(|(i, pos)| pos.map(|p| (i, p)))
                .unzip();
            let mut stable = vec![false; positions.len()];
            for k in sequence.longest_increasing_subsequence() {
                stable[indices[k]] = true;
            }
            stable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(value: serde_json::Value) -> Props {
        value.as_object().unwrap().iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    fn stable_count(positions: &[Option<usize>], strategy: MoveStrategy) -> usize {
        select_stable(positions, strategy).into_iter().filter(|s| *s).count()
    }

    #[test]
    fn equal_props_produce_empty_delta() {
        let config = ReconcilerConfig::default();
        let a = props(json!({"text": "Hi", "style": {"color": "red"}}));
        assert!(diff_props(&a, &a.clone(), &config).is_empty());
    }

    #[test]
    fn delta_marks_removed_props() {
        let config = ReconcilerConfig::default();
        let old = props(json!({"text": "Hi", "tooltip": "t"}));
        let new = props(json!({"text": "Ho", "css_class": "x"}));
        let delta = diff_props(&old, &new, &config);
        assert_eq!(delta.get("text"), Some(&PropChange::Set(json!("Ho"))));
        assert_eq!(delta.get("css_class"), Some(&PropChange::Set(json!("x"))));
        assert_eq!(delta.get("tooltip"), Some(&PropChange::Removed));
        assert_eq!(delta.len(), 3);
    }

    #[test]
    fn ignored_props_never_enter_delta() {
        let config = ReconcilerConfig::default();
        let old = props(json!({"onPressed": "fn_a"}));
        let new = props(json!({"onPressed": "fn_b", "onPressedName": "cb_1"}));
        let delta = diff_props(&old, &new, &config);
        assert_eq!(delta.keys().collect::<Vec<_>>(), vec!["onPressedName"]);
    }

    #[test]
    fn in_order_lists_are_fully_stable() {
        let positions = [Some(0), None, Some(1), Some(2)];
        assert_eq!(stable_count(&positions, MoveStrategy::Lis), 3);
        assert_eq!(stable_count(&positions, MoveStrategy::Greedy), 3);
    }

    #[test]
    fn swapping_ends_moves_two_with_lis() {
        // [E, B, C, D, A] from [A, B, C, D, E]
        let positions = [Some(4), Some(1), Some(2), Some(3), Some(0)];
        assert_eq!(stable_count(&positions, MoveStrategy::Lis), 3);
        // The running maximum locks onto E and has to move everything else.
        assert_eq!(stable_count(&positions, MoveStrategy::Greedy), 1);
    }

    #[test]
    fn greedy_keeps_first_run() {
        let stable = select_stable(&[Some(0), Some(2), Some(1)], MoveStrategy::Greedy);
        assert_eq!(stable, vec![true, true, false]);
    }
}
