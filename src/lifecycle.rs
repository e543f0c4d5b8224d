//! State store for stateful nodes of one context.
//!
//! A stateful identity goes `unmounted -> mounted -> (rebuilding)* -> disposed`.
//! Disposal removes the state for good: if the identity comes back later it
//! gets a fresh mount.
//!
//! Mounts and kind-change remounts stay provisional until the cycle commits.
//! An aborted cycle disposes the states it mounted and puts displaced ones back.
use crate::errors::BuildError;
use crate::identity::Identity;
use crate::node::{Node, State, StatefulWidget};
use log::debug;
use std::collections::{HashMap, HashSet};

struct Mounted {
    kind: String,
    state: Box<dyn State>,
    builds: u64,
}

#[derive(Default)]
pub(crate) struct Lifecycle {
    states: HashMap<Identity, Mounted>,
    /// Identities built during the current cycle.
    seen: HashSet<Identity>,
    /// Identities mounted during the current cycle.
    mounted: Vec<Identity>,
    /// States replaced by a different widget kind this cycle, not yet disposed.
    displaced: Vec<(Identity, Mounted)>,
    disposed: Vec<Identity>,
}

impl Lifecycle {
    pub fn begin_cycle(&mut self) {
        self.seen.clear();
        self.mounted.clear();
        self.displaced.clear();
        self.disposed.clear();
    }

    /// Returns false if the identity was already built this cycle.
    pub fn mark_seen(&mut self, identity: &Identity) -> bool {
        self.seen.insert(identity.clone())
    }

    /// Mount on first sight, otherwise reuse the existing state, then build.
    pub fn build(&mut self, identity: &Identity, widget: &dyn StatefulWidget) -> Result<Option<Node>, BuildError> {
        let kind = widget.kind_name();
        if self.states.get(identity).is_some_and(|m| m.kind != kind) {
            debug!("Lifecycle: '{}' changed widget kind to '{}', remounting", identity, kind);
            if let Some(old) = self.states.remove(identity) {
                self.displaced.push((identity.clone(), old));
            }
        }

        match self.states.get_mut(identity) {
            Some(mounted) => {
                mounted.state.did_update_widget(widget);
                mounted.builds += 1;
                debug!("Lifecycle: rebuilding '{}' ({}, build #{})", identity, kind, mounted.builds);
                mounted.state.build()
            }
            None => {
                let mut state = widget.create_state();
                state.init_state();
                debug!("Lifecycle: mounted '{}' ({})", identity, kind);
                self.mounted.push(identity.clone());
                let mounted = self
                    .states
                    .entry(identity.clone())
                    .or_insert(Mounted { kind: kind.to_string(), state, builds: 1 });
                mounted.state.build()
            }
        }
    }

    /// Commit kind changes: dispose the states they displaced.
    pub fn dispose_displaced(&mut self) {
        for (identity, mut old) in std::mem::take(&mut self.displaced) {
            debug!("Lifecycle: disposing '{}' ({}), replaced by another kind", identity, old.kind);
            old.state.dispose();
            self.disposed.push(identity);
        }
    }

    /// Undo an aborted cycle: states it mounted are disposed without being
    /// reported, displaced states are restored. Rebuilds are not undone.
    pub fn rollback(&mut self) {
        for identity in std::mem::take(&mut self.mounted) {
            if let Some(mut fresh) = self.states.remove(&identity) {
                debug!("Lifecycle: rolling back mount of '{}' ({})", identity, fresh.kind);
                fresh.state.dispose();
            }
        }
        for (identity, old) in std::mem::take(&mut self.displaced) {
            self.states.insert(identity, old);
        }
        self.seen.clear();
        self.disposed.clear();
    }

    /// Dispose a state unless it was rebuilt this cycle. Returns whether a
    /// dispose hook ran.
    pub fn dispose_if_stale(&mut self, identity: &Identity) -> bool {
        if self.seen.contains(identity) {
            return false;
        }
        self.dispose_now(identity)
    }

    /// Dispose every state not rebuilt this cycle.
    pub fn sweep(&mut self) {
        let stale: Vec<Identity> = self.states.keys().filter(|id| !self.seen.contains(*id)).cloned().collect();
        for identity in stale {
            self.dispose_now(&identity);
        }
    }

    pub fn dispose_all(&mut self) {
        let all: Vec<Identity> = self.states.keys().cloned().collect();
        for identity in all {
            self.dispose_now(&identity);
        }
    }

    pub fn take_disposed(&mut self) -> Vec<Identity> {
        std::mem::take(&mut self.disposed)
    }

    pub fn is_mounted(&self, identity: &Identity) -> bool {
        self.states.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    fn dispose_now(&mut self, identity: &Identity) -> bool {
        match self.states.remove(identity) {
            Some(mut mounted) => {
                debug!("Lifecycle: disposing '{}' ({})", identity, mounted.kind);
                mounted.state.dispose();
                self.disposed.push(identity.clone());
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Events(RefCell<Vec<String>>);

    struct Tracker {
        name: &'static str,
        events: Rc<Events>,
    }

    struct TrackerState {
        events: Rc<Events>,
    }

    impl StatefulWidget for Tracker {
        fn kind_name(&self) -> &str {
            self.name
        }

        fn create_state(&self) -> Box<dyn State> {
            self.events.0.borrow_mut().push(format!("create {}", self.name));
            Box::new(TrackerState { events: self.events.clone() })
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    impl State for TrackerState {
        fn init_state(&mut self) {
            self.events.0.borrow_mut().push("init".into());
        }

        fn did_update_widget(&mut self, _widget: &dyn StatefulWidget) {
            self.events.0.borrow_mut().push("update".into());
        }

        fn build(&mut self) -> Result<Option<Node>, BuildError> {
            self.events.0.borrow_mut().push("build".into());
            Ok(None)
        }

        fn dispose(&mut self) {
            self.events.0.borrow_mut().push("dispose".into());
        }
    }

    #[test]
    fn mount_rebuild_dispose_sequence() {
        let events = Rc::new(Events::default());
        let widget = Tracker { name: "Counter", events: events.clone() };
        let id = Identity::Key("counter".into());
        let mut lifecycle = Lifecycle::default();

        lifecycle.begin_cycle();
        assert!(lifecycle.mark_seen(&id));
        lifecycle.build(&id, &widget).unwrap();
        lifecycle.begin_cycle();
        lifecycle.mark_seen(&id);
        lifecycle.build(&id, &widget).unwrap();
        lifecycle.begin_cycle();
        lifecycle.sweep();
        assert!(!lifecycle.is_mounted(&id));
        assert_eq!(lifecycle.take_disposed(), vec![id.clone()]);

        assert_eq!(
            *events.0.borrow(),
            vec!["create Counter", "init", "build", "update", "build", "dispose"]
        );
    }

    #[test]
    fn kind_change_remounts() {
        let events = Rc::new(Events::default());
        let id = Identity::Root;
        let mut lifecycle = Lifecycle::default();
        lifecycle.begin_cycle();
        lifecycle.build(&id, &Tracker { name: "A", events: events.clone() }).unwrap();
        lifecycle.begin_cycle();
        lifecycle.build(&id, &Tracker { name: "B", events: events.clone() }).unwrap();
        lifecycle.dispose_displaced();
        assert_eq!(lifecycle.take_disposed(), vec![id.clone()]);
        assert_eq!(
            *events.0.borrow(),
            vec!["create A", "init", "build", "create B", "init", "build", "dispose"]
        );
    }

    #[test]
    fn rollback_restores_displaced_and_drops_fresh_states() {
        let events = Rc::new(Events::default());
        let kept = Identity::Root;
        let fresh = Identity::Key("fresh".into());
        let mut lifecycle = Lifecycle::default();
        lifecycle.begin_cycle();
        lifecycle.build(&kept, &Tracker { name: "A", events: events.clone() }).unwrap();

        lifecycle.begin_cycle();
        lifecycle.build(&kept, &Tracker { name: "B", events: events.clone() }).unwrap();
        lifecycle.build(&fresh, &Tracker { name: "C", events: events.clone() }).unwrap();
        lifecycle.rollback();

        assert!(lifecycle.is_mounted(&kept));
        assert!(!lifecycle.is_mounted(&fresh));
        assert_eq!(lifecycle.len(), 1);
        assert!(lifecycle.take_disposed().is_empty());

        // The restored state is the original kind: rebuilding as A is no remount.
        events.0.borrow_mut().clear();
        lifecycle.begin_cycle();
        lifecycle.build(&kept, &Tracker { name: "A", events: events.clone() }).unwrap();
        assert_eq!(*events.0.borrow(), vec!["update", "build"]);
    }

    #[test]
    fn seen_states_survive_dispose_requests() {
        let events = Rc::new(Events::default());
        let id = Identity::Root;
        let mut lifecycle = Lifecycle::default();
        lifecycle.begin_cycle();
        lifecycle.mark_seen(&id);
        lifecycle.build(&id, &Tracker { name: "A", events }).unwrap();
        assert!(!lifecycle.dispose_if_stale(&id));
        assert!(lifecycle.is_mounted(&id));
        assert!(!lifecycle.mark_seen(&id));
    }
}
