#![allow(dead_code)]

use pythra_reconciler::{
    BuildError, ElementKind, Node, Patch, PropChange, Props, Reconciler, ReconciliationResult, Snapshot, State,
    StatefulWidget,
};
use std::any::Any;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

pub const MOUNT: &str = "root-container";

#[derive(Debug)]
struct SurfaceNode {
    parent: Option<String>,
    children: Vec<String>,
    html: String,
    props: Props,
}

/// In-memory stand-in for the rendered surface. Applies patches in order and
/// panics on anything a real consumer could not do.
#[derive(Debug)]
pub struct FakeSurface {
    nodes: HashMap<String, SurfaceNode>,
    gone: HashSet<String>,
}

impl FakeSurface {
    pub fn new(mounts: &[&str]) -> Self {
        let nodes = mounts
            .iter()
            .map(|m| {
                let node = SurfaceNode { parent: None, children: Vec::new(), html: String::new(), props: Props::new() };
                (m.to_string(), node)
            })
            .collect();
        FakeSurface { nodes, gone: HashSet::new() }
    }

    pub fn apply(&mut self, patches: &[Patch]) {
        for patch in patches {
            match patch {
                Patch::Insert { surface_id, parent, html, props, before } => {
                    let id = surface_id.as_str();
                    assert!(!self.nodes.contains_key(id) && !self.gone.contains(id), "INSERT reuses id {id}");
                    self.live(parent.as_str());
                    self.nodes.insert(
                        id.to_string(),
                        SurfaceNode { parent: None, children: Vec::new(), html: html.clone(), props: props.clone() },
                    );
                    self.attach(id, parent.as_str(), before.as_ref().map(|b| b.as_str()));
                }
                Patch::Remove { surface_id } => {
                    let id = surface_id.as_str();
                    self.live(id);
                    self.detach(id);
                    self.destroy(id);
                }
                Patch::Update { surface_id, changes } => {
                    let node = self.live_mut(surface_id.as_str());
                    for (name, change) in changes {
                        match change {
                            PropChange::Set(value) => {
                                node.props.insert(name.clone(), value.clone());
                            }
                            PropChange::Removed => {
                                assert!(node.props.shift_remove(name).is_some(), "removing unknown prop {name}");
                            }
                        }
                    }
                }
                Patch::Move { surface_id, parent, before } => {
                    let id = surface_id.as_str();
                    self.live(id);
                    self.live(parent.as_str());
                    assert_ne!(before.as_ref().map(|b| b.as_str()), Some(id), "MOVE anchored on itself");
                    self.detach(id);
                    self.attach(id, parent.as_str(), before.as_ref().map(|b| b.as_str()));
                }
                Patch::Replace { surface_id, new_surface_id, html, props } => {
                    let old = surface_id.as_str();
                    let new = new_surface_id.as_str();
                    assert!(!self.nodes.contains_key(new) && !self.gone.contains(new), "REPLACE reuses id {new}");
                    let parent = self.live(old).parent.clone().expect("replaced element has a parent");
                    let siblings = &mut self.live_mut(&parent).children;
                    let pos = siblings.iter().position(|c| c == old).expect("replaced element is attached");
                    siblings[pos] = new.to_string();
                    self.nodes.insert(
                        new.to_string(),
                        SurfaceNode {
                            parent: Some(parent),
                            children: Vec::new(),
                            html: html.clone(),
                            props: props.clone(),
                        },
                    );
                    self.destroy(old);
                }
            }
        }
    }

    pub fn children(&self, id: &str) -> Vec<String> {
        self.live(id).children.clone()
    }

    /// `data` props of an element's children, in rendered order.
    pub fn texts(&self, id: &str) -> Vec<String> {
        self.live(id)
            .children
            .iter()
            .map(|c| self.live(c).props.get("data").and_then(|v| v.as_str()).unwrap_or("").to_string())
            .collect()
    }

    pub fn props(&self, id: &str) -> &Props {
        &self.live(id).props
    }

    pub fn html(&self, id: &str) -> &str {
        &self.live(id).html
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn parent(&self, id: &str) -> Option<&str> {
        self.live(id).parent.as_deref()
    }

    /// Every live element except the mounts.
    pub fn element_count(&self) -> usize {
        self.nodes.values().filter(|n| n.parent.is_some()).count()
    }

    /// The surface holds exactly what the snapshot says, in the same order.
    pub fn assert_matches(&self, snapshot: &Snapshot) {
        assert_eq!(self.element_count(), snapshot.len(), "surface and snapshot disagree on size");
        for (identity, record) in snapshot.iter() {
            let node = self.live(record.surface_id.as_str());
            assert_eq!(node.parent.as_deref(), Some(record.parent.as_str()), "parent of {identity}");
            assert_eq!(&node.props, &record.props, "props of {identity}");
            let expected: Vec<&str> = snapshot.child_surface_ids(identity).into_iter().map(|s| s.as_str()).collect();
            assert_eq!(node.children, expected, "children of {identity}");
        }
    }

    fn live(&self, id: &str) -> &SurfaceNode {
        assert!(!self.gone.contains(id), "patch references removed element {id}");
        self.nodes.get(id).unwrap_or_else(|| panic!("patch references unknown element {id}"))
    }

    fn live_mut(&mut self, id: &str) -> &mut SurfaceNode {
        assert!(!self.gone.contains(id), "patch references removed element {id}");
        self.nodes.get_mut(id).unwrap_or_else(|| panic!("patch references unknown element {id}"))
    }

    fn attach(&mut self, id: &str, parent: &str, before: Option<&str>) {
        let siblings = &mut self.live_mut(parent).children;
        match before {
            Some(anchor) => {
                let pos = siblings
                    .iter()
                    .position(|c| c == anchor)
                    .unwrap_or_else(|| panic!("anchor {anchor} is not a child of {parent}"));
                siblings.insert(pos, id.to_string());
            }
            None => siblings.push(id.to_string()),
        }
        self.live_mut(id).parent = Some(parent.to_string());
    }

    fn detach(&mut self, id: &str) {
        if let Some(parent) = self.live_mut(id).parent.take() {
            self.live_mut(&parent).children.retain(|c| c != id);
        }
    }

    fn destroy(&mut self, id: &str) {
        let mut stack = vec![id.to_string()];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.remove(&id) {
                stack.extend(node.children);
                self.gone.insert(id);
            }
        }
    }
}

/// Reconciler plus surface, reconciled into [`MOUNT`] of the main context.
pub struct Harness {
    pub reconciler: Reconciler,
    pub surface: FakeSurface,
}

impl Harness {
    pub fn new() -> Self {
        Harness::with(Reconciler::new())
    }

    pub fn with(reconciler: Reconciler) -> Self {
        Harness { reconciler, surface: FakeSurface::new(&[MOUNT]) }
    }

    pub fn render(&mut self, root: Option<Node>) -> ReconciliationResult {
        let result = self.reconciler.reconcile("main", root, MOUNT).expect("cycle succeeds");
        self.surface.apply(&result.patches);
        self.surface.assert_matches(self.snapshot());
        result
    }

    pub fn snapshot(&self) -> &Snapshot {
        self.reconciler.snapshot("main").expect("main context exists")
    }

    pub fn root_id(&self) -> String {
        self.snapshot().root_record().expect("root rendered").surface_id.to_string()
    }
}

/// Column of keyed texts whose data is the key.
pub fn keyed_list(keys: &[&str]) -> Node {
    Node::element(ElementKind::Column).children(keys.iter().map(|k| Node::text(*k).with_key(*k)))
}

pub type EventLog = Rc<RefCell<Vec<String>>>;

/// Stateful widget rendering a text; records its lifecycle in `log`.
#[derive(Clone)]
pub struct Tracker {
    pub tag: &'static str,
    pub text: String,
    pub fail: bool,
    pub render_nothing: bool,
    pub log: EventLog,
}

impl Tracker {
    pub fn new(tag: &'static str, text: &str, log: &EventLog) -> Self {
        Tracker { tag, text: text.to_string(), fail: false, render_nothing: false, log: log.clone() }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn empty(mut self) -> Self {
        self.render_nothing = true;
        self
    }

    pub fn node(self) -> Node {
        let tag = self.tag;
        Node::stateful(self).with_key(tag)
    }
}

struct TrackerState {
    config: Tracker,
}

impl StatefulWidget for Tracker {
    fn kind_name(&self) -> &str {
        "Tracker"
    }

    fn create_state(&self) -> Box<dyn State> {
        Box::new(TrackerState { config: self.clone() })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl State for TrackerState {
    fn init_state(&mut self) {
        self.config.log.borrow_mut().push(format!("init {}", self.config.tag));
    }

    fn did_update_widget(&mut self, widget: &dyn StatefulWidget) {
        if let Some(fresh) = widget.as_any().downcast_ref::<Tracker>() {
            self.config = fresh.clone();
        }
    }

    fn build(&mut self) -> Result<Option<Node>, BuildError> {
        self.config.log.borrow_mut().push(format!("build {}", self.config.tag));
        if self.config.fail {
            return Err(BuildError::new(format!("{} exploded", self.config.tag)));
        }
        if self.config.render_nothing {
            return Ok(None);
        }
        Ok(Some(Node::text(self.config.text.clone())))
    }

    fn dispose(&mut self) {
        self.config.log.borrow_mut().push(format!("dispose {}", self.config.tag));
    }
}

pub fn count(log: &EventLog, event: &str) -> usize {
    log.borrow().iter().filter(|e| *e == event).count()
}

/// Stateful widget rendering a fixed subtree; `name` is its kind.
#[derive(Clone)]
pub struct Shell {
    pub name: &'static str,
    pub child: Node,
    pub log: EventLog,
}

impl Shell {
    pub fn new(name: &'static str, child: Node, log: &EventLog) -> Self {
        Shell { name, child, log: log.clone() }
    }
}

struct ShellState {
    config: Shell,
}

impl StatefulWidget for Shell {
    fn kind_name(&self) -> &str {
        self.name
    }

    fn create_state(&self) -> Box<dyn State> {
        Box::new(ShellState { config: self.clone() })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl State for ShellState {
    fn init_state(&mut self) {
        self.config.log.borrow_mut().push(format!("init {}", self.config.name));
    }

    fn did_update_widget(&mut self, widget: &dyn StatefulWidget) {
        if let Some(fresh) = widget.as_any().downcast_ref::<Shell>() {
            self.config = fresh.clone();
        }
    }

    fn build(&mut self) -> Result<Option<Node>, BuildError> {
        Ok(Some(self.config.child.clone()))
    }

    fn dispose(&mut self) {
        self.config.log.borrow_mut().push(format!("dispose {}", self.config.name));
    }
}
