//! The widget tree handed to the reconciler on every rebuild.
//!
//! Nodes are plain values produced fresh each cycle. There are no parent
//! pointers: a node's position is only known while the engine walks the tree.
use crate::errors::BuildError;
use crate::identity::Key;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use std::any::Any;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// Kind-specific render data, compared by value between cycles.
pub type Props = IndexMap<String, serde_json::Value>;

/// Property that collects layout wrapper data on the wrapped element.
pub const LAYOUT_OVERRIDE_PROP: &str = "layout_override";

/// Property holding whitespace-separated style class names.
pub const CSS_CLASS_PROP: &str = "css_class";

/// Element kinds known to the serializer. Anything else is `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Container,
    Column,
    Row,
    Stack,
    Text,
    Image,
    Icon,
    TextButton,
    ElevatedButton,
    IconButton,
    FloatingActionButton,
    SnackBarAction,
    SizedBox,
    Spacer,
    Divider,
    ListTile,
    Dialog,
    AspectRatio,
    ClipPath,
    Positioned,
    Scrollbar,
    Custom(Arc<str>),
}

impl ElementKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "Container" => ElementKind::Container,
            "Column" => ElementKind::Column,
            "Row" => ElementKind::Row,
            "Stack" => ElementKind::Stack,
            "Text" => ElementKind::Text,
            "Image" => ElementKind::Image,
            "Icon" => ElementKind::Icon,
            "TextButton" => ElementKind::TextButton,
            "ElevatedButton" => ElementKind::ElevatedButton,
            "IconButton" => ElementKind::IconButton,
            "FloatingActionButton" => ElementKind::FloatingActionButton,
            "SnackBarAction" => ElementKind::SnackBarAction,
            "SizedBox" => ElementKind::SizedBox,
            "Spacer" => ElementKind::Spacer,
            "Divider" => ElementKind::Divider,
            "ListTile" => ElementKind::ListTile,
            "Dialog" => ElementKind::Dialog,
            "AspectRatio" => ElementKind::AspectRatio,
            "ClipPath" => ElementKind::ClipPath,
            "Positioned" => ElementKind::Positioned,
            "Scrollbar" => ElementKind::Scrollbar,
            other => ElementKind::Custom(other.into()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ElementKind::Container => "Container",
            ElementKind::Column => "Column",
            ElementKind::Row => "Row",
            ElementKind::Stack => "Stack",
            ElementKind::Text => "Text",
            ElementKind::Image => "Image",
            ElementKind::Icon => "Icon",
            ElementKind::TextButton => "TextButton",
            ElementKind::ElevatedButton => "ElevatedButton",
            ElementKind::IconButton => "IconButton",
            ElementKind::FloatingActionButton => "FloatingActionButton",
            ElementKind::SnackBarAction => "SnackBarAction",
            ElementKind::SizedBox => "SizedBox",
            ElementKind::Spacer => "Spacer",
            ElementKind::Divider => "Divider",
            ElementKind::ListTile => "ListTile",
            ElementKind::Dialog => "Dialog",
            ElementKind::AspectRatio => "AspectRatio",
            ElementKind::ClipPath => "ClipPath",
            ElementKind::Positioned => "Positioned",
            ElementKind::Scrollbar => "Scrollbar",
            ElementKind::Custom(name) => name,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for ElementKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Opaque handle for an event callback. The invocable itself lives in the
/// shell's callback registry; the engine only diffs the handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallbackId(Arc<str>);

impl CallbackId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        CallbackId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CallbackId {
    fn from(id: &str) -> Self {
        CallbackId(id.into())
    }
}

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A node that renders a surface element.
#[derive(Debug, Clone)]
pub struct Element {
    pub(crate) key: Option<Key>,
    pub(crate) kind: ElementKind,
    pub(crate) props: Props,
    pub(crate) children: Vec<Node>,
    /// Style classes the widget needs whatever its `css_class` says.
    pub(crate) required_classes: Vec<String>,
}

impl Element {
    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn required_classes(&self) -> &[String] {
        &self.required_classes
    }
}

/// Fold declared classes into `css_class`, skipping ones already there.
pub(crate) fn merge_required_classes(props: &mut Props, required: &[String]) {
    if required.is_empty() {
        return;
    }
    let mut classes: Vec<String> = props
        .get(CSS_CLASS_PROP)
        .and_then(|v| v.as_str())
        .map(|s| s.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();
    for class in required {
        if !classes.contains(class) {
            classes.push(class.clone());
        }
    }
    props.insert(CSS_CLASS_PROP.to_string(), serde_json::Value::String(classes.join(" ")));
}

/// A transparent wrapper (padding, alignment, flex, ...). It renders no
/// element of its own; its props are overlaid onto the wrapped element.
#[derive(Debug, Clone)]
pub struct Layout {
    pub(crate) key: Option<Key>,
    pub(crate) name: &'static str,
    pub(crate) props: Props,
    pub(crate) child: Box<Node>,
}

/// Configuration of a node with persistent state.
pub trait StatefulWidget {
    /// Kind tag. A different name at the same identity means a different widget.
    fn kind_name(&self) -> &str;

    fn create_state(&self) -> Box<dyn State>;

    fn as_any(&self) -> &dyn Any;
}

/// State owned by the reconciler between `mount` and `dispose`.
pub trait State {
    /// Called once, right after construction.
    fn init_state(&mut self) {}

    /// Called before every rebuild after the first, with the fresh configuration.
    fn did_update_widget(&mut self, _widget: &dyn StatefulWidget) {}

    fn build(&mut self) -> Result<Option<Node>, BuildError>;

    /// Called exactly once when the identity leaves the tree.
    fn dispose(&mut self) {}
}

pub trait StatelessWidget {
    fn kind_name(&self) -> &str;

    fn build(&self) -> Option<Node>;
}

#[derive(Clone)]
pub struct StatefulNode {
    pub(crate) key: Option<Key>,
    pub(crate) widget: Rc<dyn StatefulWidget>,
}

#[derive(Clone)]
pub struct StatelessNode {
    pub(crate) key: Option<Key>,
    pub(crate) widget: Rc<dyn StatelessWidget>,
}

impl fmt::Debug for StatefulNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatefulNode")
            .field("key", &self.key)
            .field("kind", &self.widget.kind_name())
            .finish()
    }
}

impl fmt::Debug for StatelessNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatelessNode")
            .field("key", &self.key)
            .field("kind", &self.widget.kind_name())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum Node {
    Element(Element),
    Layout(Layout),
    Stateful(StatefulNode),
    Stateless(StatelessNode),
}

/// Type tag of a node, borrowed from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind<'a> {
    Element(&'a ElementKind),
    Layout(&'static str),
    Stateful(&'a str),
    Stateless(&'a str),
}

impl Node {
    pub fn element(kind: ElementKind) -> Self {
        Node::Element(Element { key: None, kind, props: Props::new(), children: Vec::new(), required_classes: Vec::new() })
    }

    pub fn text(data: impl Into<String>) -> Self {
        let data: String = data.into();
        Node::element(ElementKind::Text).prop("data", data)
    }

    pub fn layout(name: &'static str, child: Node) -> Self {
        Node::Layout(Layout { key: None, name, props: Props::new(), child: Box::new(child) })
    }

    pub fn stateful(widget: impl StatefulWidget + 'static) -> Self {
        Node::Stateful(StatefulNode { key: None, widget: Rc::new(widget) })
    }

    pub fn stateless(widget: impl StatelessWidget + 'static) -> Self {
        Node::Stateless(StatelessNode { key: None, widget: Rc::new(widget) })
    }

    pub fn with_key(mut self, key: impl Into<Key>) -> Self {
        let key = Some(key.into());
        match &mut self {
            Node::Element(el) => el.key = key,
            Node::Layout(layout) => layout.key = key,
            Node::Stateful(node) => node.key = key,
            Node::Stateless(node) => node.key = key,
        }
        self
    }

    /// Set a property. Only elements and layout wrappers carry props.
    pub fn prop(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        let name: String = name.into();
        match &mut self {
            Node::Element(el) => {
                el.props.insert(name, value.into());
            }
            Node::Layout(layout) => {
                layout.props.insert(name, value.into());
            }
            Node::Stateful(_) | Node::Stateless(_) => {
                log::warn!("Ignoring prop '{}' on a component node", name);
            }
        }
        self
    }

    /// Append a style class to `css_class`.
    pub fn class(self, class: &str) -> Self {
        let joined = match self.props().and_then(|p| p.get(CSS_CLASS_PROP)).and_then(|v| v.as_str()) {
            Some(existing) if !existing.is_empty() => format!("{} {}", existing, class),
            _ => class.to_string(),
        };
        self.prop(CSS_CLASS_PROP, joined)
    }

    /// Declare a style class the element needs from the style generator.
    pub fn require_class(mut self, class: impl Into<String>) -> Self {
        let class: String = class.into();
        match &mut self {
            Node::Element(el) => {
                if !el.required_classes.contains(&class) {
                    el.required_classes.push(class);
                }
            }
            _ => log::warn!("Ignoring required class '{}' on a non-element node", class),
        }
        self
    }

    /// Bind a callback handle to an event, stored as `<event>Name`.
    pub fn on(self, event: &str, callback: impl Into<CallbackId>) -> Self {
        let callback = callback.into();
        self.prop(format!("{}Name", event), callback.as_str())
    }

    pub fn child(mut self, child: Node) -> Self {
        match &mut self {
            Node::Element(el) => el.children.push(child),
            _ => log::warn!("Ignoring child appended to a non-element node"),
        }
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        match &mut self {
            Node::Element(el) => el.children.extend(children),
            _ => log::warn!("Ignoring children appended to a non-element node"),
        }
        self
    }

    pub fn key(&self) -> Option<&Key> {
        match self {
            Node::Element(el) => el.key.as_ref(),
            Node::Layout(layout) => layout.key.as_ref(),
            Node::Stateful(node) => node.key.as_ref(),
            Node::Stateless(node) => node.key.as_ref(),
        }
    }

    pub fn kind(&self) -> NodeKind<'_> {
        match self {
            Node::Element(el) => NodeKind::Element(&el.kind),
            Node::Layout(layout) => NodeKind::Layout(layout.name),
            Node::Stateful(node) => NodeKind::Stateful(node.widget.kind_name()),
            Node::Stateless(node) => NodeKind::Stateless(node.widget.kind_name()),
        }
    }

    pub fn props(&self) -> Option<&Props> {
        match self {
            Node::Element(el) => Some(&el.props),
            Node::Layout(layout) => Some(&layout.props),
            _ => None,
        }
    }

    /// Direct children. A layout wrapper has exactly one; components have none
    /// until they are built.
    pub fn child_nodes(&self) -> &[Node] {
        match self {
            Node::Element(el) => &el.children,
            Node::Layout(layout) => std::slice::from_ref(layout.child.as_ref()),
            _ => &[],
        }
    }

    /// Style classes this node needs the external style generator to provide:
    /// its `css_class` followed by any declared with [`Node::require_class`].
    pub fn required_classes(&self) -> Vec<&str> {
        let mut classes: Vec<&str> = self
            .props()
            .and_then(|p| p.get(CSS_CLASS_PROP))
            .and_then(|v| v.as_str())
            .map(|classes| classes.split_whitespace().collect())
            .unwrap_or_default();
        if let Node::Element(el) = self {
            for class in &el.required_classes {
                if !classes.contains(&class.as_str()) {
                    classes.push(class.as_str());
                }
            }
        }
        classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates_classes_and_callbacks() {
        let node = Node::element(ElementKind::TextButton)
            .class("btn")
            .class("btn-primary")
            .on("onPressed", "cb_1");
        assert_eq!(node.required_classes(), vec!["btn", "btn-primary"]);
        assert_eq!(node.props().unwrap()["onPressedName"], "cb_1");
    }

    #[test]
    fn declared_classes_merge_without_duplicates() {
        let node = Node::element(ElementKind::Container)
            .class("card")
            .require_class("card")
            .require_class("fw-shadow");
        assert_eq!(node.required_classes(), vec!["card", "fw-shadow"]);

        let mut props = node.props().unwrap().clone();
        merge_required_classes(&mut props, &["card".to_string(), "fw-shadow".to_string()]);
        assert_eq!(props[CSS_CLASS_PROP], "card fw-shadow");
    }

    #[test]
    fn kind_names_round_trip() {
        for name in ["Text", "Scrollbar", "MyWidget"] {
            assert_eq!(ElementKind::from_name(name).name(), name);
        }
        assert_eq!(ElementKind::from_name("Text"), ElementKind::Text);
    }

    #[test]
    fn layout_exposes_its_single_child() {
        let node = Node::layout("Padding", Node::text("hi")).prop("padding", "8px");
        assert_eq!(node.kind(), NodeKind::Layout("Padding"));
        assert_eq!(node.child_nodes().len(), 1);
    }
}
