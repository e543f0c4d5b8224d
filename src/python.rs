//! Python module entry point: converts PyThra widgets into nodes and hands
//! reconciliation results back as plain dicts.
use crate::converters::{json_to_pyobject, py_dict_to_props, python_to_json};
use crate::errors::{BuildError, ReconcilerError};
use crate::identity::Key;
use crate::node::{ElementKind, Node, State, StatefulWidget, StatelessWidget};
use crate::{Reconciler, ReconcilerConfig};
use log::warn;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};
use std::any::Any;
use std::rc::Rc;

const DEFAULT_LAYOUT_TYPES: [&str; 1] = ["Padding"];

/// A framework `StatefulWidget`; its Python state object is reached
/// through `get_state()`.
struct PyStatefulWidget {
    kind: String,
    widget: Py<PyAny>,
    layout_types: Rc<[String]>,
}

impl StatefulWidget for PyStatefulWidget {
    fn kind_name(&self) -> &str {
        &self.kind
    }

    fn create_state(&self) -> Box<dyn State> {
        let widget = Python::attach(|py| self.widget.clone_ref(py));
        Box::new(PyState { widget, layout_types: self.layout_types.clone() })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct PyState {
    widget: Py<PyAny>,
    layout_types: Rc<[String]>,
}

impl PyState {
    fn state<'py>(&self, py: Python<'py>) -> PyResult<Option<Bound<'py, PyAny>>> {
        let state = self.widget.bind(py).call_method0("get_state")?;
        Ok((!state.is_none()).then_some(state))
    }
}

impl State for PyState {
    fn did_update_widget(&mut self, widget: &dyn StatefulWidget) {
        if let Some(fresh) = widget.as_any().downcast_ref::<PyStatefulWidget>() {
            self.widget = Python::attach(|py| fresh.widget.clone_ref(py));
        }
    }

    fn build(&mut self) -> Result<Option<Node>, BuildError> {
        Python::attach(|py| {
            let Some(state) = self.state(py)? else {
                return Ok(None);
            };
            let built = state.call_method0("build")?;
            if built.is_none() {
                return Ok(None);
            }
            let converter = WidgetConverter { layout_types: self.layout_types.clone() };
            converter.convert(py, &built).map(Some)
        })
        .map_err(|e: PyErr| BuildError::new(e.to_string()))
    }

    fn dispose(&mut self) {
        Python::attach(|py| {
            let disposed = self.state(py).and_then(|state| match state {
                Some(state) => state.call_method0("dispose").map(|_| ()),
                None => Ok(()),
            });
            if let Err(e) = disposed {
                warn!("Python dispose() failed: {}", e);
            }
        });
    }
}

/// A framework `StatelessWidget`, built while converting. `None` output
/// renders nothing at its position.
struct PyStatelessOutput {
    kind: String,
    output: Option<Node>,
}

impl StatelessWidget for PyStatelessOutput {
    fn kind_name(&self) -> &str {
        &self.kind
    }

    fn build(&self) -> Option<Node> {
        self.output.clone()
    }
}

struct WidgetConverter {
    /// Type names of pass-through layout widgets (their props become the
    /// child's `layout_override`).
    layout_types: Rc<[String]>,
}

impl WidgetConverter {
    fn convert<'py>(&self, py: Python<'py>, widget: &Bound<'py, PyAny>) -> PyResult<Node> {
        let type_name = widget.get_type().name()?.to_string();
        let key = widget_key(py, widget)?;

        let node = if self.layout_types.iter().any(|t| *t == type_name) {
            let child = widget
                .call_method0("get_children")?
                .cast::<PyList>()
                .map_err(|e| PyValueError::new_err(format!("get_children did not return a list: {}", e)))?
                .iter()
                .next()
                .ok_or_else(|| PyValueError::new_err(format!("{} wraps no child", type_name)))?;
            let props = self.render_props(py, widget)?;
            props
                .into_iter()
                .fold(Node::layout("layout", self.convert(py, &child)?), |node, (k, v)| node.prop(k, v))
        } else if has_base(widget, "StatefulWidget")? {
            Node::stateful(PyStatefulWidget {
                kind: type_name.clone(),
                widget: widget.clone().unbind(),
                layout_types: self.layout_types.clone(),
            })
        } else if has_base(widget, "StatelessWidget")? {
            let built = widget.call_method0("build")?;
            let output = if built.is_none() { None } else { Some(self.convert(py, &built)?) };
            Node::stateless(PyStatelessOutput { kind: type_name.clone(), output })
        } else {
            let props = self.render_props(py, widget)?;
            let children_any = widget.call_method0("get_children")?;
            let children_list = children_any
                .cast::<PyList>()
                .map_err(|e| PyValueError::new_err(format!("get_children did not return a list: {}", e)))?;
            let mut children = Vec::with_capacity(children_list.len());
            for child in children_list.iter() {
                children.push(self.convert(py, &child)?);
            }
            let element = props
                .into_iter()
                .fold(Node::element(ElementKind::from_name(&type_name)), |node, (k, v)| node.prop(k, v))
                .children(children);
            required_css_classes(widget)?
                .into_iter()
                .fold(element, |node, class| node.require_class(class))
        };

        Ok(match key {
            Some(key) => node.with_key(key),
            None => node,
        })
    }

    fn render_props<'py>(&self, py: Python<'py>, widget: &Bound<'py, PyAny>) -> PyResult<crate::Props> {
        let props_any = widget.call_method0("render_props")?;
        let props_dict = props_any
            .cast::<PyDict>()
            .map_err(|e| PyValueError::new_err(format!("render_props did not return a dict: {}", e)))?;
        Ok(py_dict_to_props(py, props_dict)?)
    }
}

fn widget_key<'py>(py: Python<'py>, widget: &Bound<'py, PyAny>) -> PyResult<Option<Key>> {
    let Ok(key) = widget.getattr("key") else {
        return Ok(None);
    };
    if key.is_none() {
        return Ok(None);
    }
    let value = if key.hasattr("value")? { key.getattr("value")? } else { key };
    let json = python_to_json(py, &value)?;
    Ok(Some(Key::from_json(&json).map_err(ReconcilerError::from)?))
}

/// Classes from `get_required_css_classes()`, if the widget defines it.
fn required_css_classes(widget: &Bound<'_, PyAny>) -> PyResult<Vec<String>> {
    if !widget.hasattr("get_required_css_classes")? {
        return Ok(Vec::new());
    }
    let classes = widget.call_method0("get_required_css_classes")?;
    if classes.is_none() {
        return Ok(Vec::new());
    }
    Ok(classes.extract::<Vec<String>>()?)
}

fn has_base(widget: &Bound<'_, PyAny>, base: &str) -> PyResult<bool> {
    for class in widget.get_type().getattr("__mro__")?.try_iter()? {
        let name: String = class?.getattr("__name__")?.extract()?;
        if name == base {
            return Ok(true);
        }
    }
    Ok(false)
}

#[pyclass(unsendable, name = "Reconciler")]
pub struct PyReconciler {
    inner: Reconciler,
    layout_types: Rc<[String]>,
}

#[pymethods]
impl PyReconciler {
    #[new]
    #[pyo3(signature = (config_json=None, layout_types=None))]
    fn new(config_json: Option<&str>, layout_types: Option<Vec<String>>) -> PyResult<Self> {
        let config = match config_json {
            Some(source) => ReconcilerConfig::from_json_str(source)?,
            None => ReconcilerConfig::default(),
        };
        Ok(PyReconciler {
            inner: Reconciler::with_config(config),
            layout_types: layout_types
                .unwrap_or_else(|| DEFAULT_LAYOUT_TYPES.iter().map(|s| s.to_string()).collect())
                .into(),
        })
    }

    #[pyo3(signature = (context_key, new_widget_root, parent_html_id))]
    fn reconcile<'py>(
        &mut self,
        py: Python<'py>,
        context_key: &str,
        new_widget_root: Option<Py<PyAny>>,
        parent_html_id: String,
    ) -> PyResult<Bound<'py, PyAny>> {
        let converter = WidgetConverter { layout_types: self.layout_types.clone() };
        let root = match new_widget_root {
            Some(root) => Some(converter.convert(py, root.bind(py))?),
            None => None,
        };
        let result = self.inner.reconcile(context_key, root, parent_html_id)?;
        let value = serde_json::to_value(&result).map_err(ReconcilerError::from)?;
        json_to_pyobject(py, &value)
    }

    /// The context's last snapshot as a dict, or None.
    fn snapshot<'py>(&self, py: Python<'py>, context_key: &str) -> PyResult<Bound<'py, PyAny>> {
        match self.inner.snapshot(context_key) {
            Some(snapshot) => {
                let value = serde_json::to_value(snapshot).map_err(ReconcilerError::from)?;
                json_to_pyobject(py, &value)
            }
            None => Ok(py.None().into_bound(py)),
        }
    }

    fn clear_context(&mut self, context_key: &str) -> usize {
        self.inner.clear_context(context_key).len()
    }

    fn clear_all_contexts(&mut self) {
        self.inner.clear_all_contexts();
    }
}

#[pymodule]
fn pythra_reconciler(_py: Python, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyReconciler>()?;

    // Export patch types as constants
    m.add("INSERT", "INSERT")?;
    m.add("REMOVE", "REMOVE")?;
    m.add("UPDATE", "UPDATE")?;
    m.add("MOVE", "MOVE")?;
    m.add("REPLACE", "REPLACE")?;

    Ok(())
}
