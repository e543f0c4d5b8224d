//! Zero-panic conversion between Python objects and JSON property values
use crate::errors::ReconcilerError;
use crate::node::Props;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList, PyModule};

/// Convert a Python dict to an ordered property map
pub fn py_dict_to_props<'py>(py: Python<'py>, dict: &Bound<'py, PyDict>) -> Result<Props, ReconcilerError> {
    match python_to_json(py, dict.as_any())? {
        serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
        other => Err(ReconcilerError::PythonError(format!(
            "expected a dict of properties, got {}",
            other
        ))),
    }
}

/// Convert Python object to JSON. Values json can't encode fall back to
/// their `str()` so callables and widgets never abort a cycle.
pub fn python_to_json<'py>(py: Python<'py>, obj: &Bound<'py, PyAny>) -> Result<serde_json::Value, ReconcilerError> {
    let json_mod = PyModule::import(py, "json")?;
    let builtins = PyModule::import(py, "builtins")?;
    let kwargs = PyDict::new(py);
    kwargs.set_item("default", builtins.getattr("str")?)?;

    let dumped = json_mod.getattr("dumps")?.call((obj,), Some(&kwargs))?;
    let s: String = dumped.extract()?;
    Ok(serde_json::from_str(&s)?)
}

/// Convert JSON back to Python with proper type mapping
pub fn json_to_pyobject<'py>(py: Python<'py>, value: &serde_json::Value) -> PyResult<Bound<'py, PyAny>> {
    match value {
        serde_json::Value::Null => Ok(py.None().into_bound(py).into_any()),
        serde_json::Value::Bool(b) => Ok((*b).into_pyobject(py)?.to_owned().into_any()),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i.into_pyobject(py)?.into_any())
            } else if let Some(f) = n.as_f64() {
                Ok(f.into_pyobject(py)?.into_any())
            } else {
                Ok(n.to_string().into_pyobject(py)?.into_any())
            }
        }
        serde_json::Value::String(s) => Ok(s.as_str().into_pyobject(py)?.into_any()),
        serde_json::Value::Array(arr) => {
            let list = PyList::empty(py);
            for v in arr {
                list.append(json_to_pyobject(py, v)?)?;
            }
            Ok(list.into_any())
        }
        serde_json::Value::Object(map) => {
            let dict = PyDict::new(py);
            for (k, v) in map {
                dict.set_item(k, json_to_pyobject(py, v)?)?;
            }
            Ok(dict.into_any())
        }
    }
}
