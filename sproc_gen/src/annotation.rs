/* Annotation-value mirror
 *
 * Attribute values arrive as raw YAML. They are converted once into the
 * closed `AnnotationValue` tree so that emission never touches the YAML
 * again, and so a value can be reported or re-serialized on its own.
 */

use indexmap::IndexMap;
use serde_derive::{Deserialize, Serialize};
use serde_yml::Value;
use sproc_types::AttributeDef;
use thiserror::Error;

use crate::naming::is_valid_path;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum ScalarValue {
  Bool(bool),
  Int(i64),
  Float(f64),
  Str(String),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum AnnotationValue {
  Scalar(ScalarValue),
  /* A type named by path, written `{ type: path }` */
  TypeReference(String),
  /* An enum variant or constant, written `{ constant: path }` */
  NamedConstant(String),
  List(Vec<AnnotationValue>),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnnotationError {
  #[error("unsupported value for attribute argument '{name}': {value} (rendered as {rendered})")]
  UnsupportedAnnotationValue {
    name: String,
    value: String,
    rendered: String,
  },

  #[error("'{0}' is not a valid attribute path")]
  InvalidAttributePath(String),
}

impl AnnotationValue {
  fn kind(&self) -> &'static str {
    match self {
      AnnotationValue::Scalar(ScalarValue::Bool(_)) => "bool",
      AnnotationValue::Scalar(ScalarValue::Int(_)) => "int",
      AnnotationValue::Scalar(ScalarValue::Float(_)) => "float",
      AnnotationValue::Scalar(ScalarValue::Str(_)) => "str",
      AnnotationValue::TypeReference(_) => "type",
      AnnotationValue::NamedConstant(_) => "constant",
      AnnotationValue::List(_) => "list",
    }
  }

  /* Attribute-argument text for this value */
  pub fn render(&self) -> String {
    match self {
      AnnotationValue::Scalar(ScalarValue::Bool(v)) => v.to_string(),
      AnnotationValue::Scalar(ScalarValue::Int(v)) => v.to_string(),
      AnnotationValue::Scalar(ScalarValue::Float(v)) => format!("{:?}", v),
      AnnotationValue::Scalar(ScalarValue::Str(v)) => format!("{:?}", v),
      AnnotationValue::TypeReference(path) | AnnotationValue::NamedConstant(path) => path.clone(),
      AnnotationValue::List(items) => {
        let items: Vec<String> = items.iter().map(AnnotationValue::render).collect();
        format!("({})", items.join(", "))
      }
    }
  }
}

/* Compact single-line text of a raw value, used for child values and errors */
pub fn render_raw(raw: &Value) -> String {
  serde_json::to_string(raw).unwrap_or_else(|_| format!("{:?}", raw))
}

fn unsupported(name: &str, raw: &Value, rendered: &str) -> AnnotationError {
  AnnotationError::UnsupportedAnnotationValue {
    name: name.to_string(),
    value: format!("{:?}", raw),
    rendered: rendered.to_string(),
  }
}

/* Single-entry mapping `{ key: "path" }` */
fn path_entry(raw: &Value) -> Option<(&str, &str)> {
  let Value::Mapping(mapping) = raw else {
    return None;
  };
  let mut entries = mapping.iter();
  match (entries.next(), entries.next()) {
    (Some((key, value)), None) => Some((key.as_str()?, value.as_str()?)),
    _ => None,
  }
}

/* Convert one raw attribute value. `rendered` is the value's source text,
 * carried into the error when the value cannot be mirrored. */
pub fn convert(name: &str, raw: &Value, rendered: &str) -> Result<AnnotationValue, AnnotationError> {
  match raw {
    Value::Bool(v) => Ok(AnnotationValue::Scalar(ScalarValue::Bool(*v))),
    Value::Number(n) => {
      if let Some(v) = n.as_i64() {
        Ok(AnnotationValue::Scalar(ScalarValue::Int(v)))
      } else if n.is_f64() {
        match n.as_f64() {
          Some(v) if v.is_finite() => Ok(AnnotationValue::Scalar(ScalarValue::Float(v))),
          _ => Err(unsupported(name, raw, rendered)),
        }
      } else {
        Err(unsupported(name, raw, rendered))
      }
    }
    Value::String(v) => Ok(AnnotationValue::Scalar(ScalarValue::Str(v.clone()))),
    Value::Sequence(items) => {
      let mut converted = Vec::with_capacity(items.len());
      for item in items {
        converted.push(convert("", item, &render_raw(item))?);
      }
      if let Some(first) = converted.first() {
        let kind = first.kind();
        if converted.iter().any(|item| item.kind() != kind) {
          return Err(unsupported(name, raw, rendered));
        }
      }
      Ok(AnnotationValue::List(converted))
    }
    Value::Mapping(_) => match path_entry(raw) {
      Some(("type", path)) if is_valid_path(path) => Ok(AnnotationValue::TypeReference(path.to_string())),
      Some(("constant", path)) if is_valid_path(path) => Ok(AnnotationValue::NamedConstant(path.to_string())),
      _ => Err(unsupported(name, raw, rendered)),
    },
    _ => Err(unsupported(name, raw, rendered)),
  }
}

/* A pass-through attribute, mirrored and ready to be re-emitted */
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MirroredAttribute {
  pub path: String,
  pub arguments: IndexMap<String, AnnotationValue>,
}

impl MirroredAttribute {
  pub fn mirror(def: &AttributeDef) -> Result<Self, AnnotationError> {
    if !is_valid_path(&def.path) {
      return Err(AnnotationError::InvalidAttributePath(def.path.clone()));
    }
    let mut arguments = IndexMap::with_capacity(def.values.len());
    for (name, raw) in &def.values {
      arguments.insert(name.clone(), convert(name, raw, &render_raw(raw))?);
    }
    Ok(Self { path: def.path.clone(), arguments })
  }

  /* `#[path]`, `#[path(v)]` for a lone `value`, otherwise `#[path(a = x, b(y, z))]` */
  pub fn render(&self) -> String {
    if self.arguments.is_empty() {
      return format!("#[{}]", self.path);
    }
    if self.arguments.len() == 1 {
      if let Some(value) = self.arguments.get("value") {
        return match value {
          AnnotationValue::List(_) => format!("#[{}{}]", self.path, value.render()),
          _ => format!("#[{}({})]", self.path, value.render()),
        };
      }
    }

    let arguments: Vec<String> = self
      .arguments
      .iter()
      .map(|(name, value)| match value {
        AnnotationValue::List(_) => format!("{}{}", name, value.render()),
        _ => format!("{} = {}", name, value.render()),
      })
      .collect();
    format!("#[{}({})]", self.path, arguments.join(", "))
  }
}
