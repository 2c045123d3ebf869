/* Return-shape classification
 *
 * A return type is one of: nothing, a single row value, a list of rows,
 * an optional row, or a named multi-result aggregate. Generic types are
 * split on their outer angle brackets only; one level of nesting is all
 * the shapes need.
 */

use indexmap::IndexSet;
use serde_derive::Serialize;
use thiserror::Error;

const VOID_TYPES: &[&str] = &["void", "()"];
const LIST_WRAPPERS: &[&str] = &["Vec", "std::vec::Vec", "alloc::vec::Vec"];
const OPTIONAL_WRAPPERS: &[&str] = &["Option", "std::option::Option", "core::option::Option"];

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(tag = "kind", content = "type", rename_all = "kebab-case")]
pub enum Shape {
  Void,
  Scalar(String),
  ListOf(String),
  OptionalOf(String),
  Aggregate(String),
}

impl Shape {
  /* Row type read from the result tables, if any */
  pub fn element_type(&self) -> Option<&str> {
    match self {
      Shape::Void | Shape::Aggregate(_) => None,
      Shape::Scalar(t) | Shape::ListOf(t) | Shape::OptionalOf(t) => Some(t),
    }
  }

  pub fn describe(&self) -> String {
    match self {
      Shape::Void => "void".to_string(),
      Shape::Scalar(t) => format!("scalar {}", t),
      Shape::ListOf(t) => format!("list of {}", t),
      Shape::OptionalOf(t) => format!("optional {}", t),
      Shape::Aggregate(name) => format!("aggregate {}", name),
    }
  }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShapeError {
  #[error("cannot classify type '{type_text}': {reason}")]
  UnknownShape {
    type_text: String,
    reason: &'static str,
  },

  #[error("field '{field}' is {shape}, only an entity, a list or an optional entity may be an aggregate field")]
  InvalidFieldShape { field: String, shape: String },
}

fn unknown(type_text: &str, reason: &'static str) -> ShapeError {
  ShapeError::UnknownShape {
    type_text: type_text.to_string(),
    reason,
  }
}

/* Split `Outer<Inner>` into its two halves. `Ok(None)` for a type without
 * angle brackets. */
pub fn split_generic(type_text: &str) -> Result<Option<(&str, &str)>, ShapeError> {
  let opens = type_text.matches('<').count();
  let closes = type_text.matches('>').count();
  if opens != closes {
    return Err(unknown(type_text, "unbalanced angle brackets"));
  }
  let Some(open) = type_text.find('<') else {
    return Ok(None);
  };
  if !type_text.ends_with('>') {
    return Err(unknown(type_text, "text after the type parameter"));
  }

  let outer = type_text[..open].trim();
  let inner = type_text[open + 1..type_text.len() - 1].trim();
  if outer.is_empty() {
    return Err(unknown(type_text, "missing outer type"));
  }
  Ok(Some((outer, inner)))
}

fn wrapped_element<'a>(type_text: &str, inner: &'a str) -> Result<&'a str, ShapeError> {
  if inner.is_empty() {
    return Err(unknown(type_text, "empty type parameter"));
  }
  if inner.contains('<') {
    return Err(unknown(type_text, "nested generic parameter"));
  }
  if inner.contains(',') {
    return Err(unknown(type_text, "more than one type parameter"));
  }
  if VOID_TYPES.contains(&inner) {
    return Err(unknown(type_text, "void element type"));
  }
  Ok(inner)
}

/* Classify a method return type */
pub fn classify(type_text: &str, known_aggregates: &IndexSet<String>) -> Result<Shape, ShapeError> {
  let type_text = type_text.trim();
  if type_text.is_empty() {
    return Err(unknown(type_text, "empty type"));
  }
  if VOID_TYPES.contains(&type_text) {
    return Ok(Shape::Void);
  }

  match split_generic(type_text)? {
    Some((outer, inner)) if LIST_WRAPPERS.contains(&outer) => {
      Ok(Shape::ListOf(wrapped_element(type_text, inner)?.to_string()))
    }
    Some((outer, inner)) if OPTIONAL_WRAPPERS.contains(&outer) => {
      Ok(Shape::OptionalOf(wrapped_element(type_text, inner)?.to_string()))
    }
    Some(_) => Ok(Shape::Scalar(type_text.to_string())),
    None if known_aggregates.contains(type_text) => Ok(Shape::Aggregate(type_text.to_string())),
    None => Ok(Shape::Scalar(type_text.to_string())),
  }
}

/* Classify the type of an aggregate field. Fields are read from exactly one
 * result table, so neither void nor a nested aggregate is allowed. */
pub fn classify_field(
  field: &str,
  type_text: &str,
  known_aggregates: &IndexSet<String>,
) -> Result<Shape, ShapeError> {
  let shape = classify(type_text, known_aggregates)?;
  match shape {
    Shape::Void | Shape::Aggregate(_) => Err(ShapeError::InvalidFieldShape {
      field: field.to_string(),
      shape: shape.describe(),
    }),
    _ => Ok(shape),
  }
}
