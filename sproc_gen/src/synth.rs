/* Result unpacking plans
 *
 * A plan states, per result table, how the decoded rows become the
 * declared return value. Rendering the plan into source text is the job
 * of `codegen::rust_gen::unpack`.
 */

use indexmap::{IndexMap, IndexSet};
use serde_derive::Serialize;
use sproc_types::NullPolicy;
use thiserror::Error;

use crate::annotation::AnnotationError;
use crate::model::{AggregateDescriptor, DescriptorError, MethodDescriptor};
use crate::shape::{Shape, ShapeError, classify_field};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SynthesisError {
  #[error(transparent)]
  Descriptor(#[from] DescriptorError),

  #[error(transparent)]
  Shape(#[from] ShapeError),

  #[error(transparent)]
  Annotation(#[from] AnnotationError),

  #[error("aggregate '{0}' is declared but could not be resolved")]
  UnresolvedAggregate(String),

  #[error("argument '{argument}' has type '{type_name}' which has no SQL type mapping")]
  UnknownSqlType { argument: String, type_name: String },

  #[error("wrapper name '{type_name}' derived from '{requested}' is already taken by {existing}")]
  WrapperNameCollision {
    type_name: String,
    existing: String,
    requested: String,
  },

  #[error("wrapper '{type_name}' is already declared with different parameters or result tables")]
  WrapperSignatureConflict { type_name: String },
}

/* How a single row is taken out of a result table */
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum CardinalityRule {
  /* 0 rows: ObjectNotFound, 1 row: the row, more: TooManyResults */
  ExactlyOne,
  /* 0 rows: None, 1 row: Some(row), more: TooManyResults */
  AtMostOne,
}

impl CardinalityRule {
  pub fn for_policy(null_policy: NullPolicy) -> Self {
    match null_policy {
      NullPolicy::Throw => CardinalityRule::ExactlyOne,
      NullPolicy::ReturnNullOrEmpty => CardinalityRule::AtMostOne,
    }
  }

  /* Runtime helper in `cardinality` */
  pub fn helper(&self) -> &'static str {
    match self {
      CardinalityRule::ExactlyOne => "exactly_one",
      CardinalityRule::AtMostOne => "at_most_one",
    }
  }

  pub fn wrap_type(&self, element_type: &str) -> String {
    match self {
      CardinalityRule::ExactlyOne => element_type.to_string(),
      CardinalityRule::AtMostOne => format!("Option<{}>", element_type),
    }
  }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum TableRead {
  /* The whole table, any length */
  Rows,
  Single { rule: CardinalityRule },
}

impl TableRead {
  pub fn rust_type(&self, element_type: &str) -> String {
    match self {
      TableRead::Rows => format!("Vec<{}>", element_type),
      TableRead::Single { rule } => rule.wrap_type(element_type),
    }
  }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FieldPlan {
  pub name: String,
  pub element_type: String,
  pub table: usize,
  pub read: TableRead,
  pub selector: String,
  pub mapper: Option<String>,
}

impl FieldPlan {
  pub fn rust_type(&self) -> String {
    self.read.rust_type(&self.element_type)
  }
}

/* Field plans of an aggregate, in declared order. Field `i` reads table `i`. */
pub fn plan_aggregate(
  aggregate: &AggregateDescriptor,
  known_aggregates: &IndexSet<String>,
) -> Result<Vec<FieldPlan>, SynthesisError> {
  let mut fields = Vec::with_capacity(aggregate.fields.len());
  for (table, field) in aggregate.fields.iter().enumerate() {
    let shape = classify_field(&field.name, &field.type_name, known_aggregates)?;
    let (element_type, read) = match shape {
      Shape::Scalar(t) => (t, TableRead::Single { rule: CardinalityRule::for_policy(field.null_policy) }),
      Shape::OptionalOf(t) => (t, TableRead::Single { rule: CardinalityRule::AtMostOne }),
      Shape::ListOf(t) => (t, TableRead::Rows),
      Shape::Void | Shape::Aggregate(_) => {
        return Err(
          ShapeError::InvalidFieldShape { field: field.name.clone(), shape: shape.describe() }.into(),
        );
      }
    };
    fields.push(FieldPlan {
      name: field.name.clone(),
      element_type,
      table,
      read,
      selector: field.selector.clone(),
      mapper: field.mapper.clone(),
    });
  }
  Ok(fields)
}

/* An aggregate that passed validation and field classification */
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct AggregateLayout {
  pub descriptor: AggregateDescriptor,
  pub fields: Vec<FieldPlan>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum UnpackPlan {
  /* Call for effect, result ignored */
  Discard,
  Single { element_type: String, rule: CardinalityRule },
  Table { element_type: String },
  Aggregate { name: String, fields: Vec<FieldPlan> },
}

impl UnpackPlan {
  pub fn build(
    method: &MethodDescriptor,
    shape: &Shape,
    aggregates: &IndexMap<String, AggregateLayout>,
  ) -> Result<Self, SynthesisError> {
    let plan = match shape {
      Shape::Void => UnpackPlan::Discard,
      Shape::Scalar(t) => UnpackPlan::Single {
        element_type: t.clone(),
        rule: CardinalityRule::for_policy(method.null_policy()),
      },
      /* Emptiness is always legal for an optional; the null policy does not apply */
      Shape::OptionalOf(t) => UnpackPlan::Single { element_type: t.clone(), rule: CardinalityRule::AtMostOne },
      Shape::ListOf(t) => UnpackPlan::Table { element_type: t.clone() },
      Shape::Aggregate(name) => {
        let layout = aggregates
          .get(name)
          .ok_or_else(|| SynthesisError::UnresolvedAggregate(name.clone()))?;
        UnpackPlan::Aggregate { name: name.clone(), fields: layout.fields.clone() }
      }
    };
    Ok(plan)
  }

  /* Declared return type, without the `SprocResult` wrapper */
  pub fn return_type(&self) -> String {
    match self {
      UnpackPlan::Discard => "()".to_string(),
      UnpackPlan::Single { element_type, rule } => rule.wrap_type(element_type),
      UnpackPlan::Table { element_type } => format!("Vec<{}>", element_type),
      UnpackPlan::Aggregate { name, .. } => name.clone(),
    }
  }

  /* Row type, selector and mapper override of every result table, by index.
   * Aggregate tables use the field's own selector and mapper. */
  pub fn tables<'a>(&'a self, method: &'a MethodDescriptor) -> Vec<(usize, &'a str, &'a str, Option<&'a str>)> {
    match self {
      UnpackPlan::Discard => Vec::new(),
      UnpackPlan::Single { element_type, .. } | UnpackPlan::Table { element_type } => {
        vec![(0, element_type.as_str(), method.selector(), method.mapper())]
      }
      UnpackPlan::Aggregate { fields, .. } => fields
        .iter()
        .map(|field| (field.table, field.element_type.as_str(), field.selector.as_str(), field.mapper.as_deref()))
        .collect(),
    }
  }
}
