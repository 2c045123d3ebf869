/* Validated descriptors
 *
 * Raw YAML definitions are checked once here and turned into immutable
 * descriptors. Everything downstream (classification, identity,
 * synthesis) only ever sees validated values.
 */

use std::collections::HashSet;

use serde_derive::Serialize;
use sproc_types::{
  AggregateDef, AttributeDef, DEFAULT_SELECTOR, DaoDef, EntityDef, MethodDef, NullPolicy, VOID_RETURN,
};
use thiserror::Error;

use crate::naming::{is_keyword, is_valid_binding, is_valid_ident, is_valid_path};

/* Locals of generated DAO method bodies and wrapper `execute` bodies */
const RESERVED_ARGUMENTS: &[&str] = &["call_result", "token", "connection"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DescriptorError {
  #[error("'{name}' is not a valid {what} name")]
  InvalidIdentifier { what: &'static str, name: String },

  #[error("'{name}' is reserved and cannot name an argument")]
  ReservedArgument { name: String },

  #[error("invalid procedure name '{0}'")]
  InvalidProcedureName(String),

  #[error("{what} '{name}' has an empty type")]
  EmptyType { what: &'static str, name: String },

  #[error("argument '{0}' is declared more than once")]
  DuplicateArgument(String),

  #[error("field '{0}' is declared more than once")]
  DuplicateField(String),

  #[error("constructor selector '{0}' is declared more than once")]
  DuplicateSelector(String),

  #[error("constructor selector must not be empty")]
  EmptySelector,

  #[error("'{path}' is not a valid {what} path")]
  InvalidPath { what: &'static str, path: String },

  #[error("aggregate '{0}' declares no fields")]
  EmptyAggregate(String),
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Argument {
  pub name: String,
  pub type_name: String,
}

fn check_ident(what: &'static str, name: &str) -> Result<(), DescriptorError> {
  if is_valid_binding(name) {
    Ok(())
  } else {
    Err(DescriptorError::InvalidIdentifier { what, name: name.to_string() })
  }
}

fn check_type(what: &'static str, name: &str, type_name: &str) -> Result<(), DescriptorError> {
  if type_name.trim().is_empty() {
    Err(DescriptorError::EmptyType { what, name: name.to_string() })
  } else {
    Ok(())
  }
}

fn check_path(what: &'static str, path: &str) -> Result<(), DescriptorError> {
  if is_valid_path(path) {
    Ok(())
  } else {
    Err(DescriptorError::InvalidPath { what, path: path.to_string() })
  }
}

fn check_selector(selector: &str) -> Result<(), DescriptorError> {
  if selector.trim().is_empty() {
    return Err(DescriptorError::EmptySelector);
  }
  if !is_valid_ident(selector) {
    return Err(DescriptorError::InvalidIdentifier { what: "constructor selector", name: selector.to_string() });
  }
  Ok(())
}

fn check_arguments(what: &'static str, args: &[Argument]) -> Result<(), DescriptorError> {
  let mut seen = HashSet::new();
  for arg in args {
    check_ident(what, &arg.name)?;
    check_type(what, &arg.name, &arg.type_name)?;
    if !seen.insert(arg.name.as_str()) {
      return Err(DescriptorError::DuplicateArgument(arg.name.clone()));
    }
  }
  Ok(())
}

/* One data-access method, validated */
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDescriptor {
  dao: String,
  name: String,
  procedure: String,
  return_type: String,
  args: Vec<Argument>,
  selector: String,
  mapper: Option<String>,
  null_policy: NullPolicy,
  attributes: Vec<AttributeDef>,
}

impl MethodDescriptor {
  pub fn builder(dao: &str, name: &str, procedure: &str) -> MethodDescriptorBuilder {
    MethodDescriptorBuilder {
      dao: dao.to_string(),
      name: name.to_string(),
      procedure: procedure.to_string(),
      return_type: VOID_RETURN.to_string(),
      args: Vec::new(),
      selector: None,
      mapper: None,
      null_policy: NullPolicy::default(),
      attributes: Vec::new(),
    }
  }

  pub fn from_def(dao: &str, def: &MethodDef) -> Result<Self, DescriptorError> {
    let mut builder = Self::builder(dao, &def.name, &def.procedure)
      .returns(&def.returns)
      .selector(def.constructor.clone())
      .mapper(def.mapper.clone())
      .null_policy(def.null_policy);
    for arg in &def.args {
      builder = builder.argument(&arg.name, &arg.type_name);
    }
    for attribute in &def.attributes {
      builder = builder.attribute(attribute.clone());
    }
    builder.build()
  }

  pub fn dao(&self) -> &str {
    &self.dao
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn procedure(&self) -> &str {
    &self.procedure
  }

  pub fn return_type(&self) -> &str {
    &self.return_type
  }

  pub fn args(&self) -> &[Argument] {
    &self.args
  }

  pub fn selector(&self) -> &str {
    &self.selector
  }

  pub fn has_default_selector(&self) -> bool {
    self.selector == DEFAULT_SELECTOR
  }

  pub fn mapper(&self) -> Option<&str> {
    self.mapper.as_deref()
  }

  pub fn null_policy(&self) -> NullPolicy {
    self.null_policy
  }

  pub fn attributes(&self) -> &[AttributeDef] {
    &self.attributes
  }

  /* Identity used in diagnostics: `Dao::method` */
  pub fn subject(&self) -> String {
    format!("{}::{}", self.dao, self.name)
  }
}

/* Assembles a method descriptor. Nothing is checked until `build`. */
#[derive(Debug, Clone)]
pub struct MethodDescriptorBuilder {
  dao: String,
  name: String,
  procedure: String,
  return_type: String,
  args: Vec<Argument>,
  selector: Option<String>,
  mapper: Option<String>,
  null_policy: NullPolicy,
  attributes: Vec<AttributeDef>,
}

impl MethodDescriptorBuilder {
  pub fn returns(mut self, return_type: &str) -> Self {
    self.return_type = return_type.to_string();
    self
  }

  pub fn argument(mut self, name: &str, type_name: &str) -> Self {
    self.args.push(Argument {
      name: name.to_string(),
      type_name: type_name.trim().to_string(),
    });
    self
  }

  pub fn selector(mut self, selector: Option<String>) -> Self {
    self.selector = selector;
    self
  }

  pub fn mapper(mut self, mapper: Option<String>) -> Self {
    self.mapper = mapper;
    self
  }

  pub fn null_policy(mut self, null_policy: NullPolicy) -> Self {
    self.null_policy = null_policy;
    self
  }

  pub fn attribute(mut self, attribute: AttributeDef) -> Self {
    self.attributes.push(attribute);
    self
  }

  pub fn build(self) -> Result<MethodDescriptor, DescriptorError> {
    check_ident("DAO", &self.dao)?;
    check_ident("method", &self.name)?;

    let procedure = self.procedure.trim();
    let starts_well = procedure.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_');
    if !starts_well || procedure.chars().any(|c| c.is_whitespace() || c == '"' || c == '\'') {
      return Err(DescriptorError::InvalidProcedureName(self.procedure.clone()));
    }

    check_arguments("argument", &self.args)?;
    if let Some(arg) = self.args.iter().find(|arg| RESERVED_ARGUMENTS.contains(&arg.name.as_str())) {
      return Err(DescriptorError::ReservedArgument { name: arg.name.clone() });
    }

    if let Some(selector) = &self.selector {
      check_selector(selector)?;
    }
    if let Some(mapper) = &self.mapper {
      check_path("mapper", mapper)?;
    }
    for attribute in &self.attributes {
      check_path("attribute", &attribute.path)?;
    }

    let return_type = match self.return_type.trim() {
      "" => VOID_RETURN.to_string(),
      other => other.to_string(),
    };

    Ok(MethodDescriptor {
      dao: self.dao,
      name: self.name,
      procedure: procedure.to_string(),
      return_type,
      args: self.args,
      selector: self.selector.unwrap_or_else(|| DEFAULT_SELECTOR.to_string()),
      mapper: self.mapper,
      null_policy: self.null_policy,
      attributes: self.attributes,
    })
  }
}

/* The owning type of a group of methods. Methods are validated one by one
 * so a bad method never takes its siblings down with it. */
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DaoDescriptor {
  pub name: String,
  pub comment: Option<String>,
}

impl DaoDescriptor {
  pub fn from_def(def: &DaoDef) -> Result<Self, DescriptorError> {
    /* Type names are emitted verbatim, so keywords are out */
    if !is_valid_ident(&def.name) || is_keyword(&def.name) {
      return Err(DescriptorError::InvalidIdentifier { what: "DAO", name: def.name.clone() });
    }
    Ok(Self { name: def.name.clone(), comment: def.comment.clone() })
  }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct AggregateField {
  pub name: String,
  pub type_name: String,
  pub selector: String,
  pub mapper: Option<String>,
  pub null_policy: NullPolicy,
}

/* A multi-result shape. Field `i` reads result table `i`. */
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct AggregateDescriptor {
  pub name: String,
  pub comment: Option<String>,
  pub fields: Vec<AggregateField>,
}

impl AggregateDescriptor {
  pub fn from_def(def: &AggregateDef) -> Result<Self, DescriptorError> {
    if !is_valid_ident(&def.name) || is_keyword(&def.name) {
      return Err(DescriptorError::InvalidIdentifier { what: "aggregate", name: def.name.clone() });
    }
    if def.fields.is_empty() {
      return Err(DescriptorError::EmptyAggregate(def.name.clone()));
    }

    let mut seen = HashSet::new();
    let mut fields = Vec::with_capacity(def.fields.len());
    for field in &def.fields {
      check_ident("field", &field.name)?;
      check_type("field", &field.name, &field.type_name)?;
      if !seen.insert(field.name.as_str()) {
        return Err(DescriptorError::DuplicateField(field.name.clone()));
      }
      if let Some(selector) = &field.constructor {
        check_selector(selector)?;
      }
      if let Some(mapper) = &field.mapper {
        check_path("mapper", mapper)?;
      }
      fields.push(AggregateField {
        name: field.name.clone(),
        type_name: field.type_name.trim().to_string(),
        selector: field.constructor.clone().unwrap_or_else(|| DEFAULT_SELECTOR.to_string()),
        mapper: field.mapper.clone(),
        null_policy: field.null_policy.unwrap_or_default(),
      });
    }

    Ok(Self {
      name: def.name.clone(),
      comment: def.comment.clone(),
      fields,
    })
  }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct EntityConstructor {
  pub selector: String,
  pub function: Option<String>,
  pub params: Vec<Argument>,
}

/* An entity and the constructors rows can be mapped through */
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
  pub path: String,
  pub constructors: Vec<EntityConstructor>,
}

impl EntityDescriptor {
  pub fn from_def(def: &EntityDef) -> Result<Self, DescriptorError> {
    check_path("entity", &def.name)?;

    let mut selectors = HashSet::new();
    let mut constructors = Vec::with_capacity(def.constructors.len());
    for ctor in &def.constructors {
      check_selector(&ctor.selector)?;
      if !selectors.insert(ctor.selector.as_str()) {
        return Err(DescriptorError::DuplicateSelector(ctor.selector.clone()));
      }
      if let Some(function) = &ctor.function {
        check_ident("constructor function", function)?;
      }
      let params: Vec<Argument> = ctor
        .params
        .iter()
        .map(|p| Argument { name: p.name.clone(), type_name: p.type_name.trim().to_string() })
        .collect();
      check_arguments("column", &params)?;
      constructors.push(EntityConstructor {
        selector: ctor.selector.clone(),
        function: ctor.function.clone(),
        params,
      });
    }

    Ok(Self { path: def.name.clone(), constructors })
  }
}
