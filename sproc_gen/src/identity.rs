/* Wrapper identity
 *
 * Methods that call the same procedure and decode its rows the same way
 * share one generated call wrapper. The identity is the canonical key for
 * that sharing; it depends only on the procedure name, the constructor
 * selector and the mapper override.
 */

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use serde_derive::Serialize;

use crate::model::MethodDescriptor;
use crate::naming::{result_table_name, simple_name, to_field_name, to_type_name};
use crate::sql_types::{SqlBinding, sql_binding};
use crate::synth::{SynthesisError, UnpackPlan};

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WrapperIdentity {
  procedure: String,
  /* Present only for a non-default selector */
  selector: Option<String>,
  mapper: Option<String>,
}

impl WrapperIdentity {
  pub fn new(procedure: &str, selector: Option<&str>, mapper: Option<&str>) -> Self {
    Self {
      procedure: procedure.to_string(),
      selector: selector.map(str::to_string),
      mapper: mapper.map(str::to_string),
    }
  }

  pub fn resolve(method: &MethodDescriptor) -> Self {
    let selector = if method.has_default_selector() { None } else { Some(method.selector()) };
    Self::new(method.procedure(), selector, method.mapper())
  }

  pub fn procedure(&self) -> &str {
    &self.procedure
  }

  /* procedure [+ "With" + Selector] [+ "With" + MapperSimpleName]. Schema
   * separators and other punctuation in the procedure name become `_`. */
  pub fn key(&self) -> String {
    let mut key: String = self
      .procedure
      .chars()
      .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
      .collect();
    if let Some(selector) = &self.selector {
      key.push_str("With");
      key.push_str(&to_type_name(selector));
    }
    if let Some(mapper) = &self.mapper {
      key.push_str("With");
      key.push_str(simple_name(mapper));
    }
    key
  }

  pub fn type_name(&self) -> String {
    to_type_name(&self.key())
  }

  pub fn field_name(&self) -> String {
    to_field_name(&self.type_name())
  }
}

impl fmt::Display for WrapperIdentity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.key())
  }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpec {
  pub name: String,
  pub type_name: String,
  pub binding: SqlBinding,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum MapperRef {
  Override { path: String },
  /* Generated from the entity constructor picked by `selector` */
  Default { entity: String, selector: String },
}

impl MapperRef {
  pub fn type_name(&self) -> String {
    match self {
      MapperRef::Override { path } => path.clone(),
      MapperRef::Default { entity, selector } => default_mapper_name(entity, selector),
    }
  }
}

/* User + Default -> UserDefaultMapper */
pub fn default_mapper_name(entity: &str, selector: &str) -> String {
  format!("{}{}Mapper", simple_name(entity), to_type_name(selector))
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ResultDecoder {
  pub table: String,
  pub row_type: String,
  pub mapper: MapperRef,
}

/* Everything needed to emit one wrapper type */
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct WrapperRequest {
  pub identity: WrapperIdentity,
  pub type_name: String,
  pub procedure: String,
  pub parameters: Vec<ParameterSpec>,
  pub decoders: Vec<ResultDecoder>,
}

impl WrapperRequest {
  pub fn build(method: &MethodDescriptor, plan: &UnpackPlan) -> Result<Self, SynthesisError> {
    let identity = WrapperIdentity::resolve(method);

    let mut parameters = Vec::with_capacity(method.args().len());
    for arg in method.args() {
      let binding = sql_binding(&arg.type_name).ok_or_else(|| SynthesisError::UnknownSqlType {
        argument: arg.name.clone(),
        type_name: arg.type_name.clone(),
      })?;
      parameters.push(ParameterSpec { name: arg.name.clone(), type_name: arg.type_name.clone(), binding });
    }

    let decoders = plan
      .tables(method)
      .into_iter()
      .map(|(index, row_type, selector, mapper)| ResultDecoder {
        table: result_table_name(index),
        row_type: row_type.to_string(),
        mapper: match mapper {
          Some(path) => MapperRef::Override { path: path.to_string() },
          None => MapperRef::Default { entity: row_type.to_string(), selector: selector.to_string() },
        },
      })
      .collect();

    Ok(Self {
      type_name: identity.type_name(),
      procedure: method.procedure().to_string(),
      identity,
      parameters,
      decoders,
    })
  }

  pub fn has_array_parameters(&self) -> bool {
    self.parameters.iter().any(|p| p.binding.is_array())
  }

  /* Parameter names may differ between callers; types may not */
  fn same_parameters(&self, other: &WrapperRequest) -> bool {
    self.parameters.len() == other.parameters.len()
      && self
        .parameters
        .iter()
        .zip(&other.parameters)
        .all(|(a, b)| a.type_name == b.type_name && a.binding == b.binding)
  }

  /* A void caller reads no tables, so it fits any decoder list */
  fn compatible_decoders(&self, other: &WrapperRequest) -> bool {
    self.decoders.is_empty() || other.decoders.is_empty() || self.decoders == other.decoders
  }
}

/* One request per distinct identity across the whole batch */
#[derive(Debug, Default)]
pub struct WrapperRegistry {
  requests: IndexMap<WrapperIdentity, WrapperRequest>,
  /* Type name -> what owns it */
  type_names: HashMap<String, String>,
}

impl WrapperRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /* Claim a type name for something other than a wrapper. The first owner
   * keeps it. */
  pub fn reserve(&mut self, type_name: &str, owner: impl Into<String>) {
    self.type_names.entry(type_name.to_string()).or_insert_with(|| owner.into());
  }

  /* Accept a request. A repeat of a known identity is accepted when it binds
   * the same parameters and its result tables agree; a void caller shares the
   * wrapper of a row-reading one, in either order. A new identity must not
   * reuse a taken type name. */
  pub fn register(&mut self, request: WrapperRequest) -> Result<(), SynthesisError> {
    if let Some(existing) = self.requests.get_mut(&request.identity) {
      if !existing.same_parameters(&request) || !existing.compatible_decoders(&request) {
        return Err(SynthesisError::WrapperSignatureConflict { type_name: request.type_name.clone() });
      }
      if existing.decoders.is_empty() {
        existing.decoders = request.decoders;
      }
      return Ok(());
    }

    if let Some(owner) = self.type_names.get(&request.type_name) {
      return Err(SynthesisError::WrapperNameCollision {
        type_name: request.type_name.clone(),
        existing: owner.clone(),
        requested: request.identity.key(),
      });
    }

    self.type_names.insert(request.type_name.clone(), request.identity.key());
    self.requests.insert(request.identity.clone(), request);
    Ok(())
  }

  pub fn get(&self, identity: &WrapperIdentity) -> Option<&WrapperRequest> {
    self.requests.get(identity)
  }

  pub fn requests(&self) -> impl Iterator<Item = &WrapperRequest> {
    self.requests.values()
  }

  pub fn len(&self) -> usize {
    self.requests.len()
  }

  pub fn is_empty(&self) -> bool {
    self.requests.is_empty()
  }

  pub fn into_requests(self) -> Vec<WrapperRequest> {
    self.requests.into_values().collect()
  }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FieldBinding {
  pub field_name: String,
  pub type_name: String,
}

/* Wrapper fields of one generated DAO: one per identity, first use wins */
#[derive(Debug, Default)]
pub struct FieldBindings {
  fields: IndexMap<WrapperIdentity, FieldBinding>,
}

impl FieldBindings {
  pub fn new() -> Self {
    Self::default()
  }

  /* Field for `identity`, and whether this call created it */
  pub fn bind(&mut self, identity: &WrapperIdentity) -> (&FieldBinding, bool) {
    let created = !self.fields.contains_key(identity);
    let binding = self.fields.entry(identity.clone()).or_insert_with(|| FieldBinding {
      field_name: identity.field_name(),
      type_name: identity.type_name(),
    });
    (binding, created)
  }

  pub fn iter(&self) -> impl Iterator<Item = &FieldBinding> {
    self.fields.values()
  }

  pub fn len(&self) -> usize {
    self.fields.len()
  }

  pub fn is_empty(&self) -> bool {
    self.fields.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::shape::Shape;

  fn method(name: &str, procedure: &str, selector: Option<&str>, mapper: Option<&str>) -> MethodDescriptor {
    MethodDescriptor::builder("UserDao", name, procedure)
      .returns("User")
      .argument("id", "i64")
      .selector(selector.map(str::to_string))
      .mapper(mapper.map(str::to_string))
      .build()
      .unwrap()
  }

  fn request(m: &MethodDescriptor) -> WrapperRequest {
    let plan = UnpackPlan::build(m, &Shape::Scalar("User".into()), &IndexMap::new()).unwrap();
    WrapperRequest::build(m, &plan).unwrap()
  }

  #[test]
  fn identity_keys() {
    let plain = WrapperIdentity::resolve(&method("a", "sp_get_user", None, None));
    assert_eq!(plain.key(), "sp_get_user");
    assert_eq!(plain.type_name(), "SpGetUser");
    assert_eq!(plain.field_name(), "spGetUser");

    let explicit_default = WrapperIdentity::resolve(&method("a", "sp_get_user", Some("Default"), None));
    assert_eq!(explicit_default, plain);

    let both = WrapperIdentity::resolve(&method("a", "sp_get_user", Some("Simple"), Some("crate::mappers::Custom")));
    assert_eq!(both.key(), "sp_get_userWithSimpleWithCustom");
    assert_eq!(both.type_name(), "SpGetUserWithSimpleWithCustom");

    let qualified = WrapperIdentity::new("dbo.sp_get_user", None, None);
    assert_eq!(qualified.type_name(), "DboSpGetUser");
  }

  #[test]
  fn identity_differs_on_any_component() {
    let base = WrapperIdentity::new("sp_x", None, None);
    assert_ne!(base, WrapperIdentity::new("sp_y", None, None));
    assert_ne!(base, WrapperIdentity::new("sp_x", Some("Simple"), None));
    assert_ne!(base, WrapperIdentity::new("sp_x", None, Some("M")));
  }

  #[test]
  fn decoders_name_default_mappers() {
    let r = request(&method("a", "sp_get_user", Some("simple"), None));
    assert_eq!(r.decoders.len(), 1);
    assert_eq!(r.decoders[0].table, "result-table-0");
    assert_eq!(r.decoders[0].mapper.type_name(), "UserSimpleMapper");
    assert_eq!(r.parameters[0].binding.sql_type().variant(), "BigInt");

    let o = request(&method("b", "sp_get_user", None, Some("crate::mappers::Custom")));
    assert_eq!(o.decoders[0].mapper.type_name(), "crate::mappers::Custom");
  }

  #[test]
  fn registry_dedups_by_identity() {
    let mut registry = WrapperRegistry::new();
    registry.register(request(&method("a", "sp_get_user", None, None))).unwrap();
    registry.register(request(&method("b", "sp_get_user", None, None))).unwrap();
    registry.register(request(&method("c", "sp_get_user", Some("Simple"), None))).unwrap();
    assert_eq!(registry.len(), 2);
  }

  #[test]
  fn registry_rejects_conflicts_and_collisions() {
    let mut registry = WrapperRegistry::new();
    registry.register(request(&method("a", "sp_get_user", None, None))).unwrap();

    let other_args = MethodDescriptor::builder("UserDao", "b", "sp_get_user")
      .returns("User")
      .argument("name", "String")
      .build()
      .unwrap();
    let err = registry.register(request(&other_args)).unwrap_err();
    assert!(matches!(err, SynthesisError::WrapperSignatureConflict { .. }));

    /* sp_get_user and sp_getUser both derive SpGetUser */
    let err = registry.register(request(&method("c", "sp_getUser", None, None))).unwrap_err();
    assert_eq!(
      err,
      SynthesisError::WrapperNameCollision {
        type_name: "SpGetUser".into(),
        existing: "sp_get_user".into(),
        requested: "sp_getUser".into(),
      }
    );
  }

  fn void_method(name: &str, procedure: &str) -> MethodDescriptor {
    MethodDescriptor::builder("UserDao", name, procedure)
      .argument("id", "i64")
      .build()
      .unwrap()
  }

  fn void_request(m: &MethodDescriptor) -> WrapperRequest {
    let plan = UnpackPlan::build(m, &Shape::Void, &IndexMap::new()).unwrap();
    WrapperRequest::build(m, &plan).unwrap()
  }

  #[test]
  fn void_caller_shares_a_reading_wrapper() {
    let reader = method("get_user", "sp_user", None, None);
    let toucher = void_method("touch_user", "sp_user");

    let mut registry = WrapperRegistry::new();
    registry.register(request(&reader)).unwrap();
    registry.register(void_request(&toucher)).unwrap();
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.requests().next().unwrap().decoders.len(), 1);
  }

  #[test]
  fn reading_caller_upgrades_a_void_wrapper() {
    let reader = method("get_user", "sp_user", None, None);
    let toucher = void_method("touch_user", "sp_user");

    let mut registry = WrapperRegistry::new();
    registry.register(void_request(&toucher)).unwrap();
    assert!(registry.requests().next().unwrap().decoders.is_empty());
    registry.register(request(&reader)).unwrap();

    assert_eq!(registry.len(), 1);
    let shared = registry.requests().next().unwrap();
    assert_eq!(shared.decoders.len(), 1);
    assert_eq!(shared.decoders[0].row_type, "User");
  }

  #[test]
  fn reserved_names_block_wrappers() {
    let mut registry = WrapperRegistry::new();
    registry.reserve("SpGetUser", "aggregate SpGetUser");
    let err = registry.register(request(&method("a", "sp_get_user", None, None))).unwrap_err();
    assert_eq!(
      err,
      SynthesisError::WrapperNameCollision {
        type_name: "SpGetUser".into(),
        existing: "aggregate SpGetUser".into(),
        requested: "sp_get_user".into(),
      }
    );
    assert!(registry.is_empty());
  }

  #[test]
  fn bindings_reuse_fields() {
    let mut bindings = FieldBindings::new();
    let id = WrapperIdentity::new("sp_get_something", None, None);
    let (first, created) = bindings.bind(&id);
    assert_eq!(first.field_name, "spGetSomething");
    assert!(created);
    let (_, created) = bindings.bind(&id);
    assert!(!created);
    assert_eq!(bindings.len(), 1);
  }
}
