/* Rust argument type -> SQL parameter type */

use serde_derive::Serialize;

use crate::naming::simple_name;
use crate::shape::split_generic;

/* Mirrors the runtime `SqlType` variants */
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlKind {
  Boolean,
  TinyInt,
  SmallInt,
  Integer,
  BigInt,
  Float,
  Double,
  Varchar,
  Binary,
  Date,
  Time,
  Timestamp,
  Array,
}

impl SqlKind {
  pub fn variant(&self) -> &'static str {
    match self {
      SqlKind::Boolean => "Boolean",
      SqlKind::TinyInt => "TinyInt",
      SqlKind::SmallInt => "SmallInt",
      SqlKind::Integer => "Integer",
      SqlKind::BigInt => "BigInt",
      SqlKind::Float => "Float",
      SqlKind::Double => "Double",
      SqlKind::Varchar => "Varchar",
      SqlKind::Binary => "Binary",
      SqlKind::Date => "Date",
      SqlKind::Time => "Time",
      SqlKind::Timestamp => "Timestamp",
      SqlKind::Array => "Array",
    }
  }

  /* Element name passed to `create_array` */
  pub fn array_element_name(&self) -> Option<&'static str> {
    match self {
      SqlKind::Boolean => Some("bool"),
      SqlKind::TinyInt => Some("tinyint"),
      SqlKind::SmallInt => Some("smallint"),
      SqlKind::Integer => Some("int"),
      SqlKind::BigInt => Some("bigint"),
      SqlKind::Float => Some("float"),
      SqlKind::Double => Some("double"),
      SqlKind::Varchar => Some("varchar"),
      SqlKind::Date => Some("date"),
      SqlKind::Time => Some("time"),
      SqlKind::Timestamp => Some("timestamp"),
      SqlKind::Binary | SqlKind::Array => None,
    }
  }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SqlBinding {
  Value { sql_type: SqlKind },
  /* Bound through the connection's array constructor */
  Array { element: &'static str },
}

impl SqlBinding {
  pub fn sql_type(&self) -> SqlKind {
    match self {
      SqlBinding::Value { sql_type } => *sql_type,
      SqlBinding::Array { .. } => SqlKind::Array,
    }
  }

  pub fn is_array(&self) -> bool {
    matches!(self, SqlBinding::Array { .. })
  }
}

fn scalar_kind(type_text: &str) -> Option<SqlKind> {
  let type_text = type_text.trim().trim_start_matches('&').trim_start_matches("'static ").trim();
  let kind = match simple_name(type_text) {
    "bool" => SqlKind::Boolean,
    "i8" => SqlKind::TinyInt,
    "i16" => SqlKind::SmallInt,
    "i32" => SqlKind::Integer,
    "i64" => SqlKind::BigInt,
    "f32" => SqlKind::Float,
    "f64" => SqlKind::Double,
    "String" | "str" => SqlKind::Varchar,
    "NaiveDate" => SqlKind::Date,
    "NaiveTime" => SqlKind::Time,
    "NaiveDateTime" => SqlKind::Timestamp,
    _ => return None,
  };
  Some(kind)
}

fn is_generic(type_text: &str, wrapper: &str) -> Option<String> {
  match split_generic(type_text.trim()) {
    Ok(Some((outer, inner))) if simple_name(outer) == wrapper => Some(inner.to_string()),
    _ => None,
  }
}

/* Binding for an argument type, `None` when the type has no SQL mapping */
pub fn sql_binding(type_text: &str) -> Option<SqlBinding> {
  let type_text = type_text.trim();
  if let Some(inner) = is_generic(type_text, "Option") {
    return scalar_binding(&inner);
  }
  if let Some(inner) = is_generic(type_text, "Vec") {
    if inner.trim() == "u8" {
      return Some(SqlBinding::Value { sql_type: SqlKind::Binary });
    }
    let element_type = match is_generic(&inner, "Option") {
      Some(element) => element,
      None => inner,
    };
    let element = scalar_kind(&element_type)?.array_element_name()?;
    return Some(SqlBinding::Array { element });
  }
  scalar_binding(type_text)
}

fn scalar_binding(type_text: &str) -> Option<SqlBinding> {
  if let Some(inner) = is_generic(type_text, "Vec") {
    if inner.trim() == "u8" {
      return Some(SqlBinding::Value { sql_type: SqlKind::Binary });
    }
    return None;
  }
  scalar_kind(type_text).map(|sql_type| SqlBinding::Value { sql_type })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn value(sql_type: SqlKind) -> Option<SqlBinding> {
    Some(SqlBinding::Value { sql_type })
  }

  #[test]
  fn scalar_types() {
    assert_eq!(sql_binding("i64"), value(SqlKind::BigInt));
    assert_eq!(sql_binding("&str"), value(SqlKind::Varchar));
    assert_eq!(sql_binding("std::string::String"), value(SqlKind::Varchar));
    assert_eq!(sql_binding("chrono::NaiveDateTime"), value(SqlKind::Timestamp));
    assert_eq!(sql_binding("Option<i32>"), value(SqlKind::Integer));
    assert_eq!(sql_binding("Vec<u8>"), value(SqlKind::Binary));
    assert_eq!(sql_binding("Option<Vec<u8>>"), value(SqlKind::Binary));
  }

  #[test]
  fn array_types() {
    assert_eq!(sql_binding("Vec<i64>"), Some(SqlBinding::Array { element: "bigint" }));
    assert_eq!(sql_binding("Vec<Option<String>>"), Some(SqlBinding::Array { element: "varchar" }));
    assert!(sql_binding("Vec<i64>").unwrap().is_array());
  }

  #[test]
  fn unmapped_types() {
    assert_eq!(sql_binding("User"), None);
    assert_eq!(sql_binding("Option<Vec<i64>>"), None);
    assert_eq!(sql_binding("Vec<Vec<u8>>"), None);
    assert_eq!(sql_binding("u64"), None);
  }
}
