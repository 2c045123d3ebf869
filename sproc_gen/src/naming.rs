/* Name transforms used to derive wrapper, field and mapper names */

const RUST_KEYWORDS: &[&str] = &[
  "as", "break", "const", "continue", "crate", "else", "enum", "extern",
  "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod",
  "move", "mut", "pub", "ref", "return", "self", "Self", "static", "struct",
  "super", "trait", "true", "type", "unsafe", "use", "where", "while",
  "async", "await", "dyn", "abstract", "become", "box", "do", "final",
  "macro", "override", "priv", "typeof", "unsized", "virtual", "yield", "try",
];

/* Key of the i-th result table in a call result; matches the runtime */
pub const RESULT_TABLE_PREFIX: &str = "result-table-";

/* Keywords that cannot be written as raw identifiers */
const PATH_KEYWORDS: &[&str] = &["crate", "self", "Self", "super"];

/* sp_get_user -> SpGetUser. Every underscore is dropped and the character
 * following it is uppercased; all other characters keep their case. */
pub fn to_type_name(name: &str) -> String {
  let mut out = String::with_capacity(name.len());
  let mut upper_next = true;
  for c in name.chars() {
    if c == '_' {
      upper_next = true;
      continue;
    }
    if upper_next {
      out.extend(c.to_uppercase());
      upper_next = false;
    } else {
      out.push(c);
    }
  }
  out
}

/* SpGetUser -> spGetUser. Only the first character changes. */
pub fn to_field_name(type_name: &str) -> String {
  let mut chars = type_name.chars();
  match chars.next() {
    Some(first) => first.to_lowercase().chain(chars).collect(),
    None => String::new(),
  }
}

/* WithPermissions -> with_permissions */
pub fn to_snake_name(name: &str) -> String {
  let mut out = String::with_capacity(name.len() + 4);
  let mut prev_lower = false;
  for c in name.chars() {
    if c.is_uppercase() {
      if prev_lower {
        out.push('_');
      }
      out.extend(c.to_lowercase());
      prev_lower = false;
    } else {
      out.push(c);
      prev_lower = c.is_lowercase() || c.is_ascii_digit();
    }
  }
  out
}

/* Last segment of a path, without generic arguments: crate::mappers::Custom -> Custom */
pub fn simple_name(path: &str) -> &str {
  let base = match path.find('<') {
    Some(idx) => &path[..idx],
    None => path,
  };
  base.rsplit("::").next().unwrap_or(base).trim()
}

/* Names a `use` path brings into scope: `a::B`, `a::B as C`, `a::{B, C as D}`.
 * Globs bring nothing nameable. */
pub fn imported_names(use_path: &str) -> Vec<&str> {
  let use_path = use_path.trim().trim_end_matches(';');
  let items: Vec<&str> = match (use_path.find('{'), use_path.rfind('}')) {
    (Some(open), Some(close)) if open < close => use_path[open + 1..close].split(',').collect(),
    _ => vec![use_path],
  };

  items
    .into_iter()
    .filter_map(|item| {
      let item = item.trim();
      let name = match item.split_once(" as ") {
        Some((_, alias)) => alias.trim(),
        None => item.rsplit("::").next().unwrap_or(item).trim(),
      };
      (!name.is_empty() && name != "*" && name != "self").then_some(name)
    })
    .collect()
}

pub fn result_table_name(index: usize) -> String {
  format!("{}{}", RESULT_TABLE_PREFIX, index)
}

pub fn is_keyword(name: &str) -> bool {
  RUST_KEYWORDS.contains(&name)
}

/* Escape Rust keywords to valid identifiers */
pub fn escape_rust_keyword(name: &str) -> String {
  if is_keyword(name) && !PATH_KEYWORDS.contains(&name) {
    format!("r#{}", name)
  } else {
    name.to_string()
  }
}

pub fn is_valid_ident(name: &str) -> bool {
  let mut chars = name.chars();
  match chars.next() {
    Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
    _ => return false,
  }
  if name == "_" {
    return false;
  }
  chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/* An identifier usable for a binding: not `self`/`super`/`crate`/`Self`,
 * other keywords are fine since they are emitted raw. */
pub fn is_valid_binding(name: &str) -> bool {
  is_valid_ident(name) && !PATH_KEYWORDS.contains(&name)
}

/* A plain `a::b::C` path without generics */
pub fn is_valid_path(path: &str) -> bool {
  !path.is_empty() && path.split("::").all(is_valid_ident)
}
