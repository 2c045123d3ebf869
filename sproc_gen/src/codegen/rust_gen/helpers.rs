/* Helper utilities for emitting generated Rust source */

pub const GENERATED_HEADER: &str = "// @generated by sproc-gen. Do not edit by hand.\n";

/* Indentation of generated code */
pub const INDENT: &str = "    ";

/* Header, `use` lines for `imports`, then the descriptor `uses` */
pub fn file_prelude(imports: &[String], uses: &[String]) -> String {
  let mut output = String::new();
  output.push_str(GENERATED_HEADER);
  output.push_str("#![allow(unused_imports)]\n\n");

  for import in imports {
    output.push_str(&format!("use {};\n", import));
  }
  if !imports.is_empty() && !uses.is_empty() {
    output.push('\n');
  }
  for path in uses {
    output.push_str(&format!("use {};\n", path));
  }
  if !imports.is_empty() || !uses.is_empty() {
    output.push('\n');
  }
  output
}

/* `///` lines, one per line of `text` */
pub fn doc_comment(text: &str, indent: &str) -> String {
  let mut output = String::new();
  for line in text.trim().lines() {
    let line = line.trim_end();
    if line.is_empty() {
      output.push_str(&format!("{}///\n", indent));
    } else {
      output.push_str(&format!("{}/// {}\n", indent, line));
    }
  }
  output
}

/* Quoted Rust string literal */
pub fn string_literal(value: &str) -> String {
  format!("{:?}", value)
}
