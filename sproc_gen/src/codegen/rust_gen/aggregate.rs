/* Aggregate struct emission */

use crate::codegen::rust_gen::helpers::doc_comment;
use crate::naming::escape_rust_keyword;
use crate::synth::AggregateLayout;

/* Fields in declared order; field `i` is filled from result table `i` */
pub fn emit_aggregate(layout: &AggregateLayout) -> String {
  let mut output = String::new();
  if let Some(comment) = &layout.descriptor.comment {
    output.push_str(&doc_comment(comment, ""));
  }
  output.push_str(&format!("pub struct {} {{\n", layout.descriptor.name));
  for field in &layout.fields {
    output.push_str(&format!("    pub {}: {},\n", escape_rust_keyword(&field.name), field.rust_type()));
  }
  output.push_str("}\n");
  output
}
