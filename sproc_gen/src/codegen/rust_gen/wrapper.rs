/* Call-wrapper emission: one struct per wrapper request */

use crate::codegen::rust_gen::helpers::{doc_comment, string_literal};
use crate::identity::WrapperRequest;
use crate::naming::escape_rust_keyword;
use crate::sql_types::SqlBinding;

/* Wrappers borrow their arguments; reference types are taken as declared */
pub fn borrowed_type(type_name: &str) -> String {
  if type_name.starts_with('&') {
    type_name.to_string()
  } else {
    format!("&{}", type_name)
  }
}

pub fn emit_wrapper(request: &WrapperRequest) -> String {
  let mut output = String::new();
  let name = &request.type_name;

  output.push_str(&doc_comment(&format!("Calls stored procedure `{}`.", request.procedure), ""));
  output.push_str(&format!("pub struct {} {{\n", name));
  output.push_str("    procedure: StoredProcedure,\n");
  output.push_str("}\n\n");

  output.push_str(&format!("impl {} {{\n", name));

  /* Constructor: declare parameters and result tables in order */
  output.push_str("    pub fn new(data_source: Arc<dyn DataSource>) -> Self {\n");
  output.push_str(&format!(
    "        let procedure = StoredProcedure::new(data_source, {})",
    string_literal(&request.procedure)
  ));
  for param in &request.parameters {
    output.push_str(&format!(
      "\n            .declare_parameter(SqlParameter::new({}, SqlType::{}))",
      string_literal(&param.name),
      param.binding.sql_type().variant()
    ));
  }
  for decoder in &request.decoders {
    output.push_str(&format!(
      "\n            .declare_result({}, {}::default())",
      string_literal(&decoder.table),
      decoder.mapper.type_name()
    ));
  }
  output.push_str(";\n");
  output.push_str("        Self { procedure }\n");
  output.push_str("    }\n\n");

  /* execute */
  let signature: Vec<String> = request
    .parameters
    .iter()
    .map(|p| format!(", {}: {}", escape_rust_keyword(&p.name), borrowed_type(&p.type_name)))
    .collect();
  output.push_str(&format!(
    "    pub fn execute(&self{}) -> SprocResult<CallResult> {{\n",
    signature.concat()
  ));

  let values: Vec<String> = request
    .parameters
    .iter()
    .map(|p| {
      let name = escape_rust_keyword(&p.name);
      if p.binding.is_array() { name } else { format!("{}.to_sql()", name) }
    })
    .collect();

  if request.has_array_parameters() {
    /* Arrays are built on the connection the call runs on */
    output.push_str("        let connection = self.procedure.connection()?;\n");
    for param in &request.parameters {
      if let SqlBinding::Array { element } = &param.binding {
        let name = escape_rust_keyword(&param.name);
        output.push_str(&format!(
          "        let {} = connection.create_array({}, {}.iter().map(ToSql::to_sql).collect())?;\n",
          name,
          string_literal(element),
          name
        ));
      }
    }
    output.push_str(&format!(
      "        self.procedure.execute_on(connection.as_ref(), vec![{}])\n",
      values.join(", ")
    ));
  } else {
    output.push_str(&format!("        self.procedure.execute(vec![{}])\n", values.join(", ")));
  }
  output.push_str("    }\n");
  output.push_str("}\n");

  output
}
