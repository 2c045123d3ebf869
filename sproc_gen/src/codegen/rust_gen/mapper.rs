/* Row mapper emission: one mapper per entity constructor */

use serde_derive::Serialize;
use sproc_types::DEFAULT_SELECTOR;

use crate::codegen::rust_gen::helpers::doc_comment;
use crate::identity::default_mapper_name;
use crate::model::{Argument, EntityConstructor, EntityDescriptor};
use crate::naming::{escape_rust_keyword, to_snake_name};

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct MapperSpec {
  pub name: String,
  pub entity: String,
  pub function: String,
  pub columns: Vec<Argument>,
}

impl MapperSpec {
  /* `new` for the default constructor, otherwise the explicit function or the
   * snake-cased selector */
  pub fn for_constructor(entity: &EntityDescriptor, ctor: &EntityConstructor) -> Self {
    let function = match &ctor.function {
      Some(function) => function.clone(),
      None if ctor.selector == DEFAULT_SELECTOR => "new".to_string(),
      None => to_snake_name(&ctor.selector),
    };
    Self {
      name: default_mapper_name(&entity.path, &ctor.selector),
      entity: entity.path.clone(),
      function,
      columns: ctor.params.clone(),
    }
  }
}

pub fn emit_mapper(spec: &MapperSpec) -> String {
  let mut output = String::new();
  let columns: Vec<&str> = spec.columns.iter().map(|c| c.name.as_str()).collect();
  let doc = if columns.is_empty() {
    format!("Maps rows through `{}::{}`.", spec.entity, spec.function)
  } else {
    format!("Maps rows through `{}::{}`.\nColumns: {}.", spec.entity, spec.function, columns.join(", "))
  };
  output.push_str(&doc_comment(&doc, ""));
  output.push_str("#[derive(Debug, Clone, Copy, Default)]\n");
  output.push_str(&format!("pub struct {};\n\n", spec.name));

  output.push_str(&format!("impl RowMapper for {} {{\n", spec.name));
  output.push_str(&format!("    type Output = {};\n\n", spec.entity));
  output.push_str(&format!(
    "    fn map_row(&self, row: &Row, _row_num: usize) -> SprocResult<{}> {{\n",
    spec.entity
  ));

  let function = escape_rust_keyword(&spec.function);
  if spec.columns.is_empty() {
    output.push_str(&format!("        Ok({}::{}())\n", spec.entity, function));
  } else {
    output.push_str(&format!("        Ok({}::{}(\n", spec.entity, function));
    for (index, column) in spec.columns.iter().enumerate() {
      output.push_str(&format!("            row.get::<{}>({})?,\n", column.type_name, index));
    }
    output.push_str("        ))\n");
  }
  output.push_str("    }\n");
  output.push_str("}\n");

  output
}
