/* DAO emission
 *
 * Each DAO becomes a trait plus an `Impl` struct holding one wrapper field
 * per distinct wrapper identity. Methods are appended as they synthesize;
 * a method that failed never reaches the emitter.
 */

use crate::annotation::MirroredAttribute;
use crate::codegen::rust_gen::helpers::{INDENT, doc_comment};
use crate::codegen::rust_gen::unpack::{CallSite, render_body};
use crate::identity::{FieldBinding, FieldBindings, WrapperIdentity};
use crate::model::MethodDescriptor;
use crate::naming::escape_rust_keyword;
use crate::synth::UnpackPlan;

/* Settings of the emitted code that do not vary per method */
pub struct EmitContext<'a> {
  pub runtime: &'a str,
  pub interceptor: Option<&'a str>,
}

pub struct DaoEmitter {
  name: String,
  comment: Option<String>,
  bindings: FieldBindings,
  signatures: Vec<String>,
  methods: Vec<String>,
}

impl DaoEmitter {
  pub fn new(name: &str, comment: Option<&str>) -> Self {
    Self {
      name: name.to_string(),
      comment: comment.map(str::to_string),
      bindings: FieldBindings::new(),
      signatures: Vec::new(),
      methods: Vec::new(),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn impl_name(&self) -> String {
    format!("{}Impl", self.name)
  }

  pub fn method_count(&self) -> usize {
    self.methods.len()
  }

  pub fn field_count(&self) -> usize {
    self.bindings.len()
  }

  /* Field serving `identity`, and whether it was just created */
  pub fn bind(&mut self, identity: &WrapperIdentity) -> (FieldBinding, bool) {
    let (binding, created) = self.bindings.bind(identity);
    (binding.clone(), created)
  }

  pub fn push_method(
    &mut self,
    method: &MethodDescriptor,
    plan: &UnpackPlan,
    attributes: &[MirroredAttribute],
    field: &FieldBinding,
    ctx: &EmitContext,
  ) {
    let params: Vec<String> = method
      .args()
      .iter()
      .map(|arg| format!(", {}: {}", escape_rust_keyword(&arg.name), arg.type_name))
      .collect();
    let signature = format!(
      "fn {}(&self{}) -> {}::SprocResult<{}>",
      escape_rust_keyword(method.name()),
      params.concat(),
      ctx.runtime,
      plan.return_type()
    );

    let arg_names: Vec<String> = method.args().iter().map(|arg| escape_rust_keyword(&arg.name)).collect();
    let call_args: Vec<String> = method
      .args()
      .iter()
      .zip(&arg_names)
      .map(|(arg, name)| if arg.type_name.starts_with('&') { name.clone() } else { format!("&{}", name) })
      .collect();
    let site = CallSite {
      procedure: method.procedure(),
      field: &field.field_name,
      call_args,
      arg_names,
      interceptor: ctx.interceptor,
      runtime: ctx.runtime,
    };

    let indent = INDENT;
    let mut output = String::new();
    for attribute in attributes {
      output.push_str(&format!("{}{}\n", indent, attribute.render()));
    }
    output.push_str(&format!("{}{} {{\n", indent, signature));
    for line in render_body(plan, &site) {
      output.push_str(&format!("{}{}{}\n", indent, indent, line));
    }
    output.push_str(&format!("{}}}\n", indent));

    self.signatures.push(signature);
    self.methods.push(output);
  }

  pub fn emit(&self) -> String {
    let mut output = String::new();
    let impl_name = self.impl_name();

    /* Trait */
    if let Some(comment) = &self.comment {
      output.push_str(&doc_comment(comment, ""));
    }
    output.push_str(&format!("pub trait {} {{\n", self.name));
    for signature in &self.signatures {
      output.push_str(&format!("{}{};\n", INDENT, signature));
    }
    output.push_str("}\n\n");

    /* Struct with one field per wrapper identity */
    output.push_str("#[allow(non_snake_case)]\n");
    if self.bindings.is_empty() {
      output.push_str(&format!("pub struct {} {{}}\n\n", impl_name));
    } else {
      output.push_str(&format!("pub struct {} {{\n", impl_name));
      for binding in self.bindings.iter() {
        output.push_str(&format!("{}{}: {},\n", INDENT, binding.field_name, binding.type_name));
      }
      output.push_str("}\n\n");
    }

    output.push_str(&format!("impl {} {{\n", impl_name));
    if self.bindings.is_empty() {
      output.push_str("    pub fn new(_data_source: Arc<dyn DataSource>) -> Self {\n");
      output.push_str("        Self {}\n");
    } else {
      output.push_str("    pub fn new(data_source: Arc<dyn DataSource>) -> Self {\n");
      output.push_str("        Self {\n");
      for binding in self.bindings.iter() {
        output.push_str(&format!(
          "            {}: {}::new(data_source.clone()),\n",
          binding.field_name, binding.type_name
        ));
      }
      output.push_str("        }\n");
    }
    output.push_str("    }\n");
    output.push_str("}\n\n");

    /* Trait implementation */
    output.push_str(&format!("impl {} for {} {{\n", self.name, impl_name));
    for (index, method) in self.methods.iter().enumerate() {
      if index > 0 {
        output.push('\n');
      }
      output.push_str(method);
    }
    output.push_str("}\n");

    output
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::shape::Shape;
  use crate::synth::CardinalityRule;
  use indexmap::IndexMap;

  fn method(name: &str, returns: &str) -> MethodDescriptor {
    MethodDescriptor::builder("UserDao", name, "sp_get_something")
      .returns(returns)
      .argument("id", "i64")
      .build()
      .unwrap()
  }

  fn push(emitter: &mut DaoEmitter, m: &MethodDescriptor, shape: Shape, interceptor: Option<&str>) {
    let plan = UnpackPlan::build(m, &shape, &IndexMap::new()).unwrap();
    let (binding, _) = emitter.bind(&WrapperIdentity::resolve(m));
    let ctx = EmitContext { runtime: "sproc_runtime", interceptor };
    emitter.push_method(m, &plan, &[], &binding, &ctx);
  }

  #[test]
  fn shared_identity_shares_one_field() {
    let mut emitter = DaoEmitter::new("UserDao", Some("User access"));
    push(&mut emitter, &method("first", "User"), Shape::Scalar("User".into()), None);
    push(&mut emitter, &method("second", "User"), Shape::Scalar("User".into()), None);
    assert_eq!(emitter.method_count(), 2);
    assert_eq!(emitter.field_count(), 1);

    let code = emitter.emit();
    assert_eq!(code.matches("spGetSomething: SpGetSomething,").count(), 1);
    assert_eq!(code.matches("SpGetSomething::new(data_source.clone())").count(), 1);
    assert!(code.starts_with("/// User access\npub trait UserDao {\n"));
    assert!(code.contains("    fn first(&self, id: i64) -> sproc_runtime::SprocResult<User>;\n"));
    assert!(code.contains("impl UserDao for UserDaoImpl {\n"));
  }

  #[test]
  fn no_interceptor_means_no_token() {
    let mut emitter = DaoEmitter::new("UserDao", None);
    push(&mut emitter, &method("first", "User"), Shape::Scalar("User".into()), None);
    assert!(!emitter.emit().contains("token"));

    let mut emitter = DaoEmitter::new("UserDao", None);
    push(&mut emitter, &method("first", "User"), Shape::Scalar("User".into()), Some("crate::Timer"));
    let code = emitter.emit();
    assert!(code.contains("let token = <crate::Timer as sproc_runtime::Interceptor>::before(\"sp_get_something\", &[&id]);"));
    let call = code.find("execute(&id)?").unwrap();
    let after = code.find("::after(token").unwrap();
    let unpack = code.find("exactly_one").unwrap();
    assert!(call < after && after < unpack);
  }

  #[test]
  fn nullable_scalar_returns_option() {
    let m = MethodDescriptor::builder("UserDao", "find", "sp_find")
      .returns("User")
      .null_policy(sproc_types::NullPolicy::ReturnNullOrEmpty)
      .build()
      .unwrap();
    let plan = UnpackPlan::build(&m, &Shape::Scalar("User".into()), &IndexMap::new()).unwrap();
    assert_eq!(plan, UnpackPlan::Single { element_type: "User".into(), rule: CardinalityRule::AtMostOne });

    let mut emitter = DaoEmitter::new("UserDao", None);
    let (binding, _) = emitter.bind(&WrapperIdentity::resolve(&m));
    emitter.push_method(&m, &plan, &[], &binding, &EmitContext { runtime: "sproc_runtime", interceptor: None });
    let code = emitter.emit();
    assert!(code.contains("fn find(&self) -> sproc_runtime::SprocResult<Option<User>>"));
    assert!(code.contains("self.spFind.execute()?"));
    assert!(code.contains("at_most_one"));
  }

  #[test]
  fn empty_dao_has_no_fields() {
    let code = DaoEmitter::new("EmptyDao", None).emit();
    assert!(code.contains("pub struct EmptyDaoImpl {}"));
    assert!(code.contains("pub fn new(_data_source: Arc<dyn DataSource>) -> Self {"));
  }
}
