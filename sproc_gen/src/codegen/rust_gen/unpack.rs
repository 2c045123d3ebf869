/* Rendering of unpack plans into method bodies */

use crate::codegen::rust_gen::helpers::string_literal;
use crate::naming::result_table_name;
use crate::synth::{CardinalityRule, TableRead, UnpackPlan};

/* What a generated method body calls, and with what */
pub struct CallSite<'a> {
  pub procedure: &'a str,
  /* Wrapper field on `self` */
  pub field: &'a str,
  /* Expressions passed to the wrapper's `execute`, in call order */
  pub call_args: Vec<String>,
  /* Argument bindings handed to the interceptor, in call order */
  pub arg_names: Vec<String>,
  pub interceptor: Option<&'a str>,
  pub runtime: &'a str,
}

impl CallSite<'_> {
  fn interceptor_args(&self) -> String {
    let args: Vec<String> = self.arg_names.iter().map(|name| format!("&{}", name)).collect();
    format!("&[{}]", args.join(", "))
  }

  fn single(&self, element_type: &str, table: usize, rule: CardinalityRule) -> String {
    let table = string_literal(&result_table_name(table));
    format!(
      "{}::cardinality::{}(call_result.take_table::<{}>({})?, {}, {})",
      self.runtime,
      rule.helper(),
      element_type,
      table,
      string_literal(self.procedure),
      table
    )
  }

  fn rows(&self, element_type: &str, table: usize) -> String {
    format!(
      "call_result.take_table::<{}>({})",
      element_type,
      string_literal(&result_table_name(table))
    )
  }
}

/* Body lines, unindented. Interceptor hooks bracket the call only; the
 * unpacking that follows runs after `after` has fired. `after` also fires
 * when the call fails, so every `before` token is handed back. */
pub fn render_body(plan: &UnpackPlan, site: &CallSite) -> Vec<String> {
  let mut lines = Vec::new();
  let procedure = string_literal(site.procedure);
  let call = format!("self.{}.execute({})", site.field, site.call_args.join(", "));

  match site.interceptor {
    Some(interceptor) => {
      lines.push(format!(
        "let token = <{} as {}::Interceptor>::before({}, {});",
        interceptor,
        site.runtime,
        procedure,
        site.interceptor_args()
      ));
      lines.push(format!("let call_result = {};", call));
      lines.push(format!(
        "<{} as {}::Interceptor>::after(token, {}, {});",
        interceptor,
        site.runtime,
        procedure,
        site.interceptor_args()
      ));
      match plan {
        UnpackPlan::Discard => lines.push("call_result?;".to_string()),
        _ => lines.push("let mut call_result = call_result?;".to_string()),
      }
    }
    None => match plan {
      UnpackPlan::Discard => lines.push(format!("{}?;", call)),
      _ => lines.push(format!("let mut call_result = {}?;", call)),
    },
  }

  match plan {
    UnpackPlan::Discard => lines.push("Ok(())".to_string()),
    UnpackPlan::Single { element_type, rule } => lines.push(site.single(element_type, 0, *rule)),
    UnpackPlan::Table { element_type } => lines.push(site.rows(element_type, 0)),
    UnpackPlan::Aggregate { name, fields } => {
      lines.push(format!("Ok({} {{", name));
      for field in fields {
        let value = match &field.read {
          TableRead::Rows => site.rows(&field.element_type, field.table),
          TableRead::Single { rule } => site.single(&field.element_type, field.table, *rule),
        };
        lines.push(format!("    {}: {}?,", crate::naming::escape_rust_keyword(&field.name), value));
      }
      lines.push("})".to_string());
    }
  }

  lines
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::synth::FieldPlan;

  fn site(interceptor: Option<&'static str>) -> CallSite<'static> {
    CallSite {
      procedure: "sp_get_user",
      field: "spGetUser",
      call_args: vec!["&id".to_string()],
      arg_names: vec!["id".to_string()],
      interceptor,
      runtime: "sproc_runtime",
    }
  }

  #[test]
  fn single_exactly_one() {
    let plan = UnpackPlan::Single { element_type: "User".into(), rule: CardinalityRule::ExactlyOne };
    assert_eq!(
      render_body(&plan, &site(None)),
      vec![
        "let mut call_result = self.spGetUser.execute(&id)?;".to_string(),
        "sproc_runtime::cardinality::exactly_one(call_result.take_table::<User>(\"result-table-0\")?, \"sp_get_user\", \"result-table-0\")".to_string(),
      ]
    );
  }

  #[test]
  fn void_with_interceptor() {
    let lines = render_body(&UnpackPlan::Discard, &site(Some("sproc_runtime::CallTimer")));
    assert_eq!(
      lines,
      vec![
        "let token = <sproc_runtime::CallTimer as sproc_runtime::Interceptor>::before(\"sp_get_user\", &[&id]);".to_string(),
        "let call_result = self.spGetUser.execute(&id);".to_string(),
        "<sproc_runtime::CallTimer as sproc_runtime::Interceptor>::after(token, \"sp_get_user\", &[&id]);".to_string(),
        "call_result?;".to_string(),
        "Ok(())".to_string(),
      ]
    );
  }

  #[test]
  fn failed_call_still_reaches_after() {
    let plan = UnpackPlan::Single { element_type: "User".into(), rule: CardinalityRule::ExactlyOne };
    let lines = render_body(&plan, &site(Some("sproc_runtime::CallTimer")));
    let after = lines.iter().position(|l| l.contains("::after(token")).expect("after");
    let unwrap = lines.iter().position(|l| l == "let mut call_result = call_result?;").expect("unwrap");
    assert_eq!(lines[1], "let call_result = self.spGetUser.execute(&id);");
    assert!(after < unwrap);
    assert!(lines[..after].iter().all(|l| !l.contains('?')));
  }

  #[test]
  fn list_has_no_cardinality_check() {
    let plan = UnpackPlan::Table { element_type: "User".into() };
    let lines = render_body(&plan, &site(None));
    assert_eq!(lines[1], "call_result.take_table::<User>(\"result-table-0\")");
    assert!(!lines.iter().any(|l| l.contains("cardinality")));
  }

  #[test]
  fn aggregate_fields_in_order() {
    let plan = UnpackPlan::Aggregate {
      name: "UserPermissions".into(),
      fields: vec![
        FieldPlan {
          name: "user".into(),
          element_type: "User".into(),
          table: 0,
          read: TableRead::Single { rule: CardinalityRule::AtMostOne },
          selector: "Default".into(),
          mapper: None,
        },
        FieldPlan {
          name: "permissions".into(),
          element_type: "Permission".into(),
          table: 1,
          read: TableRead::Rows,
          selector: "Default".into(),
          mapper: None,
        },
      ],
    };
    let lines = render_body(&plan, &site(None));
    assert_eq!(lines[1], "Ok(UserPermissions {");
    assert!(lines[2].starts_with("    user: sproc_runtime::cardinality::at_most_one("));
    assert!(lines[2].contains("\"result-table-0\""));
    assert_eq!(lines[3], "    permissions: call_result.take_table::<Permission>(\"result-table-1\")?,");
    assert_eq!(lines[4], "})");
  }
}
