use indexmap::IndexMap;
use serde_derive::{Deserialize, Serialize};

/* Selector used when a method or field does not name a mapping constructor */
pub const DEFAULT_SELECTOR: &str = "Default";

/* Return type assumed when a method omits `returns` */
pub const VOID_RETURN: &str = "()";

fn default_returns() -> String {
    VOID_RETURN.to_string()
}

fn default_selector() -> String {
    DEFAULT_SELECTOR.to_string()
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum NullPolicy {
    /// An empty result table is an error (`ObjectNotFound`).
    #[default]
    Throw,
    /// An empty result table yields `None`.
    ReturnNullOrEmpty,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct ArgumentDef {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// An attribute copied verbatim onto the generated method. Values are kept as
/// raw YAML until the generator mirrors them.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct AttributeDef {
    pub path: String,
    #[serde(default)]
    pub values: IndexMap<String, serde_yml::Value>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct MethodDef {
    pub name: String,
    pub procedure: String,
    #[serde(default = "default_returns")]
    pub returns: String,
    #[serde(default)]
    pub args: Vec<ArgumentDef>,
    #[serde(default)]
    pub mapper: Option<String>,
    #[serde(default)]
    pub constructor: Option<String>,
    #[serde(default)]
    pub null_policy: NullPolicy,
    #[serde(default)]
    pub attributes: Vec<AttributeDef>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct DaoDef {
    pub name: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub methods: Vec<MethodDef>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct AggregateFieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub mapper: Option<String>,
    #[serde(default)]
    pub constructor: Option<String>,
    #[serde(default)]
    pub null_policy: Option<NullPolicy>,
}

/// A multi-result shape: field `i` is read from result table `i`.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct AggregateDef {
    pub name: String,
    #[serde(default)]
    pub comment: Option<String>,
    pub fields: Vec<AggregateFieldDef>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct ConstructorDef {
    #[serde(default = "default_selector")]
    pub selector: String,
    /* Associated function building the entity; derived from the selector when absent */
    #[serde(default)]
    pub function: Option<String>,
    #[serde(default)]
    pub params: Vec<ArgumentDef>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct EntityDef {
    pub name: String,
    #[serde(default)]
    pub constructors: Vec<ConstructorDef>,
}

/* One descriptor file on disk */
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(rename_all = "kebab-case")]
pub struct DescriptorFile {
    #[serde(default)]
    pub uses: Vec<String>,
    #[serde(default)]
    pub entities: Vec<EntityDef>,
    #[serde(default)]
    pub aggregates: Vec<AggregateDef>,
    #[serde(default)]
    pub daos: Vec<DaoDef>,
}

impl DescriptorFile {
    /* Append the contents of another file, keeping declaration order */
    pub fn merge(&mut self, other: DescriptorFile) {
        for path in other.uses {
            if !self.uses.contains(&path) {
                self.uses.push(path);
            }
        }
        self.entities.extend(other.entities);
        self.aggregates.extend(other.aggregates);
        self.daos.extend(other.daos);
    }

    pub fn method_count(&self) -> usize {
        self.daos.iter().map(|dao| dao.methods.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_defaults_apply() {
        let yaml = r#"
name: save_user
procedure: sp_save_user
"#;
        let method: MethodDef = serde_yml::from_str(yaml).unwrap();
        assert_eq!(method.returns, "()");
        assert_eq!(method.null_policy, NullPolicy::Throw);
        assert!(method.args.is_empty());
        assert!(method.mapper.is_none());
    }

    #[test]
    fn attribute_values_keep_declaration_order() {
        let yaml = r#"
path: tracing::instrument
values:
  skip_all: true
  level: debug
  name: get_user
"#;
        let attribute: AttributeDef = serde_yml::from_str(yaml).unwrap();
        let keys: Vec<&str> = attribute.values.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["skip_all", "level", "name"]);
    }

    #[test]
    fn kebab_case_null_policy() {
        let yaml = r#"
name: user
type: User
null-policy: return-null-or-empty
"#;
        let field: AggregateFieldDef = serde_yml::from_str(yaml).unwrap();
        assert_eq!(field.null_policy, Some(NullPolicy::ReturnNullOrEmpty));
    }

    #[test]
    fn merge_keeps_order_and_dedups_uses() {
        let mut first = DescriptorFile {
            uses: vec!["crate::entity::User".into()],
            ..Default::default()
        };
        let second = DescriptorFile {
            uses: vec!["crate::entity::User".into(), "crate::entity::Permission".into()],
            daos: vec![DaoDef { name: "UserDao".into(), comment: None, methods: vec![] }],
            ..Default::default()
        };
        first.merge(second);
        assert_eq!(first.uses, vec!["crate::entity::User", "crate::entity::Permission"]);
        assert_eq!(first.daos.len(), 1);
    }
}
