use serde_derive::{Deserialize, Serialize};

/* Crate the generated code links against unless configured otherwise */
pub const DEFAULT_RUNTIME_CRATE: &str = "sproc_runtime";

fn default_runtime_crate() -> String {
    DEFAULT_RUNTIME_CRATE.to_string()
}

fn default_true() -> bool {
    true
}

/* Generator config file (`sproc.yaml`) */
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct GeneratorConfig {
    /* Path of a type implementing the runtime `Interceptor` trait */
    #[serde(default)]
    pub interceptor: Option<String>,
    #[serde(default = "default_runtime_crate")]
    pub runtime_crate: String,
    #[serde(default = "default_true")]
    pub emit_aggregates: bool,
    #[serde(default = "default_true")]
    pub emit_mappers: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            interceptor: None,
            runtime_crate: default_runtime_crate(),
            emit_aggregates: true,
            emit_mappers: true,
        }
    }
}
