/* Common utilities shared between analyze and codegen commands */

use crate::codegen::GeneratorOptions;
use crate::diagnostics::{Diagnostics, Severity};
use anyhow::Context;
use sproc_types::{DescriptorFile, GeneratorConfig};
use std::path::{Path, PathBuf};

/* Read every descriptor file and concatenate them, in argument order, into one batch */
pub fn load_descriptors(files: &[PathBuf], verbose: bool) -> anyhow::Result<DescriptorFile> {
  let mut batch = DescriptorFile::default();

  for file in files {
    let text = std::fs::read_to_string(file)
      .with_context(|| format!("failed to read descriptor file {}", file.display()))?;
    let parsed: DescriptorFile = serde_yml::from_str(&text)
      .with_context(|| format!("failed to parse descriptor file {}", file.display()))?;

    if verbose {
      println!(
        "    - {} ({} DAO(s), {} method(s), {} aggregate(s), {} entity definition(s))",
        file.display(),
        parsed.daos.len(),
        parsed.method_count(),
        parsed.aggregates.len(),
        parsed.entities.len()
      );
    }
    tracing::debug!(file = %file.display(), methods = parsed.method_count(), "loaded descriptor file");

    batch.merge(parsed);
  }

  Ok(batch)
}

/* Load the config file if any, apply command-line overrides, validate once */
pub fn load_options(config_path: Option<&Path>, interceptor: Option<String>) -> anyhow::Result<GeneratorOptions> {
  let mut config = match config_path {
    Some(path) => {
      let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
      serde_yml::from_str::<GeneratorConfig>(&text)
        .with_context(|| format!("failed to parse config file {}", path.display()))?
    }
    None => GeneratorConfig::default(),
  };

  if let Some(interceptor) = interceptor {
    config.interceptor = Some(interceptor);
  }

  let options = GeneratorOptions::from_config(&config).context("invalid generator configuration")?;
  Ok(options)
}

pub fn print_diagnostics(diagnostics: &Diagnostics) {
  for diagnostic in diagnostics.iter() {
    match diagnostic.severity {
      Severity::Error => eprintln!("[✗] {}", diagnostic),
      Severity::Warning => eprintln!("[!] {}", diagnostic),
    }
  }
}
