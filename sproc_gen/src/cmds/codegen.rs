/* Codegen command - generate DAO code from descriptor files */

use super::common::{load_descriptors, load_options, print_diagnostics};
use crate::codegen::{Generation, RustCodeGenerator};
use crate::diagnostics::Diagnostics;
use anyhow::Context;
use std::path::{Path, PathBuf};

/* Execute the codegen command */
pub fn run(
  files: Vec<PathBuf>,
  output_dir: PathBuf,
  config: Option<PathBuf>,
  interceptor: Option<String>,
  verbose: bool,
) -> anyhow::Result<()> {
  if verbose {
    println!("Stored Procedure DAO Generator - Code Generation Tool");
    println!("=====================================================\n");
    println!("[~] Configuration:");
    println!("  Output directory: {}", output_dir.display());
    if let Some(config) = &config {
      println!("  Config file: {}", config.display());
    }
    println!("  Input files: {}", files.len());
    println!();
    println!("[~] Loading descriptor files...");
  }

  let options = load_options(config.as_deref(), interceptor)?;
  let batch = load_descriptors(&files, verbose)?;

  if verbose {
    println!("\n[~] Generator options:");
    println!("  Runtime crate: {}", options.runtime_crate());
    println!("  Interceptor: {}", options.interceptor().unwrap_or("none"));
    println!("  Aggregates: {}", options.emit_aggregates());
    println!("  Mappers: {}", options.emit_mappers());
    println!("\n[*] Synthesizing {} method(s)...", batch.method_count());
  }

  let generator = RustCodeGenerator::new(options);
  let mut diagnostics = Diagnostics::new();
  let generation = generator.generate(&batch, &mut diagnostics);

  let written = write_generation(&generation, &output_dir)?;
  if verbose {
    for path in &written {
      println!("[✓] Wrote {}", path.display());
    }
  }

  print_diagnostics(&diagnostics);

  println!(
    "[✓] Generated {} wrapper(s) for {} method(s) in {}",
    generation.wrappers.len(),
    generation.methods.len(),
    output_dir.display()
  );

  if diagnostics.has_errors() {
    anyhow::bail!(
      "{} descriptor(s) failed to generate, see diagnostics above",
      diagnostics.error_count()
    );
  }

  Ok(())
}

/* Write every generated file into `output_dir`, creating it if needed */
pub fn write_generation(generation: &Generation, output_dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
  std::fs::create_dir_all(output_dir)
    .with_context(|| format!("failed to create output directory {}", output_dir.display()))?;

  let mut written = Vec::with_capacity(generation.files.len());
  for file in &generation.files {
    let path = output_dir.join(&file.name);
    std::fs::write(&path, &file.contents).with_context(|| format!("failed to write {}", path.display()))?;
    written.push(path);
  }
  Ok(written)
}
