/* Analyze command - report shapes, wrapper identities and unpack plans */

use super::common::{load_descriptors, load_options};
use crate::codegen::{GeneratorOptions, MethodReport, RustCodeGenerator};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::identity::WrapperRequest;
use clap::ValueEnum;
use serde_derive::Serialize;
use sproc_types::DescriptorFile;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ReportFormat {
    Json,
    Yaml,
}

#[derive(Serialize, Debug, Clone)]
pub struct AnalysisReport {
    pub methods: Vec<MethodReport>,
    pub wrappers: Vec<WrapperRequest>,
    pub diagnostics: Vec<Diagnostic>,
}

/* Execute the analyze command */
pub fn run(
    files: Vec<PathBuf>,
    config: Option<PathBuf>,
    format: ReportFormat,
    verbose: bool,
) -> anyhow::Result<()> {
    if verbose {
        println!("Stored Procedure DAO Generator - Analysis Tool");
        println!("==============================================\n");
        println!("[~] Loading descriptor files...");
    }

    let options = load_options(config.as_deref(), None)?;
    let batch = load_descriptors(&files, verbose)?;

    if verbose {
        println!(
            "\n[~] Analyzing {} method(s) across {} DAO(s)\n",
            batch.method_count(),
            batch.daos.len()
        );
    }

    let report = analyze(&batch, options);
    println!("{}", render_report(&report, format)?);

    Ok(())
}

/* Run synthesis without writing anything and collect what was decided */
pub fn analyze(batch: &DescriptorFile, options: GeneratorOptions) -> AnalysisReport {
    let generator = RustCodeGenerator::new(options);
    let mut diagnostics = Diagnostics::new();
    let generation = generator.generate(batch, &mut diagnostics);

    AnalysisReport {
        methods: generation.methods,
        wrappers: generation.wrappers,
        diagnostics: diagnostics.into_vec(),
    }
}

pub fn render_report(report: &AnalysisReport, format: ReportFormat) -> anyhow::Result<String> {
    let text = match format {
        ReportFormat::Json => serde_json::to_string_pretty(report)?,
        ReportFormat::Yaml => serde_yml::to_string(report)?,
    };
    Ok(text)
}
