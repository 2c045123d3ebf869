use clap::{Parser, Subcommand};
use sproc_gen::cmds;
use sproc_gen::cmds::analyze::ReportFormat;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "sproc-gen")]
#[command(about = "Stored-procedure DAO code generator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /* Generate DAO, wrapper, mapper and aggregate code from descriptors */
    Codegen {
        /* Input YAML files containing DAO descriptors */
        #[arg(short = 'f', long = "files", value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /* Output directory for generated code */
        #[arg(
            short = 'o',
            long = "output",
            value_name = "DIR",
            default_value = "generated"
        )]
        output_dir: PathBuf,

        /* Generator config file */
        #[arg(short = 'c', long = "config", value_name = "CONFIG")]
        config: Option<PathBuf>,

        /* Interceptor type path, overrides the config file */
        #[arg(long = "interceptor", value_name = "PATH")]
        interceptor: Option<String>,

        /* Enable verbose output */
        #[arg(short = 'v', long = "verbose")]
        verbose: bool,
    },

    /* Show classified shapes, wrapper identities and unpack plans */
    Analyze {
        /* Input YAML files containing DAO descriptors */
        #[arg(short = 'f', long = "files", value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /* Generator config file */
        #[arg(short = 'c', long = "config", value_name = "CONFIG")]
        config: Option<PathBuf>,

        /* Report format */
        #[arg(long = "format", value_enum, default_value = "json")]
        format: ReportFormat,

        /* Enable verbose output */
        #[arg(short = 'v', long = "verbose")]
        verbose: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Codegen {
            files,
            output_dir,
            config,
            interceptor,
            verbose,
        } => {
            cmds::codegen::run(files, output_dir, config, interceptor, verbose)?;
        }

        Commands::Analyze {
            files,
            config,
            format,
            verbose,
        } => {
            cmds::analyze::run(files, config, format, verbose)?;
        }
    }

    Ok(())
}
