pub mod rust;
pub mod rust_gen;

pub use rust::{ConfigError, GeneratedFile, Generation, GeneratorOptions, MethodReport, RustCodeGenerator};
