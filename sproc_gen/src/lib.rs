/* Stored-procedure DAO generator
 *
 * Turns YAML descriptors of data-access methods into Rust source: call
 * wrappers per distinct procedure identity, DAO traits with their
 * implementations, row mappers and multi-result aggregates.
 */

pub mod annotation;
pub mod cmds;
pub mod codegen;
pub mod diagnostics;
pub mod identity;
pub mod model;
pub mod naming;
pub mod shape;
pub mod sql_types;
pub mod synth;

pub use codegen::rust::{GeneratedFile, Generation, GeneratorOptions, RustCodeGenerator};
pub use diagnostics::{Diagnostic, DiagnosticSink, Diagnostics, Severity};
