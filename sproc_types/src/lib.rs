//! Stored-Procedure Descriptor Definitions
//!
//! This crate contains the serde model of the YAML descriptor files consumed
//! by the generator, plus the generator's own config file. It provides pure
//! data structures without any validation, file I/O or code generation logic.

pub mod config;
pub mod descriptor;

// Re-export commonly used types at the crate root
pub use config::*;
pub use descriptor::*;
