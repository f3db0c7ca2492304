//! SDL – component instantiation and method dispatch for the System Design Language
//!
//! This crate implements the core of the SDL interpreter:
//! - A component registry populated once, then frozen and shared as a snapshot
//! - Lexically scoped environments binding instances and results
//! - Instance declarations threading literal overrides into host constructors
//! - One call syntax for host components and DSL-declared components
//! - Lifting of host outcome distributions into result trees

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Default host components (Disk, Cache)
pub mod components;
/// Parser and evaluator
pub mod interpreter;
/// Weighted outcome distributions
pub mod outcome;
/// Registry, errors and configuration
pub mod runtime;

// Re-export key types for convenience
pub use interpreter::{Environment, Interpreter, ResultNode, Value};
pub use runtime::{ComponentCatalog, InterpreterConfig};

/// Current version of the SDL crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
