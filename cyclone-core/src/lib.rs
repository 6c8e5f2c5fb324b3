//! Semantic front end for the Cyclone state-machine language.
//!
//! The pipeline is roughly:
//!
//!   source .cyc
//!     -> lexer      (tokens, recovered syntax errors)
//!     -> parser     (syntax tree or recognition failure)
//!     -> generate   (machine model, threading the resolution context)
//!     -> compiler   (syntax / semantic / type tallies and the verdict)
//!
//! Higher-level tools (the CLI, tests) should depend on this crate rather
//! than reimplementing the pipeline.

// ---------------------------------------------------------------------
// Error handling and diagnostics
// ---------------------------------------------------------------------

pub mod span;
pub mod diagnostic;
pub mod error;

// ---------------------------------------------------------------------
// Front-end: lexing and parsing
// ---------------------------------------------------------------------

pub mod lexer;
pub mod parser;
pub mod ast;

// ---------------------------------------------------------------------
// Semantic layers: types, resolution, type checking, machine model
// ---------------------------------------------------------------------

pub mod types;
pub mod context;
pub mod typecheck;
pub mod model;
pub mod generate;

// ---------------------------------------------------------------------
// Driver and source discovery
// ---------------------------------------------------------------------

pub mod compiler;
pub mod sources;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use compiler::{Compilation, CompileOptions, Outcome, compile, compile_reader};
pub use error::{CoreError, GenerationError};
