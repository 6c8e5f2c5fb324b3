use thiserror::Error;

/// Conditions that stop a compilation before the three error tallies.
///
/// Semantic and type problems are never reported through this type; they
/// are recorded as diagnostics and counted.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to read source: {0}")]
    SourceIo(#[from] std::io::Error),
    #[error("{source_name}:{line}:{column}: {message}")]
    Recognition {
        source_name: String,
        line: usize,
        column: usize,
        message: String,
        /// Rendered lexical errors found before the failure.
        lexical: Vec<String>,
    },
    #[error("internal generation failure: {0}")]
    InternalGeneration(#[from] GenerationError),
}

impl CoreError {
    /// Recognition failures are compile errors; everything else is unexpected.
    pub fn is_recognition(&self) -> bool {
        matches!(self, CoreError::Recognition { .. })
    }

    /// Diagnostics that accompany the failure, in source order.
    pub fn notes(&self) -> &[String] {
        match self {
            CoreError::Recognition { lexical, .. } => lexical.as_slice(),
            _ => &[],
        }
    }
}

/// Structural failure while generating the machine model from a syntax
/// tree that the grammar should never have produced.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("syntax tree contains an empty identifier at byte {0}")]
    EmptyIdentifier(u32),
    #[error("scope stack underflow")]
    ScopeUnderflow,
}
