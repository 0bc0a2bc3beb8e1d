use thiserror::Error;

/// An error raised by any stage of the compilation pipeline.
///
/// The numeric exit codes are part of the compiler's contract: the process
/// exits with `exit_code()` and test harnesses match on it. `Undef` and
/// `Redef` are distinct variants that share exit code 3.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("scanner: error{row}:{column}: {message}")]
    Lex { row: u32, column: u32, message: String },

    #[error("parser: error{row}:{column}: {message}")]
    Syntax { row: u32, column: u32, message: String },

    #[error("parser: error{row}:{column}: {message}")]
    Undef { row: u32, column: u32, message: String },

    #[error("parser: error{row}:{column}: {message}")]
    Redef { row: u32, column: u32, message: String },

    #[error("parser: error{row}:{column}: {message}")]
    Assign { row: u32, column: u32, message: String },

    #[error("parser: error{row}:{column}: {message}")]
    TypeCall { row: u32, column: u32, message: String },

    #[error("parser: error{row}:{column}: {message}")]
    TypeExpr { row: u32, column: u32, message: String },

    #[error("parser: error{row}:{column}: {message}")]
    Semantic { row: u32, column: u32, message: String },

    #[error("parser: error{row}:{column}: {message}")]
    NilUsage { row: u32, column: u32, message: String },

    #[error("parser: error{row}:{column}: {message}")]
    ZeroDiv { row: u32, column: u32, message: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl CompileError {
    /// Process exit code for this diagnostic class.
    pub fn exit_code(&self) -> u8 {
        match self {
            CompileError::Lex { .. } => 1,
            CompileError::Syntax { .. } => 2,
            CompileError::Undef { .. } | CompileError::Redef { .. } => 3,
            CompileError::Assign { .. } => 4,
            CompileError::TypeCall { .. } => 5,
            CompileError::TypeExpr { .. } => 6,
            CompileError::Semantic { .. } => 7,
            CompileError::NilUsage { .. } => 8,
            CompileError::ZeroDiv { .. } => 9,
            CompileError::Internal(_) => 99,
        }
    }
}
