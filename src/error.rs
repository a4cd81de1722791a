//! Error types for the NESTML front end.
//!
//! This module provides a unified error type [`FrontendError`] that covers
//! all error conditions that can occur during parsing, semantic analysis,
//! validation and solver-driven transformation of a model.

use thiserror::Error;

/// Result type alias using [`FrontendError`].
pub type Result<T> = std::result::Result<T, FrontendError>;

/// Unified error type for all front-end operations.
#[derive(Error, Debug)]
pub enum FrontendError {
    // ============ Parsing Errors ============
    /// Error during lexical analysis
    #[error("Lexer error at line {line}, column {column}: {message}")]
    LexerError {
        line: usize,
        column: usize,
        message: String,
    },

    /// Error during parsing
    #[error("Parse error at line {line}, column {column}: {message}")]
    ParseError {
        line: usize,
        column: usize,
        message: String,
    },

    // ============ Semantic Errors ============
    /// A declared name could not be found in the scope it was declared in.
    /// This is an internal-consistency failure of the symbol-table pass.
    #[error("Symbol '{name}' not resolvable in {context}")]
    UnresolvedSymbol { name: String, context: String },

    /// More blocks of one kind than the model language allows
    #[error("Model '{model}' has {count} {block} blocks, at most one is allowed")]
    TooManyBlocks {
        model: String,
        block: &'static str,
        count: usize,
    },

    /// An operation required a block the model does not have
    #[error("Model '{model}' has no {block} block")]
    MissingBlock { model: String, block: &'static str },

    /// The symbol table has not been built for this model yet
    #[error("Model '{model}' has no symbol table, run the symbol-table pass first")]
    MissingScope { model: String },

    /// Validation reported error-level diagnostics
    #[error("Model '{model}' failed validation with {errors} error(s)")]
    InvalidModel { model: String, errors: usize },

    // ============ Transformation Errors ============
    /// Text synthesized by a transformation was rejected by the parser
    #[error("Synthesized text '{text}' failed to parse: {source}")]
    SynthesizedParse {
        text: String,
        #[source]
        source: Box<FrontendError>,
    },

    /// A synthesized fragment parsed but its names did not resolve afterwards
    #[error("Synthesized text '{text}' parsed but '{name}' did not resolve")]
    SynthesizedResolve { text: String, name: String },

    /// The solver output bundle is malformed
    #[error("Invalid solver output: {message}")]
    InvalidSolverOutput { message: String },

    // ============ I/O Errors ============
    /// Error reading a model or solver output file
    #[error("Failed to read file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Error decoding a solver output document
    #[error("Failed to decode solver output: {0}")]
    SolverOutputDecode(#[from] serde_json::Error),

    // ============ WASM Errors ============
    /// WASM-specific error
    #[cfg(feature = "wasm")]
    #[error("WASM error: {message}")]
    WasmError { message: String },
}

impl FrontendError {
    /// Create a lexer error
    pub fn lexer(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::LexerError {
            line,
            column,
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::ParseError {
            line,
            column,
            message: message.into(),
        }
    }

    /// Create an unresolved-symbol error
    pub fn unresolved(name: impl Into<String>, context: impl Into<String>) -> Self {
        Self::UnresolvedSymbol {
            name: name.into(),
            context: context.into(),
        }
    }

    /// Create a missing-block error
    pub fn missing_block(model: impl Into<String>, block: &'static str) -> Self {
        Self::MissingBlock {
            model: model.into(),
            block,
        }
    }

    /// Wrap a parser failure on generated text
    pub fn synthesized_parse(text: impl Into<String>, source: FrontendError) -> Self {
        Self::SynthesizedParse {
            text: text.into(),
            source: Box::new(source),
        }
    }

    /// Create a solver output error
    pub fn solver_output(message: impl Into<String>) -> Self {
        Self::InvalidSolverOutput {
            message: message.into(),
        }
    }
}
