//! Parser and printer for the neuron/synapse modelling language.
//!
//! The language is line-oriented: every declaration and statement ends at a
//! newline (newlines inside parentheses are ignored, a trailing `\` continues
//! a line) and blocks are closed with `end`.
//!
//! # Grammar Overview
//!
//! ```text
//! model       = ("neuron" | "synapse") NAME ":" NL { body_element } "end"
//! body_element= var_block | equations | input | output | update | function
//! var_block   = ("state" | "parameters" | "internals" | "initial_values") ":" NL
//!               { declaration NL } "end"
//! declaration = ["recordable"] ["function"] variable { "," variable } data_type
//!               ["[" size "]"] ["=" expr] ["[[" expr "]]"]
//! equations   = "equations" ":" NL { (shape | ode | ode_function) NL } "end"
//! shape       = "shape" variable "=" expr
//! ode         = NAME "'"+ "=" expr
//! input       = "input" ":" NL { NAME ["[" NAME "]"] [data_type] "<-"
//!               { "inhibitory" | "excitatory" } ("spike" | "current") NL } "end"
//! output      = "output" ":" ("spike" | "current")
//! update      = "update" ":" NL block "end"
//! function    = "function" NAME "(" [NAME data_type {"," NAME data_type}] ")"
//!               [data_type] ":" NL block "end"
//! stmt        = if | while | for | declaration | assignment | call | "return" [expr]
//! data_type   = unit_factor { ("*" | "/") unit_factor }
//! unit_factor = (NAME | INT | "(" data_type ")") ["**" ["-"] INT]
//! variable    = NAME { "'" }
//! ```
//!
//! Expression precedence, loosest first: `?:`, `or`, `and`, `not`,
//! comparisons, `+ -`, `* / %`, unary `+ - ~`, `**` (right-associative).
//! A number directly followed by a name is a literal with a unit (`10 mV`).
//!
//! # Example
//!
//! ```text
//! neuron iaf_cond:
//!   initial_values:
//!     V_m mV = E_L
//!   end
//!   equations:
//!     shape g_ex = (e/tau_syn) * t * exp(-t/tau_syn)
//!     V_m' = -(V_m - E_L) / tau_m
//!   end
//!   parameters:
//!     tau_m ms = 10 ms [[tau_m > 0 ms]]
//!     E_L mV = -70 mV
//!   end
//!   input:
//!     spikes nS <- spike
//!   end
//!   output: spike
//!   update:
//!     integrate_odes()
//!   end
//! end
//! ```

mod ast;
mod lexer;
mod parser;
mod printer;

pub use ast::*;
pub use lexer::{is_reserved, Lexer, Token, TokenKind};
pub use parser::Parser;
pub use printer::ModelPrinter;

use crate::error::Result;

/// Parse a source text holding exactly one model.
pub fn parse_model(input: &str) -> Result<ModelAst> {
    let mut parser = Parser::new(input)?;
    let model = parser.parse_model()?;
    parser.expect_eof()?;
    Ok(model)
}

/// Parse a source text holding any number of models.
pub fn parse_models(input: &str) -> Result<Vec<ModelAst>> {
    Parser::new(input)?.parse_models()
}

pub fn parse_expression(input: &str) -> Result<Expression> {
    let mut parser = Parser::new(input)?;
    let expr = parser.parse_expression()?;
    parser.expect_eof()?;
    Ok(expr)
}

pub fn parse_declaration(input: &str) -> Result<Declaration> {
    let mut parser = Parser::new(input)?;
    let decl = parser.parse_declaration()?;
    parser.expect_eof()?;
    Ok(decl)
}

/// Parse a single statement, simple or compound.
pub fn parse_statement(input: &str) -> Result<Stmt> {
    let mut parser = Parser::new(input)?;
    let stmt = parser.parse_stmt()?;
    parser.expect_eof()?;
    Ok(stmt)
}

/// Parse a sequence of statements.
pub fn parse_statements(input: &str) -> Result<Vec<Stmt>> {
    let mut parser = Parser::new(input)?;
    let mut stmts = Vec::new();
    loop {
        if parser.expect_eof().is_ok() {
            return Ok(stmts);
        }
        stmts.push(parser.parse_stmt()?);
    }
}

pub fn parse_assignment(input: &str) -> Result<Assignment> {
    let mut parser = Parser::new(input)?;
    let assignment = parser.parse_assignment()?;
    parser.expect_eof()?;
    Ok(assignment)
}

pub fn parse_shape(input: &str) -> Result<OdeShape> {
    let mut parser = Parser::new(input)?;
    let shape = parser.parse_shape()?;
    parser.expect_eof()?;
    Ok(shape)
}

/// Parse a model file.
pub fn parse_file(path: &std::path::Path) -> Result<Vec<ModelAst>> {
    let content =
        std::fs::read_to_string(path).map_err(|e| crate::error::FrontendError::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;
    parse_models(&content)
}
