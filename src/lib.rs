//! # NESTML Frontend
//!
//! Front end for a modelling language describing spiking neurons and synapses.
//!
//! This library provides:
//! - A parser and printer for the line-oriented modelling language
//! - Per-model symbol tables with nested scopes and predefined built-ins
//! - Structural queries over analysed models (blocks, buffers, shapes, initial values)
//! - Rewriting of a model from the exact solution produced by an external ODE solver
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`dsl`] - Lexer, parser, AST and printer for the modelling language
//! - [`symbols`] - Symbol tables, predefined registry and the table builder
//! - [`model`] - Analysed neuron/synapse models, queries, mutation and validation
//! - [`transform`] - Solver output decoding and exact-solution rewriting
//! - [`diagnostics`] - Ordered sink for model findings
//! - [`config`] - Names of integrate/convolve built-ins and rewriting options
//!
//! ## Usage
//!
//! ### Native CLI
//!
//! ```bash
//! nestml iaf_psc_alpha.nestml --solver iaf_psc_alpha.json --print
//! ```
//!
//! ### Library
//!
//! ```no_run
//! use nestml_frontend::{Frontend, SolverOutput};
//!
//! # fn main() -> nestml_frontend::Result<()> {
//! let mut frontend = Frontend::new();
//! let mut models = frontend.load_file("iaf_psc_alpha.nestml".as_ref())?;
//! let output = SolverOutput::from_file("iaf_psc_alpha.json".as_ref())?;
//! frontend.apply_solver_output(&mut models[0], &output)?;
//! println!("{}", models[0].print());
//! # Ok(())
//! # }
//! ```
//!
//! ### WASM
//!
//! ```javascript
//! import { WasmModelFrontend } from 'nestml_frontend';
//!
//! const frontend = new WasmModelFrontend(source);
//! console.log(frontend.print_model("iaf_psc_alpha"));
//! ```
//!
//! ## Exact Solution Rewriting
//!
//! For a model whose ODEs have an analytic solution the solver returns
//! propagator matrix entries and update instructions. Rewriting then:
//!
//! 1. Adds the propagator entries to the internals block
//! 2. Adds the shape state variables and their initial values
//! 3. Replaces the integrate call with the update instructions
//! 4. Adds spike-buffer increments for each convolved shape
//! 5. Drops the equations block

pub mod config;
pub mod diagnostics;
pub mod dsl;
pub mod error;
pub mod model;
pub mod symbols;
pub mod transform;

mod frontend;

// Re-export main types for convenience
pub use config::FrontendConfig;
pub use diagnostics::{Diagnostic, Diagnostics, MessageCode, Severity};
pub use error::{FrontendError, Result};
pub use frontend::Frontend;
pub use model::{validate_model, NeuronOrSynapse};
pub use symbols::{PredefinedRegistry, SymbolTable};
pub use transform::{SolverOutput, Transformer};

// WASM bindings
#[cfg(feature = "wasm")]
mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::WasmModelFrontend;
