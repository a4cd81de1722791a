//! Solver-driven model rewriting.
//!
//! - [`SolverOutput`]: the JSON answer of an external ODE solver
//! - [`Transformer`]: inserts propagators, kernel initial values and spike
//!   updates, and replaces the integrate call by explicit update statements

mod solver_output;
mod transformer;

pub use solver_output::{compute_shape_state_variables_with_initial_values, SolverOutput};
pub use transformer::Transformer;
