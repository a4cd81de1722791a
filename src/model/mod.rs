//! Analysed models and their validation.
//!
//! A [`NeuronOrSynapse`] owns the AST body of one model together with its
//! symbol table. Queries scan the body on demand; mutations insert into the
//! body and run the symbol-table visitor over the inserted fragment only.

mod neuron;
mod shape_names;
mod validate;

pub use neuron::NeuronOrSynapse;
pub use shape_names::{
    canonical_shape_name, is_shape_state_variable, strip_convolution_suffix, CONVOLUTION_MARKER,
    DOLLAR_MARKER,
};
pub use validate::validate_model;
