//! Semantic information attached to parsed models.
//!
//! - [`SymbolTable`]: arena of scopes and symbols owned by one model
//! - [`PredefinedRegistry`]: built-in types, units, functions and variables
//! - [`SymbolTableVisitor`]: full and incremental symbol-table construction
//! - [`infer_type`]: coarse expression typing used by validation

mod predefined;
mod scope;
mod symbol;
mod typing;
mod visitor;

pub use predefined::PredefinedRegistry;
pub use scope::{Scope, ScopeId, ScopeKind, SymbolTable};
pub use symbol::{BlockType, Symbol, SymbolId, SymbolKind};
pub use typing::{infer_type, ExprType};
pub use visitor::{unresolved_names, SymbolTableVisitor};
