//! Scope arena and lexical resolution.
//!
//! All scopes and symbols of one model live in a [`SymbolTable`]. AST nodes
//! refer to their scope through a [`ScopeId`]; scopes refer to their parent,
//! so lexical lookup walks outward without any back-pointers in the tree.

use indexmap::IndexMap;
use serde::Serialize;

use super::{Symbol, SymbolId, SymbolKind};

/// Handle to a scope stored in a [`SymbolTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ScopeId(pub(crate) u32);

impl ScopeId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// What kind of AST construct owns a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScopeKind {
    /// Shared by the variable blocks, equations, input and output of a model
    Model,
    Update,
    Function,
    /// Body of an if/elif/else, while or for statement
    Block,
}

/// One lexical scope: insertion-ordered names mapped to symbols.
#[derive(Debug, Clone, Serialize)]
pub struct Scope {
    pub id: ScopeId,
    pub parent: Option<ScopeId>,
    pub kind: ScopeKind,
    symbols: IndexMap<String, SymbolId>,
}

impl Scope {
    /// Lookup a symbol by name within this scope only.
    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.symbols.get(name).copied()
    }

    pub fn symbol_ids(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.symbols.values().copied()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Arena owning every scope and symbol of one model.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new, empty scope.
    pub fn new_scope(&mut self, parent: Option<ScopeId>, kind: ScopeKind) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            id,
            parent,
            kind,
            symbols: IndexMap::new(),
        });
        id
    }

    pub fn scope(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id.index())
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.scope(id).and_then(|scope| scope.parent)
    }

    pub fn scopes(&self) -> impl Iterator<Item = &Scope> {
        self.scopes.iter()
    }

    pub fn symbol(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id.index())
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> Option<&mut Symbol> {
        self.symbols.get_mut(id.index())
    }

    /// Add `symbol` to its scope.
    ///
    /// Returns `Err(existing)` without inserting when the scope already
    /// binds the name, or when the symbol names no known scope.
    pub fn add_symbol(&mut self, symbol: Symbol) -> std::result::Result<SymbolId, Option<SymbolId>> {
        let scope_id = symbol.scope.ok_or(None)?;
        let id = SymbolId(self.symbols.len() as u32);
        let scope = self.scopes.get_mut(scope_id.index()).ok_or(None)?;
        if let Some(existing) = scope.lookup(&symbol.name) {
            return Err(Some(existing));
        }
        scope.symbols.insert(symbol.name.clone(), id);
        self.symbols.push(symbol);
        Ok(id)
    }

    /// Add `symbol`, rebinding its name if the scope already has one.
    /// The displaced symbol stays in the arena but is no longer reachable by name.
    pub fn replace_symbol(&mut self, symbol: Symbol) -> Option<SymbolId> {
        let scope_id = symbol.scope?;
        let id = SymbolId(self.symbols.len() as u32);
        let scope = self.scopes.get_mut(scope_id.index())?;
        scope.symbols.insert(symbol.name.clone(), id);
        self.symbols.push(symbol);
        Some(id)
    }

    /// Resolve `name` in `scope` only, optionally restricted to one kind.
    pub fn resolve_in_scope(
        &self,
        scope: ScopeId,
        name: &str,
        kind: Option<SymbolKind>,
    ) -> Option<SymbolId> {
        let id = self.scope(scope)?.lookup(name)?;
        match kind {
            Some(kind) if self.symbol(id)?.kind != kind => None,
            _ => Some(id),
        }
    }

    /// Resolve `name` starting at `scope` and walking outward.
    pub fn resolve(&self, scope: ScopeId, name: &str, kind: Option<SymbolKind>) -> Option<SymbolId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(found) = self.resolve_in_scope(id, name, kind) {
                return Some(found);
            }
            current = self.parent(id);
        }
        None
    }

    pub fn resolve_symbol(&self, scope: ScopeId, name: &str, kind: Option<SymbolKind>) -> Option<&Symbol> {
        self.resolve(scope, name, kind).and_then(|id| self.symbol(id))
    }

    /// Symbols bound in `scope` itself, in insertion order.
    pub fn symbols_in_scope(&self, scope: ScopeId) -> impl Iterator<Item = &Symbol> + '_ {
        self.scope(scope)
            .into_iter()
            .flat_map(|s| s.symbol_ids())
            .filter_map(|id| self.symbol(id))
    }

    /// Number of symbols ever added, including displaced ones.
    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::DataType;
    use crate::symbols::BlockType;

    fn var_in(scope: ScopeId, name: &str) -> Symbol {
        Symbol {
            scope: Some(scope),
            ..Symbol::variable(name, BlockType::Local, DataType::real())
        }
    }

    #[test]
    fn test_resolve_walks_outward() {
        let mut table = SymbolTable::new();
        let model = table.new_scope(None, ScopeKind::Model);
        let update = table.new_scope(Some(model), ScopeKind::Update);
        let nested = table.new_scope(Some(update), ScopeKind::Block);

        let v_m = table.add_symbol(var_in(model, "V_m")).unwrap();
        let tmp = table.add_symbol(var_in(update, "tmp")).unwrap();

        assert_eq!(table.resolve(nested, "V_m", None), Some(v_m));
        assert_eq!(table.resolve(nested, "tmp", Some(SymbolKind::Variable)), Some(tmp));
        assert_eq!(table.resolve(model, "tmp", None), None);
        assert_eq!(table.resolve(nested, "V_m", Some(SymbolKind::Function)), None);
    }

    #[test]
    fn test_resolution_is_stable() {
        let mut table = SymbolTable::new();
        let model = table.new_scope(None, ScopeKind::Model);
        table.add_symbol(var_in(model, "a")).unwrap();
        let first = table.resolve(model, "a", None);
        let second = table.resolve(model, "a", None);
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn test_duplicate_and_replace() {
        let mut table = SymbolTable::new();
        let model = table.new_scope(None, ScopeKind::Model);
        let first = table.add_symbol(var_in(model, "g")).unwrap();
        assert_eq!(table.add_symbol(var_in(model, "g")), Err(Some(first)));

        let second = table.replace_symbol(var_in(model, "g")).unwrap();
        assert_ne!(first, second);
        assert_eq!(table.resolve(model, "g", None), Some(second));
        assert_eq!(table.symbols_in_scope(model).count(), 1);
        assert_eq!(table.symbol_count(), 2);
    }

    #[test]
    fn test_insertion_order() {
        let mut table = SymbolTable::new();
        let model = table.new_scope(None, ScopeKind::Model);
        for name in ["z", "a", "m"] {
            table.add_symbol(var_in(model, name)).unwrap();
        }
        let names: Vec<_> = table.symbols_in_scope(model).map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["z", "a", "m"]);
    }
}
