//! Symbol-table construction, for whole models and for inserted fragments.
//!
//! [`SymbolTableVisitor`] walks an AST subtree, stamps the owning scope onto
//! every node, and declares the symbols it finds. Declarations are tagged with
//! the block type on top of the visitor's context stack, which callers set
//! with [`SymbolTableVisitor::with_block_type`] before visiting a fragment.

use super::{
    BlockType, PredefinedRegistry, ScopeId, ScopeKind, Symbol, SymbolId, SymbolKind, SymbolTable,
};
use crate::diagnostics::{Diagnostics, MessageCode};
use crate::dsl::{
    Block, BlockWithVariables, Body, BodyElement, CompoundStmt, DataType, Declaration, EquationsBlock,
    EquationsItem, Expression, Function, FunctionCall, InputBlock, InputQualifier, OdeShape,
    SignalType, SmallStmtKind, Stmt, UpdateBlock, Variable,
};

pub struct SymbolTableVisitor<'a> {
    registry: &'a PredefinedRegistry,
    table: &'a mut SymbolTable,
    diagnostics: &'a mut Diagnostics,
    block_types: Vec<BlockType>,
}

impl<'a> SymbolTableVisitor<'a> {
    pub fn new(
        registry: &'a PredefinedRegistry,
        table: &'a mut SymbolTable,
        diagnostics: &'a mut Diagnostics,
    ) -> Self {
        Self {
            registry,
            table,
            diagnostics,
            block_types: Vec::new(),
        }
    }

    /// Run `f` with `block_type` pushed onto the context stack.
    pub fn with_block_type<T>(&mut self, block_type: BlockType, f: impl FnOnce(&mut Self) -> T) -> T {
        self.block_types.push(block_type);
        let result = f(self);
        self.block_types.pop();
        result
    }

    /// Block type new declarations are tagged with.
    pub fn current_block_type(&self) -> BlockType {
        self.block_types.last().copied().unwrap_or(BlockType::Local)
    }

    /// Build the complete symbol table of a model body and return its scope.
    pub fn visit_model(&mut self, body: &mut Body) -> ScopeId {
        let scope = self.table.new_scope(None, ScopeKind::Model);
        body.meta.scope = Some(scope);

        for var in self.registry.variables() {
            let symbol = Symbol {
                scope: Some(scope),
                ..var.clone()
            };
            self.declare(symbol);
        }

        for element in &mut body.elements {
            match element {
                BodyElement::Variables(block) => self.visit_block_with_variables(block, scope),
                BodyElement::Equations(block) => self.visit_equations_block(block, scope),
                BodyElement::Input(block) => self.visit_input_block(block, scope),
                BodyElement::Output(block) => block.meta.scope = Some(scope),
                BodyElement::Update(block) => self.visit_update_block(block, scope),
                BodyElement::Function(func) => self.visit_function(func, scope),
            }
        }

        self.attach_ode_definitions(body);
        self.check_references(body);
        log::debug!(
            "built symbol table with {} symbols in {} scopes",
            self.table.symbol_count(),
            self.table.scopes().count()
        );
        scope
    }

    pub fn visit_block_with_variables(&mut self, block: &mut BlockWithVariables, scope: ScopeId) {
        block.meta.scope = Some(scope);
        self.with_block_type(block.kind.into(), |v| {
            for decl in &mut block.declarations {
                v.visit_declaration(decl, scope);
            }
        });
    }

    /// Stamp `scope` onto `decl` and declare each of its variables.
    pub fn visit_declaration(&mut self, decl: &mut Declaration, scope: ScopeId) {
        decl.update_scope(scope);
        let block_type = self.current_block_type();
        for var in &decl.variables {
            let symbol = Symbol {
                is_function: decl.is_function,
                is_recordable: decl.is_recordable,
                vector_parameter: decl.size_parameter.clone(),
                declaring_expression: decl.expression.clone(),
                position: var.meta.position,
                scope: Some(scope),
                ..Symbol::variable(var.complete_name(), block_type, decl.data_type.clone())
            };
            self.declare(symbol);
        }
    }

    pub fn visit_equations_block(&mut self, block: &mut EquationsBlock, scope: ScopeId) {
        block.meta.scope = Some(scope);
        self.with_block_type(BlockType::Equation, |v| {
            for item in &mut block.declarations {
                match item {
                    EquationsItem::Shape(shape) => v.visit_shape(shape, scope),
                    EquationsItem::Equation(eq) => eq.update_scope(scope),
                    EquationsItem::Function(func) => {
                        func.meta.scope = Some(scope);
                        func.expression.update_scope(scope);
                        let symbol = Symbol {
                            is_function: true,
                            is_recordable: func.is_recordable,
                            declaring_expression: Some(func.expression.clone()),
                            position: func.meta.position,
                            scope: Some(scope),
                            ..Symbol::variable(
                                func.variable_name.clone(),
                                v.current_block_type(),
                                func.data_type.clone(),
                            )
                        };
                        v.declare(symbol);
                    }
                }
            }
        });
    }

    /// Stamp `scope` onto a shape and declare its variable.
    pub fn visit_shape(&mut self, shape: &mut OdeShape, scope: ScopeId) {
        shape.update_scope(scope);
        let symbol = Symbol {
            data_type: None,
            declaring_expression: Some(shape.rhs.clone()),
            position: shape.meta.position,
            scope: Some(scope),
            ..Symbol::variable(shape.lhs.complete_name(), self.current_block_type(), DataType::real())
        };
        self.declare(symbol);
    }

    pub fn visit_input_block(&mut self, block: &mut InputBlock, scope: ScopeId) {
        block.meta.scope = Some(scope);
        for port in &mut block.ports {
            port.meta.scope = Some(scope);
            let block_type = match port.signal {
                SignalType::Spike => BlockType::InputBufferSpike,
                SignalType::Current => BlockType::InputBufferCurrent,
            };
            let symbol = Symbol {
                data_type: port.data_type.clone(),
                vector_parameter: port.size_parameter.clone(),
                is_inhibitory: port.qualifiers.contains(&InputQualifier::Inhibitory),
                is_excitatory: port.qualifiers.contains(&InputQualifier::Excitatory),
                position: port.meta.position,
                scope: Some(scope),
                ..Symbol::variable(port.name.clone(), block_type, DataType::real())
            };
            self.declare(symbol);
        }
    }

    pub fn visit_update_block(&mut self, update: &mut UpdateBlock, parent: ScopeId) {
        let scope = self.table.new_scope(Some(parent), ScopeKind::Update);
        update.meta.scope = Some(scope);
        self.with_block_type(BlockType::Local, |v| v.visit_block(&mut update.block, scope));
    }

    pub fn visit_function(&mut self, func: &mut Function, parent: ScopeId) {
        let symbol = Symbol {
            position: func.meta.position,
            scope: Some(parent),
            ..Symbol::function(
                func.name.clone(),
                func.parameters.iter().map(|p| p.data_type.clone()).collect(),
                func.return_type.clone(),
            )
        };
        self.declare(symbol);

        let scope = self.table.new_scope(Some(parent), ScopeKind::Function);
        func.meta.scope = Some(scope);
        for param in &mut func.parameters {
            param.meta.scope = Some(scope);
            let symbol = Symbol {
                position: param.meta.position,
                scope: Some(scope),
                ..Symbol::variable(param.name.clone(), BlockType::Local, param.data_type.clone())
            };
            self.declare(symbol);
        }
        self.with_block_type(BlockType::Local, |v| v.visit_block(&mut func.block, scope));
    }

    /// Visit the statements of `block`, which lives in `scope`.
    pub fn visit_block(&mut self, block: &mut Block, scope: ScopeId) {
        block.meta.scope = Some(scope);
        for stmt in &mut block.stmts {
            self.visit_stmt(stmt, scope);
        }
    }

    /// Visit one statement whose enclosing block lives in `scope`.
    /// Nested blocks get fresh child scopes.
    pub fn visit_stmt(&mut self, stmt: &mut Stmt, scope: ScopeId) {
        match stmt {
            Stmt::Small(small) => {
                small.meta.scope = Some(scope);
                match &mut small.kind {
                    SmallStmtKind::Assignment(assignment) => assignment.update_scope(scope),
                    SmallStmtKind::Call(call) => stamp_call(call, scope),
                    SmallStmtKind::Declaration(decl) => self.visit_declaration(decl, scope),
                    SmallStmtKind::Return(expr) => {
                        if let Some(expr) = expr {
                            expr.update_scope(scope);
                        }
                    }
                }
            }
            Stmt::Compound(CompoundStmt::If(stmt)) => {
                stmt.meta.scope = Some(scope);
                stmt.if_clause.condition.update_scope(scope);
                self.visit_nested_block(&mut stmt.if_clause.block, scope);
                for clause in &mut stmt.elif_clauses {
                    clause.condition.update_scope(scope);
                    self.visit_nested_block(&mut clause.block, scope);
                }
                if let Some(block) = &mut stmt.else_block {
                    self.visit_nested_block(block, scope);
                }
            }
            Stmt::Compound(CompoundStmt::While(stmt)) => {
                stmt.meta.scope = Some(scope);
                stmt.condition.update_scope(scope);
                self.visit_nested_block(&mut stmt.block, scope);
            }
            Stmt::Compound(CompoundStmt::For(stmt)) => {
                stmt.meta.scope = Some(scope);
                stmt.start.update_scope(scope);
                stmt.end.update_scope(scope);
                self.visit_nested_block(&mut stmt.block, scope);
            }
        }
    }

    fn visit_nested_block(&mut self, block: &mut Block, parent: ScopeId) {
        let scope = self.table.new_scope(Some(parent), ScopeKind::Block);
        self.visit_block(block, scope);
    }

    /// Declare `symbol` in its scope, reporting redeclarations.
    ///
    /// Kernel symbols from the equations block and initial values of the same
    /// name may coexist; the initial value wins.
    fn declare(&mut self, symbol: Symbol) -> Option<SymbolId> {
        let scope = symbol.scope?;
        let Some(existing) = self.table.resolve_in_scope(scope, &symbol.name, None) else {
            return self.table.add_symbol(symbol).ok();
        };
        let existing_block = self.table.symbol(existing).map(|s| s.block_type);
        match (existing_block, symbol.block_type) {
            (Some(BlockType::Equation), BlockType::InitialValues) => {
                log::debug!("initial value '{}' shadows kernel symbol", symbol.name);
                self.table.replace_symbol(symbol)
            }
            (Some(BlockType::InitialValues), BlockType::Equation) => Some(existing),
            _ => {
                self.diagnostics.error(
                    MessageCode::VariableRedeclared,
                    format!("'{}' is already declared in this scope", symbol.name),
                    symbol.position,
                );
                None
            }
        }
    }

    /// Attach each ODE's right-hand side to the variable it differentiates.
    fn attach_ode_definitions(&mut self, body: &Body) {
        let equations = body.elements.iter().filter_map(|e| match e {
            BodyElement::Equations(block) => Some(block),
            _ => None,
        });
        for block in equations {
            for eq in block.ode_equations() {
                let Some(scope) = eq.meta.scope else { continue };
                let name = eq.lhs.lower_order_name();
                let found = self.table.resolve(scope, &name, Some(SymbolKind::Variable));
                match found.and_then(|id| self.table.symbol_mut(id)) {
                    Some(symbol) => symbol.ode_definition = Some(eq.rhs.clone()),
                    None => self.diagnostics.error(
                        MessageCode::CouldNotResolve,
                        format!("could not resolve '{}' defined by an ODE", name),
                        eq.meta.position,
                    ),
                }
            }
        }
    }

    /// Report every variable or function reference that does not resolve.
    pub fn check_references(&mut self, body: &Body) {
        let mut variables: Vec<&Variable> = body
            .expressions()
            .into_iter()
            .flat_map(|e| e.variables())
            .collect();
        variables.extend(body.assigned_variables());

        let mut calls: Vec<&FunctionCall> = Vec::new();
        for element in &body.elements {
            match element {
                BodyElement::Update(update) => calls.extend(update.block.calls()),
                BodyElement::Function(func) => calls.extend(func.block.calls()),
                BodyElement::Variables(block) => {
                    for decl in &block.declarations {
                        for expr in decl.expression.iter().chain(decl.invariant.iter()) {
                            calls.extend(expr.calls());
                        }
                    }
                }
                BodyElement::Equations(block) => {
                    for item in &block.declarations {
                        let expr = match item {
                            EquationsItem::Shape(shape) => &shape.rhs,
                            EquationsItem::Equation(eq) => &eq.rhs,
                            EquationsItem::Function(func) => &func.expression,
                        };
                        calls.extend(expr.calls());
                    }
                }
                BodyElement::Input(_) | BodyElement::Output(_) => {}
            }
        }

        for var in variables {
            if let Some(scope) = var.meta.scope {
                if !self.resolves_variable(scope, &var.complete_name()) {
                    self.diagnostics.error(
                        MessageCode::CouldNotResolve,
                        format!("could not resolve '{}'", var.complete_name()),
                        var.meta.position,
                    );
                }
            }
        }
        for call in calls {
            if let Some(scope) = call.meta.scope {
                if !self.resolves_function(scope, &call.name) {
                    self.diagnostics.error(
                        MessageCode::CouldNotResolve,
                        format!("could not resolve function '{}'", call.name),
                        call.meta.position,
                    );
                }
            }
        }
    }

    /// Names referenced by `expr` that resolve neither in its scope nor as built-ins.
    pub fn unresolved_names(&self, expr: &Expression) -> Vec<String> {
        unresolved_names(expr, self.table, self.registry)
    }

    fn resolves_variable(&self, scope: ScopeId, name: &str) -> bool {
        resolves_variable(self.table, self.registry, scope, name)
    }

    fn resolves_function(&self, scope: ScopeId, name: &str) -> bool {
        resolves_function(self.table, self.registry, scope, name)
    }
}

/// Names referenced by `expr` that resolve neither in their stamped scope nor
/// as built-ins. Unstamped references count as unresolved.
pub fn unresolved_names(
    expr: &Expression,
    table: &SymbolTable,
    registry: &PredefinedRegistry,
) -> Vec<String> {
    let mut missing = Vec::new();
    for var in expr.variables() {
        let name = var.complete_name();
        let resolved = var
            .meta
            .scope
            .is_some_and(|scope| resolves_variable(table, registry, scope, &name));
        if !resolved {
            missing.push(name);
        }
    }
    for call in expr.calls() {
        let resolved = call
            .meta
            .scope
            .is_some_and(|scope| resolves_function(table, registry, scope, &call.name));
        if !resolved {
            missing.push(call.name.clone());
        }
    }
    missing
}

fn resolves_variable(
    table: &SymbolTable,
    registry: &PredefinedRegistry,
    scope: ScopeId,
    name: &str,
) -> bool {
    table.resolve(scope, name, None).is_some()
        || registry.lookup_variable(name).is_some()
        || registry.lookup_type(name).is_some()
}

fn resolves_function(
    table: &SymbolTable,
    registry: &PredefinedRegistry,
    scope: ScopeId,
    name: &str,
) -> bool {
    table.resolve(scope, name, Some(SymbolKind::Function)).is_some()
        || registry.lookup_function(name).is_some()
}

fn stamp_call(call: &mut FunctionCall, scope: ScopeId) {
    call.meta.scope = Some(scope);
    for arg in &mut call.args {
        arg.update_scope(scope);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::{parse_declaration, parse_model, parse_statement};

    const MODEL: &str = r#"
neuron n:
  initial_values:
    V_m mV = E_L
    g_ex nS = 0 nS
    g_ex' nS/ms = e / tau_syn
  end
  equations:
    shape g_ex'' = -g_ex' / tau_syn
    function I_syn pA = convolve(g_ex, spikes) * (V_m - E_L)
    V_m' = -(V_m - E_L) / tau_m + I_syn / C_m
  end
  parameters:
    C_m pF = 250 pF
    tau_m ms = 10 ms
    tau_syn ms = 2 ms
    E_L mV = -70 mV
  end
  input:
    spikes[n_in] nS <- excitatory spike
    stim pA <- current
  end
  output: spike
  update:
    integrate_odes()
    if V_m > E_L:
      tmp mV = V_m
      V_m = tmp
    end
  end
  function clamp(x mV) mV:
    return x
  end
end
"#;

    fn build(source: &str) -> (crate::dsl::ModelAst, SymbolTable, Diagnostics, ScopeId) {
        let registry = PredefinedRegistry::new();
        let mut ast = parse_model(source).unwrap();
        let mut table = SymbolTable::new();
        let mut diags = Diagnostics::new();
        let scope = SymbolTableVisitor::new(&registry, &mut table, &mut diags).visit_model(&mut ast.body);
        (ast, table, diags, scope)
    }

    #[test]
    fn test_full_pass_classifies_symbols() {
        let (_, table, diags, scope) = build(MODEL);
        assert!(!diags.has_errors(), "{:?}", diags.iter().collect::<Vec<_>>());

        let v_m = table.resolve_symbol(scope, "V_m", None).unwrap();
        assert_eq!(v_m.block_type, BlockType::InitialValues);
        assert!(v_m.ode_definition.is_some());

        let g_prime = table.resolve_symbol(scope, "g_ex'", None).unwrap();
        assert_eq!(g_prime.block_type, BlockType::InitialValues);
        let kernel = table.resolve_symbol(scope, "g_ex''", None).unwrap();
        assert_eq!(kernel.block_type, BlockType::Equation);

        let i_syn = table.resolve_symbol(scope, "I_syn", None).unwrap();
        assert!(i_syn.is_function);
        assert_eq!(i_syn.block_type, BlockType::Equation);

        let spikes = table.resolve_symbol(scope, "spikes", None).unwrap();
        assert!(spikes.is_spike_buffer());
        assert!(spikes.is_excitatory);
        assert_eq!(spikes.vector_parameter.as_deref(), Some("n_in"));

        let clamp = table.resolve_symbol(scope, "clamp", Some(SymbolKind::Function)).unwrap();
        assert_eq!(clamp.parameter_types.len(), 1);

        let t = table.resolve_symbol(scope, "t", None).unwrap();
        assert!(t.is_predefined);
    }

    #[test]
    fn test_nested_blocks_get_child_scopes() {
        let (ast, table, _, model_scope) = build(MODEL);
        let update = ast
            .body
            .elements
            .iter()
            .find_map(|e| match e {
                BodyElement::Update(u) => Some(u),
                _ => None,
            })
            .unwrap();
        let update_scope = update.block.meta.scope.unwrap();
        assert_eq!(table.parent(update_scope), Some(model_scope));

        let Stmt::Compound(CompoundStmt::If(if_stmt)) = &update.block.stmts[1] else {
            panic!("expected if");
        };
        let inner = if_stmt.if_clause.block.meta.scope.unwrap();
        assert_eq!(table.parent(inner), Some(update_scope));
        let tmp = table.resolve_symbol(inner, "tmp", None).unwrap();
        assert_eq!(tmp.block_type, BlockType::Local);
        assert!(table.resolve(update_scope, "tmp", None).is_none());
    }

    #[test]
    fn test_unresolved_reference_is_reported() {
        let source = "neuron n:\n  state:\n    x mV = y\n  end\n  update:\n    foo()\n  end\nend\n";
        let (_, _, diags, _) = build(source);
        let messages: Vec<_> = diags
            .iter()
            .filter(|d| d.code == MessageCode::CouldNotResolve)
            .map(|d| d.message.clone())
            .collect();
        assert_eq!(messages, vec!["could not resolve 'y'", "could not resolve function 'foo'"]);
    }

    #[test]
    fn test_redeclaration_is_reported() {
        let source = "neuron n:\n  state:\n    x mV = 0 mV\n  end\n  parameters:\n    x real = 1\n  end\nend\n";
        let (_, _, diags, _) = build(source);
        assert!(diags.has_code(MessageCode::VariableRedeclared));
    }

    #[test]
    fn test_incremental_fragment_uses_context() {
        let (_, mut table, mut diags, scope) = build(MODEL);
        let registry = PredefinedRegistry::new();
        let mut visitor = SymbolTableVisitor::new(&registry, &mut table, &mut diags);

        let mut decl = parse_declaration("P11 real = exp(-1 / tau_m)").unwrap();
        visitor.with_block_type(BlockType::Internals, |v| v.visit_declaration(&mut decl, scope));
        assert_eq!(visitor.current_block_type(), BlockType::Local);
        assert!(visitor.unresolved_names(decl.expression.as_ref().unwrap()).is_empty());

        let mut stmt = parse_statement("V_m = P11 * missing").unwrap();
        visitor.visit_stmt(&mut stmt, scope);
        let Stmt::Small(small) = &stmt else { panic!() };
        let SmallStmtKind::Assignment(assignment) = &small.kind else { panic!() };
        assert_eq!(visitor.unresolved_names(&assignment.rhs), vec!["missing".to_string()]);

        let p11 = table.resolve_symbol(scope, "P11", None).unwrap();
        assert_eq!(p11.block_type, BlockType::Internals);
        assert_eq!(decl.scope(), Some(scope));
    }
}
