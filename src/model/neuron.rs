//! The neuron/synapse aggregate.

use super::shape_names::{canonical_shape_name, strip_convolution_suffix};
use crate::diagnostics::Diagnostics;
use crate::dsl::{
    Block, BlockKind, BlockWithVariables, Body, BodyElement, Declaration, EquationsBlock,
    EquationsItem, Expression, Function, InputBlock, ModelAst, ModelKind, ModelPrinter, NodeMeta,
    OdeEquation, OdeShape, OutputBlock, Stmt, StmtPath, UpdateBlock,
};
use crate::error::{FrontendError, Result};
use crate::symbols::{
    unresolved_names, BlockType, PredefinedRegistry, ScopeId, Symbol, SymbolTable,
    SymbolTableVisitor,
};

/// A model after semantic analysis.
///
/// Owns the AST body together with the symbol table built from it. Block
/// accessors scan the body on every call; nothing is cached, so the views
/// stay correct across mutations.
#[derive(Debug, Clone)]
pub struct NeuronOrSynapse {
    /// Whether this is a neuron or a synapse
    pub kind: ModelKind,

    /// Model name as written after `neuron` / `synapse`
    pub name: String,

    /// Ordered blocks of the model
    pub body: Body,

    /// File or artifact the model was read from
    pub artifact_name: String,

    /// Position of the model header and the model scope
    pub meta: NodeMeta,

    /// Scopes and symbols of this model
    symbols: SymbolTable,

    /// Model scope, set by [`NeuronOrSynapse::build_symbols`]
    scope: Option<ScopeId>,
}

impl NeuronOrSynapse {
    /// Wrap a parsed model. The symbol table stays empty until
    /// [`NeuronOrSynapse::build_symbols`] runs.
    pub fn from_ast(ast: ModelAst, artifact_name: impl Into<String>) -> Self {
        Self {
            kind: ast.kind,
            name: ast.name,
            body: ast.body,
            artifact_name: artifact_name.into(),
            meta: ast.meta,
            symbols: SymbolTable::new(),
            scope: None,
        }
    }

    /// Parse-tree wrap plus full symbol-table pass.
    pub fn analyse(
        ast: ModelAst,
        artifact_name: impl Into<String>,
        registry: &PredefinedRegistry,
        diagnostics: &mut Diagnostics,
    ) -> Self {
        let mut model = Self::from_ast(ast, artifact_name);
        model.build_symbols(registry, diagnostics);
        model
    }

    /// (Re)build the whole symbol table from the body.
    pub fn build_symbols(&mut self, registry: &PredefinedRegistry, diagnostics: &mut Diagnostics) {
        diagnostics.set_current_model(Some(&self.name));
        self.symbols = SymbolTable::new();
        let mut visitor = SymbolTableVisitor::new(registry, &mut self.symbols, diagnostics);
        self.scope = Some(visitor.visit_model(&mut self.body));
        log::debug!("analysed {} '{}'", self.kind.keyword(), self.name);
    }

    /// Scope shared by the model-level blocks.
    pub fn scope(&self) -> Result<ScopeId> {
        self.scope.ok_or_else(|| FrontendError::MissingScope {
            model: self.name.clone(),
        })
    }

    /// Symbol table built by the last symbol-table pass.
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Resolve `name` in the model scope.
    pub fn resolve(&self, name: &str) -> Option<&Symbol> {
        self.symbols.resolve_symbol(self.scope?, name, None)
    }

    /// Names in `expr` that resolve neither in their scope nor as built-ins.
    pub fn unresolved_names(&self, expr: &Expression, registry: &PredefinedRegistry) -> Vec<String> {
        unresolved_names(expr, &self.symbols, registry)
    }

    /// Render the model back to source form.
    pub fn print(&self) -> String {
        ModelPrinter::new().print_model(self.kind, &self.name, &self.body)
    }

    // ============ Block accessors ============

    /// Blocks holding declarations of `kind`, in body order.
    pub fn get_variable_blocks(&self, kind: BlockKind) -> Vec<&BlockWithVariables> {
        variable_blocks(&self.body, kind).collect()
    }

    /// The unique block of `kind`, `None` when absent.
    pub fn get_variable_block(&self, kind: BlockKind) -> Result<Option<&BlockWithVariables>> {
        self.single(self.get_variable_blocks(kind), kind.keyword())
    }

    /// `state` blocks in body order.
    pub fn get_state_blocks(&self) -> Vec<&BlockWithVariables> {
        self.get_variable_blocks(BlockKind::State)
    }

    /// The `state` block, if any.
    pub fn get_state_block(&self) -> Result<Option<&BlockWithVariables>> {
        self.get_variable_block(BlockKind::State)
    }

    /// `parameters` blocks in body order.
    pub fn get_parameter_blocks(&self) -> Vec<&BlockWithVariables> {
        self.get_variable_blocks(BlockKind::Parameters)
    }

    /// The `parameters` block, `TooManyBlocks` if there are several.
    pub fn get_parameter_block(&self) -> Result<Option<&BlockWithVariables>> {
        self.get_variable_block(BlockKind::Parameters)
    }

    /// `internals` blocks in body order.
    pub fn get_internals_blocks(&self) -> Vec<&BlockWithVariables> {
        self.get_variable_blocks(BlockKind::Internals)
    }

    /// The `internals` block, if any.
    pub fn get_internals_block(&self) -> Result<Option<&BlockWithVariables>> {
        self.get_variable_block(BlockKind::Internals)
    }

    /// `initial_values` blocks in body order.
    pub fn get_initial_values_blocks(&self) -> Vec<&BlockWithVariables> {
        self.get_variable_blocks(BlockKind::InitialValues)
    }

    /// The `initial_values` block, if any.
    pub fn get_initial_values_block(&self) -> Result<Option<&BlockWithVariables>> {
        self.get_variable_block(BlockKind::InitialValues)
    }

    /// `equations` blocks in body order.
    pub fn get_equations_blocks(&self) -> Vec<&EquationsBlock> {
        equations_blocks(&self.body).collect()
    }

    /// The `equations` block, `None` when absent and `TooManyBlocks` when repeated.
    pub fn get_equations_block(&self) -> Result<Option<&EquationsBlock>> {
        self.single(self.get_equations_blocks(), "equations")
    }

    /// `update` blocks in body order.
    pub fn get_update_blocks(&self) -> Vec<&UpdateBlock> {
        self.body
            .elements
            .iter()
            .filter_map(|e| match e {
                BodyElement::Update(block) => Some(block),
                _ => None,
            })
            .collect()
    }

    /// The `update` block, if any.
    pub fn get_update_block(&self) -> Result<Option<&UpdateBlock>> {
        self.single(self.get_update_blocks(), "update")
    }

    /// `input` blocks in body order.
    pub fn get_input_blocks(&self) -> Vec<&InputBlock> {
        self.body
            .elements
            .iter()
            .filter_map(|e| match e {
                BodyElement::Input(block) => Some(block),
                _ => None,
            })
            .collect()
    }

    /// `output` declarations in body order.
    pub fn get_output_blocks(&self) -> Vec<&OutputBlock> {
        self.body
            .elements
            .iter()
            .filter_map(|e| match e {
                BodyElement::Output(block) => Some(block),
                _ => None,
            })
            .collect()
    }

    /// User-defined functions.
    pub fn get_functions(&self) -> Vec<&Function> {
        self.body
            .elements
            .iter()
            .filter_map(|e| match e {
                BodyElement::Function(func) => Some(func),
                _ => None,
            })
            .collect()
    }

    fn single<'b, T>(&self, mut blocks: Vec<&'b T>, block: &'static str) -> Result<Option<&'b T>> {
        match blocks.len() {
            0 | 1 => Ok(blocks.pop()),
            count => Err(FrontendError::TooManyBlocks {
                model: self.name.clone(),
                block,
                count,
            }),
        }
    }

    fn ensure_at_most_one(&self, count: usize, block: &'static str) -> Result<()> {
        if count > 1 {
            return Err(FrontendError::TooManyBlocks {
                model: self.name.clone(),
                block,
                count,
            });
        }
        Ok(())
    }

    // ============ Symbol queries ============

    /// Symbols bound directly in the model scope, in declaration order.
    fn model_symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.scope
            .into_iter()
            .flat_map(|scope| self.symbols.symbols_in_scope(scope))
            .filter(|symbol| !symbol.is_predefined)
    }

    fn symbols_of(&self, block_type: BlockType) -> Vec<&Symbol> {
        self.model_symbols()
            .filter(|symbol| symbol.block_type == block_type)
            .collect()
    }

    /// Symbols declared in `parameters`.
    pub fn get_parameter_symbols(&self) -> Vec<&Symbol> {
        self.symbols_of(BlockType::Parameters)
    }

    /// Symbols declared in `state`.
    pub fn get_state_symbols(&self) -> Vec<&Symbol> {
        self.symbols_of(BlockType::State)
    }

    /// Symbols declared in `internals`, including ones added by transforms.
    pub fn get_internal_symbols(&self) -> Vec<&Symbol> {
        self.symbols_of(BlockType::Internals)
    }

    /// Symbols declared with `function` in the equations or initial values block.
    pub fn get_function_symbols(&self) -> Vec<&Symbol> {
        self.model_symbols()
            .filter(|symbol| {
                symbol.is_function
                    && matches!(symbol.block_type, BlockType::Equation | BlockType::InitialValues)
            })
            .collect()
    }

    pub fn get_parameter_non_alias_symbols(&self) -> Vec<&Symbol> {
        non_alias(self.get_parameter_symbols())
    }

    pub fn get_state_non_alias_symbols(&self) -> Vec<&Symbol> {
        non_alias(self.get_state_symbols())
    }

    pub fn get_internal_non_alias_symbols(&self) -> Vec<&Symbol> {
        non_alias(self.get_internal_symbols())
    }

    /// Initial-value symbols in declaration order.
    ///
    /// Later declarations may depend on earlier ones, so the order follows
    /// the block rather than the scope. A declared name that does not
    /// resolve is an internal error.
    pub fn get_initial_values_symbols(&self) -> Result<Vec<&Symbol>> {
        let scope = self.scope()?;
        let mut out = Vec::new();
        for decl in self.get_initial_values_declarations() {
            for var in &decl.variables {
                let name = var.complete_name();
                let symbol = self
                    .symbols
                    .resolve_symbol(var.meta.scope.unwrap_or(scope), &name, None)
                    .ok_or_else(|| {
                        FrontendError::unresolved(
                            name.clone(),
                            format!("initial values of '{}'", self.name),
                        )
                    })?;
                out.push(symbol);
            }
        }
        Ok(out)
    }

    pub fn get_initial_values_non_alias_symbols(&self) -> Result<Vec<&Symbol>> {
        Ok(non_alias(self.get_initial_values_symbols()?))
    }

    pub fn get_function_initial_values_symbols(&self) -> Result<Vec<&Symbol>> {
        Ok(self
            .get_initial_values_symbols()?
            .into_iter()
            .filter(|symbol| symbol.is_function)
            .collect())
    }

    pub fn get_non_function_initial_values_symbols(&self) -> Result<Vec<&Symbol>> {
        Ok(self
            .get_initial_values_symbols()?
            .into_iter()
            .filter(|symbol| !symbol.is_function)
            .collect())
    }

    /// Declarations of every initial values block, in order.
    pub fn get_initial_values_declarations(&self) -> Vec<&Declaration> {
        variable_blocks(&self.body, BlockKind::InitialValues)
            .flat_map(|block| block.declarations.iter())
            .collect()
    }

    /// Right-hand side of the initial value declared for `name`.
    pub fn get_initial_value(&self, name: &str) -> Option<&Expression> {
        self.get_initial_values_declarations()
            .into_iter()
            .find(|decl| decl.variables.iter().any(|v| v.complete_name() == name))
            .and_then(|decl| decl.expression.as_ref())
    }

    /// ODEs of every equations block, in order.
    pub fn get_equations(&self) -> Vec<&OdeEquation> {
        equations_blocks(&self.body)
            .flat_map(|block| block.ode_equations())
            .collect()
    }

    /// Shapes of every equations block, in declaration order.
    pub fn get_all_shapes(&self) -> Vec<&OdeShape> {
        equations_blocks(&self.body)
            .flat_map(|block| block.shapes())
            .collect()
    }

    /// Find a shape by name.
    ///
    /// A `__X__<buffer>` suffix is ignored. Names are first matched exactly,
    /// then in canonical form (`'` removed, `$` spelled `__DOLLAR`) so that
    /// kernels declared by their highest derivative are found too.
    pub fn get_shape_by_name(&self, name: &str) -> Option<&OdeShape> {
        let name = strip_convolution_suffix(name);
        let shapes = self.get_all_shapes();
        if let Some(shape) = shapes
            .iter()
            .find(|shape| shape.variable_names().iter().any(|n| n == name))
        {
            return Some(shape);
        }
        let wanted = canonical_shape_name(name);
        shapes.into_iter().find(|shape| {
            shape
                .variable_names()
                .iter()
                .any(|n| canonical_shape_name(n) == wanted)
        })
    }

    // ============ Buffers and invariants ============

    /// Spike and current buffers declared in `input`.
    pub fn get_input_buffers(&self) -> Vec<&Symbol> {
        self.model_symbols().filter(|s| s.is_buffer()).collect()
    }

    pub fn get_spike_buffers(&self) -> Vec<&Symbol> {
        self.model_symbols().filter(|s| s.is_spike_buffer()).collect()
    }

    pub fn get_current_buffers(&self) -> Vec<&Symbol> {
        self.model_symbols().filter(|s| s.is_current_buffer()).collect()
    }

    /// Whether any spike buffer is sized (one port per receptor).
    pub fn is_multisynapse_spikes(&self) -> bool {
        self.get_spike_buffers().iter().any(|s| s.has_vector_parameter())
    }

    /// Spike buffers receiving both excitatory and inhibitory input.
    pub fn get_multiple_receptors(&self) -> Vec<&Symbol> {
        self.get_spike_buffers()
            .into_iter()
            .filter(|s| s.is_excitatory && s.is_inhibitory)
            .collect()
    }

    pub fn is_array_buffer(&self) -> bool {
        self.get_input_buffers().iter().any(|s| s.has_vector_parameter())
    }

    /// Invariants attached to parameter declarations.
    pub fn get_parameter_invariants(&self) -> Vec<&Expression> {
        variable_blocks(&self.body, BlockKind::Parameters)
            .flat_map(|block| block.declarations.iter())
            .filter_map(|decl| decl.invariant.as_ref())
            .collect()
    }

    // ============ Mutation ============

    /// Append an empty internals block bound to the model scope.
    pub fn create_internals_block(&mut self) {
        self.create_variable_block(BlockKind::Internals);
    }

    /// Append an empty initial values block bound to the model scope.
    pub fn create_initial_values_block(&mut self) {
        self.create_variable_block(BlockKind::InitialValues);
    }

    fn create_variable_block(&mut self, kind: BlockKind) {
        let mut block = BlockWithVariables::new(kind);
        block.meta.scope = self.scope;
        self.body.elements.push(BodyElement::Variables(block));
        log::debug!("created {} block in '{}'", kind, self.name);
    }

    /// Insert `decl` into the internals block, creating the block if needed,
    /// and declare its variables as internals.
    pub fn add_to_internal_block(
        &mut self,
        decl: Declaration,
        registry: &PredefinedRegistry,
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        let scope = self.scope()?;
        self.ensure_at_most_one(self.get_internals_blocks().len(), "internals")?;
        if self.get_internals_blocks().is_empty() {
            self.create_internals_block();
        }
        let block = variable_block_mut(&mut self.body, BlockKind::Internals)
            .ok_or_else(|| FrontendError::missing_block(self.name.clone(), "internals"))?;
        let index = internal_insert_index(block.declarations.len());
        block.declarations.insert(index, decl);
        let block_scope = block.scope().unwrap_or(scope);

        let decl = &mut block.declarations[index];
        log::debug!(
            "inserted internal {} at {}",
            decl.variables.iter().map(|v| v.complete_name()).collect::<Vec<_>>().join(", "),
            index
        );
        let mut visitor = SymbolTableVisitor::new(registry, &mut self.symbols, diagnostics);
        visitor.with_block_type(BlockType::Internals, |v| v.visit_declaration(decl, block_scope));
        Ok(())
    }

    /// Append `decl` to the initial values block, creating the block if
    /// needed, and check that every declared name resolves afterwards.
    pub fn add_to_initial_values_block(
        &mut self,
        decl: Declaration,
        registry: &PredefinedRegistry,
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        let scope = self.scope()?;
        self.ensure_at_most_one(self.get_initial_values_blocks().len(), "initial_values")?;
        if self.get_initial_values_blocks().is_empty() {
            self.create_initial_values_block();
        }
        let block = variable_block_mut(&mut self.body, BlockKind::InitialValues)
            .ok_or_else(|| FrontendError::missing_block(self.name.clone(), "initial_values"))?;
        block.declarations.push(decl);
        let block_scope = block.scope().unwrap_or(scope);

        let Some(decl) = block.declarations.last_mut() else {
            return Err(FrontendError::missing_block(self.name.clone(), "initial_values"));
        };
        let mut visitor = SymbolTableVisitor::new(registry, &mut self.symbols, diagnostics);
        visitor.with_block_type(BlockType::InitialValues, |v| v.visit_declaration(decl, block_scope));

        for var in &decl.variables {
            let name = var.complete_name();
            let var_scope = var.meta.scope.unwrap_or(block_scope);
            for lookup in [var_scope, block_scope] {
                if self.symbols.resolve(lookup, &name, None).is_none() {
                    return Err(FrontendError::unresolved(
                        name,
                        format!("initial values of '{}'", self.name),
                    ));
                }
            }
            log::debug!("appended initial value {}", name);
        }
        Ok(())
    }

    /// Append `shape` to the equations block. The block must already exist.
    pub fn add_shape(
        &mut self,
        shape: OdeShape,
        registry: &PredefinedRegistry,
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        let scope = self.scope()?;
        self.ensure_at_most_one(self.get_equations_blocks().len(), "equations")?;
        let block = self
            .body
            .elements
            .iter_mut()
            .find_map(|e| match e {
                BodyElement::Equations(block) => Some(block),
                _ => None,
            })
            .ok_or_else(|| FrontendError::missing_block(self.name.clone(), "equations"))?;
        let block_scope = block.scope().unwrap_or(scope);
        block.declarations.push(EquationsItem::Shape(shape));
        let Some(EquationsItem::Shape(shape)) = block.declarations.last_mut() else {
            return Err(FrontendError::missing_block(self.name.clone(), "equations"));
        };
        let mut visitor = SymbolTableVisitor::new(registry, &mut self.symbols, diagnostics);
        visitor.with_block_type(BlockType::Equation, |v| v.visit_shape(shape, block_scope));
        Ok(())
    }

    /// Remove every equations block and return how many were removed.
    pub fn remove_equations_block(&mut self) -> usize {
        let before = self.body.elements.len();
        self.body
            .elements
            .retain(|e| !matches!(e, BodyElement::Equations(_)));
        let removed = before - self.body.elements.len();
        log::debug!("removed {} equations block(s) from '{}'", removed, self.name);
        removed
    }

    /// Remove every initial values block and return how many were removed.
    pub fn remove_initial_blocks(&mut self) -> usize {
        let before = self.body.elements.len();
        self.body.elements.retain(|e| {
            !matches!(e, BodyElement::Variables(block) if block.kind == BlockKind::InitialValues)
        });
        before - self.body.elements.len()
    }

    /// Replace the statement at `path` in the update block with `replacement`
    /// and declare anything the new statements introduce.
    pub fn splice_update_block(
        &mut self,
        path: &StmtPath,
        replacement: Vec<Stmt>,
        registry: &PredefinedRegistry,
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        self.ensure_at_most_one(self.get_update_blocks().len(), "update")?;
        let count = replacement.len();
        let block = update_block_mut(&mut self.body)
            .ok_or_else(|| FrontendError::missing_block(self.name.clone(), "update"))?;
        let target = block
            .block_at_mut(&path.steps)
            .filter(|target| path.index < target.stmts.len())
            .ok_or_else(|| FrontendError::missing_block(self.name.clone(), "update"))?;
        let scope = target.meta.scope.ok_or_else(|| FrontendError::MissingScope {
            model: self.name.clone(),
        })?;
        let removed: Vec<Stmt> = target
            .stmts
            .splice(path.index..=path.index, replacement)
            .collect();

        let mut visitor = SymbolTableVisitor::new(registry, &mut self.symbols, diagnostics);
        visitor.with_block_type(BlockType::Local, |v| {
            for stmt in &mut target.stmts[path.index..path.index + count] {
                v.visit_stmt(stmt, scope);
            }
        });
        log::debug!(
            "replaced {} statement(s) with {} in update block of '{}'",
            removed.len(),
            count,
            self.name
        );
        Ok(())
    }

    /// Append `stmt` to the end of the update block.
    pub fn add_to_update_block(
        &mut self,
        stmt: Stmt,
        registry: &PredefinedRegistry,
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        self.ensure_at_most_one(self.get_update_blocks().len(), "update")?;
        let block = update_block_mut(&mut self.body)
            .ok_or_else(|| FrontendError::missing_block(self.name.clone(), "update"))?;
        let scope = block.meta.scope.ok_or_else(|| FrontendError::MissingScope {
            model: self.name.clone(),
        })?;
        block.stmts.push(stmt);
        let Some(stmt) = block.stmts.last_mut() else {
            return Err(FrontendError::missing_block(self.name.clone(), "update"));
        };
        let mut visitor = SymbolTableVisitor::new(registry, &mut self.symbols, diagnostics);
        visitor.with_block_type(BlockType::Local, |v| v.visit_stmt(stmt, scope));
        Ok(())
    }
}

/// Statement block of the first update block.
fn update_block_mut(body: &mut Body) -> Option<&mut Block> {
    body.elements.iter_mut().find_map(|e| match e {
        BodyElement::Update(update) => Some(&mut update.block),
        _ => None,
    })
}

/// Position for a new internal declaration in a block of `count` declarations.
///
/// Insertion is circular with the default index `-1`: an empty block gets
/// position 0, otherwise `1 + (-1 mod count)`, which is the end of the block.
fn internal_insert_index(count: usize) -> usize {
    if count == 0 {
        return 0;
    }
    1 + (-1i64).rem_euclid(count as i64) as usize
}

fn non_alias(symbols: Vec<&Symbol>) -> Vec<&Symbol> {
    symbols
        .into_iter()
        .filter(|s| !s.is_function && !s.is_predefined)
        .collect()
}

fn variable_blocks(body: &Body, kind: BlockKind) -> impl Iterator<Item = &BlockWithVariables> {
    body.elements.iter().filter_map(move |e| match e {
        BodyElement::Variables(block) if block.kind == kind => Some(block),
        _ => None,
    })
}

fn variable_block_mut(body: &mut Body, kind: BlockKind) -> Option<&mut BlockWithVariables> {
    body.elements.iter_mut().find_map(|e| match e {
        BodyElement::Variables(block) if block.kind == kind => Some(block),
        _ => None,
    })
}

fn equations_blocks(body: &Body) -> impl Iterator<Item = &EquationsBlock> {
    body.elements.iter().filter_map(|e| match e {
        BodyElement::Equations(block) => Some(block),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MessageCode;
    use crate::dsl::{parse_declaration, parse_model, parse_shape, parse_statements, SmallStmtKind};

    const IAF: &str = r#"
neuron iaf_psc_alpha:
  initial_values:
    V_m mV = E_L
    I_shape_in pA = 0 pA
    I_shape_in' pA/ms = pA * e / tau_syn
  end
  equations:
    shape I_shape_in'' = -I_shape_in' / tau_syn
    shape alpha$ = exp(-t / tau_syn)
    function I_syn pA = convolve(I_shape_in, in_spikes)
    V_m' = -(V_m - E_L) / tau_m + (I_syn + I_e + currents) / C_m
  end
  parameters:
    C_m pF = 250 pF [[C_m > 0 pF]]
    tau_m ms = 10 ms
    tau_syn ms = 2 ms
    E_L mV = -70 mV
    I_e pA = 0 pA
  end
  input:
    in_spikes pA <- excitatory inhibitory spike
    currents pA <- current
  end
  output: spike
  update:
    r integer = 0
    integrate_odes()
    if V_m > E_L:
      emit_spike()
    end
  end
end
"#;

    fn build(source: &str) -> (NeuronOrSynapse, PredefinedRegistry, Diagnostics) {
        let registry = PredefinedRegistry::new();
        let mut diags = Diagnostics::new();
        let ast = parse_model(source).unwrap();
        let model = NeuronOrSynapse::analyse(ast, "iaf.nestml", &registry, &mut diags);
        (model, registry, diags)
    }

    fn names(symbols: Vec<&Symbol>) -> Vec<&str> {
        symbols.into_iter().map(|s| s.name.as_str()).collect()
    }

    fn internal_names(model: &NeuronOrSynapse) -> Vec<String> {
        model.get_internals_block().unwrap().unwrap()
            .declarations
            .iter()
            .map(|d| d.variables[0].complete_name())
            .collect()
    }

    #[test]
    fn test_equations_block_multiplicity() {
        let (single, _, _) = build(IAF);
        assert!(single.get_equations_block().unwrap().is_some());
        assert_eq!(single.get_equations_blocks().len(), 1);

        let (none, _, _) = build("neuron n:\n  state:\n    x real = 1\n  end\nend\n");
        assert!(none.get_equations_block().unwrap().is_none());

        let source = "neuron n:\n  equations:\n  end\n  equations:\n  end\nend\n";
        let (twice, _, _) = build(source);
        assert_eq!(twice.get_equations_blocks().len(), 2);
        assert!(matches!(
            twice.get_equations_block(),
            Err(FrontendError::TooManyBlocks { count: 2, .. })
        ));
    }

    #[test]
    fn test_symbol_classification() {
        let (model, _, diags) = build(IAF);
        assert!(!diags.has_errors(), "{:?}", diags.iter().collect::<Vec<_>>());
        assert_eq!(
            names(model.get_parameter_symbols()),
            vec!["C_m", "tau_m", "tau_syn", "E_L", "I_e"]
        );
        assert_eq!(names(model.get_function_symbols()), vec!["I_syn"]);
        assert!(model.get_state_symbols().is_empty());
        assert!(model.get_internal_symbols().is_empty());
        assert_eq!(model.get_parameter_non_alias_symbols().len(), 5);
    }

    #[test]
    fn test_initial_values_keep_declaration_order() {
        let source = "neuron n:\n  initial_values:\n    b real = 2\n    a real = b + 1\n  end\nend\n";
        let (model, _, _) = build(source);
        assert_eq!(names(model.get_initial_values_symbols().unwrap()), vec!["b", "a"]);

        let (empty, _, _) = model_no_iv();
        assert!(empty.get_initial_values_symbols().unwrap().is_empty());
    }

    #[test]
    fn test_undeclared_initial_value_is_fatal() {
        let (mut model, _, _) = build(IAF);
        let ghost = parse_declaration("ghost real = 1").unwrap();
        variable_block_mut(&mut model.body, BlockKind::InitialValues)
            .unwrap()
            .declarations
            .push(ghost);

        let result = model.get_initial_values_symbols();
        assert!(matches!(
            result,
            Err(FrontendError::UnresolvedSymbol { ref name, .. }) if name == "ghost"
        ));
        assert!(model.get_non_function_initial_values_symbols().is_err());
        assert!(model.get_initial_values_non_alias_symbols().is_err());
    }

    fn model_no_iv() -> (NeuronOrSynapse, PredefinedRegistry, Diagnostics) {
        build("neuron n:\n  parameters:\n    p real = 1\n  end\nend\n")
    }

    #[test]
    fn test_unanalysed_model_has_no_scope() {
        let ast = parse_model(IAF).unwrap();
        let model = NeuronOrSynapse::from_ast(ast, "iaf.nestml");
        assert!(matches!(model.scope(), Err(FrontendError::MissingScope { .. })));
        assert!(model.get_parameter_symbols().is_empty());
    }

    #[test]
    fn test_add_to_empty_internals_block() {
        let (mut model, registry, mut diags) = build(IAF);
        assert!(model.get_internals_blocks().is_empty());

        let decl = parse_declaration("P11 real = exp(-resolution() / tau_m)").unwrap();
        model.add_to_internal_block(decl.clone(), &registry, &mut diags).unwrap();

        let block = model.get_internals_block().unwrap().unwrap();
        assert_eq!(block.declarations, vec![decl]);
        let symbol = model.resolve("P11").unwrap();
        assert_eq!(symbol.block_type, BlockType::Internals);
        assert_eq!(names(model.get_internal_symbols()), vec!["P11"]);
        assert_eq!(block.declarations[0].scope(), Some(model.scope().unwrap()));
    }

    #[test]
    fn test_internal_insertion_appends() {
        let (mut model, registry, mut diags) = build(IAF);
        for text in ["a real = 1", "b real = 2", "c real = 3"] {
            let decl = parse_declaration(text).unwrap();
            model.add_to_internal_block(decl, &registry, &mut diags).unwrap();
        }
        assert_eq!(internal_names(&model), vec!["a", "b", "c"]);
        assert_eq!(internal_insert_index(0), 0);
        assert_eq!(internal_insert_index(1), 1);
        assert_eq!(internal_insert_index(4), 4);
    }

    #[test]
    fn test_initial_values_append_at_end() {
        let source = "neuron n:\n  initial_values:\n    x real = 0\n    y real = x\n  end\nend\n";
        let (mut model, registry, mut diags) = build(source);
        let decl = parse_declaration("z real = y + 1").unwrap();
        model.add_to_initial_values_block(decl, &registry, &mut diags).unwrap();

        assert_eq!(names(model.get_initial_values_symbols().unwrap()), vec!["x", "y", "z"]);
        assert_eq!(model.resolve("z").unwrap().block_type, BlockType::InitialValues);
    }

    #[test]
    fn test_initial_values_block_created_on_demand() {
        let (mut model, registry, mut diags) = model_no_iv();
        let decl = parse_declaration("g real = p").unwrap();
        model.add_to_initial_values_block(decl, &registry, &mut diags).unwrap();
        assert_eq!(model.get_initial_values_blocks().len(), 1);
        assert!(model.get_initial_value("g").is_some());
    }

    #[test]
    fn test_add_shape_requires_equations_block() {
        let (mut without, registry, mut diags) = model_no_iv();
        let shape = parse_shape("shape g = exp(-t)").unwrap();
        assert!(matches!(
            without.add_shape(shape.clone(), &registry, &mut diags),
            Err(FrontendError::MissingBlock { block: "equations", .. })
        ));

        let (mut with, registry, mut diags) = build(IAF);
        with.add_shape(shape, &registry, &mut diags).unwrap();
        assert!(with.get_shape_by_name("g").is_some());
        assert_eq!(with.resolve("g").unwrap().block_type, BlockType::Equation);
    }

    #[test]
    fn test_shape_lookup() {
        let (model, _, _) = build(IAF);
        let kernel = model.get_shape_by_name("I_shape_in''").unwrap();
        assert_eq!(kernel.lhs.name, "I_shape_in");
        assert!(model.get_shape_by_name("I_shape_in").is_some());
        assert!(model.get_shape_by_name("I_shape_in'").is_some());
        assert!(model.get_shape_by_name("I_shape_in__X__in_spikes").is_some());

        assert!(model.get_shape_by_name("alpha$").is_some());
        assert!(model.get_shape_by_name("alpha__DOLLAR").is_some());
        assert!(model.get_shape_by_name("alpha__X__in_spikes").is_none());
        assert!(model.get_shape_by_name("beta").is_none());
    }

    #[test]
    fn test_remove_blocks() {
        let (mut model, _, _) = build(IAF);
        assert_eq!(model.remove_equations_block(), 1);
        assert!(model.get_equations_block().unwrap().is_none());
        assert_eq!(model.remove_equations_block(), 0);

        assert_eq!(model.remove_initial_blocks(), 1);
        assert!(model.get_initial_values_declarations().is_empty());
    }

    #[test]
    fn test_buffer_queries() {
        let (model, _, _) = build(IAF);
        assert_eq!(names(model.get_spike_buffers()), vec!["in_spikes"]);
        assert_eq!(names(model.get_current_buffers()), vec!["currents"]);
        assert_eq!(model.get_input_buffers().len(), 2);
        assert_eq!(names(model.get_multiple_receptors()), vec!["in_spikes"]);
        assert!(!model.is_multisynapse_spikes());
        assert!(!model.is_array_buffer());
        assert_eq!(model.get_parameter_invariants().len(), 1);

        let source = "neuron n:\n  parameters:\n    n_receptors integer = 2\n  end\n  \
                      input:\n    spikes[n_receptors] pA <- spike\n  end\nend\n";
        let (multi, _, _) = build(source);
        assert!(multi.is_multisynapse_spikes());
        assert!(multi.is_array_buffer());
    }

    #[test]
    fn test_splice_update_block() {
        let (mut model, registry, mut diags) = build(IAF);
        let path = {
            let update = model.get_update_block().unwrap().unwrap();
            let call = update
                .block
                .calls()
                .into_iter()
                .find(|c| c.name == "integrate_odes")
                .unwrap();
            update.block.path_of_call(call).unwrap()
        };
        assert_eq!(path.index, 1);

        let stmts = parse_statements("tmp real = 1\nV_m = tmp * V_m\n").unwrap();
        model.splice_update_block(&path, stmts, &registry, &mut diags).unwrap();

        let update = model.get_update_block().unwrap().unwrap();
        assert_eq!(update.block.stmts.len(), 4);
        let Stmt::Small(small) = &update.block.stmts[2] else { panic!() };
        assert!(matches!(small.kind, SmallStmtKind::Assignment(_)));
        let local = model
            .symbols()
            .resolve_symbol(update.block.meta.scope.unwrap(), "tmp", None)
            .unwrap();
        assert_eq!(local.block_type, BlockType::Local);
        assert!(!diags.has_code(MessageCode::VariableRedeclared));
    }

    #[test]
    fn test_print_round_trip() {
        let (model, _, _) = build(IAF);
        let reparsed = parse_model(&model.print()).unwrap();
        assert_eq!(reparsed.body, parse_model(IAF).unwrap().body);
    }
}
