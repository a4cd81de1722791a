//! Rewrites a model to use a solver's exact solution.

use super::solver_output::{compute_shape_state_variables_with_initial_values, SolverOutput};
use crate::config::FrontendConfig;
use crate::diagnostics::{Diagnostics, MessageCode};
use crate::dsl::{
    parse_assignment, parse_declaration, parse_expression, parse_statements, Assignment, BinaryOp,
    Declaration, Expression, ExpressionKind, FunctionCall, ModelPrinter, SmallStmt, SmallStmtKind,
    Stmt,
};
use crate::error::{FrontendError, Result};
use crate::model::{is_shape_state_variable, NeuronOrSynapse};
use crate::symbols::{PredefinedRegistry, ScopeId};

/// Applies solver results to analysed models.
///
/// Every fragment it inserts is synthesized as text and parsed. Text that
/// fails to parse, or names that do not resolve after insertion, are
/// reported as [`FrontendError::SynthesizedParse`] and
/// [`FrontendError::SynthesizedResolve`]: the generated text is wrong, not
/// the model.
pub struct Transformer<'r> {
    registry: &'r PredefinedRegistry,
    config: FrontendConfig,
    printer: ModelPrinter,
}

impl<'r> Transformer<'r> {
    pub fn new(registry: &'r PredefinedRegistry) -> Self {
        Self::with_config(registry, FrontendConfig::default())
    }

    pub fn with_config(registry: &'r PredefinedRegistry, config: FrontendConfig) -> Self {
        Self {
            registry,
            config,
            printer: ModelPrinter::new(),
        }
    }

    pub fn config(&self) -> &FrontendConfig {
        &self.config
    }

    /// Run the whole exact-solution rewrite.
    ///
    /// Propagators become internals, kernel state variables become initial
    /// values, the integrate call is replaced by the update instructions,
    /// and incoming spikes are added to the kernel states.
    pub fn apply_exact_solution(
        &self,
        neuron: &mut NeuronOrSynapse,
        output: &SolverOutput,
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        if !output.is_analytical() {
            return Err(FrontendError::solver_output(format!(
                "expected an analytical solution, got '{}'",
                output.solver
            )));
        }
        diagnostics.set_current_model(Some(&neuron.name));
        log::info!("applying exact solution to '{}'", neuron.name);

        self.add_variables_to_internals(neuron, &output.propagator_elements, diagnostics)?;

        let shape_values = compute_shape_state_variables_with_initial_values(output);
        self.add_variables_to_initial_values(
            neuron,
            shape_values.iter().map(|(name, value)| (name, value)),
            diagnostics,
        )?;

        self.replace_integrate_call_through_propagation(
            neuron,
            output.const_input.iter().next(),
            &output.ode_var_update_instructions,
            diagnostics,
        )?;
        self.apply_incoming_spikes(neuron, diagnostics)?;

        if self.config.remove_equations_block {
            neuron.remove_equations_block();
        }
        diagnostics.info(
            MessageCode::TransformationApplied,
            format!("exact solution applied to '{}'", neuron.name),
            neuron.meta.position,
        );
        Ok(())
    }

    /// Add `name real = value` to the internals block for every pair.
    pub fn add_variables_to_internals<I, K, V>(
        &self,
        neuron: &mut NeuronOrSynapse,
        declarations: I,
        diagnostics: &mut Diagnostics,
    ) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (name, value) in declarations {
            self.add_variable_to_internals(neuron, name.as_ref(), value.as_ref(), diagnostics)?;
        }
        Ok(())
    }

    pub fn add_variable_to_internals(
        &self,
        neuron: &mut NeuronOrSynapse,
        name: &str,
        value: &str,
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        let (text, decl) = self.synthesize_declaration(neuron, name, value)?;
        neuron.add_to_internal_block(decl, self.registry, diagnostics)?;
        self.expect_resolved(neuron, neuron.scope()?, name, &text)
    }

    /// Append `name real = value` to the initial values block for every pair.
    pub fn add_variables_to_initial_values<I, K, V>(
        &self,
        neuron: &mut NeuronOrSynapse,
        declarations: I,
        diagnostics: &mut Diagnostics,
    ) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (name, value) in declarations {
            self.add_variable_to_initial_values(neuron, name.as_ref(), value.as_ref(), diagnostics)?;
        }
        Ok(())
    }

    pub fn add_variable_to_initial_values(
        &self,
        neuron: &mut NeuronOrSynapse,
        name: &str,
        value: &str,
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        let (text, decl) = self.synthesize_declaration(neuron, name, value)?;
        neuron
            .add_to_initial_values_block(decl, self.registry, diagnostics)
            .map_err(|e| match e {
                FrontendError::UnresolvedSymbol { name, .. } => {
                    FrontendError::SynthesizedResolve { text, name }
                }
                other => other,
            })
    }

    /// Parse `name real = value`. When the value references a vector
    /// variable the declaration takes its size parameter.
    fn synthesize_declaration(
        &self,
        neuron: &NeuronOrSynapse,
        name: &str,
        value: &str,
    ) -> Result<(String, Declaration)> {
        let value_expr = parse_expression(value)
            .map_err(|e| FrontendError::synthesized_parse(value.to_string(), e))?;
        let size = vector_parameter(neuron, &value_expr);
        let text = match &size {
            Some(size) => format!("{} real[{}] = {}", name, size, value),
            None => format!("{} real = {}", name, value),
        };
        let mut decl =
            parse_declaration(&text).map_err(|e| FrontendError::synthesized_parse(text.clone(), e))?;
        if let Some(size) = size {
            decl.set_size_parameter(size);
        }
        Ok((text, decl))
    }

    /// Replace the statement holding the integrate call with the constant
    /// input declaration followed by `propagator_steps`.
    ///
    /// Returns `false`, with an informational diagnostic, when the update
    /// block never calls the integrate built-in.
    pub fn replace_integrate_call_through_propagation(
        &self,
        neuron: &mut NeuronOrSynapse,
        const_input: Option<(&String, &String)>,
        propagator_steps: &[String],
        diagnostics: &mut Diagnostics,
    ) -> Result<bool> {
        let path = match neuron.get_update_block()? {
            Some(update) => update
                .block
                .calls()
                .into_iter()
                .find(|call| call.name == self.config.integrate_function)
                .and_then(|call| update.block.path_of_call(call)),
            None => None,
        };
        let Some(path) = path else {
            diagnostics.info(
                MessageCode::OdeSolutionNotUsed,
                format!(
                    "'{}' never calls {}(), the solution of its ODEs is not used",
                    neuron.name, self.config.integrate_function
                ),
                neuron.meta.position,
            );
            return Ok(false);
        };

        let mut stmts = Vec::new();
        if let Some((name, value)) = const_input {
            let text = format!("{} real = {}", name, value);
            let decl = parse_declaration(&text)
                .map_err(|e| FrontendError::synthesized_parse(text.clone(), e))?;
            stmts.push(Stmt::from(SmallStmtKind::Declaration(decl)));
        }
        for step in propagator_steps {
            let parsed = parse_statements(step)
                .map_err(|e| FrontendError::synthesized_parse(step.clone(), e))?;
            stmts.extend(parsed);
        }
        let count = stmts.len();
        neuron.splice_update_block(&path, stmts, self.registry, diagnostics)?;

        let update = neuron
            .get_update_block()?
            .ok_or_else(|| FrontendError::missing_block(neuron.name.clone(), "update"))?;
        let inserted = update
            .block
            .block_at(&path.steps)
            .map(|block| &block.stmts[path.index..path.index + count])
            .unwrap_or_default();
        for stmt in inserted {
            for small in small_stmts(stmt) {
                self.expect_statement_resolved(neuron, small)?;
            }
        }
        log::debug!(
            "replaced {}() in '{}' by {} statement(s)",
            self.config.integrate_function,
            neuron.name,
            count
        );
        Ok(true)
    }

    /// Add `var += buffer * value` to the update block for every kernel
    /// state variable with an initial value, once per convolution call in
    /// the model. Repeated calls with the same arguments each contribute.
    pub fn apply_incoming_spikes(
        &self,
        neuron: &mut NeuronOrSynapse,
        diagnostics: &mut Diagnostics,
    ) -> Result<usize> {
        let pairs: Vec<(String, String)> = self
            .convolve_calls(neuron)
            .into_iter()
            .filter_map(|call| {
                let shape = call.args.first()?.as_variable()?.complete_name();
                let buffer = call.args.get(1)?.as_variable()?.complete_name();
                Some((shape, buffer))
            })
            .collect();

        let mut updates = Vec::new();
        for (shape, buffer) in &pairs {
            for decl in neuron.get_initial_values_declarations() {
                let Some(value) = &decl.expression else {
                    continue;
                };
                for var in &decl.variables {
                    let name = var.complete_name();
                    if is_shape_state_variable(shape, &name) {
                        updates.push(format!("{} += {} * {}", name, buffer, self.print_factor(value)));
                    }
                }
            }
        }

        for text in &updates {
            let assignment =
                parse_assignment(text).map_err(|e| FrontendError::synthesized_parse(text.clone(), e))?;
            self.add_assignment_to_update_block(neuron, assignment, diagnostics)?;
        }
        log::debug!("added {} spike update(s) to '{}'", updates.len(), neuron.name);
        Ok(updates.len())
    }

    /// Append an assignment to the end of the update block.
    pub fn add_assignment_to_update_block(
        &self,
        neuron: &mut NeuronOrSynapse,
        assignment: Assignment,
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        let small = SmallStmt::new(SmallStmtKind::Assignment(assignment));
        self.append_to_update_block(neuron, small, diagnostics)
    }

    /// Append a declaration to the end of the update block.
    pub fn add_declaration_to_update_block(
        &self,
        neuron: &mut NeuronOrSynapse,
        declaration: Declaration,
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        let small = SmallStmt::new(SmallStmtKind::Declaration(declaration));
        self.append_to_update_block(neuron, small, diagnostics)
    }

    fn append_to_update_block(
        &self,
        neuron: &mut NeuronOrSynapse,
        small: SmallStmt,
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        neuron.add_to_update_block(Stmt::Small(small), self.registry, diagnostics)?;
        let appended = neuron
            .get_update_block()?
            .and_then(|update| update.block.stmts.last())
            .and_then(Stmt::as_small)
            .ok_or_else(|| FrontendError::missing_block(neuron.name.clone(), "update"))?;
        self.expect_statement_resolved(neuron, appended)
    }

    /// Calls of the convolution built-ins anywhere in the model.
    pub fn convolve_calls<'n>(&self, neuron: &'n NeuronOrSynapse) -> Vec<&'n FunctionCall> {
        neuron
            .body
            .expressions()
            .into_iter()
            .flat_map(|expr| expr.calls())
            .filter(|call| self.config.is_convolve_function(&call.name))
            .collect()
    }

    /// Print `expr` so that it can follow a `*` without changing meaning.
    fn print_factor(&self, expr: &Expression) -> String {
        let printed = self.printer.print_expression(expr);
        match &expr.kind {
            ExpressionKind::Binary {
                op: BinaryOp::Mul | BinaryOp::Div | BinaryOp::Pow,
                ..
            } => printed,
            ExpressionKind::Binary { .. } | ExpressionKind::Ternary { .. } => format!("({})", printed),
            _ => printed,
        }
    }

    /// The target of an inserted assignment, or the names of an inserted
    /// declaration, must resolve where they were inserted.
    fn expect_statement_resolved(&self, neuron: &NeuronOrSynapse, small: &SmallStmt) -> Result<()> {
        let text = self.printer.print_small_stmt(small);
        let Some(scope) = small.meta.scope else {
            return Err(FrontendError::MissingScope {
                model: neuron.name.clone(),
            });
        };
        match &small.kind {
            SmallStmtKind::Assignment(assignment) => {
                self.expect_resolved(neuron, scope, &assignment.lhs.complete_name(), &text)
            }
            SmallStmtKind::Declaration(decl) => decl
                .variables
                .iter()
                .try_for_each(|var| self.expect_resolved(neuron, scope, &var.complete_name(), &text)),
            SmallStmtKind::Call(_) | SmallStmtKind::Return(_) => Ok(()),
        }
    }

    fn expect_resolved(
        &self,
        neuron: &NeuronOrSynapse,
        scope: ScopeId,
        name: &str,
        text: &str,
    ) -> Result<()> {
        let found = neuron.symbols().resolve(scope, name, None).is_some()
            || self.registry.lookup_variable(name).is_some();
        if !found {
            return Err(FrontendError::SynthesizedResolve {
                text: text.to_string(),
                name: name.to_string(),
            });
        }
        Ok(())
    }
}

/// Size parameter of the first vector variable `expr` references.
fn vector_parameter(neuron: &NeuronOrSynapse, expr: &Expression) -> Option<String> {
    expr.variables()
        .into_iter()
        .filter_map(|var| neuron.resolve(&var.complete_name()))
        .find_map(|symbol| symbol.vector_parameter.clone())
}

/// Small statements of `stmt`, including those of nested blocks.
fn small_stmts(stmt: &Stmt) -> Vec<&SmallStmt> {
    match stmt {
        Stmt::Small(small) => vec![small],
        Stmt::Compound(compound) => compound
            .blocks()
            .into_iter()
            .flat_map(|block| block.small_stmts())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::{parse_model, parse_statement, BlockKind};
    use crate::symbols::BlockType;

    const IAF: &str = r#"
neuron iaf_psc_alpha:
  initial_values:
    V_m mV = E_L
  end
  equations:
    shape I_shape_in = pA * e / tau_syn * t * exp(-t / tau_syn)
    function I_syn pA = convolve(I_shape_in, in_spikes)
    V_m' = -(V_m - E_L) / tau_m + (I_syn + I_e + currents) / C_m
  end
  parameters:
    C_m pF = 250 pF
    tau_m ms = 10 ms
    tau_syn ms = 2 ms
    E_L mV = -70 mV
    I_e pA = 0 pA
  end
  internals:
    h ms = resolution()
  end
  input:
    in_spikes pA <- spike
    currents pA <- current
  end
  output: spike
  update:
    V_old mV = V_m
    integrate_odes()
    if V_m > E_L:
      V_m = E_L
      emit_spike()
    end
  end
end
"#;

    const SOLUTION: &str = r#"{
        "solver": "analytical",
        "shape_state_variables": ["I_shape_in__1", "I_shape_in"],
        "initial_values": [{"I_shape_in__1": "pA * e / tau_syn"}, {"I_shape_in": "0 pA"}],
        "const_input": {"__const_input": "I_e + currents"},
        "propagator_elements": {
            "__P11": "exp(-h / tau_syn)",
            "__P22": "exp(-h / tau_m)",
            "__P30": "-tau_m / C_m * expm1(-h / tau_m)"
        },
        "ode_var_update_instructions": [
            "I_shape_in = __P11 * I_shape_in + h * __P11 * I_shape_in__1",
            "I_shape_in__1 = __P11 * I_shape_in__1",
            "V_m = __P30 * (__const_input + I_shape_in) + __P22 * V_m"
        ]
    }"#;

    fn analysed(source: &str) -> (NeuronOrSynapse, PredefinedRegistry, Diagnostics) {
        let registry = PredefinedRegistry::new();
        let mut diags = Diagnostics::new();
        let model = NeuronOrSynapse::analyse(parse_model(source).unwrap(), "iaf", &registry, &mut diags);
        (model, registry, diags)
    }

    fn update_text(model: &NeuronOrSynapse) -> Vec<String> {
        let printer = ModelPrinter::new();
        model
            .get_update_block()
            .unwrap()
            .unwrap()
            .block
            .stmts
            .iter()
            .map(|stmt| printer.print_stmt(stmt, 0).trim_end().to_string())
            .collect()
    }

    #[test]
    fn test_propagation_replaces_integrate_call_in_place() {
        let (mut model, registry, mut diags) = analysed(IAF);
        let transformer = Transformer::new(&registry);
        let name = "__const_input".to_string();
        let value = "I_e + currents".to_string();
        let steps = vec!["V_m = V_m * 0.5".to_string(), "V_old = V_m".to_string()];

        let replaced = transformer
            .replace_integrate_call_through_propagation(&mut model, Some((&name, &value)), &steps, &mut diags)
            .unwrap();
        assert!(replaced);

        let text = update_text(&model);
        assert_eq!(text[0], "V_old mV = V_m");
        assert_eq!(text[1], "__const_input real = I_e + currents");
        assert_eq!(text[2], "V_m = V_m * 0.5");
        assert_eq!(text[3], "V_old = V_m");
        assert!(text[4].starts_with("if V_m > E_L:"));
        assert_eq!(text.len(), 5);

        let scope = model.get_update_block().unwrap().unwrap().block.meta.scope.unwrap();
        let const_input = model.symbols().resolve_symbol(scope, "__const_input", None).unwrap();
        assert_eq!(const_input.block_type, BlockType::Local);
    }

    #[test]
    fn test_missing_integrate_call_is_informational() {
        let source = "neuron n:\n  state:\n    x real = 0\n  end\n  update:\n    x = 1\n  end\nend\n";
        let (mut model, registry, mut diags) = analysed(source);
        let transformer = Transformer::new(&registry);
        let replaced = transformer
            .replace_integrate_call_through_propagation(&mut model, None, &[], &mut diags)
            .unwrap();
        assert!(!replaced);
        assert!(diags.has_code(MessageCode::OdeSolutionNotUsed));
        assert!(!diags.has_errors());
        assert_eq!(update_text(&model), vec!["x = 1"]);
    }

    #[test]
    fn test_unparsable_step_is_a_synthesized_parse_error() {
        let (mut model, registry, mut diags) = analysed(IAF);
        let transformer = Transformer::new(&registry);
        let steps = vec!["V_m = = 1".to_string()];
        let result = transformer.replace_integrate_call_through_propagation(&mut model, None, &steps, &mut diags);
        assert!(matches!(result, Err(FrontendError::SynthesizedParse { .. })));
    }

    #[test]
    fn test_unresolved_target_is_a_synthesized_resolve_error() {
        let (mut model, registry, mut diags) = analysed(IAF);
        let transformer = Transformer::new(&registry);
        let assignment = parse_assignment("nowhere = 1").unwrap();
        let result = transformer.add_assignment_to_update_block(&mut model, assignment, &mut diags);
        assert!(matches!(
            result,
            Err(FrontendError::SynthesizedResolve { ref name, .. }) if name == "nowhere"
        ));
    }

    #[test]
    fn test_internals_and_vector_detection() {
        let source = "neuron n:\n  parameters:\n    n_in integer = 2\n  end\n  \
                      input:\n    spikes[n_in] pA <- spike\n  end\n  \
                      internals:\n    h ms = resolution()\n  end\nend\n";
        let (mut model, registry, mut diags) = analysed(source);
        let transformer = Transformer::new(&registry);
        transformer
            .add_variables_to_internals(&mut model, [("P11", "exp(-h / ms)"), ("w", "spikes * 2")], &mut diags)
            .unwrap();

        let block = model.get_internals_block().unwrap().unwrap();
        let names: Vec<_> = block.declarations.iter().map(|d| d.variables[0].name.as_str()).collect();
        assert_eq!(names, vec!["h", "P11", "w"]);
        assert_eq!(block.declarations[1].size_parameter, None);
        assert_eq!(block.declarations[2].size_parameter.as_deref(), Some("n_in"));
        assert_eq!(model.resolve("w").unwrap().block_type, BlockType::Internals);
    }

    #[test]
    fn test_initial_values_from_solver() {
        let (mut model, registry, mut diags) = analysed(IAF);
        let transformer = Transformer::new(&registry);
        transformer
            .add_variables_to_initial_values(&mut model, [("I_shape_in", "0 pA")], &mut diags)
            .unwrap();
        let symbol = model.resolve("I_shape_in").unwrap();
        assert_eq!(symbol.block_type, BlockType::InitialValues);
        assert!(!diags.has_code(MessageCode::VariableRedeclared));
    }

    #[test]
    fn test_incoming_spikes_expand_kernel_states() {
        let (mut model, registry, mut diags) = analysed(IAF);
        let transformer = Transformer::new(&registry);
        transformer
            .add_variables_to_initial_values(
                &mut model,
                [("I_shape_in__1", "pA * e / tau_syn"), ("I_shape_in", "0 pA"), ("I_shape", "1")],
                &mut diags,
            )
            .unwrap();
        let added = transformer.apply_incoming_spikes(&mut model, &mut diags).unwrap();
        assert_eq!(added, 2);

        let text = update_text(&model);
        assert_eq!(text[text.len() - 2], "I_shape_in__1 += in_spikes * pA * e / tau_syn");
        assert_eq!(text[text.len() - 1], "I_shape_in += in_spikes * 0 pA");
    }

    #[test]
    fn test_every_convolution_call_adds_updates() {
        let source = r#"
neuron twice:
  initial_values:
    g pA = 0 pA
    g' pA/ms = pA * e / tau
  end
  equations:
    shape g'' = -g / tau**2
    function I_a pA = convolve(g, spikes)
    function I_b pA = convolve(g, spikes)
  end
  parameters:
    tau ms = 2 ms
  end
  input:
    spikes pA <- spike
  end
  update:
    integrate_odes()
  end
end
"#;
        let (mut model, registry, mut diags) = analysed(source);
        let transformer = Transformer::new(&registry);
        assert_eq!(transformer.convolve_calls(&model).len(), 2);

        let added = transformer.apply_incoming_spikes(&mut model, &mut diags).unwrap();
        assert_eq!(added, 4);
        let text = update_text(&model);
        assert_eq!(
            text[1..].to_vec(),
            vec![
                "g += spikes * 0 pA",
                "g' += spikes * pA * e / tau",
                "g += spikes * 0 pA",
                "g' += spikes * pA * e / tau",
            ]
        );
    }

    #[test]
    fn test_spike_factor_keeps_precedence() {
        let registry = PredefinedRegistry::new();
        let transformer = Transformer::new(&registry);
        let sum = parse_expression("a + b").unwrap();
        assert_eq!(transformer.print_factor(&sum), "(a + b)");
        let product = parse_expression("a * b").unwrap();
        assert_eq!(transformer.print_factor(&product), "a * b");
    }

    #[test]
    fn test_synthesized_assignment_round_trip() {
        let printer = ModelPrinter::new();
        let text = "I_shape_in__1 += in_spikes * (pA * e / tau_syn - 1)";
        let first = parse_statement(text).unwrap();
        let printed = printer.print_stmt(&first, 0);
        assert_eq!(parse_statement(printed.trim_end()).unwrap(), first);
    }

    #[test]
    fn test_apply_exact_solution() {
        let (mut model, registry, mut diags) = analysed(IAF);
        let transformer = Transformer::new(&registry);
        let output = SolverOutput::from_json(SOLUTION).unwrap();
        transformer.apply_exact_solution(&mut model, &output, &mut diags).unwrap();

        let internals: Vec<_> = model
            .get_internal_symbols()
            .into_iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(internals, vec!["h", "__P11", "__P22", "__P30"]);

        let initial: Vec<_> = model
            .get_initial_values_symbols()
            .unwrap()
            .into_iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(initial, vec!["V_m", "I_shape_in__1", "I_shape_in"]);

        assert!(model.get_equations_block().unwrap().is_none());
        assert!(model.get_variable_block(BlockKind::InitialValues).unwrap().is_some());

        let text = update_text(&model);
        assert_eq!(text[1], "__const_input real = I_e + currents");
        assert!(!text.iter().any(|line| line.contains("integrate_odes")));
        assert_eq!(text[text.len() - 1], "I_shape_in += in_spikes * 0 pA");
        assert!(diags.has_code(MessageCode::TransformationApplied));
        assert!(!diags.has_errors(), "{:?}", diags.iter().collect::<Vec<_>>());
    }

    #[test]
    fn test_numeric_solution_is_rejected() {
        let (mut model, registry, mut diags) = analysed(IAF);
        let transformer = Transformer::new(&registry);
        let output = SolverOutput::from_json(r#"{"solver": "numeric"}"#).unwrap();
        assert!(matches!(
            transformer.apply_exact_solution(&mut model, &output, &mut diags),
            Err(FrontendError::InvalidSolverOutput { .. })
        ));
    }
}
