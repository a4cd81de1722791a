//! Model validation.

use super::NeuronOrSynapse;
use crate::config::FrontendConfig;
use crate::diagnostics::{Diagnostics, MessageCode, Severity};
use crate::dsl::{
    Block, BlockKind, BodyElement, DataType, EquationsItem, FunctionCall, SmallStmtKind,
    SourcePosition,
};
use crate::error::{FrontendError, Result};
use crate::symbols::{infer_type, ExprType, PredefinedRegistry};

/// Validate an analysed model.
///
/// Checks:
/// - At most one block of each variable kind and at most one equations block
/// - Every data type names known units
/// - Invariants are boolean
/// - Convolutions take a shape and a spike buffer
/// - The integrate built-in is called at most once
///
/// Findings go to `diagnostics`. Fails if this model has error-level
/// diagnostics afterwards, or warnings when `warnings_as_errors` is set.
pub fn validate_model(
    model: &NeuronOrSynapse,
    registry: &PredefinedRegistry,
    config: &FrontendConfig,
    diagnostics: &mut Diagnostics,
) -> Result<()> {
    diagnostics.set_current_model(Some(&model.name));

    check_block_multiplicity(model, diagnostics);
    check_data_types(model, registry, diagnostics);
    check_invariants(model, registry, diagnostics);
    check_convolutions(model, config, diagnostics);
    check_integrate_calls(model, config, diagnostics);

    let failing = diagnostics
        .iter()
        .filter(|d| d.model.as_deref() == Some(model.name.as_str()))
        .filter(|d| {
            d.severity == Severity::Error
                || (config.warnings_as_errors && d.severity == Severity::Warning)
        })
        .count();
    if failing > 0 {
        return Err(FrontendError::InvalidModel {
            model: model.name.clone(),
            errors: failing,
        });
    }
    log::info!("model '{}' is valid", model.name);
    Ok(())
}

fn check_block_multiplicity(model: &NeuronOrSynapse, diagnostics: &mut Diagnostics) {
    let mut counts: Vec<(&str, usize)> = [
        BlockKind::State,
        BlockKind::Parameters,
        BlockKind::Internals,
        BlockKind::InitialValues,
    ]
    .into_iter()
    .map(|kind| (kind.keyword(), model.get_variable_blocks(kind).len()))
    .collect();
    counts.push(("equations", model.get_equations_blocks().len()));

    for (block, count) in counts {
        if count > 1 {
            diagnostics.error(
                MessageCode::BlockMultiplicity,
                format!("{} {} blocks declared, at most one is allowed", count, block),
                model.meta.position,
            );
        }
    }
}

fn check_data_types(
    model: &NeuronOrSynapse,
    registry: &PredefinedRegistry,
    diagnostics: &mut Diagnostics,
) {
    let mut types: Vec<(&DataType, SourcePosition)> = Vec::new();
    for element in &model.body.elements {
        match element {
            BodyElement::Variables(block) => {
                types.extend(block.declarations.iter().map(|d| (&d.data_type, d.meta.position)));
            }
            BodyElement::Equations(block) => {
                for item in &block.declarations {
                    if let EquationsItem::Function(func) = item {
                        types.push((&func.data_type, func.meta.position));
                    }
                }
            }
            BodyElement::Input(block) => {
                for port in &block.ports {
                    if let Some(data_type) = &port.data_type {
                        types.push((data_type, port.meta.position));
                    }
                }
            }
            BodyElement::Update(update) => {
                types.extend(local_declaration_types(&update.block));
            }
            BodyElement::Function(func) => {
                types.extend(func.parameters.iter().map(|p| (&p.data_type, p.meta.position)));
                if let Some(ret) = &func.return_type {
                    types.push((ret, func.meta.position));
                }
                types.extend(local_declaration_types(&func.block));
            }
            BodyElement::Output(_) => {}
        }
    }

    for (data_type, position) in types {
        if !registry.is_known_type(data_type) {
            diagnostics.error(
                MessageCode::UnknownType,
                format!("unknown type '{}'", data_type),
                position,
            );
        }
    }
}

fn local_declaration_types(block: &Block) -> Vec<(&DataType, SourcePosition)> {
    block
        .small_stmts()
        .into_iter()
        .filter_map(|stmt| match &stmt.kind {
            SmallStmtKind::Declaration(decl) => Some((&decl.data_type, decl.meta.position)),
            _ => None,
        })
        .collect()
}

fn check_invariants(
    model: &NeuronOrSynapse,
    registry: &PredefinedRegistry,
    diagnostics: &mut Diagnostics,
) {
    let declarations = model.body.elements.iter().filter_map(|e| match e {
        BodyElement::Variables(block) => Some(block),
        _ => None,
    });
    for decl in declarations.flat_map(|block| block.declarations.iter()) {
        let Some(invariant) = &decl.invariant else {
            continue;
        };
        match infer_type(invariant, model.symbols(), registry) {
            Some(ExprType::Boolean) => {}
            Some(other) => diagnostics.error(
                MessageCode::InvariantNotBoolean,
                format!("invariant must be boolean, found {:?}", other),
                invariant.meta.position,
            ),
            None => diagnostics.warning(
                MessageCode::InvariantTypeUnknown,
                "type of invariant could not be derived",
                invariant.meta.position,
            ),
        }
    }
}

fn check_convolutions(
    model: &NeuronOrSynapse,
    config: &FrontendConfig,
    diagnostics: &mut Diagnostics,
) {
    let calls: Vec<&FunctionCall> = model
        .body
        .expressions()
        .into_iter()
        .flat_map(|expr| expr.calls())
        .filter(|call| config.is_convolve_function(&call.name))
        .collect();

    for call in calls {
        let [shape, buffer] = call.args.as_slice() else {
            diagnostics.error(
                MessageCode::ConvolveArguments,
                format!("{} takes exactly two arguments", call.name),
                call.meta.position,
            );
            continue;
        };
        let shape_ok = shape
            .as_variable()
            .is_some_and(|var| model.get_shape_by_name(&var.complete_name()).is_some());
        if !shape_ok {
            diagnostics.error(
                MessageCode::ConvolveArguments,
                format!("first argument of {} must name a shape", call.name),
                shape.meta.position,
            );
        }
        let buffer_ok = buffer
            .as_variable()
            .and_then(|var| model.resolve(&var.complete_name()))
            .is_some_and(|symbol| symbol.is_spike_buffer());
        if !buffer_ok {
            diagnostics.error(
                MessageCode::ConvolveArguments,
                format!("second argument of {} must name a spike buffer", call.name),
                buffer.meta.position,
            );
        }
    }
}

fn check_integrate_calls(
    model: &NeuronOrSynapse,
    config: &FrontendConfig,
    diagnostics: &mut Diagnostics,
) {
    let calls: Vec<&FunctionCall> = model
        .get_update_blocks()
        .into_iter()
        .flat_map(|update| update.block.calls())
        .filter(|call| call.name == config.integrate_function)
        .collect();
    if let [_, second, ..] = calls.as_slice() {
        diagnostics.error(
            MessageCode::MultipleIntegrateCalls,
            format!(
                "{}() is called {} times, at most once is allowed",
                config.integrate_function,
                calls.len()
            ),
            second.meta.position,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::parse_model;

    fn validate(source: &str, config: &FrontendConfig) -> (Result<()>, Diagnostics) {
        let registry = PredefinedRegistry::new();
        let mut diags = Diagnostics::new();
        let ast = parse_model(source).unwrap();
        let model = NeuronOrSynapse::analyse(ast, "test", &registry, &mut diags);
        let result = validate_model(&model, &registry, config, &mut diags);
        (result, diags)
    }

    const VALID: &str = r#"
neuron ok:
  initial_values:
    V_m mV = E_L
    g pA = 0 pA
    g' pA/ms = pA * e / tau
  end
  equations:
    shape g'' = -2 * g' / tau - g / tau**2
    V_m' = -(V_m - E_L) / tau + convolve(g, spikes) / C_m
  end
  parameters:
    C_m pF = 250 pF [[C_m > 0 pF]]
    tau ms = 2 ms
    E_L mV = -70 mV
  end
  input:
    spikes pA <- spike
  end
  update:
    integrate_odes()
  end
end
"#;

    #[test]
    fn test_valid_model() {
        let (result, diags) = validate(VALID, &FrontendConfig::default());
        assert!(result.is_ok(), "{:?}", diags.iter().collect::<Vec<_>>());
        assert!(diags.is_empty());
    }

    #[test]
    fn test_too_many_blocks() {
        let source = "neuron n:\n  state:\n    x real = 1\n  end\n  state:\n    y real = 1\n  end\nend\n";
        let (result, diags) = validate(source, &FrontendConfig::default());
        assert!(matches!(result, Err(FrontendError::InvalidModel { errors: 1, .. })));
        assert!(diags.has_code(MessageCode::BlockMultiplicity));
    }

    #[test]
    fn test_unknown_type() {
        let source = "neuron n:\n  parameters:\n    d furlong = 1\n  end\nend\n";
        let (result, diags) = validate(source, &FrontendConfig::default());
        assert!(result.is_err());
        assert!(diags.has_code(MessageCode::UnknownType));
    }

    #[test]
    fn test_invariants() {
        let source = "neuron n:\n  parameters:\n    n integer = 1 [[n + 1]]\n  end\nend\n";
        let (result, diags) = validate(source, &FrontendConfig::default());
        assert!(result.is_err());
        assert!(diags.has_code(MessageCode::InvariantNotBoolean));

        let source = "neuron n:\n  parameters:\n    w real = 1 [[w > \"a\"]]\n  end\nend\n";
        let (result, diags) = validate(source, &FrontendConfig::default());
        assert!(result.is_ok());
        assert!(diags.has_code(MessageCode::InvariantTypeUnknown));

        let strict = FrontendConfig::new().with_warnings_as_errors(true);
        let (result, _) = validate(source, &strict);
        assert!(result.is_err());
    }

    #[test]
    fn test_convolution_arguments() {
        let source = "neuron n:\n  equations:\n    function I pA = convolve(x, stim)\n  end\n  \
                      state:\n    x pA = 0 pA\n  end\n  input:\n    stim pA <- current\n  end\nend\n";
        let (result, diags) = validate(source, &FrontendConfig::default());
        assert!(result.is_err());
        let count = diags
            .iter()
            .filter(|d| d.code == MessageCode::ConvolveArguments)
            .count();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_integrate_called_twice() {
        let source = "neuron n:\n  update:\n    integrate_odes()\n    integrate_odes()\n  end\nend\n";
        let (result, diags) = validate(source, &FrontendConfig::default());
        assert!(result.is_err());
        assert!(diags.has_code(MessageCode::MultipleIntegrateCalls));
    }
}
