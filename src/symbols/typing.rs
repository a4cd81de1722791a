//! Coarse type inference for expressions.
//!
//! Only distinguishes what validation needs: booleans, numbers, strings and
//! physical units. `None` means the type could not be derived, usually because
//! a name did not resolve.

use super::{PredefinedRegistry, SymbolKind, SymbolTable};
use crate::dsl::{BinaryOp, DataType, Expression, ExpressionKind, Literal, UnaryOp};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprType {
    Boolean,
    Integer,
    Real,
    String,
    Void,
    /// A physical unit, in data-type notation (`mV`, `pA/ms`)
    Unit(String),
}

impl ExprType {
    pub fn from_data_type(data_type: &DataType) -> Self {
        match data_type.as_str() {
            "boolean" => Self::Boolean,
            "integer" => Self::Integer,
            "real" => Self::Real,
            "string" => Self::String,
            "void" => Self::Void,
            unit => Self::Unit(unit.to_string()),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Real | Self::Unit(_))
    }
}

/// Infer the type of `expr` from its literals and resolved symbols.
pub fn infer_type(
    expr: &Expression,
    table: &SymbolTable,
    registry: &PredefinedRegistry,
) -> Option<ExprType> {
    match &expr.kind {
        ExpressionKind::Literal { value, unit } => {
            if let Some(unit) = unit {
                return Some(ExprType::Unit(unit.clone()));
            }
            Some(match value {
                Literal::Integer(_) => ExprType::Integer,
                Literal::Real(_) | Literal::Inf => ExprType::Real,
                Literal::Boolean(_) => ExprType::Boolean,
                Literal::String(_) => ExprType::String,
            })
        }
        ExpressionKind::Variable(var) => {
            let name = var.complete_name();
            let symbol = var
                .meta
                .scope
                .and_then(|scope| table.resolve_symbol(scope, &name, None))
                .or_else(|| registry.lookup_variable(&name));
            if let Some(symbol) = symbol {
                if symbol.kind == SymbolKind::Type {
                    return Some(ExprType::Unit(symbol.name.clone()));
                }
                return symbol.data_type.as_ref().map(ExprType::from_data_type);
            }
            registry
                .lookup_type(&name)
                .map(|_| ExprType::Unit(name.clone()))
        }
        ExpressionKind::Call(call) => {
            let symbol = call
                .meta
                .scope
                .and_then(|scope| table.resolve_symbol(scope, &call.name, Some(SymbolKind::Function)))
                .or_else(|| registry.lookup_function(&call.name))?;
            match &symbol.return_type {
                Some(ret) => Some(ExprType::from_data_type(ret)),
                // min/max/clip take the type of their first argument
                None => call
                    .args
                    .first()
                    .and_then(|arg| infer_type(arg, table, registry)),
            }
        }
        ExpressionKind::Unary { op, operand } => {
            let inner = infer_type(operand, table, registry)?;
            match op {
                UnaryOp::Not => (inner == ExprType::Boolean).then_some(ExprType::Boolean),
                UnaryOp::Tilde => (inner == ExprType::Integer).then_some(ExprType::Integer),
                UnaryOp::Plus | UnaryOp::Minus => inner.is_numeric().then_some(inner),
            }
        }
        ExpressionKind::Binary { op, lhs, rhs } => {
            let lhs = infer_type(lhs, table, registry)?;
            let rhs = infer_type(rhs, table, registry)?;
            infer_binary(*op, lhs, rhs)
        }
        ExpressionKind::Ternary {
            condition,
            if_true,
            if_false,
        } => {
            if infer_type(condition, table, registry)? != ExprType::Boolean {
                return None;
            }
            let if_true = infer_type(if_true, table, registry)?;
            infer_type(if_false, table, registry)?;
            Some(if_true)
        }
        ExpressionKind::Paren(inner) => infer_type(inner, table, registry),
    }
}

fn infer_binary(op: BinaryOp, lhs: ExprType, rhs: ExprType) -> Option<ExprType> {
    match op {
        BinaryOp::And | BinaryOp::Or => (lhs == ExprType::Boolean && rhs == ExprType::Boolean).then_some(ExprType::Boolean),
        BinaryOp::Eq | BinaryOp::Ne => Some(ExprType::Boolean),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            (lhs.is_numeric() && rhs.is_numeric()).then_some(ExprType::Boolean)
        }
        BinaryOp::Add if lhs == ExprType::String && rhs == ExprType::String => Some(ExprType::String),
        BinaryOp::Add | BinaryOp::Sub => match (&lhs, &rhs) {
            (ExprType::Unit(_), _) => Some(lhs),
            (_, ExprType::Unit(_)) => Some(rhs),
            _ => numeric(lhs, rhs),
        },
        BinaryOp::Mul | BinaryOp::Div => match (&lhs, &rhs) {
            (ExprType::Unit(a), ExprType::Unit(b)) => Some(ExprType::Unit(format!("{}{}{}", a, op.symbol(), b))),
            (ExprType::Unit(a), _) => Some(ExprType::Unit(a.clone())),
            (_, ExprType::Unit(b)) if op == BinaryOp::Div => Some(ExprType::Unit(format!("1/{}", b))),
            (_, ExprType::Unit(_)) => Some(rhs),
            _ if op == BinaryOp::Div && lhs == ExprType::Integer && rhs == ExprType::Integer => Some(ExprType::Real),
            _ => numeric(lhs, rhs),
        },
        BinaryOp::Mod => (lhs == ExprType::Integer && rhs == ExprType::Integer).then_some(ExprType::Integer),
        BinaryOp::Pow => lhs.is_numeric().then_some(lhs),
    }
}

fn numeric(lhs: ExprType, rhs: ExprType) -> Option<ExprType> {
    match (lhs, rhs) {
        (ExprType::Integer, ExprType::Integer) => Some(ExprType::Integer),
        (a, b) if a.is_numeric() && b.is_numeric() => Some(ExprType::Real),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::dsl::{parse_model, BodyElement};
    use crate::symbols::SymbolTableVisitor;

    fn invariants(source: &str) -> Vec<Option<ExprType>> {
        let registry = PredefinedRegistry::new();
        let mut ast = parse_model(source).unwrap();
        let mut table = SymbolTable::new();
        let mut diags = Diagnostics::new();
        SymbolTableVisitor::new(&registry, &mut table, &mut diags).visit_model(&mut ast.body);
        ast.body
            .elements
            .iter()
            .filter_map(|e| match e {
                BodyElement::Variables(block) => Some(block),
                _ => None,
            })
            .flat_map(|block| block.declarations.iter())
            .filter_map(|decl| decl.invariant.as_ref())
            .map(|inv| infer_type(inv, &table, &registry))
            .collect()
    }

    #[test]
    fn test_invariant_types() {
        let source = "neuron n:\n  parameters:\n    tau ms = 10 ms [[tau > 0 ms]]\n    \
                      n integer = 3 [[n + 1]]\n    flag boolean = true [[not flag and tau >= 1 ms]]\n    \
                      w real = 1 [[unknown > 0]]\n  end\nend\n";
        assert_eq!(
            invariants(source),
            vec![
                Some(ExprType::Boolean),
                Some(ExprType::Integer),
                Some(ExprType::Boolean),
                None,
            ]
        );
    }

    #[test]
    fn test_unit_arithmetic() {
        assert_eq!(
            infer_binary(
                BinaryOp::Div,
                ExprType::Unit("pA".into()),
                ExprType::Unit("ms".into())
            ),
            Some(ExprType::Unit("pA/ms".into()))
        );
        assert_eq!(
            infer_binary(BinaryOp::Div, ExprType::Integer, ExprType::Unit("ms".into())),
            Some(ExprType::Unit("1/ms".into()))
        );
        assert_eq!(
            infer_binary(BinaryOp::Add, ExprType::Integer, ExprType::Real),
            Some(ExprType::Real)
        );
    }
}
