//! Printing AST nodes back to model source text.

use itertools::Itertools;

use super::ast::*;

/// Prints AST nodes as model source.
///
/// Expressions are printed as they were parsed: parentheses come only from
/// explicit [`ExpressionKind::Paren`] nodes, so parsing printed text yields a
/// structurally equal tree.
#[derive(Debug, Clone)]
pub struct ModelPrinter {
    indent: String,
}

impl Default for ModelPrinter {
    fn default() -> Self {
        Self {
            indent: "  ".to_string(),
        }
    }
}

impl ModelPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `indent` for each nesting level.
    pub fn with_indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }

    pub fn print_expression(&self, expr: &Expression) -> String {
        match &expr.kind {
            ExpressionKind::Literal { value, unit } => {
                let text = self.print_literal(value);
                match unit {
                    Some(unit) => format!("{} {}", text, unit),
                    None => text,
                }
            }
            ExpressionKind::Variable(var) => var.complete_name(),
            ExpressionKind::Call(call) => self.print_call(call),
            ExpressionKind::Unary { op, operand } => {
                format!("{}{}", op.symbol(), self.print_expression(operand))
            }
            ExpressionKind::Binary { op, lhs, rhs } => {
                let (lhs, rhs) = (self.print_expression(lhs), self.print_expression(rhs));
                match op {
                    BinaryOp::Pow => format!("{}**{}", lhs, rhs),
                    _ => format!("{} {} {}", lhs, op.symbol(), rhs),
                }
            }
            ExpressionKind::Ternary {
                condition,
                if_true,
                if_false,
            } => format!(
                "{} ? {} : {}",
                self.print_expression(condition),
                self.print_expression(if_true),
                self.print_expression(if_false)
            ),
            ExpressionKind::Paren(inner) => format!("({})", self.print_expression(inner)),
        }
    }

    fn print_literal(&self, value: &Literal) -> String {
        match value {
            Literal::Integer(v) => v.to_string(),
            // Debug keeps a decimal point so the text lexes back as a real
            Literal::Real(v) => format!("{:?}", v),
            Literal::Boolean(v) => v.to_string(),
            Literal::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
            Literal::Inf => "inf".to_string(),
        }
    }

    pub fn print_call(&self, call: &FunctionCall) -> String {
        format!(
            "{}({})",
            call.name,
            call.args.iter().map(|a| self.print_expression(a)).join(", ")
        )
    }

    pub fn print_declaration(&self, decl: &Declaration) -> String {
        let mut out = String::new();
        if decl.is_recordable {
            out.push_str("recordable ");
        }
        if decl.is_function {
            out.push_str("function ");
        }
        out.push_str(&decl.variables.iter().map(Variable::complete_name).join(", "));
        out.push(' ');
        out.push_str(decl.data_type.as_str());
        if let Some(size) = &decl.size_parameter {
            out.push_str(&format!("[{}]", size));
        }
        if let Some(expr) = &decl.expression {
            out.push_str(" = ");
            out.push_str(&self.print_expression(expr));
        }
        if let Some(inv) = &decl.invariant {
            out.push_str(&format!(" [[{}]]", self.print_expression(inv)));
        }
        out
    }

    pub fn print_assignment(&self, assignment: &Assignment) -> String {
        format!(
            "{} {} {}",
            assignment.lhs.complete_name(),
            assignment.op.symbol(),
            self.print_expression(&assignment.rhs)
        )
    }

    pub fn print_small_stmt(&self, stmt: &SmallStmt) -> String {
        match &stmt.kind {
            SmallStmtKind::Assignment(a) => self.print_assignment(a),
            SmallStmtKind::Call(call) => self.print_call(call),
            SmallStmtKind::Declaration(decl) => self.print_declaration(decl),
            SmallStmtKind::Return(None) => "return".to_string(),
            SmallStmtKind::Return(Some(expr)) => format!("return {}", self.print_expression(expr)),
        }
    }

    /// Print a statement at nesting `depth`, one line per small statement.
    pub fn print_stmt(&self, stmt: &Stmt, depth: usize) -> String {
        let pad = self.indent.repeat(depth);
        match stmt {
            Stmt::Small(small) => format!("{}{}\n", pad, self.print_small_stmt(small)),
            Stmt::Compound(CompoundStmt::If(stmt)) => {
                let mut out = format!(
                    "{}if {}:\n{}",
                    pad,
                    self.print_expression(&stmt.if_clause.condition),
                    self.print_block(&stmt.if_clause.block, depth + 1)
                );
                for clause in &stmt.elif_clauses {
                    out.push_str(&format!(
                        "{}elif {}:\n{}",
                        pad,
                        self.print_expression(&clause.condition),
                        self.print_block(&clause.block, depth + 1)
                    ));
                }
                if let Some(block) = &stmt.else_block {
                    out.push_str(&format!("{}else:\n{}", pad, self.print_block(block, depth + 1)));
                }
                out.push_str(&format!("{}end\n", pad));
                out
            }
            Stmt::Compound(CompoundStmt::While(stmt)) => format!(
                "{}while {}:\n{}{}end\n",
                pad,
                self.print_expression(&stmt.condition),
                self.print_block(&stmt.block, depth + 1),
                pad
            ),
            Stmt::Compound(CompoundStmt::For(stmt)) => format!(
                "{}for {} in {} ... {} step {}:\n{}{}end\n",
                pad,
                stmt.variable,
                self.print_expression(&stmt.start),
                self.print_expression(&stmt.end),
                stmt.step,
                self.print_block(&stmt.block, depth + 1),
                pad
            ),
        }
    }

    pub fn print_block(&self, block: &Block, depth: usize) -> String {
        block.stmts.iter().map(|s| self.print_stmt(s, depth)).collect()
    }

    pub fn print_shape(&self, shape: &OdeShape) -> String {
        format!(
            "shape {} = {}",
            shape.lhs.complete_name(),
            self.print_expression(&shape.rhs)
        )
    }

    fn print_equations_item(&self, item: &EquationsItem) -> String {
        match item {
            EquationsItem::Shape(shape) => self.print_shape(shape),
            EquationsItem::Equation(eq) => format!(
                "{} = {}",
                eq.lhs.complete_name(),
                self.print_expression(&eq.rhs)
            ),
            EquationsItem::Function(func) => format!(
                "{}function {} {} = {}",
                if func.is_recordable { "recordable " } else { "" },
                func.variable_name,
                func.data_type,
                self.print_expression(&func.expression)
            ),
        }
    }

    fn print_input_port(&self, port: &InputPort) -> String {
        let mut out = port.name.clone();
        if let Some(size) = &port.size_parameter {
            out.push_str(&format!("[{}]", size));
        }
        if let Some(data_type) = &port.data_type {
            out.push_str(&format!(" {}", data_type));
        }
        out.push_str(" <- ");
        for qualifier in &port.qualifiers {
            out.push_str(qualifier.keyword());
            out.push(' ');
        }
        out.push_str(port.signal.keyword());
        out
    }

    pub fn print_body_element(&self, element: &BodyElement, depth: usize) -> String {
        let pad = self.indent.repeat(depth);
        let inner = self.indent.repeat(depth + 1);
        match element {
            BodyElement::Variables(block) => format!(
                "{}{}:\n{}{}end\n",
                pad,
                block.kind,
                block
                    .declarations
                    .iter()
                    .map(|d| format!("{}{}\n", inner, self.print_declaration(d)))
                    .join(""),
                pad
            ),
            BodyElement::Equations(block) => format!(
                "{}equations:\n{}{}end\n",
                pad,
                block
                    .declarations
                    .iter()
                    .map(|item| format!("{}{}\n", inner, self.print_equations_item(item)))
                    .join(""),
                pad
            ),
            BodyElement::Input(block) => format!(
                "{}input:\n{}{}end\n",
                pad,
                block
                    .ports
                    .iter()
                    .map(|p| format!("{}{}\n", inner, self.print_input_port(p)))
                    .join(""),
                pad
            ),
            BodyElement::Output(block) => format!("{}output: {}\n", pad, block.signal.keyword()),
            BodyElement::Update(block) => format!(
                "{}update:\n{}{}end\n",
                pad,
                self.print_block(&block.block, depth + 1),
                pad
            ),
            BodyElement::Function(func) => {
                let params = func
                    .parameters
                    .iter()
                    .map(|p| format!("{} {}", p.name, p.data_type))
                    .join(", ");
                let return_type = func
                    .return_type
                    .as_ref()
                    .map(|t| format!(" {}", t))
                    .unwrap_or_default();
                format!(
                    "{}function {}({}){}:\n{}{}end\n",
                    pad,
                    func.name,
                    params,
                    return_type,
                    self.print_block(&func.block, depth + 1),
                    pad
                )
            }
        }
    }

    /// Print a whole model, separating blocks with blank lines.
    pub fn print_model(&self, kind: ModelKind, name: &str, body: &Body) -> String {
        format!(
            "{} {}:\n{}end\n",
            kind.keyword(),
            name,
            body.elements
                .iter()
                .map(|e| self.print_body_element(e, 1))
                .join("\n")
        )
    }

    pub fn print_model_ast(&self, model: &ModelAst) -> String {
        self.print_model(model.kind, &model.name, &model.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::{parse_assignment, parse_expression, parse_model, parse_statement};

    #[test]
    fn test_print_expression() {
        let printer = ModelPrinter::new();
        let expr = parse_expression("-(V_m - E_L)/tau_m + I_e*exp(-h/tau)**2").unwrap();
        assert_eq!(
            printer.print_expression(&expr),
            "-(V_m - E_L) / tau_m + I_e * exp(-h / tau)**2"
        );
    }

    #[test]
    fn test_synthesized_assignment_round_trip() {
        let printer = ModelPrinter::new();
        let text = "I_shape_ex' += spikes_ex * (pA * e / tau_syn_ex)";
        let first = parse_assignment(text).unwrap();
        let again = parse_assignment(&printer.print_assignment(&first)).unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn test_real_literals_stay_real() {
        let printer = ModelPrinter::new();
        let expr = parse_expression("2.0 * 1e-3").unwrap();
        let printed = printer.print_expression(&expr);
        assert_eq!(printed, "2.0 * 0.001");
        assert_eq!(parse_expression(&printed).unwrap(), expr);
    }

    #[test]
    fn test_print_if_statement() {
        let printer = ModelPrinter::new();
        let stmt = parse_statement("if r > 0:\n  r -= 1\nelse:\n  V_m = E_L\nend\n").unwrap();
        assert_eq!(
            printer.print_stmt(&stmt, 0),
            "if r > 0:\n  r -= 1\nelse:\n  V_m = E_L\nend\n"
        );
    }

    #[test]
    fn test_model_round_trip() {
        let source = "neuron n:\n  state:\n    r integer = 0\n  end\n  input:\n    \
                      spikes[n_in] pA <- excitatory spike\n  end\n  output: spike\n  \
                      update:\n    for i in 0 ... 10 step 1:\n      r += i\n    end\n  end\nend\n";
        let printer = ModelPrinter::new();
        let model = parse_model(source).unwrap();
        let printed = printer.print_model_ast(&model);
        assert_eq!(parse_model(&printed).unwrap(), model);
    }
}
