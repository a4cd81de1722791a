//! Recursive-descent parser for the model language.

use super::ast::*;
use super::lexer::{is_reserved, Lexer, Token, TokenKind};
use crate::error::{FrontendError, Result};

/// Parser over a fully tokenized input.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Tokenize `input` and create a parser positioned at its first token.
    pub fn new(input: &str) -> Result<Self> {
        let tokens = Lexer::new(input).tokenize()?;
        Ok(Self { tokens, pos: 0 })
    }

    /// Parse every model in the input.
    pub fn parse_models(&mut self) -> Result<Vec<ModelAst>> {
        let mut models = Vec::new();
        self.skip_newlines();
        while self.current().kind != TokenKind::Eof {
            models.push(self.parse_model()?);
            self.skip_newlines();
        }
        Ok(models)
    }

    /// Parse `neuron NAME: ... end` or `synapse NAME: ... end`.
    pub fn parse_model(&mut self) -> Result<ModelAst> {
        self.skip_newlines();
        let start = self.current().clone();
        let kind = match start.text.as_str() {
            "neuron" if start.kind == TokenKind::Identifier => ModelKind::Neuron,
            "synapse" if start.kind == TokenKind::Identifier => ModelKind::Synapse,
            _ => return Err(self.error_here("expected 'neuron' or 'synapse'")),
        };
        self.advance();
        let name = self.expect_name()?.text;
        self.expect(TokenKind::Colon)?;
        self.expect_line_end()?;

        let body_start = self.meta_here();
        let mut elements = Vec::new();
        loop {
            self.skip_newlines();
            if self.at_keyword("end") {
                self.advance();
                break;
            }
            if self.current().kind == TokenKind::Eof {
                return Err(self.error_here(format!("missing 'end' for model '{}'", name)));
            }
            elements.push(self.parse_body_element()?);
        }
        self.expect_line_end()?;

        Ok(ModelAst {
            kind,
            name,
            body: Body {
                elements,
                meta: body_start,
            },
            meta: self.meta_of(&start),
        })
    }

    fn parse_body_element(&mut self) -> Result<BodyElement> {
        let tok = self.current().clone();
        if tok.kind != TokenKind::Identifier {
            return Err(self.error_here(format!("unexpected token '{}'", tok.text)));
        }
        if let Some(kind) = BlockKind::from_keyword(&tok.text) {
            return self
                .parse_block_with_variables_of(kind)
                .map(BodyElement::Variables);
        }
        match tok.text.as_str() {
            "equations" => self.parse_equations_block().map(BodyElement::Equations),
            "input" => self.parse_input_block().map(BodyElement::Input),
            "output" => self.parse_output_block().map(BodyElement::Output),
            "update" => self.parse_update_block().map(BodyElement::Update),
            "function" => self.parse_function().map(BodyElement::Function),
            other => Err(self.error_here(format!("unknown block '{}'", other))),
        }
    }

    /// Parse `state: ... end` and the other variable blocks.
    pub fn parse_block_with_variables(&mut self) -> Result<BlockWithVariables> {
        self.skip_newlines();
        let kind = BlockKind::from_keyword(&self.current().text)
            .ok_or_else(|| self.error_here("expected a variable block"))?;
        self.parse_block_with_variables_of(kind)
    }

    fn parse_block_with_variables_of(&mut self, kind: BlockKind) -> Result<BlockWithVariables> {
        let meta = self.meta_here();
        self.advance();
        self.expect(TokenKind::Colon)?;
        self.expect_line_end()?;

        let mut declarations = Vec::new();
        loop {
            self.skip_newlines();
            if self.at_keyword("end") {
                self.advance();
                self.expect_line_end()?;
                break;
            }
            if self.current().kind == TokenKind::Eof {
                return Err(self.error_here(format!("missing 'end' for {} block", kind)));
            }
            declarations.push(self.parse_declaration()?);
            self.expect_line_end()?;
        }

        Ok(BlockWithVariables {
            kind,
            declarations,
            meta,
        })
    }

    /// Parse `equations: ... end`.
    pub fn parse_equations_block(&mut self) -> Result<EquationsBlock> {
        self.skip_newlines();
        let meta = self.meta_here();
        self.expect_keyword("equations")?;
        self.expect(TokenKind::Colon)?;
        self.expect_line_end()?;

        let mut declarations = Vec::new();
        loop {
            self.skip_newlines();
            if self.at_keyword("end") {
                self.advance();
                self.expect_line_end()?;
                break;
            }
            if self.current().kind == TokenKind::Eof {
                return Err(self.error_here("missing 'end' for equations block"));
            }
            declarations.push(self.parse_equations_item()?);
            self.expect_line_end()?;
        }

        Ok(EquationsBlock { declarations, meta })
    }

    fn parse_equations_item(&mut self) -> Result<EquationsItem> {
        let meta = self.meta_here();
        if self.at_keyword("shape") {
            self.advance();
            return self.parse_shape_rest(meta).map(EquationsItem::Shape);
        }
        if self.at_keyword("recordable") || self.at_keyword("function") {
            let is_recordable = self.at_keyword("recordable");
            if is_recordable {
                self.advance();
            }
            self.expect_keyword("function")?;
            let variable_name = self.expect_name()?.text;
            let data_type = self.parse_data_type()?;
            self.expect(TokenKind::Assign)?;
            let expression = self.parse_expression()?;
            return Ok(EquationsItem::Function(OdeFunction {
                is_recordable,
                variable_name,
                data_type,
                expression,
                meta,
            }));
        }

        let lhs = self.parse_variable()?;
        if lhs.differential_order == 0 {
            return Err(FrontendError::parse(
                meta.position.line,
                meta.position.column,
                format!("equation for '{}' must differentiate its left-hand side", lhs.name),
            ));
        }
        self.expect(TokenKind::Assign)?;
        let rhs = self.parse_expression()?;
        Ok(EquationsItem::Equation(OdeEquation { lhs, rhs, meta }))
    }

    /// Parse `shape g = expr` (used by transformations adding kernels).
    pub fn parse_shape(&mut self) -> Result<OdeShape> {
        self.skip_newlines();
        let meta = self.meta_here();
        self.expect_keyword("shape")?;
        self.parse_shape_rest(meta)
    }

    fn parse_shape_rest(&mut self, meta: NodeMeta) -> Result<OdeShape> {
        let lhs = self.parse_variable()?;
        self.expect(TokenKind::Assign)?;
        let rhs = self.parse_expression()?;
        Ok(OdeShape { lhs, rhs, meta })
    }

    fn parse_input_block(&mut self) -> Result<InputBlock> {
        let meta = self.meta_here();
        self.expect_keyword("input")?;
        self.expect(TokenKind::Colon)?;
        self.expect_line_end()?;

        let mut ports = Vec::new();
        loop {
            self.skip_newlines();
            if self.at_keyword("end") {
                self.advance();
                self.expect_line_end()?;
                break;
            }
            if self.current().kind == TokenKind::Eof {
                return Err(self.error_here("missing 'end' for input block"));
            }
            ports.push(self.parse_input_port()?);
            self.expect_line_end()?;
        }
        Ok(InputBlock { ports, meta })
    }

    fn parse_input_port(&mut self) -> Result<InputPort> {
        let meta = self.meta_here();
        let name = self.expect_name()?.text;

        let size_parameter = if self.current().kind == TokenKind::OpenBracket {
            self.advance();
            let size = self.expect_name()?.text;
            self.expect(TokenKind::CloseBracket)?;
            Some(size)
        } else {
            None
        };

        let data_type = if self.current().kind == TokenKind::LeftArrow {
            None
        } else {
            Some(self.parse_data_type()?)
        };
        self.expect(TokenKind::LeftArrow)?;

        let mut qualifiers = Vec::new();
        loop {
            if self.at_keyword("inhibitory") {
                qualifiers.push(InputQualifier::Inhibitory);
            } else if self.at_keyword("excitatory") {
                qualifiers.push(InputQualifier::Excitatory);
            } else {
                break;
            }
            self.advance();
        }

        let signal = self.parse_signal_type()?;
        Ok(InputPort {
            name,
            data_type,
            size_parameter,
            qualifiers,
            signal,
            meta,
        })
    }

    fn parse_signal_type(&mut self) -> Result<SignalType> {
        let signal = if self.at_keyword("spike") {
            SignalType::Spike
        } else if self.at_keyword("current") {
            SignalType::Current
        } else {
            return Err(self.error_here("expected 'spike' or 'current'"));
        };
        self.advance();
        Ok(signal)
    }

    fn parse_output_block(&mut self) -> Result<OutputBlock> {
        let meta = self.meta_here();
        self.expect_keyword("output")?;
        self.expect(TokenKind::Colon)?;
        let signal = self.parse_signal_type()?;
        self.expect_line_end()?;
        Ok(OutputBlock { signal, meta })
    }

    /// Parse `update: ... end`.
    pub fn parse_update_block(&mut self) -> Result<UpdateBlock> {
        self.skip_newlines();
        let meta = self.meta_here();
        self.expect_keyword("update")?;
        self.expect(TokenKind::Colon)?;
        self.expect_line_end()?;
        let block = self.parse_block()?;
        self.expect_keyword("end")?;
        self.expect_line_end()?;
        Ok(UpdateBlock { block, meta })
    }

    fn parse_function(&mut self) -> Result<Function> {
        let meta = self.meta_here();
        self.expect_keyword("function")?;
        let name = self.expect_name()?.text;
        self.expect(TokenKind::OpenParen)?;

        let mut parameters = Vec::new();
        while self.current().kind != TokenKind::CloseParen {
            let param_meta = self.meta_here();
            let param_name = self.expect_name()?.text;
            let data_type = self.parse_data_type()?;
            parameters.push(Parameter {
                name: param_name,
                data_type,
                meta: param_meta,
            });
            if self.current().kind == TokenKind::Comma {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::CloseParen)?;

        let return_type = if self.current().kind == TokenKind::Colon {
            None
        } else {
            Some(self.parse_data_type()?)
        };
        self.expect(TokenKind::Colon)?;
        self.expect_line_end()?;
        let block = self.parse_block()?;
        self.expect_keyword("end")?;
        self.expect_line_end()?;

        Ok(Function {
            name,
            parameters,
            return_type,
            block,
            meta,
        })
    }

    /// Parse statements up to (not including) `end`, `elif` or `else`.
    fn parse_block(&mut self) -> Result<Block> {
        let meta = self.meta_here();
        let mut stmts = Vec::new();
        loop {
            self.skip_newlines();
            if self.at_keyword("end") || self.at_keyword("elif") || self.at_keyword("else") {
                break;
            }
            if self.current().kind == TokenKind::Eof {
                return Err(self.error_here("missing 'end'"));
            }
            stmts.push(self.parse_stmt()?);
        }
        Ok(Block { stmts, meta })
    }

    /// Parse one statement including its line terminator.
    pub fn parse_stmt(&mut self) -> Result<Stmt> {
        self.skip_newlines();
        let meta = self.meta_here();

        if self.at_keyword("if") {
            return self.parse_if(meta).map(|s| Stmt::Compound(CompoundStmt::If(s)));
        }
        if self.at_keyword("while") {
            self.advance();
            let condition = self.parse_expression()?;
            self.expect(TokenKind::Colon)?;
            self.expect_line_end()?;
            let block = self.parse_block()?;
            self.expect_keyword("end")?;
            self.expect_line_end()?;
            return Ok(Stmt::Compound(CompoundStmt::While(WhileStmt {
                condition,
                block,
                meta,
            })));
        }
        if self.at_keyword("for") {
            return self
                .parse_for(meta)
                .map(|s| Stmt::Compound(CompoundStmt::For(s)));
        }

        let kind = self.parse_small_stmt_kind()?;
        self.expect_line_end()?;
        Ok(Stmt::Small(SmallStmt { kind, meta }))
    }

    fn parse_small_stmt_kind(&mut self) -> Result<SmallStmtKind> {
        if self.at_keyword("return") {
            self.advance();
            if matches!(self.current().kind, TokenKind::Newline | TokenKind::Eof) {
                return Ok(SmallStmtKind::Return(None));
            }
            return Ok(SmallStmtKind::Return(Some(self.parse_expression()?)));
        }
        if self.at_keyword("recordable") || self.at_keyword("function") {
            return self.parse_declaration().map(SmallStmtKind::Declaration);
        }
        if self.current().kind != TokenKind::Identifier {
            return Err(self.error_here(format!(
                "expected a statement, found '{}'",
                self.current().text
            )));
        }

        match self.peek(1).kind {
            TokenKind::OpenParen => {
                let call = self.parse_call()?;
                Ok(SmallStmtKind::Call(call))
            }
            TokenKind::Prime
            | TokenKind::Assign
            | TokenKind::PlusAssign
            | TokenKind::MinusAssign
            | TokenKind::StarAssign
            | TokenKind::SlashAssign => self.parse_assignment().map(SmallStmtKind::Assignment),
            _ => self.parse_declaration().map(SmallStmtKind::Declaration),
        }
    }

    fn parse_if(&mut self, meta: NodeMeta) -> Result<IfStmt> {
        self.expect_keyword("if")?;
        let if_clause = self.parse_if_clause()?;

        let mut elif_clauses = Vec::new();
        while self.at_keyword("elif") {
            self.advance();
            elif_clauses.push(self.parse_if_clause()?);
        }

        let else_block = if self.at_keyword("else") {
            self.advance();
            self.expect(TokenKind::Colon)?;
            self.expect_line_end()?;
            Some(self.parse_block()?)
        } else {
            None
        };

        self.expect_keyword("end")?;
        self.expect_line_end()?;
        Ok(IfStmt {
            if_clause,
            elif_clauses,
            else_block,
            meta,
        })
    }

    fn parse_if_clause(&mut self) -> Result<IfClause> {
        let condition = self.parse_expression()?;
        self.expect(TokenKind::Colon)?;
        self.expect_line_end()?;
        let block = self.parse_block()?;
        Ok(IfClause { condition, block })
    }

    fn parse_for(&mut self, meta: NodeMeta) -> Result<ForStmt> {
        self.expect_keyword("for")?;
        let variable = self.expect_name()?.text;
        self.expect_keyword("in")?;
        let start = self.parse_expression()?;
        self.expect(TokenKind::Ellipsis)?;
        let end = self.parse_expression()?;
        self.expect_keyword("step")?;

        let negative = self.current().kind == TokenKind::Minus;
        if negative {
            self.advance();
        }
        let tok = self.current().clone();
        let magnitude: f64 = match tok.kind {
            TokenKind::Integer | TokenKind::Real => tok
                .text
                .parse()
                .map_err(|_| self.error_at(&tok, format!("invalid step '{}'", tok.text)))?,
            _ => return Err(self.error_here("expected a numeric step")),
        };
        self.advance();
        let step = if negative { -magnitude } else { magnitude };

        self.expect(TokenKind::Colon)?;
        self.expect_line_end()?;
        let block = self.parse_block()?;
        self.expect_keyword("end")?;
        self.expect_line_end()?;

        Ok(ForStmt {
            variable,
            start,
            end,
            step,
            block,
            meta,
        })
    }

    /// Parse `lhs op rhs` without the line terminator.
    pub fn parse_assignment(&mut self) -> Result<Assignment> {
        self.skip_newlines();
        let meta = self.meta_here();
        let lhs = self.parse_variable()?;
        let op = match self.current().kind {
            TokenKind::Assign => AssignOp::Assign,
            TokenKind::PlusAssign => AssignOp::Add,
            TokenKind::MinusAssign => AssignOp::Sub,
            TokenKind::StarAssign => AssignOp::Mul,
            TokenKind::SlashAssign => AssignOp::Div,
            _ => return Err(self.error_here("expected an assignment operator")),
        };
        self.advance();
        let rhs = self.parse_expression()?;
        Ok(Assignment { lhs, op, rhs, meta })
    }

    /// Parse a declaration without the line terminator.
    pub fn parse_declaration(&mut self) -> Result<Declaration> {
        self.skip_newlines();
        let meta = self.meta_here();

        let is_recordable = self.at_keyword("recordable");
        if is_recordable {
            self.advance();
        }
        let is_function = self.at_keyword("function");
        if is_function {
            self.advance();
        }

        let mut variables = vec![self.parse_variable()?];
        while self.current().kind == TokenKind::Comma {
            self.advance();
            variables.push(self.parse_variable()?);
        }

        let data_type = self.parse_data_type()?;

        let size_parameter = if self.current().kind == TokenKind::OpenBracket {
            self.advance();
            let tok = self.current().clone();
            if !matches!(tok.kind, TokenKind::Identifier | TokenKind::Integer) {
                return Err(self.error_here("expected a size parameter"));
            }
            self.advance();
            self.expect(TokenKind::CloseBracket)?;
            Some(tok.text)
        } else {
            None
        };

        let expression = if self.current().kind == TokenKind::Assign {
            self.advance();
            Some(self.parse_expression()?)
        } else {
            None
        };

        let invariant = if self.current().kind == TokenKind::OpenInvariant {
            self.advance();
            let inv = self.parse_expression()?;
            self.expect(TokenKind::CloseInvariant)?;
            Some(inv)
        } else {
            None
        };

        Ok(Declaration {
            is_recordable,
            is_function,
            variables,
            data_type,
            size_parameter,
            expression,
            invariant,
            meta,
        })
    }

    /// Parse a primitive type name or a unit expression into its compact text.
    pub fn parse_data_type(&mut self) -> Result<DataType> {
        let text = self.parse_unit_term()?;
        Ok(DataType(text))
    }

    fn parse_unit_term(&mut self) -> Result<String> {
        let mut text = self.parse_unit_factor()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Star => "*",
                TokenKind::Slash => "/",
                _ => break,
            };
            self.advance();
            text.push_str(op);
            text.push_str(&self.parse_unit_factor()?);
        }
        Ok(text)
    }

    fn parse_unit_factor(&mut self) -> Result<String> {
        let mut text = self.parse_unit_base()?;
        if self.current().kind == TokenKind::StarStar {
            self.advance();
            text.push_str("**");
            if self.current().kind == TokenKind::Minus {
                self.advance();
                text.push('-');
            }
            let exponent = self.expect(TokenKind::Integer)?;
            text.push_str(&exponent.text);
        }
        Ok(text)
    }

    fn parse_unit_base(&mut self) -> Result<String> {
        let tok = self.current().clone();
        match tok.kind {
            TokenKind::Identifier if !is_reserved(&tok.text) => {
                self.advance();
                Ok(tok.text)
            }
            TokenKind::Integer => {
                self.advance();
                Ok(tok.text)
            }
            TokenKind::OpenParen => {
                self.advance();
                let inner = self.parse_unit_term()?;
                self.expect(TokenKind::CloseParen)?;
                Ok(format!("({})", inner))
            }
            _ => Err(self.error_here(format!("expected a data type, found '{}'", tok.text))),
        }
    }

    /// Parse a variable reference with optional derivative marks.
    pub fn parse_variable(&mut self) -> Result<Variable> {
        let meta = self.meta_here();
        let name = self.expect_name()?.text;
        let mut differential_order = 0;
        while self.current().kind == TokenKind::Prime {
            self.advance();
            differential_order += 1;
        }
        Ok(Variable {
            name,
            differential_order,
            meta,
        })
    }

    fn parse_call(&mut self) -> Result<FunctionCall> {
        let meta = self.meta_here();
        let name = self.expect_name()?.text;
        self.expect(TokenKind::OpenParen)?;
        let mut args = Vec::new();
        while self.current().kind != TokenKind::CloseParen {
            args.push(self.parse_expression()?);
            if self.current().kind == TokenKind::Comma {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::CloseParen)?;
        Ok(FunctionCall { name, args, meta })
    }

    // ============ Expressions ============

    /// Parse a full expression, including the conditional operator.
    pub fn parse_expression(&mut self) -> Result<Expression> {
        let meta = self.meta_here();
        let condition = self.parse_or()?;
        if self.current().kind != TokenKind::Question {
            return Ok(condition);
        }
        self.advance();
        let if_true = self.parse_expression()?;
        self.expect(TokenKind::Colon)?;
        let if_false = self.parse_expression()?;
        Ok(Expression::new(
            ExpressionKind::Ternary {
                condition: Box::new(condition),
                if_true: Box::new(if_true),
                if_false: Box::new(if_false),
            },
            meta,
        ))
    }

    fn parse_or(&mut self) -> Result<Expression> {
        let mut lhs = self.parse_and()?;
        while self.at_keyword("or") {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = binary(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expression> {
        let mut lhs = self.parse_not()?;
        while self.at_keyword("and") {
            self.advance();
            let rhs = self.parse_not()?;
            lhs = binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expression> {
        if self.at_keyword("not") {
            let meta = self.meta_here();
            self.advance();
            let operand = self.parse_not()?;
            return Ok(Expression::new(
                ExpressionKind::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                },
                meta,
            ));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expression> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Le => BinaryOp::Le,
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::Ne,
                TokenKind::Ge => BinaryOp::Ge,
                TokenKind::Gt => BinaryOp::Gt,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_additive()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_additive(&mut self) -> Result<Expression> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expression> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_unary(&mut self) -> Result<Expression> {
        let op = match self.current().kind {
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Minus,
            TokenKind::Tilde => UnaryOp::Tilde,
            _ => return self.parse_power(),
        };
        let meta = self.meta_here();
        self.advance();
        let operand = self.parse_unary()?;
        Ok(Expression::new(
            ExpressionKind::Unary {
                op,
                operand: Box::new(operand),
            },
            meta,
        ))
    }

    fn parse_power(&mut self) -> Result<Expression> {
        let base = self.parse_primary()?;
        if self.current().kind != TokenKind::StarStar {
            return Ok(base);
        }
        self.advance();
        // Right-associative; the exponent may carry a sign
        let exponent = self.parse_unary()?;
        Ok(binary(BinaryOp::Pow, base, exponent))
    }

    fn parse_primary(&mut self) -> Result<Expression> {
        let tok = self.current().clone();
        let meta = self.meta_of(&tok);

        match tok.kind {
            TokenKind::OpenParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(TokenKind::CloseParen)?;
                Ok(Expression::new(ExpressionKind::Paren(Box::new(inner)), meta))
            }
            TokenKind::Integer | TokenKind::Real => {
                self.advance();
                let value = if tok.kind == TokenKind::Integer {
                    tok.text
                        .parse::<i64>()
                        .map(Literal::Integer)
                        .map_err(|_| self.error_at(&tok, "integer literal out of range"))?
                } else {
                    tok.text
                        .parse::<f64>()
                        .map(Literal::Real)
                        .map_err(|_| self.error_at(&tok, "invalid real literal"))?
                };
                let unit = self.parse_literal_unit();
                Ok(Expression::new(ExpressionKind::Literal { value, unit }, meta))
            }
            TokenKind::String => {
                self.advance();
                Ok(Expression::new(
                    ExpressionKind::Literal {
                        value: Literal::String(tok.text),
                        unit: None,
                    },
                    meta,
                ))
            }
            TokenKind::Identifier => {
                let literal = match tok.text.as_str() {
                    "true" => Some(Literal::Boolean(true)),
                    "false" => Some(Literal::Boolean(false)),
                    "inf" => Some(Literal::Inf),
                    _ => None,
                };
                if let Some(value) = literal {
                    self.advance();
                    return Ok(Expression::new(
                        ExpressionKind::Literal { value, unit: None },
                        meta,
                    ));
                }
                if self.peek(1).kind == TokenKind::OpenParen {
                    let call = self.parse_call()?;
                    return Ok(Expression::new(ExpressionKind::Call(call), meta));
                }
                let var = self.parse_variable()?;
                Ok(Expression::new(ExpressionKind::Variable(var), meta))
            }
            _ => Err(self.error_here(format!("expected an expression, found '{}'", tok.text))),
        }
    }

    /// A name directly following a number on the same line is its unit.
    fn parse_literal_unit(&mut self) -> Option<String> {
        let tok = self.current();
        if tok.kind == TokenKind::Identifier
            && !is_reserved(&tok.text)
            && self.peek(1).kind != TokenKind::OpenParen
        {
            let unit = tok.text.clone();
            self.advance();
            Some(unit)
        } else {
            None
        }
    }

    // ============ Token helpers ============

    fn current(&self) -> &Token {
        self.peek(0)
    }

    fn peek(&self, offset: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + offset).min(last)]
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        let tok = self.current();
        tok.kind == TokenKind::Identifier && tok.text == keyword
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if self.current().kind == kind {
            let tok = self.current().clone();
            self.advance();
            Ok(tok)
        } else {
            Err(self.error_here(format!(
                "expected {:?}, got {:?} '{}'",
                kind,
                self.current().kind,
                self.current().text
            )))
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.at_keyword(keyword) {
            self.advance();
            Ok(())
        } else {
            Err(self.error_here(format!(
                "expected '{}', got '{}'",
                keyword,
                self.current().text
            )))
        }
    }

    fn expect_name(&mut self) -> Result<Token> {
        let tok = self.current().clone();
        if tok.kind == TokenKind::Identifier && !is_reserved(&tok.text) {
            self.advance();
            Ok(tok)
        } else {
            Err(self.error_here(format!("expected a name, got '{}'", tok.text)))
        }
    }

    fn expect_line_end(&mut self) -> Result<()> {
        match self.current().kind {
            TokenKind::Newline => {
                self.advance();
                Ok(())
            }
            TokenKind::Eof => Ok(()),
            _ => Err(self.error_here(format!(
                "expected end of line, got '{}'",
                self.current().text
            ))),
        }
    }

    fn skip_newlines(&mut self) {
        while self.current().kind == TokenKind::Newline {
            self.advance();
        }
    }

    /// Fail unless only blank lines remain.
    pub fn expect_eof(&mut self) -> Result<()> {
        self.skip_newlines();
        if self.current().kind == TokenKind::Eof {
            Ok(())
        } else {
            Err(self.error_here(format!("unexpected trailing '{}'", self.current().text)))
        }
    }

    fn meta_of(&self, tok: &Token) -> NodeMeta {
        NodeMeta::at(SourcePosition::new(tok.line, tok.column))
    }

    fn meta_here(&self) -> NodeMeta {
        self.meta_of(self.current())
    }

    fn error_at(&self, tok: &Token, message: impl Into<String>) -> FrontendError {
        FrontendError::parse(tok.line, tok.column, message)
    }

    fn error_here(&self, message: impl Into<String>) -> FrontendError {
        self.error_at(self.current(), message)
    }
}

fn binary(op: BinaryOp, lhs: Expression, rhs: Expression) -> Expression {
    let meta = lhs.meta;
    Expression::new(
        ExpressionKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        meta,
    )
}
