//! Abstract Syntax Tree types for the model language.
//!
//! Every node carries a [`NodeMeta`] with its source position and the scope
//! stamped onto it by the symbol-table pass. Metadata never takes part in
//! structural equality, so two trees compare equal when they describe the
//! same model regardless of where they came from.

use std::fmt;

use crate::symbols::ScopeId;

/// Position of a node in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SourcePosition {
    /// Line number (1-indexed, 0 for synthesized nodes)
    pub line: usize,
    /// Column number (1-indexed, 0 for synthesized nodes)
    pub column: usize,
}

impl SourcePosition {
    /// Position used for nodes created by transformations.
    pub const ADDED: SourcePosition = SourcePosition { line: 0, column: 0 };

    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Whether the node was synthesized rather than parsed.
    pub fn is_added(&self) -> bool {
        self.line == 0
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_added() {
            write!(f, "<added>")
        } else {
            write!(f, "{}:{}", self.line, self.column)
        }
    }
}

/// Per-node metadata: source position and the scope the node lives in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeMeta {
    pub position: SourcePosition,
    pub scope: Option<ScopeId>,
}

impl NodeMeta {
    pub fn at(position: SourcePosition) -> Self {
        Self {
            position,
            scope: None,
        }
    }

    pub fn added() -> Self {
        Self::at(SourcePosition::ADDED)
    }
}

// Metadata is ignored by structural equality.
impl PartialEq for NodeMeta {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

// ============ Expressions ============

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Real(f64),
    Boolean(bool),
    String(String),
    Inf,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Tilde,
    Not,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Tilde => "~",
            Self::Not => "not ",
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Pow,
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Pow => "**",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Ge => ">=",
            Self::Gt => ">",
            Self::And => "and",
            Self::Or => "or",
        }
    }

    /// Comparison and logical operators yield a boolean.
    pub fn is_boolean(&self) -> bool {
        matches!(
            self,
            Self::Lt | Self::Le | Self::Eq | Self::Ne | Self::Ge | Self::Gt | Self::And | Self::Or
        )
    }
}

/// A reference to a variable, possibly differentiated (`V_m'`).
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub differential_order: usize,
    pub meta: NodeMeta,
}

impl Variable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            differential_order: 0,
            meta: NodeMeta::added(),
        }
    }

    /// Name including one `'` per differentiation order.
    pub fn complete_name(&self) -> String {
        format!("{}{}", self.name, "'".repeat(self.differential_order))
    }

    /// Complete name of the variable one differentiation order lower.
    pub fn lower_order_name(&self) -> String {
        format!(
            "{}{}",
            self.name,
            "'".repeat(self.differential_order.saturating_sub(1))
        )
    }
}

/// A call to a predefined or user-defined function.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<Expression>,
    pub meta: NodeMeta,
}

/// Expression node kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    /// A literal, optionally annotated with a physical unit (`10 mV`)
    Literal { value: Literal, unit: Option<String> },
    Variable(Variable),
    Call(FunctionCall),
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Ternary {
        condition: Box<Expression>,
        if_true: Box<Expression>,
        if_false: Box<Expression>,
    },
    Paren(Box<Expression>),
}

/// An expression together with its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub meta: NodeMeta,
}

impl Expression {
    pub fn new(kind: ExpressionKind, meta: NodeMeta) -> Self {
        Self { kind, meta }
    }

    pub fn as_variable(&self) -> Option<&Variable> {
        match &self.kind {
            ExpressionKind::Variable(var) => Some(var),
            _ => None,
        }
    }

    pub fn as_call(&self) -> Option<&FunctionCall> {
        match &self.kind {
            ExpressionKind::Call(call) => Some(call),
            _ => None,
        }
    }

    /// Visit this expression and every sub-expression, parents first.
    pub fn for_each<'a>(&'a self, f: &mut impl FnMut(&'a Expression)) {
        f(self);
        match &self.kind {
            ExpressionKind::Literal { .. } | ExpressionKind::Variable(_) => {}
            ExpressionKind::Call(call) => {
                for arg in &call.args {
                    arg.for_each(f);
                }
            }
            ExpressionKind::Unary { operand, .. } => operand.for_each(f),
            ExpressionKind::Binary { lhs, rhs, .. } => {
                lhs.for_each(f);
                rhs.for_each(f);
            }
            ExpressionKind::Ternary {
                condition,
                if_true,
                if_false,
            } => {
                condition.for_each(f);
                if_true.for_each(f);
                if_false.for_each(f);
            }
            ExpressionKind::Paren(inner) => inner.for_each(f),
        }
    }

    /// All variables referenced by this expression, in source order.
    pub fn variables(&self) -> Vec<&Variable> {
        let mut vars = Vec::new();
        self.for_each(&mut |expr| {
            if let ExpressionKind::Variable(var) = &expr.kind {
                vars.push(var);
            }
        });
        vars
    }

    /// All function calls in this expression, in source order.
    pub fn calls(&self) -> Vec<&FunctionCall> {
        let mut calls = Vec::new();
        self.for_each(&mut |expr| {
            if let ExpressionKind::Call(call) = &expr.kind {
                calls.push(call);
            }
        });
        calls
    }

    /// Stamp `scope` onto this expression and all of its children.
    pub fn update_scope(&mut self, scope: ScopeId) {
        self.meta.scope = Some(scope);
        match &mut self.kind {
            ExpressionKind::Literal { .. } => {}
            ExpressionKind::Variable(var) => var.meta.scope = Some(scope),
            ExpressionKind::Call(call) => {
                call.meta.scope = Some(scope);
                for arg in &mut call.args {
                    arg.update_scope(scope);
                }
            }
            ExpressionKind::Unary { operand, .. } => operand.update_scope(scope),
            ExpressionKind::Binary { lhs, rhs, .. } => {
                lhs.update_scope(scope);
                rhs.update_scope(scope);
            }
            ExpressionKind::Ternary {
                condition,
                if_true,
                if_false,
            } => {
                condition.update_scope(scope);
                if_true.update_scope(scope);
                if_false.update_scope(scope);
            }
            ExpressionKind::Paren(inner) => inner.update_scope(scope),
        }
    }
}

// ============ Declarations ============

/// A data type as written in the source: a primitive (`real`, `integer`,
/// `boolean`, `string`, `void`) or a unit expression (`mV`, `pA/ms`, `1/ms`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataType(pub String);

impl DataType {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn real() -> Self {
        Self::new("real")
    }

    pub fn integer() -> Self {
        Self::new("integer")
    }

    pub fn boolean() -> Self {
        Self::new("boolean")
    }

    pub fn string() -> Self {
        Self::new("string")
    }

    pub fn void() -> Self {
        Self::new("void")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_boolean(&self) -> bool {
        self.0 == "boolean"
    }

    pub fn is_integer(&self) -> bool {
        self.0 == "integer"
    }

    /// Identifier components of a unit expression (`pA/ms` -> `pA`, `ms`).
    pub fn unit_names(&self) -> impl Iterator<Item = &str> {
        self.0
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|part| !part.is_empty() && !part.chars().all(|c| c.is_ascii_digit()))
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A variable declaration: `recordable function a, b mV[n] = expr [[inv]]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub is_recordable: bool,
    pub is_function: bool,
    pub variables: Vec<Variable>,
    pub data_type: DataType,
    pub size_parameter: Option<String>,
    pub expression: Option<Expression>,
    pub invariant: Option<Expression>,
    pub meta: NodeMeta,
}

impl Declaration {
    pub fn has_invariant(&self) -> bool {
        self.invariant.is_some()
    }

    pub fn scope(&self) -> Option<ScopeId> {
        self.meta.scope
    }

    pub fn set_size_parameter(&mut self, size: impl Into<String>) {
        self.size_parameter = Some(size.into());
    }

    /// Stamp `scope` onto the declaration, its variables and expressions.
    pub fn update_scope(&mut self, scope: ScopeId) {
        self.meta.scope = Some(scope);
        for var in &mut self.variables {
            var.meta.scope = Some(scope);
        }
        if let Some(expr) = &mut self.expression {
            expr.update_scope(scope);
        }
        if let Some(inv) = &mut self.invariant {
            inv.update_scope(scope);
        }
    }
}

// ============ Statements ============

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
}

impl AssignOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Assign => "=",
            Self::Add => "+=",
            Self::Sub => "-=",
            Self::Mul => "*=",
            Self::Div => "/=",
        }
    }
}

/// `lhs op rhs`
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub lhs: Variable,
    pub op: AssignOp,
    pub rhs: Expression,
    pub meta: NodeMeta,
}

impl Assignment {
    pub fn update_scope(&mut self, scope: ScopeId) {
        self.meta.scope = Some(scope);
        self.lhs.meta.scope = Some(scope);
        self.rhs.update_scope(scope);
    }
}

/// Statements that occupy a single line.
#[derive(Debug, Clone, PartialEq)]
pub enum SmallStmtKind {
    Assignment(Assignment),
    Call(FunctionCall),
    Declaration(Declaration),
    Return(Option<Expression>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmallStmt {
    pub kind: SmallStmtKind,
    pub meta: NodeMeta,
}

impl SmallStmt {
    pub fn new(kind: SmallStmtKind) -> Self {
        Self {
            kind,
            meta: NodeMeta::added(),
        }
    }

    /// The call made directly by this statement, if it is a call statement.
    pub fn call(&self) -> Option<&FunctionCall> {
        match &self.kind {
            SmallStmtKind::Call(call) => Some(call),
            _ => None,
        }
    }

    /// Expressions directly owned by the statement.
    pub fn expressions(&self) -> Vec<&Expression> {
        match &self.kind {
            SmallStmtKind::Assignment(a) => vec![&a.rhs],
            SmallStmtKind::Call(call) => call.args.iter().collect(),
            SmallStmtKind::Declaration(d) => d.expression.iter().chain(d.invariant.iter()).collect(),
            SmallStmtKind::Return(expr) => expr.iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfClause {
    pub condition: Expression,
    pub block: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub if_clause: IfClause,
    pub elif_clauses: Vec<IfClause>,
    pub else_block: Option<Block>,
    pub meta: NodeMeta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt {
    pub condition: Expression,
    pub block: Block,
    pub meta: NodeMeta,
}

/// `for variable in start ... end step s:`
#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub variable: String,
    pub start: Expression,
    pub end: Expression,
    pub step: f64,
    pub block: Block,
    pub meta: NodeMeta,
}

/// Statements that own nested blocks.
#[derive(Debug, Clone, PartialEq)]
pub enum CompoundStmt {
    If(IfStmt),
    While(WhileStmt),
    For(ForStmt),
}

impl CompoundStmt {
    /// Nested blocks in source order.
    pub fn blocks(&self) -> Vec<&Block> {
        match self {
            Self::If(stmt) => std::iter::once(&stmt.if_clause.block)
                .chain(stmt.elif_clauses.iter().map(|c| &c.block))
                .chain(stmt.else_block.iter())
                .collect(),
            Self::While(stmt) => vec![&stmt.block],
            Self::For(stmt) => vec![&stmt.block],
        }
    }

    /// Mutable access to the `index`-th nested block (see [`CompoundStmt::blocks`]).
    pub fn block_mut(&mut self, index: usize) -> Option<&mut Block> {
        match self {
            Self::If(stmt) => {
                if index == 0 {
                    return Some(&mut stmt.if_clause.block);
                }
                let n_elif = stmt.elif_clauses.len();
                if index <= n_elif {
                    Some(&mut stmt.elif_clauses[index - 1].block)
                } else if index == n_elif + 1 {
                    stmt.else_block.as_mut()
                } else {
                    None
                }
            }
            Self::While(stmt) if index == 0 => Some(&mut stmt.block),
            Self::For(stmt) if index == 0 => Some(&mut stmt.block),
            _ => None,
        }
    }

    /// Conditions and loop bounds, in source order.
    pub fn expressions(&self) -> Vec<&Expression> {
        match self {
            Self::If(stmt) => std::iter::once(&stmt.if_clause.condition)
                .chain(stmt.elif_clauses.iter().map(|c| &c.condition))
                .collect(),
            Self::While(stmt) => vec![&stmt.condition],
            Self::For(stmt) => vec![&stmt.start, &stmt.end],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Small(SmallStmt),
    Compound(CompoundStmt),
}

impl Stmt {
    pub fn as_small(&self) -> Option<&SmallStmt> {
        match self {
            Self::Small(stmt) => Some(stmt),
            Self::Compound(_) => None,
        }
    }
}

impl From<SmallStmtKind> for Stmt {
    fn from(kind: SmallStmtKind) -> Self {
        Stmt::Small(SmallStmt::new(kind))
    }
}

/// One step of a path from a block down to a nested block:
/// the statement index and which of its nested blocks to enter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockStep {
    pub stmt: usize,
    pub block: usize,
}

/// Location of a statement relative to a root block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StmtPath {
    /// Steps leading to the block that directly contains the statement
    pub steps: Vec<BlockStep>,
    /// Index of the statement inside that block
    pub index: usize,
}

/// A sequence of statements with its own scope.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub meta: NodeMeta,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>) -> Self {
        Self {
            stmts,
            meta: NodeMeta::added(),
        }
    }

    /// All small statements in this block and nested blocks, in source order.
    pub fn small_stmts(&self) -> Vec<&SmallStmt> {
        let mut out = Vec::new();
        for stmt in &self.stmts {
            match stmt {
                Stmt::Small(small) => out.push(small),
                Stmt::Compound(compound) => {
                    for block in compound.blocks() {
                        out.extend(block.small_stmts());
                    }
                }
            }
        }
        out
    }

    /// Every expression owned by statements of this block (recursively).
    pub fn expressions(&self) -> Vec<&Expression> {
        let mut out = Vec::new();
        for stmt in &self.stmts {
            match stmt {
                Stmt::Small(small) => out.extend(small.expressions()),
                Stmt::Compound(compound) => {
                    out.extend(compound.expressions());
                    for block in compound.blocks() {
                        out.extend(block.expressions());
                    }
                }
            }
        }
        out
    }

    /// Every call in this block, including calls nested in expressions.
    pub fn calls(&self) -> Vec<&FunctionCall> {
        let mut out = Vec::new();
        for stmt in &self.stmts {
            match stmt {
                Stmt::Small(small) => {
                    if let Some(call) = small.call() {
                        out.push(call);
                    }
                    for expr in small.expressions() {
                        out.extend(expr.calls());
                    }
                }
                Stmt::Compound(compound) => {
                    for expr in compound.expressions() {
                        out.extend(expr.calls());
                    }
                    for block in compound.blocks() {
                        out.extend(block.calls());
                    }
                }
            }
        }
        out
    }

    /// Locate the statement that contains `target`, comparing by identity.
    ///
    /// Searches the same places as [`Block::calls`]. A call in a condition or
    /// loop bound yields the path of the compound statement itself.
    /// The returned path stays valid until the tree is mutated.
    pub fn path_of_call(&self, target: &FunctionCall) -> Option<StmtPath> {
        let here = |index| StmtPath {
            steps: Vec::new(),
            index,
        };
        for (index, stmt) in self.stmts.iter().enumerate() {
            match stmt {
                Stmt::Small(small) => {
                    let direct = small.call().is_some_and(|c| std::ptr::eq(c, target));
                    if direct || contains_call(&small.expressions(), target) {
                        return Some(here(index));
                    }
                }
                Stmt::Compound(compound) => {
                    if contains_call(&compound.expressions(), target) {
                        return Some(here(index));
                    }
                    for (block_index, block) in compound.blocks().into_iter().enumerate() {
                        if let Some(mut path) = block.path_of_call(target) {
                            path.steps.insert(
                                0,
                                BlockStep {
                                    stmt: index,
                                    block: block_index,
                                },
                            );
                            return Some(path);
                        }
                    }
                }
            }
        }
        None
    }

    /// Follow `steps` down to a nested block.
    pub fn block_at(&self, steps: &[BlockStep]) -> Option<&Block> {
        let Some((first, rest)) = steps.split_first() else {
            return Some(self);
        };
        match self.stmts.get(first.stmt)? {
            Stmt::Compound(compound) => compound.blocks().get(first.block)?.block_at(rest),
            Stmt::Small(_) => None,
        }
    }

    /// Follow `steps` down to a nested block, mutably.
    pub fn block_at_mut(&mut self, steps: &[BlockStep]) -> Option<&mut Block> {
        let Some((first, rest)) = steps.split_first() else {
            return Some(self);
        };
        match self.stmts.get_mut(first.stmt)? {
            Stmt::Compound(compound) => compound.block_mut(first.block)?.block_at_mut(rest),
            Stmt::Small(_) => None,
        }
    }
}

fn contains_call(exprs: &[&Expression], target: &FunctionCall) -> bool {
    exprs
        .iter()
        .any(|e| e.calls().into_iter().any(|c| std::ptr::eq(c, target)))
}

// ============ Equations ============

/// `shape g = expr` or `shape g'' = expr` for kernels in differential form.
#[derive(Debug, Clone, PartialEq)]
pub struct OdeShape {
    pub lhs: Variable,
    pub rhs: Expression,
    pub meta: NodeMeta,
}

impl OdeShape {
    pub fn variable_names(&self) -> Vec<String> {
        vec![self.lhs.complete_name()]
    }

    pub fn update_scope(&mut self, scope: ScopeId) {
        self.meta.scope = Some(scope);
        self.lhs.meta.scope = Some(scope);
        self.rhs.update_scope(scope);
    }
}

/// `V_m' = expr`
#[derive(Debug, Clone, PartialEq)]
pub struct OdeEquation {
    pub lhs: Variable,
    pub rhs: Expression,
    pub meta: NodeMeta,
}

impl OdeEquation {
    pub fn update_scope(&mut self, scope: ScopeId) {
        self.meta.scope = Some(scope);
        self.lhs.meta.scope = Some(scope);
        self.rhs.update_scope(scope);
    }
}

/// `recordable function I_syn pA = expr` inside an equations block.
#[derive(Debug, Clone, PartialEq)]
pub struct OdeFunction {
    pub is_recordable: bool,
    pub variable_name: String,
    pub data_type: DataType,
    pub expression: Expression,
    pub meta: NodeMeta,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EquationsItem {
    Shape(OdeShape),
    Equation(OdeEquation),
    Function(OdeFunction),
}

// ============ Blocks ============

/// Kinds of blocks that hold variable declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    State,
    Parameters,
    Internals,
    InitialValues,
}

impl BlockKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::State => "state",
            Self::Parameters => "parameters",
            Self::Internals => "internals",
            Self::InitialValues => "initial_values",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "state" => Some(Self::State),
            "parameters" => Some(Self::Parameters),
            "internals" => Some(Self::Internals),
            "initial_values" => Some(Self::InitialValues),
            _ => None,
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockWithVariables {
    pub kind: BlockKind,
    pub declarations: Vec<Declaration>,
    pub meta: NodeMeta,
}

impl BlockWithVariables {
    pub fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            declarations: Vec::new(),
            meta: NodeMeta::added(),
        }
    }

    pub fn scope(&self) -> Option<ScopeId> {
        self.meta.scope
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EquationsBlock {
    pub declarations: Vec<EquationsItem>,
    pub meta: NodeMeta,
}

impl EquationsBlock {
    pub fn shapes(&self) -> impl Iterator<Item = &OdeShape> {
        self.declarations.iter().filter_map(|item| match item {
            EquationsItem::Shape(shape) => Some(shape),
            _ => None,
        })
    }

    pub fn ode_equations(&self) -> impl Iterator<Item = &OdeEquation> {
        self.declarations.iter().filter_map(|item| match item {
            EquationsItem::Equation(eq) => Some(eq),
            _ => None,
        })
    }

    pub fn ode_functions(&self) -> impl Iterator<Item = &OdeFunction> {
        self.declarations.iter().filter_map(|item| match item {
            EquationsItem::Function(func) => Some(func),
            _ => None,
        })
    }

    pub fn scope(&self) -> Option<ScopeId> {
        self.meta.scope
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateBlock {
    pub block: Block,
    pub meta: NodeMeta,
}

/// Kind of signal carried by an input port or emitted by a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalType {
    Spike,
    Current,
}

impl SignalType {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Spike => "spike",
            Self::Current => "current",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputQualifier {
    Inhibitory,
    Excitatory,
}

impl InputQualifier {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Inhibitory => "inhibitory",
            Self::Excitatory => "excitatory",
        }
    }
}

/// `spikes pA [n] <- inhibitory excitatory spike`
#[derive(Debug, Clone, PartialEq)]
pub struct InputPort {
    pub name: String,
    pub data_type: Option<DataType>,
    pub size_parameter: Option<String>,
    pub qualifiers: Vec<InputQualifier>,
    pub signal: SignalType,
    pub meta: NodeMeta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputBlock {
    pub ports: Vec<InputPort>,
    pub meta: NodeMeta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputBlock {
    pub signal: SignalType,
    pub meta: NodeMeta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub data_type: DataType,
    pub meta: NodeMeta,
}

/// A user-defined function: `function f(x real) real: ... end`
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<DataType>,
    pub block: Block,
    pub meta: NodeMeta,
}

/// Top-level element of a model body.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyElement {
    Variables(BlockWithVariables),
    Equations(EquationsBlock),
    Input(InputBlock),
    Output(OutputBlock),
    Update(UpdateBlock),
    Function(Function),
}

/// Ordered sequence of blocks forming a model.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Body {
    pub elements: Vec<BodyElement>,
    pub meta: NodeMeta,
}

impl Body {
    /// Every expression in the body, block by block in source order.
    pub fn expressions(&self) -> Vec<&Expression> {
        let mut out = Vec::new();
        for element in &self.elements {
            match element {
                BodyElement::Variables(block) => {
                    for decl in &block.declarations {
                        out.extend(decl.expression.iter().chain(decl.invariant.iter()));
                    }
                }
                BodyElement::Equations(block) => {
                    for item in &block.declarations {
                        out.push(match item {
                            EquationsItem::Shape(shape) => &shape.rhs,
                            EquationsItem::Equation(eq) => &eq.rhs,
                            EquationsItem::Function(func) => &func.expression,
                        });
                    }
                }
                BodyElement::Update(update) => out.extend(update.block.expressions()),
                BodyElement::Function(func) => out.extend(func.block.expressions()),
                BodyElement::Input(_) | BodyElement::Output(_) => {}
            }
        }
        out
    }

    /// Left-hand sides of all assignments in update blocks and functions.
    pub fn assigned_variables(&self) -> Vec<&Variable> {
        self.elements
            .iter()
            .filter_map(|element| match element {
                BodyElement::Update(update) => Some(&update.block),
                BodyElement::Function(func) => Some(&func.block),
                _ => None,
            })
            .flat_map(|block| block.small_stmts())
            .filter_map(|stmt| match &stmt.kind {
                SmallStmtKind::Assignment(assignment) => Some(&assignment.lhs),
                _ => None,
            })
            .collect()
    }
}

/// Whether a model describes a neuron or a synapse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Neuron,
    Synapse,
}

impl ModelKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Neuron => "neuron",
            Self::Synapse => "synapse",
        }
    }
}

/// A parsed model before semantic analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelAst {
    pub kind: ModelKind,
    pub name: String,
    pub body: Body,
    pub meta: NodeMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var_expr(name: &str) -> Expression {
        Expression::new(
            ExpressionKind::Variable(Variable::new(name)),
            NodeMeta::added(),
        )
    }

    #[test]
    fn test_complete_name() {
        let mut var = Variable::new("g_ex");
        var.differential_order = 2;
        assert_eq!(var.complete_name(), "g_ex''");
        assert_eq!(var.lower_order_name(), "g_ex'");
    }

    #[test]
    fn test_meta_ignored_by_equality() {
        let a = Expression::new(
            ExpressionKind::Variable(Variable::new("x")),
            NodeMeta::at(SourcePosition::new(3, 7)),
        );
        assert_eq!(a, var_expr("x"));
        assert_ne!(a, var_expr("y"));
    }

    #[test]
    fn test_unit_names() {
        let ty = DataType::new("pA/ms");
        assert_eq!(ty.unit_names().collect::<Vec<_>>(), vec!["pA", "ms"]);
        let ty = DataType::new("1/(mV*ms**2)");
        assert_eq!(ty.unit_names().collect::<Vec<_>>(), vec!["mV", "ms"]);
    }

    #[test]
    fn test_path_of_nested_call() {
        let call = FunctionCall {
            name: "integrate_odes".to_string(),
            args: vec![],
            meta: NodeMeta::added(),
        };
        let inner = Block::new(vec![SmallStmtKind::Call(call).into()]);
        let outer = Block::new(vec![
            SmallStmtKind::Return(None).into(),
            Stmt::Compound(CompoundStmt::While(WhileStmt {
                condition: var_expr("go"),
                block: inner,
                meta: NodeMeta::added(),
            })),
        ]);

        let target = outer.calls()[0];
        let path = outer.path_of_call(target).unwrap();
        assert_eq!(path.steps, vec![BlockStep { stmt: 1, block: 0 }]);
        assert_eq!(path.index, 0);
        assert_eq!(outer.block_at(&path.steps).unwrap().stmts.len(), 1);
    }

    #[test]
    fn test_path_of_call_in_condition() {
        let call = FunctionCall {
            name: "ready".to_string(),
            args: vec![],
            meta: NodeMeta::added(),
        };
        let condition = Expression::new(ExpressionKind::Call(call), NodeMeta::added());
        let block = Block::new(vec![
            SmallStmtKind::Return(None).into(),
            Stmt::Compound(CompoundStmt::While(WhileStmt {
                condition,
                block: Block::new(vec![SmallStmtKind::Return(None).into()]),
                meta: NodeMeta::added(),
            })),
        ]);

        let calls = block.calls();
        assert_eq!(calls.len(), 1);
        let path = block.path_of_call(calls[0]).unwrap();
        assert!(path.steps.is_empty());
        assert_eq!(path.index, 1);
    }
}
