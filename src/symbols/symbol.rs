//! Symbols: named, typed entities declared by a model.

use std::fmt;

use serde::Serialize;

use super::ScopeId;
use crate::dsl::{BlockKind, DataType, Expression, SourcePosition};

/// Handle to a symbol stored in a [`SymbolTable`](super::SymbolTable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SymbolId(pub(crate) u32);

impl SymbolId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SymbolKind {
    Variable,
    Function,
    Type,
}

/// The logical block a symbol was declared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BlockType {
    State,
    Parameters,
    Internals,
    InitialValues,
    Equation,
    InputBufferSpike,
    InputBufferCurrent,
    Output,
    Local,
    Predefined,
}

impl From<BlockKind> for BlockType {
    fn from(kind: BlockKind) -> Self {
        match kind {
            BlockKind::State => BlockType::State,
            BlockKind::Parameters => BlockType::Parameters,
            BlockKind::Internals => BlockType::Internals,
            BlockKind::InitialValues => BlockType::InitialValues,
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::State => "state",
            Self::Parameters => "parameters",
            Self::Internals => "internals",
            Self::InitialValues => "initial_values",
            Self::Equation => "equations",
            Self::InputBufferSpike => "spike input",
            Self::InputBufferCurrent => "current input",
            Self::Output => "output",
            Self::Local => "local",
            Self::Predefined => "predefined",
        };
        write!(f, "{}", text)
    }
}

/// A named entity with its type and the flags analysis relies on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub block_type: BlockType,
    #[serde(serialize_with = "serialize_data_type")]
    pub data_type: Option<DataType>,
    /// Alias declared with `function`
    pub is_function: bool,
    pub is_predefined: bool,
    pub is_recordable: bool,
    pub is_inhibitory: bool,
    pub is_excitatory: bool,
    /// Size parameter of a vector variable or buffer
    pub vector_parameter: Option<String>,
    #[serde(skip)]
    pub declaring_expression: Option<Expression>,
    /// Right-hand side of the ODE defining this variable's derivative
    #[serde(skip)]
    pub ode_definition: Option<Expression>,
    #[serde(skip)]
    pub parameter_types: Vec<DataType>,
    #[serde(skip)]
    pub return_type: Option<DataType>,
    #[serde(serialize_with = "serialize_position")]
    pub position: SourcePosition,
    #[serde(skip)]
    pub scope: Option<ScopeId>,
}

fn serialize_data_type<S: serde::Serializer>(
    data_type: &Option<DataType>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match data_type {
        Some(t) => serializer.serialize_some(t.as_str()),
        None => serializer.serialize_none(),
    }
}

fn serialize_position<S: serde::Serializer>(
    position: &SourcePosition,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(position)
}

impl Symbol {
    /// A variable symbol with every flag cleared.
    pub fn variable(name: impl Into<String>, block_type: BlockType, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            kind: SymbolKind::Variable,
            block_type,
            data_type: Some(data_type),
            is_function: false,
            is_predefined: false,
            is_recordable: false,
            is_inhibitory: false,
            is_excitatory: false,
            vector_parameter: None,
            declaring_expression: None,
            ode_definition: None,
            parameter_types: Vec::new(),
            return_type: None,
            position: SourcePosition::ADDED,
            scope: None,
        }
    }

    pub fn function(
        name: impl Into<String>,
        parameter_types: Vec<DataType>,
        return_type: Option<DataType>,
    ) -> Self {
        Self {
            kind: SymbolKind::Function,
            data_type: None,
            parameter_types,
            return_type,
            ..Self::variable(name, BlockType::Local, DataType::void())
        }
    }

    pub fn type_symbol(name: impl Into<String>) -> Self {
        Self {
            kind: SymbolKind::Type,
            data_type: None,
            block_type: BlockType::Predefined,
            is_predefined: true,
            ..Self::variable(name, BlockType::Predefined, DataType::void())
        }
    }

    pub fn has_vector_parameter(&self) -> bool {
        self.vector_parameter.is_some()
    }

    pub fn is_spike_buffer(&self) -> bool {
        self.block_type == BlockType::InputBufferSpike
    }

    pub fn is_current_buffer(&self) -> bool {
        self.block_type == BlockType::InputBufferCurrent
    }

    pub fn is_buffer(&self) -> bool {
        self.is_spike_buffer() || self.is_current_buffer()
    }

    pub fn has_declaring_expression(&self) -> bool {
        self.declaring_expression.is_some()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(data_type) = &self.data_type {
            write!(f, " {}", data_type)?;
        }
        if let Some(size) = &self.vector_parameter {
            write!(f, "[{}]", size)?;
        }
        write!(f, " ({:?}, {}", self.kind, self.block_type)?;
        if self.is_function {
            write!(f, ", alias")?;
        }
        if self.is_recordable {
            write!(f, ", recordable")?;
        }
        if self.is_predefined {
            write!(f, ", predefined")?;
        }
        write!(f, ")")
    }
}
