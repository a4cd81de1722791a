//! Diagnostics collected while analysing and transforming models.
//!
//! Every reported diagnostic is kept in order and also forwarded to the
//! [`log`] facade at the matching level, so a binary that installs a logger
//! sees findings as they happen.

use std::fmt;

use serde::Serialize;

use crate::dsl::SourcePosition;

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn log_level(&self) -> log::Level {
        match self {
            Self::Info => log::Level::Info,
            Self::Warning => log::Level::Warn,
            Self::Error => log::Level::Error,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        };
        write!(f, "{}", text)
    }
}

/// Stable identifiers for diagnostic messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MessageCode {
    /// The update block contains no integrate call
    OdeSolutionNotUsed,
    /// A name could not be resolved in any enclosing scope
    CouldNotResolve,
    /// A name was declared twice in the same scope
    VariableRedeclared,
    /// More than one block of a kind that allows at most one
    BlockMultiplicity,
    /// A data type names no known type or unit
    UnknownType,
    /// An invariant is not a boolean expression
    InvariantNotBoolean,
    /// The type of an invariant could not be derived
    InvariantTypeUnknown,
    /// Arguments of a convolution built-in are not a shape and a spike buffer
    ConvolveArguments,
    /// The integrate built-in is called more than once
    MultipleIntegrateCalls,
    /// A transformation step was applied
    TransformationApplied,
}

/// A single finding about a model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: MessageCode,
    pub message: String,
    #[serde(serialize_with = "serialize_position")]
    pub position: SourcePosition,
    /// Name of the model the diagnostic belongs to, if known
    pub model: Option<String>,
}

fn serialize_position<S: serde::Serializer>(
    position: &SourcePosition,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(position)
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}", self.severity)?;
        if let Some(model) = &self.model {
            write!(f, ", {}", model)?;
        }
        write!(f, ", {}] {:?}: {}", self.position, self.code, self.message)
    }
}

/// Ordered sink of diagnostics.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    model: Option<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attribute subsequent diagnostics to `model`.
    pub fn set_current_model(&mut self, model: Option<&str>) {
        self.model = model.map(str::to_string);
    }

    /// Record a diagnostic and forward it to the logger.
    pub fn report(
        &mut self,
        severity: Severity,
        code: MessageCode,
        message: impl Into<String>,
        position: SourcePosition,
    ) {
        let diagnostic = Diagnostic {
            severity,
            code,
            message: message.into(),
            position,
            model: self.model.clone(),
        };
        log::log!(severity.log_level(), "{}", diagnostic);
        self.entries.push(diagnostic);
    }

    pub fn info(&mut self, code: MessageCode, message: impl Into<String>, position: SourcePosition) {
        self.report(Severity::Info, code, message, position);
    }

    pub fn warning(
        &mut self,
        code: MessageCode,
        message: impl Into<String>,
        position: SourcePosition,
    ) {
        self.report(Severity::Warning, code, message, position);
    }

    pub fn error(&mut self, code: MessageCode, message: impl Into<String>, position: SourcePosition) {
        self.report(Severity::Error, code, message, position);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.entries.iter().filter(|d| d.severity == severity).count()
    }

    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0
    }

    pub fn has_code(&self, code: MessageCode) -> bool {
        self.entries.iter().any(|d| d.code == code)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_keeps_order_and_model() {
        let _ = env_logger::builder().is_test(true).try_init();

        let mut diags = Diagnostics::new();
        diags.set_current_model(Some("iaf_psc_alpha"));
        diags.info(
            MessageCode::OdeSolutionNotUsed,
            "no integrate_odes call",
            SourcePosition::ADDED,
        );
        diags.error(
            MessageCode::CouldNotResolve,
            "could not resolve 'V_x'",
            SourcePosition::new(4, 9),
        );

        assert_eq!(diags.len(), 2);
        assert!(diags.has_errors());
        assert_eq!(diags.count(Severity::Info), 1);
        let codes: Vec<_> = diags.iter().map(|d| d.code).collect();
        assert_eq!(
            codes,
            vec![MessageCode::OdeSolutionNotUsed, MessageCode::CouldNotResolve]
        );
        assert_eq!(
            diags.iter().last().unwrap().to_string(),
            "[ERROR, iaf_psc_alpha, 4:9] CouldNotResolve: could not resolve 'V_x'"
        );
    }

    #[test]
    fn test_serialize() {
        let mut diags = Diagnostics::new();
        diags.warning(MessageCode::UnknownType, "unknown unit", SourcePosition::new(2, 3));
        let json = serde_json::to_value(diags.iter().next().unwrap()).unwrap();
        assert_eq!(json["position"], "2:3");
        assert_eq!(json["severity"], "Warning");
    }
}
