//! Output of an external ODE solver.
//!
//! The solver analyses the equations block and answers with a JSON document.
//! For an exact (propagator) solution it looks like:
//!
//! ```json
//! {
//!   "solver": "analytical",
//!   "shape_state_variables": ["I_shape_in__d", "I_shape_in"],
//!   "initial_values": [{"I_shape_in__d": "pA * e / tau_syn"}, {"I_shape_in": "0"}],
//!   "const_input": {"__const_input": "I_e + currents"},
//!   "propagator_elements": {"__P11": "exp(-__h / tau_syn)"},
//!   "ode_var_update_instructions": ["V_m = __P30 * __const_input + __P33 * V_m"]
//! }
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{FrontendError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolverOutput {
    /// `analytical` for propagator solutions, anything else is numeric
    pub solver: String,

    #[serde(default)]
    pub shape_state_variables: Vec<String>,

    /// Ordered single-entry maps from variable name to initial value text
    #[serde(default)]
    pub initial_values: Vec<IndexMap<String, String>>,

    /// Name and value of the constant-input declaration
    #[serde(default)]
    pub const_input: IndexMap<String, String>,

    /// Propagator matrix entries, in dependency order
    #[serde(default)]
    pub propagator_elements: IndexMap<String, String>,

    /// Statements replacing the integrate call
    #[serde(default)]
    pub ode_var_update_instructions: Vec<String>,
}

impl SolverOutput {
    /// Decode and check a solver document.
    pub fn from_json(text: &str) -> Result<Self> {
        let output: Self = serde_json::from_str(text)?;
        output.check()?;
        Ok(output)
    }

    /// Read a solver document from a file.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| FrontendError::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_json(&text)
    }

    pub fn is_analytical(&self) -> bool {
        self.solver == "analytical"
    }

    fn check(&self) -> Result<()> {
        if let Some(entry) = self.initial_values.iter().find(|entry| entry.len() != 1) {
            return Err(FrontendError::solver_output(format!(
                "initial value entries must hold exactly one variable, found {}",
                entry.len()
            )));
        }
        if self.const_input.len() > 1 {
            return Err(FrontendError::solver_output(
                "at most one constant input may be given",
            ));
        }
        Ok(())
    }
}

/// Pair each shape state variable with the initial value of every solver
/// variable whose name ends with it, in solver order.
pub fn compute_shape_state_variables_with_initial_values(
    output: &SolverOutput,
) -> Vec<(String, String)> {
    let mut result = Vec::new();
    for variable in &output.shape_state_variables {
        for entry in &output.initial_values {
            for (name, value) in entry {
                if name.ends_with(variable.as_str()) {
                    result.push((variable.clone(), value.clone()));
                }
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"{
        "solver": "analytical",
        "shape_state_variables": ["I_shape_in__d", "I_shape_in"],
        "initial_values": [{"I_shape_in__d": "pA * e / tau_syn"}, {"I_shape_in": "0"}],
        "const_input": {"__const_input": "I_e + currents"},
        "propagator_elements": {"__P11": "exp(-__h / tau_syn)", "__P22": "exp(-__h / tau_m)"},
        "ode_var_update_instructions": ["V_m = __P22 * V_m"]
    }"#;

    #[test]
    fn test_decode() {
        let output = SolverOutput::from_json(DOCUMENT).unwrap();
        assert!(output.is_analytical());
        let keys: Vec<_> = output.propagator_elements.keys().collect();
        assert_eq!(keys, vec!["__P11", "__P22"]);
        assert_eq!(output.ode_var_update_instructions.len(), 1);
    }

    #[test]
    fn test_missing_fields_default() {
        let output = SolverOutput::from_json(r#"{"solver": "numeric"}"#).unwrap();
        assert!(!output.is_analytical());
        assert!(output.propagator_elements.is_empty());
    }

    #[test]
    fn test_rejects_malformed() {
        let bad = r#"{"solver": "analytical", "initial_values": [{"a": "1", "b": "2"}]}"#;
        assert!(matches!(
            SolverOutput::from_json(bad),
            Err(FrontendError::InvalidSolverOutput { .. })
        ));
        assert!(matches!(
            SolverOutput::from_json("{"),
            Err(FrontendError::SolverOutputDecode(_))
        ));
    }

    #[test]
    fn test_suffix_matching_keeps_every_pair() {
        let output = SolverOutput {
            solver: "analytical".into(),
            shape_state_variables: vec!["g".into()],
            initial_values: vec![
                IndexMap::from([("iv__g".to_string(), "1".to_string())]),
                IndexMap::from([("g".to_string(), "2".to_string())]),
                IndexMap::from([("h".to_string(), "3".to_string())]),
            ],
            ..Default::default()
        };
        assert_eq!(
            compute_shape_state_variables_with_initial_values(&output),
            vec![("g".to_string(), "1".to_string()), ("g".to_string(), "2".to_string())]
        );
    }

    #[test]
    fn test_shape_state_variables_with_initial_values() {
        let output = SolverOutput::from_json(DOCUMENT).unwrap();
        let values = compute_shape_state_variables_with_initial_values(&output);
        let pairs: Vec<_> = values.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(
            pairs,
            vec![("I_shape_in__d", "pA * e / tau_syn"), ("I_shape_in", "0")]
        );
    }
}
