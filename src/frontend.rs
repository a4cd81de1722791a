//! Main front-end interface.

use std::path::Path;

use crate::config::FrontendConfig;
use crate::diagnostics::Diagnostics;
use crate::dsl::{self, ModelAst};
use crate::error::Result;
use crate::model::{validate_model, NeuronOrSynapse};
use crate::symbols::PredefinedRegistry;
use crate::transform::{SolverOutput, Transformer};

/// Parses, analyses and validates models, and applies solver output to them.
///
/// Owns the predefined registry and collects diagnostics across every model
/// it processes.
#[derive(Debug)]
pub struct Frontend {
    registry: PredefinedRegistry,
    config: FrontendConfig,
    diagnostics: Diagnostics,
}

impl Default for Frontend {
    fn default() -> Self {
        Self::new()
    }
}

impl Frontend {
    pub fn new() -> Self {
        Self::with_config(FrontendConfig::default())
    }

    pub fn with_config(config: FrontendConfig) -> Self {
        Self {
            registry: PredefinedRegistry::new(),
            config,
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn config(&self) -> &FrontendConfig {
        &self.config
    }

    pub fn registry(&self) -> &PredefinedRegistry {
        &self.registry
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Parse every model in `source` and build its symbol table.
    ///
    /// Reference errors are recorded as diagnostics, not returned.
    pub fn analyse_str(&mut self, source: &str, artifact_name: &str) -> Result<Vec<NeuronOrSynapse>> {
        let asts = dsl::parse_models(source)?;
        Ok(self.analyse_models(asts, artifact_name))
    }

    /// Parse, analyse and validate every model in `source`.
    pub fn load_str(&mut self, source: &str, artifact_name: &str) -> Result<Vec<NeuronOrSynapse>> {
        let models = self.analyse_str(source, artifact_name)?;
        self.validate_models(&models)?;
        Ok(models)
    }

    /// Parse, analyse and validate every model in a file.
    ///
    /// The file name becomes the artifact name of each model.
    pub fn load_file(&mut self, path: &Path) -> Result<Vec<NeuronOrSynapse>> {
        let asts = dsl::parse_file(path)?;
        let artifact_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let models = self.analyse_models(asts, &artifact_name);
        self.validate_models(&models)?;
        Ok(models)
    }

    fn analyse_models(&mut self, asts: Vec<ModelAst>, artifact_name: &str) -> Vec<NeuronOrSynapse> {
        log::info!("parsed {} model(s) from {}", asts.len(), artifact_name);
        asts.into_iter()
            .map(|ast| NeuronOrSynapse::analyse(ast, artifact_name, &self.registry, &mut self.diagnostics))
            .collect()
    }

    fn validate_models(&mut self, models: &[NeuronOrSynapse]) -> Result<()> {
        for model in models {
            validate_model(model, &self.registry, &self.config, &mut self.diagnostics)?;
        }
        Ok(())
    }

    /// Rewrite `model` to use the exact solution in `output`.
    pub fn apply_solver_output(
        &mut self,
        model: &mut NeuronOrSynapse,
        output: &SolverOutput,
    ) -> Result<()> {
        let transformer = Transformer::with_config(&self.registry, self.config.clone());
        transformer.apply_exact_solution(model, output, &mut self.diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{MessageCode, Severity};
    use crate::error::FrontendError;

    const SOURCE: &str = r#"
neuron leaky:
  initial_values:
    V_m mV = E_L
  end
  equations:
    V_m' = -(V_m - E_L) / tau_m
  end
  parameters:
    tau_m ms = 10 ms [[tau_m > 0 ms]]
    E_L mV = -70 mV
  end
  internals:
    h ms = resolution()
  end
  update:
    integrate_odes()
  end
end

neuron silent:
  state:
    x real = 0
  end
end
"#;

    #[test]
    fn test_load_and_solve() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut frontend = Frontend::new();
        let mut models = frontend.load_str(SOURCE, "leaky.nestml").unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].artifact_name, "leaky.nestml");

        let output = SolverOutput::from_json(
            r#"{
                "solver": "analytical",
                "propagator_elements": {"__P": "exp(-h / tau_m)"},
                "ode_var_update_instructions": ["V_m = E_L + __P * (V_m - E_L)"]
            }"#,
        )
        .unwrap();
        frontend.apply_solver_output(&mut models[0], &output).unwrap();
        assert!(models[0].print().contains("V_m = E_L + __P * (V_m - E_L)"));
        assert_eq!(frontend.diagnostics().count(Severity::Error), 0);
        assert!(frontend.diagnostics().has_code(MessageCode::TransformationApplied));
    }

    #[test]
    fn test_invalid_model_is_rejected() {
        let mut frontend = Frontend::new();
        let source = "neuron broken:\n  state:\n    x mV = y\n  end\nend\n";
        assert!(matches!(
            frontend.load_str(source, "broken.nestml"),
            Err(FrontendError::InvalidModel { .. })
        ));
        let first = frontend.diagnostics().iter().next().unwrap();
        assert_eq!(first.model.as_deref(), Some("broken"));
        assert_eq!(first.code, MessageCode::CouldNotResolve);
    }

    #[test]
    fn test_missing_file() {
        let mut frontend = Frontend::new();
        assert!(matches!(
            frontend.load_file(Path::new("/nonexistent/model.nestml")),
            Err(FrontendError::FileReadError { .. })
        ));
    }
}
