//! Front-end configuration.

/// Name of the built-in that marks where ODE integration happens.
pub const DEFAULT_INTEGRATE_FUNCTION: &str = "integrate_odes";

/// Built-ins that convolve a shape with a spike buffer.
pub const DEFAULT_CONVOLVE_FUNCTIONS: [&str; 3] = ["convolve", "curr_sum", "cond_sum"];

/// Configuration for analysis and transformation passes.
#[derive(Debug, Clone)]
pub struct FrontendConfig {
    /// Name of the integrate built-in looked up in update blocks.
    pub integrate_function: String,
    /// Names of the convolution built-ins expanded by spike application.
    pub convolve_functions: Vec<String>,
    /// Whether the exact-solution pipeline drops the equations block afterwards.
    pub remove_equations_block: bool,
    /// Whether validation warnings fail validation like errors do.
    pub warnings_as_errors: bool,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            integrate_function: DEFAULT_INTEGRATE_FUNCTION.to_string(),
            convolve_functions: DEFAULT_CONVOLVE_FUNCTIONS
                .iter()
                .map(|name| name.to_string())
                .collect(),
            remove_equations_block: true,
            warnings_as_errors: false,
        }
    }
}

impl FrontendConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the name of the integrate built-in.
    pub fn with_integrate_function(mut self, name: impl Into<String>) -> Self {
        self.integrate_function = name.into();
        self
    }

    /// Replace the set of convolution built-ins.
    pub fn with_convolve_functions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.convolve_functions = names.into_iter().map(Into::into).collect();
        self
    }

    /// Keep or remove the equations block after applying an exact solution.
    pub fn with_remove_equations_block(mut self, remove: bool) -> Self {
        self.remove_equations_block = remove;
        self
    }

    /// Treat validation warnings as errors.
    pub fn with_warnings_as_errors(mut self, strict: bool) -> Self {
        self.warnings_as_errors = strict;
        self
    }

    pub fn is_convolve_function(&self, name: &str) -> bool {
        self.convolve_functions.iter().any(|f| f == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FrontendConfig::new();
        assert_eq!(config.integrate_function, "integrate_odes");
        assert!(config.is_convolve_function("curr_sum"));
        assert!(!config.is_convolve_function("exp"));
        assert!(config.remove_equations_block);
        assert!(!config.warnings_as_errors);
    }

    #[test]
    fn test_builder() {
        let config = FrontendConfig::new()
            .with_convolve_functions(["convolve"])
            .with_remove_equations_block(false)
            .with_warnings_as_errors(true);
        assert!(!config.is_convolve_function("cond_sum"));
        assert!(!config.remove_equations_block);
        assert!(config.warnings_as_errors);
    }
}
