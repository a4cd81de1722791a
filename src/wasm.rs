//! WASM bindings for the NESTML front end.
//!
//! This module provides JavaScript-friendly bindings for checking and
//! transforming models in a browser-based editor.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { WasmModelFrontend } from 'nestml_frontend';
//!
//! await init();
//!
//! const frontend = new WasmModelFrontend(source);
//! for (const name of frontend.model_names()) {
//!   console.log(frontend.print_model(name));
//! }
//!
//! frontend.apply_solver_output("iaf_psc_alpha", solverJson);
//! const findings = JSON.parse(frontend.diagnostics());
//! ```

use wasm_bindgen::prelude::*;

use crate::error::FrontendError;
use crate::frontend::Frontend;
use crate::model::NeuronOrSynapse;
use crate::transform::SolverOutput;

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

/// WASM-compatible model front end.
///
/// Holds the analysed models of one source text together with the
/// diagnostics collected while loading and transforming them.
#[wasm_bindgen]
pub struct WasmModelFrontend {
    frontend: Frontend,
    models: Vec<NeuronOrSynapse>,
}

#[wasm_bindgen]
impl WasmModelFrontend {
    /// Parse, analyse and validate every model in `source`.
    ///
    /// # Returns
    /// A new `WasmModelFrontend` or an error if parsing or validation fails.
    ///
    /// # Example
    /// ```javascript
    /// const frontend = new WasmModelFrontend(source);
    /// ```
    #[wasm_bindgen(constructor)]
    pub fn new(source: &str) -> Result<WasmModelFrontend, JsValue> {
        let mut frontend = Frontend::new();
        let models = frontend
            .load_str(source, "<editor>")
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(WasmModelFrontend { frontend, models })
    }

    /// Names of the loaded models, in source order.
    #[wasm_bindgen]
    pub fn model_names(&self) -> Vec<String> {
        self.models.iter().map(|m| m.name.clone()).collect()
    }

    /// Source text of a model, or `undefined` if no model has that name.
    #[wasm_bindgen]
    pub fn print_model(&self, name: &str) -> Option<String> {
        self.find(name).map(NeuronOrSynapse::print)
    }

    /// Apply a solver output document to the named model.
    ///
    /// # Arguments
    /// * `name` - The model to rewrite
    /// * `solver_json` - The solver's JSON answer
    #[wasm_bindgen]
    pub fn apply_solver_output(&mut self, name: &str, solver_json: &str) -> Result<(), JsValue> {
        let output =
            SolverOutput::from_json(solver_json).map_err(|e| JsValue::from_str(&e.to_string()))?;
        let model = self
            .models
            .iter_mut()
            .find(|m| m.name == name)
            .ok_or_else(|| {
                let error = FrontendError::WasmError {
                    message: format!("no model named '{}'", name),
                };
                JsValue::from_str(&error.to_string())
            })?;
        self.frontend
            .apply_solver_output(model, &output)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Collected diagnostics as a JSON array.
    #[wasm_bindgen]
    pub fn diagnostics(&self) -> Result<String, JsValue> {
        let entries: Vec<_> = self.frontend.diagnostics().iter().collect();
        serde_json::to_string(&entries).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Number of error-level diagnostics.
    #[wasm_bindgen(getter)]
    pub fn error_count(&self) -> usize {
        self.frontend.diagnostics().count(crate::diagnostics::Severity::Error)
    }
}

impl WasmModelFrontend {
    fn find(&self, name: &str) -> Option<&NeuronOrSynapse> {
        self.models.iter().find(|m| m.name == name)
    }
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
