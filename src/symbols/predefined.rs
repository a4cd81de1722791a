//! Built-in types, units, functions and variables.

use indexmap::IndexMap;

use super::{BlockType, Symbol};
use crate::dsl::DataType;

const PRIMITIVE_TYPES: [&str; 5] = ["real", "integer", "boolean", "string", "void"];

/// SI base and derived units that accept a decimal prefix.
const BASE_UNITS: [&str; 22] = [
    "s", "m", "g", "A", "K", "mol", "cd", "Hz", "N", "Pa", "J", "W", "C", "V", "F", "Ohm", "S",
    "Wb", "T", "H", "lm", "lx",
];

/// Decimal prefixes; `u` stands for micro.
const PREFIXES: [&str; 20] = [
    "y", "z", "a", "f", "p", "n", "u", "m", "c", "d", "da", "h", "k", "M", "G", "T", "P", "E",
    "Z", "Y",
];

/// Immutable registry of everything a model can use without declaring it.
///
/// Created once and passed by reference into every symbol-table pass.
#[derive(Debug, Clone)]
pub struct PredefinedRegistry {
    types: IndexMap<String, Symbol>,
    functions: IndexMap<String, Symbol>,
    variables: IndexMap<String, Symbol>,
}

impl Default for PredefinedRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PredefinedRegistry {
    pub fn new() -> Self {
        let mut types = IndexMap::new();
        let mut add_type = |name: String| {
            types.insert(name.clone(), Symbol::type_symbol(name));
        };
        for name in PRIMITIVE_TYPES {
            add_type(name.to_string());
        }
        for base in BASE_UNITS {
            add_type(base.to_string());
            for prefix in PREFIXES {
                add_type(format!("{}{}", prefix, base));
            }
        }

        let mut functions = IndexMap::new();
        for &(name, params, ret) in BUILTIN_FUNCTIONS {
            let symbol = Symbol {
                is_predefined: true,
                block_type: BlockType::Predefined,
                ..Symbol::function(
                    name,
                    params.iter().map(|p| DataType::new(*p)).collect(),
                    ret.map(DataType::new),
                )
            };
            functions.insert(name.to_string(), symbol);
        }

        let mut variables = IndexMap::new();
        for (name, data_type) in [("t", "ms"), ("e", "real")] {
            let symbol = Symbol {
                is_predefined: true,
                ..Symbol::variable(name, BlockType::State, DataType::new(data_type))
            };
            variables.insert(name.to_string(), symbol);
        }

        Self {
            types,
            functions,
            variables,
        }
    }

    pub fn lookup_type(&self, name: &str) -> Option<&Symbol> {
        self.types.get(name)
    }

    pub fn lookup_function(&self, name: &str) -> Option<&Symbol> {
        self.functions.get(name)
    }

    pub fn lookup_variable(&self, name: &str) -> Option<&Symbol> {
        self.variables.get(name)
    }

    /// Whether every unit named by `data_type` is known.
    pub fn is_known_type(&self, data_type: &DataType) -> bool {
        data_type.unit_names().all(|name| self.types.contains_key(name))
    }

    /// Predefined variables in registration order.
    pub fn variables(&self) -> impl Iterator<Item = &Symbol> {
        self.variables.values()
    }

    pub fn functions(&self) -> impl Iterator<Item = &Symbol> {
        self.functions.values()
    }
}

type BuiltinSignature = (&'static str, &'static [&'static str], Option<&'static str>);

const BUILTIN_FUNCTIONS: &[BuiltinSignature] = &[
    ("exp", &["real"], Some("real")),
    ("expm1", &["real"], Some("real")),
    ("ln", &["real"], Some("real")),
    ("log10", &["real"], Some("real")),
    ("pow", &["real", "real"], Some("real")),
    ("sqrt", &["real"], Some("real")),
    ("abs", &["real"], Some("real")),
    ("sinh", &["real"], Some("real")),
    ("cosh", &["real"], Some("real")),
    ("tanh", &["real"], Some("real")),
    ("max", &["real", "real"], None),
    ("min", &["real", "real"], None),
    ("clip", &["real", "real", "real"], None),
    ("delta", &["ms"], Some("real")),
    ("random_normal", &["real", "real"], Some("real")),
    ("random_uniform", &["real", "real"], Some("real")),
    ("resolution", &[], Some("ms")),
    ("steps", &["ms"], Some("integer")),
    ("emit_spike", &[], Some("void")),
    ("print", &["string"], Some("void")),
    ("println", &[], Some("void")),
    ("integrate_odes", &[], Some("void")),
    ("convolve", &["real", "real"], Some("real")),
    ("curr_sum", &["real", "real"], Some("real")),
    ("cond_sum", &["real", "real"], Some("real")),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_with_prefixes() {
        let registry = PredefinedRegistry::new();
        for unit in ["mV", "pA", "nS", "pF", "ms", "MOhm", "uS", "kHz"] {
            assert!(registry.lookup_type(unit).is_some(), "{unit} should be known");
        }
        assert!(registry.lookup_type("parsec").is_none());
    }

    #[test]
    fn test_compound_types() {
        let registry = PredefinedRegistry::new();
        assert!(registry.is_known_type(&DataType::new("pA/ms")));
        assert!(registry.is_known_type(&DataType::new("1/(mV*ms**2)")));
        assert!(registry.is_known_type(&DataType::real()));
        assert!(!registry.is_known_type(&DataType::new("furlong/ms")));
    }

    #[test]
    fn test_predefined_variables_and_functions() {
        let registry = PredefinedRegistry::new();
        let t = registry.lookup_variable("t").unwrap();
        assert!(t.is_predefined);
        assert_eq!(t.data_type, Some(DataType::new("ms")));
        let integrate = registry.lookup_function("integrate_odes").unwrap();
        assert_eq!(integrate.return_type, Some(DataType::void()));
        assert!(registry.lookup_function("convolve").is_some());
    }
}
