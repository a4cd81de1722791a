//! Name conventions for convolution kernels.

/// Separator between a kernel and the buffer it is convolved with.
pub const CONVOLUTION_MARKER: &str = "__X__";

/// Spelling of `$` in generated identifiers.
pub const DOLLAR_MARKER: &str = "__DOLLAR";

/// `alpha__X__spikes` -> `alpha`
pub fn strip_convolution_suffix(name: &str) -> &str {
    name.split(CONVOLUTION_MARKER).next().unwrap_or(name)
}

/// Drop derivative marks and spell `$` out, so that `g''`, `g'` and `g`
/// all name the same kernel.
pub fn canonical_shape_name(name: &str) -> String {
    name.replace('$', DOLLAR_MARKER).replace('\'', "")
}

/// Whether `variable` is a state variable of `shape`: the shape name followed
/// by derivative marks (`g`, `g'`, `g''`) or by `__<digits>` (`g__1`).
pub fn is_shape_state_variable(shape: &str, variable: &str) -> bool {
    let Some(rest) = variable.strip_prefix(shape) else {
        return false;
    };
    if rest.chars().all(|c| c == '\'') {
        return true;
    }
    rest.strip_prefix("__")
        .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_suffix() {
        assert_eq!(strip_convolution_suffix("alpha__X__spikes"), "alpha");
        assert_eq!(strip_convolution_suffix("alpha"), "alpha");
    }

    #[test]
    fn test_canonical_names() {
        assert_eq!(canonical_shape_name("g_in''"), "g_in");
        assert_eq!(canonical_shape_name("alpha$"), "alpha__DOLLAR");
    }

    #[test]
    fn test_shape_state_variables() {
        assert!(is_shape_state_variable("g", "g"));
        assert!(is_shape_state_variable("g", "g''"));
        assert!(is_shape_state_variable("g", "g__12"));
        assert!(!is_shape_state_variable("g", "g__"));
        assert!(!is_shape_state_variable("g", "g_ex"));
        assert!(!is_shape_state_variable("g", "h"));
    }
}
