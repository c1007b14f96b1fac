//! Environment and home directory expansion for configuration strings.

use crate::ConfigError;

/// Expand `~`, `${VAR}` and `${VAR:-default}` in `value`.
///
/// `field` names the configuration entry in the error.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    shellexpand::full(value)
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} not set", e.var_name),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_value_is_unchanged() {
        assert_eq!(expand_env("conditionals.lst", "values.list_file").unwrap(), "conditionals.lst");
    }

    #[test]
    fn test_default_used_when_unset() {
        let value = expand_env("${CONDROLES_TEST_SURELY_UNSET:-fallback.lst}", "values.list_file")
            .unwrap();
        assert_eq!(value, "fallback.lst");
    }

    #[test]
    fn test_unset_variable_is_error() {
        let err = expand_env("${CONDROLES_TEST_SURELY_UNSET}/x.lst", "values.list_file").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert_eq!(
            err.to_string(),
            "Environment variable error in values.list_file: ${CONDROLES_TEST_SURELY_UNSET} not set"
        );
    }
}
