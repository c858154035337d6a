//! Result alias for shared error handling.

use crate::errors::ErrorEnvelope;

/// Shared result type used across the workspace.
pub type Result<T, E = ErrorEnvelope> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;

    fn parse_positive(input: i64) -> Result<i64> {
        if input > 0 {
            Ok(input)
        } else {
            Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "value must be positive",
            ))
        }
    }

    #[test]
    fn result_alias_defaults_to_error_envelope() {
        assert!(matches!(parse_positive(3), Ok(3)));
        let error = parse_positive(0).err();
        assert_eq!(error.map(|error| error.code), Some(ErrorCode::invalid_input()));
    }
}
