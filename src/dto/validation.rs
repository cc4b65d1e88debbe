//! Validation helpers for DTOs.

use validator::ValidationError;

/// Validates that a team code is 2 to 4 ASCII letters, in any case.
///
/// # Examples
///
/// ```ignore
/// validate_team_code("KC")   // Ok
/// validate_team_code("buf")  // Ok - normalised later
/// validate_team_code("K")    // Err - too short
/// validate_team_code("NY1")  // Err - digit
/// ```
pub fn validate_team_code(code: &str) -> Result<(), ValidationError> {
    let code = code.trim();
    if !(2..=4).contains(&code.len()) {
        let mut err = ValidationError::new("team_code_length");
        err.message = Some(
            format!("Team code must be 2 to 4 characters (got {})", code.len()).into(),
        );
        return Err(err);
    }

    if !code.chars().all(|c| c.is_ascii_alphabetic()) {
        let mut err = ValidationError::new("team_code_format");
        err.message = Some("Team code must contain only ASCII letters".into());
        return Err(err);
    }

    Ok(())
}

/// Validates an opaque player identifier: non-blank, at most 64 characters.
pub fn validate_player_id(id: &str) -> Result<(), ValidationError> {
    let trimmed = id.trim();
    if trimmed.is_empty() || trimmed.len() > 64 {
        let mut err = ValidationError::new("player_id_length");
        err.message = Some("Player ID must be 1 to 64 non-blank characters".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_team_code_valid() {
        assert!(validate_team_code("KC").is_ok());
        assert!(validate_team_code("buf").is_ok());
        assert!(validate_team_code(" JAX ").is_ok());
    }

    #[test]
    fn test_validate_team_code_invalid() {
        assert!(validate_team_code("K").is_err()); // too short
        assert!(validate_team_code("KCKCK").is_err()); // too long
        assert!(validate_team_code("NY1").is_err()); // digit
        assert!(validate_team_code("").is_err());
    }

    #[test]
    fn test_validate_player_id() {
        assert!(validate_player_id("alice").is_ok());
        assert!(validate_player_id("   ").is_err());
        assert!(validate_player_id(&"x".repeat(65)).is_err());
    }
}
