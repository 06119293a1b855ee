//! Input validation for registration and credential changes.

use sentra_core::error::{SentraError, SentraResult};

/// Structural email check: one `@`, non-empty local part, domain with a
/// dot. Deliverability is proven by the verification email, not here.
pub fn validate_email(email: &str) -> SentraResult<()> {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return Err(SentraError::BadRequest {
            message: "invalid email address".into(),
        });
    };

    let domain_ok = domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains(' ');

    if local.is_empty() || !domain_ok || email.contains(' ') {
        return Err(SentraError::BadRequest {
            message: "invalid email address".into(),
        });
    }

    Ok(())
}

/// Password policy: minimum length plus at least one letter and one
/// digit.
pub fn validate_password(password: &str, min_length: usize) -> SentraResult<()> {
    if password.len() < min_length {
        return Err(SentraError::BadRequest {
            message: format!("password must be at least {min_length} characters"),
        });
    }
    if !password.chars().any(|c| c.is_alphabetic()) {
        return Err(SentraError::BadRequest {
            message: "password must contain at least one letter".into(),
        });
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(SentraError::BadRequest {
            message: "password must contain at least one digit".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_addresses() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("a.b+tag@sub.example.co").is_ok());
    }

    #[test]
    fn rejects_structurally_broken_addresses() {
        for bad in ["", "no-at-sign", "@example.com", "a@nodot", "a@.com", "a@com.", "a b@x.com"] {
            assert!(validate_email(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn password_policy() {
        assert!(validate_password("Passw0rd!", 8).is_ok());
        // Too short.
        assert!(validate_password("Pw1", 8).is_err());
        // No digit.
        assert!(validate_password("password!", 8).is_err());
        // No letter.
        assert!(validate_password("12345678", 8).is_err());
    }
}
