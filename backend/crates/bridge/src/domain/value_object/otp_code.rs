//! One-time Code Value Object
//!
//! Pre-authentication codes travel in the password field. With a directory
//! first factor the code is appended to the password; without one the field
//! is the code.

use kernel::error::app_error::{AppError, AppResult};
use secrecy::{ExposeSecret, SecretString};

/// Numeric one-time code of a fixed length
#[derive(Debug, Clone)]
pub struct OtpCode(SecretString);

/// Password field split into first-factor password and code
#[derive(Debug, Clone)]
pub struct SplitPassword {
    pub password: SecretString,
    pub code: OtpCode,
}

impl OtpCode {
    pub fn new(code: &str, length: usize) -> AppResult<Self> {
        if code.len() != length {
            return Err(AppError::invalid_input(format!(
                "One-time code must be {} digits",
                length
            )));
        }
        if !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AppError::invalid_input("One-time code must be numeric"));
        }
        Ok(Self(SecretString::from(code.to_string())))
    }

    /// Take the trailing `length` digits off a password field
    ///
    /// When `whole_field` is set the field must consist of the code only.
    pub fn split_from_password(
        field: &SecretString,
        length: usize,
        whole_field: bool,
    ) -> AppResult<SplitPassword> {
        let field = field.expose_secret();

        if whole_field {
            let code = Self::new(field, length)?;
            return Ok(SplitPassword {
                password: SecretString::from(String::new()),
                code,
            });
        }

        let split = field
            .len()
            .checked_sub(length)
            .filter(|at| field.is_char_boundary(*at))
            .ok_or_else(|| {
                AppError::invalid_input(format!("Password field lacks a {}-digit code", length))
            })?;

        let (password, code) = field.split_at(split);
        Ok(SplitPassword {
            password: SecretString::from(password.to_string()),
            code: Self::new(code, length)?,
        })
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn as_secret(&self) -> &SecretString {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    #[test]
    fn test_split_trailing_code() {
        let split = OtpCode::split_from_password(&secret("hunter2123456"), 6, false).unwrap();
        assert_eq!(split.password.expose_secret(), "hunter2");
        assert_eq!(split.code.expose(), "123456");
    }

    #[test]
    fn test_split_rejects_non_numeric_tail() {
        assert!(OtpCode::split_from_password(&secret("hunter12345x"), 6, false).is_err());
    }

    #[test]
    fn test_split_rejects_short_field() {
        assert!(OtpCode::split_from_password(&secret("1234"), 6, false).is_err());
    }

    #[test]
    fn test_split_rejects_non_ascii_boundary() {
        assert!(OtpCode::split_from_password(&secret("pässwörd"), 3, false).is_err());
    }

    #[test]
    fn test_whole_field() {
        let split = OtpCode::split_from_password(&secret("0042"), 4, true).unwrap();
        assert_eq!(split.code.expose(), "0042");
        assert_eq!(split.password.expose_secret(), "");

        assert!(OtpCode::split_from_password(&secret("pw0042"), 4, true).is_err());
        assert!(OtpCode::split_from_password(&secret("042"), 4, true).is_err());
    }
}
