//! GitHub App installation credentials.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Credentials for authenticating as a GitHub App installation.
///
/// `pem_file` holds the contents of the app's private key. Literal `\n`
/// sequences are accepted in place of newlines, which lets the key travel
/// through single-line environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppAuth {
    /// The GitHub App ID.
    pub id: String,
    /// The installation ID of the app in the target owner.
    pub installation_id: String,
    /// PEM-encoded RSA private key.
    pub pem_file: String,
}

impl AppAuth {
    /// Checks that every field is present and the IDs are numeric.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidAppAuth`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("id", &self.id),
            ("installation_id", &self.installation_id),
            ("pem_file", &self.pem_file),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidAppAuth {
                    reason: format!("{field} is required"),
                });
            }
        }

        for (field, value) in [("id", &self.id), ("installation_id", &self.installation_id)] {
            if value.trim().parse::<u64>().is_err() {
                return Err(ConfigError::InvalidAppAuth {
                    reason: format!("{field} must be numeric, got '{value}'"),
                });
            }
        }

        Ok(())
    }

    /// Returns the private key with escaped newlines expanded.
    ///
    /// # Examples
    ///
    /// ```
    /// use hubform_config::AppAuth;
    ///
    /// let app = AppAuth {
    ///     id: "1".to_string(),
    ///     installation_id: "2".to_string(),
    ///     pem_file: "-----BEGIN-----\\nabc\\n-----END-----".to_string(),
    /// };
    /// assert_eq!(app.pem(), "-----BEGIN-----\nabc\n-----END-----");
    /// ```
    #[must_use]
    pub fn pem(&self) -> String {
        self.pem_file.replace("\\n", "\n")
    }
}
