// Import necessary crates and modules
use crate::error::{ExportError, Result};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Password};
use keyring::Entry;
use log::info;
use serde::{Deserialize, Serialize};

pub const HOST_VAR: &str = "HOST";
pub const AUTH_VAR: &str = "AUTH";

/// Structure to hold the assessment API settings.
///
/// Fields:
/// - `host`: Full URL of the assessments endpoint.
/// - `auth`: Value sent verbatim in the `Authorization` header.
///
/// Example usage:
/// ```
/// use markbook_export::ApiCredentials;
///
/// let credentials = ApiCredentials {
///     host: "https://school.example.com/api/assessments".to_string(),
///     auth: "your_api_token".to_string(),
/// };
/// assert!(!credentials.auth.is_empty());
/// ```
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct ApiCredentials {
    pub host: String,
    pub auth: String,
}

// Where a set of credentials was found.
#[derive(Debug, PartialEq)]
enum CredentialSource {
    None,
    EnvVariables(ApiCredentials),
    SystemKeyring(ApiCredentials),
}

impl ApiCredentials {
    /// Loads `HOST` and `AUTH` from the process environment. A `.env` file in
    /// the working directory is read first when present.
    pub fn load_credentials_from_env() -> Result<ApiCredentials> {
        // a missing .env file is normal
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<ApiCredentials>
    where
        F: Fn(&str) -> Option<String>,
    {
        let auth = lookup(AUTH_VAR)
            .filter(|v| !v.is_empty())
            .ok_or(ExportError::MissingCredentials(AUTH_VAR))?;
        let host = lookup(HOST_VAR)
            .filter(|v| !v.is_empty())
            .ok_or(ExportError::MissingCredentials(HOST_VAR))?;
        Ok(ApiCredentials { host, auth })
    }

    /// Loads the API settings from the system's keyring.
    pub fn load_credentials_from_system() -> Result<ApiCredentials> {
        let app_name = env!("CARGO_PKG_NAME");
        let host = Entry::new(app_name, HOST_VAR)?.get_password()?;
        let auth = Entry::new(app_name, AUTH_VAR)?.get_password()?;
        Ok(ApiCredentials { host, auth })
    }

    /// Stores the API settings in the system's keyring.
    pub fn save_credentials_to_system(&self) -> Result<()> {
        let app_name = env!("CARGO_PKG_NAME");
        Entry::new(app_name, HOST_VAR)?.set_password(&self.host)?;
        Entry::new(app_name, AUTH_VAR)?.set_password(&self.auth)?;
        Ok(())
    }

    // Environment first, then keyring.
    fn load_credentials() -> CredentialSource {
        match Self::load_credentials_from_env() {
            Ok(credentials) => CredentialSource::EnvVariables(credentials),
            Err(_) => match Self::load_credentials_from_system() {
                Ok(credentials) => CredentialSource::SystemKeyring(credentials),
                Err(_) => CredentialSource::None,
            },
        }
    }

    /// Asks for the API settings and stores them in the keyring.
    fn set_system_credentials() -> Result<ApiCredentials> {
        let theme = ColorfulTheme::default();
        let register = Confirm::with_theme(&theme)
            .with_prompt("No API settings found. Do you wish to register them?")
            .default(true)
            .interact()?;
        if !register {
            return Err(ExportError::MissingCredentials(HOST_VAR));
        }

        let host: String = Input::with_theme(&theme)
            .with_prompt("Assessment API URL")
            .interact_text()?;
        let auth = Password::with_theme(&theme)
            .with_prompt("Authorization token")
            .interact()?;

        let credentials = ApiCredentials { host, auth };
        credentials.save_credentials_to_system()?;
        info!("API settings stored in the system keyring");
        Ok(credentials)
    }

    /// Retrieves the API settings, using stored values or prompting for them.
    ///
    /// This is the primary entry point. Environment variables (including a
    /// `.env` file) take precedence over the keyring; when neither has them the
    /// user is asked interactively.
    pub fn credentials() -> Result<ApiCredentials> {
        match Self::load_credentials() {
            CredentialSource::None => Self::set_system_credentials(),
            CredentialSource::EnvVariables(credentials) => {
                info!("API settings loaded from environment -> {}", credentials.host);
                Ok(credentials)
            }
            CredentialSource::SystemKeyring(credentials) => {
                info!("API settings loaded from keyring -> {}", credentials.host);
                Ok(credentials)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_in(map: HashMap<&'static str, &'static str>) -> impl Fn(&str) -> Option<String> {
        move |key: &str| map.get(key).map(|v| v.to_string())
    }

    #[test]
    fn both_variables_set() {
        let vars = HashMap::from([(HOST_VAR, "https://example.com/api"), (AUTH_VAR, "secret")]);
        let credentials = ApiCredentials::from_lookup(lookup_in(vars)).unwrap();
        assert_eq!(credentials.host, "https://example.com/api");
        assert_eq!(credentials.auth, "secret");
    }

    #[test]
    fn missing_variable_is_named() {
        let only_host = HashMap::from([(HOST_VAR, "https://example.com/api")]);
        assert!(matches!(
            ApiCredentials::from_lookup(lookup_in(only_host)),
            Err(ExportError::MissingCredentials("AUTH"))
        ));

        let only_auth = HashMap::from([(AUTH_VAR, "secret")]);
        assert!(matches!(
            ApiCredentials::from_lookup(lookup_in(only_auth)),
            Err(ExportError::MissingCredentials("HOST"))
        ));
    }

    #[test]
    fn empty_variable_counts_as_missing() {
        let vars = HashMap::from([(HOST_VAR, "https://example.com/api"), (AUTH_VAR, "")]);
        assert!(ApiCredentials::from_lookup(lookup_in(vars)).is_err());
    }
}
