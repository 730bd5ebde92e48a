mod api_key;
mod none;
mod traits;
mod types;

pub use api_key::*;
pub use none::*;
pub use traits::*;
pub use types::*;

use crate::config::AuthConfig;

/// Factory function to create authenticator from config
pub fn create_authenticator(config: &AuthConfig) -> Result<Box<dyn Authenticator>, AuthError> {
    use crate::config::AuthMethod;

    match config.method {
        AuthMethod::None => Ok(Box::new(NoneAuthenticator::new())),
        AuthMethod::ApiKey => {
            if config.tokens.is_empty() {
                return Err(AuthError::ConfigurationError(
                    "at least one token must be configured when using ApiKey auth method"
                        .to_string(),
                ));
            }
            Ok(Box::new(ApiKeyAuthenticator::new(config.tokens.clone())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthMethod, TokenEntry};

    #[test]
    fn test_create_authenticator_none() {
        let config = AuthConfig {
            method: AuthMethod::None,
            tokens: vec![],
        };
        let auth = create_authenticator(&config).unwrap();
        assert_eq!(auth.method_name(), "none");
    }

    #[test]
    fn test_create_authenticator_api_key() {
        let config = AuthConfig {
            method: AuthMethod::ApiKey,
            tokens: vec![TokenEntry {
                key: "secret-key".to_string(),
                user_id: "ops".to_string(),
                role: Role::Operator,
            }],
        };
        let auth = create_authenticator(&config).unwrap();
        assert_eq!(auth.method_name(), "api_key");
    }

    #[test]
    fn test_create_authenticator_api_key_missing_tokens() {
        let config = AuthConfig {
            method: AuthMethod::ApiKey,
            tokens: vec![],
        };
        let result = create_authenticator(&config);
        assert!(matches!(result, Err(AuthError::ConfigurationError(_))));
    }
}
