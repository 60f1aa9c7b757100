use std::path::PathBuf;
use std::{env, fs};

use crate::config::Config;
use crate::error::ConfigurationError;

const TOKEN_SECRET: &str = "token.secret";
const GENERATED_SECRET_LEN: usize = 64;

#[derive(Clone)]
pub struct Security {
    pub token_secret: Vec<u8>,
}

impl std::fmt::Debug for Security {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Security")
            .field("token_secret", &"[REDACTED]")
            .finish()
    }
}

#[inline]
fn security_dir() -> PathBuf {
    PathBuf::from(env::var("SECURITY_DIR").unwrap_or("./security".to_string()))
}

impl Security {
    pub fn load(config: &Config) -> Result<Security, ConfigurationError> {
        if let Some(secret) = &config.access_token_secret {
            tracing::info!("Using configured token signing secret.");
            return Ok(Security {
                token_secret: secret.as_bytes().to_vec(),
            });
        }

        Self::load_from(security_dir())
    }

    pub fn load_from(dir: PathBuf) -> Result<Security, ConfigurationError> {
        tracing::info!("Loading token signing secret...");
        let path = dir.join(TOKEN_SECRET);

        match fs::read(&path) {
            Ok(secret) if !secret.is_empty() => {
                tracing::info!("Token signing secret found and loaded.");
                Ok(Security {
                    token_secret: secret,
                })
            }
            _ => {
                tracing::info!(
                    "Token signing secret not found in '{}'. Generating a new one.",
                    path.display()
                );
                fs::create_dir_all(&dir)?;

                let secret: Vec<u8> = (0..GENERATED_SECRET_LEN).map(|_| rand::random()).collect();
                fs::write(&path, &secret)?;

                Ok(Security {
                    token_secret: secret,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_secret_is_reused() {
        let dir = env::temp_dir().join(format!("edulogy-security-{}", rand::random::<u32>()));

        let first = Security::load_from(dir.clone()).expect("unable to generate secret");
        let second = Security::load_from(dir).expect("unable to load secret");

        assert_eq!(first.token_secret.len(), GENERATED_SECRET_LEN);
        assert_eq!(first.token_secret, second.token_secret);
    }

    #[test]
    fn configured_secret_wins() {
        let mut config = Config::default();
        config.access_token_secret = Some("configured".to_string());

        let security = Security::load(&config).expect("configured secret should load");

        assert_eq!(security.token_secret, b"configured".to_vec());
    }
}
