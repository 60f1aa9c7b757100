use crate::error::ConfigurationError;
use crate::util;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

fn default_mongodb_uri() -> String {
    if let Ok(uri) = env::var("MONGODB_URI") {
        return uri;
    }

    match (env::var("DB_USER"), env::var("DB_PASS")) {
        (Ok(user), Ok(pass)) => {
            let host = env::var("DB_HOST").unwrap_or("cluster0.mongodb.net".to_string());
            format!("mongodb+srv://{user}:{pass}@{host}/?retryWrites=true&w=majority")
        }
        _ => "mongodb://localhost:27017".to_string(),
    }
}

fn default_mongodb_db() -> String {
    env::var("MONGODB_DB_NAME").unwrap_or("onlineEdulogy".to_string())
}

fn default_port() -> u16 {
    env::var("PORT")
        .ok()
        .and_then(|it| it.parse().ok())
        .unwrap_or(5000)
}

fn default_access_token_secret() -> Option<String> {
    env::var("ACCESS_TOKEN_SECRET").ok().filter(|it| !it.is_empty())
}

fn default_stripe_secret_key() -> Option<String> {
    env::var("STRIPE_SECRET_KEY").ok().filter(|it| !it.is_empty())
}

fn default_currency() -> String {
    env::var("PAYMENT_CURRENCY").unwrap_or("usd".to_string())
}

fn default_token_lifetime_minutes() -> i64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip)]
    file_path: PathBuf,

    #[serde(default = "default_mongodb_uri")]
    pub mongodb_uri: String,
    #[serde(default = "default_mongodb_db")]
    pub mongodb_db: String,

    #[serde(default = "default_port")]
    pub port: u16,

    // Secrets are read from the file when present but never written back.
    #[serde(default = "default_access_token_secret", skip_serializing)]
    pub access_token_secret: Option<String>,
    #[serde(default = "default_stripe_secret_key", skip_serializing)]
    pub stripe_secret_key: Option<String>,
    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default = "default_token_lifetime_minutes")]
    pub token_lifetime_minutes: i64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            file_path: config_dir().join("settings.yml"),
            mongodb_uri: default_mongodb_uri(),
            mongodb_db: default_mongodb_db(),
            port: default_port(),
            access_token_secret: default_access_token_secret(),
            stripe_secret_key: default_stripe_secret_key(),
            currency: default_currency(),
            token_lifetime_minutes: default_token_lifetime_minutes(),
        }
    }
}

#[inline]
fn config_dir() -> PathBuf {
    PathBuf::from(env::var("CONFIG_DIR").unwrap_or("./config".to_string()))
}

impl Config {
    pub fn load() -> Result<Config, ConfigurationError> {
        let config_file = util::find_first_subpath(
            config_dir(),
            &["settings.yml", "settings.yaml"],
            Path::exists,
        )
        .ok_or_else(|| ConfigurationError::NotFound(config_dir()))?;

        Self::load_from(config_file)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Config, ConfigurationError> {
        let file = File::open(path.as_ref())?;
        let mut config: Config = serde_yaml::from_reader(BufReader::new(file))?;
        config.file_path = path.as_ref().to_path_buf();

        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigurationError> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = File::create(&self.file_path)?;
        let mut out = BufWriter::new(file);
        serde_yaml::to_writer(&mut out, self)?;
        out.flush()?;
        Ok(())
    }

    pub fn with_file_path(mut self, path: impl Into<PathBuf>) -> Config {
        self.file_path = path.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("edulogy-config-{}-{}", name, rand::random::<u32>()));
        fs::create_dir_all(&dir).expect("unable to create scratch dir");
        dir
    }

    #[test]
    fn saved_config_omits_secrets() {
        let dir = scratch_dir("secrets");
        let mut config = Config::default().with_file_path(dir.join("settings.yml"));
        config.access_token_secret = Some("top-secret".to_string());
        config.stripe_secret_key = Some("sk_test_123".to_string());
        config.port = 7070;

        config.save().expect("unable to save config");
        let written = fs::read_to_string(dir.join("settings.yml")).expect("config not written");

        assert!(!written.contains("top-secret"));
        assert!(!written.contains("sk_test_123"));
        assert!(written.contains("7070"));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let dir = scratch_dir("defaults");
        let path = dir.join("settings.yml");
        fs::write(&path, "mongodb_db: catalog\nport: 8123\n").expect("unable to write config");

        let config = Config::load_from(&path).expect("config should parse");

        assert_eq!(config.mongodb_db, "catalog");
        assert_eq!(config.port, 8123);
        assert_eq!(config.token_lifetime_minutes, 60);
    }
}
