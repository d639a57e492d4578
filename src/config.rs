// src/config.rs
//! Configuration system for encrypted-columns
//!
//! Central, lazy-loaded config with TOML + env overrides. Keys arrive as
//! hex strings; [`Config::cipher`] turns them into a ready cipher.

use once_cell::sync::OnceCell;
use serde::Deserialize;
use zeroize::Zeroizing;

use crate::crypto::AesHmacCipher;
use crate::error::{Error, Result};
use crate::registry::DecryptFailurePolicy;

/// Hex of b"encrypted-columns-dev-key-32byte" — never use outside dev
pub const DEFAULT_CRYPT_KEY_HEX: &str =
    "656e637279707465642d636f6c756d6e732d6465762d6b65792d333262797465";

/// Hex of b"encrypted-columns-dev-mac-32byte" — never use outside dev
pub const DEFAULT_AUTH_KEY_HEX: &str =
    "656e637279707465642d636f6c756d6e732d6465762d6d61632d333262797465";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub keys: Keys,
    #[serde(default)]
    pub read: Read,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Keys {
    pub crypt_key_hex: String,
    pub auth_key_hex: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Read {
    /// `"error"` (default), `"empty"`, or any other string used as a sentinel
    pub decrypt_failure: Option<String>,
}

static CONFIG: OnceCell<Config> = OnceCell::new();

/// Load config once — falls back to built-in dev keys if the file is missing
pub fn load() -> &'static Config {
    CONFIG.get_or_init(|| {
        let config_path = std::env::var("ECOL_CONFIG")
            .unwrap_or_else(|_| "encrypted-columns.toml".to_string());

        let mut conf = if std::path::Path::new(&config_path).exists() {
            let content =
                std::fs::read_to_string(&config_path).expect("failed to read config file");
            Config::from_toml(&content).expect("invalid TOML in config file")
        } else {
            eprintln!("Warning: {config_path} not found, using built-in dev keys");
            Config::dev_defaults()
        };

        // Env keys win over file keys
        if let Ok(k) = std::env::var("ECOL_CRYPT_KEY_HEX") {
            conf.keys.crypt_key_hex = k;
        }
        if let Ok(k) = std::env::var("ECOL_AUTH_KEY_HEX") {
            conf.keys.auth_key_hex = k;
        }

        conf
    })
}

impl Config {
    pub fn dev_defaults() -> Self {
        Self {
            keys: Keys {
                crypt_key_hex: DEFAULT_CRYPT_KEY_HEX.into(),
                auth_key_hex: DEFAULT_AUTH_KEY_HEX.into(),
            },
            read: Read::default(),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Decode the hex keys and build the default cipher.
    pub fn cipher(&self) -> Result<AesHmacCipher> {
        let crypt = Zeroizing::new(
            hex::decode(&self.keys.crypt_key_hex)
                .map_err(|e| Error::Config(format!("crypt_key_hex: {e}")))?,
        );
        let auth = Zeroizing::new(
            hex::decode(&self.keys.auth_key_hex)
                .map_err(|e| Error::Config(format!("auth_key_hex: {e}")))?,
        );
        AesHmacCipher::new(&crypt, &auth)
    }

    /// Read-path policy named in the config, default fail-closed.
    pub fn decrypt_failure_policy(&self) -> DecryptFailurePolicy {
        match self.read.decrypt_failure.as_deref() {
            None | Some("error") => DecryptFailurePolicy::Error,
            Some("empty") => DecryptFailurePolicy::EmptyString,
            Some(s) => DecryptFailurePolicy::Sentinel(s.to_string()),
        }
    }
}
