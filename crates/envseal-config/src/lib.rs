use envseal_crypto::{Keypair, KEY_LEN};
use envseal_storage::PrincipalId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use zeroize::Zeroizing;

pub const DEFAULT_PUSH_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found. Run 'envseal init' first.")]
    NotFound,
    #[error("Failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Could not determine home directory")]
    NoHomeDir,
    #[error("No principals configured")]
    NoPrincipals,
    #[error("Principal '{0}' not found")]
    PrincipalNotFound(String),
    #[error("Principal '{0}' already exists")]
    DuplicatePrincipal(String),
    #[error("Principal '{principal}' has an invalid key: {reason}")]
    InvalidKey { principal: String, reason: String },
}

/// Client configuration stored in ~/.envseal/config.json
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ClientConfig {
    pub principals: Vec<PrincipalConfig>,
    #[serde(default)]
    pub current_principal: Option<String>, // Name of current principal
    #[serde(default)]
    pub store_url: Option<String>, // sqlite URL; ~/.envseal/store.db when unset
    #[serde(default = "default_push_timeout_secs")]
    pub push_timeout_secs: u64,
}

fn default_push_timeout_secs() -> u64 {
    DEFAULT_PUSH_TIMEOUT_SECS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            principals: Vec::new(),
            current_principal: None,
            store_url: None,
            push_timeout_secs: DEFAULT_PUSH_TIMEOUT_SECS,
        }
    }
}

/// One local identity (device) with its X25519 keys.
#[derive(Serialize, Deserialize, Clone)]
pub struct PrincipalConfig {
    pub id: String,
    pub name: String,
    pub private_key: String, // X25519 private key (hex-encoded)
    pub public_key: String,  // X25519 public key (hex-encoded)
}

impl std::fmt::Debug for PrincipalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrincipalConfig")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("private_key", &"[REDACTED]")
            .field("public_key", &self.public_key)
            .finish()
    }
}

impl ClientConfig {
    /// Load config from default path (~/.envseal/config.json)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::default_path()?)
    }

    /// Load config from custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound
            } else {
                ConfigError::Read(e)
            }
        })?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Save config to default path
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(Self::default_path()?)
    }

    /// Save config to custom path. The file holds private keys, so on unix it is
    /// written owner-only (0600).
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&self)?)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    /// ~/.envseal
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        Ok(dirs::home_dir()
            .ok_or(ConfigError::NoHomeDir)?
            .join(".envseal"))
    }

    /// Get default config path (~/.envseal/config.json)
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    pub fn push_timeout(&self) -> Duration {
        Duration::from_secs(self.push_timeout_secs)
    }

    /// Get the current active principal
    pub fn current_principal(&self) -> Result<&PrincipalConfig, ConfigError> {
        let principal_name = self
            .current_principal
            .as_ref()
            .or_else(|| self.principals.first().map(|p| &p.name))
            .ok_or(ConfigError::NoPrincipals)?;

        self.principal(principal_name)
    }

    /// Get a principal by name
    pub fn principal(&self, name: &str) -> Result<&PrincipalConfig, ConfigError> {
        self.principals
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ConfigError::PrincipalNotFound(name.to_string()))
    }

    /// Add a principal and make it current.
    pub fn add_principal(&mut self, principal: PrincipalConfig) -> Result<(), ConfigError> {
        if self.principals.iter().any(|p| p.name == principal.name) {
            return Err(ConfigError::DuplicatePrincipal(principal.name));
        }
        self.current_principal = Some(principal.name.clone());
        self.principals.push(principal);
        Ok(())
    }
}

impl PrincipalConfig {
    /// Fresh identity with a new id and X25519 keypair.
    pub fn generate(name: impl Into<String>) -> Self {
        let keypair = Keypair::generate();
        Self {
            id: PrincipalId::new().to_string(),
            name: name.into(),
            private_key: hex::encode(&*keypair.secret_key_bytes()),
            public_key: hex::encode(keypair.public_key_bytes()),
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> ConfigError {
        ConfigError::InvalidKey {
            principal: self.name.clone(),
            reason: reason.into(),
        }
    }

    pub fn principal_id(&self) -> Result<PrincipalId, ConfigError> {
        self.id
            .parse()
            .map_err(|e| self.invalid(format!("invalid principal id: {}", e)))
    }

    /// Get X25519 public key as bytes (32 bytes)
    pub fn public_key_bytes(&self) -> Result<[u8; KEY_LEN], ConfigError> {
        let bytes = hex::decode(&self.public_key)
            .map_err(|e| self.invalid(format!("invalid public key hex: {}", e)))?;
        bytes
            .try_into()
            .map_err(|_| self.invalid("public key must be exactly 32 bytes"))
    }

    /// Rebuild the keypair, checking the stored public key matches the private key.
    pub fn keypair(&self) -> Result<Keypair, ConfigError> {
        let secret = Zeroizing::new(
            hex::decode(&self.private_key)
                .map_err(|e| self.invalid(format!("invalid private key hex: {}", e)))?,
        );
        let keypair =
            Keypair::from_secret_bytes(&secret).map_err(|e| self.invalid(e.to_string()))?;
        if keypair.public_key_bytes() != self.public_key_bytes()? {
            return Err(self.invalid("public key does not match private key"));
        }
        Ok(keypair)
    }
}
