use std::path::PathBuf;
use std::sync::Arc;

use envseal_config::{ClientConfig, ConfigError};
use envseal_core::{Client, Identity, IntegrationSyncPipeline};
use envseal_store_sqlite::SqliteStore;

use crate::sink::DotenvSink;

pub type CliClient = Client<SqliteStore>;

/// Where the CLI reads its config and store from.
pub struct Context {
    config_path: Option<PathBuf>,
    store_url: Option<String>,
}

impl Context {
    pub fn new(config_path: Option<PathBuf>, store_url: Option<String>) -> Self {
        Self {
            config_path,
            store_url,
        }
    }

    pub fn config_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.config_path {
            Some(path) => Ok(path.clone()),
            None => ClientConfig::default_path(),
        }
    }

    pub fn load_config(&self) -> Result<ClientConfig, ConfigError> {
        ClientConfig::load_from(self.config_path()?)
    }

    /// Existing config, or an empty one when none has been written yet.
    pub fn load_or_default_config(&self) -> Result<ClientConfig, ConfigError> {
        match self.load_config() {
            Err(ConfigError::NotFound) => Ok(ClientConfig::default()),
            other => other,
        }
    }

    pub fn save_config(&self, config: &ClientConfig) -> Result<(), ConfigError> {
        config.save_to(self.config_path()?)
    }

    pub async fn open_store(
        &self,
        config: &ClientConfig,
    ) -> Result<Arc<SqliteStore>, Box<dyn std::error::Error>> {
        let store = match self.store_url.as_ref().or(config.store_url.as_ref()) {
            Some(url) => SqliteStore::open(url).await?,
            None => SqliteStore::open_default().await?,
        };
        Ok(Arc::new(store))
    }

    /// Client acting as the config's current principal.
    pub async fn client(&self) -> Result<CliClient, Box<dyn std::error::Error>> {
        let config = self.load_config()?;
        let principal = config.current_principal()?;
        let identity = Identity::new(principal.principal_id()?, principal.keypair()?);
        let store = self.open_store(&config).await?;

        let pipeline = IntegrationSyncPipeline::new(config.push_timeout())
            .with_transport("dotenv", Arc::new(DotenvSink));
        Ok(Client::new(store, identity).with_pipeline(pipeline))
    }
}
