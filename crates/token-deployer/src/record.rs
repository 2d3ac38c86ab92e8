//! File backed record of the last deployment.
//!
//! The record is a single pretty printed JSON document. It is created with
//! empty placeholders on startup and only ever rewritten by a successful
//! deployment.

use {
    chrono::{SecondsFormat, Utc},
    serde::{Deserialize, Serialize, de::DeserializeOwned},
    std::{
        io,
        path::{Path, PathBuf},
    },
    tokio::sync::Mutex,
};

/// Network label written into the record.
pub const NETWORK: &str = "GBTNetwork";
/// Symbol of the deployed token.
pub const SYMBOL: &str = "GBT";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub contract_address: String,
    pub network: String,
    pub rpc_url: String,
    pub chain_id: u64,
    pub symbol: String,
    pub gas_wallet: String,
    pub last_updated: String,
    /// Fields written by someone else. Kept so the file round trips.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl DeploymentRecord {
    /// Record of a network nothing has been deployed to yet.
    pub fn initial(rpc_url: &str, chain_id: u64, gas_wallet: &str) -> Self {
        Self {
            contract_address: String::new(),
            network: NETWORK.to_string(),
            rpc_url: rpc_url.to_string(),
            chain_id,
            symbol: SYMBOL.to_string(),
            gas_wallet: gas_wallet.to_string(),
            last_updated: String::new(),
            extra: Default::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to access deployment record {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("deployment record {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

pub struct Store {
    path: PathBuf,
    /// Serializes read-modify-write cycles on the file.
    lock: Mutex<()>,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `initial` to the backing file unless it already exists.
    /// Returns whether the file was created.
    pub async fn ensure_initialized(&self, initial: &DeploymentRecord) -> Result<bool, Error> {
        let _guard = self.lock.lock().await;
        let exists = tokio::fs::try_exists(&self.path)
            .await
            .map_err(|source| self.io_error(source))?;
        if exists {
            return Ok(false);
        }
        self.write(initial).await?;
        tracing::info!(path = %self.path.display(), "initialized deployment record");
        Ok(true)
    }

    pub async fn load(&self) -> Result<DeploymentRecord, Error> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    /// The file contents as written, without checking them against
    /// [`DeploymentRecord`].
    pub async fn load_raw(&self) -> Result<serde_json::Value, Error> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    /// Records `address` as the current deployment and stamps the record with
    /// the current time. All other fields are kept as they are.
    pub async fn save(&self, address: &str) -> Result<DeploymentRecord, Error> {
        let _guard = self.lock.lock().await;
        let mut record: DeploymentRecord = self.read().await?;
        record.contract_address = address.to_string();
        record.last_updated = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        self.write(&record).await?;
        tracing::debug!(%address, path = %self.path.display(), "saved deployment record");
        Ok(record)
    }

    async fn read<T: DeserializeOwned>(&self) -> Result<T, Error> {
        let content = tokio::fs::read(&self.path)
            .await
            .map_err(|source| self.io_error(source))?;
        serde_json::from_slice(&content).map_err(|source| Error::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Replaces the file through a rename so readers never observe a
    /// partially written document.
    async fn write(&self, record: &DeploymentRecord) -> Result<(), Error> {
        let content = serde_json::to_vec_pretty(record).map_err(|source| Error::Parse {
            path: self.path.clone(),
            source,
        })?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|source| self.io_error(source))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: io::Error) -> Error {
        Error::Io {
            path: self.path.clone(),
            source,
        }
    }
}
