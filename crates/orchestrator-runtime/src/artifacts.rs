//! # Artifact Store
//!
//! Loads compiled component artifacts (`<dir>/<name>.json`, Hardhat layout:
//! `contractName`, `abi`, `bytecode`) and caches each one with the
//! capability table built from its ABI.

use dashmap::DashMap;
use serde::Deserialize;
use serde_json::Value;
use shared_types::{AbiError, Bytes, CapabilityTable, HexError, Token};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Artifact errors.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// Names are plain file stems.
    #[error("invalid artifact name '{0}'")]
    InvalidName(String),

    /// No such file.
    #[error("artifact '{0}' not found")]
    NotFound(String),

    /// File could not be read.
    #[error("artifact '{name}' could not be read: {source}")]
    Io {
        /// Artifact name
        name: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// Not a Hardhat artifact.
    #[error("artifact '{name}' is malformed: {detail}")]
    Malformed {
        /// Artifact name
        name: String,
        /// What was wrong
        detail: String,
    },

    /// ABI could not be built or arguments did not fit it.
    #[error("artifact '{name}': {source}")]
    Abi {
        /// Artifact name
        name: String,
        /// Codec error
        source: AbiError,
    },

    /// Arguments given to a component without `initialize`.
    #[error("artifact '{0}' has no initializer but arguments were given")]
    NoInitializer(String),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HardhatArtifact {
    contract_name: Option<String>,
    abi: Value,
    bytecode: String,
}

/// A loaded artifact.
#[derive(Debug)]
pub struct Artifact {
    /// Reference name.
    pub name: String,
    /// Contract name declared in the file.
    pub contract_name: String,
    /// Creation bytecode.
    pub bytecode: Bytes,
    /// Operations and events.
    pub capabilities: CapabilityTable,
}

impl Artifact {
    /// Encoded `initialize(args)` call; empty when the component has no
    /// initializer and no arguments were given.
    pub fn encode_initializer(&self, args: &[Token]) -> Result<Bytes, ArtifactError> {
        match self.capabilities.initializer() {
            Some(initializer) => initializer
                .encode_call(args)
                .map(Bytes::from)
                .map_err(|source| ArtifactError::Abi {
                    name: self.name.clone(),
                    source,
                }),
            None if args.is_empty() => Ok(Bytes::default()),
            None => Err(ArtifactError::NoInitializer(self.name.clone())),
        }
    }
}

/// Artifact cache over a directory.
pub struct ArtifactStore {
    dir: PathBuf,
    cache: DashMap<String, Arc<Artifact>>,
}

impl ArtifactStore {
    /// Store reading from `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        info!(dir = %dir.display(), "[runtime] Artifact store ready");
        Self {
            dir,
            cache: DashMap::new(),
        }
    }

    /// Artifact directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of cached artifacts.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Load an artifact by reference name.
    pub async fn load(&self, name: &str) -> Result<Arc<Artifact>, ArtifactError> {
        if let Some(artifact) = self.cache.get(name) {
            return Ok(Arc::clone(artifact.value()));
        }
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(ArtifactError::InvalidName(name.to_string()));
        }

        let path = self.dir.join(format!("{name}.json"));
        let raw = tokio::fs::read_to_string(&path).await.map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ArtifactError::NotFound(name.to_string())
            } else {
                ArtifactError::Io {
                    name: name.to_string(),
                    source,
                }
            }
        })?;

        let artifact = Arc::new(parse(name, &raw)?);
        debug!(
            name,
            operations = artifact.capabilities.len(),
            bytecode_len = artifact.bytecode.len(),
            "[runtime] Artifact loaded"
        );
        self.cache.insert(name.to_string(), Arc::clone(&artifact));
        Ok(artifact)
    }
}

fn parse(name: &str, raw: &str) -> Result<Artifact, ArtifactError> {
    let malformed = |detail: String| ArtifactError::Malformed {
        name: name.to_string(),
        detail,
    };

    let file: HardhatArtifact = serde_json::from_str(raw).map_err(|e| malformed(e.to_string()))?;
    let bytecode: Bytes = file
        .bytecode
        .parse()
        .map_err(|e: HexError| malformed(format!("bytecode: {e}")))?;
    if bytecode.is_empty() {
        return Err(malformed("empty bytecode".into()));
    }
    let capabilities = CapabilityTable::from_abi_json(&file.abi).map_err(|source| ArtifactError::Abi {
        name: name.to_string(),
        source,
    })?;

    Ok(Artifact {
        name: name.to_string(),
        contract_name: file.contract_name.unwrap_or_else(|| name.to_string()),
        bytecode,
        capabilities,
    })
}
