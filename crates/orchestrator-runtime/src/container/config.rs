//! # Runtime Configuration
//!
//! Unified configuration for the ledger connection, fees, confirmation,
//! the admin reference account, contract addresses and workflow timing.
//!
//! Loaded from defaults, then overridden by `LO_*` environment variables:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `LO_WEB3_PROTOCOL` | `ledger.protocol` |
//! | `LO_WEB3_IP` | `ledger.host` |
//! | `LO_WEB3_PORT` | `ledger.port` |
//! | `LO_WEB3_ROUTE` | `ledger.route` |
//! | `LO_GAS_PRICE` | `fees.gas_price` |
//! | `LO_GAS_LIMIT` | `fees.gas_limit` |
//! | `LO_CONFIRMATION_TIMEOUT_SECS` | `confirmation.timeout_secs` |
//! | `LO_ADMIN_PATH` | `admin.keystore_path` |
//! | `LO_ADMIN_PASSWORD` | `admin.password` |
//! | `LO_ADMIN_ACCOUNT` | `admin.account` |
//! | `LO_CONTRACT_REGISTRY` | `contracts.registry` |
//! | `LO_ROLE_MANAGER` | `contracts.role_manager` |
//! | `LO_ARTIFACTS_DIR` | `artifacts.dir` |
//! | `LO_PENDING_TTL_SECS` | `workflows.pending_ttl_secs` |
//! | `LO_LOG_LEVEL` | `log_level` |

use lo_01_ledger_client::SessionConfig;
use serde::{Deserialize, Serialize};
use shared_types::{parse_quantity, Address, FeePolicy, DEFAULT_GAS_LIMIT, U256};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Complete runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Ledger endpoint.
    pub ledger: LedgerConfig,
    /// Default fees.
    pub fees: FeeConfig,
    /// Confirmation wait.
    pub confirmation: ConfirmationConfig,
    /// Admin reference account.
    pub admin: AdminConfig,
    /// Contract addresses.
    pub contracts: ContractsConfig,
    /// Build artifacts.
    pub artifacts: ArtifactsConfig,
    /// Paused workflow handling.
    pub workflows: WorkflowsConfig,
    /// Log filter directive.
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            ledger: LedgerConfig::default(),
            fees: FeeConfig::default(),
            confirmation: ConfirmationConfig::default(),
            admin: AdminConfig::default(),
            contracts: ContractsConfig::default(),
            artifacts: ArtifactsConfig::default(),
            workflows: WorkflowsConfig::default(),
            log_level: "info".into(),
        }
    }
}

impl RuntimeConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Apply `LO_*` overrides from `lookup`. Unparsable values are logged
    /// and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(protocol) = lookup("LO_WEB3_PROTOCOL") {
            override_parsed("LO_WEB3_PROTOCOL", &protocol, &mut self.ledger.protocol);
        }
        if let Some(host) = lookup("LO_WEB3_IP") {
            self.ledger.host = host;
        }
        if let Some(port) = lookup("LO_WEB3_PORT") {
            override_parsed("LO_WEB3_PORT", &port, &mut self.ledger.port);
        }
        if let Some(route) = lookup("LO_WEB3_ROUTE") {
            self.ledger.route = route;
        }
        if let Some(price) = lookup("LO_GAS_PRICE") {
            match parse_u256(&price) {
                Some(p) => self.fees.gas_price = p,
                None => warn!(value = %price, "[runtime] Ignoring unparsable LO_GAS_PRICE"),
            }
        }
        if let Some(limit) = lookup("LO_GAS_LIMIT") {
            match parse_quantity(&limit) {
                Ok(l) => self.fees.gas_limit = l,
                Err(e) => warn!(error = %e, "[runtime] Ignoring unparsable LO_GAS_LIMIT"),
            }
        }
        if let Some(timeout) = lookup("LO_CONFIRMATION_TIMEOUT_SECS") {
            override_parsed(
                "LO_CONFIRMATION_TIMEOUT_SECS",
                &timeout,
                &mut self.confirmation.timeout_secs,
            );
        }
        if let Some(path) = lookup("LO_ADMIN_PATH") {
            self.admin.keystore_path = PathBuf::from(path);
        }
        if let Some(password) = lookup("LO_ADMIN_PASSWORD") {
            self.admin.password = password;
        }
        if let Some(account) = lookup("LO_ADMIN_ACCOUNT") {
            override_optional("LO_ADMIN_ACCOUNT", &account, &mut self.admin.account);
        }
        if let Some(registry) = lookup("LO_CONTRACT_REGISTRY") {
            override_optional("LO_CONTRACT_REGISTRY", &registry, &mut self.contracts.registry);
        }
        if let Some(manager) = lookup("LO_ROLE_MANAGER") {
            override_optional("LO_ROLE_MANAGER", &manager, &mut self.contracts.role_manager);
        }
        if let Some(dir) = lookup("LO_ARTIFACTS_DIR") {
            self.artifacts.dir = PathBuf::from(dir);
        }
        if let Some(ttl) = lookup("LO_PENDING_TTL_SECS") {
            override_parsed("LO_PENDING_TTL_SECS", &ttl, &mut self.workflows.pending_ttl_secs);
        }
        if let Some(level) = lookup("LO_LOG_LEVEL") {
            self.log_level = level;
        }
    }

    /// Reject configurations the runtime cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ledger.protocol != LedgerProtocol::Rpc {
            return Err(ConfigError::UnsupportedProtocol(self.ledger.protocol));
        }
        if self.fees.gas_limit == 0 {
            return Err(ConfigError::ZeroGasLimit);
        }
        if self.confirmation.timeout_secs == 0 {
            return Err(ConfigError::ZeroConfirmationTimeout);
        }
        if self.contracts.registry.is_none() {
            return Err(ConfigError::MissingRegistry);
        }
        if self.workflows.sweep_interval_secs == 0 {
            return Err(ConfigError::ZeroSweepInterval);
        }
        Ok(())
    }

    /// Ledger session settings.
    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            confirmation_timeout: Duration::from_secs(self.confirmation.timeout_secs),
            poll_interval: Duration::from_millis(self.confirmation.poll_interval_ms),
            fees: self.fees.policy(),
        }
    }
}

fn override_parsed<T: FromStr>(key: &str, raw: &str, target: &mut T) {
    match raw.parse() {
        Ok(value) => *target = value,
        Err(_) => warn!(key, value = %raw, "[runtime] Ignoring unparsable override"),
    }
}

fn override_optional(key: &str, raw: &str, target: &mut Option<Address>) {
    match raw.parse() {
        Ok(address) => *target = Some(address),
        Err(_) => warn!(key, value = %raw, "[runtime] Ignoring unparsable address"),
    }
}

fn parse_u256(raw: &str) -> Option<U256> {
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some("") => Some(U256::zero()),
        Some(hex) => U256::from_str_radix(hex, 16).ok(),
        None => U256::from_dec_str(raw).ok(),
    }
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Only HTTP JSON-RPC is wired.
    #[error("ledger protocol {0} is not supported, use RPC")]
    UnsupportedProtocol(LedgerProtocol),

    /// Transactions would never execute.
    #[error("gas limit must be non-zero")]
    ZeroGasLimit,

    /// Confirmation would fail immediately.
    #[error("confirmation timeout must be non-zero")]
    ZeroConfirmationTimeout,

    /// Every workflow goes through the registry.
    #[error("registry address is not set (LO_CONTRACT_REGISTRY)")]
    MissingRegistry,

    /// Sweeper would spin.
    #[error("sweep interval must be non-zero")]
    ZeroSweepInterval,
}

/// Ledger transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LedgerProtocol {
    /// HTTP JSON-RPC.
    #[default]
    #[serde(rename = "RPC")]
    Rpc,
    /// WebSocket JSON-RPC.
    #[serde(rename = "WS")]
    Ws,
}

impl fmt::Display for LedgerProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rpc => f.write_str("RPC"),
            Self::Ws => f.write_str("WS"),
        }
    }
}

impl FromStr for LedgerProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "RPC" | "HTTP" => Ok(Self::Rpc),
            "WS" => Ok(Self::Ws),
            other => Err(format!("unknown protocol {other}")),
        }
    }
}

/// Ledger endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Transport.
    pub protocol: LedgerProtocol,
    /// Node host.
    pub host: String,
    /// Node port.
    pub port: u16,
    /// Path under the host.
    pub route: String,
    /// Per-request timeout (seconds).
    pub request_timeout_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            protocol: LedgerProtocol::Rpc,
            host: "127.0.0.1".into(),
            port: 8545,
            route: String::new(),
            request_timeout_secs: 10,
        }
    }
}

impl LedgerConfig {
    /// `http://{host}:{port}/{route}`
    pub fn endpoint(&self) -> String {
        format!(
            "http://{}:{}/{}",
            self.host,
            self.port,
            self.route.trim_start_matches('/')
        )
    }

    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Default fees.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeConfig {
    /// Gas price in base units.
    pub gas_price: U256,
    /// Gas limit.
    pub gas_limit: u64,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            gas_price: U256::zero(),
            gas_limit: DEFAULT_GAS_LIMIT,
        }
    }
}

impl FeeConfig {
    /// As a fee policy.
    pub fn policy(&self) -> FeePolicy {
        FeePolicy {
            gas_price: self.gas_price,
            gas_limit: self.gas_limit,
        }
    }
}

/// Confirmation wait.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// Bounded wait for a receipt (seconds).
    pub timeout_secs: u64,
    /// Receipt polling interval (milliseconds).
    pub poll_interval_ms: u64,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            poll_interval_ms: 500,
        }
    }
}

/// Admin reference account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Keystore JSON whose `address` names the admin account.
    pub keystore_path: PathBuf,
    /// Unlock password.
    pub password: String,
    /// Explicit account; takes precedence over the keystore.
    pub account: Option<Address>,
    /// Username stored for the admin reference account.
    pub username: String,
    /// Unlock duration (seconds); zero keeps the account unlocked.
    pub unlock_secs: u64,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            keystore_path: PathBuf::from("keystore/admin.json"),
            password: String::new(),
            account: None,
            username: "admin".into(),
            unlock_secs: 0,
        }
    }
}

/// Contract addresses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractsConfig {
    /// Type registry.
    pub registry: Option<Address>,
    /// Admin role manager; admin workflows are disabled without it.
    pub role_manager: Option<Address>,
}

/// Build artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Directory of `<name>.json` artifacts.
    pub dir: PathBuf,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("artifacts"),
        }
    }
}

/// Paused workflow handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowsConfig {
    /// How long an external signer has to return the signed payload (seconds).
    pub pending_ttl_secs: u64,
    /// How often abandoned workflows are swept (seconds).
    pub sweep_interval_secs: u64,
}

impl Default for WorkflowsConfig {
    fn default() -> Self {
        Self {
            pending_ttl_secs: 900,
            sweep_interval_secs: 60,
        }
    }
}

impl WorkflowsConfig {
    /// Pending-signature TTL.
    pub fn pending_ttl(&self) -> Duration {
        Duration::from_secs(self.pending_ttl_secs)
    }

    /// Sweep interval.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn with_env(vars: &[(&str, &str)]) -> RuntimeConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut config = RuntimeConfig::default();
        config.apply_overrides(|key| vars.get(key).cloned());
        config
    }

    #[test]
    fn test_default_config() {
        let config = RuntimeConfig::default();
        assert_eq!(config.ledger.protocol, LedgerProtocol::Rpc);
        assert_eq!(config.fees.gas_limit, 0x23c3_ffff);
        assert_eq!(config.fees.gas_price, U256::zero());
        assert_eq!(config.ledger.endpoint(), "http://127.0.0.1:8545/");
        assert_eq!(config.validate(), Err(ConfigError::MissingRegistry));
    }

    #[test]
    fn test_env_overrides() {
        let config = with_env(&[
            ("LO_WEB3_IP", "ledger.local"),
            ("LO_WEB3_PORT", "22000"),
            ("LO_WEB3_ROUTE", "/rpc"),
            ("LO_GAS_PRICE", "0x3b9aca00"),
            ("LO_GAS_LIMIT", "0x5208"),
            ("LO_CONFIRMATION_TIMEOUT_SECS", "5"),
            ("LO_CONTRACT_REGISTRY", "0x5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e"),
            ("LO_PENDING_TTL_SECS", "60"),
        ]);
        assert_eq!(config.ledger.endpoint(), "http://ledger.local:22000/rpc");
        assert_eq!(config.fees.gas_price, U256::from(1_000_000_000u64));
        assert_eq!(config.fees.gas_limit, 21_000);
        assert_eq!(config.session().confirmation_timeout, Duration::from_secs(5));
        assert_eq!(config.contracts.registry, Some(Address([0x5E; 20])));
        assert_eq!(config.workflows.pending_ttl(), Duration::from_secs(60));
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_unparsable_override_keeps_default() {
        let config = with_env(&[("LO_WEB3_PORT", "not-a-port"), ("LO_ROLE_MANAGER", "0x12")]);
        assert_eq!(config.ledger.port, 8545);
        assert_eq!(config.contracts.role_manager, None);
    }

    #[test]
    fn test_validate_rejects() {
        let base = with_env(&[("LO_CONTRACT_REGISTRY", "0x5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e")]);

        let mut ws = base.clone();
        ws.apply_overrides(|key| (key == "LO_WEB3_PROTOCOL").then(|| "ws".to_string()));
        assert_eq!(ws.validate(), Err(ConfigError::UnsupportedProtocol(LedgerProtocol::Ws)));

        let mut no_gas = base.clone();
        no_gas.fees.gas_limit = 0;
        assert_eq!(no_gas.validate(), Err(ConfigError::ZeroGasLimit));

        let mut no_wait = base;
        no_wait.confirmation.timeout_secs = 0;
        assert_eq!(no_wait.validate(), Err(ConfigError::ZeroConfirmationTimeout));
    }

    #[test]
    fn test_sections_deserialize_with_defaults() {
        let config: RuntimeConfig = serde_json::from_str(
            r#"{"ledger": {"port": 7545}, "contracts": {"registry": "0x5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e"}}"#,
        )
        .unwrap();
        assert_eq!(config.ledger.port, 7545);
        assert_eq!(config.ledger.host, "127.0.0.1");
        assert_eq!(config.workflows.sweep_interval_secs, 60);
        assert!(config.validate().is_ok());
    }
}
