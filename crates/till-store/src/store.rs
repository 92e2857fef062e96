//! # Store Handle
//!
//! Opening a data directory and handing out repositories.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Store Lifecycle                                │
//! │                                                                         │
//! │  App Startup                                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreConfig::new(dir) / StoreConfig::from_env()                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Store::open(config).await                                             │
//! │       ├── create + canonicalize the directory                          │
//! │       ├── take the directory lock                                      │
//! │       ├── delete stale temp files                                      │
//! │       ├── roll back an unfinished sale (sale.journal)                  │
//! │       ├── create missing tables (header only)                          │
//! │       └── bootstrap credentials.csv with the configured admin          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  store.sessions() / credentials() / catalog() / ledger() /             │
//! │  sales() / settings()                                                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Directory State
//! Every `Store` opened on the same directory in this process shares one
//! `tokio::sync::Mutex` and one session table. Each mutating operation holds
//! the mutex from its first read to its last write. A session logged in
//! through one handle is valid on all of them, and deleting a user through
//! any handle revokes that user's sessions everywhere.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex, OnceLock, PoisonError};

use argon2::Params;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::fsio;
use crate::journal;
use crate::password::CredentialHasher;
use crate::repository::catalog::{CatalogRepository, PRODUCTS_HEADER};
use crate::repository::credentials::CredentialRepository;
use crate::repository::ledger::{LedgerRepository, CASH_FLOW_HEADER, SALES_HEADER};
use crate::repository::settings::SettingsRepository;
use crate::sale::SaleCoordinator;
use crate::session::{SessionManager, SessionTable};

/// Data directory used by `from_env` when `TILL_DATA_DIR` is unset.
pub const DEFAULT_DATA_DIR: &str = "./till-data";

// =============================================================================
// Configuration
// =============================================================================

/// The admin created when a data directory has no credentials file yet.
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Store configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = StoreConfig::new("/var/lib/till")
///     .bootstrap_admin("admin", "change-me")
///     .password_pepper("from-a-secret-store");
/// ```
#[derive(Clone)]
pub struct StoreConfig {
    /// Directory holding every data file. Created if missing.
    pub data_dir: PathBuf,

    /// Admin to create when `credentials.csv` does not exist.
    pub bootstrap_admin: Option<BootstrapAdmin>,

    /// Secret mixed into every password hash. Changing it invalidates
    /// every stored password.
    pub password_pepper: Option<String>,

    /// Argon2 memory cost in KiB.
    /// Default: `argon2::Params::DEFAULT_M_COST`
    pub argon2_memory_kib: u32,

    /// Argon2 passes.
    /// Default: `argon2::Params::DEFAULT_T_COST`
    pub argon2_iterations: u32,

    /// Argon2 lanes.
    /// Default: `argon2::Params::DEFAULT_P_COST`
    pub argon2_parallelism: u32,
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("data_dir", &self.data_dir)
            .field("bootstrap_admin", &self.bootstrap_admin)
            .field("password_pepper", &self.password_pepper.as_ref().map(|_| "<redacted>"))
            .field("argon2_memory_kib", &self.argon2_memory_kib)
            .field("argon2_iterations", &self.argon2_iterations)
            .field("argon2_parallelism", &self.argon2_parallelism)
            .finish()
    }
}

impl StoreConfig {
    /// Creates a configuration for the given data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        StoreConfig {
            data_dir: data_dir.into(),
            bootstrap_admin: None,
            password_pepper: None,
            argon2_memory_kib: Params::DEFAULT_M_COST,
            argon2_iterations: Params::DEFAULT_T_COST,
            argon2_parallelism: Params::DEFAULT_P_COST,
        }
    }

    /// Reads configuration from environment variables.
    ///
    /// ## Variables
    /// - `TILL_DATA_DIR` - data directory (default `./till-data`)
    /// - `TILL_ADMIN_USER` + `TILL_ADMIN_PASSWORD` - bootstrap admin
    /// - `TILL_PASSWORD_PEPPER` - password pepper
    pub fn from_env() -> Self {
        let data_dir =
            std::env::var("TILL_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string());
        let mut config = StoreConfig::new(data_dir);

        if let (Ok(username), Ok(password)) = (
            std::env::var("TILL_ADMIN_USER"),
            std::env::var("TILL_ADMIN_PASSWORD"),
        ) {
            config = config.bootstrap_admin(username, password);
        }

        if let Ok(pepper) = std::env::var("TILL_PASSWORD_PEPPER") {
            config = config.password_pepper(pepper);
        }

        config
    }

    /// Sets the bootstrap admin.
    pub fn bootstrap_admin(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.bootstrap_admin = Some(BootstrapAdmin {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Sets the password pepper.
    pub fn password_pepper(mut self, pepper: impl Into<String>) -> Self {
        self.password_pepper = Some(pepper.into());
        self
    }

    /// Sets the Argon2 cost parameters.
    pub fn argon2_params(mut self, memory_kib: u32, iterations: u32, parallelism: u32) -> Self {
        self.argon2_memory_kib = memory_kib;
        self.argon2_iterations = iterations;
        self.argon2_parallelism = parallelism;
        self
    }

    /// Cheapest valid Argon2 cost (for testing).
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let config = StoreConfig::new(dir.path()).fast_hashing();
    /// // Hashing takes microseconds, perfect for tests
    /// ```
    pub fn fast_hashing(self) -> Self {
        self.argon2_params(Params::MIN_M_COST, Params::MIN_T_COST, Params::MIN_P_COST)
    }
}

// =============================================================================
// Data Paths
// =============================================================================

/// Locations of every file in a data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub dir: PathBuf,
    pub credentials: PathBuf,
    pub products: PathBuf,
    pub sales: PathBuf,
    pub cash_flow: PathBuf,
    pub settings: PathBuf,
    pub journal: PathBuf,
}

impl DataPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        DataPaths {
            credentials: dir.join("credentials.csv"),
            products: dir.join("products.csv"),
            sales: dir.join("sales.csv"),
            cash_flow: dir.join("cash_flow.csv"),
            settings: dir.join("settings.json"),
            journal: dir.join("sale.journal"),
            dir,
        }
    }
}

// =============================================================================
// Directory Registry
// =============================================================================

/// What every handle on one directory shares.
#[derive(Debug, Clone, Default)]
struct DirectoryState {
    lock: Arc<Mutex<()>>,
    sessions: Arc<SessionTable>,
}

type DirectoryRegistry = StdMutex<HashMap<PathBuf, DirectoryState>>;

static DIRECTORIES: OnceLock<DirectoryRegistry> = OnceLock::new();

/// The shared state of a canonical data directory.
fn directory_state(dir: &Path) -> DirectoryState {
    let registry = DIRECTORIES.get_or_init(Default::default);
    registry
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(dir.to_path_buf())
        .or_default()
        .clone()
}

// =============================================================================
// Store
// =============================================================================

/// State shared by every repository of one store handle.
#[derive(Debug)]
pub(crate) struct StoreShared {
    pub(crate) paths: DataPaths,
    pub(crate) lock: Arc<Mutex<()>>,
    pub(crate) sessions: Arc<SessionTable>,
    pub(crate) hasher: CredentialHasher,
}

/// Main store handle providing repository access.
///
/// ## Usage
/// ```rust,ignore
/// let store = Store::open(StoreConfig::from_env()).await?;
/// let session = store.sessions().login("admin", "change-me").await?;
/// let receipt = store
///     .sales()
///     .process_sale(&session, &[LineItem::new("0001", 3)])
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct Store {
    shared: Arc<StoreShared>,
}

impl Store {
    /// Opens (and if needed initializes) a data directory.
    ///
    /// ## Returns
    /// * `Ok(Store)` - Ready-to-use handle
    /// * `Err(StoreError::Config)` - No credentials file and no bootstrap admin
    /// * `Err(StoreError::Storage)` - The directory cannot be prepared
    pub async fn open(config: StoreConfig) -> StoreResult<Self> {
        info!(dir = %config.data_dir.display(), "Opening till store");

        tokio::fs::create_dir_all(&config.data_dir)
            .await
            .map_err(|e| StoreError::storage("creating the data directory", e))?;
        let dir = tokio::fs::canonicalize(&config.data_dir)
            .await
            .map_err(|e| StoreError::storage("resolving the data directory", e))?;

        let hasher = CredentialHasher::new(
            config.password_pepper.as_deref(),
            config.argon2_memory_kib,
            config.argon2_iterations,
            config.argon2_parallelism,
        )?;

        let DirectoryState { lock, sessions } = directory_state(&dir);
        let shared = Arc::new(StoreShared {
            lock,
            paths: DataPaths::new(dir),
            sessions,
            hasher,
        });
        let store = Store { shared };

        store.prepare(config.bootstrap_admin.as_ref()).await?;

        info!(dir = %store.shared.paths.dir.display(), "Till store ready");
        Ok(store)
    }

    async fn prepare(&self, bootstrap: Option<&BootstrapAdmin>) -> StoreResult<()> {
        let paths = &self.shared.paths;
        let _guard = self.shared.lock.lock().await;

        let stale = fsio::remove_stale_temp_files(&paths.dir)
            .await
            .map_err(|e| StoreError::storage("removing stale temp files", e))?;
        if stale > 0 {
            warn!(count = stale, "Removed temp files left by an interrupted write");
        }

        journal::recover(paths).await?;

        for (path, header) in [
            (&paths.products, &PRODUCTS_HEADER[..]),
            (&paths.sales, &SALES_HEADER[..]),
            (&paths.cash_flow, &CASH_FLOW_HEADER[..]),
        ] {
            if fsio::read_optional(path)
                .await
                .map_err(|e| StoreError::storage("checking data files", e))?
                .is_none()
            {
                let bytes = crate::codec::header_line(header)
                    .map_err(|e| StoreError::storage("encoding a table header", e))?;
                fsio::write_atomic(path, &bytes)
                    .await
                    .map_err(|e| StoreError::storage("creating a data file", e))?;
                debug!(file = %path.display(), "Created empty table");
            }
        }

        let has_credentials = fsio::read_optional(&paths.credentials)
            .await
            .map_err(|e| StoreError::storage("checking credentials", e))?
            .is_some();
        if !has_credentials {
            let admin = bootstrap.ok_or_else(|| {
                StoreError::Config(
                    "credentials.csv is missing and no bootstrap admin is configured".to_string(),
                )
            })?;
            self.credentials()
                .bootstrap(&admin.username, &admin.password)
                .await?;
        }

        Ok(())
    }

    /// Locations of the data files.
    pub fn paths(&self) -> &DataPaths {
        &self.shared.paths
    }

    /// Returns the session manager.
    pub fn sessions(&self) -> SessionManager {
        SessionManager::new(self.shared.clone())
    }

    /// Returns the credential repository.
    pub fn credentials(&self) -> CredentialRepository {
        CredentialRepository::new(self.shared.clone())
    }

    /// Returns the catalog repository.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let hits = store.catalog().search_products(&session, "rice", 20).await?;
    /// ```
    pub fn catalog(&self) -> CatalogRepository {
        CatalogRepository::new(self.shared.clone())
    }

    /// Returns the ledger repository.
    pub fn ledger(&self) -> LedgerRepository {
        LedgerRepository::new(self.shared.clone())
    }

    /// Returns the sale coordinator.
    pub fn sales(&self) -> SaleCoordinator {
        SaleCoordinator::new(self.shared.clone())
    }

    /// Returns the settings repository.
    pub fn settings(&self) -> SettingsRepository {
        SettingsRepository::new(self.shared.clone())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> StoreConfig {
        StoreConfig::new(dir.path())
            .bootstrap_admin("admin", "admin-pw")
            .fast_hashing()
    }

    #[tokio::test]
    async fn test_open_creates_tables() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(config(&dir)).await.unwrap();
        let paths = store.paths();

        assert_eq!(
            tokio::fs::read_to_string(&paths.products).await.unwrap(),
            "barcode,name,price,stock\n"
        );
        assert_eq!(
            tokio::fs::read_to_string(&paths.sales).await.unwrap(),
            "timestamp,barcode,name,quantity,unit_price,line_total\n"
        );
        assert_eq!(
            tokio::fs::read_to_string(&paths.cash_flow).await.unwrap(),
            "timestamp,type,amount,concept\n"
        );
        let credentials = tokio::fs::read_to_string(&paths.credentials).await.unwrap();
        assert!(credentials.starts_with("username,role,salt,password_hash\nadmin,admin,"));
        assert!(!credentials.contains("admin-pw"));
        assert!(!paths.settings.exists());
    }

    #[tokio::test]
    async fn test_open_without_bootstrap_admin_fails() {
        let dir = TempDir::new().unwrap();
        let result = Store::open(StoreConfig::new(dir.path()).fast_hashing()).await;
        assert!(matches!(result, Err(StoreError::Config(_))));
    }

    #[tokio::test]
    async fn test_reopen_keeps_existing_credentials() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(config(&dir)).await.unwrap();
        let before = tokio::fs::read(&store.paths().credentials).await.unwrap();

        let reopened = Store::open(StoreConfig::new(dir.path()).fast_hashing())
            .await
            .unwrap();
        let after = tokio::fs::read(&reopened.paths().credentials).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_handles_on_one_directory_share_lock_and_sessions() {
        let dir = TempDir::new().unwrap();
        let a = Store::open(config(&dir)).await.unwrap();
        let b = Store::open(config(&dir)).await.unwrap();
        assert!(Arc::ptr_eq(&a.shared.lock, &b.shared.lock));
        assert!(Arc::ptr_eq(&a.shared.sessions, &b.shared.sessions));

        let other_dir = TempDir::new().unwrap();
        let c = Store::open(config(&other_dir)).await.unwrap();
        assert!(!Arc::ptr_eq(&a.shared.lock, &c.shared.lock));
        assert!(!Arc::ptr_eq(&a.shared.sessions, &c.shared.sessions));
    }

    #[test]
    fn test_config_builder_and_redaction() {
        let config = StoreConfig::new("/tmp/till")
            .bootstrap_admin("admin", "hunter22")
            .password_pepper("chili")
            .argon2_params(4096, 3, 1);

        assert_eq!(config.argon2_memory_kib, 4096);
        assert_eq!(config.argon2_iterations, 3);
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter22"));
        assert!(!rendered.contains("chili"));
    }

    #[test]
    fn test_data_paths() {
        let paths = DataPaths::new("/data");
        assert_eq!(paths.journal, PathBuf::from("/data/sale.journal"));
        assert_eq!(paths.cash_flow, PathBuf::from("/data/cash_flow.csv"));
    }
}
