//! # Settings Repository
//!
//! The store profile in `settings.json`. Anyone may read it; saving needs
//! the edit-settings permission.

use std::sync::Arc;

use tracing::info;

use till_core::{Operation, StoreSettings};

use crate::error::{StoreError, StoreResult};
use crate::fsio;
use crate::session::Session;
use crate::store::StoreShared;

/// Repository for the store profile.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    shared: Arc<StoreShared>,
}

impl SettingsRepository {
    pub(crate) fn new(shared: Arc<StoreShared>) -> Self {
        SettingsRepository { shared }
    }

    /// Reads the profile. A missing file yields the defaults.
    ///
    /// ## Errors
    /// - `Corrupt` - the file exists but is not valid settings JSON
    pub async fn load(&self) -> StoreResult<StoreSettings> {
        let path = &self.shared.paths.settings;
        let bytes = fsio::read_optional(path)
            .await
            .map_err(|e| StoreError::storage("reading settings", e))?;
        match bytes {
            None => Ok(StoreSettings::default()),
            Some(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| StoreError::corrupt(path, e.to_string()))
            }
        }
    }

    /// Validates and saves the profile, returning what was stored.
    pub async fn save(
        &self,
        session: &Session,
        settings: StoreSettings,
    ) -> StoreResult<StoreSettings> {
        let actor = self.shared.sessions.authorize(session, Operation::EditSettings)?;
        let settings = settings.validated()?;

        let mut bytes = serde_json::to_vec_pretty(&settings)
            .map_err(|e| StoreError::storage("encoding settings", e.into()))?;
        bytes.push(b'\n');

        let _guard = self.shared.lock.lock().await;
        fsio::write_atomic(&self.shared.paths.settings, &bytes)
            .await
            .map_err(|e| StoreError::storage("writing settings", e))?;

        info!(business = %settings.business_name, by = %actor.username, "Settings saved");
        Ok(settings)
    }
}
