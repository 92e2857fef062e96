//! # Credential Repository
//!
//! Users, roles and password hashes in `credentials.csv`.
//!
//! ## File Layout
//! ```text
//! username,role,salt,password_hash
//! admin,admin,Zm9vYmFy...,$argon2id$v=19$m=19456,t=2,p=1$Zm9vYmFy...$...
//! ana,cashier,...,...
//! ```
//!
//! ## Guards
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  delete_user(session, target)                                          │
//! │       │                                                                 │
//! │       ├── target == session user?         → PolicyError::SelfDeletion  │
//! │       ├── target is the only admin?       → PolicyError::LastAdmin     │
//! │       └── OK → rewrite file, revoke target's sessions                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::Path;
use std::sync::Arc;

use csv::StringRecord;
use tracing::{debug, info};

use till_core::validation::{validate_password, validate_username};
use till_core::{Operation, Role, UserSummary, ValidationError};

use crate::codec::{expect_columns, field, read_table, write_table};
use crate::error::{AuthError, PolicyError, StoreError, StoreResult};
use crate::fsio;
use crate::session::{Identity, Session};
use crate::store::StoreShared;

pub const CREDENTIALS_HEADER: [&str; 4] = ["username", "role", "salt", "password_hash"];

/// One row of `credentials.csv`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StoredUser {
    username: String,
    role: Role,
    salt: String,
    password_hash: String,
}

fn encode_users(users: &[StoredUser]) -> std::io::Result<Vec<u8>> {
    write_table(Some(&CREDENTIALS_HEADER[..]), users, |user| {
        vec![
            user.username.clone(),
            user.role.to_string(),
            user.salt.clone(),
            user.password_hash.clone(),
        ]
    })
}

fn parse_user(record: &StringRecord) -> Result<StoredUser, String> {
    expect_columns(record, &[4])?;
    let username = field(record, 0, "username")?;
    let role = field(record, 1, "role")?
        .parse::<Role>()
        .map_err(|e| e.to_string())?;
    let salt = field(record, 2, "salt")?;
    let password_hash = field(record, 3, "password_hash")?;
    if username.is_empty() || salt.is_empty() || password_hash.is_empty() {
        return Err("empty credential field".to_string());
    }
    Ok(StoredUser {
        username: username.to_string(),
        role,
        salt: salt.to_string(),
        password_hash: password_hash.to_string(),
    })
}

/// Position of `target` if `actor` may delete it.
///
/// Roles come from the file, not from the actor's session.
fn deletable(users: &[StoredUser], actor: &str, target: &str) -> StoreResult<usize> {
    let idx = users
        .iter()
        .position(|u| u.username == target)
        .ok_or_else(|| StoreError::not_found("User", target))?;

    if actor == target {
        return Err(PolicyError::SelfDeletion(target.to_string()).into());
    }
    let admins = users.iter().filter(|u| u.role == Role::Admin).count();
    if users[idx].role == Role::Admin && admins <= 1 {
        return Err(PolicyError::LastAdmin(target.to_string()).into());
    }
    Ok(idx)
}

fn decode_users(path: &Path, bytes: &[u8]) -> Vec<StoredUser> {
    read_table(path, bytes, parse_user)
}

/// Repository for users and their credentials.
#[derive(Debug, Clone)]
pub struct CredentialRepository {
    shared: Arc<StoreShared>,
}

impl CredentialRepository {
    pub(crate) fn new(shared: Arc<StoreShared>) -> Self {
        CredentialRepository { shared }
    }

    async fn load(&self) -> StoreResult<Vec<StoredUser>> {
        let path = &self.shared.paths.credentials;
        let bytes = fsio::read_optional(path)
            .await
            .map_err(|e| StoreError::storage("reading credentials", e))?;
        Ok(bytes.map(|b| decode_users(path, &b)).unwrap_or_default())
    }

    async fn write(&self, users: &[StoredUser]) -> StoreResult<()> {
        let bytes =
            encode_users(users).map_err(|e| StoreError::storage("encoding credentials", e))?;
        fsio::write_atomic(&self.shared.paths.credentials, &bytes)
            .await
            .map_err(|e| StoreError::storage("writing credentials", e))
    }

    /// Creates `credentials.csv` holding one admin. Caller holds the lock.
    pub(crate) async fn bootstrap(&self, username: &str, password: &str) -> StoreResult<()> {
        let username = validate_username(username)?;
        validate_password(password)?;
        let hashed = self.shared.hasher.hash(password).await?;

        self.write(&[StoredUser {
            username: username.clone(),
            role: Role::Admin,
            salt: hashed.salt,
            password_hash: hashed.hash,
        }])
        .await?;

        info!(user = %username, "Created credentials file with bootstrap admin");
        Ok(())
    }

    /// Checks a username and password.
    ///
    /// ## Returns
    /// * `Ok(Identity)` - Password matches
    /// * `Err(AuthError::InvalidCredentials)` - Unknown user or wrong password
    pub async fn authenticate(&self, username: &str, password: &str) -> StoreResult<Identity> {
        let username = username.trim();
        let users = self.load().await?;

        let Some(user) = users.into_iter().find(|u| u.username == username) else {
            self.shared.hasher.equalize_timing(password).await;
            debug!("Login for unknown user rejected");
            return Err(AuthError::InvalidCredentials.into());
        };

        if self.shared.hasher.verify(password, &user.password_hash).await? {
            Ok(Identity {
                username: user.username,
                role: user.role,
            })
        } else {
            debug!(user = %username, "Login with wrong password rejected");
            Err(AuthError::InvalidCredentials.into())
        }
    }

    /// Adds a user.
    ///
    /// ## Errors
    /// - `ValidationError` - ill-formed username or password, or the
    ///   username is taken
    pub async fn create_user(
        &self,
        session: &Session,
        username: &str,
        password: &str,
        role: Role,
    ) -> StoreResult<()> {
        let actor = self.shared.sessions.authorize(session, Operation::ManageUsers)?;
        let username = validate_username(username)?;
        validate_password(password)?;
        let hashed = self.shared.hasher.hash(password).await?;

        let _guard = self.shared.lock.lock().await;
        let mut users = self.load().await?;
        if users.iter().any(|u| u.username == username) {
            return Err(ValidationError::Duplicate {
                field: "username".to_string(),
                value: username,
            }
            .into());
        }

        users.push(StoredUser {
            username: username.clone(),
            role,
            salt: hashed.salt,
            password_hash: hashed.hash,
        });
        self.write(&users).await?;

        info!(user = %username, role = %role, by = %actor.username, "User created");
        Ok(())
    }

    /// Replaces a user's password.
    ///
    /// Allowed with manage-users, or for the session's own account.
    pub async fn change_password(
        &self,
        session: &Session,
        username: &str,
        new_password: &str,
    ) -> StoreResult<()> {
        let username = username.trim();
        let actor =
            self.shared
                .sessions
                .authorize_for(session, Operation::ManageUsers, Some(username))?;
        validate_password(new_password)?;
        let hashed = self.shared.hasher.hash(new_password).await?;

        let _guard = self.shared.lock.lock().await;
        let mut users = self.load().await?;
        let user = users
            .iter_mut()
            .find(|u| u.username == username)
            .ok_or_else(|| StoreError::not_found("User", username))?;
        user.salt = hashed.salt;
        user.password_hash = hashed.hash;
        self.write(&users).await?;

        info!(user = %username, by = %actor.username, "Password changed");
        Ok(())
    }

    /// Removes a user and ends their sessions.
    ///
    /// ## Errors
    /// - `PolicyError::SelfDeletion` - target is the session's own user
    /// - `PolicyError::LastAdmin` - target is the only admin
    /// - `NotFound` - no such user
    pub async fn delete_user(&self, session: &Session, username: &str) -> StoreResult<()> {
        let username = username.trim();
        let actor = self.shared.sessions.authorize(session, Operation::ManageUsers)?;

        let _guard = self.shared.lock.lock().await;
        let mut users = self.load().await?;
        let idx = deletable(&users, &actor.username, username)?;

        users.remove(idx);
        self.write(&users).await?;
        let revoked = self.shared.sessions.revoke_user(username);

        info!(user = %username, by = %actor.username, revoked_sessions = revoked, "User deleted");
        Ok(())
    }

    /// Every user with their role, in file order.
    pub async fn list_users(&self, session: &Session) -> StoreResult<Vec<UserSummary>> {
        self.shared.sessions.authorize(session, Operation::ManageUsers)?;
        Ok(self
            .load()
            .await?
            .into_iter()
            .map(|u| UserSummary {
                username: u.username,
                role: u.role,
            })
            .collect())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
