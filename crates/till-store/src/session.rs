//! # Session Manager
//!
//! Opaque session tokens bound to one authenticated identity.
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  login(user, pw) ──► Session(token) ──► every operation takes &Session  │
//! │                           │                                             │
//! │                           ├── logout(&session)        → inactive        │
//! │                           └── delete_user(its user)   → revoked         │
//! │                                                                         │
//! │  Inactive session on any operation → AuthError::SessionNotActive        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `SessionTable::authorize_for` is the single place where a permission
//! check becomes a `PermissionDenied` error.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info};
use uuid::Uuid;

use till_core::{authorize, Operation, Role};

use crate::error::{AuthError, StoreError, StoreResult};
use crate::repository::credentials::CredentialRepository;
use crate::store::StoreShared;

// =============================================================================
// Session & Identity
// =============================================================================

/// An opaque handle returned by `login`. Clone it freely; it carries no
/// identity data of its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Session {
    token: Uuid,
}

impl Session {
    /// The token, for callers that need to store the handle.
    pub fn token(&self) -> Uuid {
        self.token
    }
}

/// Who a session acts as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub role: Role,
}

// =============================================================================
// Session Table
// =============================================================================

/// Live sessions of one store handle.
#[derive(Debug, Default)]
pub(crate) struct SessionTable {
    sessions: RwLock<HashMap<Uuid, Identity>>,
}

impl SessionTable {
    pub(crate) fn open(&self, identity: Identity) -> Session {
        let token = Uuid::new_v4();
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token, identity);
        Session { token }
    }

    pub(crate) fn close(&self, session: &Session) -> Option<Identity> {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&session.token)
    }

    pub(crate) fn identity(&self, session: &Session) -> StoreResult<Identity> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&session.token)
            .cloned()
            .ok_or(StoreError::Auth(AuthError::SessionNotActive))
    }

    /// Ends every session of `username`. Returns how many were ended.
    pub(crate) fn revoke_user(&self, username: &str) -> usize {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, identity| identity.username != username);
        before - sessions.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Checks that `session` is active and its role may perform `operation`.
    pub(crate) fn authorize(&self, session: &Session, operation: Operation) -> StoreResult<Identity> {
        self.authorize_for(session, operation, None)
    }

    /// Like `authorize`, but also lets a session act on its own account
    /// (`owner`) without the permission.
    pub(crate) fn authorize_for(
        &self,
        session: &Session,
        operation: Operation,
        owner: Option<&str>,
    ) -> StoreResult<Identity> {
        let identity = self.identity(session)?;
        let is_owner = owner.is_some_and(|owner| owner == identity.username);

        if is_owner || authorize(identity.role, operation) {
            Ok(identity)
        } else {
            debug!(
                user = %identity.username,
                role = %identity.role,
                operation = %operation,
                "Permission denied"
            );
            Err(StoreError::PermissionDenied {
                role: identity.role,
                operation,
            })
        }
    }
}

// =============================================================================
// Session Manager
// =============================================================================

/// Login, logout and role lookup.
///
/// ## Usage
/// ```rust,ignore
/// let session = store.sessions().login("admin", "s3cret").await?;
/// assert_eq!(store.sessions().current_role(&session)?, Role::Admin);
/// store.sessions().logout(&session);
/// ```
#[derive(Debug, Clone)]
pub struct SessionManager {
    shared: Arc<StoreShared>,
}

impl SessionManager {
    pub(crate) fn new(shared: Arc<StoreShared>) -> Self {
        SessionManager { shared }
    }

    /// Authenticates and opens a session.
    pub async fn login(&self, username: &str, password: &str) -> StoreResult<Session> {
        let identity = CredentialRepository::new(self.shared.clone())
            .authenticate(username, password)
            .await?;
        info!(user = %identity.username, role = %identity.role, "User logged in");
        Ok(self.shared.sessions.open(identity))
    }

    /// Ends a session. Logging out an inactive session does nothing.
    pub fn logout(&self, session: &Session) {
        match self.shared.sessions.close(session) {
            Some(identity) => info!(user = %identity.username, "User logged out"),
            None => debug!("Logout of inactive session ignored"),
        }
    }

    /// The role of the session's user.
    pub fn current_role(&self, session: &Session) -> StoreResult<Role> {
        Ok(self.shared.sessions.identity(session)?.role)
    }

    /// The user the session acts as.
    pub fn identity(&self, session: &Session) -> StoreResult<Identity> {
        self.shared.sessions.identity(session)
    }

    /// Checks a permission for a session, as every store operation does.
    pub fn authorize(&self, session: &Session, operation: Operation) -> StoreResult<Identity> {
        self.shared.sessions.authorize(session, operation)
    }

    /// Number of live sessions on this data directory.
    pub fn active_sessions(&self) -> usize {
        self.shared.sessions.len()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(username: &str, role: Role) -> Identity {
        Identity {
            username: username.to_string(),
            role,
        }
    }

    #[test]
    fn test_open_and_close() {
        let table = SessionTable::default();
        let session = table.open(identity("ana", Role::Cashier));

        assert_eq!(table.identity(&session).unwrap().username, "ana");
        assert_eq!(table.len(), 1);

        assert!(table.close(&session).is_some());
        assert!(matches!(
            table.identity(&session),
            Err(StoreError::Auth(AuthError::SessionNotActive))
        ));
        assert!(table.close(&session).is_none());
    }

    #[test]
    fn test_authorize_uses_permission_table() {
        let table = SessionTable::default();
        let cashier = table.open(identity("ana", Role::Cashier));
        let admin = table.open(identity("root", Role::Admin));

        assert!(table.authorize(&cashier, Operation::ProcessSale).is_ok());
        assert!(matches!(
            table.authorize(&cashier, Operation::ManageProducts),
            Err(StoreError::PermissionDenied {
                role: Role::Cashier,
                operation: Operation::ManageProducts
            })
        ));
        assert!(table.authorize(&admin, Operation::EditSettings).is_ok());
    }

    #[test]
    fn test_authorize_for_owner() {
        let table = SessionTable::default();
        let cashier = table.open(identity("ana", Role::Cashier));

        assert!(table
            .authorize_for(&cashier, Operation::ManageUsers, Some("ana"))
            .is_ok());
        assert!(table
            .authorize_for(&cashier, Operation::ManageUsers, Some("bob"))
            .is_err());
    }

    #[test]
    fn test_revoke_user() {
        let table = SessionTable::default();
        let first = table.open(identity("ana", Role::Cashier));
        let second = table.open(identity("ana", Role::Cashier));
        let other = table.open(identity("bob", Role::Admin));

        assert_eq!(table.revoke_user("ana"), 2);
        assert!(table.identity(&first).is_err());
        assert!(table.identity(&second).is_err());
        assert!(table.identity(&other).is_ok());
    }
}
