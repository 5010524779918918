//! SessionStore - 認証状態の保持と永続化
//!
//! # 不変条件
//! - Session は identity + credential が揃っているか、完全に無いかのどちらか
//! - 状態変更は `watch` チャネルに即座に反映される（logout 直後に古い session が見える窓は無い）
//! - restore() はサーバーに問い合わせない（無効なら最初の保護 API 呼び出しで判明する）

use std::sync::Arc;

use tokio::sync::watch;

use crate::domain::{AtsError, Credential, Identity, Session};
use crate::ports::{AtsApi, SessionStorage, StorageError};

/// Storage key holding the bearer token.
pub const TOKEN_KEY: &str = "token";
/// Storage key holding the identity as JSON.
pub const USER_KEY: &str = "user";

/// Holds the current session and mirrors it into durable storage.
///
/// Cloning is cheap; every clone observes the same state.
#[derive(Clone)]
pub struct SessionStore {
    api: Arc<dyn AtsApi>,
    storage: Arc<dyn SessionStorage>,
    state: Arc<watch::Sender<Option<Session>>>,
}

impl SessionStore {
    pub fn new(api: Arc<dyn AtsApi>, storage: Arc<dyn SessionStorage>) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            api,
            storage,
            state: Arc::new(state),
        }
    }

    /// Reload a session persisted by a previous run.
    ///
    /// Both keys must be present and readable; a lone key is treated as no
    /// session and cleaned up.
    pub fn restore(&self) -> Option<Session> {
        let restored = match self.read_persisted() {
            Ok(restored) => restored,
            Err(e) => {
                tracing::warn!(error = %e, "stored session is unreadable, discarding it");
                None
            }
        };
        match &restored {
            Some(session) => {
                tracing::info!(email = %session.identity.email, "session restored");
            }
            None => self.clear_persisted(),
        }
        self.state.send_replace(restored.clone());
        restored
    }

    fn read_persisted(&self) -> Result<Option<Session>, StorageError> {
        let token = self.storage.get(TOKEN_KEY)?;
        let user = self.storage.get(USER_KEY)?;
        match (token, user) {
            (Some(token), Some(user)) if !token.trim().is_empty() => {
                let identity: Identity = serde_json::from_str(&user)?;
                Ok(Some(Session::new(identity, Credential::new(token.trim()))))
            }
            _ => Ok(None),
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AtsError> {
        let session = self.api.login(email, password).await?;
        self.establish(session.clone());
        tracing::info!(email = %session.identity.email, "logged in");
        Ok(session)
    }

    pub async fn register(
        &self,
        full_name: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, AtsError> {
        let session = self.api.register(full_name, email, password).await?;
        self.establish(session.clone());
        tracing::info!(email = %session.identity.email, "registered");
        Ok(session)
    }

    /// Clear the session from memory and storage. Never fails.
    pub fn logout(&self) {
        let previous = self.state.send_replace(None);
        self.clear_persisted();
        if let Some(previous) = previous {
            tracing::info!(email = %previous.identity.email, "logged out");
        }
    }

    /// Drop the session, but only if it still carries `credential`.
    ///
    /// A rejection that arrives after the user already logged in again must not
    /// end the newer session.
    pub fn invalidate(&self, credential: &Credential) -> bool {
        let current = self.current();
        let matches = current
            .as_ref()
            .is_some_and(|session| &session.credential == credential);
        if matches {
            tracing::warn!("credential rejected by the server, ending session");
            self.logout();
        }
        matches
    }

    pub fn current(&self) -> Option<Session> {
        self.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// Observe session changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.state.subscribe()
    }

    fn establish(&self, session: Session) {
        if let Err(e) = self.persist(&session) {
            // the in-memory session still works for this run
            tracing::warn!(error = %e, "could not persist session");
            self.clear_persisted();
        }
        self.state.send_replace(Some(session));
    }

    fn persist(&self, session: &Session) -> Result<(), StorageError> {
        let user = serde_json::to_string(&session.identity)?;
        self.storage.set(USER_KEY, &user)?;
        self.storage.set(TOKEN_KEY, session.credential.as_str())?;
        Ok(())
    }

    fn clear_persisted(&self) {
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.storage.remove(key) {
                tracing::warn!(key, error = %e, "could not clear stored session");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::{InMemoryAtsApi, InMemorySessionStorage};

    fn setup() -> (Arc<InMemoryAtsApi>, Arc<InMemorySessionStorage>, SessionStore) {
        let api = Arc::new(InMemoryAtsApi::new());
        api.seed_user("Rita Recruiter", "rita@example.com", "pw");
        let storage = Arc::new(InMemorySessionStorage::new());
        let store = SessionStore::new(api.clone(), storage.clone());
        (api, storage, store)
    }

    #[tokio::test]
    async fn login_persists_and_restore_survives_reload() {
        let (api, storage, store) = setup();
        let session = store.login("rita@example.com", "pw").await.unwrap();
        assert_eq!(session.identity.display_name, "Rita Recruiter");
        assert!(store.is_authenticated());
        assert_eq!(storage.len(), 2);

        // a fresh store over the same storage, as after a reload
        let calls_before = api.calls().len();
        let reloaded = SessionStore::new(api.clone(), storage.clone());
        assert_eq!(reloaded.restore(), Some(session));
        assert_eq!(api.calls().len(), calls_before);
    }

    #[tokio::test]
    async fn rejected_login_leaves_no_session() {
        let (_api, storage, store) = setup();
        let err = store.login("rita@example.com", "wrong").await.unwrap_err();
        assert!(err.is_auth());
        assert!(store.current().is_none());
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn duplicate_registration_is_an_auth_error() {
        let (_api, _storage, store) = setup();
        let err = store
            .register("Rita Again", "rita@example.com", "pw")
            .await
            .unwrap_err();
        assert_eq!(err, AtsError::Auth("Email is already registered".into()));
    }

    #[tokio::test]
    async fn logout_is_visible_immediately() {
        let (_api, storage, store) = setup();
        let rx = store.subscribe();
        store.login("rita@example.com", "pw").await.unwrap();
        assert!(rx.borrow().is_some());

        store.logout();
        assert!(rx.borrow().is_none());
        assert!(!store.is_authenticated());
        assert!(storage.is_empty());

        // logging out twice is harmless
        store.logout();
    }

    #[test]
    fn partial_storage_restores_nothing_and_is_cleaned() {
        let (_api, storage, store) = setup();
        storage.set(TOKEN_KEY, "token-9").unwrap();

        assert_eq!(store.restore(), None);
        assert!(storage.is_empty());
    }

    #[test]
    fn corrupt_identity_restores_nothing() {
        let (_api, storage, store) = setup();
        storage.set(TOKEN_KEY, "token-9").unwrap();
        storage.set(USER_KEY, "not json").unwrap();

        assert_eq!(store.restore(), None);
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn invalidate_only_ends_the_matching_session() {
        let (_api, _storage, store) = setup();
        let first = store.login("rita@example.com", "pw").await.unwrap();
        let second = store.login("rita@example.com", "pw").await.unwrap();
        assert_ne!(first.credential, second.credential);

        assert!(!store.invalidate(&first.credential));
        assert!(store.is_authenticated());

        assert!(store.invalidate(&second.credential));
        assert!(!store.is_authenticated());
    }
}
