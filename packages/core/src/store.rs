//! Process-wide authentication state.
//!
//! `AuthStore` owns the signed-in identity, the loading flag, the last
//! action error and the initialization flag. Only its own actions assign
//! them. Every action returns a `Result` instead of surfacing a raw
//! backend failure, and the failure is also kept as `last_error` for
//! display.
//!
//! The store is shared as `Arc<AuthStore>`; state sits behind a Tokio
//! `RwLock` so readers never block on a pending network call.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, RwLock};

use crate::error::ServiceError;
use crate::remote::Identity;
use crate::services::{AuthService, LoginCredentials, RegisterCredentials};

pub type ActionResult<T> = Result<T, ServiceError>;

#[derive(Debug, Default)]
struct AuthState {
    user: Option<Identity>,
    error: Option<ServiceError>,
}

/// Clears the loading flag when dropped, on every exit path.
struct LoadingGuard<'a>(&'a AtomicBool);

impl<'a> LoadingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct AuthStore {
    auth: AuthService,
    state: RwLock<AuthState>,
    loading: AtomicBool,
    initialized: AtomicBool,
    init_lock: Mutex<()>,
}

impl AuthStore {
    pub fn new(auth: AuthService) -> Self {
        Self {
            auth,
            state: RwLock::new(AuthState::default()),
            loading: AtomicBool::new(false),
            initialized: AtomicBool::new(false),
            init_lock: Mutex::new(()),
        }
    }

    /// Load the current identity once. Later calls, including concurrent
    /// ones that lose the race, return without touching the backend.
    pub async fn initialize(&self) {
        if self.is_initialized() {
            return;
        }
        let _init = self.init_lock.lock().await;
        if self.is_initialized() {
            return;
        }

        let _loading = LoadingGuard::acquire(&self.loading);
        let user = self.auth.current_user().await;
        match &user {
            Some(identity) => tracing::info!("Restored session for {}", identity.id),
            None => tracing::debug!("No session to restore"),
        }
        self.state.write().await.user = user;
        self.initialized.store(true, Ordering::SeqCst);
    }

    pub async fn register(&self, credentials: &RegisterCredentials) -> ActionResult<Identity> {
        let _loading = LoadingGuard::acquire(&self.loading);
        self.clear_error().await;

        let result = self.auth.register(credentials).await;
        self.settle_identity(result).await
    }

    pub async fn login(&self, credentials: &LoginCredentials) -> ActionResult<Identity> {
        let _loading = LoadingGuard::acquire(&self.loading);
        self.clear_error().await;

        let result = self.auth.login(credentials).await;
        self.settle_identity(result).await
    }

    pub async fn logout(&self) -> ActionResult<()> {
        let _loading = LoadingGuard::acquire(&self.loading);
        self.clear_error().await;

        let result = self.auth.logout().await;
        let mut state = self.state.write().await;
        match result {
            Ok(()) => {
                state.user = None;
                Ok(())
            }
            Err(err) => {
                state.error = Some(err.clone());
                Err(err)
            }
        }
    }

    pub async fn forgot_password(&self, email: &str) -> ActionResult<()> {
        let _loading = LoadingGuard::acquire(&self.loading);
        self.clear_error().await;

        let result = self.auth.forgot_password(email).await;
        if let Err(err) = &result {
            self.state.write().await.error = Some(err.clone());
        }
        result
    }

    /// Forget the identity and error without contacting the backend.
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        state.user = None;
        state.error = None;
        self.loading.store(false, Ordering::SeqCst);
    }

    pub async fn clear_error(&self) {
        self.state.write().await.error = None;
    }

    async fn settle_identity(&self, result: ActionResult<Identity>) -> ActionResult<Identity> {
        let mut state = self.state.write().await;
        match result {
            Ok(identity) => {
                state.user = Some(identity.clone());
                Ok(identity)
            }
            Err(err) => {
                state.error = Some(err.clone());
                Err(err)
            }
        }
    }

    pub async fn current_user(&self) -> Option<Identity> {
        self.state.read().await.user.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.user.is_some()
    }

    /// Empty when signed out.
    pub async fn user_name(&self) -> String {
        self.state
            .read()
            .await
            .user
            .as_ref()
            .map(|user| user.name.clone())
            .unwrap_or_default()
    }

    /// Empty when signed out.
    pub async fn user_email(&self) -> String {
        self.state
            .read()
            .await
            .user
            .as_ref()
            .map(|user| user.email.clone())
            .unwrap_or_default()
    }

    pub async fn last_error(&self) -> Option<ServiceError> {
        self.state.read().await.error.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::ResourceIds;
    use crate::error::RemoteError;
    use crate::remote::{InMemoryBackend, RemoteBackend};
    use crate::services::ProfileService;

    fn store_with(backend: Arc<InMemoryBackend>) -> AuthStore {
        let resources = ResourceIds {
            database_id: "main".into(),
            profiles_collection_id: "profiles".into(),
            storage_bucket_id: "uploads".into(),
            user_documents_bucket_id: "uploads".into(),
        };
        let profiles = ProfileService::new(backend.clone(), resources);
        AuthStore::new(AuthService::new(backend, profiles, "http://localhost/reset-password"))
    }

    fn login_as(email: &str, password: &str) -> LoginCredentials {
        LoginCredentials {
            email: email.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn initialize_restores_existing_session() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.seed_account("budi@elkkana.id", "password1", "Budi");
        backend.create_session("budi@elkkana.id", "password1").await.unwrap();
        let store = store_with(backend);

        store.initialize().await;

        assert!(store.is_initialized());
        assert!(store.is_authenticated().await);
        assert_eq!(store.user_name().await, "Budi");
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn initialize_twice_makes_one_remote_call() {
        let backend = Arc::new(InMemoryBackend::new());
        let store = store_with(backend.clone());

        store.initialize().await;
        let after_first = backend.call_count();
        let user = store.current_user().await;
        store.initialize().await;

        assert_eq!(after_first, 1);
        assert_eq!(backend.call_count(), after_first);
        assert_eq!(store.current_user().await, user);
    }

    #[tokio::test]
    async fn concurrent_initialize_is_single_flight() {
        let backend = Arc::new(InMemoryBackend::new());
        let store = store_with(backend.clone());

        tokio::join!(store.initialize(), store.initialize(), store.initialize());
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn failed_initialize_still_marks_initialized() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.fail_next("get_current_identity", RemoteError::Network("offline".into()));
        let store = store_with(backend);

        store.initialize().await;

        assert!(store.is_initialized());
        assert!(!store.is_authenticated().await);
    }

    #[tokio::test]
    async fn failed_login_keeps_error_and_releases_loading() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.seed_account("budi@elkkana.id", "password1", "Budi");
        let store = store_with(backend);

        let err = store
            .login(&login_as("budi@elkkana.id", "wrong-password"))
            .await
            .unwrap_err();

        assert_eq!(err.kind.as_deref(), Some("user_invalid_credentials"));
        assert_eq!(store.last_error().await, Some(err));
        assert!(!store.is_loading());
        assert!(!store.is_authenticated().await);

        store.clear_error().await;
        assert!(store.last_error().await.is_none());
    }

    #[tokio::test]
    async fn login_then_logout() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.seed_account("budi@elkkana.id", "password1", "Budi");
        let store = store_with(backend);

        let identity = store
            .login(&login_as("budi@elkkana.id", "password1"))
            .await
            .unwrap();
        assert_eq!(store.user_email().await, identity.email);

        store.logout().await.unwrap();
        assert!(!store.is_authenticated().await);
        assert_eq!(store.user_email().await, "");
    }

    #[tokio::test]
    async fn successful_action_clears_previous_error() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.seed_account("budi@elkkana.id", "password1", "Budi");
        let store = store_with(backend);

        assert!(store.forgot_password("ghost@elkkana.id").await.is_err());
        assert!(store.last_error().await.is_some());

        store.forgot_password("budi@elkkana.id").await.unwrap();
        assert!(store.last_error().await.is_none());
    }

    #[tokio::test]
    async fn register_sets_user_and_reset_forgets_it() {
        let backend = Arc::new(InMemoryBackend::new());
        let store = store_with(backend);

        store
            .register(&RegisterCredentials {
                name: "Sari".into(),
                email: "sari@elkkana.id".into(),
                password: "password1".into(),
            })
            .await
            .unwrap();
        assert_eq!(store.user_name().await, "Sari");

        store.reset().await;
        assert!(store.current_user().await.is_none());
        assert!(store.last_error().await.is_none());
    }
}
