use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::remote::{Identity, RemoteBackend, CURRENT_SESSION, ID_UNIQUE};
use crate::validation::{email, max_length, password, required, FormData, FormRules};

use super::profile::ProfileService;

pub const NAME_MAX_LENGTH: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

impl LoginCredentials {
    pub fn form_rules() -> FormRules {
        FormRules::new()
            .field("email", vec![required(), email()])
            .field("password", vec![required()])
    }

    pub fn to_form(&self) -> FormData {
        FormData::from([
            ("email".to_string(), self.email.clone()),
            ("password".to_string(), self.password.clone()),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterCredentials {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterCredentials {
    pub fn form_rules() -> FormRules {
        FormRules::new()
            .field("name", vec![required(), max_length(NAME_MAX_LENGTH)])
            .field("email", vec![required(), email()])
            .field("password", vec![required(), password()])
    }

    pub fn to_form(&self) -> FormData {
        FormData::from([
            ("name".to_string(), self.name.clone()),
            ("email".to_string(), self.email.clone()),
            ("password".to_string(), self.password.clone()),
        ])
    }
}

/// Account and session operations.
#[derive(Clone)]
pub struct AuthService {
    backend: Arc<dyn RemoteBackend>,
    profiles: ProfileService,
    recovery_url: String,
}

impl AuthService {
    pub fn new(
        backend: Arc<dyn RemoteBackend>,
        profiles: ProfileService,
        recovery_url: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            profiles,
            recovery_url: recovery_url.into(),
        }
    }

    /// Create the account, sign in and seed an empty profile.
    ///
    /// A failed profile seed does not fail registration; the profile is
    /// created on first edit instead.
    pub async fn register(&self, credentials: &RegisterCredentials) -> Result<Identity, ServiceError> {
        let fallback = ServiceError::with_fallback("Registration failed");

        let account = self
            .backend
            .create_account(
                ID_UNIQUE,
                &credentials.email,
                &credentials.password,
                &credentials.name,
            )
            .await
            .map_err(&fallback)?;
        tracing::info!("Account {} created", account.id);

        self.backend
            .create_session(&credentials.email, &credentials.password)
            .await
            .map_err(&fallback)?;
        let identity = self.backend.get_current_identity().await.map_err(&fallback)?;

        if let Err(err) = self
            .profiles
            .create_basic_profile(&identity.id, &credentials.name)
            .await
        {
            tracing::error!("Failed to create profile for {}: {}", identity.id, err);
        }

        Ok(identity)
    }

    pub async fn login(&self, credentials: &LoginCredentials) -> Result<Identity, ServiceError> {
        let fallback = ServiceError::with_fallback("Login failed");

        let session = self
            .backend
            .create_session(&credentials.email, &credentials.password)
            .await
            .map_err(&fallback)?;
        tracing::debug!("Session {} opened", session.id);

        self.backend.get_current_identity().await.map_err(&fallback)
    }

    pub async fn logout(&self) -> Result<(), ServiceError> {
        self.backend
            .delete_session(CURRENT_SESSION)
            .await
            .map_err(ServiceError::with_fallback("Logout failed"))?;
        tracing::info!("Session closed");
        Ok(())
    }

    /// Signed-in identity, or `None` when there is none or it cannot be fetched.
    pub async fn current_user(&self) -> Option<Identity> {
        match self.backend.get_current_identity().await {
            Ok(identity) => Some(identity),
            Err(err) => {
                tracing::debug!("No current user: {}", err);
                None
            }
        }
    }

    pub async fn check_auth(&self) -> bool {
        self.current_user().await.is_some()
    }

    pub async fn forgot_password(&self, email: &str) -> Result<(), ServiceError> {
        self.backend
            .create_recovery(email, &self.recovery_url)
            .await
            .map_err(ServiceError::with_fallback("Failed to send recovery email"))?;
        tracing::info!("Recovery email requested");
        Ok(())
    }
}
