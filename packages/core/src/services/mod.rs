//! Domain services over the remote backend.
//!
//! Each service normalises backend failures into [`ServiceError`] with an
//! operation-specific fallback message.
//!
//! [`ServiceError`]: crate::error::ServiceError

pub mod auth;
pub mod files;
pub mod profile;

use std::sync::Arc;

use crate::config::{Config, ResourceIds};
use crate::remote::RemoteBackend;

pub use auth::{AuthService, LoginCredentials, RegisterCredentials};
pub use files::FileService;
pub use profile::{Profile, ProfilePatch, ProfileService};

/// The three services wired to one backend.
#[derive(Clone)]
pub struct Services {
    pub auth: AuthService,
    pub profiles: ProfileService,
    pub files: FileService,
}

impl Services {
    pub fn new(
        backend: Arc<dyn RemoteBackend>,
        resources: ResourceIds,
        recovery_url: impl Into<String>,
    ) -> Self {
        let files = FileService::new(backend.clone(), resources.user_documents_bucket_id.clone());
        let profiles = ProfileService::new(backend.clone(), resources);
        let auth = AuthService::new(backend, profiles.clone(), recovery_url);
        Self {
            auth,
            profiles,
            files,
        }
    }

    pub fn from_config(backend: Arc<dyn RemoteBackend>, config: &Config) -> Self {
        Self::new(
            backend,
            config.resources.clone(),
            config.recovery_redirect_url(),
        )
    }
}
