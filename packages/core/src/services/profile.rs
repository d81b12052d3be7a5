use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::catalog::{required_documents, ApplicationStatus, DocumentType};
use crate::config::ResourceIds;
use crate::error::{ErrorCode, ServiceError};
use crate::remote::{Query, RemoteBackend, ID_UNIQUE};

/// Candidate profile document.
///
/// Document file references live in `documents`, keyed by
/// [`DocumentType::profile_field`]; empty strings mean "not uploaded".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(rename = "$id")]
    pub document_id: String,
    pub user_id: String,
    pub full_name: String,
    #[serde(default)]
    pub place_of_birth: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub consent_given: bool,
    #[serde(default)]
    pub application_status: ApplicationStatus,
    #[serde(default)]
    pub profile_last_updated_at: Option<String>,
    #[serde(flatten)]
    pub documents: Map<String, Value>,
}

impl Profile {
    /// Uploaded file ids for `doc_type`, in upload order.
    pub fn file_ids(&self, doc_type: DocumentType) -> Vec<String> {
        match self.documents.get(doc_type.profile_field()) {
            Some(Value::String(id)) if !id.is_empty() => vec![id.clone()],
            Some(Value::Array(ids)) => ids
                .iter()
                .filter_map(Value::as_str)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn has_document(&self, doc_type: DocumentType) -> bool {
        !self.file_ids(doc_type).is_empty()
    }

    pub fn missing_required_documents(&self) -> Vec<DocumentType> {
        required_documents()
            .filter(|doc_type| !self.has_document(*doc_type))
            .collect()
    }
}

/// Partial profile update. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consent_given: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_status: Option<ApplicationStatus>,
    #[serde(flatten)]
    pub documents: Map<String, Value>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        *self == ProfilePatch::default()
    }

    fn into_data(self) -> Result<Map<String, Value>, ServiceError> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(ServiceError::new("Failed to update profile")),
            Err(err) => Err(ServiceError::new(format!("Failed to encode profile: {}", err))),
        }
    }
}

fn incomplete(message: impl Into<String>) -> ServiceError {
    ServiceError {
        code: Some(ErrorCode::Status(400)),
        message: message.into(),
        kind: Some("profile_incomplete".into()),
    }
}

#[derive(Clone)]
pub struct ProfileService {
    backend: Arc<dyn RemoteBackend>,
    resources: ResourceIds,
}

impl ProfileService {
    pub fn new(backend: Arc<dyn RemoteBackend>, resources: ResourceIds) -> Self {
        Self { backend, resources }
    }

    pub async fn create_basic_profile(&self, user_id: &str, full_name: &str) -> Result<Profile, ServiceError> {
        let mut data = Map::new();
        data.insert("userId".into(), user_id.into());
        data.insert("fullName".into(), full_name.into());
        data.insert("placeOfBirth".into(), "".into());
        data.insert("dateOfBirth".into(), "".into());
        data.insert("consentGiven".into(), false.into());
        data.insert(
            "applicationStatus".into(),
            serde_json::to_value(ApplicationStatus::Draft).unwrap_or(Value::Null),
        );
        for doc_type in DocumentType::ALL {
            let empty = if doc_type.is_multiple() {
                Value::Array(Vec::new())
            } else {
                Value::String(String::new())
            };
            data.insert(doc_type.profile_field().into(), empty);
        }
        data.insert("profileLastUpdatedAt".into(), Utc::now().to_rfc3339().into());

        let document = self
            .backend
            .create_document(
                &self.resources.database_id,
                &self.resources.profiles_collection_id,
                ID_UNIQUE,
                &data,
            )
            .await
            .map_err(ServiceError::with_fallback("Failed to create profile"))?;

        tracing::info!("Profile {} created for user {}", document.id, user_id);
        document
            .into_typed()
            .map_err(ServiceError::with_fallback("Failed to create profile"))
    }

    /// First profile owned by `user_id`. Lookup failures read as "no profile".
    pub async fn get_profile(&self, user_id: &str) -> Option<Profile> {
        let result = self
            .backend
            .list_documents(
                &self.resources.database_id,
                &self.resources.profiles_collection_id,
                &[Query::equal("userId", user_id)],
            )
            .await;

        let list = match result {
            Ok(list) => list,
            Err(err) => {
                tracing::error!("Failed to get profile for {}: {}", user_id, err);
                return None;
            }
        };

        let Some(document) = list.documents.into_iter().next() else {
            tracing::debug!("No profile found for user {}", user_id);
            return None;
        };

        match document.into_typed::<Profile>() {
            Ok(profile) => Some(profile),
            Err(err) => {
                tracing::error!("Profile for {} is malformed: {}", user_id, err);
                None
            }
        }
    }

    pub async fn has_profile(&self, user_id: &str) -> bool {
        self.get_profile(user_id).await.is_some()
    }

    /// Apply `patch`, always stamping `profileLastUpdatedAt`.
    pub async fn update_profile(&self, document_id: &str, patch: ProfilePatch) -> Result<Profile, ServiceError> {
        let mut data = patch.into_data()?;
        data.insert("profileLastUpdatedAt".into(), Utc::now().to_rfc3339().into());

        let document = self
            .backend
            .update_document(
                &self.resources.database_id,
                &self.resources.profiles_collection_id,
                document_id,
                &data,
            )
            .await
            .map_err(ServiceError::with_fallback("Failed to update profile"))?;

        tracing::info!("Profile {} updated", document_id);
        document
            .into_typed()
            .map_err(ServiceError::with_fallback("Failed to update profile"))
    }

    /// Record an uploaded file. Single-valued types are replaced,
    /// multi-valued types are appended to.
    pub async fn attach_document(
        &self,
        profile: &Profile,
        doc_type: DocumentType,
        file_id: &str,
    ) -> Result<Profile, ServiceError> {
        let value = if doc_type.is_multiple() {
            let mut ids = profile.file_ids(doc_type);
            ids.push(file_id.to_string());
            Value::from(ids)
        } else {
            Value::from(file_id)
        };

        let mut patch = ProfilePatch::default();
        patch.documents.insert(doc_type.profile_field().into(), value);
        self.update_profile(&profile.document_id, patch).await
    }

    pub async fn detach_document(
        &self,
        profile: &Profile,
        doc_type: DocumentType,
        file_id: &str,
    ) -> Result<Profile, ServiceError> {
        let value = if doc_type.is_multiple() {
            let ids: Vec<String> = profile
                .file_ids(doc_type)
                .into_iter()
                .filter(|id| id != file_id)
                .collect();
            Value::from(ids)
        } else {
            Value::from("")
        };

        let mut patch = ProfilePatch::default();
        patch.documents.insert(doc_type.profile_field().into(), value);
        self.update_profile(&profile.document_id, patch).await
    }

    /// Move a complete draft profile to `pending`.
    pub async fn submit_application(&self, profile: &Profile) -> Result<Profile, ServiceError> {
        if profile.application_status != ApplicationStatus::Draft {
            return Err(incomplete(format!(
                "Application already submitted (status: {})",
                profile.application_status
            )));
        }
        if !profile.consent_given {
            return Err(incomplete("Consent is required before submitting"));
        }

        let missing = profile.missing_required_documents();
        if !missing.is_empty() {
            let labels: Vec<&str> = missing.iter().map(|doc_type| doc_type.spec().label).collect();
            return Err(incomplete(format!(
                "Missing required documents: {}",
                labels.join(", ")
            )));
        }

        let patch = ProfilePatch {
            application_status: Some(ApplicationStatus::Pending),
            ..ProfilePatch::default()
        };
        self.update_profile(&profile.document_id, patch).await
    }
}
