//! Command execution for the binary.
//!
//! [`Portal`] plays the role of the presentation layer: it validates form
//! input, calls the auth store or a domain service, and routes every
//! failure through the [`ErrorHandler`].

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::catalog::{timeline, ApplicationStatus, DocumentType, DOCUMENT_CATEGORIES};
use crate::cli::{Command, ProfileCommand, ProfileUpdateArgs};
use crate::handler::{AppError, ErrorHandler, RawError};
use crate::navigation::{Navigator, Route};
use crate::remote::{FileUpload, Identity};
use crate::services::{LoginCredentials, Profile, ProfilePatch, RegisterCredentials, Services};
use crate::store::AuthStore;
use crate::validation::{email, max_length, required, validate_form, FormData, FormRules};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{}", describe_fields(.0))]
    InvalidInput(BTreeMap<String, String>),

    #[error("Please log in to continue")]
    SignInRequired,

    #[error("{}", .0.message())]
    Failed(AppError),
}

fn describe_fields(errors: &BTreeMap<String, String>) -> String {
    errors
        .iter()
        .map(|(field, message)| format!("{}: {}", field, message))
        .collect::<Vec<_>>()
        .join("\n")
}

fn check_form(data: &FormData, rules: &FormRules) -> Result<(), CommandError> {
    let result = validate_form(data, rules);
    if result.is_valid {
        Ok(())
    } else {
        Err(CommandError::InvalidInput(result.errors))
    }
}

fn or_dash(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => "-",
    }
}

pub struct Portal {
    store: AuthStore,
    services: Services,
    handler: Arc<ErrorHandler>,
    navigator: Arc<dyn Navigator>,
}

impl Portal {
    pub fn new(services: Services, handler: Arc<ErrorHandler>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            store: AuthStore::new(services.auth.clone()),
            services,
            handler,
            navigator,
        }
    }

    pub fn store(&self) -> &AuthStore {
        &self.store
    }

    pub fn handler(&self) -> &ErrorHandler {
        &self.handler
    }

    /// Run one command and return the text to print.
    pub async fn execute(&self, command: Command) -> Result<String, CommandError> {
        match command {
            Command::Register {
                name,
                email,
                password,
            } => {
                let credentials = RegisterCredentials {
                    name,
                    email,
                    password,
                };
                check_form(&credentials.to_form(), &RegisterCredentials::form_rules())?;
                let identity = self
                    .store
                    .register(&credentials)
                    .await
                    .map_err(RawError::from);
                let identity = self.settle(identity).await?;
                self.navigator.navigate(Route::Dashboard);
                Ok(format!("Registered {} <{}>", identity.name, identity.email))
            }
            Command::Login { email, password } => {
                let credentials = LoginCredentials { email, password };
                check_form(&credentials.to_form(), &LoginCredentials::form_rules())?;
                let identity = self.store.login(&credentials).await.map_err(RawError::from);
                let identity = self.settle(identity).await?;
                self.navigator.navigate(Route::Dashboard);
                Ok(format!("Signed in as {} <{}>", identity.name, identity.email))
            }
            Command::Logout => {
                let result = self.store.logout().await.map_err(RawError::from);
                self.settle(result).await?;
                self.navigator.navigate(Route::Home);
                Ok("Signed out".to_string())
            }
            Command::Whoami => Ok(match self.store.current_user().await {
                Some(user) => format!("{} <{}> ({})", user.name, user.email, user.id),
                None => "Not signed in".to_string(),
            }),
            Command::ForgotPassword { email: address } => {
                let form = FormData::from([("email".to_string(), address.clone())]);
                check_form(&form, &FormRules::new().field("email", vec![required(), email()]))?;
                let result = self
                    .store
                    .forgot_password(&address)
                    .await
                    .map_err(RawError::from);
                self.settle(result).await?;
                Ok(format!("Recovery email sent to {}", address))
            }
            Command::Profile(ProfileCommand::Show) => self.show_profile().await,
            Command::Profile(ProfileCommand::Update(args)) => self.update_profile(args).await,
            Command::Profile(ProfileCommand::Submit) => self.submit_application().await,
            Command::Upload { doc_type, path } => self.upload(doc_type, &path).await,
            Command::DeleteFile { id } => self.delete_file(&id).await,
            Command::Status => self.status().await,
            Command::Documents => Ok(render_documents()),
        }
    }

    /// Route a failure through the error handler.
    async fn settle<T>(&self, result: Result<T, RawError>) -> Result<T, CommandError> {
        match result {
            Ok(value) => Ok(value),
            Err(raw) => Err(CommandError::Failed(self.handler.handle(raw).await)),
        }
    }

    async fn require_user(&self, target: Route) -> Result<Identity, CommandError> {
        let route = target.guard(self.store.is_authenticated().await);
        self.navigator.navigate(route);
        if route != target {
            return Err(CommandError::SignInRequired);
        }
        self.store
            .current_user()
            .await
            .ok_or(CommandError::SignInRequired)
    }

    async fn ensure_profile(&self, user: &Identity) -> Result<Profile, CommandError> {
        if let Some(profile) = self.services.profiles.get_profile(&user.id).await {
            return Ok(profile);
        }
        let created = self
            .services
            .profiles
            .create_basic_profile(&user.id, &user.name)
            .await
            .map_err(RawError::from);
        self.settle(created).await
    }

    async fn show_profile(&self) -> Result<String, CommandError> {
        let user = self.require_user(Route::Dashboard).await?;
        let Some(profile) = self.services.profiles.get_profile(&user.id).await else {
            return Ok("No profile yet. Run `profile update` to create one.".to_string());
        };

        let mut lines = vec![
            format!("Name:           {}", profile.full_name),
            format!("Place of birth: {}", or_dash(profile.place_of_birth.as_deref())),
            format!("Date of birth:  {}", or_dash(profile.date_of_birth.as_deref())),
            format!("Consent given:  {}", if profile.consent_given { "yes" } else { "no" }),
            format!("Status:         {}", profile.application_status),
            format!(
                "Last updated:   {}",
                or_dash(profile.profile_last_updated_at.as_deref())
            ),
            "Documents:".to_string(),
        ];
        for doc_type in DocumentType::ALL {
            let spec = doc_type.spec();
            let ids = profile.file_ids(doc_type);
            let value = if !ids.is_empty() {
                ids.join(", ")
            } else if spec.required {
                "missing (required)".to_string()
            } else {
                "-".to_string()
            };
            lines.push(format!("  {:<28} {}", spec.label, value));
        }
        Ok(lines.join("\n"))
    }

    async fn update_profile(&self, args: ProfileUpdateArgs) -> Result<String, CommandError> {
        let user = self.require_user(Route::ProfileEdit).await?;

        let patch = ProfilePatch {
            full_name: args.full_name,
            place_of_birth: args.place_of_birth,
            date_of_birth: args.date_of_birth,
            consent_given: args.consent.then_some(true),
            ..ProfilePatch::default()
        };
        if patch.is_empty() {
            return Err(CommandError::InvalidInput(BTreeMap::from([(
                "profile".to_string(),
                "Nothing to update".to_string(),
            )])));
        }
        if let Some(full_name) = &patch.full_name {
            let form = FormData::from([("fullName".to_string(), full_name.clone())]);
            let rules = FormRules::new().field("fullName", vec![required(), max_length(128)]);
            check_form(&form, &rules)?;
        }

        let profile = self.ensure_profile(&user).await?;
        let updated = self
            .services
            .profiles
            .update_profile(&profile.document_id, patch)
            .await
            .map_err(RawError::from);
        self.settle(updated).await?;
        Ok("Profile updated".to_string())
    }

    async fn submit_application(&self) -> Result<String, CommandError> {
        let user = self.require_user(Route::ProfileEdit).await?;
        let profile = self.ensure_profile(&user).await?;
        let submitted = self
            .services
            .profiles
            .submit_application(&profile)
            .await
            .map_err(RawError::from);
        let submitted = self.settle(submitted).await?;
        Ok(format!(
            "Application submitted: {}",
            submitted.application_status.description()
        ))
    }

    async fn upload(&self, doc_type: DocumentType, path: &Path) -> Result<String, CommandError> {
        let user = self.require_user(Route::ProfileEdit).await?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|err| RawError::from_error(&err));
        let bytes = self.settle(bytes).await?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        // Resolve the profile first so a failure here stores nothing.
        let profile = self.ensure_profile(&user).await?;
        let uploaded = self
            .services
            .files
            .upload_file(FileUpload::new(name, bytes), &user.id, doc_type)
            .await
            .map_err(RawError::from);
        let file_id = self.settle(uploaded).await?;

        let replaced = if doc_type.is_multiple() {
            Vec::new()
        } else {
            profile.file_ids(doc_type)
        };
        let attached = self
            .services
            .profiles
            .attach_document(&profile, doc_type, &file_id)
            .await
            .map_err(RawError::from);
        if attached.is_err() {
            self.discard_file(&file_id).await;
        }
        self.settle(attached).await?;

        for old in replaced {
            self.discard_file(&old).await;
        }

        Ok(format!(
            "Uploaded {}: {}\nPreview: {}",
            doc_type.spec().label,
            file_id,
            self.services.files.file_preview_url(&file_id)
        ))
    }

    /// Best-effort removal of a stored file nothing references any more.
    async fn discard_file(&self, file_id: &str) {
        if let Err(err) = self.services.files.delete_file(file_id).await {
            tracing::warn!("Could not remove unreferenced file {}: {}", file_id, err);
        }
    }

    /// Detach before deleting, so a failure never leaves the profile
    /// pointing at a file that is gone.
    async fn delete_file(&self, file_id: &str) -> Result<String, CommandError> {
        let user = self.require_user(Route::ProfileEdit).await?;

        if let Some(profile) = self.services.profiles.get_profile(&user.id).await {
            let owner = DocumentType::ALL
                .into_iter()
                .find(|doc_type| profile.file_ids(*doc_type).iter().any(|id| id == file_id));
            if let Some(doc_type) = owner {
                let detached = self
                    .services
                    .profiles
                    .detach_document(&profile, doc_type, file_id)
                    .await
                    .map_err(RawError::from);
                self.settle(detached).await?;
            }
        }

        let deleted = self
            .services
            .files
            .delete_file(file_id)
            .await
            .map_err(RawError::from);
        self.settle(deleted).await?;
        Ok(format!("Deleted {}", file_id))
    }

    async fn status(&self) -> Result<String, CommandError> {
        let user = self.require_user(Route::Dashboard).await?;
        let status = self
            .services
            .profiles
            .get_profile(&user.id)
            .await
            .map(|profile| profile.application_status)
            .unwrap_or(ApplicationStatus::Draft);

        let lines: Vec<String> = timeline(status)
            .into_iter()
            .map(|step| {
                let marker = if step.is_current {
                    '>'
                } else if step.is_completed {
                    'x'
                } else {
                    ' '
                };
                format!("[{}] {:<20} {}", marker, step.label, step.description)
            })
            .collect();
        Ok(lines.join("\n"))
    }
}

fn render_documents() -> String {
    let mut lines = Vec::new();
    for category in DOCUMENT_CATEGORIES {
        lines.push(format!("{} ({})", category.title, category.description));
        for spec in category.documents {
            let mut notes = vec![spec.accepted_formats.join(" ")];
            if spec.required {
                notes.push("required".to_string());
            }
            if spec.multiple {
                notes.push("multiple".to_string());
            }
            lines.push(format!(
                "  {:<24} {:<28} {}",
                spec.doc_type.as_str(),
                spec.label,
                notes.join(", ")
            ));
        }
    }
    lines.join("\n")
}
