use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::catalog::DocumentType;

/// Elkkana maritime job portal CLI arguments
#[derive(Debug, Parser)]
#[command(
    name = "elkkana-portal",
    version,
    about = "Candidate portal for Elkkana maritime crew placement"
)]
pub struct Cli {
    /// Backend API endpoint (overrides APPWRITE_ENDPOINT)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Backend project id (overrides APPWRITE_PROJECT_ID)
    #[arg(long)]
    pub project: Option<String>,

    /// Print collected metrics after the command finishes
    #[arg(long)]
    pub print_metrics: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create an account and sign in
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Sign out of the current session
    Logout,

    /// Show the signed-in account
    Whoami,

    /// Send a password recovery email
    ForgotPassword { email: String },

    /// Inspect or edit the candidate profile
    #[command(subcommand)]
    Profile(ProfileCommand),

    /// Upload a document, e.g. `upload cv ./resume.pdf`
    Upload {
        doc_type: DocumentType,
        path: PathBuf,
    },

    /// Delete an uploaded document by file id
    DeleteFile { id: String },

    /// Show the application status timeline
    Status,

    /// List the document types the portal accepts
    Documents,
}

#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    Show,
    Update(ProfileUpdateArgs),
    /// Submit the application for review
    Submit,
}

#[derive(Debug, Default, Args)]
pub struct ProfileUpdateArgs {
    #[arg(long)]
    pub full_name: Option<String>,

    #[arg(long)]
    pub place_of_birth: Option<String>,

    /// YYYY-MM-DD
    #[arg(long)]
    pub date_of_birth: Option<String>,

    /// Agree to data processing for the application
    #[arg(long)]
    pub consent: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_upload_with_document_type() {
        let cli = Cli::try_parse_from(["elkkana-portal", "upload", "seaman-book", "book.pdf"]).unwrap();
        match cli.command {
            Command::Upload { doc_type, path } => {
                assert_eq!(doc_type, DocumentType::SeamanBook);
                assert_eq!(path, PathBuf::from("book.pdf"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn parses_global_flags_and_nested_profile_command() {
        let cli = Cli::try_parse_from([
            "elkkana-portal",
            "--endpoint",
            "http://localhost/v1",
            "--print-metrics",
            "profile",
            "update",
            "--full-name",
            "Budi",
            "--consent",
        ])
        .unwrap();

        assert_eq!(cli.endpoint.as_deref(), Some("http://localhost/v1"));
        assert!(cli.print_metrics);
        match cli.command {
            Command::Profile(ProfileCommand::Update(args)) => {
                assert_eq!(args.full_name.as_deref(), Some("Budi"));
                assert!(args.consent);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_document_type() {
        assert!(Cli::try_parse_from(["elkkana-portal", "upload", "diploma-x", "a.pdf"]).is_err());
    }
}
