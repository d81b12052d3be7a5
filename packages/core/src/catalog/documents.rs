use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kinds of documents a candidate can upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentType {
    Cv,
    Photo,
    Passport,
    Visa,
    Ktp,
    SeamanBook,
    BstCertificate,
    SatCertificate,
    McuCertificate,
    SkillCertificate,
    LastEducationDiploma,
    SeaServiceRecord,
    Skck,
    Npwp,
    OtherSupportingDocument,
}

impl DocumentType {
    pub const ALL: [DocumentType; 15] = [
        DocumentType::Cv,
        DocumentType::Photo,
        DocumentType::Passport,
        DocumentType::Visa,
        DocumentType::Ktp,
        DocumentType::SeamanBook,
        DocumentType::BstCertificate,
        DocumentType::SatCertificate,
        DocumentType::McuCertificate,
        DocumentType::SkillCertificate,
        DocumentType::LastEducationDiploma,
        DocumentType::SeaServiceRecord,
        DocumentType::Skck,
        DocumentType::Npwp,
        DocumentType::OtherSupportingDocument,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentType::Cv => "cv",
            DocumentType::Photo => "photo",
            DocumentType::Passport => "passport",
            DocumentType::Visa => "visa",
            DocumentType::Ktp => "ktp",
            DocumentType::SeamanBook => "seamanBook",
            DocumentType::BstCertificate => "bstCertificate",
            DocumentType::SatCertificate => "satCertificate",
            DocumentType::McuCertificate => "mcuCertificate",
            DocumentType::SkillCertificate => "skillCertificate",
            DocumentType::LastEducationDiploma => "lastEducationDiploma",
            DocumentType::SeaServiceRecord => "seaServiceRecord",
            DocumentType::Skck => "skck",
            DocumentType::Npwp => "npwp",
            DocumentType::OtherSupportingDocument => "otherSupportingDocument",
        }
    }

    /// Profile document attribute holding this type's file id(s).
    pub fn profile_field(self) -> &'static str {
        match self {
            DocumentType::Cv => "cvFileId",
            DocumentType::Photo => "photoFileId",
            DocumentType::Passport => "passportFileId",
            DocumentType::Visa => "visaFileId",
            DocumentType::Ktp => "ktpFileId",
            DocumentType::SeamanBook => "seamanBookFileId",
            DocumentType::BstCertificate => "bstCertificateFileId",
            DocumentType::SatCertificate => "satCertificateFileId",
            DocumentType::McuCertificate => "mcuCertificateFileId",
            DocumentType::SkillCertificate => "skillCertificateIds",
            DocumentType::LastEducationDiploma => "lastEducationDiplomaFileId",
            DocumentType::SeaServiceRecord => "seaServiceRecordFileIds",
            DocumentType::Skck => "skckFileId",
            DocumentType::Npwp => "npwpFileId",
            DocumentType::OtherSupportingDocument => "otherSupportingDocumentIds",
        }
    }

    /// Whether the profile keeps a list of files for this type.
    pub fn is_multiple(self) -> bool {
        matches!(
            self,
            DocumentType::SkillCertificate
                | DocumentType::SeaServiceRecord
                | DocumentType::OtherSupportingDocument
        )
    }

    pub fn spec(self) -> &'static DocumentSpec {
        DOCUMENT_CATEGORIES
            .iter()
            .flat_map(|category| category.documents.iter())
            .find(|spec| spec.doc_type == self)
            .unwrap_or(&FALLBACK_SPEC)
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s.chars().filter(|c| *c != '-' && *c != '_').collect();
        DocumentType::ALL
            .into_iter()
            .find(|doc_type| doc_type.as_str().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| format!("Unknown document type: {}", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSpec {
    pub doc_type: DocumentType,
    pub label: &'static str,
    pub required: bool,
    pub accepted_formats: &'static [&'static str],
    pub multiple: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentCategory {
    pub title: &'static str,
    pub description: &'static str,
    pub documents: &'static [DocumentSpec],
}

const OFFICE_FORMATS: &[&str] = &[".pdf", ".doc", ".docx"];
const PHOTO_FORMATS: &[&str] = &[".jpg", ".jpeg", ".png"];
const SCAN_FORMATS: &[&str] = &[".jpg", ".jpeg", ".png", ".pdf"];

const fn optional_scan(doc_type: DocumentType, label: &'static str, multiple: bool) -> DocumentSpec {
    DocumentSpec {
        doc_type,
        label,
        required: false,
        accepted_formats: SCAN_FORMATS,
        multiple,
    }
}

// Every document type appears in exactly one category.
const FALLBACK_SPEC: DocumentSpec = optional_scan(DocumentType::OtherSupportingDocument, "Document", true);

pub static DOCUMENT_CATEGORIES: &[DocumentCategory] = &[
    DocumentCategory {
        title: "Essential Documents",
        description: "Required documents for all applications",
        documents: &[
            DocumentSpec {
                doc_type: DocumentType::Cv,
                label: "CV / Resume",
                required: true,
                accepted_formats: OFFICE_FORMATS,
                multiple: false,
            },
            DocumentSpec {
                doc_type: DocumentType::Photo,
                label: "Passport Photo",
                required: true,
                accepted_formats: PHOTO_FORMATS,
                multiple: false,
            },
        ],
    },
    DocumentCategory {
        title: "Identification Documents",
        description: "Identity and travel documents",
        documents: &[
            optional_scan(DocumentType::Ktp, "KTP (Indonesian ID)", false),
            optional_scan(DocumentType::Passport, "Passport", false),
            optional_scan(DocumentType::Visa, "Visa (if applicable)", false),
        ],
    },
    DocumentCategory {
        title: "Maritime Documents",
        description: "Seaman certificates and maritime qualifications",
        documents: &[
            optional_scan(DocumentType::SeamanBook, "Seaman Book", false),
            optional_scan(DocumentType::BstCertificate, "BST Certificate", false),
            optional_scan(DocumentType::SatCertificate, "SAT Certificate", false),
        ],
    },
    DocumentCategory {
        title: "Medical & Health",
        description: "Medical certificates and health documents",
        documents: &[optional_scan(DocumentType::McuCertificate, "MCU Certificate", false)],
    },
    DocumentCategory {
        title: "Education & Skills",
        description: "Educational qualifications and skill certificates",
        documents: &[
            optional_scan(DocumentType::LastEducationDiploma, "Last Education Diploma", false),
            optional_scan(DocumentType::SkillCertificate, "Skill Certificates", true),
        ],
    },
    DocumentCategory {
        title: "Work Experience",
        description: "Sea service records and work experience",
        documents: &[optional_scan(DocumentType::SeaServiceRecord, "Sea Service Records", true)],
    },
    DocumentCategory {
        title: "Legal Documents",
        description: "Legal and administrative documents",
        documents: &[
            optional_scan(DocumentType::Skck, "SKCK (Police Certificate)", false),
            optional_scan(DocumentType::Npwp, "NPWP (Tax ID)", false),
        ],
    },
    DocumentCategory {
        title: "Additional Documents",
        description: "Other supporting documents",
        documents: &[optional_scan(
            DocumentType::OtherSupportingDocument,
            "Other Supporting Documents",
            true,
        )],
    },
];

/// Document types that must be present before an application is submitted.
pub fn required_documents() -> impl Iterator<Item = DocumentType> {
    DOCUMENT_CATEGORIES
        .iter()
        .flat_map(|category| category.documents.iter())
        .filter(|spec| spec.required)
        .map(|spec| spec.doc_type)
}
