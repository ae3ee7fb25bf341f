// src/upload_validator.rs
use crate::utils::{format_bytes, get_file_extension, normalize_file_stem};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Cv,
    Photo,
}

impl UploadKind {
    pub fn max_size(&self) -> u64 {
        match self {
            Self::Cv => 5 * 1024 * 1024,
            Self::Photo => 2 * 1024 * 1024,
        }
    }

    /// Extension -> MIME type accepted for this slot.
    pub fn allowed_types(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Cv => &[
                ("pdf", "application/pdf"),
                ("doc", "application/msword"),
                (
                    "docx",
                    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                ),
            ],
            Self::Photo => &[
                ("jpg", "image/jpeg"),
                ("jpeg", "image/jpeg"),
                ("png", "image/png"),
                ("gif", "image/gif"),
            ],
        }
    }

    /// Sub-directory of the uploads root.
    pub fn subdir(&self) -> &'static str {
        match self {
            Self::Cv => "cv",
            Self::Photo => "photos",
        }
    }

    /// Prefix used in user-facing messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Cv => "Erreur CV",
            Self::Photo => "Erreur Photo",
        }
    }
}

/// Uploaded file as received from the transport, fully buffered.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl IncomingFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadErrorKind {
    Missing,
    Transport,
    Empty,
    TooLarge,
    DisallowedType,
    Storage,
}

impl UploadErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Missing => "upload_missing",
            Self::Transport => "upload_transport",
            Self::Empty => "upload_empty",
            Self::TooLarge => "upload_too_large",
            Self::DisallowedType => "upload_type",
            Self::Storage => "upload_storage",
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadError {
    pub kind: UploadErrorKind,
    pub message: String,
}

impl UploadError {
    pub fn new(kind: UploadErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Message as shown to the registrant, e.g. `Erreur CV: Type de fichier non autorisé`.
    pub fn user_message(&self, upload: UploadKind) -> String {
        format!("{}: {}", upload.label(), self.message)
    }
}

impl std::fmt::Display for UploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for UploadError {}

/// Outcome of a successful validation: what the content really is and how
/// the stored name should be built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUpload {
    pub mime_type: &'static str,
    pub extension: String,
    pub stem: String,
}

impl ValidatedUpload {
    /// `{timestamp}_{stem}.{ext}`, before collision suffixing.
    pub fn file_name(&self, timestamp: i64) -> String {
        format!("{}_{}.{}", timestamp, self.stem, self.extension)
    }
}

const PDF_SIGNATURE: &[u8] = b"%PDF";
const OLE_SIGNATURE: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const ZIP_SIGNATURE: &[u8] = &[0x50, 0x4B, 0x03, 0x04];
const JPEG_SIGNATURE: &[u8] = &[0xFF, 0xD8, 0xFF];
const PNG_SIGNATURE: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Content type from the leading bytes. The extension is never consulted.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(PDF_SIGNATURE) {
        Some("application/pdf")
    } else if bytes.starts_with(OLE_SIGNATURE) {
        Some("application/msword")
    } else if bytes.starts_with(ZIP_SIGNATURE) {
        // a docx is a zip archive holding a word/ tree
        if contains(bytes, b"word/") {
            Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document")
        } else {
            Some("application/zip")
        }
    } else if bytes.starts_with(JPEG_SIGNATURE) {
        Some("image/jpeg")
    } else if bytes.starts_with(PNG_SIGNATURE) {
        Some("image/png")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else {
        None
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

pub struct UploadValidator;

impl UploadValidator {
    pub fn validate(kind: UploadKind, file: &IncomingFile) -> Result<ValidatedUpload, UploadError> {
        if file.file_name.trim().is_empty() {
            return Err(UploadError::new(
                UploadErrorKind::Missing,
                "Aucun fichier sélectionné",
            ));
        }

        if file.bytes.is_empty() {
            return Err(UploadError::new(
                UploadErrorKind::Empty,
                "Erreur lors de l'upload: Upload incomplet",
            ));
        }

        if file.size() > kind.max_size() {
            return Err(UploadError::new(
                UploadErrorKind::TooLarge,
                format!(
                    "Fichier trop volumineux (max: {})",
                    format_bytes(kind.max_size())
                ),
            ));
        }

        let mime_type = sniff_mime(&file.bytes);
        let extension = get_file_extension(&file.file_name).unwrap_or_default();
        let allowed = kind.allowed_types();

        let content_ok = mime_type
            .map(|mime| allowed.iter().any(|(_, allowed_mime)| *allowed_mime == mime))
            .unwrap_or(false);
        let extension_ok = allowed.iter().any(|(ext, _)| *ext == extension);

        let mime_type = match mime_type {
            Some(mime) if content_ok && extension_ok => mime,
            _ => {
                return Err(UploadError::new(
                    UploadErrorKind::DisallowedType,
                    "Type de fichier non autorisé",
                ))
            }
        };

        let base_name = std::path::Path::new(&file.file_name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("");

        Ok(ValidatedUpload {
            mime_type,
            extension,
            stem: normalize_file_stem(base_name),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_signatures() {
        assert_eq!(sniff_mime(&fixtures::pdf()), Some("application/pdf"));
        assert_eq!(sniff_mime(&fixtures::png()), Some("image/png"));
        assert_eq!(sniff_mime(b"GIF89a......"), Some("image/gif"));
        assert_eq!(sniff_mime(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0]), Some("image/jpeg"));
        assert_eq!(
            sniff_mime(b"PK\x03\x04....[Content_Types].xml word/document.xml"),
            Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document")
        );
        assert_eq!(sniff_mime(b"PK\x03\x04 plain zip"), Some("application/zip"));
        assert_eq!(sniff_mime(&fixtures::exe()), None);
    }

    #[test]
    fn test_valid_cv() {
        let file = IncomingFile::new("Mon CV 2024.PDF", fixtures::pdf());
        let validated = UploadValidator::validate(UploadKind::Cv, &file).unwrap();

        assert_eq!(validated.mime_type, "application/pdf");
        assert_eq!(validated.extension, "pdf");
        assert_eq!(validated.file_name(1700000000), "1700000000_mon-cv-2024.pdf");
    }

    #[test]
    fn test_renamed_executable_is_rejected() {
        let file = IncomingFile::new("cv.pdf", fixtures::exe());
        let err = UploadValidator::validate(UploadKind::Cv, &file).unwrap_err();

        assert_eq!(err.kind, UploadErrorKind::DisallowedType);
        assert_eq!(err.user_message(UploadKind::Cv), "Erreur CV: Type de fichier non autorisé");
    }

    #[test]
    fn test_content_must_match_slot() {
        // a real PNG is not a CV
        let file = IncomingFile::new("cv.pdf", fixtures::png());
        assert_eq!(
            UploadValidator::validate(UploadKind::Cv, &file).unwrap_err().kind,
            UploadErrorKind::DisallowedType
        );

        // a real PDF with a photo extension is not a photo
        let file = IncomingFile::new("photo.png", fixtures::pdf());
        assert_eq!(
            UploadValidator::validate(UploadKind::Photo, &file).unwrap_err().kind,
            UploadErrorKind::DisallowedType
        );
    }

    #[test]
    fn test_extension_must_be_allowed() {
        let file = IncomingFile::new("cv.txt", fixtures::pdf());
        assert_eq!(
            UploadValidator::validate(UploadKind::Cv, &file).unwrap_err().kind,
            UploadErrorKind::DisallowedType
        );
    }

    #[test]
    fn test_size_limits() {
        let mut bytes = fixtures::png();
        bytes.resize(2 * 1024 * 1024 + 1, 0);
        let file = IncomingFile::new("photo.png", bytes);
        let err = UploadValidator::validate(UploadKind::Photo, &file).unwrap_err();

        assert_eq!(err.kind, UploadErrorKind::TooLarge);
        assert_eq!(err.message, "Fichier trop volumineux (max: 2 MB)");
    }

    #[test]
    fn test_empty_and_missing() {
        let empty = IncomingFile::new("cv.pdf", Vec::new());
        assert_eq!(
            UploadValidator::validate(UploadKind::Cv, &empty).unwrap_err().code(),
            "upload_empty"
        );

        let unnamed = IncomingFile::new("", fixtures::pdf());
        assert_eq!(
            UploadValidator::validate(UploadKind::Cv, &unnamed).unwrap_err().code(),
            "upload_missing"
        );
    }
}
