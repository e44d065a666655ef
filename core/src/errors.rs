use thiserror::Error;

/// Central error catalogue with stable codes and human friendly metadata.
#[derive(Debug, Error)]
pub enum HearthError {
    #[error("Provider rejected the credential: {0}")]
    CredentialRejected(String),
    #[error("Chat generation failed: {0}")]
    GenerationFailed(String),
    #[error("Session is locked")]
    SessionLocked,
    #[error("Unknown session")]
    SessionNotFound,
    #[error("Unknown persona: {0}")]
    UnknownPersona(String),
    #[error("Database unavailable")]
    DbUnavailable,
}

impl HearthError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::CredentialRejected(_) => "CRD-1001",
            Self::GenerationFailed(_) => "GEN-1001",
            Self::SessionLocked => "SES-1001",
            Self::SessionNotFound => "SES-1002",
            Self::UnknownPersona(_) => "PER-1001",
            Self::DbUnavailable => "DB-1001",
        }
    }
    pub fn explain(&self) -> &'static str {
        match self {
            Self::CredentialRejected(_) => {
                "The provider declined the probe request for this API key."
            }
            Self::GenerationFailed(_) => "The provider call for a chat turn did not succeed.",
            Self::SessionLocked => "A valid API key must be submitted before chatting.",
            Self::SessionNotFound => "No session exists for the requested ID.",
            Self::UnknownPersona(_) => "The persona ID is not part of the fixed registry.",
            Self::DbUnavailable => "The application could not access the SQLite database.",
        }
    }
}
