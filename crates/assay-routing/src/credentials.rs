//! Backend credential classification
//!
//! A credential is usable only when it is present and differs from the
//! placeholder shipped in sample env files.

use assay_core::ProviderKind;
use std::fmt;

#[derive(Clone, PartialEq, Eq)]
pub enum CredentialState {
    /// Not set, or blank
    Absent,
    /// Set to the backend's sample value
    Placeholder,
    /// A real key
    Configured(String),
}

impl CredentialState {
    pub fn classify(kind: ProviderKind, value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => CredentialState::Absent,
            Some(v) if v == kind.placeholder_credential() => CredentialState::Placeholder,
            Some(v) => CredentialState::Configured(v.to_string()),
        }
    }

    /// Read the backend's credential variable from the process environment
    pub fn from_env(kind: ProviderKind) -> Self {
        let value = std::env::var(kind.credential_env_var()).ok();
        Self::classify(kind, value.as_deref())
    }

    pub fn is_available(&self) -> bool {
        matches!(self, CredentialState::Configured(_))
    }

    pub fn api_key(&self) -> Option<&str> {
        match self {
            CredentialState::Configured(key) => Some(key),
            _ => None,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            CredentialState::Absent => "absent",
            CredentialState::Placeholder => "placeholder",
            CredentialState::Configured(_) => "configured",
        }
    }
}

impl fmt::Debug for CredentialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialState::Absent => f.write_str("Absent"),
            CredentialState::Placeholder => f.write_str("Placeholder"),
            CredentialState::Configured(_) => f.write_str("Configured(<redacted>)"),
        }
    }
}
