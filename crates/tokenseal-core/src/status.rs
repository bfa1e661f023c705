//! Provider status codes.
//!
//! Major status values follow RFC 2744 §3.9.1: routine errors occupy bits
//! 16..24, supplementary information bits 0..16. Minor status is
//! mechanism-specific.

use std::fmt;

use thiserror::Error;

/// Major status reported by a security provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MajorStatus {
    /// An unsupported mechanism was requested.
    BadMech,
    /// An invalid name was supplied.
    BadName,
    /// A supplied name was of an unsupported type.
    BadNameType,
    /// Incorrect channel bindings were supplied.
    BadBindings,
    /// An invalid status code was supplied.
    BadStatus,
    /// A token had an invalid MIC.
    BadMic,
    /// No credentials were supplied, or they were unavailable.
    NoCred,
    /// No context has been established.
    NoContext,
    /// An invalid token was supplied.
    DefectiveToken,
    /// An invalid credential was supplied.
    DefectiveCredential,
    /// The referenced credentials have expired.
    CredentialsExpired,
    /// The context has expired.
    ContextExpired,
    /// Unspecified failure; the minor status may say more.
    Failure,
    /// The requested quality of protection could not be provided.
    BadQop,
    /// The operation is forbidden by local security policy.
    Unauthorized,
    /// The operation or option is not available.
    Unavailable,
    /// The requested credential element already exists.
    DuplicateElement,
    /// The provided name was not a mechanism name.
    NameNotMn,
    /// The token was a duplicate of an earlier token.
    DuplicateToken,
    /// The token's validity period has expired.
    OldToken,
    /// A later token has already been processed.
    UnseqToken,
    /// An expected per-message token was not received.
    GapToken,
}

impl MajorStatus {
    /// Numeric major status as defined by the C bindings.
    pub fn code(self) -> u32 {
        const ROUTINE_SHIFT: u32 = 16;
        let routine = |n: u32| n << ROUTINE_SHIFT;
        match self {
            Self::BadMech => routine(1),
            Self::BadName => routine(2),
            Self::BadNameType => routine(3),
            Self::BadBindings => routine(4),
            Self::BadStatus => routine(5),
            Self::BadMic => routine(6),
            Self::NoCred => routine(7),
            Self::NoContext => routine(8),
            Self::DefectiveToken => routine(9),
            Self::DefectiveCredential => routine(10),
            Self::CredentialsExpired => routine(11),
            Self::ContextExpired => routine(12),
            Self::Failure => routine(13),
            Self::BadQop => routine(14),
            Self::Unauthorized => routine(15),
            Self::Unavailable => routine(16),
            Self::DuplicateElement => routine(17),
            Self::NameNotMn => routine(18),
            Self::DuplicateToken => 1 << 1,
            Self::OldToken => 1 << 2,
            Self::UnseqToken => 1 << 3,
            Self::GapToken => 1 << 4,
        }
    }

    /// True if a per-message token failed validation (forged, corrupted,
    /// replayed, or out of order).
    pub fn is_integrity_failure(self) -> bool {
        matches!(
            self,
            Self::BadMic
                | Self::DefectiveToken
                | Self::DuplicateToken
                | Self::OldToken
                | Self::UnseqToken
                | Self::GapToken
        )
    }

    fn description(self) -> &'static str {
        match self {
            Self::BadMech => "an unsupported mechanism was requested",
            Self::BadName => "an invalid name was supplied",
            Self::BadNameType => "a supplied name was of an unsupported type",
            Self::BadBindings => "incorrect channel bindings were supplied",
            Self::BadStatus => "an invalid status code was supplied",
            Self::BadMic => "a token had an invalid signature",
            Self::NoCred => "no credentials were supplied, or the credentials were unavailable",
            Self::NoContext => "no context has been established",
            Self::DefectiveToken => "invalid token was supplied",
            Self::DefectiveCredential => "invalid credential was supplied",
            Self::CredentialsExpired => "the referenced credentials have expired",
            Self::ContextExpired => "the context has expired",
            Self::Failure => "unspecified failure",
            Self::BadQop => "the quality-of-protection requested could not be provided",
            Self::Unauthorized => "the operation is forbidden by local security policy",
            Self::Unavailable => "the operation or option is not available or supported",
            Self::DuplicateElement => "the requested credential element already exists",
            Self::NameNotMn => "the provided name was not mechanism specific",
            Self::DuplicateToken => "the token was a duplicate of an earlier token",
            Self::OldToken => "the token's validity period has expired",
            Self::UnseqToken => "a later token has already been processed",
            Self::GapToken => "an expected per-message token was not received",
        }
    }
}

impl fmt::Display for MajorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A provider status: major code plus mechanism-specific minor code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[error("{major} (major 0x{major_code:08x}, minor {minor})", major_code = .major.code())]
pub struct StatusCode {
    /// Mechanism-independent status.
    pub major: MajorStatus,
    /// Mechanism-specific detail.
    pub minor: u32,
}

impl StatusCode {
    /// Build a status code.
    pub fn new(major: MajorStatus, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl From<MajorStatus> for StatusCode {
    fn from(major: MajorStatus) -> Self {
        Self { major, minor: 0 }
    }
}
