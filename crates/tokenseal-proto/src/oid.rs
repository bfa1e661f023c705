//! Object identifiers for mechanisms and name types.
//!
//! OIDs are accepted in dotted form on the command line (`1.2.840.113554.1.2.2`)
//! and carried on the wire as the DER content octets, without the tag and
//! length bytes.

use std::{borrow::Cow, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from OID parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OidError {
    /// A dotted component was not a decimal `u32`.
    #[error("non-number in OID: {component:?}")]
    NonNumeric {
        /// The offending component.
        component: String,
    },

    /// Fewer than two arcs, or the first two arcs are out of range.
    #[error("invalid OID root arcs")]
    InvalidRoot,

    /// DER content ended in the middle of a sub-identifier.
    #[error("truncated DER OID")]
    Truncated,

    /// A sub-identifier does not fit in 32 bits.
    #[error("OID arc overflows u32")]
    Overflow,
}

/// An object identifier.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Oid(Cow<'static, [u32]>);

const KRB5_ARCS: &[u32] = &[1, 2, 840, 113_554, 1, 2, 2];
const SPNEGO_ARCS: &[u32] = &[1, 3, 6, 1, 5, 5, 2];
const NTLMSSP_ARCS: &[u32] = &[1, 3, 6, 1, 4, 1, 311, 2, 2, 10];
const PSK_ARCS: &[u32] = &[1, 3, 6, 1, 3, 7, 1];
const NT_HOSTBASED_SERVICE_ARCS: &[u32] = &[1, 2, 840, 113_554, 1, 2, 1, 4];
const NT_USER_NAME_ARCS: &[u32] = &[1, 2, 840, 113_554, 1, 2, 1, 1];
const NT_EXPORT_NAME_ARCS: &[u32] = &[1, 3, 6, 1, 5, 6, 4];
const NT_ANONYMOUS_ARCS: &[u32] = &[1, 3, 6, 1, 5, 6, 3];

impl Oid {
    /// Kerberos V5 mechanism.
    pub const KRB5: Self = Self(Cow::Borrowed(KRB5_ARCS));
    /// SPNEGO pseudo-mechanism.
    pub const SPNEGO: Self = Self(Cow::Borrowed(SPNEGO_ARCS));
    /// NTLMSSP mechanism.
    pub const NTLMSSP: Self = Self(Cow::Borrowed(NTLMSSP_ARCS));
    /// Pre-shared-key mechanism implemented by `tokenseal-core`.
    pub const PSK: Self = Self(Cow::Borrowed(PSK_ARCS));
    /// Host-based service name type (`service@host`).
    pub const NT_HOSTBASED_SERVICE: Self = Self(Cow::Borrowed(NT_HOSTBASED_SERVICE_ARCS));
    /// User name type.
    pub const NT_USER_NAME: Self = Self(Cow::Borrowed(NT_USER_NAME_ARCS));
    /// Exported name type.
    pub const NT_EXPORT_NAME: Self = Self(Cow::Borrowed(NT_EXPORT_NAME_ARCS));
    /// Anonymous name type.
    pub const NT_ANONYMOUS: Self = Self(Cow::Borrowed(NT_ANONYMOUS_ARCS));
}

const WELL_KNOWN: [(&[u32], &str); 8] = [
    (KRB5_ARCS, "kerberos_v5"),
    (SPNEGO_ARCS, "spnego"),
    (NTLMSSP_ARCS, "ntlmssp"),
    (PSK_ARCS, "tokenseal-psk"),
    (NT_HOSTBASED_SERVICE_ARCS, "GSS_NT_HOSTBASED_SERVICE"),
    (NT_USER_NAME_ARCS, "GSS_NT_USER_NAME"),
    (NT_EXPORT_NAME_ARCS, "GSS_NT_EXPORT_NAME"),
    (NT_ANONYMOUS_ARCS, "GSS_NT_ANONYMOUS"),
];

impl Oid {
    /// Build an OID from its arcs.
    pub fn from_arcs(arcs: impl Into<Vec<u32>>) -> Result<Self, OidError> {
        let arcs = arcs.into();
        validate_root(&arcs)?;
        Ok(Self(Cow::Owned(arcs)))
    }

    /// The arcs of this OID.
    pub fn arcs(&self) -> &[u32] {
        &self.0
    }

    /// Human-readable name for well-known OIDs.
    pub fn name(&self) -> Option<&'static str> {
        WELL_KNOWN.iter().find(|(arcs, _)| *arcs == self.arcs()).map(|(_, name)| *name)
    }

    /// DER content octets (no tag, no length).
    pub fn to_der(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.0.len() + 4);
        let (first, rest) = match &*self.0 {
            [a, b, rest @ ..] => (u64::from(*a) * 40 + u64::from(*b), rest),
            // from_arcs and from_der guarantee at least two arcs
            _ => return out,
        };

        encode_base128(&mut out, first);
        for arc in rest {
            encode_base128(&mut out, u64::from(*arc));
        }
        out
    }

    /// Parse DER content octets (no tag, no length).
    pub fn from_der(bytes: &[u8]) -> Result<Self, OidError> {
        let mut values = Vec::new();
        let mut current: u64 = 0;
        let mut pending = false;

        for &byte in bytes {
            current = (current << 7) | u64::from(byte & 0x7f);
            if current > u64::from(u32::MAX) * 40 + 80 {
                return Err(OidError::Overflow);
            }
            pending = byte & 0x80 != 0;
            if !pending {
                values.push(current);
                current = 0;
            }
        }

        if pending {
            return Err(OidError::Truncated);
        }

        let (&first, rest) = values.split_first().ok_or(OidError::InvalidRoot)?;
        let (a, b) = match first {
            0..40 => (0, first),
            40..80 => (1, first - 40),
            _ => (2, first - 80),
        };

        let mut arcs = Vec::with_capacity(values.len() + 1);
        arcs.push(a);
        arcs.push(u32::try_from(b).map_err(|_| OidError::Overflow)?);
        for &value in rest {
            arcs.push(u32::try_from(value).map_err(|_| OidError::Overflow)?);
        }

        Ok(Self(Cow::Owned(arcs)))
    }
}

fn validate_root(arcs: &[u32]) -> Result<(), OidError> {
    match arcs {
        [0 | 1, second, ..] if *second < 40 => Ok(()),
        [2, _, ..] => Ok(()),
        _ => Err(OidError::InvalidRoot),
    }
}

fn encode_base128(out: &mut Vec<u8>, value: u64) {
    let mut groups = [0u8; 10];
    let mut n = 0;
    let mut v = value;
    loop {
        groups[n] = (v & 0x7f) as u8;
        n += 1;
        v >>= 7;
        if v == 0 {
            break;
        }
    }
    for i in (0..n).rev() {
        let continuation = if i == 0 { 0 } else { 0x80 };
        out.push(groups[i] | continuation);
    }
}

impl FromStr for Oid {
    type Err = OidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let arcs = s
            .trim()
            .split('.')
            .map(|component| {
                component
                    .parse::<u32>()
                    .map_err(|_| OidError::NonNumeric { component: component.to_string() })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_arcs(arcs)
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for arc in self.0.iter() {
            if !first {
                f.write_str(".")?;
            }
            first = false;
            write!(f, "{arc}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "Oid({self} {name})"),
            None => write!(f, "Oid({self})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn parses_dotted_form() {
        let oid: Oid = "1.2.840.113554.1.2.2".parse().unwrap();
        assert_eq!(oid, Oid::KRB5);
        assert_eq!(oid.name(), Some("kerberos_v5"));
        assert_eq!(oid.to_string(), "1.2.840.113554.1.2.2");
    }

    #[test]
    fn rejects_non_numeric_component() {
        let err = "1.2.x.4".parse::<Oid>().unwrap_err();
        assert_eq!(err, OidError::NonNumeric { component: "x".to_string() });
    }

    #[test]
    fn rejects_bad_root() {
        assert_eq!("3.1".parse::<Oid>().unwrap_err(), OidError::InvalidRoot);
        assert_eq!("1.40".parse::<Oid>().unwrap_err(), OidError::InvalidRoot);
        assert_eq!("1".parse::<Oid>().unwrap_err(), OidError::InvalidRoot);
    }

    #[test]
    fn krb5_der_matches_known_encoding() {
        assert_eq!(Oid::KRB5.to_der(), hex!("2a864886f712010202"));
        assert_eq!(Oid::from_der(&hex!("2a864886f712010202")).unwrap(), Oid::KRB5);
    }

    #[test]
    fn spnego_der_matches_known_encoding() {
        assert_eq!(Oid::SPNEGO.to_der(), hex!("2b0601050502"));
    }

    #[test]
    fn truncated_der_is_rejected() {
        // 0x86 sets the continuation bit with nothing after it.
        assert_eq!(Oid::from_der(&hex!("2a86")).unwrap_err(), OidError::Truncated);
        assert_eq!(Oid::from_der(&hex!("2a864886f7")).unwrap_err(), OidError::Truncated);
        assert_eq!(Oid::from_der(&[]).unwrap_err(), OidError::InvalidRoot);
    }

    #[test]
    fn complete_prefix_is_a_shorter_oid() {
        let oid = Oid::from_der(&hex!("2a8648")).unwrap();
        assert_eq!(oid.to_string(), "1.2.840");
    }

    #[test]
    fn well_known_constants_are_associated() {
        assert_eq!(Oid::PSK.to_string(), "1.3.6.1.3.7.1");
        assert_eq!(Oid::NT_HOSTBASED_SERVICE.name(), Some("GSS_NT_HOSTBASED_SERVICE"));
        assert_eq!(Oid::NT_USER_NAME.to_der(), hex!("2a864886f71201020101"));
    }

    #[test]
    fn debug_includes_well_known_name() {
        assert_eq!(format!("{:?}", Oid::PSK), "Oid(1.3.6.1.3.7.1 tokenseal-psk)");
    }
}
