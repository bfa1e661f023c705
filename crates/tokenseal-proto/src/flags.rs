//! Security context capability flags.
//!
//! Bit values follow the RFC 2744 C bindings so flags read from or written to
//! any GSS-style provider keep their meaning.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Requested or granted context capabilities.
    ///
    /// A provider may grant a strict subset of what was requested. Callers
    /// compare the two with [`ContextFlags::missing_from`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct ContextFlags: u32 {
        /// Credentials are delegated to the acceptor.
        const DELEG = 1;
        /// The acceptor authenticates itself to the initiator.
        const MUTUAL = 1 << 1;
        /// Replayed per-message tokens are detected.
        const REPLAY = 1 << 2;
        /// Out-of-sequence per-message tokens are detected.
        const SEQUENCE = 1 << 3;
        /// Per-message confidentiality is available.
        const CONF = 1 << 4;
        /// Per-message integrity is available.
        const INTEG = 1 << 5;
        /// The initiator is anonymous to the acceptor.
        const ANON = 1 << 6;
        /// Protection is usable before the context is complete.
        const PROT_READY = 1 << 7;
        /// The context can be exported.
        const TRANS = 1 << 8;
    }
}

impl ContextFlags {
    /// Flags present in `requested` but absent from `self`.
    ///
    /// Used to report silent downgrades (e.g. mutual authentication asked for
    /// but not granted).
    pub fn missing_from(self, requested: Self) -> Self {
        requested.difference(self)
    }
}

const LABELS: [(ContextFlags, &str); 9] = [
    (ContextFlags::DELEG, "deleg"),
    (ContextFlags::MUTUAL, "mutual"),
    (ContextFlags::REPLAY, "replay"),
    (ContextFlags::SEQUENCE, "sequence"),
    (ContextFlags::CONF, "conf"),
    (ContextFlags::INTEG, "integ"),
    (ContextFlags::ANON, "anon"),
    (ContextFlags::PROT_READY, "prot-ready"),
    (ContextFlags::TRANS, "trans"),
];

impl std::fmt::Display for ContextFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }

        let mut first = true;
        for (flag, label) in LABELS {
            if !self.contains(flag) {
                continue;
            }
            if !first {
                f.write_str("|")?;
            }
            first = false;
            f.write_str(label)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_values_match_c_bindings() {
        assert_eq!(ContextFlags::DELEG.bits(), 1);
        assert_eq!(ContextFlags::MUTUAL.bits(), 2);
        assert_eq!(ContextFlags::REPLAY.bits(), 4);
        assert_eq!(ContextFlags::CONF.bits(), 16);
        assert_eq!(ContextFlags::TRANS.bits(), 256);
    }

    #[test]
    fn display_joins_names() {
        let flags = ContextFlags::MUTUAL | ContextFlags::REPLAY | ContextFlags::CONF;
        assert_eq!(flags.to_string(), "mutual|replay|conf");
        assert_eq!(ContextFlags::empty().to_string(), "none");
    }

    #[test]
    fn missing_from_reports_downgrade() {
        let requested = ContextFlags::MUTUAL | ContextFlags::DELEG | ContextFlags::REPLAY;
        let granted = ContextFlags::MUTUAL | ContextFlags::REPLAY | ContextFlags::CONF;
        assert_eq!(granted.missing_from(requested), ContextFlags::DELEG);
    }

    #[test]
    fn cbor_encodes_as_bits() {
        let flags = ContextFlags::MUTUAL | ContextFlags::REPLAY;

        let mut bytes = Vec::new();
        ciborium::ser::into_writer(&flags, &mut bytes).expect("encode");

        let decoded: ContextFlags = ciborium::de::from_reader(&bytes[..]).expect("decode");
        assert_eq!(decoded, flags);
    }
}
