//! HMAC-SHA256 proofs and message integrity codes.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::CryptoError;

type HmacSha256 = Hmac<Sha256>;

/// Size of a MAC in bytes.
pub const MAC_SIZE: usize = 32;

fn keyed(key: &[u8], parts: &[&[u8]]) -> Result<HmacSha256, CryptoError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| CryptoError::KeyDerivation)?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac)
}

/// HMAC-SHA256 over the concatenation of `parts`.
pub fn compute_mac(key: &[u8], parts: &[&[u8]]) -> Result<[u8; MAC_SIZE], CryptoError> {
    Ok(keyed(key, parts)?.finalize().into_bytes().into())
}

/// Constant-time check of `tag` against HMAC-SHA256 over `parts`.
pub fn verify_mac(key: &[u8], parts: &[&[u8]], tag: &[u8]) -> Result<(), CryptoError> {
    keyed(key, parts)?.verify_slice(tag).map_err(|_| CryptoError::MacMismatch)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const KEY: [u8; 32] = [7; 32];

    #[test]
    fn mac_is_split_independent() {
        let whole = compute_mac(&KEY, &[b"header", b"payload"]).unwrap();
        let joined = compute_mac(&KEY, &[b"headerpayload"]).unwrap();
        assert_eq!(whole, joined);
    }

    #[test]
    fn truncated_tag_is_rejected() {
        let tag = compute_mac(&KEY, &[b"msg"]).unwrap();
        assert_eq!(verify_mac(&KEY, &[b"msg"], &tag[..16]), Err(CryptoError::MacMismatch));
    }

    proptest! {
        #[test]
        fn mac_verifies_only_its_message(
            msg in prop::collection::vec(any::<u8>(), 0..256),
            other in prop::collection::vec(any::<u8>(), 0..256),
        ) {
            let tag = compute_mac(&KEY, &[msg.as_slice()]).unwrap();
            prop_assert!(verify_mac(&KEY, &[msg.as_slice()], &tag).is_ok());
            if other != msg {
                prop_assert_eq!(verify_mac(&KEY, &[other.as_slice()], &tag), Err(CryptoError::MacMismatch));
            }
        }
    }
}
