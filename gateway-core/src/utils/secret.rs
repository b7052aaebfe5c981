use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// SHA-256 of a secret, hex-encoded. Used for anything stored in place of a plaintext credential.
pub fn hash_secret(secret: &[u8]) -> String {
    hex::encode(Sha256::digest(secret))
}

/// Compare two hex digests without leaking how many leading bytes matched.
pub fn digests_match(expected: &str, presented: &str) -> bool {
    let expected_bytes = expected.as_bytes();
    let presented_bytes = presented.as_bytes();

    if expected_bytes.len() != presented_bytes.len() {
        return false;
    }

    expected_bytes.ct_eq(presented_bytes).into()
}

/// Hash `secret` and compare it with a stored digest in constant time.
pub fn verify_secret(secret: &[u8], stored_hash: &str) -> bool {
    digests_match(stored_hash, &hash_secret(secret))
}
