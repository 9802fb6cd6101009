use sha2::{Digest, Sha256};

/// SHA-256 over the raw password bytes, lowercase hex. No salt, no stretching.
pub fn hash_password(plain: &str) -> String {
    hex::encode(Sha256::digest(plain.as_bytes()))
}

pub fn verify_password(plain: &str, hash: &str) -> bool {
    constant_time_eq(hash_password(plain).as_bytes(), hash.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
