use sha2::Digest;

/// Hex SHA-256 of template source, used to tell cached revisions apart.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    hex::encode(digest)
}
