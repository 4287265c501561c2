//! Deterministic name derivation for generated objects.

use sha2::{Digest, Sha256};

/// Generated names must fit in a label value.
pub const MAX_GENERATED_NAME_LEN: usize = 63;

const DIGEST_SUFFIX_LEN: usize = 5;

/// Joins `parts` with `-`. Names longer than [`MAX_GENERATED_NAME_LEN`] are
/// truncated and suffixed with the first hex digits of the SHA-256 of the
/// full name, so distinct long inputs stay distinct and the same input
/// always yields the same name.
pub fn safe_concat_name(parts: &[&str]) -> String {
    let full = parts.join("-");
    if full.len() <= MAX_GENERATED_NAME_LEN {
        return full;
    }

    let digest = hex::encode(Sha256::digest(full.as_bytes()));
    let mut cut = MAX_GENERATED_NAME_LEN - DIGEST_SUFFIX_LEN - 1;
    while !full.is_char_boundary(cut) {
        cut -= 1;
    }

    format!("{}-{}", &full[..cut], &digest[..DIGEST_SUFFIX_LEN])
        .replace(".-", "-")
}
