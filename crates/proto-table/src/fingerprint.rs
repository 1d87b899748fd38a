use xxhash_rust::xxh3::{xxh3_128_with_seed, xxh3_64};

// Keyed fingerprints keep index names content-addressed without being
// forgeable by accident from unrelated hash uses in the same database.
const INDEX_FINGERPRINT_KEY: &[u8] = b"proto table umash index fp key";

/// Derive the content-addressed name of a functional index.
///
/// The name embeds a 128-bit keyed fingerprint of the literal index
/// expression: semantically equal expressions always produce the same
/// name, and any change to an expression produces a fresh name, leaving
/// the old index behind as a discoverable orphan.
pub fn index_name(table: &str, suffix: &str, auto: bool, expression: &str) -> String {
    let seed = xxh3_64(INDEX_FINGERPRINT_KEY);
    let fingerprint = xxh3_128_with_seed(expression.as_bytes(), seed);
    let (high, low) = ((fingerprint >> 64) as u64, fingerprint as u64);

    format!(
        "proto_{}index__{table}__{suffix}__{high:016x}{low:016x}",
        if auto { "auto" } else { "" },
    )
}
