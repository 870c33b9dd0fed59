//! Node identity computation using BLAKE3

use crate::types::Identity;
use blake3::Hasher;

/// Compute the identity of a node from its tree label and root-inclusive path
///
/// Identity = hash("node" || label_len || label || segment_count || (segment_len || segment)*)
///
/// Length prefixes keep `["ab", "c"]` and `["a", "bc"]` apart.
pub fn compute_identity<S: AsRef<str>>(label: &str, path: &[S]) -> Identity {
    let mut hasher = Hasher::new();

    hasher.update(b"node");
    hasher.update(&(label.len() as u64).to_be_bytes());
    hasher.update(label.as_bytes());

    hasher.update(&(path.len() as u64).to_be_bytes());
    for segment in path {
        let bytes = segment.as_ref().as_bytes();
        hasher.update(&(bytes.len() as u64).to_be_bytes());
        hasher.update(bytes);
    }

    Identity(*hasher.finalize().as_bytes())
}
