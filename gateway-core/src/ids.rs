//! Configuration record identifiers.
//!
//! Ids are 24 lowercase hex characters, the textual form of a 12-byte
//! object id.

use uuid::Uuid;

pub const ID_LEN: usize = 24;

/// Generate a fresh random id.
pub fn generate() -> String {
    let simple = Uuid::new_v4().simple().to_string();
    simple[..ID_LEN].to_string()
}

/// Returns true when `id` has the shape of a record id. Hex digits are
/// accepted in either case.
pub fn is_valid(id: &str) -> bool {
    id.len() == ID_LEN && id.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Canonical lowercase form of a well-formed id, `None` otherwise.
pub fn normalize(id: &str) -> Option<String> {
    is_valid(id).then(|| id.to_ascii_lowercase())
}
