//! Stable episode identity and its short fingerprint.

use crate::textprep;
use sha2::{Digest, Sha256};

/// Hex characters kept from the SHA-256 of an id.
pub const SLUG_LEN: usize = 16;

/// First non-empty of: guid, normalized link, normalized title.
///
/// The link is taken as published (before public-URL rewriting) so ids survive rule changes.
pub fn episode_id(guid: Option<&str>, link: Option<&str>, title: Option<&str>) -> String {
    [guid, link, title]
        .into_iter()
        .flatten()
        .map(textprep::normalize)
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

/// First `SLUG_LEN` lowercase hex chars of SHA-256(`id`). Collisions are not detected.
pub fn slug(id: &str) -> String {
    let digest = Sha256::digest(id.as_bytes());
    let mut s = hex::encode(digest);
    s.truncate(SLUG_LEN);
    s
}
