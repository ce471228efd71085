//! Extraction of artist ids from user supplied links

use std::sync::LazyLock;

use regex::Regex;

use super::id::ArtistId;

static ARTIST_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"artist/(\d+)").expect("artist locator regex is valid"));

/// Finds the numeric id following the first `artist/` segment.
///
/// Returns `None` if there is no such segment or the number does not fit the id.
/// Ids must fit a signed 64-bit integer, the widest integer the store keeps.
pub fn parse_artist_id(locator: &str) -> Option<ArtistId> {
    let captures = ARTIST_SEGMENT.captures(locator)?;
    let id: i64 = captures[1].parse().ok()?;
    u64::try_from(id).ok().map(ArtistId)
}
