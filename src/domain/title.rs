//! Recovering stay references from free-text transfer titles.

use super::stay::StayId;
use regex::Regex;
use std::sync::LazyLock;

static TAGGED_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)stay\s*[_\-#:]?\s*([0-9]+)").expect("valid stay pattern"));

static BARE_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*#?([0-9]+)\s*$").expect("valid bare id pattern"));

/// Extracts the stay id a payer wrote into a transfer title.
///
/// Accepts the word `stay` (any case) followed by the id, optionally separated
/// by whitespace and one of `_ - # :` (`"Stay 12"`, `"STAY-12"`, `"stay_12"`,
/// `"payment for stay #12"`), or a title that is nothing but the id (`"12"`).
/// The first tagged reference holding a valid id wins. Only ASCII digits
/// count. Numbers outside a tag are ignored so that dates and invoice numbers
/// in longer titles are never mistaken for stay ids.
pub fn parse_stay_reference(title: &str) -> Option<StayId> {
    TAGGED_REFERENCE
        .captures_iter(title)
        .chain(BARE_REFERENCE.captures(title))
        .find_map(|captures| captures.get(1)?.as_str().parse().ok())
}
