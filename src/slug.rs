// Detail-page URL segments: "2020-maruti-suzuki-swift-abc123".
// Only the trailing identifier is meaningful; the rest is cosmetic.
//
// Identifiers must be hyphen-free, otherwise the last hyphen-delimited
// component of a slug is not the whole identifier. `encode` refuses such
// identifiers rather than emitting a slug that cannot be decoded.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("listing identifier is empty")]
    EmptyIdentifier,
    #[error("listing identifier '{0}' contains a hyphen and cannot be embedded in a slug")]
    HyphenatedIdentifier(String),
}

pub fn encode(make: &str, model: &str, year: u16, id: &str) -> Result<String, SlugError> {
    if id.is_empty() {
        return Err(SlugError::EmptyIdentifier);
    }
    if id.contains('-') {
        return Err(SlugError::HyphenatedIdentifier(id.to_string()));
    }

    let readable = hyphenate(&format!("{}-{}-{}", year, make, model).to_lowercase());
    if readable.is_empty() {
        return Ok(id.to_string());
    }
    Ok(format!("{}-{}", readable, id))
}

// Recovers the identifier; `None` for an empty segment
pub fn decode(slug: &str) -> Option<&str> {
    slug.rsplit('-').next().filter(|id| !id.is_empty())
}

// Collapses every run of characters outside [a-z0-9] into one hyphen and
// trims hyphens from both ends.
fn hyphenate(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_hyphen = false;
    for c in input.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(c);
        } else {
            pending_hyphen = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_make_model_year_and_id() {
        let slug = encode("Maruti Suzuki", "Swift", 2020, "abc123").unwrap();
        assert_eq!(slug, "2020-maruti-suzuki-swift-abc123");
        assert_eq!(decode(&slug), Some("abc123"));
    }

    #[test]
    fn collapses_punctuation_runs() {
        let slug = encode("Mercedes-Benz", "C-Class  (W205)", 2018, "64f0c2").unwrap();
        assert_eq!(slug, "2018-mercedes-benz-c-class-w205-64f0c2");
    }

    #[test]
    fn trims_trailing_separators() {
        let slug = encode("BMW", "X5 !!", 2021, "id9").unwrap();
        assert_eq!(slug, "2021-bmw-x5-id9");
    }

    #[test]
    fn non_ascii_letters_become_separators() {
        let slug = encode("Škoda", "Octavia", 2019, "k1").unwrap();
        assert_eq!(slug, "2019-koda-octavia-k1");
    }

    #[test]
    fn rejects_hyphenated_identifiers() {
        assert_eq!(
            encode("Tata", "Nexon", 2022, "a-b"),
            Err(SlugError::HyphenatedIdentifier("a-b".to_string()))
        );
        assert_eq!(encode("Tata", "Nexon", 2022, ""), Err(SlugError::EmptyIdentifier));
    }

    #[test]
    fn decode_takes_last_segment() {
        assert_eq!(decode("abc123"), Some("abc123"));
        assert_eq!(decode("2020-x-y-65a1f"), Some("65a1f"));
        assert_eq!(decode(""), None);
        assert_eq!(decode("2020-swift-"), None);
    }
}
