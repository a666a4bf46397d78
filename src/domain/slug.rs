//! Group slugs: derivation from titles and validation of supplied values.
//!
//! `slug::slugify` transliterates non-ASCII input (Cyrillic titles included),
//! so a title such as "Лев Толстой" becomes `lev-tolstoi`.

use slug::slugify;
use thiserror::Error;

/// Matches the stored column width for `groups.slug`.
pub const SLUG_MAX_LEN: usize = 50;
const MAX_SUFFIX_ATTEMPTS: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
    #[error("slug `{slug}` may only contain letters, digits, hyphens and underscores")]
    InvalidCharacters { slug: String },
    #[error("slug is longer than {SLUG_MAX_LEN} characters")]
    TooLong,
    #[error("exhausted attempts to find a unique slug for `{base}`")]
    Exhausted { base: String },
}

/// Derive a slug from a human-readable title.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let mut candidate = slugify(input);
    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    if candidate.len() > SLUG_MAX_LEN {
        candidate.truncate(SLUG_MAX_LEN);
        while candidate.ends_with('-') {
            candidate.pop();
        }
    }

    Ok(candidate)
}

/// Check an explicitly supplied slug: `[-a-zA-Z0-9_]+`, bounded length.
pub fn validate_slug(value: &str) -> Result<(), SlugError> {
    if value.is_empty() {
        return Err(SlugError::EmptyInput);
    }
    if value.len() > SLUG_MAX_LEN {
        return Err(SlugError::TooLong);
    }
    if !value
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
    {
        return Err(SlugError::InvalidCharacters {
            slug: value.to_string(),
        });
    }
    Ok(())
}

/// Produce a slug that does not collide according to `is_unique`, suffixing
/// `-2`, `-3`, ... when the base is taken.
pub fn generate_unique_slug<F>(input: &str, mut is_unique: F) -> Result<String, SlugError>
where
    F: FnMut(&str) -> bool,
{
    let base = derive_slug(input)?;
    if is_unique(&base) {
        return Ok(base);
    }

    for attempt in 2..=MAX_SUFFIX_ATTEMPTS + 1 {
        let candidate = format!("{base}-{attempt}");
        if is_unique(&candidate) {
            return Ok(candidate);
        }
    }

    Err(SlugError::Exhausted { base })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_ascii_slug() {
        assert_eq!(derive_slug("Hello, World!").unwrap(), "hello-world");
    }

    #[test]
    fn transliterates_cyrillic_titles() {
        let slug = derive_slug("Лев Толстой").unwrap();
        assert!(validate_slug(&slug).is_ok());
        assert!(slug.starts_with("lev"));
    }

    #[test]
    fn rejects_blank_titles() {
        assert_eq!(derive_slug("   "), Err(SlugError::EmptyInput));
    }

    #[test]
    fn long_titles_are_truncated_without_trailing_hyphen() {
        let title = "word ".repeat(30);
        let slug = derive_slug(&title).unwrap();
        assert!(slug.len() <= SLUG_MAX_LEN);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn validation_rejects_spaces_and_slashes() {
        assert!(validate_slug("test-slug_1").is_ok());
        assert!(matches!(
            validate_slug("bad slug"),
            Err(SlugError::InvalidCharacters { .. })
        ));
        assert!(validate_slug("a/b").is_err());
        assert_eq!(validate_slug(""), Err(SlugError::EmptyInput));
    }

    #[test]
    fn unique_slug_appends_counter() {
        let taken = ["cats", "cats-2"];
        let slug = generate_unique_slug("Cats", |candidate| !taken.contains(&candidate)).unwrap();
        assert_eq!(slug, "cats-3");
    }
}
