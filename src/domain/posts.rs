//! Post and comment content rules.

use super::entities::GroupId;
use super::error::FieldErrors;

/// Number of characters shown when a post is rendered as a one-line label.
pub const POST_PREVIEW_CHARS: usize = 15;
/// Longest accepted image reference, matching the stored column width.
pub const IMAGE_REFERENCE_MAX_LEN: usize = 100;

pub const REQUIRED_MESSAGE: &str = "This field is required.";
pub const INVALID_CHOICE_MESSAGE: &str =
    "Select a valid choice. That choice is not one of the available choices.";

/// Short label for a post: the first characters of its text.
pub fn preview(text: &str) -> String {
    text.chars().take(POST_PREVIEW_CHARS).collect()
}

/// Validated post content ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub text: String,
    pub group_id: Option<GroupId>,
    pub image: Option<String>,
}

impl PostDraft {
    /// Parse raw form values. Group existence is checked by the caller, which
    /// owns the repository.
    pub fn parse(
        text: &str,
        group: Option<&str>,
        image: Option<&str>,
    ) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();

        if text.trim().is_empty() {
            errors.push("text", REQUIRED_MESSAGE);
        }

        let group_id = match group.map(str::trim).filter(|value| !value.is_empty()) {
            None => None,
            Some(raw) => match raw.parse::<GroupId>() {
                Ok(id) if id > 0 => Some(id),
                _ => {
                    errors.push("group", INVALID_CHOICE_MESSAGE);
                    None
                }
            },
        };

        let image = image
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        if let Some(reference) = image.as_deref() {
            if reference.chars().count() > IMAGE_REFERENCE_MAX_LEN {
                errors.push(
                    "image",
                    format!(
                        "Ensure this filename has at most {IMAGE_REFERENCE_MAX_LEN} characters."
                    ),
                );
            }
        }

        errors.into_result(Self {
            text: text.trim().to_string(),
            group_id,
            image,
        })
    }
}

/// Validate comment text, returning it with surrounding whitespace removed.
pub fn parse_comment(text: &str) -> Result<String, FieldErrors> {
    let text = text.trim();
    let mut errors = FieldErrors::new();
    if text.is_empty() {
        errors.push("text", REQUIRED_MESSAGE);
    }
    errors.into_result(text.to_string())
}
