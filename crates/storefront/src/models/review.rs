//! Product review types.

use chrono::{DateTime, Utc};

use ebano_core::{ProductId, Rating, ReviewId, UserId};

/// Allowed comment length, in characters.
pub const COMMENT_MIN_CHARS: usize = 5;
pub const COMMENT_MAX_CHARS: usize = 1000;

/// A stored review.
#[derive(Debug, Clone)]
pub struct Review {
    pub id: ReviewId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub comment: String,
    pub rating: Rating,
    pub created_at: DateTime<Utc>,
}

/// A review joined with its author and product names.
#[derive(Debug, Clone)]
pub struct ReviewListing {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub product_name: String,
    pub author_name: String,
    pub comment: String,
    pub rating: Rating,
    pub created_at: DateTime<Utc>,
}

/// Validated review form input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewInput {
    pub comment: String,
    pub rating: Rating,
}

/// Why a review form was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReviewInputError {
    #[error("Comments must be between {min} and {max} characters.", min = COMMENT_MIN_CHARS, max = COMMENT_MAX_CHARS)]
    CommentLength,
    #[error("Choose a rating between 1 and 5.")]
    Rating,
}

impl ReviewInput {
    /// Validate raw form values.
    ///
    /// # Errors
    ///
    /// Returns `ReviewInputError` when the comment length or rating is out of range.
    pub fn parse(comment: &str, rating: &str) -> Result<Self, ReviewInputError> {
        let comment = comment.trim();
        let len = comment.chars().count();
        if !(COMMENT_MIN_CHARS..=COMMENT_MAX_CHARS).contains(&len) {
            return Err(ReviewInputError::CommentLength);
        }

        let rating = rating
            .trim()
            .parse::<i32>()
            .ok()
            .and_then(|v| Rating::new(v).ok())
            .ok_or(ReviewInputError::Rating)?;

        Ok(Self {
            comment: comment.to_string(),
            rating,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_input_is_trimmed() {
        let input = ReviewInput::parse("  Muy buen café  ", "4").unwrap();
        assert_eq!(input.comment, "Muy buen café");
        assert_eq!(input.rating.value(), 4);
    }

    #[test]
    fn test_comment_bounds() {
        assert_eq!(
            ReviewInput::parse("meh", "3"),
            Err(ReviewInputError::CommentLength)
        );
        assert!(ReviewInput::parse("12345", "3").is_ok());
        assert!(ReviewInput::parse(&"x".repeat(1000), "3").is_ok());
        assert_eq!(
            ReviewInput::parse(&"x".repeat(1001), "3"),
            Err(ReviewInputError::CommentLength)
        );
    }

    #[test]
    fn test_comment_length_counts_characters() {
        // five characters, more than five bytes
        assert!(ReviewInput::parse("ñññññ", "5").is_ok());
    }

    #[test]
    fn test_rating_rejected() {
        assert_eq!(
            ReviewInput::parse("Great beans", "6"),
            Err(ReviewInputError::Rating)
        );
        assert_eq!(
            ReviewInput::parse("Great beans", "five"),
            Err(ReviewInputError::Rating)
        );
    }
}
