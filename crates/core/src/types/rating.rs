//! Review rating.

use serde::{Deserialize, Serialize};

const STAR_COUNT: usize = 5;

/// Error returned when a rating is outside `1..=5`.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("rating must be between {min} and {max} (got {got})", min = Rating::MIN, max = Rating::MAX)]
pub struct RatingError {
    /// The rejected value.
    pub got: i32,
}

/// A 1-5 star review rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: i32 = 1;
    pub const MAX: i32 = 5;

    /// Create a rating.
    ///
    /// # Errors
    ///
    /// Returns `RatingError` if `value` is outside `1..=5`.
    pub fn new(value: i32) -> Result<Self, RatingError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            u8::try_from(value)
                .map(Self)
                .map_err(|_| RatingError { got: value })
        } else {
            Err(RatingError { got: value })
        }
    }

    /// The rating as a plain integer.
    #[must_use]
    pub fn value(self) -> i32 {
        i32::from(self.0)
    }

    /// The rating as its raw byte, for narrow storage columns.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    /// Filled/empty star string, e.g. `★★★☆☆`.
    #[must_use]
    pub fn stars(self) -> String {
        let filled = usize::from(self.0);
        "★".repeat(filled) + &"☆".repeat(STAR_COUNT.saturating_sub(filled))
    }
}

impl TryFrom<i32> for Rating {
    type Error = RatingError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for i32 {
    fn from(rating: Rating) -> Self {
        rating.value()
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
