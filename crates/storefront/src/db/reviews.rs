//! Review repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use ebano_core::{ProductId, Rating, ReviewId, UserId};

use super::RepositoryError;
use crate::models::review::{Review, ReviewInput, ReviewListing};

const LISTING_SELECT: &str = r"
    SELECT r.id, r.product_id, p.name AS product_name, u.full_name AS author_name,
           r.comment, r.rating, r.created_at
    FROM reviews r
    JOIN products p ON p.id = r.product_id
    JOIN users u ON u.id = r.user_id
";

// =============================================================================
// Internal Row Types
// =============================================================================

fn parse_rating(value: i16) -> Result<Rating, RepositoryError> {
    Rating::new(i32::from(value))
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid review rating: {e}")))
}

#[derive(Debug, sqlx::FromRow)]
struct ReviewRow {
    id: i32,
    user_id: i32,
    product_id: i32,
    comment: String,
    rating: i16,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = RepositoryError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ReviewId::new(row.id),
            user_id: UserId::new(row.user_id),
            product_id: ProductId::new(row.product_id),
            comment: row.comment,
            rating: parse_rating(row.rating)?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ListingRow {
    id: i32,
    product_id: i32,
    product_name: String,
    author_name: String,
    comment: String,
    rating: i16,
    created_at: DateTime<Utc>,
}

impl TryFrom<ListingRow> for ReviewListing {
    type Error = RepositoryError;

    fn try_from(row: ListingRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ReviewId::new(row.id),
            product_id: ProductId::new(row.product_id),
            product_name: row.product_name,
            author_name: row.author_name,
            comment: row.comment,
            rating: parse_rating(row.rating)?,
            created_at: row.created_at,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for review database operations.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Reviews of one product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ReviewListing>, RepositoryError> {
        let rows = sqlx::query_as::<_, ListingRow>(&format!(
            "{LISTING_SELECT} WHERE r.product_id = $1 ORDER BY r.created_at DESC, r.id DESC"
        ))
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Reviews written by one user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ReviewListing>, RepositoryError> {
        let rows = sqlx::query_as::<_, ListingRow>(&format!(
            "{LISTING_SELECT} WHERE r.user_id = $1 ORDER BY r.created_at DESC, r.id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Every review, newest first (back-office moderation).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<ReviewListing>, RepositoryError> {
        let rows = sqlx::query_as::<_, ListingRow>(&format!(
            "{LISTING_SELECT} ORDER BY r.created_at DESC, r.id DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Get a review by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(
            "SELECT id, user_id, product_id, comment, rating, created_at FROM reviews WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// The user's existing review of a product, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists_for(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<ReviewId>, RepositoryError> {
        let id = sqlx::query_scalar::<_, i32>(
            "SELECT id FROM reviews WHERE user_id = $1 AND product_id = $2 ORDER BY id LIMIT 1",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(id.map(ReviewId::new))
    }

    /// Create a review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        user_id: UserId,
        product_id: ProductId,
        input: &ReviewInput,
    ) -> Result<Review, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(
            r"
            INSERT INTO reviews (user_id, product_id, comment, rating)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, product_id, comment, rating, created_at
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(&input.comment)
        .bind(rating_column(input.rating))
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// Update a review owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such review belongs to the user.
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn update(
        &self,
        id: ReviewId,
        user_id: UserId,
        input: &ReviewInput,
    ) -> Result<Review, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(
            r"
            UPDATE reviews SET comment = $3, rating = $4
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, product_id, comment, rating, created_at
            ",
        )
        .bind(id)
        .bind(user_id)
        .bind(&input.comment)
        .bind(rating_column(input.rating))
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Delete a review owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such review belongs to the user.
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete_owned(&self, id: ReviewId, user_id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete any review (back-office moderation).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review does not exist.
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: ReviewId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Count all reviews.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reviews")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

fn rating_column(rating: Rating) -> i16 {
    i16::from(rating.as_u8())
}
