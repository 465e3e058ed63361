use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::DatabaseConfig;
use crate::error::LensError;
use crate::models::{FeedbackRecord, NewFeedback};

const CREATE_FEEDBACK_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS feedback (
    id         BIGSERIAL PRIMARY KEY,
    content    TEXT NOT NULL,
    sentiment  TEXT NOT NULL CHECK (sentiment IN ('Positive', 'Negative', 'Neutral')),
    summary    TEXT NOT NULL,
    created_at TEXT NOT NULL
)
"#;

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await
}

pub async fn health_check(pool: &PgPool) -> Result<String, sqlx::Error> {
    let row: (String,) = sqlx::query_as("SELECT version()").fetch_one(pool).await?;
    Ok(row.0)
}

/// Create the feedback table if it does not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(CREATE_FEEDBACK_TABLE).execute(pool).await?;
    Ok(())
}

pub async fn check_schema(pool: &PgPool) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT to_regclass('public.feedback') IS NOT NULL")
        .fetch_one(pool)
        .await
}

/// Persistence seam for analysed feedback.
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Insert one row and return the id the store assigned.
    async fn insert(&self, row: &NewFeedback) -> Result<i64, LensError>;

    /// Short description of the backing store, or an error if it is unreachable.
    async fn health(&self) -> Result<String, LensError>;
}

#[derive(Debug, Clone)]
pub struct PgFeedbackStore {
    pool: PgPool,
}

impl PgFeedbackStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn get(&self, id: i64) -> Result<Option<FeedbackRecord>, LensError> {
        let row = sqlx::query_as::<_, FeedbackRecord>(
            "SELECT id, content, sentiment, summary, created_at FROM feedback WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

#[async_trait]
impl FeedbackStore for PgFeedbackStore {
    async fn insert(&self, row: &NewFeedback) -> Result<i64, LensError> {
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO feedback (content, sentiment, summary, created_at) VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&row.content)
        .bind(row.sentiment.as_str())
        .bind(&row.summary)
        .bind(&row.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn health(&self) -> Result<String, LensError> {
        Ok(health_check(&self.pool).await?)
    }
}
