use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::error::ApiError;

/// Time budget for a single store operation within a request.
pub const STORE_TIMEOUT: Duration = Duration::from_secs(30);

pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("connect to database")?;
    Ok(db)
}

/// Runs a store future under the per-request time budget. Elapsed budget
/// surfaces as `ApiError::Timeout` so callers never block indefinitely.
pub async fn bounded<F, T>(fut: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(STORE_TIMEOUT, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(ApiError::Store(e)),
        Err(_) => Err(ApiError::Timeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bounded_passes_through_success() {
        let out = bounded(async { Ok::<_, sqlx::Error>(5_i64) }).await;
        assert_eq!(out.unwrap(), 5);
    }

    #[tokio::test]
    async fn bounded_maps_store_errors() {
        let out = bounded(async { Err::<i64, _>(sqlx::Error::RowNotFound) }).await;
        assert!(matches!(out, Err(ApiError::Store(_))));
    }
}
