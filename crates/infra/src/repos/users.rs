use sqlx::{PgExecutor, Result};
use uuid::Uuid;

use crate::models::UserRow;

/// Fixed id of the computer-controlled opponent in training and single-player games.
pub const AI_PLAYER_ID: Uuid = Uuid::from_u128(0xa1);

pub async fn create<'e>(executor: impl PgExecutor<'e>, username: &str) -> Result<UserRow> {
    sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users (username)
        VALUES ($1)
        RETURNING id, username, is_ai, created_at
        "#,
    )
    .bind(username)
    .fetch_one(executor)
    .await
}

pub async fn get_by_id<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<Option<UserRow>> {
    sqlx::query_as::<_, UserRow>("SELECT id, username, is_ai, created_at FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn get_by_ids<'e>(executor: impl PgExecutor<'e>, ids: &[Uuid]) -> Result<Vec<UserRow>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, UserRow>(
        "SELECT id, username, is_ai, created_at FROM users WHERE id = ANY($1::uuid[])",
    )
    .bind(ids)
    .fetch_all(executor)
    .await
}

pub async fn exists<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<bool> {
    let result: (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
        .bind(id)
        .fetch_one(executor)
        .await?;

    Ok(result.0)
}

pub async fn username_of<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<Option<String>> {
    let row: Option<(String,)> = sqlx::query_as("SELECT username FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(row.map(|(username,)| username))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ai_player_id_matches_the_seeded_row() {
        assert_eq!(
            AI_PLAYER_ID.to_string(),
            "00000000-0000-0000-0000-0000000000a1"
        );
    }
}
