use crate::{
    models::{TournamentRow, TournamentSettingsRow},
    pagination::LimitOffset,
    repos::games::Visibility,
};
use sqlx::{PgExecutor, Result as SqlxResult};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, serde::Serialize, serde::Deserialize)]
#[sqlx(type_name = "tournament_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    Pending,
    Active,
    Paused,
    Aborted,
    Finished,
}

impl TournamentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentStatus::Pending => "pending",
            TournamentStatus::Active => "active",
            TournamentStatus::Paused => "paused",
            TournamentStatus::Aborted => "aborted",
            TournamentStatus::Finished => "finished",
        }
    }

    pub fn can_transition_to(self, next: TournamentStatus) -> bool {
        use TournamentStatus::*;
        matches!(
            (self, next),
            (Pending, Active)
                | (Pending, Aborted)
                | (Active, Paused)
                | (Active, Finished)
                | (Active, Aborted)
                | (Paused, Active)
                | (Paused, Aborted)
        )
    }
}

impl FromStr for TournamentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TournamentStatus::Pending),
            "active" => Ok(TournamentStatus::Active),
            "paused" => Ok(TournamentStatus::Paused),
            "aborted" => Ok(TournamentStatus::Aborted),
            "finished" => Ok(TournamentStatus::Finished),
            _ => Err(format!("Unknown tournament status: {}", s)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateTournamentSettings {
    pub capacity: i32,
    pub visibility: Visibility,
    pub num_games: i32,
    pub num_matches: i32,
    pub max_score: i32,
    pub ball_speed: i32,
    pub time_limit_seconds: Option<i32>,
}

const TOURNAMENT_COLUMNS: &str = "id, creator_id, name, status, winner_id, chat_room_id, \
                                  created_at, started_at, ended_at, updated_at";

pub async fn insert<'e>(
    executor: impl PgExecutor<'e>,
    creator_id: Uuid,
    name: &str,
) -> SqlxResult<Option<TournamentRow>> {
    sqlx::query_as::<_, TournamentRow>(&format!(
        "INSERT INTO tournaments (creator_id, name) VALUES ($1, $2) RETURNING {TOURNAMENT_COLUMNS}"
    ))
    .bind(creator_id)
    .bind(name)
    .fetch_optional(executor)
    .await
}

pub async fn get_by_id<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> SqlxResult<Option<TournamentRow>> {
    sqlx::query_as::<_, TournamentRow>(&format!(
        "SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Lock the tournament row for the rest of the transaction.
pub async fn get_for_update<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> SqlxResult<Option<TournamentRow>> {
    sqlx::query_as::<_, TournamentRow>(&format!(
        "SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn list<'e>(
    executor: impl PgExecutor<'e>,
    status: Option<TournamentStatus>,
    page: LimitOffset,
) -> SqlxResult<Vec<TournamentRow>> {
    sqlx::query_as::<_, TournamentRow>(&format!(
        r#"
        SELECT {TOURNAMENT_COLUMNS}
        FROM tournaments
        WHERE ($1::tournament_status IS NULL OR status = $1)
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#
    ))
    .bind(status)
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(executor)
    .await
}

/// Move a pending tournament to active. `None` when it was not pending any more.
pub async fn activate<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> SqlxResult<Option<TournamentRow>> {
    sqlx::query_as::<_, TournamentRow>(&format!(
        r#"
        UPDATE tournaments
        SET status = 'active', started_at = NOW(), updated_at = NOW()
        WHERE id = $1 AND status = 'pending'
        RETURNING {TOURNAMENT_COLUMNS}
        "#
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Crown the champion. Guarded so the winner is written at most once.
pub async fn finish<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    winner_id: Uuid,
) -> SqlxResult<u64> {
    let result = sqlx::query(
        r#"
        UPDATE tournaments
        SET status = 'finished', winner_id = $2, ended_at = NOW(), updated_at = NOW()
        WHERE id = $1 AND status <> 'finished'
        "#,
    )
    .bind(id)
    .bind(winner_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

pub async fn set_chat_room<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    chat_room_id: Uuid,
) -> SqlxResult<u64> {
    let result = sqlx::query(
        "UPDATE tournaments SET chat_room_id = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(chat_room_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

pub async fn insert_settings<'e>(
    executor: impl PgExecutor<'e>,
    tournament_id: Uuid,
    data: &CreateTournamentSettings,
) -> SqlxResult<u64> {
    let result = sqlx::query(
        r#"
        INSERT INTO tournament_settings (tournament_id, capacity, visibility, num_games,
                                         num_matches, max_score, ball_speed, time_limit_seconds)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(tournament_id)
    .bind(data.capacity)
    .bind(data.visibility)
    .bind(data.num_games)
    .bind(data.num_matches)
    .bind(data.max_score)
    .bind(data.ball_speed)
    .bind(data.time_limit_seconds)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

pub async fn get_settings<'e>(
    executor: impl PgExecutor<'e>,
    tournament_id: Uuid,
) -> SqlxResult<Option<TournamentSettingsRow>> {
    sqlx::query_as::<_, TournamentSettingsRow>(
        r#"
        SELECT tournament_id, capacity, visibility, num_games, num_matches,
               max_score, ball_speed, time_limit_seconds
        FROM tournament_settings
        WHERE tournament_id = $1
        "#,
    )
    .bind(tournament_id)
    .fetch_optional(executor)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tournament_transitions() {
        use TournamentStatus::*;
        assert!(Pending.can_transition_to(Active));
        assert!(Active.can_transition_to(Finished));
        assert!(Paused.can_transition_to(Active));
        assert!(!Pending.can_transition_to(Finished));
        assert!(!Finished.can_transition_to(Active));
        assert!(!Aborted.can_transition_to(Pending));
    }

    #[test]
    fn status_parsing_rejects_unknown_values() {
        assert_eq!("finished".parse::<TournamentStatus>(), Ok(TournamentStatus::Finished));
        assert!("done".parse::<TournamentStatus>().is_err());
    }
}
