use crate::repos::games::{GameMode, GameStatus, PaddleLocation, PaddleSide, Visibility};
use crate::repos::invites::InviteStatus;
use crate::repos::tournament_games::BracketStatus;
use crate::repos::tournaments::TournamentStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub is_ai: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct GameRow {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub status: GameStatus,
    pub winner_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct GameSettingsRow {
    pub game_id: Uuid,
    pub mode: GameMode,
    pub capacity: i32,
    pub visibility: Visibility,
    pub num_games: i32,
    pub num_matches: i32,
    pub max_score: i32,
    pub ball_speed: i32,
    pub time_limit_seconds: Option<i32>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct GamePlayerRow {
    pub id: Uuid,
    pub game_id: Uuid,
    pub player_id: Uuid,
    pub slot: i32,
    pub paddle_location: Option<PaddleLocation>,
    pub paddle_side: Option<PaddleSide>,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MatchRow {
    pub id: Uuid,
    pub game_id: Uuid,
    /// 1-based position of the match (set) within its game.
    pub number: i32,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub winner_id: Option<Uuid>,
    pub completed: bool,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MatchScoreRow {
    pub id: Uuid,
    pub match_id: Uuid,
    pub player_id: Uuid,
    pub score: i32,
    pub hits: i32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct GameInviteRow {
    pub id: Uuid,
    pub game_id: Uuid,
    pub inviter_id: Uuid,
    pub invitee_id: Uuid,
    pub status: InviteStatus,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TournamentRow {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub name: String,
    pub status: TournamentStatus,
    pub winner_id: Option<Uuid>,
    pub chat_room_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TournamentSettingsRow {
    pub tournament_id: Uuid,
    pub capacity: i32,
    pub visibility: Visibility,
    pub num_games: i32,
    pub num_matches: i32,
    pub max_score: i32,
    pub ball_speed: i32,
    pub time_limit_seconds: Option<i32>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TournamentPlayerRow {
    pub id: Uuid,
    pub tournament_id: Uuid,
    pub player_id: Uuid,
    pub slot: i32,
    pub joined_at: DateTime<Utc>,
}

/// One bracket slot: the game played for `slot` in `round`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TournamentGameRow {
    pub id: Uuid,
    pub tournament_id: Uuid,
    pub game_id: Uuid,
    pub round: i32,
    pub slot: i32,
    pub status: BracketStatus,
    pub winner_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TournamentAliasRow {
    pub id: Uuid,
    pub tournament_id: Uuid,
    pub player_id: Uuid,
    pub alias: String,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TournamentInviteRow {
    pub id: Uuid,
    pub tournament_id: Uuid,
    pub inviter_id: Uuid,
    pub invitee_id: Uuid,
    pub status: InviteStatus,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}
