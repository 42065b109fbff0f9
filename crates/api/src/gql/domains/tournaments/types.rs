use async_graphql::{Enum, InputObject, SimpleObject, ID};
use chrono::{DateTime, Utc};

use infra::models::{
    TournamentGameRow, TournamentInviteRow, TournamentPlayerRow, TournamentRow,
    TournamentSettingsRow,
};

use super::service::{
    BracketRound as BracketRoundData, BracketSlot as BracketSlotData, Entrant as EntrantData,
    TournamentSummary as TournamentSummaryData,
};
use crate::gql::common::helpers::to_id;
use crate::gql::domains::games::types::{InviteStatus, Visibility};

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
#[graphql(remote = "infra::repos::TournamentStatus")]
pub enum TournamentStatus {
    Pending,
    Active,
    Paused,
    Aborted,
    Finished,
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
#[graphql(remote = "infra::repos::BracketStatus")]
pub enum BracketStatus {
    Pending,
    Finished,
}

#[derive(SimpleObject, Clone)]
pub struct Tournament {
    pub id: ID,
    pub creator_id: ID,
    pub name: String,
    pub status: TournamentStatus,
    pub winner_id: Option<ID>,
    pub chat_room_id: Option<ID>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl From<TournamentRow> for Tournament {
    fn from(row: TournamentRow) -> Self {
        Self {
            id: to_id(row.id),
            creator_id: to_id(row.creator_id),
            name: row.name,
            status: row.status.into(),
            winner_id: row.winner_id.map(to_id),
            chat_room_id: row.chat_room_id.map(to_id),
            created_at: row.created_at,
            started_at: row.started_at,
            ended_at: row.ended_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct TournamentSettings {
    pub tournament_id: ID,
    pub capacity: i32,
    pub visibility: Visibility,
    pub num_games: i32,
    pub num_matches: i32,
    pub max_score: i32,
    pub ball_speed: i32,
    pub time_limit_seconds: Option<i32>,
}

impl From<TournamentSettingsRow> for TournamentSettings {
    fn from(row: TournamentSettingsRow) -> Self {
        Self {
            tournament_id: to_id(row.tournament_id),
            capacity: row.capacity,
            visibility: row.visibility.into(),
            num_games: row.num_games,
            num_matches: row.num_matches,
            max_score: row.max_score,
            ball_speed: row.ball_speed,
            time_limit_seconds: row.time_limit_seconds,
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct TournamentPlayer {
    pub id: ID,
    pub tournament_id: ID,
    pub player_id: ID,
    pub slot: i32,
    pub alias: Option<String>,
    pub joined_at: DateTime<Utc>,
}

impl TournamentPlayer {
    pub fn with_alias(row: TournamentPlayerRow, alias: Option<String>) -> Self {
        Self {
            id: to_id(row.id),
            tournament_id: to_id(row.tournament_id),
            player_id: to_id(row.player_id),
            slot: row.slot,
            alias,
            joined_at: row.joined_at,
        }
    }
}

impl From<TournamentPlayerRow> for TournamentPlayer {
    fn from(row: TournamentPlayerRow) -> Self {
        Self::with_alias(row, None)
    }
}

#[derive(SimpleObject, Clone)]
pub struct TournamentInvite {
    pub id: ID,
    pub tournament_id: ID,
    pub inviter_id: ID,
    pub invitee_id: ID,
    pub status: InviteStatus,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl From<TournamentInviteRow> for TournamentInvite {
    fn from(row: TournamentInviteRow) -> Self {
        Self {
            id: to_id(row.id),
            tournament_id: to_id(row.tournament_id),
            inviter_id: to_id(row.inviter_id),
            invitee_id: to_id(row.invitee_id),
            status: row.status.into(),
            created_at: row.created_at,
            responded_at: row.responded_at,
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct TournamentInviteResponse {
    pub invite: TournamentInvite,
    pub player: Option<TournamentPlayer>,
}

/// A generated game's place in the bracket.
#[derive(SimpleObject, Clone)]
pub struct TournamentGame {
    pub id: ID,
    pub tournament_id: ID,
    pub game_id: ID,
    pub round: i32,
    pub slot: i32,
    pub status: BracketStatus,
    pub winner_id: Option<ID>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TournamentGameRow> for TournamentGame {
    fn from(row: TournamentGameRow) -> Self {
        Self {
            id: to_id(row.id),
            tournament_id: to_id(row.tournament_id),
            game_id: to_id(row.game_id),
            round: row.round,
            slot: row.slot,
            status: row.status.into(),
            winner_id: row.winner_id.map(to_id),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct Entrant {
    pub player_id: ID,
    pub alias: Option<String>,
}

impl From<EntrantData> for Entrant {
    fn from(entrant: EntrantData) -> Self {
        Self {
            player_id: to_id(entrant.player_id),
            alias: entrant.alias,
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct BracketSlot {
    pub game_id: ID,
    pub slot: i32,
    pub status: BracketStatus,
    pub winner_id: Option<ID>,
    pub entrants: Vec<Entrant>,
}

impl From<BracketSlotData> for BracketSlot {
    fn from(data: BracketSlotData) -> Self {
        Self {
            game_id: to_id(data.row.game_id),
            slot: data.row.slot,
            status: data.row.status.into(),
            winner_id: data.row.winner_id.map(to_id),
            entrants: data.entrants.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct BracketRound {
    pub round: i32,
    pub slots: Vec<BracketSlot>,
}

impl From<BracketRoundData> for BracketRound {
    fn from(data: BracketRoundData) -> Self {
        Self {
            round: data.round,
            slots: data.slots.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct TournamentSummary {
    pub tournament: Tournament,
    pub settings: TournamentSettings,
    pub players: Vec<TournamentPlayer>,
    /// Highest round generated so far, `None` before seeding.
    pub current_round: Option<i32>,
    pub winner_id: Option<ID>,
}

impl From<TournamentSummaryData> for TournamentSummary {
    fn from(data: TournamentSummaryData) -> Self {
        let winner_id = data.tournament.winner_id.map(to_id);
        Self {
            tournament: data.tournament.into(),
            settings: data.settings.into(),
            players: data
                .players
                .into_iter()
                .map(|(row, alias)| TournamentPlayer::with_alias(row, alias))
                .collect(),
            current_round: data.current_round,
            winner_id,
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct StartTournamentResponse {
    pub tournament: Tournament,
    pub games: Vec<TournamentGame>,
}

#[derive(InputObject)]
pub struct CreateTournamentInput {
    pub name: String,
    /// 4, 8 or 16 players. Defaults to 4.
    pub capacity: Option<i32>,
    pub visibility: Option<Visibility>,
    pub num_games: Option<i32>,
    pub num_matches: Option<i32>,
    pub max_score: Option<i32>,
    pub ball_speed: Option<i32>,
    pub time_limit_seconds: Option<i32>,
    /// Display name inside the tournament; the username when omitted.
    pub alias: Option<String>,
}
