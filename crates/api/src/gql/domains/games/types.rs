use async_graphql::{Enum, InputObject, SimpleObject, ID};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use infra::models::{
    GameInviteRow, GamePlayerRow, GameRow, GameSettingsRow, MatchRow, MatchScoreRow,
};
use uuid::Uuid;

use super::ledger::{self, LedgerSummary, RallyStats};
use super::service::GameSummary as GameSummaryData;
use crate::gql::common::helpers::{parse_id, to_id};

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
#[graphql(remote = "infra::repos::GameStatus")]
pub enum GameStatus {
    Pending,
    Active,
    Paused,
    Aborted,
    Finished,
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
#[graphql(remote = "infra::repos::GameMode")]
pub enum GameMode {
    Training,
    SinglePlayer,
    Multiplayer,
    Tournament,
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
#[graphql(remote = "infra::repos::Visibility")]
pub enum Visibility {
    Public,
    Private,
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
#[graphql(remote = "infra::repos::PaddleLocation")]
pub enum PaddleLocation {
    Left,
    Right,
    Top,
    Bottom,
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
#[graphql(remote = "infra::repos::PaddleSide")]
pub enum PaddleSide {
    Left,
    Right,
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
#[graphql(remote = "infra::repos::InviteStatus")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Declined,
}

#[derive(SimpleObject, Clone)]
pub struct Game {
    pub id: ID,
    pub creator_id: ID,
    pub status: GameStatus,
    pub winner_id: Option<ID>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl From<GameRow> for Game {
    fn from(row: GameRow) -> Self {
        Self {
            id: to_id(row.id),
            creator_id: to_id(row.creator_id),
            status: row.status.into(),
            winner_id: row.winner_id.map(to_id),
            created_at: row.created_at,
            started_at: row.started_at,
            ended_at: row.ended_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct GameSettings {
    pub game_id: ID,
    pub mode: GameMode,
    pub capacity: i32,
    pub visibility: Visibility,
    /// Sets a player must win to take the game.
    pub num_games: i32,
    pub num_matches: i32,
    /// Points that win a set.
    pub max_score: i32,
    pub ball_speed: i32,
    pub time_limit_seconds: Option<i32>,
    pub updated_at: DateTime<Utc>,
}

impl From<GameSettingsRow> for GameSettings {
    fn from(row: GameSettingsRow) -> Self {
        Self {
            game_id: to_id(row.game_id),
            mode: row.mode.into(),
            capacity: row.capacity,
            visibility: row.visibility.into(),
            num_games: row.num_games,
            num_matches: row.num_matches,
            max_score: row.max_score,
            ball_speed: row.ball_speed,
            time_limit_seconds: row.time_limit_seconds,
            updated_at: row.updated_at,
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct GamePlayer {
    pub id: ID,
    pub game_id: ID,
    pub player_id: ID,
    pub slot: i32,
    pub paddle_location: Option<PaddleLocation>,
    pub paddle_side: Option<PaddleSide>,
    pub joined_at: DateTime<Utc>,
}

impl From<GamePlayerRow> for GamePlayer {
    fn from(row: GamePlayerRow) -> Self {
        Self {
            id: to_id(row.id),
            game_id: to_id(row.game_id),
            player_id: to_id(row.player_id),
            slot: row.slot,
            paddle_location: row.paddle_location.map(Into::into),
            paddle_side: row.paddle_side.map(Into::into),
            joined_at: row.joined_at,
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct Match {
    pub id: ID,
    pub game_id: ID,
    pub number: i32,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub winner_id: Option<ID>,
    pub completed: bool,
}

impl From<MatchRow> for Match {
    fn from(row: MatchRow) -> Self {
        Self {
            id: to_id(row.id),
            game_id: to_id(row.game_id),
            number: row.number,
            started_at: row.started_at,
            ended_at: row.ended_at,
            winner_id: row.winner_id.map(to_id),
            completed: row.completed,
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct MatchScore {
    pub match_id: ID,
    pub player_id: ID,
    pub score: i32,
    pub hits: i32,
    pub updated_at: DateTime<Utc>,
}

impl From<MatchScoreRow> for MatchScore {
    fn from(row: MatchScoreRow) -> Self {
        Self {
            match_id: to_id(row.match_id),
            player_id: to_id(row.player_id),
            score: row.score,
            hits: row.hits,
            updated_at: row.updated_at,
        }
    }
}

#[derive(SimpleObject, Clone)]
pub struct GameInvite {
    pub id: ID,
    pub game_id: ID,
    pub inviter_id: ID,
    pub invitee_id: ID,
    pub status: InviteStatus,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl From<GameInviteRow> for GameInvite {
    fn from(row: GameInviteRow) -> Self {
        Self {
            id: to_id(row.id),
            game_id: to_id(row.game_id),
            inviter_id: to_id(row.inviter_id),
            invitee_id: to_id(row.invitee_id),
            status: row.status.into(),
            created_at: row.created_at,
            responded_at: row.responded_at,
        }
    }
}

#[derive(InputObject)]
pub struct CreateGameInput {
    pub mode: GameMode,
    pub capacity: Option<i32>,
    pub visibility: Option<Visibility>,
    pub num_games: Option<i32>,
    pub num_matches: Option<i32>,
    pub max_score: Option<i32>,
    pub ball_speed: Option<i32>,
    pub time_limit_seconds: Option<i32>,
}

#[derive(InputObject)]
pub struct StartGameInput {
    pub game_id: ID,
    /// Seating order; defaults to every member in join order.
    pub player_ids: Option<Vec<ID>>,
}

#[derive(InputObject, Clone)]
pub struct PlayerStatInput {
    pub player_id: ID,
    pub value: i32,
}

#[derive(InputObject)]
pub struct UpdateGameStatusInput {
    pub game_id: ID,
    pub match_id: Option<ID>,
    pub status: GameStatus,
    /// Hit deltas since the previous update.
    pub hits: Option<Vec<PlayerStatInput>>,
    /// Score deltas since the previous update.
    pub scores: Option<Vec<PlayerStatInput>>,
}

impl UpdateGameStatusInput {
    pub fn rally_stats(&self) -> async_graphql::Result<RallyStats> {
        fn collect(
            entries: &Option<Vec<PlayerStatInput>>,
        ) -> async_graphql::Result<BTreeMap<Uuid, i32>> {
            let mut out = BTreeMap::new();
            for entry in entries.iter().flatten() {
                *out.entry(parse_id(&entry.player_id, "player")?).or_insert(0) += entry.value;
            }
            Ok(out)
        }

        Ok(RallyStats {
            hits: collect(&self.hits)?,
            scores: collect(&self.scores)?,
        })
    }
}

#[derive(InputObject)]
pub struct UpdateGameSettingsInput {
    pub game_id: ID,
    pub visibility: Option<Visibility>,
    pub num_games: Option<i32>,
    pub num_matches: Option<i32>,
    pub max_score: Option<i32>,
    pub ball_speed: Option<i32>,
    pub time_limit_seconds: Option<i32>,
}

#[derive(SimpleObject)]
pub struct StartGameResponse {
    pub game: Game,
    pub players: Vec<GamePlayer>,
    pub current_match: Match,
}

#[derive(SimpleObject)]
pub struct GameStatusUpdate {
    pub game: Game,
    pub current_match: Option<Match>,
    pub scores: Vec<MatchScore>,
}

#[derive(SimpleObject)]
pub struct GameInviteResponse {
    pub invite: GameInvite,
    /// Set when accepting the invite joined the game.
    pub player: Option<GamePlayer>,
}

#[derive(SimpleObject, Clone)]
pub struct PlayerScore {
    pub player_id: ID,
    pub score: i32,
    pub hits: i32,
}

#[derive(SimpleObject, Clone)]
pub struct MatchBreakdown {
    pub match_id: ID,
    pub number: i32,
    pub completed: bool,
    pub winner_id: Option<ID>,
    pub scores: Vec<PlayerScore>,
}

#[derive(SimpleObject, Clone)]
pub struct PlayerTotals {
    pub player_id: ID,
    pub paddle_side: Option<PaddleSide>,
    pub score: i32,
    pub hits: i32,
    pub set_wins: i32,
}

#[derive(SimpleObject, Clone)]
pub struct SideTotals {
    pub side: PaddleSide,
    pub score: i32,
    pub hits: i32,
    pub set_wins: i32,
}

#[derive(SimpleObject)]
pub struct GameSummary {
    pub game: Game,
    pub settings: GameSettings,
    pub players: Vec<GamePlayer>,
    pub totals: Vec<PlayerTotals>,
    pub sides: Vec<SideTotals>,
    pub matches: Vec<MatchBreakdown>,
    pub sets_to_win: i32,
    pub leader_id: Option<ID>,
}

fn player_score(score: &ledger::PlayerScore) -> PlayerScore {
    PlayerScore {
        player_id: to_id(score.player_id),
        score: score.score,
        hits: score.hits,
    }
}

impl From<GameSummaryData> for GameSummary {
    fn from(data: GameSummaryData) -> Self {
        let LedgerSummary {
            players: lines,
            sides,
            matches,
            leader,
        } = data.ledger;

        Self {
            sets_to_win: data.settings.num_games,
            game: data.game.into(),
            settings: data.settings.into(),
            players: data.players.into_iter().map(Into::into).collect(),
            totals: lines
                .into_iter()
                .map(|line| PlayerTotals {
                    player_id: to_id(line.player_id),
                    paddle_side: line.side.map(Into::into),
                    score: line.score,
                    hits: line.hits,
                    set_wins: line.set_wins,
                })
                .collect(),
            sides: sides
                .into_iter()
                .map(|side| SideTotals {
                    side: side.side.into(),
                    score: side.score,
                    hits: side.hits,
                    set_wins: side.set_wins,
                })
                .collect(),
            matches: matches
                .into_iter()
                .map(|m| MatchBreakdown {
                    match_id: to_id(m.match_id),
                    number: m.number,
                    completed: m.completed,
                    winner_id: m.winner_id.map(to_id),
                    scores: m.scores.iter().map(player_score).collect(),
                })
                .collect(),
            leader_id: leader.map(to_id),
        }
    }
}
