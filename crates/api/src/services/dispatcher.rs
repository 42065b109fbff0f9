use std::collections::VecDeque;

use infra::repos::{tournament_players, tournaments, TournamentStatus, Visibility};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::gql::domains::tournaments::service as bracket_service;
use crate::services::notification_service::{Notification, NotificationKind, Notifier};
use crate::state::AppState;

/// Something a workflow wants done once its transaction has committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    TurnReady {
        user_id: Uuid,
        game_id: Uuid,
        tournament_id: Option<Uuid>,
    },
    GameInvite {
        invite_id: Uuid,
        game_id: Uuid,
        inviter_id: Uuid,
        invitee_id: Uuid,
    },
    TournamentInvite {
        invite_id: Uuid,
        tournament_id: Uuid,
        inviter_id: Uuid,
        invitee_id: Uuid,
    },
    TournamentUpdate {
        tournament_id: Uuid,
        status: TournamentStatus,
        round: Option<i32>,
        winner_id: Option<Uuid>,
    },
    /// Domain event: a game reached `finished`.
    GameFinished { game_id: Uuid },
    ProvisionChatRoom {
        tournament_id: Uuid,
        name: String,
        visibility: Visibility,
        creator_id: Uuid,
    },
    JoinTournamentChat { tournament_id: Uuid, user_id: Uuid },
}

/// The committed result of a workflow plus the effects it still owes.
#[derive(Debug)]
pub struct Outcome<T> {
    pub value: T,
    pub effects: Vec<Effect>,
}

impl<T> Outcome<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            effects: Vec::new(),
        }
    }

    pub fn with_effects(value: T, effects: Vec<Effect>) -> Self {
        Self { value, effects }
    }
}

pub enum Delivery {
    User(Uuid, Notification),
    Broadcast(Notification),
}

impl Effect {
    /// The push message this effect turns into, if any.
    pub fn delivery(&self) -> Option<Delivery> {
        match self {
            Effect::TurnReady {
                user_id,
                game_id,
                tournament_id,
            } => {
                let mut notification = Notification::new(
                    NotificationKind::TurnReady,
                    "Your game is ready",
                    "Your opponent is waiting for you",
                )
                .for_user(*user_id)
                .with_game(*game_id);
                if let Some(tournament_id) = tournament_id {
                    notification = notification.with_tournament(*tournament_id);
                }
                Some(Delivery::User(*user_id, notification))
            }
            Effect::GameInvite {
                game_id,
                invitee_id,
                ..
            } => Some(Delivery::User(
                *invitee_id,
                Notification::new(
                    NotificationKind::GameInvite,
                    "Game invitation",
                    "You have been invited to a game",
                )
                .for_user(*invitee_id)
                .with_game(*game_id),
            )),
            Effect::TournamentInvite {
                tournament_id,
                invitee_id,
                ..
            } => Some(Delivery::User(
                *invitee_id,
                Notification::new(
                    NotificationKind::TournamentInvite,
                    "Tournament invitation",
                    "You have been invited to a tournament",
                )
                .for_user(*invitee_id)
                .with_tournament(*tournament_id),
            )),
            Effect::TournamentUpdate {
                tournament_id,
                status,
                round,
                winner_id,
            } => {
                let message = match (status, round, winner_id) {
                    (TournamentStatus::Finished, _, Some(winner)) => {
                        format!("Tournament finished, champion {winner}")
                    }
                    (_, Some(round), _) => format!("Tournament is {}, round {round}", status.as_str()),
                    _ => format!("Tournament is {}", status.as_str()),
                };
                Some(Delivery::Broadcast(
                    Notification::new(NotificationKind::TournamentUpdate, "Tournament update", message)
                        .with_tournament(*tournament_id),
                ))
            }
            Effect::GameFinished { .. }
            | Effect::ProvisionChatRoom { .. }
            | Effect::JoinTournamentChat { .. } => None,
        }
    }
}

/// Run post-commit effects on a background task.
pub fn spawn_dispatch(state: AppState, effects: Vec<Effect>) {
    if effects.is_empty() {
        return;
    }
    tokio::spawn(async move {
        dispatch(&state, effects).await;
    });
}

/// Drain the effect queue. Nothing here can undo the commit that produced the effects, so
/// every failure is logged and the queue moves on.
pub async fn dispatch(state: &AppState, effects: Vec<Effect>) {
    let mut queue: VecDeque<Effect> = effects.into();

    while let Some(effect) = queue.pop_front() {
        if let Some(delivery) = effect.delivery() {
            match delivery {
                Delivery::User(user_id, notification) => {
                    state.notifications.notify_user(user_id, notification)
                }
                Delivery::Broadcast(notification) => state.notifications.broadcast(notification),
            }
        }

        match effect {
            Effect::GameFinished { game_id } => {
                match bracket_service::on_game_finished(&state.db, game_id).await {
                    Ok(follow_ups) => queue.extend(follow_ups),
                    Err(e) => error!(game_id = %game_id, "Bracket advancement failed: {}", e),
                }
            }
            Effect::ProvisionChatRoom {
                tournament_id,
                name,
                visibility,
                creator_id,
            } => provision_chat_room(state, tournament_id, &name, visibility, creator_id).await,
            Effect::JoinTournamentChat {
                tournament_id,
                user_id,
            } => join_tournament_chat(state, tournament_id, user_id).await,
            Effect::TournamentUpdate {
                tournament_id,
                status: TournamentStatus::Finished,
                ..
            } => state.notifications.close_tournament(tournament_id),
            _ => {}
        }
    }
}

async fn provision_chat_room(
    state: &AppState,
    tournament_id: Uuid,
    name: &str,
    visibility: Visibility,
    creator_id: Uuid,
) {
    let room_id = match state.chat.create_group(name, visibility).await {
        Ok(room_id) => room_id,
        Err(e) => {
            warn!(tournament_id = %tournament_id, "Chat room creation failed: {}", e);
            return;
        }
    };

    match tournaments::set_chat_room(&state.db, tournament_id, room_id).await {
        Ok(1) => {}
        Ok(_) => {
            warn!(tournament_id = %tournament_id, "Tournament vanished before its chat room was attached");
            return;
        }
        Err(e) => {
            error!(tournament_id = %tournament_id, "Failed to store chat room: {}", e);
            return;
        }
    }

    // Players who enrolled before the room existed were skipped by their own join effect.
    let members: Vec<Uuid> = match tournament_players::list_by_tournament(&state.db, tournament_id).await {
        Ok(players) => players.into_iter().map(|p| p.player_id).collect(),
        Err(e) => {
            error!(tournament_id = %tournament_id, "Failed to list enrolled players: {}", e);
            vec![creator_id]
        }
    };

    for user_id in members {
        if let Err(e) = state.chat.join_group(room_id, user_id).await {
            warn!(tournament_id = %tournament_id, user_id = %user_id, "Chat join failed: {}", e);
        }
    }
}

async fn join_tournament_chat(state: &AppState, tournament_id: Uuid, user_id: Uuid) {
    let room_id = match tournaments::get_by_id(&state.db, tournament_id).await {
        Ok(Some(tournament)) => tournament.chat_room_id,
        Ok(None) => None,
        Err(e) => {
            error!(tournament_id = %tournament_id, "Failed to load tournament: {}", e);
            return;
        }
    };

    let Some(room_id) = room_id else {
        debug!(tournament_id = %tournament_id, "Tournament has no chat room yet");
        return;
    };

    if let Err(e) = state.chat.join_group(room_id, user_id).await {
        warn!(tournament_id = %tournament_id, user_id = %user_id, "Chat join failed: {}", e);
    }
}
