use async_graphql::{Enum, SimpleObject, ID};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 100;

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum NotificationKind {
    TurnReady,
    GameInvite,
    TournamentInvite,
    TournamentUpdate,
}

#[derive(SimpleObject, Clone, Debug)]
pub struct Notification {
    pub id: ID,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub user_id: Option<ID>,
    pub game_id: Option<ID>,
    pub tournament_id: Option<ID>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(kind: NotificationKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: ID::from(Uuid::new_v4().to_string()),
            kind,
            title: title.into(),
            message: message.into(),
            user_id: None,
            game_id: None,
            tournament_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn for_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(ID::from(user_id.to_string()));
        self
    }

    pub fn with_game(mut self, game_id: Uuid) -> Self {
        self.game_id = Some(ID::from(game_id.to_string()));
        self
    }

    pub fn with_tournament(mut self, tournament_id: Uuid) -> Self {
        self.tournament_id = Some(ID::from(tournament_id.to_string()));
        self
    }

    fn tournament_uuid(&self) -> Option<Uuid> {
        self.tournament_id
            .as_ref()
            .and_then(|id| Uuid::parse_str(id.as_str()).ok())
    }
}

/// Push channel to connected clients. Delivery is best-effort.
pub trait Notifier: Send + Sync {
    fn notify_user(&self, user_id: Uuid, notification: Notification);
    fn broadcast(&self, notification: Notification);
}

struct Channels {
    users: HashMap<Uuid, broadcast::Sender<Notification>>,
    tournaments: HashMap<Uuid, broadcast::Sender<Notification>>,
    everyone: broadcast::Sender<Notification>,
}

impl Channels {
    fn user(&mut self, user_id: Uuid) -> &broadcast::Sender<Notification> {
        self.users
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
    }

    fn tournament(&mut self, tournament_id: Uuid) -> &broadcast::Sender<Notification> {
        self.tournaments
            .entry(tournament_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
    }
}

/// In-process fan-out behind the GraphQL subscriptions.
#[derive(Clone)]
pub struct NotificationHub {
    channels: Arc<Mutex<Channels>>,
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self {
            channels: Arc::new(Mutex::new(Channels {
                users: HashMap::new(),
                tournaments: HashMap::new(),
                everyone: broadcast::channel(CHANNEL_CAPACITY).0,
            })),
        }
    }
}

impl NotificationHub {
    pub fn subscribe_user(&self, user_id: Uuid) -> broadcast::Receiver<Notification> {
        self.channels.lock().user(user_id).subscribe()
    }

    pub fn subscribe_tournament(&self, tournament_id: Uuid) -> broadcast::Receiver<Notification> {
        self.channels.lock().tournament(tournament_id).subscribe()
    }

    pub fn subscribe_all(&self) -> broadcast::Receiver<Notification> {
        self.channels.lock().everyone.subscribe()
    }

    /// Drop the per-tournament channel once the tournament is over.
    pub fn close_tournament(&self, tournament_id: Uuid) {
        self.channels.lock().tournaments.remove(&tournament_id);
    }
}

impl Notifier for NotificationHub {
    fn notify_user(&self, user_id: Uuid, notification: Notification) {
        let mut channels = self.channels.lock();
        // No receiver just means the user is offline.
        if channels.user(user_id).send(notification).is_err() {
            tracing::debug!(user_id = %user_id, "No subscriber for user notification");
        }
    }

    fn broadcast(&self, notification: Notification) {
        let mut channels = self.channels.lock();
        if let Some(tournament_id) = notification.tournament_uuid() {
            let _ = channels.tournament(tournament_id).send(notification.clone());
        }
        let _ = channels.everyone.send(notification);
    }
}
