use async_trait::async_trait;
use infra::repos::Visibility;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("API error (status {status}): {body}")]
    ApiError { status: u16, body: String },
    #[error("Unknown chat room: {0}")]
    UnknownRoom(Uuid),
}

/// Group chat rooms attached to tournaments.
#[async_trait]
pub trait ChatRooms: Send + Sync {
    async fn create_group(&self, name: &str, visibility: Visibility) -> Result<Uuid, ChatError>;
    async fn join_group(&self, room_id: Uuid, user_id: Uuid) -> Result<(), ChatError>;
}

#[derive(Clone)]
pub struct ChatConfig {
    pub base_url: String,
    pub api_token: String,
}

impl ChatConfig {
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("CHAT_SERVICE_URL").ok()?;
        let api_token = std::env::var("CHAT_SERVICE_TOKEN").ok()?;

        Some(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
        })
    }
}

/// Client for the chat service's room API.
#[derive(Clone)]
pub struct HttpChatRooms {
    config: ChatConfig,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct CreatedRoom {
    id: Uuid,
}

impl HttpChatRooms {
    pub fn new(config: ChatConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<reqwest::Response, ChatError> {
        let url = format!("{}{}", self.config.base_url, path);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ChatError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp)
    }
}

#[async_trait]
impl ChatRooms for HttpChatRooms {
    async fn create_group(&self, name: &str, visibility: Visibility) -> Result<Uuid, ChatError> {
        let visibility = match visibility {
            Visibility::Public => "public",
            Visibility::Private => "private",
        };
        let resp = self
            .post(
                "/rooms",
                json!({ "name": name, "kind": "group", "visibility": visibility }),
            )
            .await?;

        let room: CreatedRoom = resp
            .json()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        info!(room_id = %room.id, "Chat room created: {}", name);
        Ok(room.id)
    }

    async fn join_group(&self, room_id: Uuid, user_id: Uuid) -> Result<(), ChatError> {
        self.post(
            &format!("/rooms/{room_id}/members"),
            json!({ "user_id": user_id }),
        )
        .await?;
        Ok(())
    }
}

struct LocalRoom {
    name: String,
    members: HashSet<Uuid>,
}

/// In-process rooms, used when no chat service is configured.
#[derive(Clone, Default)]
pub struct LocalChatRooms {
    rooms: Arc<Mutex<HashMap<Uuid, LocalRoom>>>,
}

impl LocalChatRooms {
    pub fn members(&self, room_id: Uuid) -> Vec<Uuid> {
        let rooms = self.rooms.lock();
        let mut members: Vec<Uuid> = rooms
            .get(&room_id)
            .map(|room| room.members.iter().copied().collect())
            .unwrap_or_default();
        members.sort();
        members
    }

    pub fn room_name(&self, room_id: Uuid) -> Option<String> {
        self.rooms.lock().get(&room_id).map(|room| room.name.clone())
    }
}

#[async_trait]
impl ChatRooms for LocalChatRooms {
    async fn create_group(&self, name: &str, _visibility: Visibility) -> Result<Uuid, ChatError> {
        let id = Uuid::new_v4();
        self.rooms.lock().insert(
            id,
            LocalRoom {
                name: name.to_string(),
                members: HashSet::new(),
            },
        );
        Ok(id)
    }

    async fn join_group(&self, room_id: Uuid, user_id: Uuid) -> Result<(), ChatError> {
        let mut rooms = self.rooms.lock();
        let room = rooms.get_mut(&room_id).ok_or(ChatError::UnknownRoom(room_id))?;
        room.members.insert(user_id);
        Ok(())
    }
}
