use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::{AuthConfig, JwtService};
use crate::services::{ChatRooms, NotificationHub};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub notifications: NotificationHub,
    pub chat: Arc<dyn ChatRooms>,
    jwt_service: JwtService,
}

impl AppState {
    pub fn from_parts(db: PgPool, auth_config: &AuthConfig, chat: Arc<dyn ChatRooms>) -> Self {
        Self {
            db,
            notifications: NotificationHub::default(),
            chat,
            jwt_service: JwtService::new(auth_config),
        }
    }

    pub fn jwt_service(&self) -> &JwtService {
        &self.jwt_service
    }
}
