pub mod chat_service;
pub mod dispatcher;
pub mod notification_service;

pub use chat_service::{ChatConfig, ChatRooms, HttpChatRooms, LocalChatRooms};
pub use dispatcher::{dispatch, spawn_dispatch, Effect, Outcome};
pub use notification_service::{Notification, NotificationHub, NotificationKind, Notifier};
