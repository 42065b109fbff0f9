#![allow(dead_code)]

use std::env;
use std::sync::Arc;

use api::auth::{AuthConfig, Claims};
use api::gql::AppSchema;
use api::services::{dispatch, Effect, LocalChatRooms};
use api::AppState;
use async_graphql::{Request, Variables};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

pub struct TestApp {
    pub state: AppState,
    pub chat: LocalChatRooms,
}

/// Connect to `TEST_DATABASE_URL` and apply the migrations. `None` (test skipped) when the
/// variable is not set.
pub async fn setup_test_db() -> Option<TestApp> {
    let Ok(database_url) = env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let auth_config = AuthConfig {
        jwt_secret: "test-secret".to_string(),
        access_token_expiration_minutes: 60,
    };
    let chat = LocalChatRooms::default();
    let state = AppState::from_parts(pool, &auth_config, Arc::new(chat.clone()));

    Some(TestApp { state, chat })
}

/// Insert a user with a unique name and return its id with matching JWT claims.
pub async fn create_test_user(app_state: &AppState, prefix: &str) -> (Uuid, Claims) {
    let username = format!("{prefix}_{}", Uuid::new_v4().simple());
    let user = infra::repos::users::create(&app_state.db, &username)
        .await
        .expect("Failed to create test user");

    let claims = Claims::new(user.id, username, 60);
    (user.id, claims)
}

pub async fn create_test_users(app_state: &AppState, prefix: &str, n: usize) -> Vec<Uuid> {
    let mut ids = Vec::with_capacity(n);
    for i in 0..n {
        let (id, _) = create_test_user(app_state, &format!("{prefix}{i}")).await;
        ids.push(id);
    }
    ids
}

/// Run post-commit effects inline so assertions see their results.
pub async fn settle_effects(app_state: &AppState, effects: Vec<Effect>) {
    dispatch(app_state, effects).await;
}

/// Helper function to execute GraphQL queries and mutations
pub async fn execute_graphql(
    schema: &AppSchema,
    query: &str,
    variables: Option<Variables>,
    auth_claims: Option<Claims>,
) -> async_graphql::Response {
    let mut request = Request::new(query);

    if let Some(vars) = variables {
        request = request.variables(vars);
    }

    if let Some(claims) = auth_claims {
        request = request.data(claims);
    }

    schema.execute(request).await
}
