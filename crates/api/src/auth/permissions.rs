use crate::auth::Claims;
use async_graphql::{Context, Error, Result};
use uuid::Uuid;

/// Id of the authenticated caller, taken from the verified JWT claims.
pub fn require_user_id(ctx: &Context<'_>) -> Result<Uuid> {
    let claims = ctx
        .data::<Claims>()
        .map_err(|_| Error::new("You must be logged in to perform this action"))?;

    claims
        .user_id()
        .map_err(|e| Error::new(format!("Invalid user ID: {}", e)))
}
