use async_graphql::ID;
use uuid::Uuid;

use crate::gql::error::ResultExt;

pub fn to_id(id: Uuid) -> ID {
    ID::from(id.to_string())
}

/// Parse a GraphQL id, naming what it was supposed to identify on failure.
pub fn parse_id(id: &ID, what: &str) -> async_graphql::Result<Uuid> {
    Uuid::parse_str(id.as_str()).gql_err(&format!("Invalid {what} ID"))
}

pub fn parse_ids(ids: &[ID], what: &str) -> async_graphql::Result<Vec<Uuid>> {
    ids.iter().map(|id| parse_id(id, what)).collect()
}
