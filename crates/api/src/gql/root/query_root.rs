use async_graphql::MergedObject;

use crate::gql::domains::games::GameQuery;
use crate::gql::domains::tournaments::TournamentQuery;

#[derive(MergedObject, Default)]
pub struct QueryRoot(GameQuery, TournamentQuery);
