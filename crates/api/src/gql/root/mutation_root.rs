use async_graphql::MergedObject;

use crate::gql::domains::games::GameMutation;
use crate::gql::domains::tournaments::TournamentMutation;

#[derive(MergedObject, Default)]
pub struct MutationRoot(GameMutation, TournamentMutation);
