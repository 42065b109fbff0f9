pub mod ledger;
pub mod resolvers;
pub mod service;
pub mod types;

pub use resolvers::{GameMutation, GameQuery};
