pub mod game_players;
pub mod games;
pub mod invites;
pub mod matches;
pub mod tournament_games;
pub mod tournament_players;
pub mod tournaments;
pub mod users;

pub use games::{
    CreateGameSettings, GameMode, GameStatus, PaddleLocation, PaddleSide, UpdateGameSettings,
    Visibility,
};
pub use invites::InviteStatus;
pub use tournament_games::{BracketStatus, CreateBracketSlot};
pub use tournaments::{CreateTournamentSettings, TournamentStatus};
pub use users::AI_PLAYER_ID;
