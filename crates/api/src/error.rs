use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use infra::repos::{GameStatus, TournamentStatus};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error")]
    Db(#[from] sqlx::Error),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Orchestration(#[from] OrchestrationError),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Orchestration(e) => e.kind().status_code(),
            AppError::Internal(_) | AppError::Db(_) | AppError::Anyhow(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Coarse classification callers map onto transport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    InvalidState,
    CapacityExceeded,
    InvalidBracketSize,
    ConstraintViolation,
    InvalidInput,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::InvalidState => "INVALID_STATE",
            ErrorKind::CapacityExceeded => "CAPACITY_EXCEEDED",
            ErrorKind::InvalidBracketSize => "INVALID_BRACKET_SIZE",
            ErrorKind::ConstraintViolation => "CONSTRAINT_VIOLATION",
            ErrorKind::InvalidInput => "INVALID_INPUT",
            ErrorKind::Internal => "INTERNAL",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
            ErrorKind::InvalidState | ErrorKind::CapacityExceeded => StatusCode::CONFLICT,
            ErrorKind::InvalidBracketSize => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::ConstraintViolation | ErrorKind::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Failures of the game and tournament workflows.
///
/// Whenever one of these is returned from a workflow, the transaction it ran in has already
/// been rolled back.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("game not found")]
    GameNotFound,

    #[error("tournament not found")]
    TournamentNotFound,

    #[error("match not found")]
    MatchNotFound,

    #[error("invite not found")]
    InviteNotFound,

    #[error("user not found")]
    UserNotFound,

    #[error("game settings are missing")]
    SettingsMissing,

    #[error("not allowed: {0}")]
    Unauthorized(String),

    #[error("game is not open for joining")]
    NotJoinable,

    #[error("game is not pending")]
    NotPending,

    #[error("an accepted invite is required to join")]
    NotInvited,

    #[error("no seats left")]
    Full,

    #[error("already joined")]
    AlreadyJoined,

    #[error("the creator cannot leave")]
    CreatorCannotLeave,

    #[error("cannot move from {from} to {to}")]
    InvalidTransition { from: &'static str, to: &'static str },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("bracket needs 4, 8 or 16 players, got {0}")]
    InvalidBracketSize(usize),

    #[error("failed to create {0}")]
    CreationFailed(&'static str),

    #[error("write did not apply: {0}")]
    ConstraintViolation(&'static str),

    #[error("database error")]
    Db(#[from] sqlx::Error),
}

impl OrchestrationError {
    pub fn kind(&self) -> ErrorKind {
        use OrchestrationError::*;
        match self {
            GameNotFound | TournamentNotFound | MatchNotFound | InviteNotFound | UserNotFound
            | SettingsMissing => ErrorKind::NotFound,
            Unauthorized(_) | NotInvited | CreatorCannotLeave => ErrorKind::Unauthorized,
            NotJoinable | NotPending | AlreadyJoined | InvalidTransition { .. }
            | InvalidState(_) => ErrorKind::InvalidState,
            Full => ErrorKind::CapacityExceeded,
            InvalidBracketSize(_) => ErrorKind::InvalidBracketSize,
            CreationFailed(_) | ConstraintViolation(_) => ErrorKind::ConstraintViolation,
            InvalidInput(_) => ErrorKind::InvalidInput,
            Db(_) => ErrorKind::Internal,
        }
    }

    pub fn game_transition(from: GameStatus, to: GameStatus) -> Self {
        OrchestrationError::InvalidTransition {
            from: from.as_str(),
            to: to.as_str(),
        }
    }

    pub fn tournament_transition(from: TournamentStatus, to: TournamentStatus) -> Self {
        OrchestrationError::InvalidTransition {
            from: from.as_str(),
            to: to.as_str(),
        }
    }
}

/// Require a write to have touched exactly one row.
pub fn expect_one(rows_affected: u64, what: &'static str) -> Result<(), OrchestrationError> {
    if rows_affected == 1 {
        Ok(())
    } else {
        Err(OrchestrationError::ConstraintViolation(what))
    }
}

pub type OrchestrationResult<T> = Result<T, OrchestrationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_the_taxonomy() {
        assert_eq!(OrchestrationError::GameNotFound.kind(), ErrorKind::NotFound);
        assert_eq!(OrchestrationError::SettingsMissing.kind(), ErrorKind::NotFound);
        assert_eq!(OrchestrationError::Full.kind(), ErrorKind::CapacityExceeded);
        assert_eq!(OrchestrationError::NotPending.kind(), ErrorKind::InvalidState);
        assert_eq!(
            OrchestrationError::InvalidBracketSize(6).kind(),
            ErrorKind::InvalidBracketSize
        );
        assert_eq!(
            OrchestrationError::CreationFailed("game").kind(),
            ErrorKind::ConstraintViolation
        );
        assert_eq!(
            OrchestrationError::CreatorCannotLeave.kind(),
            ErrorKind::Unauthorized
        );
    }

    #[test]
    fn transition_errors_name_both_states() {
        let err = OrchestrationError::game_transition(GameStatus::Finished, GameStatus::Active);
        assert_eq!(err.to_string(), "cannot move from finished to active");
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn expect_one_rejects_zero_and_many() {
        assert!(expect_one(1, "row").is_ok());
        assert!(matches!(
            expect_one(0, "row"),
            Err(OrchestrationError::ConstraintViolation("row"))
        ));
        assert!(expect_one(2, "row").is_err());
    }

    #[test]
    fn status_codes_per_kind() {
        assert_eq!(ErrorKind::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorKind::CapacityExceeded.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorKind::Internal.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
