use async_graphql::ErrorExtensions;

use crate::error::OrchestrationError;

/// Orchestration failures reach clients with `extensions.code` set to their kind.
impl ErrorExtensions for OrchestrationError {
    fn extend(&self) -> async_graphql::Error {
        let message = match self {
            OrchestrationError::Db(e) => {
                tracing::error!("Database error: {e}");
                "Internal database error".to_string()
            }
            other => other.to_string(),
        };
        let code = self.kind().as_str();
        async_graphql::Error::new(message).extend_with(|_, ext| ext.set("code", code))
    }
}

/// Extension trait that converts any `Result<T, E>` where `E: Display`
/// into `async_graphql::Result<T>` with a contextual message prefix.
///
/// Usage: `Uuid::parse_str(id).gql_err("Invalid tournament ID")?`
pub trait ResultExt<T> {
    fn gql_err(self, context: &str) -> std::result::Result<T, async_graphql::Error>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for std::result::Result<T, E> {
    fn gql_err(self, context: &str) -> std::result::Result<T, async_graphql::Error> {
        self.map_err(|e| async_graphql::Error::new(format!("{context}: {e}")))
    }
}

/// `?`-friendly conversion of workflow results for resolvers.
pub trait OrchestrationResultExt<T> {
    fn into_gql(self) -> async_graphql::Result<T>;
}

impl<T> OrchestrationResultExt<T> for Result<T, OrchestrationError> {
    fn into_gql(self) -> async_graphql::Result<T> {
        self.map_err(|e| e.extend())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orchestration_errors_carry_their_kind() {
        let err = OrchestrationError::Full.extend();
        assert_eq!(err.message, "no seats left");

        let code = err.extensions.as_ref().and_then(|ext| ext.get("code")).cloned();
        assert_eq!(code, Some(async_graphql::Value::from("CAPACITY_EXCEEDED")));
    }

    #[test]
    fn database_details_stay_server_side() {
        let err = OrchestrationError::Db(sqlx::Error::RowNotFound).extend();
        assert_eq!(err.message, "Internal database error");
    }
}
