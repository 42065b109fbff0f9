use sqlx::{PgPool, Postgres, Transaction};

pub type Db = PgPool;

pub type Tx = Transaction<'static, Postgres>;

/// Finish a transaction according to the outcome of the work done inside it.
///
/// `Ok` commits. `Err` issues an explicit rollback and hands the original error back, so the
/// caller observes the pre-call state whenever it observes an error.
pub async fn settle<T, E>(tx: Tx, result: Result<T, E>) -> Result<T, E>
where
    E: From<sqlx::Error>,
{
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                // The connection drops the transaction anyway; keep the original error.
                tracing::error!("Rollback failed: {rollback_err}");
            }
            Err(err)
        }
    }
}
