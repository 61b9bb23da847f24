//! Transactional persistence of entity graphs.
//!
//! Functions taking a [`Connection`] own their transaction: they begin it, commit it on success
//! and roll it back on failure. The `*_in` variants take any [`Executor`], for example a
//! transaction the caller already started, and only participate in it.

mod delete;
mod insert;
mod select;
mod update;

pub use delete::*;
pub use insert::*;
pub use select::*;
pub use update::*;

use crate::{
    Driver, EntityMap, Error, Executor, Query, Result, RowLabeled, RowsAffected, Statement,
    Transaction, stream::TryStreamExt, truncate_long,
};
use std::pin::pin;

/// Commit on success, roll back on failure. A failing rollback is logged and the original
/// error returned.
pub(crate) async fn finish<'c, T, R>(transaction: T, result: Result<R>) -> Result<R>
where
    T: Transaction<'c>,
{
    match result {
        Ok(value) => {
            transaction.commit().await?;
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback) = transaction.rollback().await {
                log::error!("Rollback failed, the original error follows: {:#}", rollback);
            }
            Err(error)
        }
    }
}

fn with_query_context(error: Error, sql: &str) -> Error {
    let error = error.context(format!(
        "While executing the query:\n{}",
        truncate_long!(sql)
    ));
    log::error!("{:#}", error);
    error
}

pub(crate) fn render<X: Executor>(executor: &X, statement: &Statement) -> Query {
    let query = executor.driver().sql_writer().render(statement);
    log::debug!("{}", query);
    query
}

pub(crate) async fn execute_query<X: Executor>(
    executor: &mut X,
    query: Query,
) -> Result<RowsAffected> {
    let sql = query.sql.clone();
    executor
        .execute(query)
        .await
        .map_err(|e| with_query_context(e, &sql))
}

pub(crate) async fn fetch_query<X: Executor>(
    executor: &mut X,
    query: Query,
) -> Result<Vec<RowLabeled>> {
    let sql = query.sql.clone();
    let stream = pin!(executor.fetch(query));
    stream
        .try_collect()
        .await
        .map_err(|e| with_query_context(e, &sql))
}

pub(crate) async fn execute<X: Executor>(
    executor: &mut X,
    statement: &Statement,
) -> Result<RowsAffected> {
    let query = render(executor, statement);
    execute_query(executor, query).await
}

/// Single row statements must touch exactly one row.
pub(crate) fn expect_one(affected: RowsAffected, map: &EntityMap, action: &str) -> Result<()> {
    if affected.rows_affected != 1 {
        let error = Error::msg(format!(
            "Expected to {} exactly one row of `{}`, {} rows affected",
            action, map.table.name, affected.rows_affected
        ));
        log::error!("{}", error);
        return Err(error);
    }
    Ok(())
}
