use crate::{
    Connection, Entity, Executor, Predicate, Result, RowsAffected, entity_map,
    persist::{execute, expect_one, finish},
    statement,
};

/// Delete `entity` by key in its own transaction. Soft deletable entities are flagged instead
/// of removed. Children are never deleted with their parent.
pub async fn delete<C: Connection, E: Entity>(connection: &mut C, entity: &mut E) -> Result<()> {
    let mut transaction = connection.begin().await?;
    let result = delete_in(&mut transaction, entity).await;
    finish(transaction, result).await
}

pub async fn delete_in<X: Executor, E: Entity>(executor: &mut X, entity: &mut E) -> Result<()> {
    let map = entity_map::<E>()?;
    let statement = statement::delete(map, entity)?;
    let affected = execute(executor, &statement).await?;
    expect_one(affected, map, "delete")
}

/// Delete every `E` matching `predicate`, in its own transaction.
pub async fn delete_where<E: Entity, C: Connection>(
    connection: &mut C,
    predicate: &Predicate,
) -> Result<RowsAffected> {
    let mut transaction = connection.begin().await?;
    let result = delete_where_in::<E, _>(&mut transaction, predicate).await;
    finish(transaction, result).await
}

pub async fn delete_where_in<E: Entity, X: Executor>(
    executor: &mut X,
    predicate: &Predicate,
) -> Result<RowsAffected> {
    let statement = statement::delete_where(entity_map::<E>()?, predicate)?;
    execute(executor, &statement).await
}
