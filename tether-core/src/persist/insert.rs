use crate::{
    Connection, Driver, Entity, Error, Executor, Record, RelatedMut, RelationKind, Result,
    Statement, Value, is_key_empty,
    persist::{execute, execute_query, fetch_query, finish, render},
    statement,
};
use futures::{FutureExt, future::LocalBoxFuture};

/// Insert `entity` and the new entities it references, in its own transaction.
pub async fn insert<C: Connection, E: Entity>(connection: &mut C, entity: &mut E) -> Result<()> {
    let mut transaction = connection.begin().await?;
    let result = insert_in(&mut transaction, entity).await;
    finish(transaction, result).await
}

/// Like [`insert`] but the entity is inserted even if its key is already populated.
pub async fn insert_forced<C: Connection, E: Entity>(
    connection: &mut C,
    entity: &mut E,
) -> Result<()> {
    let mut transaction = connection.begin().await?;
    let result = insert_forced_in(&mut transaction, entity).await;
    finish(transaction, result).await
}

pub async fn insert_in<X: Executor, E: Entity>(executor: &mut X, entity: &mut E) -> Result<()> {
    insert_record(executor, entity, false).await
}

pub async fn insert_forced_in<X: Executor, E: Entity>(
    executor: &mut X,
    entity: &mut E,
) -> Result<()> {
    insert_record(executor, entity, true).await
}

/// Cascading insert.
///
/// 1. New many to one targets are inserted first and their key copied into the foreign key.
/// 2. The record itself is inserted and a database generated key read back.
/// 3. New one to many children get the key of the record before being inserted, so a required
///    reference back to the parent is already satisfied when they are reached.
///
/// A required foreign key still empty after step 1 is an error. A record whose key is already
/// populated is left untouched unless `forced`.
pub(crate) fn insert_record<'a, X: Executor>(
    executor: &'a mut X,
    record: &'a mut dyn Record,
    forced: bool,
) -> LocalBoxFuture<'a, Result<()>> {
    async move {
        let map = record.entity_map()?;
        if !forced && !map.keys.is_empty() && !map.has_empty_key(record)? {
            return Ok(());
        }
        for relation in map
            .relations
            .iter()
            .filter(|v| v.kind == RelationKind::ManyToOne)
        {
            let target = relation.target()?;
            let key = match record.related_mut(relation.property) {
                RelatedMut::One(Some(child)) => {
                    if target.has_empty_key(&*child)? {
                        insert_record(&mut *executor, &mut *child, false)
                            .await
                            .map_err(|e| {
                                e.context(format!(
                                    "While inserting `{}` referenced by `{}`",
                                    relation.property, map.table.name
                                ))
                            })?;
                    }
                    Some(target.read(&*child, relation.foreign_key)?)
                }
                _ => None,
            };
            if let Some(key) = key {
                record.set_field(relation.local_key, key)?;
                continue;
            }
            if relation.nullable || !is_key_empty(&map.read(record, relation.local_key)?) {
                continue;
            }
            let error = Error::msg(format!(
                "Required relation `{}` of `{}` is not set",
                relation.property, map.table.name
            ));
            log::error!("{}", error);
            return Err(error);
        }
        let Some(statement) = statement::insert(map, record, forced)? else {
            return Ok(());
        };
        let generated_key = statement.generated_key.clone();
        let statement = Statement::Insert(statement);
        if let Some(generated_key) = generated_key {
            let value = insert_returning_key(&mut *executor, &statement).await?;
            record.set_field(generated_key.property, value)?;
        } else {
            execute(&mut *executor, &statement).await?;
        }
        for relation in map
            .relations
            .iter()
            .filter(|v| v.kind == RelationKind::OneToMany)
        {
            let target = relation.target()?;
            let key = map.read(record, relation.local_key)?;
            let RelatedMut::Many(children) = record.related_mut(relation.property) else {
                continue;
            };
            for (i, child) in children.into_iter().enumerate() {
                if !target.has_empty_key(&*child)? {
                    continue;
                }
                child.set_field(relation.foreign_key, key.clone())?;
                insert_record(&mut *executor, child, false)
                    .await
                    .map_err(|e| {
                        e.context(format!(
                            "While inserting item {} of `{}` in `{}`",
                            i, relation.property, map.table.name
                        ))
                    })?;
            }
        }
        Ok(())
    }
    .boxed_local()
}

/// Run an insert whose key is generated by the database and return the key.
async fn insert_returning_key<X: Executor>(executor: &mut X, statement: &Statement) -> Result<Value> {
    let writer = executor.driver().sql_writer();
    let query = render(executor, statement);
    let rows = match writer.generated_key_query() {
        Some(follow_up) => {
            execute_query(executor, query).await?;
            fetch_query(executor, follow_up).await?
        }
        None => fetch_query(executor, query).await?,
    };
    rows.into_iter()
        .next()
        .and_then(|row| row.values.into_vec().into_iter().next())
        .filter(|v| !v.is_null())
        .ok_or_else(|| {
            let error = Error::msg(format!(
                "The insert into `{}` did not return the generated key",
                statement.table().name
            ));
            log::error!("{}", error);
            error
        })
}
