use crate::{
    Connection, Entity, Error, Executor, Record, Related, RelatedMut, RelationDef, RelationKind,
    Result, Statement,
    persist::{execute, expect_one, finish, insert::insert_record},
    statement,
};
use futures::{FutureExt, future::LocalBoxFuture};

/// Update `entity` and the relations named in `includes`, in its own transaction.
///
/// Included single references are inserted when new, updated otherwise, and their key is
/// written in the foreign key of `entity`. Included collections are reconciled: new items are
/// inserted, existing items updated and the rows no longer in the collection deleted. Relations
/// not included are left untouched.
pub async fn update<C: Connection, E: Entity>(
    connection: &mut C,
    entity: &mut E,
    includes: &[&str],
) -> Result<()> {
    let mut transaction = connection.begin().await?;
    let result = update_in(&mut transaction, entity, includes).await;
    finish(transaction, result).await
}

/// Update only the columns of `fields`, plus the auto timestamp column.
pub async fn update_fields<C: Connection, E: Entity>(
    connection: &mut C,
    entity: &mut E,
    fields: &[&str],
) -> Result<()> {
    let mut transaction = connection.begin().await?;
    let result = update_fields_in(&mut transaction, entity, fields).await;
    finish(transaction, result).await
}

pub async fn update_in<X: Executor, E: Entity>(
    executor: &mut X,
    entity: &mut E,
    includes: &[&str],
) -> Result<()> {
    update_record(executor, entity, includes, None).await
}

pub async fn update_fields_in<X: Executor, E: Entity>(
    executor: &mut X,
    entity: &mut E,
    fields: &[&str],
) -> Result<()> {
    update_record(executor, entity, &[], Some(fields)).await
}

fn included<'r>(
    relations: &'r [RelationDef],
    includes: &[&str],
    kind: RelationKind,
) -> impl Iterator<Item = &'r RelationDef> {
    relations
        .iter()
        .filter(move |v| v.kind == kind && includes.contains(&v.property))
}

/// Insert `record` when its key is empty, update it otherwise. A row made only of keys and
/// not updatable columns has nothing to write.
fn save_record<'a, X: Executor>(
    executor: &'a mut X,
    record: &'a mut dyn Record,
) -> LocalBoxFuture<'a, Result<()>> {
    async move {
        let map = record.entity_map()?;
        if map.has_empty_key(record)? {
            insert_record(executor, record, false).await
        } else if map.columns.iter().any(|v| !v.key && v.updatable) {
            update_record(executor, record, &[], None).await
        } else {
            Ok(())
        }
    }
    .boxed_local()
}

pub(crate) fn update_record<'a, X: Executor>(
    executor: &'a mut X,
    record: &'a mut dyn Record,
    includes: &'a [&'a str],
    fields: Option<&'a [&'a str]>,
) -> LocalBoxFuture<'a, Result<()>> {
    async move {
        let map = record.entity_map()?;
        for include in includes {
            if map.relation(include).is_none() {
                let error = Error::msg(format!(
                    "Table `{}` has no relation named `{}`",
                    map.table.name, include
                ));
                log::error!("{}", error);
                return Err(error);
            }
        }
        for relation in included(&map.relations, includes, RelationKind::ManyToOne) {
            let target = relation.target()?;
            let key = match record.related_mut(relation.property) {
                RelatedMut::One(Some(child)) => {
                    save_record(&mut *executor, &mut *child)
                        .await
                        .map_err(|e| {
                            e.context(format!(
                                "While saving `{}` referenced by `{}`",
                                relation.property, map.table.name
                            ))
                        })?;
                    target.read(&*child, relation.foreign_key)?
                }
                _ => continue,
            };
            record.set_field(relation.local_key, key)?;
        }
        let statement = match fields {
            Some(fields) => statement::update_fields(map, record, fields)?,
            None => statement::update(map, record)?,
        };
        let affected = execute(&mut *executor, &Statement::Update(statement)).await?;
        expect_one(affected, map, "update")?;
        for relation in included(&map.relations, includes, RelationKind::OneToMany) {
            let key = map.read(record, relation.local_key)?;
            if let RelatedMut::Many(children) = record.related_mut(relation.property) {
                for (i, child) in children.into_iter().enumerate() {
                    child.set_field(relation.foreign_key, key.clone())?;
                    save_record(&mut *executor, child)
                        .await
                        .map_err(|e| {
                            e.context(format!(
                                "While saving item {} of `{}` in `{}`",
                                i, relation.property, map.table.name
                            ))
                        })?;
                }
            }
            let keep = match record.related(relation.property) {
                Related::Many(children) => children,
                _ => Vec::new(),
            };
            let statement = statement::delete_orphans(relation, key, &keep)?;
            let affected = execute(&mut *executor, &statement).await?;
            log::debug!(
                "Removed {} rows no longer in `{}` of `{}`",
                affected.rows_affected,
                relation.property,
                map.table.name
            );
        }
        Ok(())
    }
    .boxed_local()
}
