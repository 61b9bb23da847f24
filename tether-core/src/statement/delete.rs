use crate::{
    Assignment, EntityMap, Error, Fragment, Predicate, Record, RelationDef, RelationKind, Result,
    SqlFragment, Statement, TableRef, UpdateStatement, Value,
    statement::{compile_local, key_filter, now, write_equal},
    writer::Context,
};

#[derive(Debug, Clone)]
pub struct DeleteStatement {
    pub table: TableRef,
    pub filter: SqlFragment,
}

/// Remove the rows matching `filter`: an UPDATE flagging them when the table has a soft delete
/// column, a DELETE otherwise.
fn remove(map: &EntityMap, filter: SqlFragment, context: &mut Context) -> Result<Statement> {
    let Some(flag) = map.soft_delete_column() else {
        return Ok(DeleteStatement {
            table: map.table,
            filter,
        }
        .into());
    };
    // The filter was compiled first, its parameter names are already taken
    let mut set = vec![Assignment::new(context, flag, Value::Boolean(Some(true)))];
    if let Some(column) = map.auto_timestamp_column() {
        set.push(Assignment::new(
            context,
            column,
            Value::Timestamp(Some(now()?)),
        ));
    }
    Ok(UpdateStatement {
        table: map.table,
        set,
        filter,
    }
    .into())
}

/// Delete `record` by key. Soft deletable records are flagged and stamped in place as well.
pub fn delete(map: &EntityMap, record: &mut dyn Record) -> Result<Statement> {
    if map.has_empty_key(record)? {
        return Err(Error::msg(format!(
            "Cannot delete a row of `{}` without a key",
            map.table.name
        )));
    }
    let mut context = Context::new(Fragment::SqlDeleteFromWhere, false);
    let filter = key_filter(map, record, &mut context)?;
    let statement = remove(map, filter, &mut context)?;
    if let Statement::Update(update) = &statement {
        for assignment in &update.set {
            if let Some(column) = map.columns.iter().find(|v| v.name == assignment.column) {
                record.set_field(column.property, assignment.param.value.clone())?;
            }
        }
    }
    Ok(statement)
}

/// Delete every row matching `predicate`.
pub fn delete_where(map: &'static EntityMap, predicate: &Predicate) -> Result<Statement> {
    let mut context = Context::new(Fragment::SqlDeleteFromWhere, false);
    let filter = compile_local(predicate, map, &mut context)?;
    remove(map, filter, &mut context)
}

/// Delete the children of the `relation` collection owned by `parent_key` that are not in
/// `keep`.
pub fn delete_orphans(
    relation: &RelationDef,
    parent_key: Value,
    keep: &[&dyn Record],
) -> Result<Statement> {
    if relation.kind != RelationKind::OneToMany {
        return Err(Error::msg(format!(
            "Relation `{}` is not a collection",
            relation.property
        )));
    }
    let target = relation.target()?;
    target.require_keys()?;
    let foreign_key = target.column(relation.foreign_key).ok_or_else(|| {
        Error::msg(format!(
            "Table `{}` has no column for property `{}`",
            target.table.name, relation.foreign_key
        ))
    })?;
    let mut context = Context::new(Fragment::SqlDeleteFromWhere, false);
    let mut filter = SqlFragment::new();
    write_equal(&mut filter, target, foreign_key, parent_key, &mut context);
    if let [key] = target.keys.as_slice() {
        let column = &target.columns[*key];
        if !keep.is_empty() {
            filter.push_text(" AND ");
            filter.push_column(crate::ColumnToken {
                relation: None,
                table: target.table.name.into(),
                column: column.name,
            });
            filter.push_text(" NOT IN (");
            for (i, record) in keep.iter().enumerate() {
                if i > 0 {
                    filter.push_text(", ");
                }
                filter.push_param(crate::Param {
                    name: context.param_name(column.name),
                    value: target.read(*record, column.property)?,
                });
            }
            filter.push_text(")");
        }
    } else {
        for record in keep {
            filter.push_text(" AND NOT (");
            filter.append(key_filter(target, *record, &mut context)?);
            filter.push_text(")");
        }
    }
    remove(target, filter, &mut context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ColumnDeclaration, Entity, EntityDeclaration, entity_map};

    #[derive(Default, Debug)]
    struct Note {
        id: i32,
        text: String,
    }
    crate::record!(Note { fields: [id, text] });
    impl Entity for Note {
        fn declare() -> EntityDeclaration {
            EntityDeclaration::new()
                .table("notes")
                .column(ColumnDeclaration::new("id").key())
                .column("text")
        }
    }

    #[test]
    fn hard_delete_by_key() {
        let map = entity_map::<Note>().unwrap();
        let mut note = Note {
            id: 4,
            text: "x".into(),
        };
        let Statement::Delete(statement) = delete(map, &mut note).unwrap() else {
            panic!("Expected a DELETE");
        };
        assert_eq!(statement.table.name, "notes");
        let params = statement.filter.params().collect::<Vec<_>>();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].name, "id_0");
        assert_eq!(params[0].value, Value::Int32(Some(4)));
    }
}
