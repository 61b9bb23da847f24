use crate::{
    Assignment, EntityMap, Error, Fragment, Record, Result, SqlFragment, TableRef,
    statement::{key_filter, stamp},
    writer::Context,
};

#[derive(Debug, Clone)]
pub struct UpdateStatement {
    pub table: TableRef,
    pub set: Vec<Assignment>,
    pub filter: SqlFragment,
}

/// UPDATE of every updatable non key column of `record`, matched by key.
pub fn update(map: &EntityMap, record: &mut dyn Record) -> Result<UpdateStatement> {
    update_columns(map, record, None)
}

/// UPDATE restricted to the properties in `fields`, the auto timestamp column is always written.
pub fn update_fields(
    map: &EntityMap,
    record: &mut dyn Record,
    fields: &[&str],
) -> Result<UpdateStatement> {
    update_columns(map, record, Some(fields))
}

fn update_columns(
    map: &EntityMap,
    record: &mut dyn Record,
    fields: Option<&[&str]>,
) -> Result<UpdateStatement> {
    if map.has_empty_key(record)? {
        return Err(Error::msg(format!(
            "Cannot update a row of `{}` without a key",
            map.table.name
        )));
    }
    if let Some(fields) = fields {
        for field in fields {
            match map.column(field) {
                Some(column) if column.key || !column.updatable => {
                    return Err(Error::msg(format!(
                        "Property `{}` of `{}` is not updatable",
                        field, map.table.name
                    )));
                }
                Some(..) => {}
                None => {
                    return Err(Error::msg(format!(
                        "Table `{}` has no column for property `{}`",
                        map.table.name, field
                    )));
                }
            }
        }
    }
    let stamped = stamp(map, record)?.map(|(property, _)| property);
    let mut context = Context::new(Fragment::SqlUpdateSet, false);
    let mut set = Vec::new();
    for column in map.columns.iter().filter(|v| !v.key && v.updatable) {
        let included = match fields {
            None => true,
            Some(fields) => fields.contains(&column.property) || stamped == Some(column.property),
        };
        if included {
            set.push(Assignment::new(
                &mut context,
                column,
                map.read(record, column.property)?,
            ));
        }
    }
    if set.is_empty() {
        return Err(Error::msg(format!(
            "Nothing to update in `{}`",
            map.table.name
        )));
    }
    let filter = key_filter(
        map,
        record,
        &mut context.switch_fragment(Fragment::SqlUpdateWhere).current,
    )?;
    Ok(UpdateStatement {
        table: map.table,
        set,
        filter,
    })
}
