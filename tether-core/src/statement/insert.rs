use crate::{
    Assignment, EntityMap, Fragment, Record, Result, TableRef, Value, is_key_empty,
    statement::stamp, writer::Context,
};
use uuid::Uuid;

/// Column the database fills in, to be read back after the insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedKey {
    pub property: &'static str,
    pub column: &'static str,
}

#[derive(Debug, Clone)]
pub struct InsertStatement {
    pub table: TableRef,
    pub values: Vec<Assignment>,
    pub generated_key: Option<GeneratedKey>,
}

/// INSERT of `record`, `None` when its key is populated and the insert is not `forced`.
///
/// An empty auto generated `Uuid` key is assigned on the record, an empty auto generated `i32`
/// key is left out of the column list and reported in `generated_key`. The auto timestamp
/// column is stamped on the record.
pub fn insert(
    map: &EntityMap,
    record: &mut dyn Record,
    forced: bool,
) -> Result<Option<InsertStatement>> {
    if !map.keys.is_empty() && !map.has_empty_key(record)? && !forced {
        return Ok(None);
    }
    let mut generated_key = None;
    if let Some(column) = map.auto_key_column() {
        let value = map.read(record, column.property)?;
        if is_key_empty(&value) {
            match value {
                Value::Uuid(..) => {
                    record.set_field(column.property, Value::Uuid(Some(Uuid::new_v4())))?
                }
                _ => {
                    generated_key = Some(GeneratedKey {
                        property: column.property,
                        column: column.name,
                    })
                }
            }
        }
    }
    stamp(map, record)?;
    let mut context = Context::new(Fragment::SqlInsertIntoValues, false);
    let mut values = Vec::with_capacity(map.columns.len());
    for column in &map.columns {
        if generated_key
            .as_ref()
            .is_some_and(|v| v.property == column.property)
        {
            continue;
        }
        values.push(Assignment::new(
            &mut context,
            column,
            map.read(record, column.property)?,
        ));
    }
    Ok(Some(InsertStatement {
        table: map.table,
        values,
        generated_key,
    }))
}
