mod delete;
mod insert;
mod select;
mod table;
mod update;

pub use delete::*;
pub use insert::*;
pub use select::*;
pub use table::*;
pub use update::*;

use crate::{
    ColumnDef, EntityMap, Param, Predicate, Result, SqlFragment, TableRef, Value, writer::Context,
};
use time::{OffsetDateTime, PrimitiveDateTime};

/// `column = :param` pair of an INSERT or UPDATE.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: &'static str,
    pub param: Param,
}

impl Assignment {
    pub(crate) fn new(context: &mut Context, column: &ColumnDef, value: Value) -> Self {
        Self {
            column: column.name,
            param: Param {
                name: context.param_name(column.name),
                value,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub enum Statement {
    Select(SelectStatement),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    CreateTable(CreateTableStatement),
    DropTable(DropTableStatement),
}

impl Statement {
    pub fn table(&self) -> &TableRef {
        match self {
            Statement::Select(v) => &v.table,
            Statement::Insert(v) => &v.table,
            Statement::Update(v) => &v.table,
            Statement::Delete(v) => &v.table,
            Statement::CreateTable(v) => &v.map.table,
            Statement::DropTable(v) => &v.table,
        }
    }
}

macro_rules! impl_from_statement {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(impl From<$ty> for Statement {
            fn from(value: $ty) -> Self {
                Statement::$variant(value)
            }
        })*
    };
}

impl_from_statement!(
    Select(SelectStatement),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    CreateTable(CreateTableStatement),
    DropTable(DropTableStatement),
);

/// Filter on the primary key: `key == id`, the auto generated key when the entity has one.
pub fn by_id(map: &EntityMap, id: impl crate::AsValue) -> Result<Predicate> {
    map.require_keys()?;
    let column = match (map.auto_key_column(), map.keys.as_slice()) {
        (Some(column), _) => column,
        (None, [key]) => &map.columns[*key],
        _ => {
            return Err(crate::Error::msg(format!(
                "Table `{}` has a composite key and cannot be looked up by a single id",
                map.table.name
            )));
        }
    };
    Ok(crate::prop(column.property).eq(id))
}

/// Current time truncated to microseconds, the precision every supported backend stores.
pub(crate) fn now() -> Result<PrimitiveDateTime> {
    let now = OffsetDateTime::now_utc();
    let time = now.time().replace_microsecond(now.microsecond())?;
    Ok(PrimitiveDateTime::new(now.date(), time))
}

/// Assign the auto timestamp column of `record`, if any, returning the value written.
pub(crate) fn stamp(
    map: &EntityMap,
    record: &mut dyn crate::Record,
) -> Result<Option<(&'static str, Value)>> {
    let Some(column) = map.auto_timestamp_column() else {
        return Ok(None);
    };
    let value = Value::Timestamp(Some(now()?));
    record.set_field(column.property, value.clone())?;
    Ok(Some((column.property, value)))
}

/// `WHERE` fragment matching the key of `record`.
pub(crate) fn key_filter(
    map: &EntityMap,
    record: &dyn crate::Record,
    context: &mut Context,
) -> Result<SqlFragment> {
    map.require_keys()?;
    let mut out = SqlFragment::new();
    for (i, column) in map.key_columns().enumerate() {
        if i > 0 {
            out.push_text(" AND ");
        }
        write_equal(&mut out, map, column, map.read(record, column.property)?, context);
    }
    Ok(out)
}

pub(crate) fn write_equal(
    out: &mut SqlFragment,
    map: &EntityMap,
    column: &ColumnDef,
    value: Value,
    context: &mut Context,
) {
    out.push_column(crate::ColumnToken {
        relation: None,
        table: map.table.name.into(),
        column: column.name,
    });
    out.push_text(" = ");
    out.push_param(Param {
        name: context.param_name(column.name),
        value,
    });
}

/// `(deleted IS NULL OR deleted = false)` over the table or alias `table`.
pub(crate) fn not_deleted(
    map: &EntityMap,
    table: &str,
    context: &mut Context,
) -> Option<SqlFragment> {
    let column = map.soft_delete_column()?;
    let token = crate::ColumnToken {
        relation: None,
        table: table.into(),
        column: column.name,
    };
    let mut out = SqlFragment::text("(");
    out.push_column(token.clone());
    out.push_text(" IS NULL OR ");
    out.push_column(token);
    out.push_text(" = ");
    out.push_param(Param {
        name: context.param_name(column.name),
        value: Value::Boolean(Some(false)),
    });
    out.push_text(")");
    Some(out)
}

/// Compile a predicate that may only reference the table itself.
pub(crate) fn compile_local(
    predicate: &Predicate,
    map: &'static EntityMap,
    context: &mut Context,
) -> Result<SqlFragment> {
    let fragment = crate::compile(predicate, map, context)?;
    if let Some(relation) = fragment.relations().next() {
        return Err(crate::Error::msg(format!(
            "Relation `{}` of `{}` can be filtered only in a select including it",
            relation, map.table.name
        )));
    }
    Ok(fragment)
}
