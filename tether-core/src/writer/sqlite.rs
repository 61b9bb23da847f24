use crate::{Dialect, Param, Query, SqlWriter, Value, writer::Context};

#[derive(Default, Debug, Clone, Copy)]
pub struct SqliteSqlWriter {}

impl SqlWriter for SqliteSqlWriter {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn write_param_placeholder(&self, _context: &mut Context, out: &mut String, param: &Param) {
        out.push(':');
        out.push_str(&param.name);
    }

    fn write_column_type(&self, _context: &mut Context, out: &mut String, value: &Value) {
        match value {
            Value::Boolean(..) => out.push_str("INTEGER"),
            Value::Int32(..) => out.push_str("INTEGER"),
            Value::Int64(..) => out.push_str("INTEGER"),
            Value::Float64(..) => out.push_str("REAL"),
            Value::Varchar(..) => out.push_str("TEXT"),
            Value::Blob(..) => out.push_str("BLOB"),
            Value::Timestamp(..) => out.push_str("TEXT"),
            Value::Uuid(..) => out.push_str("TEXT"),
            Value::Null => log::error!("Cannot derive a column type from an untyped NULL"),
        }
    }

    fn write_auto_increment_column(&self, _context: &mut Context, out: &mut String) {
        out.push_str(" INTEGER PRIMARY KEY AUTOINCREMENT");
    }

    fn write_insert_returning(
        &self,
        _context: &mut Context,
        _out: &mut String,
        _statement: &crate::InsertStatement,
    ) {
    }

    fn generated_key_query(&self) -> Option<Query> {
        Some("SELECT last_insert_rowid();".into())
    }
}
