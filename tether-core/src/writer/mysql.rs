use crate::{Dialect, InsertStatement, Param, Query, SqlWriter, Value, writer::Context};

#[derive(Default, Debug, Clone, Copy)]
pub struct MySqlSqlWriter {}

impl SqlWriter for MySqlSqlWriter {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    fn write_identifier_quoted(&self, context: &mut Context, out: &mut String, value: &str) {
        out.push('`');
        self.write_escaped(context, out, value, '`', "``");
        out.push('`');
    }

    fn write_param_placeholder(&self, _context: &mut Context, out: &mut String, _param: &Param) {
        out.push('?');
    }

    fn write_column_type(&self, _context: &mut Context, out: &mut String, value: &Value) {
        match value {
            Value::Boolean(..) => out.push_str("BOOLEAN"),
            Value::Int32(..) => out.push_str("INTEGER"),
            Value::Int64(..) => out.push_str("BIGINT"),
            Value::Float64(..) => out.push_str("DOUBLE"),
            Value::Varchar(..) => out.push_str("VARCHAR(255)"),
            Value::Blob(..) => out.push_str("BLOB"),
            Value::Timestamp(..) => out.push_str("DATETIME(6)"),
            Value::Uuid(..) => out.push_str("CHAR(36)"),
            Value::Null => log::error!("Cannot derive a column type from an untyped NULL"),
        }
    }

    fn write_auto_increment_column(&self, _context: &mut Context, out: &mut String) {
        out.push_str(" INTEGER AUTO_INCREMENT PRIMARY KEY");
    }

    fn write_transaction_begin(&self, out: &mut String) {
        out.push_str("START TRANSACTION;");
    }

    fn write_insert_default_values(&self, _context: &mut Context, out: &mut String) {
        out.push_str(" () VALUES ()");
    }

    fn write_insert_returning(
        &self,
        _context: &mut Context,
        _out: &mut String,
        _statement: &InsertStatement,
    ) {
    }

    fn generated_key_query(&self) -> Option<Query> {
        Some("SELECT LAST_INSERT_ID();".into())
    }
}
