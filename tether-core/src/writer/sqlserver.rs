use crate::{
    CreateTableStatement, Dialect, InsertStatement, Param, SqlWriter, Value, writer::Context,
};
use std::fmt::Write;

#[derive(Default, Debug, Clone, Copy)]
pub struct SqlServerSqlWriter {}

impl SqlWriter for SqlServerSqlWriter {
    fn dialect(&self) -> Dialect {
        Dialect::SqlServer
    }

    fn write_identifier_quoted(&self, context: &mut Context, out: &mut String, value: &str) {
        out.push('[');
        self.write_escaped(context, out, value, ']', "]]");
        out.push(']');
    }

    fn write_param_placeholder(&self, _context: &mut Context, out: &mut String, param: &Param) {
        out.push('@');
        out.push_str(&param.name);
    }

    fn write_column_type(&self, _context: &mut Context, out: &mut String, value: &Value) {
        match value {
            Value::Boolean(..) => out.push_str("BIT"),
            Value::Int32(..) => out.push_str("INT"),
            Value::Int64(..) => out.push_str("BIGINT"),
            Value::Float64(..) => out.push_str("FLOAT"),
            Value::Varchar(..) => out.push_str("NVARCHAR(255)"),
            Value::Blob(..) => out.push_str("VARBINARY(MAX)"),
            Value::Timestamp(..) => out.push_str("DATETIME2"),
            Value::Uuid(..) => out.push_str("UNIQUEIDENTIFIER"),
            Value::Null => log::error!("Cannot derive a column type from an untyped NULL"),
        }
    }

    fn write_auto_increment_column(&self, _context: &mut Context, out: &mut String) {
        out.push_str(" INT IDENTITY(1,1) PRIMARY KEY");
    }

    fn write_transaction_begin(&self, out: &mut String) {
        out.push_str("BEGIN TRANSACTION;");
    }

    fn write_create_table_head(
        &self,
        context: &mut Context,
        out: &mut String,
        statement: &CreateTableStatement,
    ) {
        if statement.if_not_exists {
            let mut name = String::new();
            self.write_table_ref(context, &mut name, &statement.map.table, "");
            let _ = writeln!(
                out,
                "IF OBJECT_ID(N'{}', N'U') IS NULL",
                name.replace('\'', "''")
            );
        }
        out.push_str("CREATE TABLE ");
    }

    fn write_select_head(&self, _context: &mut Context, out: &mut String, limit: Option<u32>) {
        out.push_str("SELECT ");
        if let Some(limit) = limit {
            let _ = write!(out, "TOP ({}) ", limit);
        }
    }

    fn write_select_limit(&self, _context: &mut Context, _out: &mut String, _limit: Option<u32>) {
    }

    fn write_insert_output(
        &self,
        context: &mut Context,
        out: &mut String,
        statement: &InsertStatement,
    ) {
        if let Some(key) = &statement.generated_key {
            out.push_str(" OUTPUT INSERTED.");
            self.write_identifier_quoted(context, out, key.column);
        }
    }

    fn write_insert_returning(
        &self,
        _context: &mut Context,
        _out: &mut String,
        _statement: &InsertStatement,
    ) {
    }
}
