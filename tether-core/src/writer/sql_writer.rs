use crate::{
    Assignment, ColumnDef, ColumnToken, CreateTableStatement, DeleteStatement, Dialect,
    DropTableStatement, Fragment, InsertStatement, JoinDef, JoinKind, Order, Param, Query,
    SelectColumn, SelectStatement, SqlFragment, Statement, TableRef, Token, UpdateStatement, Value,
    separated_by, writer::Context,
};
use std::fmt::Write;

/// Dialect printer converting statement descriptors into concrete SQL.
///
/// The default implementation renders PostgreSQL, the other dialects override the pieces that
/// differ. Writers are stateless, one instance per dialect is shared by the whole process.
pub trait SqlWriter: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Whether the current fragment context allows alias declaration.
    fn alias_declaration(&self, context: &mut Context) -> bool {
        matches!(context.fragment, Fragment::SqlSelectFrom | Fragment::SqlJoin)
    }

    /// Escape occurrences of `search` char with `replace` while copying into buffer.
    fn write_escaped(
        &self,
        _context: &mut Context,
        out: &mut String,
        value: &str,
        search: char,
        replace: &str,
    ) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + c.len_utf8();
            }
        }
        out.push_str(&value[position..]);
    }

    /// Quote identifiers ("name") doubling inner quotes.
    fn write_identifier_quoted(&self, context: &mut Context, out: &mut String, value: &str) {
        out.push('"');
        self.write_escaped(context, out, value, '"', "\"\"");
        out.push('"');
    }

    /// Render a table reference, declaring `alias` when it differs from the table name.
    fn write_table_ref(
        &self,
        context: &mut Context,
        out: &mut String,
        value: &TableRef,
        alias: &str,
    ) {
        if !value.schema.is_empty() {
            self.write_identifier_quoted(context, out, value.schema);
            out.push('.');
        }
        self.write_identifier_quoted(context, out, value.name);
        if self.alias_declaration(context) && !alias.is_empty() && alias != value.name {
            out.push_str(" AS ");
            self.write_identifier_quoted(context, out, alias);
        }
    }

    /// Render a column optionally qualified with its table or alias.
    fn write_column_ref(&self, context: &mut Context, out: &mut String, value: &ColumnToken) {
        if context.qualify_columns && !value.table.is_empty() {
            self.write_identifier_quoted(context, out, &value.table);
            out.push('.');
        }
        self.write_identifier_quoted(context, out, value.column);
    }

    /// Placeholder of a parameter, `$1`, `$2`, ... by default.
    fn write_param_placeholder(&self, context: &mut Context, out: &mut String, _param: &Param) {
        context.counter += 1;
        let _ = write!(out, "${}", context.counter);
    }

    fn write_param(&self, context: &mut Context, out: &mut Query, param: &Param) {
        self.write_param_placeholder(context, &mut out.sql, param);
        out.params.push((param.name.clone(), param.value.clone()));
    }

    fn write_fragment(&self, context: &mut Context, out: &mut Query, fragment: &SqlFragment) {
        for token in &fragment.tokens {
            match token {
                Token::Text(v) => out.sql.push_str(v),
                Token::Column(v) => self.write_column_ref(context, &mut out.sql, v),
                Token::Param(v) => self.write_param(context, out, v),
            }
        }
    }

    /// Render the SQL type for a `Value` prototype.
    fn write_column_type(&self, _context: &mut Context, out: &mut String, value: &Value) {
        match value {
            Value::Boolean(..) => out.push_str("BOOLEAN"),
            Value::Int32(..) => out.push_str("INTEGER"),
            Value::Int64(..) => out.push_str("BIGINT"),
            Value::Float64(..) => out.push_str("DOUBLE PRECISION"),
            Value::Varchar(..) => out.push_str("VARCHAR"),
            Value::Blob(..) => out.push_str("BYTEA"),
            Value::Timestamp(..) => out.push_str("TIMESTAMP"),
            Value::Uuid(..) => out.push_str("UUID"),
            Value::Null => log::error!("Cannot derive a column type from an untyped NULL"),
        }
    }

    /// Everything after the column name of a database generated integer key.
    fn write_auto_increment_column(&self, _context: &mut Context, out: &mut String) {
        out.push_str(" SERIAL PRIMARY KEY");
    }

    fn write_transaction_begin(&self, out: &mut String) {
        out.push_str("BEGIN;");
    }

    fn write_transaction_commit(&self, out: &mut String) {
        out.push_str("COMMIT;");
    }

    fn write_transaction_rollback(&self, out: &mut String) {
        out.push_str("ROLLBACK;");
    }

    fn write_create_table(&self, out: &mut Query, statement: &CreateTableStatement) {
        let map = statement.map;
        let mut context = Context::new(Fragment::SqlCreateTable, false);
        let out = &mut out.sql;
        out.reserve(128 + map.columns.len() * 64);
        self.write_create_table_head(&mut context, out, statement);
        self.write_table_ref(&mut context, out, &map.table, "");
        out.push_str(" (\n");
        let inline_key = map.keys.len() == 1;
        separated_by(
            out,
            &map.columns,
            |out, v| {
                self.write_create_table_column_fragment(&mut context, out, v, inline_key);
            },
            ",\n",
        );
        if map.keys.len() > 1 {
            out.push_str(",\nPRIMARY KEY (");
            separated_by(
                out,
                map.key_columns(),
                |out, v| {
                    self.write_identifier_quoted(
                        &mut context
                            .switch_fragment(Fragment::SqlCreateTablePrimaryKey)
                            .current,
                        out,
                        v.name,
                    );
                },
                ", ",
            );
            out.push(')');
        }
        out.push_str(");");
    }

    fn write_create_table_head(
        &self,
        _context: &mut Context,
        out: &mut String,
        statement: &CreateTableStatement,
    ) {
        out.push_str("CREATE TABLE ");
        if statement.if_not_exists {
            out.push_str("IF NOT EXISTS ");
        }
    }

    fn write_create_table_column_fragment(
        &self,
        context: &mut Context,
        out: &mut String,
        column: &ColumnDef,
        inline_key: bool,
    ) {
        self.write_identifier_quoted(context, out, column.name);
        if column.auto && matches!(column.value, Value::Int32(..)) {
            self.write_auto_increment_column(context, out);
            return;
        }
        out.push(' ');
        self.write_column_type(context, out, &column.value);
        if !column.nullable && !column.key {
            out.push_str(" NOT NULL");
        }
        if column.key && inline_key {
            out.push_str(" PRIMARY KEY");
        }
    }

    fn write_drop_table(&self, out: &mut Query, statement: &DropTableStatement) {
        let mut context = Context::new(Fragment::SqlDropTable, false);
        out.sql.push_str("DROP TABLE ");
        if statement.if_exists {
            out.sql.push_str("IF EXISTS ");
        }
        self.write_table_ref(&mut context, &mut out.sql, &statement.table, "");
        out.sql.push(';');
    }

    /// Beginning of a select, dialects limiting rows up front write it here.
    fn write_select_head(&self, _context: &mut Context, out: &mut String, _limit: Option<u32>) {
        out.push_str("SELECT ");
    }

    fn write_select_limit(&self, _context: &mut Context, out: &mut String, limit: Option<u32>) {
        if let Some(limit) = limit {
            let _ = write!(out, "\nLIMIT {}", limit);
        }
    }

    fn write_select_column(&self, context: &mut Context, out: &mut String, column: &SelectColumn) {
        match column {
            SelectColumn::Split { alias } => {
                out.push_str("NULL AS ");
                self.write_identifier_quoted(context, out, alias);
            }
            SelectColumn::Column {
                table,
                column,
                alias,
            } => {
                self.write_identifier_quoted(context, out, table);
                out.push('.');
                self.write_identifier_quoted(context, out, column);
                out.push_str(" AS ");
                self.write_identifier_quoted(context, out, alias);
            }
        }
    }

    fn write_join(&self, context: &mut Context, out: &mut Query, join: &JoinDef) {
        out.sql.push_str(match join.kind {
            JoinKind::Inner => "\nINNER JOIN ",
            JoinKind::Left => "\nLEFT JOIN ",
        });
        self.write_table_ref(context, &mut out.sql, &join.table, &join.alias);
        out.sql.push_str(" ON ");
        self.write_fragment(context, out, &join.on);
    }

    fn write_select(&self, out: &mut Query, statement: &SelectStatement) {
        let mut context = Context::new(Fragment::SqlSelect, true);
        out.sql.reserve(128 + statement.columns.len() * 32);
        self.write_select_head(&mut context, &mut out.sql, statement.limit);
        separated_by(
            &mut out.sql,
            &statement.columns,
            |out, v| self.write_select_column(&mut context, out, v),
            ", ",
        );
        out.sql.push_str("\nFROM ");
        self.write_table_ref(
            &mut context.switch_fragment(Fragment::SqlSelectFrom).current,
            &mut out.sql,
            &statement.table,
            &statement.alias,
        );
        for join in &statement.joins {
            self.write_join(
                &mut context.switch_fragment(Fragment::SqlJoin).current,
                out,
                join,
            );
        }
        if !statement.filter.is_empty() {
            out.sql.push_str("\nWHERE ");
            self.write_fragment(
                &mut context.switch_fragment(Fragment::SqlSelectWhere).current,
                out,
                &statement.filter,
            );
        }
        if !statement.order_by.is_empty() {
            out.sql.push_str("\nORDER BY ");
            let mut order_context = context.switch_fragment(Fragment::SqlSelectOrderBy);
            separated_by(
                &mut out.sql,
                &statement.order_by,
                |out, (column, order)| {
                    self.write_column_ref(&mut order_context.current, out, column);
                    out.push_str(match order {
                        Order::Asc => " ASC",
                        Order::Desc => " DESC",
                    });
                },
                ", ",
            );
        }
        self.write_select_limit(&mut context, &mut out.sql, statement.limit);
        out.sql.push(';');
    }

    fn write_assignments(&self, context: &mut Context, out: &mut Query, values: &[Assignment]) {
        for (i, assignment) in values.iter().enumerate() {
            if i > 0 {
                out.sql.push_str(", ");
            }
            self.write_identifier_quoted(context, &mut out.sql, assignment.column);
            out.sql.push_str(" = ");
            self.write_param(context, out, &assignment.param);
        }
    }

    fn write_insert(&self, out: &mut Query, statement: &InsertStatement) {
        let mut context = Context::new(Fragment::SqlInsertInto, false);
        out.sql.push_str("INSERT INTO ");
        self.write_table_ref(&mut context, &mut out.sql, &statement.table, "");
        if statement.values.is_empty() {
            self.write_insert_output(&mut context, &mut out.sql, statement);
            self.write_insert_default_values(&mut context, &mut out.sql);
        } else {
            out.sql.push_str(" (");
            separated_by(
                &mut out.sql,
                &statement.values,
                |out, v| self.write_identifier_quoted(&mut context, out, v.column),
                ", ",
            );
            out.sql.push(')');
            self.write_insert_output(&mut context, &mut out.sql, statement);
            out.sql.push_str(" VALUES (");
            let mut context = context.switch_fragment(Fragment::SqlInsertIntoValues);
            for (i, value) in statement.values.iter().enumerate() {
                if i > 0 {
                    out.sql.push_str(", ");
                }
                self.write_param(&mut context.current, out, &value.param);
            }
            out.sql.push(')');
        }
        self.write_insert_returning(&mut context, &mut out.sql, statement);
        out.sql.push(';');
    }

    fn write_insert_default_values(&self, _context: &mut Context, out: &mut String) {
        out.push_str(" DEFAULT VALUES");
    }

    /// Clause between the column list and `VALUES` exposing the generated key.
    fn write_insert_output(
        &self,
        _context: &mut Context,
        _out: &mut String,
        _statement: &InsertStatement,
    ) {
    }

    /// Clause after `VALUES` exposing the generated key.
    fn write_insert_returning(
        &self,
        context: &mut Context,
        out: &mut String,
        statement: &InsertStatement,
    ) {
        if let Some(key) = &statement.generated_key {
            out.push_str(" RETURNING ");
            self.write_identifier_quoted(context, out, key.column);
        }
    }

    /// Follow-up query reading the key generated by the last insert, `None` when the insert
    /// itself returns it.
    fn generated_key_query(&self) -> Option<Query> {
        None
    }

    fn write_update(&self, out: &mut Query, statement: &UpdateStatement) {
        let mut context = Context::new(Fragment::SqlUpdate, false);
        out.sql.push_str("UPDATE ");
        self.write_table_ref(&mut context, &mut out.sql, &statement.table, "");
        out.sql.push_str(" SET ");
        self.write_assignments(
            &mut context.switch_fragment(Fragment::SqlUpdateSet).current,
            out,
            &statement.set,
        );
        if !statement.filter.is_empty() {
            out.sql.push_str("\nWHERE ");
            self.write_fragment(
                &mut context.switch_fragment(Fragment::SqlUpdateWhere).current,
                out,
                &statement.filter,
            );
        }
        out.sql.push(';');
    }

    fn write_delete(&self, out: &mut Query, statement: &DeleteStatement) {
        let mut context = Context::new(Fragment::SqlDeleteFrom, false);
        out.sql.push_str("DELETE FROM ");
        self.write_table_ref(&mut context, &mut out.sql, &statement.table, "");
        if !statement.filter.is_empty() {
            out.sql.push_str("\nWHERE ");
            self.write_fragment(
                &mut context.switch_fragment(Fragment::SqlDeleteFromWhere).current,
                out,
                &statement.filter,
            );
        }
        out.sql.push(';');
    }

    /// Render any statement into a query ready to be executed.
    fn render(&self, statement: &Statement) -> Query {
        let mut out = Query::default();
        match statement {
            Statement::Select(v) => self.write_select(&mut out, v),
            Statement::Insert(v) => self.write_insert(&mut out, v),
            Statement::Update(v) => self.write_update(&mut out, v),
            Statement::Delete(v) => self.write_delete(&mut out, v),
            Statement::CreateTable(v) => self.write_create_table(&mut out, v),
            Statement::DropTable(v) => self.write_drop_table(&mut out, v),
        }
        out
    }
}

/// PostgreSQL flavored writer.
#[derive(Default, Debug, Clone, Copy)]
pub struct GenericSqlWriter {}

impl SqlWriter for GenericSqlWriter {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }
}
