use crate::{
    Error, GenericSqlWriter, MySqlSqlWriter, Result, SqlServerSqlWriter, SqlWriter,
    SqliteSqlWriter,
};
use std::{
    fmt::{self, Display},
    str::FromStr,
};

static POSTGRES: GenericSqlWriter = GenericSqlWriter {};
static SQLITE: SqliteSqlWriter = SqliteSqlWriter {};
static MYSQL: MySqlSqlWriter = MySqlSqlWriter {};
static SQL_SERVER: SqlServerSqlWriter = SqlServerSqlWriter {};

/// SQL flavor a statement is rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Postgres,
    Sqlite,
    MySql,
    SqlServer,
}

impl Dialect {
    /// Process-wide writer of the dialect.
    pub fn sql_writer(&self) -> &'static dyn SqlWriter {
        match self {
            Dialect::Postgres => &POSTGRES,
            Dialect::Sqlite => &SQLITE,
            Dialect::MySql => &MYSQL,
            Dialect::SqlServer => &SQL_SERVER,
        }
    }
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::Sqlite => "sqlite",
            Dialect::MySql => "mysql",
            Dialect::SqlServer => "sqlserver",
        }
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Dialect::Postgres,
            "sqlite" => Dialect::Sqlite,
            "mysql" | "mariadb" => Dialect::MySql,
            "sqlserver" | "mssql" => Dialect::SqlServer,
            _ => {
                let error = Error::msg(format!("Unsupported dialect `{}`", s));
                log::error!("{}", error);
                return Err(error);
            }
        })
    }
}

impl Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_names() {
        assert_eq!("PostgreSQL".parse::<Dialect>().unwrap(), Dialect::Postgres);
        assert_eq!("mssql".parse::<Dialect>().unwrap(), Dialect::SqlServer);
        assert!("oracle".parse::<Dialect>().is_err());
    }

    #[test]
    fn writers_are_shared() {
        for dialect in [
            Dialect::Postgres,
            Dialect::Sqlite,
            Dialect::MySql,
            Dialect::SqlServer,
        ] {
            let writer = dialect.sql_writer();
            assert_eq!(writer.dialect(), dialect);
            assert!(std::ptr::addr_eq(writer, dialect.sql_writer()));
        }
    }
}
