mod as_value;
mod connection;
mod declaration;
mod driver;
mod entity;
mod executor;
mod mapper;
pub mod persist;
mod predicate;
mod query;
mod record;
pub mod statement;
mod transaction;
mod util;
mod value;
pub mod writer;

pub use ::anyhow::Context;
pub use as_value::*;
pub use connection::*;
pub use declaration::*;
pub use driver::*;
pub use entity::*;
pub use executor::*;
pub use mapper::*;
pub use persist::*;
pub use predicate::*;
pub use query::*;
pub use record::*;
pub use statement::{
    Assignment, CreateTableStatement, DeleteStatement, DropTableStatement, GeneratedKey,
    InsertStatement, JoinDef, JoinKind, Order, Segment, SelectColumn, SelectOptions,
    SelectStatement, Statement, UpdateStatement, by_id,
};
pub use transaction::*;
pub use util::*;
pub use value::*;
pub use writer::{
    Dialect, Fragment, GenericSqlWriter, MySqlSqlWriter, SqlServerSqlWriter, SqlWriter,
    SqliteSqlWriter,
};
pub mod stream {
    pub use ::futures::stream::*;
}
pub use ::futures::future;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
