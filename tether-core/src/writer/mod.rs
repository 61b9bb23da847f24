mod context;
mod dialect;
mod mysql;
mod sql_writer;
mod sqlite;
mod sqlserver;

pub use context::*;
pub use dialect::*;
pub use mysql::*;
pub use sql_writer::*;
pub use sqlite::*;
pub use sqlserver::*;
