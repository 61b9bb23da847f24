use crate::SqliteConnection;
use tether_core::{Dialect, Driver};

#[derive(Default, Debug, Clone, Copy)]
pub struct SqliteDriver {}

impl SqliteDriver {
    pub const fn new() -> Self {
        Self {}
    }
}

impl Driver for SqliteDriver {
    type Connection = SqliteConnection;

    const NAME: &'static str = "sqlite";

    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }
}
