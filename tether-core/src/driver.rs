use crate::{Connection, Dialect, Result, SqlWriter};
use std::future::Future;

pub trait Driver {
    type Connection: Connection;

    /// Scheme of the connection URLs, `sqlite` for `sqlite://...`
    const NAME: &'static str;

    fn dialect(&self) -> Dialect;

    fn sql_writer(&self) -> &'static dyn SqlWriter {
        self.dialect().sql_writer()
    }

    fn connect(&self, url: &str) -> impl Future<Output = Result<Self::Connection>> {
        Self::Connection::connect(url)
    }
}
