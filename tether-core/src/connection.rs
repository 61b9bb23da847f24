use crate::{Executor, Result, Transaction};
use std::future::Future;

pub trait Connection: Executor {
    type Transaction<'c>: Transaction<'c>
    where
        Self: 'c;

    /// Open a connection to the given URL
    fn connect(url: &str) -> impl Future<Output = Result<Self>>;

    /// Start a transaction, it ends when committed or rolled back.
    fn begin(&mut self) -> impl Future<Output = Result<Self::Transaction<'_>>>;
}
