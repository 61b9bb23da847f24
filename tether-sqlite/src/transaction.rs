use crate::{SqliteConnection, SqliteDriver};
use tether_core::{
    Driver, Executor, Query, QueryResult, Result, SqlWriter, Transaction, stream::Stream,
};

pub struct SqliteTransaction<'c> {
    connection: &'c mut SqliteConnection,
}

impl<'c> SqliteTransaction<'c> {
    pub async fn new(connection: &'c mut SqliteConnection) -> Result<Self> {
        let mut sql = String::new();
        connection
            .driver()
            .sql_writer()
            .write_transaction_begin(&mut sql);
        connection.execute(sql.into()).await?;
        Ok(Self { connection })
    }

    async fn end(self, write: fn(&dyn SqlWriter, &mut String)) -> Result<()> {
        let connection = self.connection;
        let mut sql = String::new();
        write(connection.driver().sql_writer(), &mut sql);
        connection.execute(sql.into()).await?;
        Ok(())
    }
}

impl<'c> Executor for SqliteTransaction<'c> {
    type Driver = SqliteDriver;

    fn driver(&self) -> &SqliteDriver {
        self.connection.driver()
    }

    fn run(&mut self, query: Query) -> impl Stream<Item = Result<QueryResult>> + Send {
        self.connection.run(query)
    }
}

impl<'c> Transaction<'c> for SqliteTransaction<'c> {
    fn commit(self) -> impl Future<Output = Result<()>> {
        self.end(|writer, out| writer.write_transaction_commit(out))
    }

    fn rollback(self) -> impl Future<Output = Result<()>> {
        self.end(|writer, out| writer.write_transaction_rollback(out))
    }
}
