use crate::{
    CBox, SqliteDriver, SqliteTransaction, error_message_from_ptr,
    extract::{bind_value, extract_name, extract_value},
};
use async_stream::try_stream;
use libsqlite3_sys::{
    SQLITE_BUSY, SQLITE_DONE, SQLITE_OK, SQLITE_OPEN_CREATE, SQLITE_OPEN_READWRITE,
    SQLITE_OPEN_URI, SQLITE_ROW, sqlite3, sqlite3_close, sqlite3_column_count, sqlite3_errmsg,
    sqlite3_finalize, sqlite3_open_v2, sqlite3_prepare_v2, sqlite3_step, sqlite3_stmt,
    sqlite3_total_changes64,
};
use std::{
    ffi::{CStr, CString, c_int},
    ptr,
};
use tether_core::{
    Connection, Context, Driver, Error, Executor, Query, QueryResult, Result, Row, RowLabeled,
    RowNames, RowsAffected, stream::Stream, truncate_long,
};
use tokio::task::spawn_blocking;

pub struct SqliteConnection {
    pub(crate) connection: CBox<sqlite3>,
}

async fn prepare(connection: CBox<sqlite3>, sql: String) -> Result<CBox<sqlite3_stmt>> {
    spawn_blocking(move || unsafe {
        let context = || format!("While preparing the query:\n{}", truncate_long!(sql));
        let query = CString::new(sql.as_bytes()).with_context(context)?;
        let mut statement = CBox::<sqlite3_stmt>::new(ptr::null_mut(), |p| {
            sqlite3_finalize(p);
        });
        let mut tail = ptr::null();
        let rc = sqlite3_prepare_v2(
            *connection,
            query.as_ptr(),
            query.as_bytes().len() as c_int,
            &mut *statement,
            &mut tail,
        );
        if rc != SQLITE_OK {
            let error =
                Error::msg(error_message_from_ptr(&sqlite3_errmsg(*connection)).to_string())
                    .context(context());
            log::error!("{:#}", error);
            return Err(error);
        }
        if statement.is_null() {
            let error = Error::msg("The query does not contain any statement")
                .context(context());
            log::error!("{:#}", error);
            return Err(error);
        }
        if !tail.is_null()
            && !CStr::from_ptr(tail)
                .to_bytes()
                .iter()
                .all(u8::is_ascii_whitespace)
        {
            let error = Error::msg("Cannot run more than one statement at a time")
                .context(context());
            log::error!("{:#}", error);
            return Err(error);
        }
        Ok(statement)
    })
    .await?
}

impl Executor for SqliteConnection {
    type Driver = SqliteDriver;

    fn driver(&self) -> &Self::Driver {
        &SqliteDriver {}
    }

    fn run(&mut self, query: Query) -> impl Stream<Item = Result<QueryResult>> + Send {
        let connection = self.connection.borrowed();
        let prepared = prepare(self.connection.borrowed(), query.sql);
        let params = query.params;
        try_stream! {
            let statement = prepared.await?;
            for (name, value) in &params {
                bind_value(*statement, name, value)?;
            }
            let count = unsafe { sqlite3_column_count(*statement) };
            let labels = (0..count)
                .map(|i| extract_name(*statement, i))
                .collect::<Result<RowNames>>()?;
            let before = unsafe { sqlite3_total_changes64(*connection) };
            loop {
                match unsafe { sqlite3_step(*statement) } {
                    SQLITE_BUSY => {
                        continue;
                    }
                    SQLITE_DONE => {
                        break;
                    }
                    SQLITE_ROW => {
                        let values = (0..count)
                            .map(|i| extract_value(*statement, i))
                            .collect::<Result<Row>>()?;
                        yield QueryResult::Row(RowLabeled::new(labels.clone(), values));
                    }
                    _ => {
                        let error = Error::msg(
                            error_message_from_ptr(&unsafe { sqlite3_errmsg(*connection) })
                                .to_string(),
                        );
                        log::error!("{}", error);
                        Err::<(), Error>(error)?;
                    }
                }
            }
            if count == 0 {
                let after = unsafe { sqlite3_total_changes64(*connection) };
                yield QueryResult::Affected(RowsAffected {
                    rows_affected: (after - before).max(0) as u64,
                });
            }
        }
    }
}

impl Connection for SqliteConnection {
    type Transaction<'c> = SqliteTransaction<'c>;

    /// Open `sqlite://<path>` (created if missing) or `sqlite://:memory:`. Query parameters
    /// are passed to SQLite as URI parameters, for example `sqlite://data.db?mode=ro`.
    async fn connect(url: &str) -> Result<SqliteConnection> {
        let prefix = format!("{}://", <Self::Driver as Driver>::NAME);
        let Some(path) = url.strip_prefix(&prefix) else {
            let error = Error::msg(format!(
                "Expected sqlite connection url to start with `{}`",
                &prefix
            ));
            log::error!("{}", error);
            return Err(error);
        };
        let context = || format!("While opening the database `{}`", url);
        let path = if path.starts_with("file:") {
            path.to_string()
        } else {
            format!("file:{}", path)
        };
        let path = CString::new(path).with_context(context)?;
        let mut connection = CBox::<sqlite3>::new(ptr::null_mut(), |p| {
            unsafe { sqlite3_close(p) };
        });
        let rc = unsafe {
            sqlite3_open_v2(
                path.as_ptr(),
                &mut *connection,
                SQLITE_OPEN_READWRITE | SQLITE_OPEN_CREATE | SQLITE_OPEN_URI,
                ptr::null(),
            )
        };
        if rc != SQLITE_OK {
            let message = if connection.is_null() {
                "Out of memory".to_string()
            } else {
                error_message_from_ptr(&unsafe { sqlite3_errmsg(*connection) }).to_string()
            };
            let error = Error::msg(message).context(context());
            log::error!("{:#}", error);
            return Err(error);
        }
        Ok(Self { connection })
    }

    async fn begin(&mut self) -> Result<SqliteTransaction<'_>> {
        SqliteTransaction::new(self).await
    }
}
