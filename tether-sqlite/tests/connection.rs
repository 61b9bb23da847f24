#[cfg(test)]
mod tests {
    use std::{path::Path, sync::Mutex};
    use tether_core::{Connection, Executor, Query, Value};
    use tether_sqlite::SqliteConnection;
    use tether_tests::{init_logs, silent_logs};
    use tokio::fs;

    static MUTEX: Mutex<()> = Mutex::new(());

    #[tokio::test]
    async fn create_database() {
        init_logs();
        const DB_PATH: &'static str = "../target/debug/creation.sqlite";
        let _guard = MUTEX.lock().unwrap();
        if Path::new(DB_PATH).exists() {
            fs::remove_file(DB_PATH)
                .await
                .expect(format!("Failed to remove test database file {}", DB_PATH).as_str());
        }
        SqliteConnection::connect(&format!("sqlite://{}?mode=rwc", DB_PATH))
            .await
            .expect("Could not open the database");
        assert!(
            Path::new(DB_PATH).exists(),
            "Database file should be created after connection"
        );
        SqliteConnection::connect(&format!("sqlite://{}?mode=ro", DB_PATH))
            .await
            .expect("Could not open the database");
        fs::remove_file(DB_PATH)
            .await
            .expect(format!("Failed to remove existing test database file {}", DB_PATH).as_str());
        silent_logs! {
            assert!(
                SqliteConnection::connect(&format!("sqlite://{}?mode=ro", DB_PATH))
                    .await
                    .is_err(),
                "Should not be able to open in read only unexisting database"
            );
        }
    }

    #[tokio::test]
    async fn wrong_url() {
        silent_logs! {
            assert!(
                SqliteConnection::connect("duckdb://some_value")
                    .await
                    .is_err()
            );
        };
    }

    #[tokio::test]
    async fn named_parameters() {
        init_logs();
        let mut connection = SqliteConnection::connect("sqlite://:memory:")
            .await
            .expect("Could not open an in memory database");
        let mut query = Query::new("SELECT :a + :b AS total, :c AS label;");
        query.params.push(("b".into(), Value::Int32(Some(2))));
        query.params.push(("a".into(), Value::Int64(Some(40))));
        query.params.push(("c".into(), Value::Varchar(Some("answer".into()))));
        let rows = {
            use tether_core::stream::TryStreamExt;
            connection
                .fetch(query)
                .try_collect::<Vec<_>>()
                .await
                .expect("Failed to run the query")
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_column("total"), Some(&Value::Int64(Some(42))));
        assert_eq!(
            rows[0].get_column("label"),
            Some(&Value::Varchar(Some("answer".into())))
        );
        let affected = connection
            .execute("CREATE TABLE t (v INTEGER);".into())
            .await
            .expect("Failed to create a table");
        assert_eq!(affected.rows_affected, 0);
        silent_logs! {
            assert!(
                connection
                    .execute("SELECT 1; SELECT 2;".into())
                    .await
                    .is_err(),
                "Only one statement per query"
            );
        }
    }
}
