mod entities;

#[cfg(test)]
mod tests {
    use crate::entities::{Author, Book, Enrollment, Loan};
    use indoc::indoc;
    use tether::{
        Dialect, Order, Predicate, Query, Record, SelectOptions, Statement, Value, by_id,
        entity_map, prop, statement,
    };
    use uuid::Uuid;

    fn render(dialect: Dialect, statement: impl Into<Statement>) -> Query {
        dialect.sql_writer().render(&statement.into())
    }

    #[test]
    fn create_and_drop() {
        let authors = entity_map::<Author>().unwrap();
        assert_eq!(
            render(Dialect::Postgres, statement::create_table(authors, true)).sql,
            indoc! {r#"
                CREATE TABLE IF NOT EXISTS "authors" (
                "id" SERIAL PRIMARY KEY,
                "name" VARCHAR NOT NULL,
                "born" INTEGER);
            "#}
            .trim()
        );
        assert_eq!(
            render(Dialect::Sqlite, statement::create_table(authors, false)).sql,
            indoc! {r#"
                CREATE TABLE "authors" (
                "id" INTEGER PRIMARY KEY AUTOINCREMENT,
                "name" TEXT NOT NULL,
                "born" INTEGER);
            "#}
            .trim()
        );
        assert_eq!(
            render(Dialect::MySql, statement::create_table(authors, true)).sql,
            indoc! {r#"
                CREATE TABLE IF NOT EXISTS `authors` (
                `id` INTEGER AUTO_INCREMENT PRIMARY KEY,
                `name` VARCHAR(255) NOT NULL,
                `born` INTEGER);
            "#}
            .trim()
        );
        assert_eq!(
            render(Dialect::SqlServer, statement::create_table(authors, true)).sql,
            indoc! {r#"
                IF OBJECT_ID(N'[authors]', N'U') IS NULL
                CREATE TABLE [authors] (
                [id] INT IDENTITY(1,1) PRIMARY KEY,
                [name] NVARCHAR(255) NOT NULL,
                [born] INT);
            "#}
            .trim()
        );
        assert_eq!(
            render(Dialect::Postgres, statement::drop_table(authors, true)).sql,
            r#"DROP TABLE IF EXISTS "authors";"#
        );
        assert_eq!(
            render(Dialect::SqlServer, statement::drop_table(authors, false)).sql,
            "DROP TABLE [authors];"
        );
    }

    #[test]
    fn create_client_generated_and_composite_keys() {
        let books = entity_map::<Book>().unwrap();
        assert_eq!(
            render(Dialect::Sqlite, statement::create_table(books, false)).sql,
            indoc! {r#"
                CREATE TABLE "books" (
                "id" TEXT PRIMARY KEY,
                "title" TEXT NOT NULL,
                "author_id" INTEGER,
                "deleted" INTEGER NOT NULL);
            "#}
            .trim()
        );
        let enrollments = entity_map::<Enrollment>().unwrap();
        assert_eq!(
            render(Dialect::Postgres, statement::create_table(enrollments, false)).sql,
            indoc! {r#"
                CREATE TABLE "enrollments" (
                "course" VARCHAR,
                "student" VARCHAR,
                "grade" DOUBLE PRECISION,
                PRIMARY KEY ("course", "student"));
            "#}
            .trim()
        );
    }

    #[test]
    fn select_with_limit() {
        let authors = entity_map::<Author>().unwrap();
        let select = statement::select(
            authors,
            &prop("name").eq("Ursula"),
            &[],
            &SelectOptions::new().limit(3),
        )
        .unwrap();
        let query = render(Dialect::SqlServer, select.clone());
        assert_eq!(
            query.sql,
            indoc! {"
                SELECT TOP (3) NULL AS [split_0], [authors].[id] AS [authors__id], [authors].[name] AS [authors__name], [authors].[born] AS [authors__born]
                FROM [authors]
                WHERE [authors].[name] = @name_0;
            "}
            .trim()
        );
        assert_eq!(
            query.params,
            [("name_0".to_string(), Value::Varchar(Some("Ursula".into())))]
        );
        assert_eq!(
            render(Dialect::MySql, select).sql,
            indoc! {"
                SELECT NULL AS `split_0`, `authors`.`id` AS `authors__id`, `authors`.`name` AS `authors__name`, `authors`.`born` AS `authors__born`
                FROM `authors`
                WHERE `authors`.`name` = ?
                LIMIT 3;
            "}
            .trim()
        );
    }

    #[test]
    fn select_by_id() {
        let authors = entity_map::<Author>().unwrap();
        let select = statement::select(
            authors,
            &by_id(authors, 5).unwrap(),
            &[],
            &Default::default(),
        )
        .unwrap();
        assert_eq!(
            render(Dialect::Postgres, select).sql,
            indoc! {r#"
                SELECT NULL AS "split_0", "authors"."id" AS "authors__id", "authors"."name" AS "authors__name", "authors"."born" AS "authors__born"
                FROM "authors"
                WHERE "authors"."id" = $1;
            "#}
            .trim()
        );
        let enrollments = entity_map::<Enrollment>().unwrap();
        assert!(by_id(enrollments, "Optics").is_err());
    }

    #[test]
    fn select_many_to_one() {
        let books = entity_map::<Book>().unwrap();
        let select = statement::select(
            books,
            &(prop("author.name").eq("Le Guin") & prop("title").starts_with("The")),
            &["author"],
            &SelectOptions::new()
                .order_by("title", Order::Desc)
                .limit(5),
        )
        .unwrap();
        assert_eq!(select.segments.len(), 2);
        assert_eq!(select.segments[1].start, 5);
        assert_eq!(select.segments[1].position("name"), Some(7));
        let query = render(Dialect::Postgres, select);
        assert_eq!(
            query.sql,
            indoc! {r#"
                SELECT NULL AS "split_0", "books"."id" AS "books__id", "books"."title" AS "books__title", "books"."author_id" AS "books__author_id", "books"."deleted" AS "books__deleted", NULL AS "split_1", "authors"."id" AS "authors__id", "authors"."name" AS "authors__name", "authors"."born" AS "authors__born"
                FROM "books"
                LEFT JOIN "authors" ON "authors"."id" = "books"."author_id"
                WHERE ("authors"."name" = $1 AND "books"."title" LIKE $2) AND ("books"."deleted" IS NULL OR "books"."deleted" = $3)
                ORDER BY "books"."title" DESC
                LIMIT 5;
            "#}
            .trim()
        );
        assert_eq!(
            query.params,
            [
                ("name_0".to_string(), Value::Varchar(Some("Le Guin".into()))),
                ("title_1".to_string(), Value::Varchar(Some("The%".into()))),
                ("deleted_2".to_string(), Value::Boolean(Some(false))),
            ]
        );
    }

    #[test]
    fn select_one_to_many() {
        let authors = entity_map::<Author>().unwrap();
        let select =
            statement::select(authors, &Predicate::always(), &["books"], &Default::default())
                .unwrap();
        assert_eq!(
            render(Dialect::Sqlite, select).sql,
            indoc! {r#"
                SELECT NULL AS "split_0", "authors"."id" AS "authors__id", "authors"."name" AS "authors__name", "authors"."born" AS "authors__born", NULL AS "split_1", "books"."id" AS "books__id", "books"."title" AS "books__title", "books"."author_id" AS "books__author_id", "books"."deleted" AS "books__deleted"
                FROM "authors"
                LEFT JOIN "books" ON "books"."author_id" = "authors"."id" AND ("books"."deleted" IS NULL OR "books"."deleted" = :deleted_0);
            "#}
            .trim()
        );
        let select = statement::select(
            authors,
            &Predicate::always(),
            &["books"],
            &SelectOptions::new().include_deleted(),
        )
        .unwrap();
        assert!(
            render(Dialect::Sqlite, select)
                .sql
                .ends_with(r#"LEFT JOIN "books" ON "books"."author_id" = "authors"."id";"#)
        );
    }

    #[test]
    fn select_same_table_twice() {
        let loans = entity_map::<Loan>().unwrap();
        let select = statement::select(
            loans,
            &prop("borrower.name").eq("Bob"),
            &["lender", "borrower"],
            &Default::default(),
        )
        .unwrap();
        assert_eq!(select.segments[2].alias, "people__1");
        assert_eq!(select.segments[2].start, 8);
        assert_eq!(select.segments[2].position("name"), Some(10));
        assert_eq!(
            render(Dialect::Postgres, select).sql,
            indoc! {r#"
                SELECT NULL AS "split_0", "loans"."id" AS "loans__id", "loans"."lender_id" AS "loans__lender_id", "loans"."borrower_id" AS "loans__borrower_id", "loans"."amount" AS "loans__amount", NULL AS "split_1", "people"."id" AS "people__id", "people"."name" AS "people__name", NULL AS "split_2", "people__1"."id" AS "people__1__id", "people__1"."name" AS "people__1__name"
                FROM "loans"
                INNER JOIN "people" ON "people"."id" = "loans"."lender_id"
                LEFT JOIN "people" AS "people__1" ON "people__1"."id" = "loans"."borrower_id"
                WHERE "people__1"."name" = $1;
            "#}
            .trim()
        );
    }

    #[test]
    fn select_rejects_bad_includes() {
        let books = entity_map::<Book>().unwrap();
        let options = SelectOptions::new();
        assert!(statement::select(books, &prop("author.name").eq("x"), &[], &options).is_err());
        assert!(statement::select(books, &Predicate::always(), &["reviews"], &options).is_err());
        assert!(
            statement::select(books, &Predicate::always(), &["author", "author"], &options)
                .is_err()
        );
        let options = SelectOptions::new().order_by("author.name", Order::Asc);
        assert!(statement::select(books, &Predicate::always(), &[], &options).is_err());
    }

    #[test]
    fn insert_generated_keys() {
        let authors = entity_map::<Author>().unwrap();
        let mut author = Author {
            name: "Ursula".into(),
            born: Some(1929),
            ..Default::default()
        };
        let insert = statement::insert(authors, &mut author, false)
            .unwrap()
            .expect("An author without id must be inserted");
        assert_eq!(insert.generated_key.as_ref().unwrap().column, "id");
        assert_eq!(
            render(Dialect::Postgres, insert.clone()).sql,
            r#"INSERT INTO "authors" ("name", "born") VALUES ($1, $2) RETURNING "id";"#
        );
        assert_eq!(
            render(Dialect::Sqlite, insert.clone()).sql,
            r#"INSERT INTO "authors" ("name", "born") VALUES (:name_0, :born_1);"#
        );
        assert_eq!(
            render(Dialect::MySql, insert.clone()).sql,
            "INSERT INTO `authors` (`name`, `born`) VALUES (?, ?);"
        );
        let query = render(Dialect::SqlServer, insert);
        assert_eq!(
            query.sql,
            "INSERT INTO [authors] ([name], [born]) OUTPUT INSERTED.[id] VALUES (@name_0, @born_1);"
        );
        assert_eq!(
            query.params,
            [
                ("name_0".to_string(), Value::Varchar(Some("Ursula".into()))),
                ("born_1".to_string(), Value::Int32(Some(1929))),
            ]
        );
        assert!(Dialect::Postgres.sql_writer().generated_key_query().is_none());
        assert!(Dialect::SqlServer.sql_writer().generated_key_query().is_none());
        assert_eq!(
            Dialect::MySql.sql_writer().generated_key_query().unwrap().sql,
            "SELECT LAST_INSERT_ID();"
        );
    }

    #[test]
    fn insert_client_generated_key() {
        let books = entity_map::<Book>().unwrap();
        let mut book = Book {
            title: "Tehanu".into(),
            author_id: Some(3),
            ..Default::default()
        };
        let insert = statement::insert(books, &mut book, false)
            .unwrap()
            .expect("A book without id must be inserted");
        assert!(!book.id.is_nil());
        assert!(insert.generated_key.is_none());
        let query = render(Dialect::Postgres, insert);
        assert_eq!(
            query.sql,
            r#"INSERT INTO "books" ("id", "title", "author_id", "deleted") VALUES ($1, $2, $3, $4);"#
        );
        assert_eq!(query.params[0].1, Value::Uuid(Some(book.id)));
        assert!(
            statement::insert(books, &mut book, false)
                .unwrap()
                .is_none(),
            "Stored rows are not inserted again"
        );
        assert!(statement::insert(books, &mut book, true).unwrap().is_some());
    }

    #[test]
    fn update() {
        let books = entity_map::<Book>().unwrap();
        let mut book = Book {
            id: Uuid::from_u128(1),
            title: "Tehanu".into(),
            author_id: Some(3),
            ..Default::default()
        };
        assert_eq!(
            render(Dialect::Sqlite, statement::update(books, &mut book).unwrap()).sql,
            indoc! {r#"
                UPDATE "books" SET "title" = :title_0, "author_id" = :author_id_1, "deleted" = :deleted_2
                WHERE "id" = :id_3;
            "#}
            .trim()
        );
        let query = render(
            Dialect::Postgres,
            statement::update_fields(books, &mut book, &["title"]).unwrap(),
        );
        assert_eq!(
            query.sql,
            indoc! {r#"
                UPDATE "books" SET "title" = $1
                WHERE "id" = $2;
            "#}
            .trim()
        );
        assert_eq!(query.params[1].1, Value::Uuid(Some(Uuid::from_u128(1))));
        assert!(statement::update_fields(books, &mut book, &["id"]).is_err());
        assert!(statement::update_fields(books, &mut book, &["pages"]).is_err());
        let mut unsaved = Book::default();
        assert!(statement::update(books, &mut unsaved).is_err());
    }

    #[test]
    fn delete() {
        let authors = entity_map::<Author>().unwrap();
        let mut author = Author {
            id: Some(9),
            ..Default::default()
        };
        assert_eq!(
            render(
                Dialect::MySql,
                statement::delete(authors, &mut author).unwrap()
            )
            .sql,
            indoc! {"
                DELETE FROM `authors`
                WHERE `id` = ?;
            "}
            .trim()
        );
        assert_eq!(
            render(
                Dialect::SqlServer,
                statement::delete_where(authors, &prop("born").lt(1900)).unwrap()
            )
            .sql,
            indoc! {"
                DELETE FROM [authors]
                WHERE [born] < @born_0;
            "}
            .trim()
        );
    }

    #[test]
    fn soft_delete() {
        let books = entity_map::<Book>().unwrap();
        let mut book = Book {
            id: Uuid::from_u128(7),
            title: "Cosmos".into(),
            ..Default::default()
        };
        let query = render(
            Dialect::Postgres,
            statement::delete(books, &mut book).unwrap(),
        );
        assert_eq!(
            query.sql,
            indoc! {r#"
                UPDATE "books" SET "deleted" = $1
                WHERE "id" = $2;
            "#}
            .trim()
        );
        assert_eq!(query.params[0].1, Value::Boolean(Some(true)));
        assert!(book.deleted);
        assert!(
            statement::delete_where(books, &prop("author.name").eq("Sagan")).is_err(),
            "Relations cannot be filtered outside a select"
        );
    }

    #[test]
    fn delete_orphans() {
        let authors = entity_map::<Author>().unwrap();
        let relation = authors.relation("books").unwrap();
        let first = Book {
            id: Uuid::from_u128(1),
            ..Default::default()
        };
        let second = Book {
            id: Uuid::from_u128(2),
            ..Default::default()
        };
        let keep: [&dyn Record; 2] = [&first, &second];
        let query = render(
            Dialect::Sqlite,
            statement::delete_orphans(relation, Value::Int32(Some(4)), &keep).unwrap(),
        );
        assert_eq!(
            query.sql,
            indoc! {r#"
                UPDATE "books" SET "deleted" = :deleted_3
                WHERE "author_id" = :author_id_0 AND "id" NOT IN (:id_1, :id_2);
            "#}
            .trim()
        );
        assert_eq!(query.params[0].0, "deleted_3");
        assert_eq!(query.params[1].1, Value::Int32(Some(4)));
        let query = render(
            Dialect::Sqlite,
            statement::delete_orphans(relation, Value::Int32(Some(4)), &[]).unwrap(),
        );
        assert!(query.sql.ends_with(r#"WHERE "author_id" = :author_id_0;"#));
    }
}
