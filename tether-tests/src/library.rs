use std::sync::LazyLock;
use tether::{
    ColumnDeclaration, Connection, Entity, EntityDeclaration, Order, Predicate, SelectOptions,
    delete_where, persist, prop, record, select, select_with,
};
use time::PrimitiveDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

#[derive(Default, Debug, Clone, PartialEq)]
pub struct Author {
    pub id: Uuid,
    pub name: String,
    pub birth_year: i32,
    pub books: Vec<Book>,
}
record!(Author {
    fields: [id, name, birth_year],
    many: [books],
});
impl Entity for Author {
    fn declare() -> EntityDeclaration {
        EntityDeclaration::new()
            .table("authors")
            .column(ColumnDeclaration::new("id").name("author_id").auto())
            .columns(["name", "birth_year"])
            .one_to_many::<Book>("books", "id", "author_id")
    }
}

#[derive(Default, Debug, Clone, PartialEq)]
pub struct Book {
    pub id: Option<i32>,
    pub title: String,
    pub author_id: Uuid,
    pub editor_id: Option<Uuid>,
    pub removed: bool,
    pub updated_at: Option<PrimitiveDateTime>,
    pub author: Option<Box<Author>>,
    pub editor: Option<Box<Author>>,
    pub reviews: Vec<Review>,
}
record!(Book {
    fields: [id, title, author_id, editor_id, removed, updated_at],
    one: [author, editor],
    many: [reviews],
});
impl Entity for Book {
    fn declare() -> EntityDeclaration {
        EntityDeclaration::new()
            .table("books")
            .column(ColumnDeclaration::new("id").auto())
            .columns(["title", "author_id", "editor_id"])
            .column(ColumnDeclaration::new("removed").soft_delete())
            .column(ColumnDeclaration::new("updated_at").auto_timestamp())
            .many_to_one::<Author>("author", "author_id", "id")
            .many_to_one::<Author>("editor", "editor_id", "id")
            .nullable()
            .one_to_many::<Review>("reviews", "id", "book_id")
    }
}

#[derive(Default, Debug, Clone, PartialEq)]
pub struct Review {
    pub id: Uuid,
    pub book_id: i32,
    pub stars: i32,
    pub text: String,
}
record!(Review {
    fields: [id, book_id, stars, text]
});
impl Entity for Review {
    fn declare() -> EntityDeclaration {
        EntityDeclaration::new()
            .table("reviews")
            .column(ColumnDeclaration::new("id").auto())
            .columns(["book_id", "stars", "text"])
    }
}

pub async fn library<C: Connection>(connection: &mut C) {
    let _lock = MUTEX.lock().await;

    // Setup
    Review::drop_table(connection, true)
        .await
        .expect("Failed to drop Review table");
    Book::drop_table(connection, true)
        .await
        .expect("Failed to drop Book table");
    Author::drop_table(connection, true)
        .await
        .expect("Failed to drop Author table");
    Author::create_table(connection, false)
        .await
        .expect("Failed to create Author table");
    Book::create_table(connection, false)
        .await
        .expect("Failed to create Book table");
    Review::create_table(connection, true)
        .await
        .expect("Failed to create Review table");

    // Round trip
    let mut tolkien = Author {
        name: "J.R.R. Tolkien".into(),
        birth_year: 1892,
        ..Default::default()
    };
    tolkien
        .insert(connection)
        .await
        .expect("Failed to insert Tolkien");
    assert!(!tolkien.id.is_nil());
    let found = Author::find_by_id(connection, tolkien.id, &[])
        .await
        .expect("Failed to find Tolkien")
        .expect("Tolkien was not stored");
    assert_eq!(found, tolkien);
    assert_eq!(
        Author::find_by_id(connection, Uuid::new_v4(), &[])
            .await
            .expect("Failed to look up a missing author"),
        None
    );

    // Insert with nested new parent
    let mut cosmos = Book {
        title: "Cosmos".into(),
        author: Some(Box::new(Author {
            name: "Carl Sagan".into(),
            birth_year: 1934,
            ..Default::default()
        })),
        ..Default::default()
    };
    cosmos
        .insert(connection)
        .await
        .expect("Failed to insert Cosmos with its author");
    let sagan_id = cosmos.author.as_ref().map(|v| v.id).unwrap();
    assert!(!sagan_id.is_nil());
    assert_eq!(cosmos.author_id, sagan_id);
    assert!(cosmos.id.is_some());
    assert!(cosmos.updated_at.is_some());

    // Predicate on a relation property
    let books = Book::select(connection, &prop("author.birth_year").eq(1934), &["author"])
        .await
        .expect("Failed to select books by author birth year");
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].title, "Cosmos");
    assert_eq!(books[0].id, cosmos.id);
    assert_eq!(
        books[0].author.as_ref().map(|v| v.name.as_str()),
        Some("Carl Sagan")
    );
    assert!(
        delete_where::<Book, _>(connection, &prop("author.birth_year").eq(1934))
            .await
            .is_err(),
        "Relation properties cannot be used outside a select including them"
    );

    // Cascading key: children inserted through the collection take the key of the parent
    let mut le_guin = Author {
        name: "Ursula K. Le Guin".into(),
        birth_year: 1929,
        books: vec![
            Book {
                title: "A Wizard of Earthsea".into(),
                reviews: vec![
                    Review {
                        stars: 5,
                        text: "Timeless".into(),
                        ..Default::default()
                    },
                    Review {
                        stars: 4,
                        text: "Short but deep".into(),
                        ..Default::default()
                    },
                ],
                ..Default::default()
            },
            Book {
                title: "The Left Hand of Darkness".into(),
                editor_id: Some(sagan_id),
                ..Default::default()
            },
            Book {
                title: "The Dispossessed".into(),
                ..Default::default()
            },
        ],
        ..Default::default()
    };
    le_guin
        .insert(connection)
        .await
        .expect("Failed to insert Le Guin with her books");
    for book in &le_guin.books {
        assert_eq!(book.author_id, le_guin.id);
        assert!(book.id.is_some());
        for review in &book.reviews {
            assert_eq!(Some(review.book_id), book.id);
            assert!(!review.id.is_nil());
        }
    }

    // Two relations to the same type, disambiguated by request order
    let books = select_with::<Book, _>(
        connection,
        &prop("title").eq("The Left Hand of Darkness"),
        &["author", "editor"],
        &SelectOptions::new(),
    )
    .await
    .expect("Failed to select a book with author and editor");
    assert_eq!(books.len(), 1);
    assert_eq!(
        books[0].author.as_ref().map(|v| v.name.as_str()),
        Some("Ursula K. Le Guin")
    );
    assert_eq!(
        books[0].editor.as_ref().map(|v| v.name.as_str()),
        Some("Carl Sagan")
    );
    let books = select_with::<Book, _>(
        connection,
        &prop("author.name").eq("Ursula K. Le Guin"),
        &["author", "editor", "reviews"],
        &SelectOptions::new().order_by("title", Order::Asc),
    )
    .await
    .expect("Failed to select the books of Le Guin");
    assert_eq!(
        books.iter().map(|v| v.title.as_str()).collect::<Vec<_>>(),
        [
            "A Wizard of Earthsea",
            "The Dispossessed",
            "The Left Hand of Darkness",
        ]
    );
    assert_eq!(books[0].reviews.len(), 2);
    assert!(books[1].editor.is_none());
    assert!(books[1].reviews.is_empty());

    // Joined rows collapse into one root per key
    let authors = select::<Author, _>(connection, &prop("name").starts_with("Ursula"), &["books"])
        .await
        .expect("Failed to select Le Guin with her books");
    assert_eq!(authors.len(), 1);
    assert_eq!(authors[0].books.len(), 3);

    // Reconciliation of a soft deletable collection
    let dispossessed = le_guin
        .books
        .iter()
        .position(|v| v.title == "The Dispossessed")
        .unwrap();
    le_guin.books.remove(dispossessed);
    le_guin.books.push(Book {
        title: "Lavinia".into(),
        ..Default::default()
    });
    le_guin.birth_year = 1930;
    le_guin
        .update(connection, &["books"])
        .await
        .expect("Failed to update Le Guin");
    let authors = select::<Author, _>(connection, &prop("id").eq(le_guin.id), &["books"])
        .await
        .expect("Failed to select Le Guin after the update");
    assert_eq!(authors[0].birth_year, 1930);
    assert_eq!(authors[0].books.len(), 3);
    let lavinia = le_guin.books.last().unwrap();
    assert!(lavinia.id.is_some());
    assert_eq!(lavinia.author_id, le_guin.id);
    let removed = select_with::<Book, _>(
        connection,
        &prop("title").eq("The Dispossessed"),
        &[],
        &SelectOptions::new().include_deleted(),
    )
    .await
    .expect("Failed to select the removed book");
    assert_eq!(removed.len(), 1, "Soft deleted rows are still stored");
    assert!(removed[0].removed);

    // Reconciliation of a hard deletable collection
    let earthsea = &mut le_guin.books[0];
    earthsea.reviews.retain(|v| v.stars == 5);
    earthsea.reviews.push(Review {
        stars: 3,
        text: "Not my kind of magic".into(),
        ..Default::default()
    });
    earthsea.reviews[0].text = "Timeless classic".into();
    persist::update(connection, earthsea, &["reviews"])
        .await
        .expect("Failed to update the reviews of Earthsea");
    let mut reviews = select::<Review, _>(connection, &prop("book_id").eq(earthsea.id), &[])
        .await
        .expect("Failed to select the reviews of Earthsea");
    reviews.sort_by_key(|v| -v.stars);
    assert_eq!(
        reviews
            .iter()
            .map(|v| (v.stars, v.text.as_str()))
            .collect::<Vec<_>>(),
        [(5, "Timeless classic"), (3, "Not my kind of magic")]
    );

    // Soft delete
    let mut cosmos = Book::find_by_id(connection, cosmos.id, &[])
        .await
        .expect("Failed to find Cosmos")
        .expect("Cosmos was not stored");
    let stamped = cosmos.updated_at;
    cosmos
        .delete(connection)
        .await
        .expect("Failed to delete Cosmos");
    assert!(cosmos.removed);
    assert!(cosmos.updated_at >= stamped);
    assert_eq!(
        Book::find_by_id(connection, cosmos.id, &[])
            .await
            .expect("Failed to look up the deleted Cosmos"),
        None
    );
    let books = select_with::<Book, _>(
        connection,
        &prop("id").eq(cosmos.id),
        &[],
        &SelectOptions::new().include_deleted(),
    )
    .await
    .expect("Failed to select Cosmos including deleted rows");
    assert_eq!(books.len(), 1);
    assert!(books[0].removed);

    // Hard delete by predicate
    let affected = delete_where::<Review, _>(connection, &prop("stars").lt(4))
        .await
        .expect("Failed to delete the low rated reviews");
    assert_eq!(affected.rows_affected, 1);
    let reviews = select::<Review, _>(connection, &Predicate::always(), &[])
        .await
        .expect("Failed to select the remaining reviews");
    assert!(reviews.iter().all(|v| v.stars >= 4));

    // Limit and ordering
    let books = select_with::<Book, _>(
        connection,
        &prop("title").contains("of"),
        &[],
        &SelectOptions::new().order_by("title", Order::Desc).limit(1),
    )
    .await
    .expect("Failed to select with limit");
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].title, "The Left Hand of Darkness");

    let authors = select::<Author, _>(
        connection,
        &prop("name").is_in(["J.R.R. Tolkien", "Carl Sagan"]),
        &[],
    )
    .await
    .expect("Failed to select authors by name list");
    assert_eq!(authors.len(), 2);
}
