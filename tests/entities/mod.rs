use tether::{ColumnDeclaration, Entity, EntityDeclaration, record};
use uuid::Uuid;

#[derive(Default, Debug)]
pub struct Author {
    pub id: Option<i32>,
    pub name: String,
    pub born: Option<i32>,
    pub books: Vec<Book>,
}
record!(Author {
    fields: [id, name, born],
    many: [books],
});
impl Entity for Author {
    fn declare() -> EntityDeclaration {
        EntityDeclaration::new()
            .table("authors")
            .column(ColumnDeclaration::new("id").auto())
            .columns(["name", "born"])
            .one_to_many::<Book>("books", "id", "author_id")
    }
}

#[derive(Default, Debug)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author_id: Option<i32>,
    pub deleted: bool,
    pub author: Option<Box<Author>>,
}
record!(Book {
    fields: [id, title, author_id, deleted],
    one: [author],
});
impl Entity for Book {
    fn declare() -> EntityDeclaration {
        EntityDeclaration::new()
            .table("books")
            .column(ColumnDeclaration::new("id").auto())
            .columns(["title", "author_id"])
            .column(ColumnDeclaration::new("deleted").soft_delete())
            .many_to_one::<Author>("author", "author_id", "id")
            .nullable()
    }
}

#[derive(Default, Debug)]
pub struct Person {
    pub id: Option<i32>,
    pub name: String,
}
record!(Person { fields: [id, name] });
impl Entity for Person {
    fn declare() -> EntityDeclaration {
        EntityDeclaration::new()
            .table("people")
            .column(ColumnDeclaration::new("id").auto())
            .column("name")
    }
}

#[derive(Default, Debug)]
pub struct Loan {
    pub id: Option<i32>,
    pub lender_id: i32,
    pub borrower_id: Option<i32>,
    pub amount: f64,
    pub lender: Option<Box<Person>>,
    pub borrower: Option<Box<Person>>,
}
record!(Loan {
    fields: [id, lender_id, borrower_id, amount],
    one: [lender, borrower],
});
impl Entity for Loan {
    fn declare() -> EntityDeclaration {
        EntityDeclaration::new()
            .table("loans")
            .column(ColumnDeclaration::new("id").auto())
            .columns(["lender_id", "borrower_id", "amount"])
            .many_to_one::<Person>("lender", "lender_id", "id")
            .many_to_one::<Person>("borrower", "borrower_id", "id")
            .nullable()
    }
}

#[derive(Default, Debug)]
pub struct Enrollment {
    pub course: String,
    pub student: String,
    pub grade: Option<f64>,
}
record!(Enrollment {
    fields: [course, student, grade]
});
impl Entity for Enrollment {
    fn declare() -> EntityDeclaration {
        EntityDeclaration::new()
            .table("enrollments")
            .column(ColumnDeclaration::new("course").key())
            .column(ColumnDeclaration::new("student").key())
            .column("grade")
    }
}
