use std::sync::LazyLock;
use tether::{
    ColumnDeclaration, Connection, Entity, EntityDeclaration, Value, delete, entity_map, insert,
    insert_forced, prop, record, select, update,
};
use tokio::sync::Mutex;

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

#[derive(Default, Debug, Clone, PartialEq)]
pub struct Enrollment {
    pub course: String,
    pub student: String,
    pub grade: Option<f64>,
    pub notes: Option<String>,
}
record!(Enrollment {
    fields: [course, student, grade, notes]
});
impl Entity for Enrollment {
    fn declare() -> EntityDeclaration {
        EntityDeclaration::new()
            .table("enrollments")
            .column(ColumnDeclaration::new("course").key())
            .column(ColumnDeclaration::new("student").key())
            .column("grade")
            .column(ColumnDeclaration::new("notes").not_updatable())
    }
}

#[derive(Default, Debug, Clone, PartialEq)]
pub struct Course {
    pub code: String,
    pub title: String,
    pub tags: Vec<CourseTag>,
}
record!(Course {
    fields: [code, title],
    many: [tags],
});
impl Entity for Course {
    fn declare() -> EntityDeclaration {
        EntityDeclaration::new()
            .table("courses")
            .column(ColumnDeclaration::new("code").key())
            .column("title")
            .one_to_many::<CourseTag>("tags", "code", "course")
    }
}

#[derive(Default, Debug, Clone, PartialEq)]
pub struct CourseTag {
    pub course: String,
    pub label: String,
}
record!(CourseTag {
    fields: [course, label]
});
impl Entity for CourseTag {
    fn declare() -> EntityDeclaration {
        EntityDeclaration::new()
            .table("course_tags")
            .column(ColumnDeclaration::new("course").key())
            .column(ColumnDeclaration::new("label").key())
    }
}

pub async fn enrollment<C: Connection>(connection: &mut C) {
    let _lock = MUTEX.lock().await;

    // Setup
    Enrollment::drop_table(connection, true)
        .await
        .expect("Failed to drop Enrollment table");
    Enrollment::create_table(connection, false)
        .await
        .expect("Failed to create Enrollment table");
    CourseTag::drop_table(connection, true)
        .await
        .expect("Failed to drop CourseTag table");
    Course::drop_table(connection, true)
        .await
        .expect("Failed to drop Course table");
    Course::create_table(connection, false)
        .await
        .expect("Failed to create Course table");
    CourseTag::create_table(connection, false)
        .await
        .expect("Failed to create CourseTag table");

    let map = entity_map::<Enrollment>().expect("Failed to map Enrollment");
    let mut rows = vec![
        Enrollment {
            course: "Astronomy".into(),
            student: "Vera".into(),
            notes: Some("Front row".into()),
            ..Default::default()
        },
        Enrollment {
            course: "Astronomy".into(),
            student: "Edwin".into(),
            ..Default::default()
        },
        Enrollment {
            course: "Optics".into(),
            student: "Vera".into(),
            grade: Some(28.5),
            ..Default::default()
        },
    ];
    for row in &mut rows {
        // Populated keys mean the row already exists
        insert_forced(connection, row)
            .await
            .expect("Failed to insert an enrollment");
    }
    let mut again = rows[0].clone();
    insert(connection, &mut again)
        .await
        .expect("Inserting a row with a populated key is a no op");

    // Composite key stability
    let key = map.composite_key(&rows[0]).expect("Failed to compute the key");
    assert_eq!(key, Value::Varchar(Some("course=Astronomy;student=Vera;".into())));
    assert_eq!(map.composite_key(&rows[0]).unwrap(), key);

    let found = select::<Enrollment, _>(connection, &prop("student").eq("Vera"), &[])
        .await
        .expect("Failed to select the enrollments of Vera");
    assert_eq!(found.len(), 2);

    // Not updatable columns are left alone
    rows[0].grade = Some(30.0);
    rows[0].notes = Some("Moved to the back".into());
    update(connection, &mut rows[0], &[])
        .await
        .expect("Failed to update the grade");
    let found = select::<Enrollment, _>(
        connection,
        &(prop("course").eq("Astronomy") & prop("student").eq("Vera")),
        &[],
    )
    .await
    .expect("Failed to select one enrollment");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].grade, Some(30.0));
    assert_eq!(found[0].notes.as_deref(), Some("Front row"));

    delete(connection, &mut rows[1])
        .await
        .expect("Failed to delete an enrollment");
    let found = select::<Enrollment, _>(connection, &prop("course").eq("Astronomy"), &[])
        .await
        .expect("Failed to select the Astronomy enrollments");
    assert_eq!(found.len(), 1);
    assert!(
        tether::find_by_id::<Enrollment, _>(connection, "Astronomy", &[])
            .await
            .is_err(),
        "Composite keys cannot be looked up by a single id"
    );

    let empty = select::<Enrollment, _>(
        connection,
        &prop("student").is_in(Vec::<String>::new()),
        &[],
    )
    .await
    .expect("Failed to select with an empty list");
    assert!(empty.is_empty());
    let all = select::<Enrollment, _>(connection, &!prop("student").is_in(Vec::<String>::new()), &[])
        .await
        .expect("Failed to select with an empty exclusion list");
    assert_eq!(all.len(), 2);

    // Collections of rows made only of keys are reconciled without updates
    let mut optics = Course {
        code: "OPT".into(),
        title: "Optics".into(),
        ..Default::default()
    };
    insert_forced(connection, &mut optics)
        .await
        .expect("Failed to insert the course");
    for label in ["lenses", "lasers", "prisms"] {
        let mut tag = CourseTag {
            course: "OPT".into(),
            label: label.into(),
        };
        insert_forced(connection, &mut tag)
            .await
            .expect("Failed to insert a course tag");
        optics.tags.push(tag);
    }
    optics.tags.retain(|v| v.label != "lasers");
    optics.title = "Geometric optics".into();
    update(connection, &mut optics, &["tags"])
        .await
        .expect("Failed to update a course with key only tags");
    let courses = select::<Course, _>(connection, &prop("code").eq("OPT"), &["tags"])
        .await
        .expect("Failed to select the course with its tags");
    assert_eq!(courses.len(), 1);
    assert_eq!(courses[0].title, "Geometric optics");
    let mut labels = courses[0]
        .tags
        .iter()
        .map(|v| v.label.as_str())
        .collect::<Vec<_>>();
    labels.sort();
    assert_eq!(labels, ["lenses", "prisms"]);
}
