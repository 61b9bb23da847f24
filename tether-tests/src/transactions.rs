use std::sync::LazyLock;
use tether::{
    ColumnDeclaration, Connection, Entity, EntityDeclaration, Transaction, insert_forced,
    insert_in, prop, record, select, update_fields,
};
use tokio::sync::Mutex;

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

#[derive(Default, Debug, Clone, PartialEq)]
pub struct Team {
    pub id: Option<i32>,
    pub name: String,
}
record!(Team { fields: [id, name] });
impl Entity for Team {
    fn declare() -> EntityDeclaration {
        EntityDeclaration::new()
            .table("teams")
            .column(ColumnDeclaration::new("id").auto())
            .column("name")
    }
}

#[derive(Default, Debug, Clone, PartialEq)]
pub struct Player {
    pub id: Option<i32>,
    pub name: String,
    pub team_id: Option<i32>,
    pub team: Option<Box<Team>>,
}
record!(Player {
    fields: [id, name, team_id],
    one: [team],
});
impl Entity for Player {
    fn declare() -> EntityDeclaration {
        EntityDeclaration::new()
            .table("players")
            .column(ColumnDeclaration::new("id").auto())
            .columns(["name", "team_id"])
            .many_to_one::<Team>("team", "team_id", "id")
    }
}

async fn count_teams<C: Connection>(connection: &mut C, name: &str) -> usize {
    select::<Team, _>(connection, &prop("name").eq(name), &[])
        .await
        .expect("Failed to select teams")
        .len()
}

pub async fn transactions<C: Connection>(connection: &mut C) {
    let _lock = MUTEX.lock().await;

    // Setup
    Player::drop_table(connection, true)
        .await
        .expect("Failed to drop Player table");
    Team::drop_table(connection, true)
        .await
        .expect("Failed to drop Team table");
    Team::create_table(connection, true)
        .await
        .expect("Failed to create Team table");
    Player::create_table(connection, true)
        .await
        .expect("Failed to create Player table");

    let mut first = Player {
        name: "Ada".into(),
        team: Some(Box::new(Team {
            name: "Engines".into(),
            ..Default::default()
        })),
        ..Default::default()
    };
    first
        .insert(connection)
        .await
        .expect("Failed to insert the first player");
    assert!(first.id.is_some());
    assert_eq!(first.team_id, first.team.as_ref().and_then(|v| v.id));

    // A failure after the cascade rolls back the rows already written
    let mut clash = Player {
        id: first.id,
        name: "Charles".into(),
        team: Some(Box::new(Team {
            name: "Ghosts".into(),
            ..Default::default()
        })),
        ..Default::default()
    };
    assert!(
        insert_forced(connection, &mut clash).await.is_err(),
        "Inserting a duplicate key must fail"
    );
    assert_eq!(count_teams(connection, "Ghosts").await, 0);

    // A required relation that is neither set nor inherited
    let mut orphan = Player {
        name: "Nobody".into(),
        ..Default::default()
    };
    let error = orphan
        .insert(connection)
        .await
        .expect_err("A player without a team must be rejected");
    assert!(format!("{:#}", error).contains("Required relation `team`"));

    // Participating in a caller transaction
    {
        let mut transaction = connection
            .begin()
            .await
            .expect("Could not begin a transaction");
        let mut team = Team {
            name: "Temporary".into(),
            ..Default::default()
        };
        insert_in(&mut transaction, &mut team)
            .await
            .expect("Failed to insert inside the transaction");
        transaction
            .rollback()
            .await
            .expect("Failed to roll back the transaction");
    }
    assert_eq!(count_teams(connection, "Temporary").await, 0);
    {
        let mut transaction = connection
            .begin()
            .await
            .expect("Could not begin a transaction");
        let mut team = Team {
            name: "Permanent".into(),
            ..Default::default()
        };
        insert_in(&mut transaction, &mut team)
            .await
            .expect("Failed to insert inside the transaction");
        transaction
            .commit()
            .await
            .expect("Failed to commit the transaction");
    }
    assert_eq!(count_teams(connection, "Permanent").await, 1);

    // Reduced field list
    first.name = "Ada Lovelace".into();
    first.team_id = None;
    update_fields(connection, &mut first, &["name"])
        .await
        .expect("Failed to update the name");
    let stored = Player::find_by_id(connection, first.id, &["team"])
        .await
        .expect("Failed to find the first player")
        .expect("The first player was not stored");
    assert_eq!(stored.name, "Ada Lovelace");
    assert!(stored.team_id.is_some(), "Columns not listed are untouched");
    assert_eq!(
        stored.team.as_ref().map(|v| v.name.as_str()),
        Some("Engines")
    );
    assert!(
        update_fields(connection, &mut first, &["id"]).await.is_err(),
        "Keys are not updatable"
    );

    // Hard delete must touch exactly one row
    let mut stored = stored;
    stored
        .delete(connection)
        .await
        .expect("Failed to delete the first player");
    assert_eq!(
        Player::find_by_id(connection, first.id, &[])
            .await
            .expect("Failed to look up the deleted player"),
        None
    );
    assert!(
        stored.delete(connection).await.is_err(),
        "Deleting a missing row must fail"
    );
}
