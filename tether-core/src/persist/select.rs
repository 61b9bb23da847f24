use crate::{
    AsValue, Connection, Entity, EntityMap, Executor, Predicate, Record, Result, RowLabeled,
    Segment, SelectOptions, Statement, downcast, entity_map, is_key_empty,
    persist::{execute, fetch_query, finish, render},
    statement,
};
use std::collections::{HashMap, HashSet};

/// Entities `E` matching `predicate` with the relations named in `includes` loaded, in its own
/// transaction.
pub async fn select<E: Entity, C: Connection>(
    connection: &mut C,
    predicate: &Predicate,
    includes: &[&str],
) -> Result<Vec<E>> {
    select_with(connection, predicate, includes, &SelectOptions::default()).await
}

pub async fn select_with<E: Entity, C: Connection>(
    connection: &mut C,
    predicate: &Predicate,
    includes: &[&str],
    options: &SelectOptions,
) -> Result<Vec<E>> {
    let mut transaction = connection.begin().await?;
    let result = select_in(&mut transaction, predicate, includes, options).await;
    finish(transaction, result).await
}

pub async fn select_in<E: Entity, X: Executor>(
    executor: &mut X,
    predicate: &Predicate,
    includes: &[&str],
    options: &SelectOptions,
) -> Result<Vec<E>> {
    let statement = statement::select(entity_map::<E>()?, predicate, includes, options)?;
    let segments = statement.segments.clone();
    let query = render(executor, &Statement::Select(statement));
    let rows = fetch_query(executor, query).await?;
    demultiplex(&segments, &rows)?
        .into_iter()
        .map(|v| downcast::<E>(v).map(|v| *v))
        .collect()
}

/// The entity whose key equals `id`, `None` if there is no such row.
pub async fn find_by_id<E: Entity, C: Connection>(
    connection: &mut C,
    id: impl AsValue,
    includes: &[&str],
) -> Result<Option<E>> {
    let mut transaction = connection.begin().await?;
    let result = find_by_id_in(&mut transaction, id, includes).await;
    finish(transaction, result).await
}

pub async fn find_by_id_in<E: Entity, X: Executor>(
    executor: &mut X,
    id: impl AsValue,
    includes: &[&str],
) -> Result<Option<E>> {
    let predicate = statement::by_id(entity_map::<E>()?, id)?;
    Ok(select_in::<E, _>(executor, &predicate, includes, &SelectOptions::default())
        .await?
        .into_iter()
        .next())
}

/// Create the table of `E`.
pub async fn create_table<E: Entity, X: Executor>(
    executor: &mut X,
    if_not_exists: bool,
) -> Result<()> {
    let statement = statement::create_table(entity_map::<E>()?, if_not_exists);
    execute(executor, &statement.into()).await?;
    Ok(())
}

/// Drop the table of `E`.
pub async fn drop_table<E: Entity, X: Executor>(executor: &mut X, if_exists: bool) -> Result<()> {
    let statement = statement::drop_table(entity_map::<E>()?, if_exists);
    execute(executor, &statement.into()).await?;
    Ok(())
}

/// Record of `segment` stored in `row`, `None` when its key columns are empty (no joined row).
fn read_segment(segment: &Segment, row: &RowLabeled) -> Result<Option<Box<dyn Record>>> {
    let map = segment.map;
    for column in map.key_columns() {
        let empty = segment
            .position(column.property)
            .and_then(|i| row.values.get(i))
            .is_none_or(is_key_empty);
        if empty {
            return Ok(None);
        }
    }
    let mut record = map.create();
    for (i, property) in segment.properties.iter().enumerate() {
        let Some(value) = row.values.get(segment.start + 1 + i) else {
            continue;
        };
        record.set_field(property, value.clone()).map_err(|e| {
            e.context(format!(
                "While reading column {} of the joined row into `{}`",
                segment.start + 1 + i,
                map.table.name
            ))
        })?;
    }
    Ok(Some(record))
}

fn identity(map: &EntityMap, record: &dyn Record, row: usize) -> Result<String> {
    if map.keys.is_empty() {
        Ok(format!("#{}", row))
    } else {
        map.key_string(record)
    }
}

/// Rebuild the entity graphs from the joined rows.
///
/// Roots are deduplicated by key and returned in the order they first appear. Each further
/// segment belongs to the relation that produced it: rows with an empty key are skipped, single
/// references are attached once per root and collection items once per key.
pub(crate) fn demultiplex(
    segments: &[Segment],
    rows: &[RowLabeled],
) -> Result<Vec<Box<dyn Record>>> {
    let Some((root, related)) = segments.split_first() else {
        return Ok(Vec::new());
    };
    let mut result: Vec<Box<dyn Record>> = Vec::new();
    let mut positions = HashMap::<String, usize>::new();
    let mut attached = Vec::<HashSet<(usize, String)>>::new();
    for (n, row) in rows.iter().enumerate() {
        let Some(record) = read_segment(root, row)? else {
            continue;
        };
        let key = identity(root.map, &*record, n)?;
        let index = match positions.get(&key) {
            Some(index) => *index,
            None => {
                positions.insert(key, result.len());
                result.push(record);
                attached.push(HashSet::new());
                result.len() - 1
            }
        };
        for (i, segment) in related.iter().enumerate() {
            let Some(relation) = segment.relation else {
                continue;
            };
            let Some(child) = read_segment(segment, row)? else {
                continue;
            };
            let key = identity(segment.map, &*child, n)?;
            if !attached[index].insert((i, key)) {
                continue;
            }
            result[index].attach(relation.property, child)?;
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ColumnDeclaration, EntityDeclaration, RowNames, Value};

    #[derive(Default, Debug)]
    struct Shelf {
        id: Option<i32>,
        label: String,
        items: Vec<Item>,
    }
    crate::record!(Shelf {
        fields: [id, label],
        many: [items],
    });
    impl Entity for Shelf {
        fn declare() -> EntityDeclaration {
            EntityDeclaration::new()
                .column(ColumnDeclaration::new("id").auto())
                .column("label")
                .one_to_many::<Item>("items", "id", "shelf_id")
        }
    }

    #[derive(Default, Debug)]
    struct Item {
        id: Option<i32>,
        shelf_id: Option<i32>,
        name: String,
    }
    crate::record!(Item {
        fields: [id, shelf_id, name]
    });
    impl Entity for Item {
        fn declare() -> EntityDeclaration {
            EntityDeclaration::new()
                .column(ColumnDeclaration::new("id").auto())
                .columns(["shelf_id", "name"])
        }
    }

    fn row(values: Vec<Value>) -> RowLabeled {
        RowLabeled::new(RowNames::from(Vec::new()), values.into_boxed_slice())
    }

    #[test]
    fn rebuilds_collections() {
        let statement = statement::select(
            entity_map::<Shelf>().unwrap(),
            &Predicate::always(),
            &["items"],
            &Default::default(),
        )
        .unwrap();
        let shelf = |id: i64, label: &str| {
            vec![
                Value::Null,
                Value::Int64(Some(id)),
                Value::Varchar(Some(label.into())),
                Value::Null,
            ]
        };
        let item = |id: i64, shelf: i64, name: &str| {
            vec![
                Value::Int64(Some(id)),
                Value::Int64(Some(shelf)),
                Value::Varchar(Some(name.into())),
            ]
        };
        let rows = [
            row([shelf(1, "top"), item(10, 1, "a")].concat()),
            row([shelf(1, "top"), item(11, 1, "b")].concat()),
            row([shelf(2, "bottom"), vec![Value::Null; 3]].concat()),
            row([shelf(1, "top"), item(10, 1, "a")].concat()),
        ];
        let shelves = demultiplex(&statement.segments, &rows)
            .unwrap()
            .into_iter()
            .map(|v| *downcast::<Shelf>(v).unwrap())
            .collect::<Vec<_>>();
        assert_eq!(shelves.len(), 2);
        assert_eq!(shelves[0].label, "top");
        assert_eq!(
            shelves[0]
                .items
                .iter()
                .map(|v| v.name.as_str())
                .collect::<Vec<_>>(),
            ["a", "b"]
        );
        assert_eq!(shelves[0].items[1].shelf_id, Some(1));
        assert_eq!(shelves[1].id, Some(2));
        assert!(shelves[1].items.is_empty());
    }

    #[test]
    fn no_rows() {
        let statement = statement::select(
            entity_map::<Item>().unwrap(),
            &Predicate::always(),
            &[],
            &Default::default(),
        )
        .unwrap();
        assert!(demultiplex(&statement.segments, &[]).unwrap().is_empty());
    }
}
