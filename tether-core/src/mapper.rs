use crate::{Entity, EntityDeclaration, Error, Record, Result, Value, util::short_type_name};
use std::{
    any::{TypeId, type_name},
    collections::HashMap,
    fmt::Write,
    sync::{LazyLock, PoisonError, RwLock},
};

static ENTITY_MAPS: LazyLock<RwLock<HashMap<TypeId, &'static EntityMap>>> =
    LazyLock::new(Default::default);

/// Metadata of `E`, derived on first use and shared for the rest of the process.
///
/// Derivation runs outside the lock: concurrent first users may derive redundantly but all of
/// them end up with the instance that was inserted first. Failed derivations are not cached.
pub fn entity_map<E: Entity>() -> Result<&'static EntityMap> {
    let id = TypeId::of::<E>();
    if let Some(map) = ENTITY_MAPS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&id)
    {
        return Ok(*map);
    }
    let derived = derive::<E>().map_err(|e| {
        let e = e.context(format!("While mapping entity `{}`", type_name::<E>()));
        log::error!("{:#}", e);
        e
    })?;
    let mut maps = ENTITY_MAPS.write().unwrap_or_else(PoisonError::into_inner);
    Ok(*maps
        .entry(id)
        .or_insert_with(|| Box::leak(Box::new(derived))))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableRef {
    pub name: &'static str,
    pub schema: &'static str,
}

#[derive(Debug, Clone)]
pub struct ColumnDef {
    /// Property on the record.
    pub property: &'static str,
    /// Column name in the table.
    pub name: &'static str,
    /// Typed value of a default instance, defines the SQL type.
    pub value: Value,
    pub nullable: bool,
    pub key: bool,
    pub auto: bool,
    pub updatable: bool,
    pub selectable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    ManyToOne,
    OneToMany,
}

#[derive(Debug, Clone)]
pub struct RelationDef {
    pub property: &'static str,
    pub kind: RelationKind,
    pub target_type: &'static str,
    target: fn() -> Result<&'static EntityMap>,
    /// Column property on the owner.
    pub local_key: &'static str,
    /// Column property on the target.
    pub foreign_key: &'static str,
    pub nullable: bool,
}

impl RelationDef {
    /// Metadata of the related type, resolved on demand.
    pub fn target(&self) -> Result<&'static EntityMap> {
        (self.target)()
    }
    pub fn target_table(&self) -> Result<&'static TableRef> {
        Ok(&self.target()?.table)
    }
}

/// Immutable schema of an entity type.
#[derive(Debug)]
pub struct EntityMap {
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub table: TableRef,
    pub columns: Vec<ColumnDef>,
    /// Indexes into `columns`, in declaration order.
    pub keys: Vec<usize>,
    pub auto_key: Option<usize>,
    pub soft_delete: Option<usize>,
    pub auto_timestamp: Option<usize>,
    pub relations: Vec<RelationDef>,
    create: fn() -> Box<dyn Record>,
}

impl EntityMap {
    pub fn column(&self, property: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|v| v.property == property)
    }
    pub fn relation(&self, property: &str) -> Option<&RelationDef> {
        self.relations.iter().find(|v| v.property == property)
    }
    pub fn key_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.keys.iter().map(|i| &self.columns[*i])
    }
    pub fn auto_key_column(&self) -> Option<&ColumnDef> {
        self.auto_key.map(|i| &self.columns[i])
    }
    pub fn soft_delete_column(&self) -> Option<&ColumnDef> {
        self.soft_delete.map(|i| &self.columns[i])
    }
    pub fn auto_timestamp_column(&self) -> Option<&ColumnDef> {
        self.auto_timestamp.map(|i| &self.columns[i])
    }
    /// New default instance of the mapped type.
    pub fn create(&self) -> Box<dyn Record> {
        (self.create)()
    }

    pub(crate) fn read(&self, record: &dyn Record, property: &str) -> Result<Value> {
        record.field(property).ok_or_else(|| {
            Error::msg(format!(
                "Record mapped to `{}` has no property `{}`",
                self.table.name, property
            ))
        })
    }

    pub(crate) fn require_keys(&self) -> Result<()> {
        if self.keys.is_empty() {
            return Err(Error::msg(format!(
                "Table `{}` does not declare a primary key",
                self.table.name
            )));
        }
        Ok(())
    }

    /// Identity of the record: the raw key value for a single key, `column=value;` pairs in
    /// declaration order for composite keys.
    pub fn composite_key(&self, record: &dyn Record) -> Result<Value> {
        self.require_keys()?;
        if let [key] = self.keys.as_slice() {
            return self.read(record, self.columns[*key].property);
        }
        let mut out = String::new();
        for column in self.key_columns() {
            let value = self.read(record, column.property)?;
            let _ = write!(out, "{}={};", column.name, value);
        }
        Ok(Value::Varchar(Some(out)))
    }

    /// Composite key as text, used to deduplicate rows.
    pub fn key_string(&self, record: &dyn Record) -> Result<String> {
        Ok(self.composite_key(record)?.to_string())
    }

    /// True when any key component is empty: the record was never stored.
    pub fn has_empty_key(&self, record: &dyn Record) -> Result<bool> {
        self.require_keys()?;
        for column in self.key_columns() {
            if is_key_empty(&self.read(record, column.property)?) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// NULL, empty string and the nil uuid (native or textual) are empty keys.
pub fn is_key_empty(value: &Value) -> bool {
    match value {
        Value::Varchar(Some(v)) => {
            v.is_empty() || uuid::Uuid::try_parse(v).is_ok_and(|v| v.is_nil())
        }
        Value::Uuid(Some(v)) => v.is_nil(),
        Value::Blob(Some(v)) => v.is_empty(),
        v => v.is_null(),
    }
}

fn create<E: Entity>() -> Box<dyn Record> {
    Box::new(E::default())
}

fn single(found: &mut Option<usize>, index: usize, marker: &str, table: &str) -> Result<()> {
    if found.is_some() {
        return Err(Error::msg(format!(
            "Table `{}` declares more than one {} column",
            table, marker
        )));
    }
    *found = Some(index);
    Ok(())
}

fn derive<E: Entity>() -> Result<EntityMap> {
    let EntityDeclaration {
        table,
        schema,
        columns: declared_columns,
        relations: declared_relations,
    } = E::declare();
    let prototype = E::default();
    let table = TableRef {
        name: table.unwrap_or_else(|| short_type_name(type_name::<E>())),
        schema,
    };
    let mut columns = Vec::with_capacity(declared_columns.len());
    let mut keys = Vec::new();
    let mut auto_key = None;
    let mut soft_delete = None;
    let mut auto_timestamp = None;
    for (i, declared) in declared_columns.into_iter().enumerate() {
        if columns
            .iter()
            .any(|v: &ColumnDef| v.property == declared.property)
        {
            return Err(Error::msg(format!(
                "Property `{}` is declared twice",
                declared.property
            )));
        }
        let value = prototype.field(declared.property).ok_or_else(|| {
            Error::msg(format!(
                "Declared column `{}` is not a field of the record",
                declared.property
            ))
        })?;
        if declared.key {
            keys.push(i);
        }
        if declared.auto {
            if !matches!(value, Value::Uuid(..) | Value::Int32(..)) {
                return Err(Error::msg(format!(
                    "Auto generated key `{}` must be a Uuid or an i32, found {:?}",
                    declared.property, value
                )));
            }
            if matches!(value, Value::Int32(Some(..))) {
                return Err(Error::msg(format!(
                    "Auto generated i32 key `{}` must be an `Option<i32>`",
                    declared.property
                )));
            }
            single(&mut auto_key, i, "auto generated key", table.name)?;
        }
        if declared.soft_delete {
            if !matches!(value, Value::Boolean(..)) {
                return Err(Error::msg(format!(
                    "Soft delete column `{}` must be a bool",
                    declared.property
                )));
            }
            single(&mut soft_delete, i, "soft delete", table.name)?;
        }
        if declared.auto_timestamp {
            if !matches!(value, Value::Timestamp(..)) {
                return Err(Error::msg(format!(
                    "Auto timestamp column `{}` must be a PrimitiveDateTime",
                    declared.property
                )));
            }
            single(&mut auto_timestamp, i, "auto timestamp", table.name)?;
        }
        columns.push(ColumnDef {
            property: declared.property,
            name: declared.name.unwrap_or(declared.property),
            nullable: !declared.key && (declared.nullable || value.is_null()),
            value,
            key: declared.key,
            auto: declared.auto,
            updatable: declared.updatable,
            selectable: declared.selectable,
        });
    }
    let generated = auto_key
        .map(|i| &columns[i])
        .filter(|v| matches!(v.value, Value::Int32(..)));
    if let Some(column) = generated.filter(|_| keys.len() > 1) {
        return Err(Error::msg(format!(
            "Database generated key `{}` cannot be part of a composite key",
            column.property
        )));
    }
    if let Some(column) = keys.iter().map(|i| &columns[*i]).find(|v| !v.selectable) {
        return Err(Error::msg(format!(
            "Key `{}` must be selectable",
            column.property
        )));
    }
    let mut relations = Vec::with_capacity(declared_relations.len());
    for declared in declared_relations {
        if relations
            .iter()
            .any(|v: &RelationDef| v.property == declared.property)
            || columns.iter().any(|v| v.property == declared.property)
        {
            return Err(Error::msg(format!(
                "Property `{}` is declared twice",
                declared.property
            )));
        }
        let slot_matches = match (declared.kind, prototype.related(declared.property)) {
            (RelationKind::ManyToOne, crate::Related::One(..)) => true,
            (RelationKind::OneToMany, crate::Related::Many(..)) => true,
            _ => false,
        };
        if !slot_matches {
            return Err(Error::msg(format!(
                "Relation `{}` is not a {} slot of the record",
                declared.property,
                match declared.kind {
                    RelationKind::ManyToOne => "single reference",
                    RelationKind::OneToMany => "collection",
                }
            )));
        }
        if !columns.iter().any(|v| v.property == declared.local_key) {
            return Err(Error::msg(format!(
                "Relation `{}` uses `{}` as local key but it is not a declared column",
                declared.property, declared.local_key
            )));
        }
        relations.push(RelationDef {
            property: declared.property,
            kind: declared.kind,
            target_type: declared.target_type,
            target: declared.target,
            local_key: declared.local_key,
            foreign_key: declared.foreign_key,
            nullable: declared.nullable,
        });
    }
    Ok(EntityMap {
        type_id: TypeId::of::<E>(),
        type_name: type_name::<E>(),
        table,
        columns,
        keys,
        auto_key,
        soft_delete,
        auto_timestamp,
        relations,
        create: create::<E>,
    })
}

#[cfg(test)]
mod tests {
    use crate::{ColumnDeclaration, Entity, EntityDeclaration, Value, entity_map, is_key_empty};
    use uuid::Uuid;

    #[derive(Default, Debug)]
    struct Shelf {
        code: String,
        room: i32,
        label: Option<String>,
        removed: bool,
    }
    crate::record!(Shelf {
        fields: [code, room, label, removed]
    });
    impl Entity for Shelf {
        fn declare() -> EntityDeclaration {
            EntityDeclaration::new()
                .column(ColumnDeclaration::new("code").key())
                .column(ColumnDeclaration::new("room").key())
                .column(ColumnDeclaration::new("label").name("shelf_label"))
                .column(ColumnDeclaration::new("removed").soft_delete())
        }
    }

    #[derive(Default, Debug)]
    struct BadKey {
        id: String,
    }
    crate::record!(BadKey { fields: [id] });
    impl Entity for BadKey {
        fn declare() -> EntityDeclaration {
            EntityDeclaration::new().column(ColumnDeclaration::new("id").auto())
        }
    }

    #[derive(Default, Debug)]
    struct Counter {
        id: i32,
        name: String,
    }
    crate::record!(Counter {
        fields: [id, name]
    });
    impl Entity for Counter {
        fn declare() -> EntityDeclaration {
            EntityDeclaration::new()
                .column(ColumnDeclaration::new("id").key().auto())
                .column(ColumnDeclaration::new("name"))
        }
    }

    #[test]
    fn derives_defaults() {
        let map = entity_map::<Shelf>().unwrap();
        assert_eq!(map.table.name, "Shelf");
        assert_eq!(map.keys, [0, 1]);
        assert_eq!(map.column("label").unwrap().name, "shelf_label");
        assert!(map.column("label").unwrap().nullable);
        assert!(!map.column("room").unwrap().nullable);
        assert_eq!(map.soft_delete_column().unwrap().name, "removed");
        assert!(map.auto_key.is_none());
        assert!(std::ptr::eq(map, entity_map::<Shelf>().unwrap()));
    }

    #[test]
    fn composite_key_is_stable() {
        let map = entity_map::<Shelf>().unwrap();
        let shelf = Shelf {
            code: "B".into(),
            room: 12,
            ..Default::default()
        };
        let first = map.composite_key(&shelf).unwrap();
        assert_eq!(first, Value::Varchar(Some("code=B;room=12;".into())));
        assert_eq!(map.composite_key(&shelf).unwrap(), first);
        assert!(!map.has_empty_key(&shelf).unwrap());
        assert!(map.has_empty_key(&Shelf::default()).unwrap());
    }

    #[test]
    fn rejects_auto_text_key() {
        let error = entity_map::<BadKey>().unwrap_err();
        assert!(format!("{:#}", error).contains("must be a Uuid or an i32"));
    }

    #[test]
    fn rejects_auto_key_without_null() {
        let error = entity_map::<Counter>().unwrap_err();
        assert!(format!("{:#}", error).contains("must be an `Option<i32>`"));
    }

    #[test]
    fn empty_keys() {
        assert!(is_key_empty(&Value::Null));
        assert!(is_key_empty(&Value::Int32(None)));
        assert!(is_key_empty(&Value::Varchar(Some("".into()))));
        assert!(is_key_empty(&Value::Uuid(Some(Uuid::nil()))));
        assert!(is_key_empty(&Value::Varchar(Some(Uuid::nil().to_string()))));
        assert!(!is_key_empty(&Value::Int32(Some(0))));
        assert!(!is_key_empty(&Value::Uuid(Some(Uuid::new_v4()))));
    }
}
