use crate::{Entity, EntityMap, RelationKind, Result, entity_map};

/// Markers of a single mapped property.
#[derive(Debug, Clone)]
pub struct ColumnDeclaration {
    pub(crate) property: &'static str,
    pub(crate) name: Option<&'static str>,
    pub(crate) key: bool,
    pub(crate) auto: bool,
    pub(crate) updatable: bool,
    pub(crate) selectable: bool,
    pub(crate) soft_delete: bool,
    pub(crate) auto_timestamp: bool,
    pub(crate) nullable: bool,
}

impl ColumnDeclaration {
    pub fn new(property: &'static str) -> Self {
        Self {
            property,
            name: None,
            key: false,
            auto: false,
            updatable: true,
            selectable: true,
            soft_delete: false,
            auto_timestamp: false,
            nullable: false,
        }
    }
    /// Column name, defaults to the property name.
    pub fn name(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }
    /// Part of the primary key.
    pub fn key(mut self) -> Self {
        self.key = true;
        self
    }
    /// Primary key generated on insert (client side for `Uuid`, by the database for `i32`).
    pub fn auto(mut self) -> Self {
        self.key = true;
        self.auto = true;
        self
    }
    pub fn not_updatable(mut self) -> Self {
        self.updatable = false;
        self
    }
    pub fn not_selectable(mut self) -> Self {
        self.selectable = false;
        self
    }
    /// Boolean flag marking the row as deleted instead of removing it.
    pub fn soft_delete(mut self) -> Self {
        self.soft_delete = true;
        self
    }
    /// Timestamp refreshed on every write.
    pub fn auto_timestamp(mut self) -> Self {
        self.auto_timestamp = true;
        self
    }
    /// Accept NULL even if the field type is not an `Option`.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

impl From<&'static str> for ColumnDeclaration {
    fn from(value: &'static str) -> Self {
        ColumnDeclaration::new(value)
    }
}

#[derive(Debug, Clone)]
pub struct RelationDeclaration {
    pub(crate) property: &'static str,
    pub(crate) kind: RelationKind,
    pub(crate) target_type: &'static str,
    pub(crate) target: fn() -> Result<&'static EntityMap>,
    pub(crate) local_key: &'static str,
    pub(crate) foreign_key: &'static str,
    pub(crate) nullable: bool,
}

/// Explicit schema descriptor returned by [`Entity::declare`].
///
/// ```rust,ignore
/// EntityDeclaration::new()
///     .table("books")
///     .column(ColumnDeclaration::new("id").auto())
///     .columns(["title", "author_id"])
///     .many_to_one::<Author>("author", "author_id", "id")
/// ```
#[derive(Debug, Clone, Default)]
pub struct EntityDeclaration {
    pub(crate) table: Option<&'static str>,
    pub(crate) schema: &'static str,
    pub(crate) columns: Vec<ColumnDeclaration>,
    pub(crate) relations: Vec<RelationDeclaration>,
}

impl EntityDeclaration {
    pub fn new() -> Self {
        Default::default()
    }
    /// Table name, defaults to the type name.
    pub fn table(mut self, name: &'static str) -> Self {
        self.table = Some(name);
        self
    }
    pub fn schema(mut self, schema: &'static str) -> Self {
        self.schema = schema;
        self
    }
    pub fn column(mut self, column: impl Into<ColumnDeclaration>) -> Self {
        self.columns.push(column.into());
        self
    }
    /// Plain columns named after their property.
    pub fn columns<const N: usize>(mut self, properties: [&'static str; N]) -> Self {
        self.columns
            .extend(properties.into_iter().map(ColumnDeclaration::new));
        self
    }
    /// `property` holds a single `T`, `local_key` is the foreign key column on this entity and
    /// `foreign_key` the referenced column of `T`.
    pub fn many_to_one<T: Entity>(
        self,
        property: &'static str,
        local_key: &'static str,
        foreign_key: &'static str,
    ) -> Self {
        self.relation::<T>(RelationKind::ManyToOne, property, local_key, foreign_key)
    }
    /// `property` holds a collection of `T`, `local_key` is the referenced column on this entity
    /// and `foreign_key` the column of `T` pointing back.
    pub fn one_to_many<T: Entity>(
        self,
        property: &'static str,
        local_key: &'static str,
        foreign_key: &'static str,
    ) -> Self {
        self.relation::<T>(RelationKind::OneToMany, property, local_key, foreign_key)
    }
    /// Mark the last declared relation as optional.
    pub fn nullable(mut self) -> Self {
        if let Some(relation) = self.relations.last_mut() {
            relation.nullable = true;
        }
        self
    }
    fn relation<T: Entity>(
        mut self,
        kind: RelationKind,
        property: &'static str,
        local_key: &'static str,
        foreign_key: &'static str,
    ) -> Self {
        self.relations.push(RelationDeclaration {
            property,
            kind,
            target_type: std::any::type_name::<T>(),
            target: entity_map::<T>,
            local_key,
            foreign_key,
            nullable: false,
        });
        self
    }
}
