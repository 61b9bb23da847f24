use crate::{
    ColumnToken, EntityMap, Error, Fragment, Predicate, RelationDef, RelationKind, Result,
    SqlFragment, TableRef, compile, resolve_path, statement::not_deleted, writer::Context,
};
use std::collections::HashMap;

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

/// Per call select behavior.
#[derive(Default, Debug, Clone)]
pub struct SelectOptions {
    /// Maximum number of joined rows.
    pub limit: Option<u32>,
    pub order_by: Vec<(String, Order)>,
    /// Return soft deleted rows as well.
    pub include_deleted: bool,
}

impl SelectOptions {
    pub fn new() -> Self {
        Default::default()
    }
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
    pub fn order_by(mut self, path: impl Into<String>, order: Order) -> Self {
        self.order_by.push((path.into(), order));
        self
    }
    pub fn include_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

#[derive(Debug, Clone)]
pub struct JoinDef {
    pub kind: JoinKind,
    pub table: TableRef,
    pub alias: String,
    pub on: SqlFragment,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectColumn {
    /// `NULL AS split_n` marking the start of a table.
    Split { alias: String },
    Column {
        table: String,
        column: &'static str,
        alias: String,
    },
}

/// Position of the columns of one table inside the joined row.
#[derive(Debug, Clone)]
pub struct Segment {
    /// Relation producing the segment, `None` for the root table.
    pub relation: Option<&'static RelationDef>,
    pub map: &'static EntityMap,
    pub alias: String,
    /// Index of the split column.
    pub start: usize,
    /// Properties of the columns following the split column.
    pub properties: Vec<&'static str>,
}

impl Segment {
    /// Row index of `property`.
    pub fn position(&self, property: &str) -> Option<usize> {
        self.properties
            .iter()
            .position(|v| *v == property)
            .map(|i| self.start + 1 + i)
    }
}

#[derive(Debug, Clone)]
pub struct SelectStatement {
    pub table: TableRef,
    pub alias: String,
    pub columns: Vec<SelectColumn>,
    pub joins: Vec<JoinDef>,
    pub filter: SqlFragment,
    pub order_by: Vec<(ColumnToken, Order)>,
    pub limit: Option<u32>,
    pub segments: Vec<Segment>,
}

/// Aliases tables so that the same table can be joined more than once: `people`, `people__1`.
#[derive(Default)]
struct Aliases(HashMap<&'static str, usize>);

impl Aliases {
    fn next(&mut self, table: &'static str) -> String {
        let count = self.0.entry(table).or_default();
        let alias = if *count == 0 {
            table.to_string()
        } else {
            format!("{}__{}", table, count)
        };
        *count += 1;
        alias
    }
}

fn push_segment(
    statement: &mut SelectStatement,
    relation: Option<&'static RelationDef>,
    map: &'static EntityMap,
    alias: String,
) {
    let start = statement.columns.len();
    statement.columns.push(SelectColumn::Split {
        alias: format!("split_{}", statement.segments.len()),
    });
    let mut properties = Vec::new();
    for column in map.columns.iter().filter(|v| v.selectable) {
        statement.columns.push(SelectColumn::Column {
            table: alias.clone(),
            column: column.name,
            alias: format!("{}__{}", alias, column.name),
        });
        properties.push(column.property);
    }
    statement.segments.push(Segment {
        relation,
        map,
        alias,
        start,
        properties,
    });
}

fn column_token(map: &EntityMap, alias: &str, property: &str) -> Result<ColumnToken> {
    let column = map.column(property).ok_or_else(|| {
        Error::msg(format!(
            "Table `{}` has no column for property `{}`",
            map.table.name, property
        ))
    })?;
    Ok(ColumnToken {
        relation: None,
        table: alias.into(),
        column: column.name,
    })
}

/// Joined select of `map` filtered by `predicate`, including the relations named in `includes`.
///
/// Every table contributes a split column followed by its selectable columns, the row layout is
/// described by `segments`. Relation properties used in `predicate` or in the ordering must be
/// included.
pub fn select(
    map: &'static EntityMap,
    predicate: &Predicate,
    includes: &[&str],
    options: &SelectOptions,
) -> Result<SelectStatement> {
    let mut context = Context::new(Fragment::SqlSelect, true);
    let mut aliases = Aliases::default();
    let alias = aliases.next(map.table.name);
    let mut statement = SelectStatement {
        table: map.table,
        alias: alias.clone(),
        columns: Vec::new(),
        joins: Vec::new(),
        filter: SqlFragment::new(),
        order_by: Vec::new(),
        limit: options.limit,
        segments: Vec::new(),
    };
    push_segment(&mut statement, None, map, alias.clone());
    let mut relation_aliases = HashMap::new();
    for include in includes {
        let relation = map.relation(include).ok_or_else(|| {
            Error::msg(format!(
                "Table `{}` has no relation named `{}`",
                map.table.name, include
            ))
        })?;
        if relation_aliases.contains_key(relation.property) {
            return Err(Error::msg(format!(
                "Relation `{}` is included more than once",
                relation.property
            )));
        }
        let target = relation.target()?;
        let target_alias = aliases.next(target.table.name);
        let (kind, on) = match relation.kind {
            RelationKind::ManyToOne => {
                let mut on = SqlFragment::new();
                on.push_column(column_token(target, &target_alias, relation.foreign_key)?);
                on.push_text(" = ");
                on.push_column(column_token(map, &alias, relation.local_key)?);
                let kind = if relation.nullable {
                    JoinKind::Left
                } else {
                    JoinKind::Inner
                };
                (kind, on)
            }
            RelationKind::OneToMany => {
                let mut on = SqlFragment::new();
                on.push_column(column_token(target, &target_alias, relation.foreign_key)?);
                on.push_text(" = ");
                on.push_column(column_token(map, &alias, relation.local_key)?);
                if !options.include_deleted {
                    if let Some(filter) = not_deleted(target, &target_alias, &mut context) {
                        on.push_text(" AND ");
                        on.append(filter);
                    }
                }
                (JoinKind::Left, on)
            }
        };
        statement.joins.push(JoinDef {
            kind,
            table: target.table,
            alias: target_alias.clone(),
            on,
        });
        push_segment(&mut statement, Some(relation), target, target_alias.clone());
        relation_aliases.insert(relation.property, target_alias);
    }
    let qualify = |mut token: ColumnToken| -> Result<ColumnToken> {
        if let Some(relation) = token.relation {
            token.table = relation_aliases
                .get(relation)
                .ok_or_else(|| {
                    Error::msg(format!(
                        "Relation `{}` must be included to be used in a filter or an ordering",
                        relation
                    ))
                })?
                .clone();
        } else {
            token.table = alias.clone();
        }
        Ok(token)
    };
    let mut filter = if matches!(predicate, Predicate::Constant(true)) {
        SqlFragment::new()
    } else {
        let mut context = context.switch_fragment(Fragment::SqlSelectWhere);
        compile(predicate, map, &mut context.current)?
    };
    for column in filter.columns_mut() {
        *column = qualify(column.clone())?;
    }
    if !options.include_deleted {
        if let Some(not_deleted) = not_deleted(map, &alias, &mut context) {
            if filter.is_empty() {
                filter = not_deleted;
            } else {
                filter.push_text(" AND ");
                filter.append(not_deleted);
            }
        }
    }
    statement.filter = filter;
    for (path, order) in &options.order_by {
        let resolved = resolve_path(map, path)?;
        statement.order_by.push((qualify(resolved.token)?, *order));
    }
    Ok(statement)
}
