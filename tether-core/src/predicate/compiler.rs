use crate::{
    Argument, ColumnDef, ColumnToken, CompareOp, EntityMap, Error, LogicalOp, Param, Predicate,
    Result, SqlFragment, Value, writer::Context,
};

/// Column reached by a property path.
pub(crate) struct ResolvedPath {
    pub(crate) column: &'static ColumnDef,
    pub(crate) token: ColumnToken,
}

/// Resolve `property` or `relation.property` against `map`.
pub(crate) fn resolve_path(map: &'static EntityMap, path: &str) -> Result<ResolvedPath> {
    let segments = path.split('.').collect::<Vec<_>>();
    match segments[..] {
        [property] => {
            let column = map.column(property).ok_or_else(|| {
                Error::msg(format!(
                    "Table `{}` has no column for property `{}`",
                    map.table.name, property
                ))
            })?;
            Ok(ResolvedPath {
                column,
                token: ColumnToken {
                    relation: None,
                    table: map.table.name.into(),
                    column: column.name,
                },
            })
        }
        [relation, property] => {
            let relation = map.relation(relation).ok_or_else(|| {
                Error::msg(format!(
                    "Table `{}` has no relation named `{}`",
                    map.table.name, relation
                ))
            })?;
            let target = relation.target()?;
            let column = target.column(property).ok_or_else(|| {
                Error::msg(format!(
                    "Table `{}` has no column for property `{}`",
                    target.table.name, property
                ))
            })?;
            Ok(ResolvedPath {
                column,
                token: ColumnToken {
                    relation: Some(relation.property),
                    table: target.table.name.into(),
                    column: column.name,
                },
            })
        }
        _ => Err(Error::msg(format!(
            "Cannot resolve `{}`: only one degree of nesting is supported",
            path
        ))),
    }
}

/// Translate `predicate` into a parameterized fragment over the table of `map`.
///
/// Parameter names are `<column>_<counter>`, the counter lives in `context` so fragments
/// compiled for the same statement never collide.
pub fn compile(
    predicate: &Predicate,
    map: &'static EntityMap,
    context: &mut Context,
) -> Result<SqlFragment> {
    let mut out = SqlFragment::new();
    compile_into(&mut out, predicate, map, context, false)?;
    Ok(out)
}

fn compile_into(
    out: &mut SqlFragment,
    predicate: &Predicate,
    map: &'static EntityMap,
    context: &mut Context,
    negated: bool,
) -> Result<()> {
    match predicate {
        Predicate::Compare { op, path, value } => {
            let resolved = resolve_path(map, path)?;
            let op = if negated { negate(*op) } else { *op };
            out.push_column(resolved.token);
            if value.is_null() {
                out.push_text(match op {
                    CompareOp::Equal => " IS NULL",
                    CompareOp::NotEqual => " IS NOT NULL",
                    _ => {
                        return Err(Error::msg(format!(
                            "Cannot compare `{}` with NULL using `{}`",
                            path,
                            op.as_sql()
                        )));
                    }
                });
            } else {
                out.push_text(&format!(" {} ", op.as_sql()));
                out.push_param(Param {
                    name: context.param_name(resolved.column.name),
                    value: value.clone(),
                });
            }
        }
        Predicate::Logical { op, children } => {
            let op = match (op, negated) {
                (v, false) => *v,
                (LogicalOp::And, true) => LogicalOp::Or,
                (LogicalOp::Or, true) => LogicalOp::And,
            };
            match children.as_slice() {
                [] => out.push_text(constant(op == LogicalOp::And)),
                [child] => compile_into(out, child, map, context, negated)?,
                children => {
                    out.push_text("(");
                    for (i, child) in children.iter().enumerate() {
                        if i > 0 {
                            out.push_text(op.as_sql());
                        }
                        compile_into(out, child, map, context, negated)?;
                    }
                    out.push_text(")");
                }
            }
        }
        Predicate::Call {
            method,
            path,
            argument,
        } => compile_call(out, method, path, argument, map, context, negated)?,
        Predicate::Not(inner) => compile_into(out, inner, map, context, !negated)?,
        Predicate::Constant(v) => out.push_text(constant(*v != negated)),
    }
    Ok(())
}

fn compile_call(
    out: &mut SqlFragment,
    method: &str,
    path: &str,
    argument: &Argument,
    map: &'static EntityMap,
    context: &mut Context,
    negated: bool,
) -> Result<()> {
    let pattern = |text: &str| match method {
        "starts_with" => Some(format!("{}%", text)),
        "ends_with" => Some(format!("%{}", text)),
        "contains" => Some(format!("%{}%", text)),
        _ => None,
    };
    match (method, argument) {
        ("starts_with" | "ends_with" | "contains", Argument::Value(value)) => {
            let Value::Varchar(Some(text)) = value else {
                return Err(Error::msg(format!(
                    "Method `{}` on `{}` expects a string argument, found {:?}",
                    method, path, value
                )));
            };
            let resolved = resolve_path(map, path)?;
            out.push_column(resolved.token);
            out.push_text(if negated { " NOT LIKE " } else { " LIKE " });
            out.push_param(Param {
                name: context.param_name(resolved.column.name),
                value: Value::Varchar(pattern(text)),
            });
        }
        ("in" | "contains", Argument::List(values)) => {
            let resolved = resolve_path(map, path)?;
            if values.is_empty() {
                out.push_text(constant(negated));
                return Ok(());
            }
            out.push_column(resolved.token);
            out.push_text(if negated { " NOT IN (" } else { " IN (" });
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    out.push_text(", ");
                }
                out.push_param(Param {
                    name: context.param_name(resolved.column.name),
                    value: value.clone(),
                });
            }
            out.push_text(")");
        }
        ("starts_with" | "ends_with" | "contains" | "in", _) => {
            return Err(Error::msg(format!(
                "Method `{}` on `{}` received an unexpected argument {:?}",
                method, path, argument
            )));
        }
        _ => {
            return Err(Error::msg(format!(
                "Unsupported method `{}` on `{}`",
                method, path
            )));
        }
    }
    Ok(())
}

fn negate(op: CompareOp) -> CompareOp {
    match op {
        CompareOp::Equal => CompareOp::NotEqual,
        CompareOp::NotEqual => CompareOp::Equal,
        CompareOp::Less => CompareOp::GreaterEqual,
        CompareOp::LessEqual => CompareOp::Greater,
        CompareOp::Greater => CompareOp::LessEqual,
        CompareOp::GreaterEqual => CompareOp::Less,
    }
}

fn constant(value: bool) -> &'static str {
    if value { "1 = 1" } else { "1 = 0" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        AsValue, ColumnDeclaration, Entity, EntityDeclaration, Fragment, Query, SqlWriter,
        SqliteSqlWriter, entity_map, prop,
    };

    #[derive(Default, Debug)]
    struct Writer {
        id: Option<i32>,
        name: String,
        born: Option<i32>,
    }
    crate::record!(Writer {
        fields: [id, name, born]
    });
    impl Entity for Writer {
        fn declare() -> EntityDeclaration {
            EntityDeclaration::new()
                .table("writers")
                .column(ColumnDeclaration::new("id").auto())
                .columns(["name", "born"])
        }
    }

    #[derive(Default, Debug)]
    struct Poem {
        id: Option<i32>,
        title: String,
        writer_id: Option<i32>,
        writer: Option<Box<Writer>>,
    }
    crate::record!(Poem {
        fields: [id, title, writer_id],
        one: [writer],
    });
    impl Entity for Poem {
        fn declare() -> EntityDeclaration {
            EntityDeclaration::new()
                .table("poems")
                .column(ColumnDeclaration::new("id").auto())
                .columns(["title", "writer_id"])
                .many_to_one::<Writer>("writer", "writer_id", "id")
        }
    }

    fn render(predicate: &Predicate) -> Result<Query> {
        let mut context = Context::new(Fragment::SqlSelectWhere, true);
        let fragment = compile(predicate, entity_map::<Poem>()?, &mut context)?;
        let mut out = Query::default();
        SqliteSqlWriter {}.write_fragment(&mut context, &mut out, &fragment);
        Ok(out)
    }

    #[test]
    fn comparisons_and_nulls() {
        let query = render(&(prop("title").eq("Ode") & prop("writer_id").is_null())).unwrap();
        assert_eq!(
            query.sql,
            r#"("poems"."title" = :title_0 AND "poems"."writer_id" IS NULL)"#
        );
        assert_eq!(query.params.len(), 1);
        let query = render(&!prop("writer_id").eq(Value::Int32(None))).unwrap();
        assert_eq!(query.sql, r#""poems"."writer_id" IS NOT NULL"#);
    }

    #[test]
    fn single_child_renders_bare() {
        let query = render(&crate::all([prop("id").gt(3)])).unwrap();
        assert_eq!(query.sql, r#""poems"."id" > :id_0"#);
        assert_eq!(render(&crate::any([])).unwrap().sql, "1 = 0");
    }

    #[test]
    fn like_patterns() {
        let query =
            render(&(prop("title").starts_with("A") | !prop("title").contains("b"))).unwrap();
        assert_eq!(
            query.sql,
            r#"("poems"."title" LIKE :title_0 OR "poems"."title" NOT LIKE :title_1)"#
        );
        assert_eq!(query.params[0].1, Value::Varchar(Some("A%".into())));
        assert_eq!(query.params[1].1, Value::Varchar(Some("%b%".into())));
    }

    #[test]
    fn collection_contains() {
        let query = render(&prop("id").is_in([1, 2])).unwrap();
        assert_eq!(query.sql, r#""poems"."id" IN (:id_0, :id_1)"#);
        assert_eq!(render(&prop("id").is_in(Vec::<i32>::new())).unwrap().sql, "1 = 0");
        assert_eq!(
            render(&!prop("id").is_in(Vec::<i32>::new())).unwrap().sql,
            "1 = 1"
        );
    }

    #[test]
    fn one_level_of_nesting() {
        let query = render(&prop("writer.born").eq(1934)).unwrap();
        assert_eq!(query.sql, r#""writers"."born" = :born_0"#);
        let error = render(&prop("writer.poems.title").eq("x")).unwrap_err();
        assert!(error.to_string().contains("only one degree of nesting is supported"));
    }

    #[test]
    fn unknown_method() {
        let predicate = prop("title").call("matches", Argument::Value("x".as_value()));
        assert!(render(&predicate).is_err());
    }
}
