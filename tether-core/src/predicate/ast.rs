use crate::{AsValue, Value};
use std::{
    borrow::Cow,
    fmt::{self, Display, Formatter},
    ops,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Equal => "=",
            CompareOp::NotEqual => "<>",
            CompareOp::Less => "<",
            CompareOp::LessEqual => "<=",
            CompareOp::Greater => ">",
            CompareOp::GreaterEqual => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            LogicalOp::And => " AND ",
            LogicalOp::Or => " OR ",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Value(Value),
    List(Vec<Value>),
}

/// Filter over the properties of an entity.
///
/// Paths name a property of the entity (`title`) or a property of a related entity
/// (`author.birth_year`).
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        op: CompareOp,
        path: String,
        value: Value,
    },
    Logical {
        op: LogicalOp,
        children: Vec<Predicate>,
    },
    /// Method applied to a property, resolved by name when compiled.
    Call {
        method: Cow<'static, str>,
        path: String,
        argument: Argument,
    },
    Not(Box<Predicate>),
    Constant(bool),
}

impl Predicate {
    /// Matches every row.
    pub fn always() -> Self {
        Predicate::Constant(true)
    }
    pub fn and(self, other: Predicate) -> Self {
        Self::combine(LogicalOp::And, [self, other])
    }
    pub fn or(self, other: Predicate) -> Self {
        Self::combine(LogicalOp::Or, [self, other])
    }
    pub fn not(self) -> Self {
        match self {
            Predicate::Not(inner) => *inner,
            Predicate::Constant(v) => Predicate::Constant(!v),
            v => Predicate::Not(Box::new(v)),
        }
    }
    /// Nested nodes with the same operator are flattened into a single list.
    pub fn combine(op: LogicalOp, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        let mut children = Vec::new();
        for predicate in predicates {
            match predicate {
                Predicate::Logical {
                    op: inner,
                    children: nested,
                } if inner == op => children.extend(nested),
                v => children.push(v),
            }
        }
        Predicate::Logical { op, children }
    }
}

pub fn all(predicates: impl IntoIterator<Item = Predicate>) -> Predicate {
    Predicate::combine(LogicalOp::And, predicates)
}

pub fn any(predicates: impl IntoIterator<Item = Predicate>) -> Predicate {
    Predicate::combine(LogicalOp::Or, predicates)
}

impl ops::BitAnd for Predicate {
    type Output = Predicate;
    fn bitand(self, rhs: Self) -> Self::Output {
        self.and(rhs)
    }
}

impl ops::BitOr for Predicate {
    type Output = Predicate;
    fn bitor(self, rhs: Self) -> Self::Output {
        self.or(rhs)
    }
}

impl ops::Not for Predicate {
    type Output = Predicate;
    fn not(self) -> Self::Output {
        Predicate::not(self)
    }
}

/// Starting point of the fluent builder.
///
/// ```rust
/// use tether_core::prop;
/// let filter = prop("author.birth_year").eq(1934) & !prop("title").starts_with("The");
/// ```
pub fn prop(path: impl Into<String>) -> Property {
    Property { path: path.into() }
}

#[derive(Debug, Clone)]
pub struct Property {
    path: String,
}

impl Property {
    fn compare(self, op: CompareOp, value: impl AsValue) -> Predicate {
        Predicate::Compare {
            op,
            path: self.path,
            value: value.as_value(),
        }
    }
    pub fn eq(self, value: impl AsValue) -> Predicate {
        self.compare(CompareOp::Equal, value)
    }
    pub fn ne(self, value: impl AsValue) -> Predicate {
        self.compare(CompareOp::NotEqual, value)
    }
    pub fn lt(self, value: impl AsValue) -> Predicate {
        self.compare(CompareOp::Less, value)
    }
    pub fn le(self, value: impl AsValue) -> Predicate {
        self.compare(CompareOp::LessEqual, value)
    }
    pub fn gt(self, value: impl AsValue) -> Predicate {
        self.compare(CompareOp::Greater, value)
    }
    pub fn ge(self, value: impl AsValue) -> Predicate {
        self.compare(CompareOp::GreaterEqual, value)
    }
    pub fn is_null(self) -> Predicate {
        self.compare(CompareOp::Equal, Value::Null)
    }
    pub fn is_not_null(self) -> Predicate {
        self.compare(CompareOp::NotEqual, Value::Null)
    }
    pub fn starts_with(self, value: impl Into<String>) -> Predicate {
        self.call("starts_with", Argument::Value(Value::Varchar(Some(value.into()))))
    }
    pub fn ends_with(self, value: impl Into<String>) -> Predicate {
        self.call("ends_with", Argument::Value(Value::Varchar(Some(value.into()))))
    }
    pub fn contains(self, value: impl Into<String>) -> Predicate {
        self.call("contains", Argument::Value(Value::Varchar(Some(value.into()))))
    }
    /// Property value is one of `values`.
    pub fn is_in<T: AsValue>(self, values: impl IntoIterator<Item = T>) -> Predicate {
        self.call(
            "in",
            Argument::List(values.into_iter().map(AsValue::as_value).collect()),
        )
    }
    /// Method by name, unknown names are rejected by the compiler.
    pub fn call(self, method: impl Into<Cow<'static, str>>, argument: Argument) -> Predicate {
        Predicate::Call {
            method: method.into(),
            path: self.path,
            argument,
        }
    }
}

impl Display for Predicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Compare { op, path, value } => {
                write!(f, "{} {} {:?}", path, op.as_sql(), value)
            }
            Predicate::Logical { op, children } => {
                f.write_str("(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(op.as_sql())?;
                    }
                    write!(f, "{}", child)?;
                }
                f.write_str(")")
            }
            Predicate::Call {
                method,
                path,
                argument,
            } => write!(f, "{}.{}({:?})", path, method, argument),
            Predicate::Not(inner) => write!(f, "NOT {}", inner),
            Predicate::Constant(v) => write!(f, "{}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_same_operator() {
        let predicate = prop("a").eq(1) & prop("b").eq(2) & (prop("c").eq(3) | prop("d").eq(4));
        let Predicate::Logical { op, children } = predicate else {
            panic!("Expected a logical node");
        };
        assert_eq!(op, LogicalOp::And);
        assert_eq!(children.len(), 3);
        assert!(matches!(
            children[2],
            Predicate::Logical {
                op: LogicalOp::Or,
                ..
            }
        ));
    }

    #[test]
    fn double_negation() {
        let predicate = prop("title").contains("x");
        assert_eq!(!!predicate.clone(), predicate);
        assert_eq!(!Predicate::always(), Predicate::Constant(false));
    }
}
