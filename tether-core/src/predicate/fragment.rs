use crate::Value;

/// Named parameter with its bound value.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub value: Value,
}

/// Column reference left unquoted until a dialect renders it.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnToken {
    /// Relation property the column was reached through, `None` for the root table.
    pub relation: Option<&'static str>,
    /// Table name or alias qualifying the column.
    pub table: String,
    pub column: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Text(String),
    Column(ColumnToken),
    Param(Param),
}

/// Dialect agnostic SQL piece produced by the predicate compiler.
///
/// Identifiers and placeholders stay symbolic, the [`SqlWriter`](crate::SqlWriter) turns them
/// into the dialect syntax. Parameters are carried inline so they come out in order of
/// appearance.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct SqlFragment {
    pub tokens: Vec<Token>,
}

impl SqlFragment {
    pub fn new() -> Self {
        Default::default()
    }
    pub fn text(value: &str) -> Self {
        let mut result = Self::new();
        result.push_text(value);
        result
    }
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
    pub fn push_text(&mut self, value: &str) {
        if value.is_empty() {
            return;
        }
        if let Some(Token::Text(last)) = self.tokens.last_mut() {
            last.push_str(value);
        } else {
            self.tokens.push(Token::Text(value.into()));
        }
    }
    pub fn push_column(&mut self, column: ColumnToken) {
        self.tokens.push(Token::Column(column));
    }
    pub fn push_param(&mut self, param: Param) {
        self.tokens.push(Token::Param(param));
    }
    pub fn append(&mut self, other: SqlFragment) {
        for token in other.tokens {
            match token {
                Token::Text(v) => self.push_text(&v),
                v => self.tokens.push(v),
            }
        }
    }
    /// Parameters in order of appearance.
    pub fn params(&self) -> impl Iterator<Item = &Param> {
        self.tokens.iter().filter_map(|v| match v {
            Token::Param(v) => Some(v),
            _ => None,
        })
    }
    pub fn columns_mut(&mut self) -> impl Iterator<Item = &mut ColumnToken> {
        self.tokens.iter_mut().filter_map(|v| match v {
            Token::Column(v) => Some(v),
            _ => None,
        })
    }
    /// Relation properties referenced by the fragment.
    pub fn relations(&self) -> impl Iterator<Item = &'static str> {
        self.tokens.iter().filter_map(|v| match v {
            Token::Column(ColumnToken {
                relation: Some(relation),
                ..
            }) => Some(*relation),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_adjacent_text() {
        let mut fragment = SqlFragment::text("(");
        fragment.push_text("1 = 1");
        fragment.push_param(Param {
            name: "a_0".into(),
            value: Value::Int32(Some(1)),
        });
        fragment.append(SqlFragment::text(")"));
        assert_eq!(fragment.tokens.len(), 3);
        assert_eq!(fragment.tokens[0], Token::Text("(1 = 1".into()));
        assert_eq!(fragment.params().count(), 1);
    }
}
