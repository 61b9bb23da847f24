/// Apply `f` to every value writing `separator` between the non empty outputs.
pub fn separated_by<T, F>(
    out: &mut String,
    values: impl IntoIterator<Item = T>,
    mut f: F,
    separator: &str,
) where
    F: FnMut(&mut String, T),
{
    let mut len = out.len();
    for v in values {
        if out.len() > len {
            out.push_str(separator);
        }
        len = out.len();
        f(out, v);
    }
}

/// Last segment of a type path: `my_crate::model::Book` becomes `Book`.
pub fn short_type_name(name: &'static str) -> &'static str {
    let name = name.split('<').next().unwrap_or(name);
    name.rsplit("::").next().unwrap_or(name)
}

/// Longest prefix of `text` at most `max` bytes long that ends on a char boundary.
pub fn truncate_at(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let end = text
        .char_indices()
        .map(|(i, _)| i)
        .take_while(|i| *i <= max)
        .last()
        .unwrap_or(0);
    &text[..end]
}

#[macro_export]
macro_rules! truncate_long {
    ($query:expr) => {
        format_args!(
            "{}{}",
            $crate::truncate_at(&$query, 497).trim_end(),
            if $query.len() > 497 { "..." } else { "" },
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separated() {
        let mut out = String::from("(");
        separated_by(&mut out, ["a", "", "b"], |out, v| out.push_str(v), ", ");
        assert_eq!(out, "(a, b");
    }

    #[test]
    fn type_names() {
        assert_eq!(short_type_name("library::model::Book"), "Book");
        assert_eq!(short_type_name("Book"), "Book");
        assert_eq!(short_type_name("library::Wrapper<library::Book>"), "Wrapper");
    }

    #[test]
    fn truncate_multibyte() {
        let sql = format!("SELECT {}\"é\" FROM t", "a".repeat(488));
        assert_eq!(sql.as_bytes()[496], 0xC3);
        let truncated = truncate_at(&sql, 497);
        assert_eq!(truncated.len(), 496);
        assert!(truncated.ends_with('"'));
        let logged = format!("{}", truncate_long!(sql));
        assert!(logged.ends_with("\"..."));
        assert_eq!(truncate_at("short", 497), "short");
        assert_eq!(truncate_at("héllo", 2), "h");
    }
}
