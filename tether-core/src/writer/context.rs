#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment {
    #[default]
    None,
    SqlCreateTable,
    SqlCreateTablePrimaryKey,
    SqlDeleteFrom,
    SqlDeleteFromWhere,
    SqlDropTable,
    SqlInsertInto,
    SqlInsertIntoValues,
    SqlJoin,
    SqlSelect,
    SqlSelectFrom,
    SqlSelectOrderBy,
    SqlSelectWhere,
    SqlUpdate,
    SqlUpdateSet,
    SqlUpdateWhere,
}

/// State threaded through compilation and rendering.
///
/// `counter` names parameters while predicates are compiled and numbers positional
/// placeholders while statements are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    pub counter: u32,
    pub fragment: Fragment,
    pub qualify_columns: bool,
}

impl Context {
    pub fn new(fragment: Fragment, qualify_columns: bool) -> Self {
        Self {
            counter: 0,
            fragment,
            qualify_columns,
        }
    }
    /// Next unique parameter name for `column`.
    pub fn param_name(&mut self, column: &str) -> String {
        let name = format!("{}_{}", column, self.counter);
        self.counter += 1;
        name
    }
}

impl Context {
    pub fn switch_fragment<'s>(&'s mut self, fragment: Fragment) -> ContextUpdater<'s> {
        ContextUpdater {
            current: Context { fragment, ..*self },
            previous: self,
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new(Fragment::None, true)
    }
}

pub struct ContextUpdater<'a> {
    pub current: Context,
    pub previous: &'a mut Context,
}

impl<'a> Drop for ContextUpdater<'a> {
    fn drop(&mut self) {
        self.previous.counter = self.current.counter;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_survives_fragment_switch() {
        let mut context = Context::new(Fragment::SqlSelect, true);
        assert_eq!(context.param_name("year"), "year_0");
        {
            let mut inner = context.switch_fragment(Fragment::SqlSelectWhere);
            assert_eq!(inner.current.fragment, Fragment::SqlSelectWhere);
            assert_eq!(inner.current.param_name("title"), "title_1");
        }
        assert_eq!(context.fragment, Fragment::SqlSelect);
        assert_eq!(context.param_name("year"), "year_2");
    }
}
