use crate::{EntityMap, TableRef};

#[derive(Debug, Clone)]
pub struct CreateTableStatement {
    pub map: &'static EntityMap,
    pub if_not_exists: bool,
}

#[derive(Debug, Clone)]
pub struct DropTableStatement {
    pub table: TableRef,
    pub if_exists: bool,
}

pub fn create_table(map: &'static EntityMap, if_not_exists: bool) -> CreateTableStatement {
    CreateTableStatement { map, if_not_exists }
}

pub fn drop_table(map: &EntityMap, if_exists: bool) -> DropTableStatement {
    DropTableStatement {
        table: map.table,
        if_exists,
    }
}
