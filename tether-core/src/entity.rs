use crate::{
    AsValue, Connection, EntityDeclaration, Executor, Predicate, Record, Result, persist,
};
use std::future::Future;

/// A type persisted in a table.
///
/// `declare` is the explicit schema of the type, the [`Record`] implementation gives the
/// persistence layer access to its fields and relations. The remaining methods are shortcuts to
/// the functions of [`persist`](crate::persist).
pub trait Entity: Record + Default {
    fn declare() -> EntityDeclaration;

    fn create_table<Exec: Executor>(
        executor: &mut Exec,
        if_not_exists: bool,
    ) -> impl Future<Output = Result<()>> {
        persist::create_table::<Self, _>(executor, if_not_exists)
    }

    fn drop_table<Exec: Executor>(
        executor: &mut Exec,
        if_exists: bool,
    ) -> impl Future<Output = Result<()>> {
        persist::drop_table::<Self, _>(executor, if_exists)
    }

    fn find_by_id<C: Connection>(
        connection: &mut C,
        id: impl AsValue,
        includes: &[&str],
    ) -> impl Future<Output = Result<Option<Self>>> {
        persist::find_by_id::<Self, _>(connection, id, includes)
    }

    fn select<C: Connection>(
        connection: &mut C,
        predicate: &Predicate,
        includes: &[&str],
    ) -> impl Future<Output = Result<Vec<Self>>> {
        persist::select::<Self, _>(connection, predicate, includes)
    }

    fn insert<C: Connection>(&mut self, connection: &mut C) -> impl Future<Output = Result<()>> {
        persist::insert(connection, self)
    }

    fn update<C: Connection>(
        &mut self,
        connection: &mut C,
        includes: &[&str],
    ) -> impl Future<Output = Result<()>> {
        persist::update(connection, self, includes)
    }

    fn delete<C: Connection>(&mut self, connection: &mut C) -> impl Future<Output = Result<()>> {
        persist::delete(connection, self)
    }
}
