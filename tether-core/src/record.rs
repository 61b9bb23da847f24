use crate::{EntityMap, Error, Result, Value};
use std::{any::Any, fmt::Debug};

/// Object safe view of an entity instance.
///
/// This is the capability table the orchestrator works with: it reads and writes mapped fields
/// by property name and walks relation slots without knowing the concrete type on the other
/// end. Implementations are usually generated with [`record!`](crate::record).
pub trait Record: Any + Debug {
    /// Metadata of the concrete type.
    fn entity_map(&self) -> Result<&'static EntityMap>;
    /// Current value of a scalar property, `None` if the property does not exist.
    fn field(&self, property: &str) -> Option<Value>;
    /// Assign a scalar property converting the value into the field type.
    fn set_field(&mut self, property: &str, value: Value) -> Result<()>;
    /// Borrow a relation slot.
    fn related(&self, property: &str) -> Related<'_>;
    /// Mutably borrow a relation slot.
    fn related_mut(&mut self, property: &str) -> RelatedMut<'_>;
    /// Store a record in a relation slot: replaces a single reference, appends to a collection.
    fn attach(&mut self, property: &str, record: Box<dyn Record>) -> Result<()>;
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

/// Borrowed content of a relation slot.
#[derive(Debug)]
pub enum Related<'a> {
    /// The property is not a relation.
    Missing,
    /// Single reference, `None` when not set.
    One(Option<&'a dyn Record>),
    /// Collection.
    Many(Vec<&'a dyn Record>),
}

/// Mutably borrowed content of a relation slot.
#[derive(Debug)]
pub enum RelatedMut<'a> {
    Missing,
    One(Option<&'a mut dyn Record>),
    Many(Vec<&'a mut dyn Record>),
}

/// Recover the concrete type of a boxed record.
pub fn downcast<T: Record>(record: Box<dyn Record>) -> Result<Box<T>> {
    let table = record
        .entity_map()
        .map(|v| v.table.name)
        .unwrap_or_default();
    record.into_any().downcast::<T>().map_err(|_| {
        Error::msg(format!(
            "Record of table `{}` is not a {}",
            table,
            std::any::type_name::<T>()
        ))
    })
}

/// Implements [`Record`] for a struct by listing its mapped fields.
///
/// Scalar fields must implement [`AsValue`](crate::AsValue) and `Clone`, `one` slots are
/// `Option<Box<T>>` and `many` slots are `Vec<T>` where `T` is another entity.
///
/// ```rust,ignore
/// record!(Book {
///     fields: [id, title, author_id],
///     one: [author],
///     many: [reviews],
/// });
/// ```
#[macro_export]
macro_rules! record {
    (
        $name:ident {
            fields: [$($field:ident),* $(,)?]
            $(, one: [$($one:ident),* $(,)?])?
            $(, many: [$($many:ident),* $(,)?])?
            $(,)?
        }
    ) => {
        impl $crate::Record for $name {
            fn entity_map(&self) -> $crate::Result<&'static $crate::EntityMap> {
                $crate::entity_map::<Self>()
            }
            fn field(&self, property: &str) -> ::std::option::Option<$crate::Value> {
                match property {
                    $(stringify!($field) => ::std::option::Option::Some(
                        $crate::AsValue::as_value(::std::clone::Clone::clone(&self.$field)),
                    ),)*
                    _ => ::std::option::Option::None,
                }
            }
            fn set_field(&mut self, property: &str, value: $crate::Value) -> $crate::Result<()> {
                match property {
                    $(stringify!($field) => {
                        self.$field = $crate::AsValue::try_from_value(value).map_err(|e| {
                            e.context(format!(
                                "While assigning property `{}` of `{}`",
                                property,
                                stringify!($name)
                            ))
                        })?;
                        Ok(())
                    })*
                    _ => Err($crate::Error::msg(format!(
                        "`{}` has no property named `{}`",
                        stringify!($name),
                        property
                    ))),
                }
            }
            fn related(&self, property: &str) -> $crate::Related<'_> {
                match property {
                    $($(stringify!($one) => $crate::Related::One(
                        self.$one.as_deref().map(|v| v as &dyn $crate::Record),
                    ),)*)?
                    $($(stringify!($many) => $crate::Related::Many(
                        self.$many.iter().map(|v| v as &dyn $crate::Record).collect(),
                    ),)*)?
                    _ => $crate::Related::Missing,
                }
            }
            fn related_mut(&mut self, property: &str) -> $crate::RelatedMut<'_> {
                match property {
                    $($(stringify!($one) => $crate::RelatedMut::One(
                        self.$one.as_deref_mut().map(|v| v as &mut dyn $crate::Record),
                    ),)*)?
                    $($(stringify!($many) => $crate::RelatedMut::Many(
                        self.$many.iter_mut().map(|v| v as &mut dyn $crate::Record).collect(),
                    ),)*)?
                    _ => $crate::RelatedMut::Missing,
                }
            }
            #[allow(unused_variables)]
            fn attach(
                &mut self,
                property: &str,
                record: ::std::boxed::Box<dyn $crate::Record>,
            ) -> $crate::Result<()> {
                match property {
                    $($(stringify!($one) => {
                        self.$one = ::std::option::Option::Some($crate::downcast(record)?);
                        Ok(())
                    })*)?
                    $($(stringify!($many) => {
                        self.$many.push(*$crate::downcast(record)?);
                        Ok(())
                    })*)?
                    _ => Err($crate::Error::msg(format!(
                        "`{}` has no relation named `{}`",
                        stringify!($name),
                        property
                    ))),
                }
            }
            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }
            fn into_any(self: ::std::boxed::Box<Self>) -> ::std::boxed::Box<dyn ::std::any::Any> {
                self
            }
        }
    };
}
