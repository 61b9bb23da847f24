mod ast;
mod compiler;
mod fragment;

pub use ast::*;
pub use compiler::*;
pub(crate) use compiler::resolve_path;
pub use fragment::*;
