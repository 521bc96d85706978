pub mod document;
pub mod operation;
pub mod query;
pub mod vm;

pub use document::*;
pub use operation::*;
pub use query::*;
pub use vm::*;
