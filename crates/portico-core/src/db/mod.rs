pub mod lifecycle;
pub mod worker;

pub use lifecycle::DbManager;
pub use worker::{DbError, DbHandle};
