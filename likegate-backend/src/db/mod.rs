mod sqlite;
pub mod tables;

pub use sqlite::Database;
pub(crate) use sqlite::{opt_time_column, time_column, to_db_time};
