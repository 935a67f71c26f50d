//! Embedded backend over `rusqlite`.

mod bootstrap;
mod params;
mod query;

pub use bootstrap::{SqliteBootstrap, SqliteStrategy};
pub use params::convert_params;
pub use query::build_result_set;
