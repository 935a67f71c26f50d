//! Networked backend over `tokio-postgres`.

mod bootstrap;
mod params;
mod query;

pub use bootstrap::{PostgresBootstrap, PostgresStrategy};
pub use params::Params;
pub use query::build_result_set;
