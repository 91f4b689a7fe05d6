/// Database plumbing: connection pool and schema migrations
///
/// Queries live with their models in [`crate::models`]; the authorities reach
/// them through [`crate::store`].

pub mod migrations;
pub mod pool;
