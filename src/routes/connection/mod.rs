mod handler;
mod model;

pub use handler::{add_connection, remove_connection};
pub use model::PgRelationshipSource;
