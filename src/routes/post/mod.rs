mod handler;
mod model;

pub use handler::{create_post, update_post};
