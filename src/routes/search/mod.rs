mod handler;
mod model;

pub use handler::{clear_recent_searches, recent_searches, search};
