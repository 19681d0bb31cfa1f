mod handler;
mod model;

pub use handler::{list_jobs, post_job};
