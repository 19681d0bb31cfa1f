mod handler;
mod model;

pub use handler::like_post;
