mod handler;
mod model;

pub use handler::{get_about, get_brand_posts, get_education, get_profile, get_work, put_about};
