pub mod admin;
pub mod auth;
pub mod connection;
pub mod feed;
pub mod job;
pub mod like;
pub mod post;
pub mod profile;
pub mod search;
