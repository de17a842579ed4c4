pub mod auth;
pub mod blob;
pub mod schema;
pub mod workflow;
