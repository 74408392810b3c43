pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod humanize;
pub mod observability;
pub mod query;
pub mod resource;
pub mod schema;
pub mod storage;
pub mod terms;
