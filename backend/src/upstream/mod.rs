pub mod models;
pub mod upstream_service;
