pub mod handlers;
pub mod models;
pub mod reconciler;
pub mod repository;
