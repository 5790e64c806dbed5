pub mod auth;
pub mod bootstrap;
pub mod crud;
pub mod dashboard_service;
pub mod data_loader;
pub mod events;
pub mod gateway;
pub mod session_cache;
pub mod shell;
pub mod tenancy_service;
