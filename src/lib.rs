pub mod api;
pub mod config;
pub mod export;
pub mod register;
pub mod services;
pub mod utils;
