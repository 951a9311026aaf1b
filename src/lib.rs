pub mod api;
pub mod app_state;
pub mod config;
pub mod errors;
pub mod models;
pub mod repositories;
pub mod services;
pub mod surface;

#[cfg(test)]
pub mod test_utils;
