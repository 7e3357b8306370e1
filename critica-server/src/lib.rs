//! Critica server library: configuration, identity middleware, request
//! handlers and route assembly for the review API.

pub mod auth;
pub mod errors;
pub mod handlers;
pub mod infra;
pub mod routes;

pub use infra::app_state::AppState;
