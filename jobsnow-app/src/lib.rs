pub mod auth;
pub mod config;
pub mod context;
pub mod database;
pub mod error;
pub mod helpers;
pub mod integrations;
pub mod listings;
pub mod notifications;
pub mod onboarding;
pub mod routes;
pub mod settings;
pub mod translations;

pub use context::AppContext;
pub use database::Database;
