pub mod calendar;
pub mod chat;
pub mod classify;
pub mod config;
pub mod llm;
pub mod record;
pub mod router;
pub mod server;
pub mod store;
pub mod tools;
