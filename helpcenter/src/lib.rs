pub mod aggregation;
pub mod api;
pub mod auth_flow;
pub mod cli;
pub mod dates;
pub mod error;
pub mod inbox;
pub mod models;
pub mod polling;
pub mod search;
pub mod services;
pub mod session;
pub mod settings;
pub mod storage;
pub mod text;
pub mod tickets;
