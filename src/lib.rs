pub mod api;
pub mod app;
pub mod error;
pub mod push;
pub mod state;
pub mod utils;
