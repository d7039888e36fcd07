pub mod audio;
pub mod error;
pub mod handlers;
pub mod languages;
pub mod routes;
pub mod settings;
pub mod state;
pub mod translate;
pub mod utils;
