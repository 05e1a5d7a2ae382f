pub mod app;
pub mod callback;
