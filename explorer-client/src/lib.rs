pub mod app;
pub mod auth;
pub mod config;
pub mod handlers;
pub mod models;
pub mod operations;
pub mod services;
pub mod session;
pub mod startup;
pub mod storage;
pub mod view;

pub use app::{Command, CommandSender, ExplorerApp, Navigator, StoreConnector, View};
pub use auth::{Auth, AuthState};
pub use operations::{Listing, StorageOperations};
