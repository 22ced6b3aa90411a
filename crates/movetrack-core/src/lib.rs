pub mod alert;
pub mod catalog;
pub mod config;
pub mod documents;
pub mod error;
pub mod event;
pub mod io;
pub mod milestone;
pub mod moves;
pub mod notify;
pub mod paths;
pub mod sla;
pub mod store;
pub mod timeline;
pub mod tracker;
pub mod types;

pub use error::{Result, TrackError};
