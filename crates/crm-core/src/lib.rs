pub mod actions;
pub mod activity;
pub mod clock;
pub mod config;
pub mod contact;
pub mod deal;
pub mod enrollment;
pub mod error;
pub mod io;
pub mod paths;
pub mod quota;
pub mod sequence;
pub mod snapshot;
pub mod store;
pub mod task;
pub mod types;

pub use error::{CrmError, Result};
