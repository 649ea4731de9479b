pub mod compute;
pub mod config;
pub mod controller;
pub mod error;
pub mod polling;
pub mod registry;

mod notify;

pub use compute::*;
pub use config::*;
pub use controller::*;
pub use error::*;
pub use polling::*;
pub use registry::*;
