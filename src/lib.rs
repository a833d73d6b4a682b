pub mod comparator;
pub mod config;
pub mod count;
pub mod error;
pub mod exclude;
pub mod generator;
pub mod index;
pub mod printer;
pub mod record;
pub mod semaphore;
pub mod store;
pub mod walk;

pub use config::{Config, Mode};
pub use error::{Error, Result};
