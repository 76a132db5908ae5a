pub mod config;
pub mod errors;
pub mod heap;
pub mod parser;
pub mod rbtree;
pub mod repository;
pub mod ride;
pub mod service;

pub use repository::{RideRepository, UpdateOutcome};
pub use ride::Ride;
