pub mod mapping;
pub mod models;

pub use mapping::*;
pub use models::*;
