//! Data model: entities and the requests that create or change them

pub mod entities;
pub mod requests;

pub use entities::*;
pub use requests::*;
