//! # Domain Layer
//!
//! Component types, registry records, version packing and the registry's
//! contract surface.

pub mod contract;
pub mod entities;
pub mod errors;
pub mod value_objects;

pub use contract::REGISTRY_ABI;
pub use entities::*;
pub use errors::*;
pub use value_objects::*;
