//! Resolution of polymorphic token owners.

mod registry;

pub use registry::{OwnerLoader, OwnerRegistry};
