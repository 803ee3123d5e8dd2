//! Business services containing token rules that touch the store or the clock.

pub mod clock;
pub mod owner;
pub mod token;

pub use clock::{Clock, FixedClock, SystemClock};
pub use owner::{OwnerLoader, OwnerRegistry};
pub use token::{CleanupResult, TokenCleanupService, TokenService};
