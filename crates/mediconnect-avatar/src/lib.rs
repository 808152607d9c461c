//! Avatar resolution for doctor records.
//!
//! [`AvatarResolver`] walks an ordered list of [`AvatarTier`]s, from image
//! synthesis down to a remote initials placeholder, and always returns a
//! usable [`AvatarResult`](mediconnect_core::AvatarResult).

pub mod error;
pub mod resolver;
pub mod samples;
pub mod style;
pub mod tier;

pub use error::TierError;
pub use resolver::{portrait_constraints, AvatarRequest, AvatarResolver};
pub use tier::AvatarTier;
