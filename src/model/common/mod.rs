//! Shared vocabulary types used across the policy engine and the models.

mod classification;
pub use classification::Classification;

mod role;
pub use role::Role;
