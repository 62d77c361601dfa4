//! Load-balancer capacity allocation.
//!
//! Services in a region share a pool of application load balancers; each
//! service claims one listener port across the whole pool. The allocator
//! first proves the port is unclaimed anywhere in the environment, then
//! picks the first permitted balancer (name order) with spare listener
//! capacity, honoring an optional per-product allow-list.

pub mod allocator;
pub mod error;

pub use allocator::{AllocationRequest, ResourceAllocator, MAX_LISTENERS_PER_BALANCER};
pub use error::AllocationError;
