//! Account-set membership.
//!
//! - Edge identities and member references
//! - Pure desired/current difference
//! - Idempotent add/remove against the remote

pub mod diff;
pub mod edge;
pub mod graph;

#[cfg(test)]
mod diff_props;

pub use diff::MembershipDiff;
pub use edge::{EdgeIdError, MemberRef, MembershipEdge};
pub use graph::MembershipGraph;
