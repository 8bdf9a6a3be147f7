//! Record transforms applied before a document is written: value
//! normalization by declared schema kind, then identity assignment.

pub mod identity;
pub mod normalize;

pub use identity::{assign_id, ID_FIELD};
pub use normalize::normalize;
