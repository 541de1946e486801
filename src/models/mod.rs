//! Resource model layer
//!
//! Structure:
//! - `resource_kind.rs` - Kinds that can appear on the map
//! - `object.rs` - Read-only wrapper around watched objects
//! - `pod.rs` - Pod status helpers

mod object;
mod pod;
mod resource_kind;

pub use object::{ObjectError, ObjectKey, ResourceObject};
pub use pod::{pod_ready_containers, pod_status_message};
pub use resource_kind::ResourceKind;
