//! Payload carried by local items and the transforms applied to it.

mod record;
mod transform;

pub use record::Record;
pub use transform::Transform;
