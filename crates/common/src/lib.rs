//! Shared types for the strider workspace: transforms, disposal, hashing.

mod dispose;
mod hash;
mod types;

pub use dispose::Disposable;
pub use hash::{splitmix64, StateHasher};
pub use types::Transform;

pub fn crate_info() -> &'static str {
    "strider-common v0.1.0"
}
