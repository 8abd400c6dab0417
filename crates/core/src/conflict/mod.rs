//! Conflict detection, resolution, and merge application.
//!
//! The conflict subsystem is responsible for:
//! 1. **Detection** -- walking a local and a remote config tree and listing every divergent leaf.
//! 2. **Resolution** -- picking a winner per conflict with a [`Strategy`].
//! 3. **Merging** -- writing the winners into a per-call result tree.

pub mod detector;
pub mod merger;
pub mod resolver;

pub use detector::{Conflict, ConflictDetector, ConflictKind};
pub use merger::{get_nested_value, remove_nested_value, set_nested_value, MergeAccumulator};
pub use resolver::{AbortReason, ConflictResolver, Resolution, Side, Strategy};
