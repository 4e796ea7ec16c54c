//! Work items and work-list building.

mod builder;
mod item;

pub use builder::{PathExt, WorkListBuilder, WorkListError, WorkListResult};
pub use item::WorkItem;
