pub mod inertia;
pub mod retention;
pub mod selector;

pub use inertia::{InertiaModel, InertiaState};
pub use retention::{RetentionModel, RetentionState};
pub use selector::{build_review_queue, sort_entries, SortDirection, SortField, SortKey};
