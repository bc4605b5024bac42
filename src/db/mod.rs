pub mod schema;
pub mod store;

pub use store::{VocabStore, MAX_BATCH_SIZE};
