pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod services;
pub mod srs;
pub mod tokenizer;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::SrsConfig;
pub use db::VocabStore;
pub use error::SrsError;
pub use services::review::ReviewService;
