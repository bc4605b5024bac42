pub mod review;

pub use review::{NoTranslations, ReviewService, TranslationLookup};
