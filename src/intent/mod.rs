pub mod classifier;
pub mod timeparse;
pub mod types;

pub use classifier::classify;
pub use types::{Intent, IntentKind};
