pub mod admin;
pub mod content;
pub mod window;

pub use admin::*;
pub use content::*;
pub use window::{active_at, next_transition, sort_records};
