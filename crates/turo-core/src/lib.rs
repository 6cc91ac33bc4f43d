pub mod engine;
pub mod prompt;
pub mod validate;

pub use engine::{fallback_reply, EngineConfig, TutorEngine};
pub use prompt::compose;
pub use validate::{check, normalize, validate, ValidationError};
