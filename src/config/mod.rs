//! Server configuration, sourced from CLI flags with env fallbacks.

mod settings;

pub use settings::Config;
