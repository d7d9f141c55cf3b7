mod custom_fields;
mod tasks;

pub use custom_fields::*;
pub use tasks::*;
