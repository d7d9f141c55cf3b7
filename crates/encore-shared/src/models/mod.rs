mod custom_field;
mod project;
mod task;
mod user;

pub use custom_field::*;
pub use project::*;
pub use task::*;
pub use user::*;
