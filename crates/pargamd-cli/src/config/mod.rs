mod builder;
mod defaults;
pub mod file;

pub use builder::build_record;
