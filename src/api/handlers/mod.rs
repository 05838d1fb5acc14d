pub mod metadata;
pub mod system;
