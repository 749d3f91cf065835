pub mod toy_def;
pub mod toy_registry;

pub use toy_def::ToyDefinition;
pub use toy_registry::ToyRegistry;
