pub mod mapping;
pub mod settings;

pub use mapping::{FieldKind, FieldKindMap};
pub use settings::Settings;
