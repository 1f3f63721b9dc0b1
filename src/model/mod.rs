mod bundle;
mod inference;
pub mod schema;

pub use bundle::{ModelBundle, ModelDescriptor, ModelIdentity, ModelIo};
pub use inference::{CommandModel, InferenceModel};
pub use schema::{ModelSchema, RoleSchema, validate};
