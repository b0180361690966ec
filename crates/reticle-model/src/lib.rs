mod domain;
pub use domain::{Env, ExecutionUnitId, KeyValue, Labels, ResourceName};
pub use domain::{LABEL_APP_NAME, LABEL_COMPONENT, LABEL_SUBMISSION};

mod error;
pub use error::{ModelError, ModelResult};

mod profile;
pub use profile::{Metadata, Profile, ProfileRequest, TEXT_REQUIRED};
