mod kv;
pub use kv::KeyValue;

mod env;
pub use env::Env;

mod labels;
pub use labels::Labels;

mod constants;
pub use constants::{LABEL_APP_NAME, LABEL_COMPONENT, LABEL_SUBMISSION};

mod name;
pub use name::ResourceName;

mod id;
pub use id::ExecutionUnitId;
