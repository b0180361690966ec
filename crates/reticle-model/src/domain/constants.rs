/// Well-known label carrying the application name on every provisioned object.
pub const LABEL_APP_NAME: &str = "app.kubernetes.io/name";

/// Well-known label carrying the worker role (the resource name prefix).
pub const LABEL_COMPONENT: &str = "app.kubernetes.io/component";

/// Label carrying the shared resource name of one submission.
///
/// Lets the whole set be selected even before owner references are attached.
pub const LABEL_SUBMISSION: &str = "reticle.io/submission";
