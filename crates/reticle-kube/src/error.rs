use reticle_core::ClusterError;

/// Keep the API status of rejected requests, flatten everything else.
pub(crate) fn to_cluster_error(err: kube::Error) -> ClusterError {
    match err {
        kube::Error::Api(ae) => ClusterError::Api {
            code: ae.code,
            reason: ae.reason,
            message: ae.message,
        },
        other => ClusterError::Request(other.to_string()),
    }
}

pub(crate) fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 404)
}
