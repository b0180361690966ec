//! Kubernetes backend for `reticle-core`: the [`ClusterApi`](reticle_core::ClusterApi) over `kube`.
mod error;

mod gateway;
pub use gateway::KubeGateway;

mod connector;
pub use connector::KubeConnector;
