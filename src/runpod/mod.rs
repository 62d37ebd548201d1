//! `RunPod` API integration module.
//!
//! This module provides everything needed to drive one pod through the
//! `RunPod` GraphQL API: the transport, the documents it sends, the typed
//! responses, the lifecycle controller and the reachability wait.

mod controller;
mod documents;
mod reachability;
mod transport;
mod types;

pub use controller::PodController;
pub use reachability::{PollPolicy, Reachability, poll_until_reachable};
pub use transport::{
    GraphQlRequest, HttpTransport, MAX_ERROR_BODY_CHARS, RUNPOD_API_URL, Transport, truncate_body,
};
pub use types::{
    CloudType, CreatePodRequest, DEFAULT_GPU_TYPE, DEFAULT_IMAGE, DEFAULT_POD_NAME,
    DEFAULT_VOLUME_GB, DesiredStatus, PodStatus, PortBinding, PortProtocol, RuntimeInfo,
    SSH_PRIVATE_PORT, SshEndpoint,
};
