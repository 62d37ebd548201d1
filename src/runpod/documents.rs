//! GraphQL documents sent to `RunPod`.
//!
//! Values always travel as variables; nothing caller-supplied is spliced
//! into query text.

use serde_json::json;

use crate::error::{HalldyllError, Result};

use super::transport::GraphQlRequest;
use super::types::CreatePodRequest;

/// Response field of the status query.
pub const POD_FIELD: &str = "pod";

/// Response field of the resume mutation.
pub const RESUME_FIELD: &str = "podResume";

/// Response field of the stop mutation.
pub const STOP_FIELD: &str = "podStop";

/// Response field of the deploy mutation.
pub const DEPLOY_FIELD: &str = "podFindAndDeployOnDemand";

const STATUS_QUERY: &str = r"
    query Pod($podId: String!) {
        pod(input: { podId: $podId }) {
            id
            name
            desiredStatus
            runtime {
                uptimeInSeconds
                ports {
                    ip
                    isIpPublic
                    privatePort
                    publicPort
                    type
                }
            }
        }
    }
";

const RESUME_MUTATION: &str = r"
    mutation ResumePod($podId: String!, $gpuCount: Int!) {
        podResume(input: { podId: $podId, gpuCount: $gpuCount }) {
            id
            name
            desiredStatus
        }
    }
";

const STOP_MUTATION: &str = r"
    mutation StopPod($podId: String!) {
        podStop(input: { podId: $podId }) {
            id
            name
            desiredStatus
        }
    }
";

const DEPLOY_MUTATION: &str = r"
    mutation CreatePod($input: PodFindAndDeployOnDemandInput!) {
        podFindAndDeployOnDemand(input: $input) {
            id
            name
            desiredStatus
        }
    }
";

/// Number of GPUs requested when resuming a pod.
const RESUME_GPU_COUNT: u32 = 1;

/// Read-only status query for one pod.
#[must_use]
pub fn status_query(pod_id: &str) -> GraphQlRequest {
    GraphQlRequest {
        query: STATUS_QUERY,
        variables: Some(json!({ "podId": pod_id })),
    }
}

/// Resume mutation requesting one GPU.
#[must_use]
pub fn resume_mutation(pod_id: &str) -> GraphQlRequest {
    GraphQlRequest {
        query: RESUME_MUTATION,
        variables: Some(json!({ "podId": pod_id, "gpuCount": RESUME_GPU_COUNT })),
    }
}

/// Stop mutation.
#[must_use]
pub fn stop_mutation(pod_id: &str) -> GraphQlRequest {
    GraphQlRequest {
        query: STOP_MUTATION,
        variables: Some(json!({ "podId": pod_id })),
    }
}

/// Deploy-on-demand mutation.
///
/// # Errors
///
/// Returns an error if the request cannot be encoded.
pub fn deploy_mutation(request: &CreatePodRequest) -> Result<GraphQlRequest> {
    let mut input = serde_json::to_value(request)
        .map_err(|e| HalldyllError::internal(format!("Failed to encode pod request: {e}")))?;
    input["ports"] = json!(request.ports_string());

    Ok(GraphQlRequest {
        query: DEPLOY_MUTATION,
        variables: Some(json!({ "input": input })),
    })
}
