//! `RunPod` API types and data structures.
//!
//! These are decoded directly from GraphQL payloads. Fields the provider may
//! leave out fall back to defaults, so a pod that is still booting decodes to
//! a status without runtime information rather than failing.

use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

/// Default pod name used by `create`.
pub const DEFAULT_POD_NAME: &str = "halldyll-pod";

/// Default GPU type requested by `create`.
pub const DEFAULT_GPU_TYPE: &str = "NVIDIA GeForce RTX 4080 SUPER";

/// Default container image requested by `create`.
pub const DEFAULT_IMAGE: &str = "runpod/pytorch:2.4.0-py3.11-cuda12.4.1-devel-ubuntu22.04";

/// Default volume size in GB.
pub const DEFAULT_VOLUME_GB: u32 = 50;

/// Container port SSH listens on.
pub const SSH_PRIVATE_PORT: u16 = 22;

/// Snapshot of a pod as reported by `RunPod`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodStatus {
    /// Unique pod identifier.
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    /// Pod name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Lifecycle state the provider is driving the pod towards.
    #[serde(default, deserialize_with = "null_as_default")]
    pub desired_status: DesiredStatus,
    /// Runtime information, present once the container is up.
    #[serde(default)]
    pub runtime: Option<RuntimeInfo>,
}

/// Pod runtime information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeInfo {
    /// Uptime in seconds.
    #[serde(default, deserialize_with = "null_as_default")]
    pub uptime_in_seconds: u64,
    /// Port bindings, in provider order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub ports: Vec<PortBinding>,
}

/// A container port and where it is published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortBinding {
    /// Address the port is reachable on.
    #[serde(default, deserialize_with = "null_as_default")]
    pub ip: String,
    /// Whether `ip` is publicly routable.
    #[serde(default, rename = "isIpPublic", deserialize_with = "null_as_default")]
    pub is_public: bool,
    /// Port inside the container.
    #[serde(default, deserialize_with = "null_as_default")]
    pub private_port: u16,
    /// Published port, if the provider assigned one.
    #[serde(default)]
    pub public_port: Option<u16>,
    /// Transport protocol.
    #[serde(default, rename = "type", deserialize_with = "null_as_default")]
    pub protocol: PortProtocol,
}

/// Protocol of a published port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortProtocol {
    /// Raw TCP.
    Tcp,
    /// Raw UDP.
    Udp,
    /// HTTP, proxied by `RunPod`.
    Http,
    /// Anything else.
    #[default]
    #[serde(other)]
    Other,
}

/// Pod lifecycle state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DesiredStatus {
    /// Pod is running.
    Running,
    /// Pod has been stopped.
    Exited,
    /// Pod has been deleted.
    Terminated,
    /// Pod is being created.
    Created,
    /// Absent or not recognised.
    #[default]
    #[serde(other)]
    Unknown,
}

/// Where to connect with SSH.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshEndpoint {
    /// Public address.
    pub ip: String,
    /// Public port mapped to container port 22.
    pub port: u16,
}

/// Placement tier for new pods.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CloudType {
    /// Secure cloud data centers.
    Secure,
    /// Community hosts.
    #[default]
    Community,
}

/// Request to deploy a new on-demand pod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePodRequest {
    /// Pod name.
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    /// GPU type ID.
    #[validate(length(min = 1, message = "GPU type must not be empty"))]
    pub gpu_type_id: String,
    /// Number of GPUs.
    #[validate(range(min = 1, max = 8))]
    pub gpu_count: u32,
    /// Container image.
    #[validate(length(min = 1, message = "image must not be empty"))]
    pub image_name: String,
    /// Volume in GB.
    #[validate(range(min = 1, max = 10_000))]
    pub volume_in_gb: u32,
    /// Ports to expose, e.g. `22/tcp`.
    #[serde(skip)]
    #[validate(length(min = 1, message = "at least one port must be exposed"))]
    pub ports: Vec<String>,
    /// Placement tier.
    pub cloud_type: CloudType,
    /// Whether `RunPod` should start an SSH daemon.
    pub start_ssh: bool,
}

/// Decodes an explicit `null` the same way as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl PodStatus {
    /// Checks if the pod is running.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self.desired_status, DesiredStatus::Running)
    }

    /// Returns the uptime, if the pod has runtime information.
    #[must_use]
    pub fn uptime_secs(&self) -> Option<u64> {
        self.runtime.as_ref().map(|r| r.uptime_in_seconds)
    }

    /// Selects the SSH endpoint from the runtime port bindings.
    ///
    /// Returns the first binding, in provider order, that maps container
    /// port 22 over TCP to a public port. `None` while the pod has no runtime
    /// or no such binding.
    #[must_use]
    pub fn ssh_endpoint(&self) -> Option<SshEndpoint> {
        self.runtime
            .as_ref()?
            .ports
            .iter()
            .filter(|p| p.private_port == SSH_PRIVATE_PORT && p.protocol == PortProtocol::Tcp)
            .find_map(|p| {
                p.public_port.map(|port| SshEndpoint {
                    ip: p.ip.clone(),
                    port,
                })
            })
    }
}

impl SshEndpoint {
    /// Renders the command line to connect as root.
    #[must_use]
    pub fn ssh_command(&self) -> String {
        format!("ssh root@{} -p {}", self.ip, self.port)
    }
}

impl std::fmt::Display for SshEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

impl Default for CreatePodRequest {
    fn default() -> Self {
        Self {
            name: DEFAULT_POD_NAME.to_string(),
            gpu_type_id: DEFAULT_GPU_TYPE.to_string(),
            gpu_count: 1,
            image_name: DEFAULT_IMAGE.to_string(),
            volume_in_gb: DEFAULT_VOLUME_GB,
            ports: vec![String::from("22/tcp")],
            cloud_type: CloudType::Community,
            start_ssh: true,
        }
    }
}

impl CreatePodRequest {
    /// Sets the pod name.
    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Sets the GPU type.
    #[must_use]
    pub fn with_gpu_type(mut self, gpu_type_id: &str) -> Self {
        self.gpu_type_id = gpu_type_id.to_string();
        self
    }

    /// Sets the container image.
    #[must_use]
    pub fn with_image(mut self, image: &str) -> Self {
        self.image_name = image.to_string();
        self
    }

    /// Sets the volume size.
    #[must_use]
    pub const fn with_volume_gb(mut self, size_gb: u32) -> Self {
        self.volume_in_gb = size_gb;
        self
    }

    /// Sets the ports to expose.
    #[must_use]
    pub fn with_ports(mut self, ports: Vec<String>) -> Self {
        self.ports = ports;
        self
    }

    /// Sets the cloud type.
    #[must_use]
    pub const fn with_cloud_type(mut self, cloud_type: CloudType) -> Self {
        self.cloud_type = cloud_type;
        self
    }

    /// Ports in the comma separated form the API expects.
    #[must_use]
    pub fn ports_string(&self) -> String {
        self.ports.join(",")
    }
}

impl std::fmt::Display for DesiredStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            Self::Running => "running",
            Self::Exited => "exited",
            Self::Terminated => "terminated",
            Self::Created => "created",
            Self::Unknown => "unknown",
        };
        write!(f, "{status}")
    }
}

impl std::fmt::Display for PortProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let protocol = match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
            Self::Http => "http",
            Self::Other => "other",
        };
        write!(f, "{protocol}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(private_port: u16, public_port: Option<u16>, protocol: PortProtocol) -> PortBinding {
        PortBinding {
            ip: format!("10.0.0.{private_port}"),
            is_public: true,
            private_port,
            public_port,
            protocol,
        }
    }

    fn running_with(ports: Vec<PortBinding>) -> PodStatus {
        PodStatus {
            id: String::from("pod-1"),
            name: String::from("halldyll-pod"),
            desired_status: DesiredStatus::Running,
            runtime: Some(RuntimeInfo {
                uptime_in_seconds: 42,
                ports,
            }),
        }
    }

    #[test]
    fn test_decode_full_status() {
        let json = serde_json::json!({
            "id": "abc123",
            "name": "halldyll-pod",
            "desiredStatus": "RUNNING",
            "runtime": {
                "uptimeInSeconds": 310,
                "ports": [
                    { "ip": "100.65.0.2", "isIpPublic": false, "privatePort": 8888, "publicPort": 60001, "type": "http" },
                    { "ip": "194.68.245.9", "isIpPublic": true, "privatePort": 22, "publicPort": 22091, "type": "tcp" }
                ]
            }
        });

        let status: PodStatus = serde_json::from_value(json).unwrap();
        assert!(status.is_running());
        assert_eq!(status.uptime_secs(), Some(310));
        assert_eq!(
            status.ssh_endpoint(),
            Some(SshEndpoint {
                ip: String::from("194.68.245.9"),
                port: 22091
            })
        );
    }

    #[test]
    fn test_decode_sparse_status() {
        let status: PodStatus =
            serde_json::from_value(serde_json::json!({ "id": "abc", "desiredStatus": "PAUSED_BY_HOST", "runtime": null }))
                .unwrap();

        assert_eq!(status.desired_status, DesiredStatus::Unknown);
        assert!(status.runtime.is_none());
        assert!(status.ssh_endpoint().is_none());
    }

    #[test]
    fn test_explicit_nulls_decode_as_defaults() {
        let status: PodStatus = serde_json::from_value(serde_json::json!({
            "id": "abc",
            "name": null,
            "desiredStatus": null,
            "runtime": { "uptimeInSeconds": null, "ports": null }
        }))
        .unwrap();

        assert_eq!(status.name, "");
        assert_eq!(status.desired_status, DesiredStatus::Unknown);
        assert_eq!(status.uptime_secs(), Some(0));
        assert!(status.ssh_endpoint().is_none());
    }

    #[test]
    fn test_null_binding_fields_decode_as_defaults() {
        let binding: PortBinding = serde_json::from_value(serde_json::json!({
            "ip": null,
            "isIpPublic": null,
            "privatePort": 22,
            "publicPort": null,
            "type": null
        }))
        .unwrap();

        assert_eq!(binding.ip, "");
        assert!(!binding.is_public);
        assert_eq!(binding.public_port, None);
        assert_eq!(binding.protocol, PortProtocol::Other);
    }

    #[test]
    fn test_no_runtime_means_no_endpoint() {
        let mut status = running_with(Vec::new());
        status.runtime = None;
        assert!(status.ssh_endpoint().is_none());
    }

    #[test]
    fn test_no_port_22_means_no_endpoint() {
        let status = running_with(vec![
            binding(8888, Some(60001), PortProtocol::Http),
            binding(2222, Some(60002), PortProtocol::Tcp),
        ]);
        assert!(status.ssh_endpoint().is_none());
    }

    #[test]
    fn test_port_22_over_udp_is_ignored() {
        let status = running_with(vec![binding(22, Some(60003), PortProtocol::Udp)]);
        assert!(status.ssh_endpoint().is_none());
    }

    #[test]
    fn test_unpublished_port_22_is_ignored() {
        let status = running_with(vec![binding(22, None, PortProtocol::Tcp)]);
        assert!(status.ssh_endpoint().is_none());
    }

    #[test]
    fn test_ssh_binding_found_regardless_of_order() {
        let ssh = binding(22, Some(40022), PortProtocol::Tcp);
        let others = [
            binding(8888, Some(60001), PortProtocol::Http),
            binding(7860, Some(60002), PortProtocol::Tcp),
            binding(22, Some(60003), PortProtocol::Udp),
        ];

        for position in 0..=others.len() {
            let mut ports = others.to_vec();
            ports.insert(position, ssh.clone());
            let status = running_with(ports);

            assert_eq!(
                status.ssh_endpoint(),
                Some(SshEndpoint {
                    ip: ssh.ip.clone(),
                    port: 40022
                }),
                "ssh binding at position {position}"
            );
        }
    }

    #[test]
    fn test_ssh_endpoint_is_idempotent() {
        let status = running_with(vec![binding(22, Some(40022), PortProtocol::Tcp)]);
        assert_eq!(status.ssh_endpoint(), status.ssh_endpoint());
    }

    #[test]
    fn test_ssh_command() {
        let endpoint = SshEndpoint {
            ip: String::from("194.68.245.9"),
            port: 22091,
        };
        assert_eq!(endpoint.ssh_command(), "ssh root@194.68.245.9 -p 22091");
        assert_eq!(endpoint.to_string(), "194.68.245.9:22091");
    }

    #[test]
    fn test_create_request_defaults_are_valid() {
        let request = CreatePodRequest::default();
        assert!(request.validate().is_ok());
        assert_eq!(request.ports_string(), "22/tcp");
        assert_eq!(request.volume_in_gb, 50);
        assert_eq!(request.cloud_type, CloudType::Community);
    }

    #[test]
    fn test_create_request_validation() {
        let request = CreatePodRequest::default().with_volume_gb(0).with_ports(Vec::new());
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("volume_in_gb"));
        assert!(fields.contains_key("ports"));
    }
}
