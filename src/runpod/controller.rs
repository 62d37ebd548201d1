//! Pod lifecycle controller.
//!
//! The controller turns intents (create, start, stop, status, SSH lookup)
//! into GraphQL calls and reduces the responses to typed results. It keeps
//! no lifecycle state of its own: every call re-reads the pod from `RunPod`,
//! so a restarted process picks up wherever the pod actually is.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use validator::Validate;

use crate::config::{ControllerSettings, Credentials};
use crate::error::{
    ConfigError, CredentialField, HalldyllError, ProviderError, Result, TransportError,
};

use super::documents::{
    self, DEPLOY_FIELD, POD_FIELD, RESUME_FIELD, STOP_FIELD,
};
use super::reachability::{PollPolicy, Reachability, poll_until_reachable};
use super::transport::{GraphQlRequest, HttpTransport, Transport};
use super::types::{CreatePodRequest, PodStatus, SshEndpoint};

/// GraphQL response envelope.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

/// GraphQL error structure.
#[derive(Debug, Deserialize)]
struct GraphQlError {
    #[serde(default)]
    message: Option<String>,
}

/// Controls one `RunPod` pod on behalf of one caller.
#[derive(Debug)]
pub struct PodController<T = HttpTransport> {
    /// Transport used for every call.
    transport: T,
    /// Credentials for this invocation.
    credentials: Credentials,
    /// Timeouts and polling settings.
    settings: ControllerSettings,
    /// Fires when the caller gives up.
    cancel: CancellationToken,
}

impl PodController<HttpTransport> {
    /// Creates a controller talking HTTP to `settings.api_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn connect(credentials: Credentials, settings: ControllerSettings) -> Result<Self> {
        let transport = HttpTransport::new(settings.api_url.clone())?;
        Ok(Self::new(transport, credentials, settings))
    }
}

impl<T: Transport> PodController<T> {
    /// Creates a controller over any transport.
    #[must_use]
    pub fn new(transport: T, credentials: Credentials, settings: ControllerSettings) -> Self {
        Self {
            transport,
            credentials,
            settings,
            cancel: CancellationToken::new(),
        }
    }

    /// Uses `cancel` to abort in-flight calls and waits.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Fetches the current status of a pod.
    ///
    /// A pod missing from the response yields `PodStatus::default()`, since
    /// `RunPod` may not list a pod that was created moments ago.
    ///
    /// # Errors
    ///
    /// Returns a precondition error if the key or id is empty, otherwise any
    /// transport or provider error.
    pub async fn get_status(&self, pod_id: &str) -> Result<PodStatus> {
        self.require(Some(pod_id))?;
        debug!(pod_id, "Querying pod status");

        let status = self
            .call::<Option<PodStatus>>(
                &documents::status_query(pod_id),
                POD_FIELD,
                self.settings.query_timeout,
            )
            .await?
            .unwrap_or_default();

        debug!(pod_id, status = %status.desired_status, "Pod status");
        Ok(status)
    }

    /// Looks up the SSH endpoint of a pod.
    ///
    /// Returns `None` while the pod has no runtime or exposes no TCP port 22.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::get_status`].
    pub async fn ssh_endpoint(&self, pod_id: &str) -> Result<Option<SshEndpoint>> {
        Ok(self.get_status(pod_id).await?.ssh_endpoint())
    }

    /// Resumes a stopped pod with one GPU.
    ///
    /// # Errors
    ///
    /// Returns a precondition, transport or provider error.
    pub async fn start(&self, pod_id: &str) -> Result<PodStatus> {
        self.require(Some(pod_id))?;
        info!(pod_id, "Starting pod");

        let status = self
            .call_required::<PodStatus>(
                &documents::resume_mutation(pod_id),
                RESUME_FIELD,
                self.settings.mutation_timeout,
            )
            .await?;

        info!(pod_id, status = %status.desired_status, "Start requested");
        Ok(status)
    }

    /// Stops a running pod.
    ///
    /// # Errors
    ///
    /// Returns a precondition, transport or provider error.
    pub async fn stop(&self, pod_id: &str) -> Result<PodStatus> {
        self.require(Some(pod_id))?;
        info!(pod_id, "Stopping pod");

        let status = self
            .call_required::<PodStatus>(
                &documents::stop_mutation(pod_id),
                STOP_FIELD,
                self.settings.mutation_timeout,
            )
            .await?;

        info!(pod_id, status = %status.desired_status, "Stop requested");
        Ok(status)
    }

    /// Deploys a new on-demand pod.
    ///
    /// # Errors
    ///
    /// Returns a precondition error if the key is empty or the request is
    /// invalid, otherwise any transport or provider error.
    pub async fn create(&self, request: &CreatePodRequest) -> Result<PodStatus> {
        self.require(None)?;
        request.validate().map_err(|e| ConfigError::Validation {
            message: e.to_string(),
        })?;

        info!(
            name = %request.name,
            gpu = %request.gpu_type_id,
            image = %request.image_name,
            "Creating pod"
        );

        let status = self
            .call_required::<PodStatus>(
                &documents::deploy_mutation(request)?,
                DEPLOY_FIELD,
                self.settings.create_timeout,
            )
            .await?;

        info!(pod_id = %status.id, "Created pod");
        Ok(status)
    }

    /// Waits until the pod exposes SSH or `budget` runs out.
    ///
    /// Transport errors from individual polls are treated as "not reachable
    /// yet"; see [`poll_until_reachable`].
    ///
    /// # Errors
    ///
    /// Returns a precondition error before polling, a provider error from a
    /// poll, or [`HalldyllError::Cancelled`].
    pub async fn wait_for_reachability(&self, pod_id: &str, budget: Duration) -> Result<Reachability> {
        self.require(Some(pod_id))?;
        info!(pod_id, budget_secs = budget.as_secs(), "Waiting for SSH");

        let policy = PollPolicy::new(self.settings.poll_interval, budget);
        poll_until_reachable(|| self.ssh_endpoint(pod_id), policy, &self.cancel).await
    }

    /// Starts the pod, then waits for SSH.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::start`] and [`Self::wait_for_reachability`].
    pub async fn start_and_wait(&self, pod_id: &str, budget: Duration) -> Result<(PodStatus, Reachability)> {
        let status = self.start(pod_id).await?;
        let reachability = self.wait_for_reachability(pod_id, budget).await?;
        Ok((status, reachability))
    }

    /// Checks the credentials, and the pod id when one is needed.
    fn require(&self, pod_id: Option<&str>) -> Result<()> {
        let mut missing = Vec::new();
        if self.credentials.is_empty() {
            missing.push(CredentialField::ApiKey);
        }
        if pod_id.is_some_and(|id| id.trim().is_empty()) {
            missing.push(CredentialField::PodId);
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingCredential { missing }.into())
        }
    }

    /// Like [`Self::call`], but a null payload is an invalid response.
    async fn call_required<R: DeserializeOwned>(
        &self,
        request: &GraphQlRequest,
        field: &str,
        timeout: Duration,
    ) -> Result<R> {
        self.call::<Option<R>>(request, field, timeout)
            .await?
            .ok_or_else(|| {
                TransportError::invalid_response(format!("No {field} in response")).into()
            })
    }

    /// Sends a request and decodes `data.<field>`.
    async fn call<R: DeserializeOwned>(
        &self,
        request: &GraphQlRequest,
        field: &str,
        timeout: Duration,
    ) -> Result<R> {
        let body = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(HalldyllError::Cancelled),
            body = self.transport.send(request, &self.credentials, timeout) => body?,
        };

        let envelope: Envelope = serde_json::from_value(body).map_err(|e| {
            TransportError::invalid_response(format!("Unexpected response shape: {e}"))
        })?;

        if let Some(first) = envelope.errors.as_deref().and_then(<[GraphQlError]>::first) {
            let message = first
                .message
                .clone()
                .unwrap_or_else(|| String::from("unknown RunPod error"));
            debug!(field, %message, "RunPod reported an error");
            return Err(ProviderError::new(message).into());
        }

        let payload = envelope
            .data
            .and_then(|mut data| data.remove(field))
            .unwrap_or(serde_json::Value::Null);

        serde_json::from_value(payload).map_err(|e| {
            TransportError::invalid_response(format!("Failed to decode {field}: {e}")).into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runpod::types::DesiredStatus;
    use async_trait::async_trait;
    use mockall::mock;
    use mockall::predicate::always;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    mock! {
        pub Api {}

        #[async_trait]
        impl Transport for Api {
            async fn send(
                &self,
                request: &GraphQlRequest,
                credentials: &Credentials,
                timeout: Duration,
            ) -> std::result::Result<serde_json::Value, TransportError>;
        }
    }

    fn controller(api: MockApi) -> PodController<MockApi> {
        PodController::new(api, Credentials::new("rpa_test"), ControllerSettings::default())
    }

    fn running_pod_json() -> serde_json::Value {
        json!({
            "data": {
                "pod": {
                    "id": "abc123",
                    "name": "halldyll-pod",
                    "desiredStatus": "RUNNING",
                    "runtime": {
                        "uptimeInSeconds": 12,
                        "ports": [
                            { "ip": "194.68.245.9", "isIpPublic": true, "privatePort": 22, "publicPort": 22091, "type": "tcp" }
                        ]
                    }
                }
            }
        })
    }

    #[tokio::test]
    async fn test_missing_credentials_never_reach_transport() {
        let mut api = MockApi::new();
        api.expect_send().never();

        let controller = PodController::new(api, Credentials::new(""), ControllerSettings::default());

        for result in [
            controller.start("").await,
            controller.stop("").await,
            controller.get_status("").await,
        ] {
            match result {
                Err(HalldyllError::Config(ConfigError::MissingCredential { missing })) => {
                    assert_eq!(missing, vec![CredentialField::ApiKey, CredentialField::PodId]);
                }
                other => panic!("expected missing credential, got {other:?}"),
            }
        }

        let wait = controller.wait_for_reachability("", Duration::from_secs(10)).await;
        assert!(matches!(wait, Err(HalldyllError::Config(_))));
        let create = controller.create(&CreatePodRequest::default()).await;
        assert!(matches!(create, Err(HalldyllError::Config(_))));
    }

    #[tokio::test]
    async fn test_get_status_decodes_pod() {
        let mut api = MockApi::new();
        api.expect_send()
            .withf(|request, credentials, timeout| {
                request.variables == Some(json!({ "podId": "abc123" }))
                    && credentials.api_key() == "rpa_test"
                    && *timeout == Duration::from_secs(30)
            })
            .times(1)
            .returning(|_, _, _| Ok(running_pod_json()));

        let status = controller(api).get_status("abc123").await.unwrap();
        assert_eq!(status.id, "abc123");
        assert_eq!(status.desired_status, DesiredStatus::Running);
        assert_eq!(status.uptime_secs(), Some(12));
    }

    #[tokio::test]
    async fn test_absent_pod_is_default_status() {
        let mut api = MockApi::new();
        api.expect_send()
            .times(1)
            .returning(|_, _, _| Ok(json!({ "data": { "pod": null } })));

        let status = controller(api).get_status("abc123").await.unwrap();
        assert_eq!(status, PodStatus::default());
    }

    #[tokio::test]
    async fn test_null_ports_mean_no_ssh_yet() {
        let mut api = MockApi::new();
        api.expect_send().times(1).returning(|_, _, _| {
            Ok(json!({
                "data": {
                    "pod": {
                        "id": "abc123",
                        "name": null,
                        "desiredStatus": "RUNNING",
                        "runtime": { "uptimeInSeconds": 1, "ports": null }
                    }
                }
            }))
        });

        let endpoint = assert_ok!(controller(api).ssh_endpoint("abc123").await);
        assert_eq!(endpoint, None);
    }

    #[tokio::test]
    async fn test_provider_error_uses_first_message() {
        let mut api = MockApi::new();
        api.expect_send().times(1).returning(|_, _, _| {
            Ok(json!({
                "errors": [{ "message": "pod not found" }, { "message": "second" }],
                "data": { "pod": null }
            }))
        });

        let err = controller(api).get_status("abc123").await.unwrap_err();
        match err {
            HalldyllError::Provider(ProviderError { message }) => assert_eq!(message, "pod not found"),
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transport_status_is_not_a_provider_error() {
        let mut api = MockApi::new();
        api.expect_send().times(1).returning(|_, _, _| {
            Err(TransportError::Status {
                status: 401,
                body: String::from("{\"error\":\"unauthorized\"}"),
            })
        });

        let err = controller(api).stop("abc123").await.unwrap_err();
        match err {
            HalldyllError::Transport(TransportError::Status { status, body }) => {
                assert_eq!(status, 401);
                assert_eq!(body, "{\"error\":\"unauthorized\"}");
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_start_uses_mutation_timeout() {
        let mut api = MockApi::new();
        api.expect_send()
            .withf(|request, _, timeout| {
                request.query.contains("podResume") && *timeout == Duration::from_secs(60)
            })
            .times(1)
            .returning(|_, _, _| {
                Ok(json!({ "data": { "podResume": { "id": "abc123", "desiredStatus": "RUNNING" } } }))
            });

        let status = assert_ok!(controller(api).start("abc123").await);
        assert_eq!(status.id, "abc123");
        assert!(status.is_running());
    }

    #[tokio::test]
    async fn test_missing_mutation_payload_is_invalid_response() {
        let mut api = MockApi::new();
        api.expect_send()
            .times(1)
            .returning(|_, _, _| Ok(json!({ "data": { "podStop": null } })));

        let err = assert_err!(controller(api).stop("abc123").await);
        assert!(matches!(
            err,
            HalldyllError::Transport(TransportError::InvalidResponse { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_request_without_calling() {
        let mut api = MockApi::new();
        api.expect_send().never();

        let request = CreatePodRequest::default().with_image("");
        let err = controller(api).create(&request).await.unwrap_err();
        assert!(matches!(err, HalldyllError::Config(ConfigError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_create_then_status_round_trip() {
        let mut api = MockApi::new();
        api.expect_send()
            .withf(|request, _, timeout| {
                request.query.contains(DEPLOY_FIELD) && *timeout == Duration::from_secs(120)
            })
            .times(1)
            .returning(|_, _, _| {
                Ok(json!({
                    "data": {
                        "podFindAndDeployOnDemand": {
                            "id": "new-pod-1",
                            "name": "halldyll-pod",
                            "desiredStatus": "RUNNING"
                        }
                    }
                }))
            });
        api.expect_send()
            .withf(|request, _, _| request.variables == Some(json!({ "podId": "new-pod-1" })))
            .times(1)
            .returning(|_, _, _| {
                Ok(json!({ "data": { "pod": { "id": "new-pod-1", "name": "halldyll-pod", "desiredStatus": "RUNNING", "runtime": null } } }))
            });

        let controller = controller(api);
        let created = controller.create(&CreatePodRequest::default()).await.unwrap();
        let status = controller.get_status(&created.id).await.unwrap();

        assert_eq!(status.id, created.id);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_survives_transport_errors() {
        let mut api = MockApi::new();
        let mut polls = 0;
        api.expect_send()
            .with(always(), always(), always())
            .times(3)
            .returning(move |_, _, _| {
                polls += 1;
                match polls {
                    1 => Err(TransportError::Timeout {
                        timeout: Duration::from_secs(30),
                    }),
                    2 => Ok(json!({ "data": { "pod": { "id": "abc123", "desiredStatus": "RUNNING", "runtime": null } } })),
                    _ => Ok(running_pod_json()),
                }
            });

        let reachability = controller(api)
            .wait_for_reachability("abc123", Duration::from_secs(120))
            .await
            .unwrap();

        assert_eq!(
            reachability,
            Reachability::Reachable(SshEndpoint {
                ip: String::from("194.68.245.9"),
                port: 22091
            })
        );
    }

    #[tokio::test]
    async fn test_cancelled_controller_does_not_wait_for_transport() {
        let mut api = MockApi::new();
        api.expect_send().returning(|_, _, _| Ok(running_pod_json()));

        let cancel = CancellationToken::new();
        cancel.cancel();
        let controller = controller(api).with_cancellation(cancel);

        let err = controller.get_status("abc123").await.unwrap_err();
        assert!(matches!(err, HalldyllError::Cancelled));
    }
}
