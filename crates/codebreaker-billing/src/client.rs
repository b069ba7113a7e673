//! HTTP client for the subscription activation endpoint.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{BillingError, Plan, UserId};

/// Shown when the processor declines without saying why.
const FALLBACK_REJECTION: &str = "Subscription activation failed";

/// Connection settings for the billing endpoint.
///
/// Loaded from the `[billing]` section of `codebreaker.toml` or
/// `CODEBREAKER_BILLING__*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Activation endpoint URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    "http://localhost:3000/api/activate-subscription".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ActivationRequest<'a> {
    user_id: &'a str,
    plan: Plan,
}

#[derive(Debug, Deserialize)]
struct ActivationResponse {
    success: bool,
    #[serde(default)]
    plan: Option<Plan>,
    #[serde(default)]
    error: Option<String>,
}

/// Result of an activation attempt that reached the processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// The subscription is active.
    Activated { plan: Plan },
    /// The processor declined; `message` is its error text, verbatim.
    Rejected { message: String },
}

impl ActivationResponse {
    fn into_outcome(self, requested: Plan) -> ActivationOutcome {
        if self.success {
            ActivationOutcome::Activated {
                plan: self.plan.unwrap_or(requested),
            }
        } else {
            ActivationOutcome::Rejected {
                message: self
                    .error
                    .unwrap_or_else(|| FALLBACK_REJECTION.to_string()),
            }
        }
    }
}

/// Client for the activation endpoint. Requests are never retried.
#[derive(Debug, Clone)]
pub struct BillingClient {
    http: reqwest::Client,
    endpoint: String,
}

impl BillingClient {
    pub fn new(config: &BillingConfig) -> Result<Self, BillingError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Ask the processor to activate `plan` for `user`.
    ///
    /// A decline is an `Ok(Rejected)`, whatever the HTTP status, as long
    /// as the body follows the contract. Transport failures and bodies
    /// that don't are errors.
    pub async fn activate(
        &self,
        user: &UserId,
        plan: Plan,
    ) -> Result<ActivationOutcome, BillingError> {
        let body = ActivationRequest {
            user_id: user.as_str(),
            plan,
        };

        let response = self.http.post(&self.endpoint).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        let parsed: ActivationResponse =
            serde_json::from_str(&text).map_err(|e| BillingError::InvalidResponse {
                status: status.as_u16(),
                message: e.to_string(),
            })?;
        let outcome = parsed.into_outcome(plan);

        match &outcome {
            ActivationOutcome::Activated { plan } => {
                tracing::info!(user_id = %user, plan = %plan, "Subscription activated");
            }
            ActivationOutcome::Rejected { message } => {
                tracing::warn!(
                    user_id = %user,
                    status = status.as_u16(),
                    error = %message,
                    "Subscription activation rejected"
                );
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use tokio::net::TcpListener;

    type Received = Arc<Mutex<Vec<Value>>>;

    #[derive(Clone)]
    struct Processor {
        status: StatusCode,
        body: &'static str,
        received: Received,
    }

    async fn activate_subscription(
        State(processor): State<Processor>,
        Json(request): Json<Value>,
    ) -> (StatusCode, &'static str) {
        processor.received.lock().unwrap().push(request);
        (processor.status, processor.body)
    }

    /// Stand up a processor that answers every activation the same way.
    async fn processor(status: StatusCode, body: &'static str) -> (String, Received) {
        let received = Received::default();
        let app = Router::new()
            .route("/api/activate-subscription", post(activate_subscription))
            .with_state(Processor {
                status,
                body,
                received: received.clone(),
            });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}/api/activate-subscription"), received)
    }

    fn client_for(endpoint: String) -> BillingClient {
        BillingClient::new(&BillingConfig {
            endpoint,
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn activation_success() {
        let (endpoint, received) =
            processor(StatusCode::OK, r#"{"success":true,"plan":"yearly"}"#).await;
        let client = client_for(endpoint);

        let outcome = client
            .activate(&UserId("user_123".to_string()), Plan::Yearly)
            .await
            .unwrap();
        assert_eq!(outcome, ActivationOutcome::Activated { plan: Plan::Yearly });

        let requests = received.lock().unwrap().clone();
        assert_eq!(requests, vec![json!({ "userId": "user_123", "plan": "yearly" })]);
    }

    #[tokio::test]
    async fn rejection_message_is_verbatim() {
        let (endpoint, received) = processor(
            StatusCode::PAYMENT_REQUIRED,
            r#"{"success":false,"error":"Your card was declined."}"#,
        )
        .await;
        let client = client_for(endpoint);

        let outcome = client
            .activate(&UserId("user_9".to_string()), Plan::Monthly)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ActivationOutcome::Rejected {
                message: "Your card was declined.".to_string()
            }
        );
        assert_eq!(received.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn non_contract_body_is_an_error() {
        let (endpoint, _received) = processor(StatusCode::INTERNAL_SERVER_ERROR, "oops").await;
        let client = client_for(endpoint);

        let result = client
            .activate(&UserId("user_1".to_string()), Plan::Monthly)
            .await;
        assert!(matches!(
            result,
            Err(BillingError::InvalidResponse { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(format!("http://{addr}/api/activate-subscription"));
        let result = client
            .activate(&UserId("user_1".to_string()), Plan::Monthly)
            .await;
        assert!(matches!(result, Err(BillingError::Transport(_))));
    }

    #[test]
    fn missing_plan_and_error_fall_back() {
        let ok = ActivationResponse {
            success: true,
            plan: None,
            error: None,
        };
        assert_eq!(
            ok.into_outcome(Plan::Monthly),
            ActivationOutcome::Activated { plan: Plan::Monthly }
        );

        let declined: ActivationResponse = serde_json::from_str(r#"{"success":false}"#).unwrap();
        assert_eq!(
            declined.into_outcome(Plan::Monthly),
            ActivationOutcome::Rejected {
                message: FALLBACK_REJECTION.to_string()
            }
        );
    }
}
