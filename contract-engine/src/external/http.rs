//! HTTP implementations of the external contracts
//!
//! One struct per registry, all sharing a reqwest client built with the
//! configured per-call timeout. Non-2xx responses surface as `Rejected`,
//! transport timeouts as `Timeout`, everything else as `Unavailable`.

use super::traits::{
    ClientRegistry, InterventionScheduler, MeterRegistry, NotificationDispatcher,
    SubscriptionRegistry,
};
use super::types::{
    ClientInfo, InterventionRequest, MeterInfo, ProvisionedMeter, SubscriptionInfo,
};
use super::{ExternalError, ExternalResult};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;

/// Shared client with the bounded per-call timeout from config
pub fn build_client(timeout_ms: u64) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .build()
}

fn transport_error(subsystem: &str, e: reqwest::Error) -> ExternalError {
    if e.is_timeout() {
        ExternalError::Timeout(format!("{subsystem}: {e}"))
    } else {
        ExternalError::Unavailable(format!("{subsystem}: {e}"))
    }
}

async fn parse_json<T: DeserializeOwned>(
    subsystem: &str,
    response: Response,
) -> ExternalResult<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(ExternalError::Rejected(format!(
            "{subsystem} returned {status}"
        )));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| ExternalError::Unavailable(format!("{subsystem}: bad payload: {e}")))
}

fn expect_success(subsystem: &str, response: &Response) -> ExternalResult<()> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(ExternalError::Rejected(format!(
            "{subsystem} returned {status}"
        )))
    }
}

// ==================== Client registry ====================

pub struct HttpClientRegistry {
    client: Client,
    base_url: String,
}

impl HttpClientRegistry {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ClientRegistry for HttpClientRegistry {
    async fn get_client(&self, id: &str, tenant_id: &str) -> ExternalResult<ClientInfo> {
        let response = self
            .client
            .get(format!("{}/clients/{id}", self.base_url))
            .query(&[("tenant_id", tenant_id)])
            .send()
            .await
            .map_err(|e| transport_error("client registry", e))?;
        parse_json("client registry", response).await
    }
}

// ==================== Meter registry ====================

pub struct HttpMeterRegistry {
    client: Client,
    base_url: String,
}

impl HttpMeterRegistry {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl MeterRegistry for HttpMeterRegistry {
    async fn get_meter(&self, id: &str) -> ExternalResult<MeterInfo> {
        let response = self
            .client
            .get(format!("{}/meters/{id}", self.base_url))
            .send()
            .await
            .map_err(|e| transport_error("meter registry", e))?;
        parse_json("meter registry", response).await
    }

    async fn check_availability(&self, id: &str) -> ExternalResult<bool> {
        let response = self
            .client
            .get(format!("{}/meters/{id}/availability", self.base_url))
            .send()
            .await
            .map_err(|e| transport_error("meter registry", e))?;
        let body: Value = parse_json("meter registry", response).await?;
        Ok(body
            .get("available")
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    async fn provision_meter(
        &self,
        address: &str,
        zone: &str,
        tenant_id: &str,
        serial: Option<&str>,
    ) -> ExternalResult<ProvisionedMeter> {
        let response = self
            .client
            .post(format!("{}/meters/provision", self.base_url))
            .json(&json!({
                "address": address,
                "zone": zone,
                "tenant_id": tenant_id,
                "serial": serial,
            }))
            .send()
            .await
            .map_err(|e| transport_error("meter registry", e))?;
        parse_json("meter registry", response).await
    }

    async fn release_meter(&self, id: &str) -> ExternalResult<()> {
        let response = self
            .client
            .post(format!("{}/meters/{id}/release", self.base_url))
            .send()
            .await
            .map_err(|e| transport_error("meter registry", e))?;
        expect_success("meter registry", &response)
    }
}

// ==================== Subscription registry ====================

pub struct HttpSubscriptionRegistry {
    client: Client,
    base_url: String,
}

impl HttpSubscriptionRegistry {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl SubscriptionRegistry for HttpSubscriptionRegistry {
    async fn get_subscription(&self, id: &str) -> ExternalResult<SubscriptionInfo> {
        let response = self
            .client
            .get(format!("{}/subscriptions/{id}", self.base_url))
            .send()
            .await
            .map_err(|e| transport_error("subscription registry", e))?;
        parse_json("subscription registry", response).await
    }
}

// ==================== Intervention scheduler ====================

pub struct HttpInterventionScheduler {
    client: Client,
    base_url: String,
}

impl HttpInterventionScheduler {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl InterventionScheduler for HttpInterventionScheduler {
    async fn schedule(&self, request: &InterventionRequest) -> ExternalResult<()> {
        let response = self
            .client
            .post(format!("{}/interventions", self.base_url))
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error("intervention scheduler", e))?;
        expect_success("intervention scheduler", &response)
    }
}

// ==================== Notification dispatcher ====================

pub struct HttpNotificationDispatcher {
    client: Client,
    base_url: String,
}

impl HttpNotificationDispatcher {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl NotificationDispatcher for HttpNotificationDispatcher {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> ExternalResult<()> {
        let response = self
            .client
            .post(format!("{}/notifications/email", self.base_url))
            .json(&json!({ "to": to, "subject": subject, "body": body }))
            .send()
            .await
            .map_err(|e| transport_error("notification dispatcher", e))?;
        expect_success("notification dispatcher", &response)
    }

    async fn send_sms(&self, to: &str, body: &str) -> ExternalResult<()> {
        let response = self
            .client
            .post(format!("{}/notifications/sms", self.base_url))
            .json(&json!({ "to": to, "body": body }))
            .send()
            .await
            .map_err(|e| transport_error("notification dispatcher", e))?;
        expect_success("notification dispatcher", &response)
    }

    async fn emit_event(&self, topic: &str, payload: &Value) -> ExternalResult<()> {
        let response = self
            .client
            .post(format!("{}/events/{topic}", self.base_url))
            .json(payload)
            .send()
            .await
            .map_err(|e| transport_error("notification dispatcher", e))?;
        expect_success("notification dispatcher", &response)
    }
}
