//! In-memory doubles for the external contracts
//!
//! Deterministic, with failure knobs per call family. Used by the unit
//! tests in this crate and by the integration suite under `tests/`.

use super::traits::{
    ClientRegistry, InterventionScheduler, MeterRegistry, NotificationDispatcher,
    SubscriptionRegistry,
};
use super::types::{
    ClientInfo, InterventionRequest, MeterInfo, ProvisionedMeter, SubscriptionInfo,
};
use super::{ExternalError, ExternalResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::Semaphore;

#[derive(Default)]
pub struct FakeClientRegistry {
    clients: Mutex<HashMap<String, ClientInfo>>,
    pub fail: AtomicBool,
}

impl FakeClientRegistry {
    pub fn with_active(ids: &[&str]) -> Self {
        let fake = Self::default();
        for id in ids {
            fake.put(id, "ACTIVE");
        }
        fake
    }

    pub fn put(&self, id: &str, status: &str) {
        self.clients.lock().unwrap().insert(
            id.to_string(),
            ClientInfo {
                id: id.to_string(),
                status: status.to_string(),
                email: Some(format!("{id}@example.test")),
                phone: None,
            },
        );
    }
}

#[async_trait]
impl ClientRegistry for FakeClientRegistry {
    async fn get_client(&self, id: &str, _tenant_id: &str) -> ExternalResult<ClientInfo> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ExternalError::Unavailable("client registry down".into()));
        }
        self.clients
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| ExternalError::Rejected(format!("unknown client {id}")))
    }
}

#[derive(Default)]
pub struct FakeMeterRegistry {
    meters: Mutex<HashMap<String, MeterInfo>>,
    released: Mutex<HashSet<String>>,
    provision_counter: AtomicU64,
    pub fail_provision: AtomicBool,
    pub fail_release: AtomicBool,
}

impl FakeMeterRegistry {
    pub fn with_active(ids: &[&str]) -> Self {
        let fake = Self::default();
        for id in ids {
            fake.put(id, "ACTIVE");
        }
        fake
    }

    pub fn put(&self, id: &str, status: &str) {
        self.meters.lock().unwrap().insert(
            id.to_string(),
            MeterInfo {
                id: id.to_string(),
                status: status.to_string(),
            },
        );
    }

    pub fn was_released(&self, id: &str) -> bool {
        self.released.lock().unwrap().contains(id)
    }
}

#[async_trait]
impl MeterRegistry for FakeMeterRegistry {
    async fn get_meter(&self, id: &str) -> ExternalResult<MeterInfo> {
        self.meters
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| ExternalError::Rejected(format!("unknown meter {id}")))
    }

    async fn check_availability(&self, id: &str) -> ExternalResult<bool> {
        // A released meter is available again
        if self.released.lock().unwrap().contains(id) {
            return Ok(true);
        }
        Ok(self
            .meters
            .lock()
            .unwrap()
            .get(id)
            .map(MeterInfo::is_active)
            .unwrap_or(false))
    }

    async fn provision_meter(
        &self,
        _address: &str,
        zone: &str,
        _tenant_id: &str,
        serial: Option<&str>,
    ) -> ExternalResult<ProvisionedMeter> {
        if self.fail_provision.load(Ordering::SeqCst) {
            return Err(ExternalError::Unavailable("provisioning down".into()));
        }
        let n = self.provision_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let id = serial
            .map(str::to_string)
            .unwrap_or_else(|| format!("meter-prov-{n}"));
        self.put(&id, "ACTIVE");
        Ok(ProvisionedMeter {
            id: id.clone(),
            number: format!("M-{}-15-{:07}", zone.to_ascii_uppercase(), n),
        })
    }

    async fn release_meter(&self, id: &str) -> ExternalResult<()> {
        if self.fail_release.load(Ordering::SeqCst) {
            return Err(ExternalError::Unavailable("release down".into()));
        }
        self.released.lock().unwrap().insert(id.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeSubscriptionRegistry {
    subscriptions: Mutex<HashMap<String, SubscriptionInfo>>,
}

impl FakeSubscriptionRegistry {
    pub fn with_active(ids: &[&str]) -> Self {
        let fake = Self::default();
        for id in ids {
            fake.put(id, "ACTIVE");
        }
        fake
    }

    pub fn put(&self, id: &str, status: &str) {
        self.subscriptions.lock().unwrap().insert(
            id.to_string(),
            SubscriptionInfo {
                id: id.to_string(),
                status: status.to_string(),
            },
        );
    }
}

#[async_trait]
impl SubscriptionRegistry for FakeSubscriptionRegistry {
    async fn get_subscription(&self, id: &str) -> ExternalResult<SubscriptionInfo> {
        self.subscriptions
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| ExternalError::Rejected(format!("unknown subscription {id}")))
    }
}

#[derive(Default)]
pub struct FakeInterventionScheduler {
    scheduled: Mutex<Vec<InterventionRequest>>,
    pub fail: AtomicBool,
}

impl FakeInterventionScheduler {
    pub fn scheduled(&self) -> Vec<InterventionRequest> {
        self.scheduled.lock().unwrap().clone()
    }
}

#[async_trait]
impl InterventionScheduler for FakeInterventionScheduler {
    async fn schedule(&self, request: &InterventionRequest) -> ExternalResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ExternalError::Timeout("scheduler timed out".into()));
        }
        self.scheduled.lock().unwrap().push(request.clone());
        Ok(())
    }
}

pub struct FakeNotificationDispatcher {
    emails: Mutex<Vec<(String, String)>>,
    events: Mutex<Vec<(String, Value)>>,
    pub fail_events: AtomicBool,
    /// Park `emit_event` callers until [`release_events`] hands out permits
    pub hold_events: AtomicBool,
    event_gate: Semaphore,
}

impl Default for FakeNotificationDispatcher {
    fn default() -> Self {
        Self {
            emails: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
            fail_events: AtomicBool::new(false),
            hold_events: AtomicBool::new(false),
            event_gate: Semaphore::new(0),
        }
    }
}

impl FakeNotificationDispatcher {
    pub fn emails(&self) -> Vec<(String, String)> {
        self.emails.lock().unwrap().clone()
    }

    /// Let `n` held `emit_event` calls proceed
    pub fn release_events(&self, n: usize) {
        self.event_gate.add_permits(n);
    }

    pub fn events(&self) -> Vec<(String, Value)> {
        self.events.lock().unwrap().clone()
    }

    pub fn events_on(&self, topic: &str) -> Vec<Value> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

#[async_trait]
impl NotificationDispatcher for FakeNotificationDispatcher {
    async fn send_email(&self, to: &str, subject: &str, _body: &str) -> ExternalResult<()> {
        self.emails
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string()));
        Ok(())
    }

    async fn send_sms(&self, _to: &str, _body: &str) -> ExternalResult<()> {
        Ok(())
    }

    async fn emit_event(&self, topic: &str, payload: &Value) -> ExternalResult<()> {
        if self.hold_events.load(Ordering::SeqCst) {
            match self.event_gate.acquire().await {
                Ok(permit) => permit.forget(),
                Err(_) => return Err(ExternalError::Unavailable("event bus closed".into())),
            }
        }
        if self.fail_events.load(Ordering::SeqCst) {
            return Err(ExternalError::Unavailable("event bus down".into()));
        }
        self.events
            .lock()
            .unwrap()
            .push((topic.to_string(), payload.clone()));
        Ok(())
    }
}
