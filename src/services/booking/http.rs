use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};

use super::BookingApi;
use crate::config::MAX_BOOKING_ATTEMPTS;
use crate::models::{BackendReply, SmartAppointmentPayload, Store, Therapist, TherapistQuery};

const BASE_BACKOFF: Duration = Duration::from_secs(1);

pub struct HttpBookingApi {
    base_url: String,
    max_attempts: u32,
    backoff: Duration,
    client: reqwest::Client,
}

impl HttpBookingApi {
    pub fn new(base_url: String, timeout: Duration, max_attempts: u32) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build booking API client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            max_attempts: max_attempts.clamp(1, MAX_BOOKING_ATTEMPTS),
            backoff: BASE_BACKOFF,
            client,
        })
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Sends the request built by `build`, retrying connect errors, timeouts
    /// and gateway statuses with exponential backoff. Any other response is
    /// handed back as is.
    async fn send(&self, what: &str, build: impl Fn() -> RequestBuilder) -> anyhow::Result<Response> {
        let mut attempt = 0;
        loop {
            let last_attempt = attempt + 1 >= self.max_attempts;
            match build().send().await {
                Ok(resp) if is_transient_status(resp.status()) && !last_attempt => {
                    tracing::warn!(what, status = %resp.status(), attempt = attempt + 1, "booking API unavailable, retrying");
                }
                Ok(resp) => return Ok(resp),
                Err(e) if (e.is_connect() || e.is_timeout()) && !last_attempt => {
                    tracing::warn!(what, error = %e, attempt = attempt + 1, "booking API unreachable, retrying");
                }
                Err(e) => {
                    return Err(anyhow::Error::new(e).context(format!("booking API request failed: {what}")));
                }
            }

            tokio::time::sleep(self.backoff.saturating_mul(2u32.saturating_pow(attempt))).await;
            attempt += 1;
        }
    }

    async fn read_json(what: &str, resp: Response) -> anyhow::Result<Value> {
        let status = resp.status();
        let body: Value = resp
            .json()
            .await
            .with_context(|| format!("unreadable booking API response ({status}) for {what}"))?;
        Ok(body)
    }

    /// `data` of a successful read envelope.
    async fn read_data(what: &str, resp: Response) -> anyhow::Result<Value> {
        let status = resp.status();
        let body = Self::read_json(what, resp).await?;
        let reply: BackendReply = serde_json::from_value(body)
            .with_context(|| format!("unexpected booking API envelope for {what}"))?;
        if !status.is_success() || !reply.success {
            anyhow::bail!("booking API error ({status}) for {what}: {}", reply.error_text());
        }
        Ok(reply.data.unwrap_or(Value::Null))
    }

    async fn read_reply(what: &str, resp: Response) -> anyhow::Result<BackendReply> {
        let body = Self::read_json(what, resp).await?;
        serde_json::from_value(body).with_context(|| format!("unexpected booking API envelope for {what}"))
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Lists come back either bare or wrapped as `{ "<key>": [...] }`.
fn unwrap_list(data: Value, key: &str) -> Value {
    match data {
        Value::Object(mut obj) => obj.remove(key).unwrap_or(Value::Array(vec![])),
        Value::Null => Value::Array(vec![]),
        other => other,
    }
}

#[async_trait]
impl BookingApi for HttpBookingApi {
    async fn get_stores(&self) -> anyhow::Result<Vec<Store>> {
        let resp = self.send("get_stores", || self.client.get(self.url("/stores"))).await?;
        let data = Self::read_data("get_stores", resp).await?;
        serde_json::from_value(unwrap_list(data, "stores")).context("failed to parse store list")
    }

    async fn search_therapists(&self, query: &TherapistQuery) -> anyhow::Result<Vec<Therapist>> {
        let resp = self
            .send("search_therapists", || {
                self.client.get(self.url("/therapists/search")).query(query)
            })
            .await?;
        let data = Self::read_data("search_therapists", resp).await?;
        serde_json::from_value(unwrap_list(data, "therapists")).context("failed to parse therapist list")
    }

    async fn create_smart_appointment(
        &self,
        payload: &SmartAppointmentPayload,
    ) -> anyhow::Result<BackendReply> {
        let resp = self
            .send("create_smart_appointment", || {
                self.client.post(self.url("/appointments/smart")).json(payload)
            })
            .await?;
        Self::read_reply("create_smart_appointment", resp).await
    }

    async fn get_user_appointments(&self, phone: &str) -> anyhow::Result<Value> {
        let resp = self
            .send("get_user_appointments", || {
                self.client
                    .get(self.url("/appointments/user"))
                    .query(&[("phone", phone)])
            })
            .await?;
        Self::read_data("get_user_appointments", resp).await
    }

    async fn cancel_appointment(&self, appointment_id: &str, phone: &str) -> anyhow::Result<BackendReply> {
        let path = format!("/appointments/{appointment_id}");
        let resp = self
            .send("cancel_appointment", || {
                self.client
                    .delete(self.url(&path))
                    .json(&json!({ "phone": phone }))
            })
            .await?;
        Self::read_reply("cancel_appointment", resp).await
    }
}
