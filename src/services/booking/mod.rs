pub mod http;
pub mod orchestrator;
pub mod resolver;
pub mod taxonomy;

use async_trait::async_trait;
use serde_json::Value;

use crate::models::{BackendReply, SmartAppointmentPayload, Store, Therapist, TherapistQuery};

pub use orchestrator::BookingOrchestrator;
pub use resolver::TherapistResolver;

/// Client of the booking backend's customer-facing REST API.
///
/// `Err` means the backend could not be reached or answered with something
/// unreadable. A readable `success: false` body is returned as `Ok`.
#[async_trait]
pub trait BookingApi: Send + Sync {
    async fn get_stores(&self) -> anyhow::Result<Vec<Store>>;

    async fn search_therapists(&self, query: &TherapistQuery) -> anyhow::Result<Vec<Therapist>>;

    async fn create_smart_appointment(
        &self,
        payload: &SmartAppointmentPayload,
    ) -> anyhow::Result<BackendReply>;

    async fn get_user_appointments(&self, phone: &str) -> anyhow::Result<Value>;

    async fn cancel_appointment(&self, appointment_id: &str, phone: &str) -> anyhow::Result<BackendReply>;
}
