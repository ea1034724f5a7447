use std::sync::Arc;
use std::time::Duration;

use super::{taxonomy, BookingApi, TherapistResolver};
use crate::models::{
    AppointmentRequest, BookingOutcome, Confirmation, ContactContext, SmartAppointmentPayload,
};
use crate::services::intent_parser::IntentParser;

/// Runs one booking attempt from a customer message to a single terminal
/// [`BookingOutcome`]. Nothing is retried here; a rejected slot needs a new
/// message from the customer.
pub struct BookingOrchestrator {
    api: Arc<dyn BookingApi>,
    resolver: TherapistResolver,
    parser: IntentParser,
    call_timeout: Duration,
}

impl BookingOrchestrator {
    pub fn new(api: Arc<dyn BookingApi>, parser: IntentParser, call_timeout: Duration) -> Self {
        Self {
            resolver: TherapistResolver::new(Arc::clone(&api)),
            api,
            parser,
            call_timeout,
        }
    }

    pub fn parser(&self) -> &IntentParser {
        &self.parser
    }

    pub async fn attempt(&self, text: &str, context: &ContactContext) -> BookingOutcome {
        let request = self.parser.parse(text, context);
        self.attempt_request(request).await
    }

    /// Same pipeline for a request that is already structured.
    pub async fn attempt_request(&self, request: AppointmentRequest) -> BookingOutcome {
        if request.is_underspecified() {
            tracing::info!(message = %request.original_message, "no therapist or time in booking request");
            return taxonomy::parse_failure();
        }
        if request.customer_phone.is_none() {
            tracing::info!(customer = ?request.customer_name, "booking request without phone number");
            return taxonomy::missing_phone();
        }

        let therapist = match self
            .resolver
            .find(request.therapist_name.as_deref(), request.store_name.as_deref())
            .await
        {
            Ok(Some(therapist)) => therapist,
            Ok(None) => {
                tracing::info!(therapist = ?request.therapist_name, store = ?request.store_name, "therapist not found");
                return taxonomy::therapist_not_found(
                    request.therapist_name.as_deref(),
                    request.store_name.as_deref(),
                );
            }
            Err(e) => {
                tracing::error!(error = %e, "therapist lookup failed");
                return taxonomy::unavailable();
            }
        };

        let payload = SmartAppointmentPayload {
            therapist_name: request
                .therapist_name
                .clone()
                .or_else(|| Some(therapist.name.clone())),
            appointment_time: request.appointment_time.clone(),
            appointment_date: request.appointment_date.clone(),
            customer_name: request.customer_name.clone(),
            customer_phone: request.customer_phone.clone(),
            store_name: request.store_name.clone(),
            notes: request.notes.clone(),
        };

        let reply = match tokio::time::timeout(self.call_timeout, self.api.create_smart_appointment(&payload)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                tracing::error!(error = %e, "smart appointment call failed");
                return taxonomy::unavailable();
            }
            Err(_) => {
                tracing::error!(timeout = ?self.call_timeout, "smart appointment call timed out");
                return taxonomy::unavailable();
            }
        };

        if !reply.success {
            let error_text = reply.error_text();
            let outcome = taxonomy::backend_failure(
                &error_text,
                payload.therapist_name.as_deref(),
                payload.appointment_time.as_deref(),
            );
            tracing::warn!(
                backend_error = %error_text,
                kind = ?outcome.error_kind,
                therapist = %therapist.name,
                "booking rejected by backend"
            );
            return outcome;
        }

        let Some(appointment_id) = reply.appointment_id() else {
            tracing::warn!(therapist = ?payload.therapist_name, "booking accepted without an appointment id");
            return taxonomy::unconfirmed();
        };
        // Name the therapist the backend booked, which may differ from the
        // record the resolver picked.
        let therapist_name = reply
            .data_str("therapist_name")
            .or(payload.therapist_name)
            .unwrap_or(therapist.name);
        let confirmation = Confirmation {
            therapist_name,
            appointment_date: reply
                .data_str("appointment_date")
                .unwrap_or(request.appointment_date),
            appointment_time: reply
                .data_str("appointment_time")
                .or(request.appointment_time)
                .unwrap_or_else(|| "待确认".to_string()),
            customer_name: request.customer_name,
        };

        tracing::info!(appointment_id = %appointment_id, therapist = %confirmation.therapist_name, "appointment booked");
        BookingOutcome::booked(appointment_id, confirmation)
    }
}
