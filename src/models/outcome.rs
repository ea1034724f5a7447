use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingErrorKind {
    ParseFailure,
    TherapistNotFound,
    StoreNotFound,
    TimeConflict,
    BusinessHoursViolation,
    SystemError,
}

impl BookingErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingErrorKind::ParseFailure => "PARSE_FAILURE",
            BookingErrorKind::TherapistNotFound => "THERAPIST_NOT_FOUND",
            BookingErrorKind::StoreNotFound => "STORE_NOT_FOUND",
            BookingErrorKind::TimeConflict => "TIME_CONFLICT",
            BookingErrorKind::BusinessHoursViolation => "BUSINESS_HOURS_VIOLATION",
            BookingErrorKind::SystemError => "SYSTEM_ERROR",
        }
    }
}

/// Terminal result of one booking attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<BookingErrorKind>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<Confirmation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Confirmation {
    pub therapist_name: String,
    pub appointment_date: String,
    pub appointment_time: String,
    pub customer_name: Option<String>,
}

impl BookingOutcome {
    pub fn booked(appointment_id: String, confirmation: Confirmation) -> Self {
        let message = format!(
            "预约成功！{}，{} {}",
            confirmation.therapist_name,
            confirmation.appointment_date,
            confirmation.appointment_time
        );
        Self {
            success: true,
            appointment_id: Some(appointment_id),
            error_kind: None,
            message,
            suggestion: None,
            confirmation: Some(confirmation),
        }
    }

    pub fn failed(kind: BookingErrorKind, message: String, suggestion: String) -> Self {
        Self {
            success: false,
            appointment_id: None,
            error_kind: Some(kind),
            message,
            suggestion: Some(suggestion),
            confirmation: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serializes_like_as_str() {
        for kind in [
            BookingErrorKind::ParseFailure,
            BookingErrorKind::TherapistNotFound,
            BookingErrorKind::StoreNotFound,
            BookingErrorKind::TimeConflict,
            BookingErrorKind::BusinessHoursViolation,
            BookingErrorKind::SystemError,
        ] {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, kind.as_str());
        }
    }

    #[test]
    fn test_booked_message_names_therapist_and_slot() {
        let outcome = BookingOutcome::booked(
            "42".to_string(),
            Confirmation {
                therapist_name: "马老师".to_string(),
                appointment_date: "2026-10-17".to_string(),
                appointment_time: "16:30".to_string(),
                customer_name: None,
            },
        );
        assert!(outcome.success);
        assert_eq!(outcome.message, "预约成功！马老师，2026-10-17 16:30");
        assert!(outcome.error_kind.is_none());
    }
}
