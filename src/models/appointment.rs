use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SERVICE_TYPE: &str = "调理";

/// Exactly eleven digits, not part of a longer digit run.
static MOBILE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\D)(\d{11})(?:\D|$)").expect("mobile number pattern must compile"));

/// Who the customer is and where they are chatting from, as reported by the
/// chat client rather than parsed out of the message body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combined_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_date: Option<String>,
}

impl ContactContext {
    /// Customer name: explicit contact name, else the contact half of
    /// `"shop - contact"`.
    pub fn customer_name(&self) -> Option<String> {
        if let Some(name) = non_empty(self.contact_name.as_deref()) {
            return Some(name.to_string());
        }
        let combined = non_empty(self.combined_name.as_deref())?;
        match combined.split_once(" - ") {
            Some((_, contact)) => non_empty(Some(contact)).map(str::to_string),
            None => Some(combined.to_string()),
        }
    }

    /// Phone from the explicit field, else an 11-digit run inside the
    /// contact name. Never synthesized.
    pub fn customer_phone(&self) -> Option<String> {
        if let Some(phone) = non_empty(self.phone.as_deref()) {
            return Some(phone.to_string());
        }
        let name = self.customer_name()?;
        find_mobile_number(&name)
    }

    pub fn store_name(&self) -> Option<String> {
        non_empty(self.shop_name.as_deref()).map(str::to_string)
    }

    /// Label used in logs to identify the conversation partner.
    pub fn label(&self) -> String {
        if let Some(combined) = non_empty(self.combined_name.as_deref()) {
            return combined.to_string();
        }
        match (
            non_empty(self.shop_name.as_deref()),
            non_empty(self.contact_name.as_deref()),
        ) {
            (Some(shop), Some(contact)) => format!("{shop} - {contact}"),
            (None, Some(contact)) => contact.to_string(),
            (Some(shop), None) => shop.to_string(),
            (None, None) => String::new(),
        }
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn find_mobile_number(s: &str) -> Option<String> {
    MOBILE_NUMBER
        .captures(s)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Structured booking intent extracted from one customer message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentRequest {
    pub therapist_name: Option<String>,
    pub appointment_time: Option<String>,
    pub appointment_date: String,
    pub store_name: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub service_type: String,
    pub notes: String,
    pub original_message: String,
}

impl AppointmentRequest {
    /// Nothing to book against: neither who nor when is known.
    pub fn is_underspecified(&self) -> bool {
        self.therapist_name.is_none() && self.appointment_time.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_name_prefers_contact_name() {
        let ctx = ContactContext {
            contact_name: Some("吴城良".to_string()),
            combined_name: Some("静安寺店 - 别名".to_string()),
            ..Default::default()
        };
        assert_eq!(ctx.customer_name().as_deref(), Some("吴城良"));
    }

    #[test]
    fn test_customer_name_from_combined() {
        let ctx = ContactContext {
            combined_name: Some("名医堂（静安寺店） - 张三".to_string()),
            ..Default::default()
        };
        assert_eq!(ctx.customer_name().as_deref(), Some("张三"));
        assert_eq!(ctx.label(), "名医堂（静安寺店） - 张三");
    }

    #[test]
    fn test_phone_from_contact_name() {
        let ctx = ContactContext {
            contact_name: Some("张三19357509506".to_string()),
            ..Default::default()
        };
        assert_eq!(ctx.customer_phone().as_deref(), Some("19357509506"));
    }

    #[test]
    fn test_phone_never_synthesized() {
        let ctx = ContactContext {
            contact_name: Some("张三".to_string()),
            ..Default::default()
        };
        assert_eq!(ctx.customer_phone(), None);

        let too_long = ContactContext {
            contact_name: Some("张三193575095061".to_string()),
            ..Default::default()
        };
        assert_eq!(too_long.customer_phone(), None);
    }

    #[test]
    fn test_mobile_number_bounded_by_non_digits() {
        assert_eq!(find_mobile_number("19357509506").as_deref(), Some("19357509506"));
        assert_eq!(find_mobile_number("吴19357509506先生").as_deref(), Some("19357509506"));
        assert_eq!(find_mobile_number("1935750950"), None);
        assert_eq!(find_mobile_number("1234 19357509506").as_deref(), Some("19357509506"));
    }

    #[test]
    fn test_explicit_phone_wins() {
        let ctx = ContactContext {
            contact_name: Some("张三13800000000".to_string()),
            phone: Some(" 19357509506 ".to_string()),
            ..Default::default()
        };
        assert_eq!(ctx.customer_phone().as_deref(), Some("19357509506"));
    }

    #[test]
    fn test_label_shop_and_contact() {
        let ctx = ContactContext {
            contact_name: Some("李四".to_string()),
            shop_name: Some("静安寺店".to_string()),
            ..Default::default()
        };
        assert_eq!(ctx.label(), "静安寺店 - 李四");
    }
}
