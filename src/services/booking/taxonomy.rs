//! Customer-facing wording for every way a booking attempt can fail.

use crate::models::{BookingErrorKind, BookingOutcome};

/// Backend phrases checked in order; the first contained phrase decides.
const BACKEND_PHRASES: &[(&str, BookingErrorKind)] = &[
    ("已被预约", BookingErrorKind::TimeConflict),
    ("技师不存在", BookingErrorKind::TherapistNotFound),
    ("门店不存在", BookingErrorKind::StoreNotFound),
    ("营业时间", BookingErrorKind::BusinessHoursViolation),
];

pub fn classify(error_text: &str) -> BookingErrorKind {
    BACKEND_PHRASES
        .iter()
        .find(|(phrase, _)| error_text.contains(phrase))
        .map(|(_, kind)| *kind)
        .unwrap_or(BookingErrorKind::SystemError)
}

/// Outcome for a `success: false` reply from the create call.
pub fn backend_failure(error_text: &str, therapist: Option<&str>, time: Option<&str>) -> BookingOutcome {
    let therapist = therapist.unwrap_or("该技师");
    let time = time.unwrap_or("该时间");
    let kind = classify(error_text);

    let (message, suggestion) = match kind {
        BookingErrorKind::TimeConflict => (
            format!("{therapist}在{time}已经有安排了"),
            format!("建议您选择{therapist}的其他时间，或者选择同门店的其他技师"),
        ),
        BookingErrorKind::TherapistNotFound => (
            format!("很抱歉，{therapist}目前不在我们门店"),
            "请选择其他技师，我可以为您推荐同门店的其他优秀技师".to_string(),
        ),
        BookingErrorKind::StoreNotFound => (
            "门店信息有误".to_string(),
            "请确认您要预约的门店信息".to_string(),
        ),
        BookingErrorKind::BusinessHoursViolation => (
            format!("{time}不在营业时间内"),
            "请选择营业时间内的时段（通常为9:00-21:00）".to_string(),
        ),
        BookingErrorKind::ParseFailure | BookingErrorKind::SystemError => (
            "预约暂时无法完成，可能是系统繁忙".to_string(),
            "请稍后重试，或者选择其他时间段".to_string(),
        ),
    };

    BookingOutcome::failed(kind, message, suggestion)
}

pub fn parse_failure() -> BookingOutcome {
    BookingOutcome::failed(
        BookingErrorKind::ParseFailure,
        "请提供完整的预约信息，包括技师姓名、预约时间等".to_string(),
        "请说明您想预约哪位技师，什么时间".to_string(),
    )
}

pub fn missing_phone() -> BookingOutcome {
    BookingOutcome::failed(
        BookingErrorKind::ParseFailure,
        "预约需要您的联系电话".to_string(),
        "请提供您的11位手机号码，方便门店与您确认预约".to_string(),
    )
}

pub fn therapist_not_found(name: Option<&str>, store: Option<&str>) -> BookingOutcome {
    let (message, suggestion) = match (name, store) {
        (Some(name), _) => (
            format!("很抱歉，没有找到{name}"),
            "请检查技师姓名是否正确，或者选择其他技师".to_string(),
        ),
        (None, Some(store)) => (
            format!("很抱歉，{store}暂时没有可预约的技师"),
            "请告诉我您想预约哪位技师，或者选择其他门店".to_string(),
        ),
        (None, None) => (
            "很抱歉，还不知道您想预约哪家门店或哪位技师".to_string(),
            "请告诉我您想去的门店或想预约的技师".to_string(),
        ),
    };
    BookingOutcome::failed(BookingErrorKind::TherapistNotFound, message, suggestion)
}

/// The backend accepted the booking but returned no appointment id.
pub fn unconfirmed() -> BookingOutcome {
    BookingOutcome::failed(
        BookingErrorKind::SystemError,
        "预约已提交，但暂时无法确认预约结果".to_string(),
        "请联系门店确认预约是否成功，避免重复预约".to_string(),
    )
}

/// The backend could not be reached, timed out, or answered garbage.
pub fn unavailable() -> BookingOutcome {
    BookingOutcome::failed(
        BookingErrorKind::SystemError,
        "预约系统暂时不可用".to_string(),
        "请稍后重试，或联系客服协助处理".to_string(),
    )
}
