//! Booking intent extraction from one free-text customer message.
//!
//! Each field has its own ordered table of [`Rule`]s; the first rule that
//! yields a value wins. Nothing here does I/O or fails: a field that no rule
//! matches is simply left empty.

use std::sync::LazyLock;

use chrono::{FixedOffset, NaiveDate};
use regex::{Captures, Regex};

use crate::models::{AppointmentRequest, ContactContext, DEFAULT_SERVICE_TYPE};
use crate::services::timestamps;

const SURNAMES: &str = "张王李赵刘陈杨黄周吴徐孙马朱胡郭何高林罗郑梁谢唐许韩冯邓曹彭曾萧田董袁潘于蒋蔡余杜叶程苏魏吕丁任沈姚卢姜崔钟谭陆汪范金石廖贾夏韦付方白邹孟熊秦邱江尹薛闫段雷侯龙史陶黎贺顾毛郝龚邵万钱严覃河孔向汤";

const HONORIFICS: &str = "老师|师傅|医生|技师|调理师";
const DEFAULT_HONORIFIC: &str = "老师";

const SERVICE_TYPES: &[&str] = &["推拿理疗", "调理", "艾灸", "拔罐", "刮痧", "足疗"];

/// Leading words swallowed by the greedy store pattern (`我想去静安寺店`).
const STORE_LEAD_INS: &[&str] = &["我想", "我要", "预约", "我", "想", "要", "去", "到", "在"];
const STORE_SUFFIXES: &[&str] = &["分店", "门店", "店"];

/// One extraction pattern. `extract` may still reject a match (an hour of
/// 25, a bare `到店`), in which case later matches and then later rules are
/// tried.
pub struct Rule {
    pub name: &'static str,
    re: Regex,
    extract: fn(&Captures) -> Option<String>,
}

impl Rule {
    fn new(name: &'static str, pattern: &str, extract: fn(&Captures) -> Option<String>) -> Self {
        Self {
            name,
            re: Regex::new(pattern).expect("extraction pattern must compile"),
            extract,
        }
    }

    pub fn apply(&self, text: &str) -> Option<String> {
        self.re
            .captures_iter(text)
            .find_map(|caps| (self.extract)(&caps))
    }
}

/// First value produced by `rules`, in table order, with the winning rule.
pub fn first_match(rules: &[Rule], text: &str) -> Option<(&'static str, String)> {
    rules
        .iter()
        .find_map(|rule| rule.apply(text).map(|value| (rule.name, value)))
}

static THERAPIST_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        Rule::new(
            "surname_with_honorific",
            &format!(r"(?P<name>[{SURNAMES}]\p{{Han}}{{0,2}}?)(?P<suffix>{HONORIFICS})"),
            therapist_name,
        ),
        Rule::new(
            "after_title",
            &format!(r"调理师[-\s]*(?P<name>[{SURNAMES}]\p{{Han}}{{0,2}})"),
            therapist_name,
        ),
        Rule::new(
            "bare_surname_after_verb",
            &format!(r"(?:找|约)(?P<name>[{SURNAMES}]\p{{Han}}?)(?:[^\p{{Han}}]|$)"),
            therapist_name,
        ),
    ]
});

static TIME_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    const PERIOD: &str = r"(?P<period>上午|早上|中午|下午|晚上)?\s*";
    vec![
        Rule::new(
            "colon",
            &format!(r"{PERIOD}(?P<h>\d{{1,2}})[:：](?P<m>\d{{2}})"),
            |caps| clock(caps, None),
        ),
        Rule::new(
            "hour_dian_minute",
            &format!(r"{PERIOD}(?P<h>\d{{1,2}})点(?P<m>\d{{1,2}})分?"),
            |caps| clock(caps, None),
        ),
        Rule::new(
            "half_hour",
            &format!(r"{PERIOD}(?P<h>\d{{1,2}})点半"),
            |caps| clock(caps, Some(30)),
        ),
        Rule::new(
            "bare_hour",
            &format!(r"{PERIOD}(?P<h>\d{{1,2}})点"),
            |caps| clock(caps, Some(0)),
        ),
    ]
});

static STORE_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        Rule::new(
            "bracketed",
            r"[（(](?P<store>[^（）()]*?(?:分店|门店|店))[）)]",
            store_name,
        ),
        Rule::new("suffix", r"(?P<store>\p{Han}+?(?:分店|门店|店))", store_name),
    ]
});

static SERVICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&SERVICE_TYPES.join("|")).expect("service pattern must compile")
});

fn therapist_name(caps: &Captures) -> Option<String> {
    let name = caps.name("name")?.as_str();
    match caps.name("suffix") {
        Some(suffix) => Some(format!("{name}{}", suffix.as_str())),
        None if name.chars().count() <= 3 => Some(format!("{name}{DEFAULT_HONORIFIC}")),
        None => Some(name.to_string()),
    }
}

fn clock(caps: &Captures, fixed_minute: Option<u32>) -> Option<String> {
    let mut hour: u32 = caps.name("h")?.as_str().parse().ok()?;
    let minute: u32 = match fixed_minute {
        Some(m) => m,
        None => caps.name("m")?.as_str().parse().ok()?,
    };

    match caps.name("period").map(|p| p.as_str()) {
        Some("下午") | Some("晚上") if hour < 12 => hour += 12,
        Some("中午") if hour < 6 => hour += 12,
        _ => {}
    }

    (hour < 24 && minute < 60).then(|| format!("{hour:02}:{minute:02}"))
}

fn store_name(caps: &Captures) -> Option<String> {
    let mut store = caps.name("store")?.as_str().trim();
    while let Some(rest) = STORE_LEAD_INS.iter().find_map(|p| store.strip_prefix(p)) {
        store = rest;
    }
    if store.is_empty() || STORE_SUFFIXES.contains(&store) || store.ends_with("到店") {
        return None;
    }
    Some(store.to_string())
}

pub fn parse_therapist_name(text: &str) -> Option<String> {
    first_match(&THERAPIST_RULES, text).map(|(_, name)| name)
}

pub fn parse_appointment_time(text: &str) -> Option<String> {
    first_match(&TIME_RULES, text).map(|(_, time)| time)
}

pub fn parse_store_name(text: &str) -> Option<String> {
    first_match(&STORE_RULES, text).map(|(_, store)| store)
}

/// Leftmost service word in the text, else the default service.
pub fn parse_service_type(text: &str) -> String {
    SERVICE_RE
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| DEFAULT_SERVICE_TYPE.to_string())
}

pub struct IntentParser {
    offset: FixedOffset,
}

impl IntentParser {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn parse(&self, text: &str, context: &ContactContext) -> AppointmentRequest {
        let today = timestamps::local_now(self.offset).date();
        self.parse_on(text, context, today)
    }

    /// Like [`parse`](Self::parse) with an explicit "today".
    pub fn parse_on(&self, text: &str, context: &ContactContext, today: NaiveDate) -> AppointmentRequest {
        let request = AppointmentRequest {
            therapist_name: parse_therapist_name(text),
            appointment_time: parse_appointment_time(text),
            appointment_date: context
                .appointment_date
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| today.format("%Y-%m-%d").to_string()),
            store_name: context.store_name().or_else(|| parse_store_name(text)),
            customer_name: context.customer_name(),
            customer_phone: context.customer_phone(),
            service_type: parse_service_type(text),
            notes: format!("智能预约：{text}"),
            original_message: text.to_string(),
        };

        tracing::debug!(
            therapist = ?request.therapist_name,
            time = ?request.appointment_time,
            store = ?request.store_name,
            service = %request.service_type,
            "parsed appointment request"
        );
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> IntentParser {
        IntentParser::new(FixedOffset::east_opt(8 * 3600).unwrap())
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    #[test]
    fn test_parses_reference_message() {
        let req = parser().parse_on(
            "我需要调理师-马老师为我服务，预计16:30到店",
            &ContactContext::default(),
            today(),
        );
        assert_eq!(req.therapist_name.as_deref(), Some("马老师"));
        assert_eq!(req.appointment_time.as_deref(), Some("16:30"));
        assert_eq!(req.service_type, "调理");
        assert_eq!(req.store_name, None);
        assert_eq!(req.appointment_date, "2026-10-17");
    }

    #[test]
    fn test_half_hour_shorthand() {
        assert_eq!(parse_appointment_time("16点半").as_deref(), Some("16:30"));
    }

    #[test]
    fn test_time_rules_individually() {
        let rules = &*TIME_RULES;
        assert_eq!(rules[0].apply("9:05").as_deref(), Some("09:05"));
        assert_eq!(rules[0].apply("16：30").as_deref(), Some("16:30"));
        assert_eq!(rules[1].apply("16点30分").as_deref(), Some("16:30"));
        assert_eq!(rules[1].apply("16点半"), None);
        assert_eq!(rules[2].apply("3点半").as_deref(), Some("03:30"));
        assert_eq!(rules[3].apply("10点").as_deref(), Some("10:00"));
    }

    #[test]
    fn test_first_time_rule_wins() {
        let (rule, time) = first_match(&TIME_RULES, "16点半或者17:00").unwrap();
        assert_eq!(rule, "colon");
        assert_eq!(time, "17:00");
    }

    #[test]
    fn test_period_prefix_shifts_afternoon() {
        assert_eq!(parse_appointment_time("下午4点半").as_deref(), Some("16:30"));
        assert_eq!(parse_appointment_time("晚上8:15").as_deref(), Some("20:15"));
        assert_eq!(parse_appointment_time("中午1点").as_deref(), Some("13:00"));
        assert_eq!(parse_appointment_time("上午10点").as_deref(), Some("10:00"));
        assert_eq!(parse_appointment_time("下午14:00").as_deref(), Some("14:00"));
    }

    #[test]
    fn test_invalid_clock_values_rejected() {
        assert_eq!(parse_appointment_time("25:00"), None);
        assert_eq!(parse_appointment_time("16:75"), None);
        assert_eq!(parse_appointment_time("99点或者10点").as_deref(), Some("10:00"));
    }

    #[test]
    fn test_no_time() {
        assert_eq!(parse_appointment_time("明天可以吗"), None);
    }

    #[test]
    fn test_therapist_honorifics() {
        assert_eq!(parse_therapist_name("约王师傅").as_deref(), Some("王师傅"));
        assert_eq!(parse_therapist_name("李技师有空吗").as_deref(), Some("李技师"));
        assert_eq!(parse_therapist_name("想找马琳老师").as_deref(), Some("马琳老师"));
        assert_eq!(parse_therapist_name("张医生").as_deref(), Some("张医生"));
    }

    #[test]
    fn test_therapist_without_honorific_gets_default() {
        assert_eq!(parse_therapist_name("调理师-马琳，明天").as_deref(), Some("马琳老师"));
        assert_eq!(parse_therapist_name("我想找王 10点").as_deref(), Some("王老师"));
    }

    #[test]
    fn test_no_therapist() {
        assert_eq!(parse_therapist_name("我想预约明天下午"), None);
    }

    #[test]
    fn test_store_patterns() {
        assert_eq!(parse_store_name("我想去静安寺店做调理").as_deref(), Some("静安寺店"));
        assert_eq!(parse_store_name("徐汇分店").as_deref(), Some("徐汇分店"));
        assert_eq!(
            parse_store_name("名医堂·颈肩腰腿特色调理（静安寺店）").as_deref(),
            Some("静安寺店")
        );
    }

    #[test]
    fn test_arrival_phrase_is_not_a_store() {
        assert_eq!(parse_store_name("预计16:30到店"), None);
        assert_eq!(parse_store_name("几点到店，在静安寺店").as_deref(), Some("静安寺店"));
    }

    #[test]
    fn test_service_type_vocabulary() {
        assert_eq!(parse_service_type("想做艾灸"), "艾灸");
        assert_eq!(parse_service_type("推拿理疗加拔罐"), "推拿理疗");
        assert_eq!(parse_service_type("约个时间"), "调理");
    }

    #[test]
    fn test_context_supplies_identity_and_store() {
        let ctx = ContactContext {
            combined_name: Some("名医堂（静安寺店） - 张三19357509506".to_string()),
            shop_name: Some("名医堂·颈肩腰腿特色调理（静安寺店）".to_string()),
            appointment_date: Some("2026-10-18".to_string()),
            ..Default::default()
        };
        let req = parser().parse_on("马老师 徐汇店 10点", &ctx, today());
        assert_eq!(req.store_name.as_deref(), Some("名医堂·颈肩腰腿特色调理（静安寺店）"));
        assert_eq!(req.customer_name.as_deref(), Some("张三19357509506"));
        assert_eq!(req.customer_phone.as_deref(), Some("19357509506"));
        assert_eq!(req.appointment_date, "2026-10-18");
        assert_eq!(req.original_message, "马老师 徐汇店 10点");
    }

    #[test]
    fn test_unmatched_message_still_resolves_defaults() {
        let req = parser().parse_on("你好", &ContactContext::default(), today());
        assert!(req.is_underspecified());
        assert_eq!(req.service_type, DEFAULT_SERVICE_TYPE);
        assert_eq!(req.appointment_date, "2026-10-17");
        assert_eq!(req.customer_phone, None);
    }
}
