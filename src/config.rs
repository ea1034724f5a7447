use std::env;
use std::time::Duration;

use chrono::FixedOffset;

/// Upper bound on booking API attempts per call.
pub const MAX_BOOKING_ATTEMPTS: u32 = 10;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub webhook_secret: String,
    pub booking_api_url: String,
    pub booking_api_timeout_secs: u64,
    pub booking_api_max_retries: u32,
    pub local_utc_offset_hours: i32,
    pub reply_window_secs: i64,
    pub clock_skew_secs: i64,
    pub history_limit: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: parse_env("PORT", 3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "concierge.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            webhook_secret: env::var("WEBHOOK_SECRET").unwrap_or_default(),
            booking_api_url: env::var("BOOKING_API_URL")
                .unwrap_or_else(|_| "http://localhost:3001/api/v1/client".to_string()),
            booking_api_timeout_secs: parse_env("BOOKING_API_TIMEOUT_SECS", 10),
            booking_api_max_retries: parse_env::<u32>("BOOKING_API_MAX_RETRIES", 3)
                .clamp(1, MAX_BOOKING_ATTEMPTS),
            local_utc_offset_hours: parse_env("LOCAL_UTC_OFFSET_HOURS", 8),
            reply_window_secs: parse_env("REPLY_WINDOW_SECS", 300),
            clock_skew_secs: parse_env("CLOCK_SKEW_SECS", 60),
            history_limit: parse_env("HISTORY_LIMIT", 50),
        }
    }

    /// Fixed offset all stored timestamps and gate decisions are expressed in.
    pub fn local_offset(&self) -> anyhow::Result<FixedOffset> {
        FixedOffset::east_opt(self.local_utc_offset_hours * 3600).ok_or_else(|| {
            anyhow::anyhow!(
                "LOCAL_UTC_OFFSET_HOURS out of range: {}",
                self.local_utc_offset_hours
            )
        })
    }

    pub fn booking_api_timeout(&self) -> Duration {
        Duration::from_secs(self.booking_api_timeout_secs)
    }

    /// Upper bound on one create call including the client's retries and
    /// their 1s, 2s, 4s... backoff.
    pub fn booking_call_deadline(&self) -> Duration {
        let attempts = self.booking_api_max_retries.clamp(1, MAX_BOOKING_ATTEMPTS);
        let backoff_secs = (1u64 << (attempts - 1)) - 1;
        self.booking_api_timeout() * attempts + Duration::from_secs(backoff_secs)
    }

    pub fn reply_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.reply_window_secs)
    }

    pub fn clock_skew(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.clock_skew_secs)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
