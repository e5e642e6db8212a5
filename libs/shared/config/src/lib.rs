use std::env;
use std::str::FromStr;

use chrono::{FixedOffset, NaiveDate, NaiveTime, Offset, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// How the availability evaluator treats blocked-date rows that contradict
/// themselves (inverted dates, missing or inverted times).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedIntervalPolicy {
    /// Malformed rows block nothing.
    #[default]
    FailOpen,
    /// Malformed rows block every date they cover.
    FailClosed,
}

impl FromStr for MalformedIntervalPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail_open" | "open" => Ok(Self::FailOpen),
            "fail_closed" | "closed" => Ok(Self::FailClosed),
            other => Err(format!("unknown malformed interval policy: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub supabase_service_role_key: String,
    pub port: u16,
    pub clinic_utc_offset_minutes: i32,
    pub clinic_open_time: NaiveTime,
    pub clinic_close_time: NaiveTime,
    pub slot_interval_minutes: u32,
    pub malformed_interval_policy: MalformedIntervalPolicy,
    pub check_in_token_ttl_hours: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_jwt_secret: String::new(),
            supabase_service_role_key: String::new(),
            port: 3000,
            clinic_utc_offset_minutes: 0,
            clinic_open_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            clinic_close_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default(),
            slot_interval_minutes: 30,
            malformed_interval_policy: MalformedIntervalPolicy::FailOpen,
            check_in_token_ttl_hours: 72,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, public routes will use the anon key");
                    String::new()
                }),
            port: parse_var("PORT", defaults.port),
            clinic_utc_offset_minutes: parse_var("CLINIC_UTC_OFFSET_MINUTES", defaults.clinic_utc_offset_minutes),
            clinic_open_time: parse_time_var("CLINIC_OPEN_TIME", defaults.clinic_open_time),
            clinic_close_time: parse_time_var("CLINIC_CLOSE_TIME", defaults.clinic_close_time),
            slot_interval_minutes: parse_var("SLOT_INTERVAL_MINUTES", defaults.slot_interval_minutes),
            malformed_interval_policy: parse_var("MALFORMED_INTERVAL_POLICY", defaults.malformed_interval_policy),
            check_in_token_ttl_hours: parse_var("CHECK_IN_TOKEN_TTL_HOURS", defaults.check_in_token_ttl_hours),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        if config.clinic_open_time >= config.clinic_close_time {
            warn!(
                "CLINIC_OPEN_TIME ({}) is not before CLINIC_CLOSE_TIME ({}), no bookable times will be offered",
                config.clinic_open_time, config.clinic_close_time
            );
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    /// Offset of the clinic's wall clock. Falls back to UTC when the configured
    /// offset is out of range.
    pub fn clinic_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.clinic_utc_offset_minutes.saturating_mul(60)).unwrap_or_else(|| {
            warn!("CLINIC_UTC_OFFSET_MINUTES {} out of range, using UTC", self.clinic_utc_offset_minutes);
            Utc.fix()
        })
    }

    /// Today's calendar date at the clinic.
    pub fn clinic_today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.clinic_offset()).date_naive()
    }
}

fn parse_var<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {:?}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}

fn parse_time_var(name: &str, default: NaiveTime) -> NaiveTime {
    match env::var(name) {
        Ok(raw) => NaiveTime::parse_from_str(raw.trim(), "%H:%M").unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {}", name, raw, default.format("%H:%M"));
            default
        }),
        Err(_) => default,
    }
}
