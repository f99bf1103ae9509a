//! Process configuration read from environment variables.

use std::time::Duration;

use tracing::warn;

use teashop_inventory::LOW_STOCK_THRESHOLD;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_NOTIFY_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_PAYMENT_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: String,
    /// `None` runs the service on in-memory stores.
    pub database_url: Option<String>,
    pub low_stock_threshold: i64,
    pub notify_timeout: Duration,
    pub payment_timeout: Duration,
    pub admin_phone: Option<String>,
    pub admin_email: Option<String>,
    /// Base URL of the hosted payment page; online orders get no link when unset.
    pub payment_page_url: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            database_url: None,
            low_stock_threshold: LOW_STOCK_THRESHOLD,
            notify_timeout: Duration::from_millis(DEFAULT_NOTIFY_TIMEOUT_MS),
            payment_timeout: Duration::from_millis(DEFAULT_PAYMENT_TIMEOUT_MS),
            admin_phone: None,
            admin_email: None,
            payment_page_url: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable values keep their
    /// default and log a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let low_stock_threshold = match get("LOW_STOCK_THRESHOLD") {
            None => defaults.low_stock_threshold,
            Some(raw) => match raw.parse::<i64>() {
                Ok(v) if v >= 0 => v,
                _ => {
                    warn!(value = %raw, "invalid LOW_STOCK_THRESHOLD, using default");
                    defaults.low_stock_threshold
                }
            },
        };

        let millis = |key: &str, default: Duration| match get(key) {
            None => default,
            Some(raw) => match raw.parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => {
                    warn!(key, value = %raw, "invalid timeout, using default");
                    default
                }
            },
        };

        Self {
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            database_url: get("DATABASE_URL"),
            low_stock_threshold,
            notify_timeout: millis("NOTIFY_TIMEOUT_MS", defaults.notify_timeout),
            payment_timeout: millis("PAYMENT_TIMEOUT_MS", defaults.payment_timeout),
            admin_phone: get("ADMIN_PHONE"),
            admin_email: get("ADMIN_EMAIL"),
            payment_page_url: get("PAYMENT_PAGE_URL"),
        }
    }
}
