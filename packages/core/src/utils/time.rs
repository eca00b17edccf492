// Время

use chrono::{DateTime, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Unix timestamp в секундах
pub fn current_timestamp() -> i64 {
    Utc::now().timestamp()
}
