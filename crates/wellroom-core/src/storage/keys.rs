//! Per-user persistence keys, namespaced as `wellroom.<feature>/<user>`.
//!
//! Feature names never contain `/`, so the first `/` ends the feature and
//! any user id, dotted or not, maps to its own key.

fn key(feature: &str, user_id: &str) -> String {
    format!("wellroom.{feature}/{user_id}")
}

pub fn meditation_duration(user_id: &str) -> String {
    key("meditation.duration", user_id)
}

pub fn meditation_log(user_id: &str) -> String {
    key("meditation.log", user_id)
}

pub fn reminder_cycle(user_id: &str) -> String {
    key("hydration.reminder", user_id)
}

pub fn hydration_log(user_id: &str) -> String {
    key("hydration.log", user_id)
}

pub fn usage(user_id: &str) -> String {
    key("usage", user_id)
}

pub fn usage_limit(user_id: &str) -> String {
    key("usage.limit", user_id)
}

pub fn usage_alerts(user_id: &str) -> String {
    key("usage.alerts", user_id)
}

pub fn mood(user_id: &str) -> String {
    key("mood", user_id)
}
