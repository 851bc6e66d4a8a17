//! Dashboard stats and progress. These calls degrade to defaults instead of failing.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api::ApiClient;
use crate::engine::RequestOptions;
use crate::error::Result;

// Heavier queries get longer deadlines than the client default.
const DASHBOARD_TIMEOUT_MS: u64 = 15_000;
const PROGRESS_TIMEOUT_MS: u64 = 12_000;
const UPDATE_GOAL_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_WEEKLY_GOAL: u32 = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub weekly_goal: f64,
    pub mastery_level: f64,
    pub study_streak: f64,
    pub focus_score: f64,
    pub retention_rate: f64,
    pub cards_mastered: f64,
    pub minutes_per_day: f64,
    pub accuracy: f64,
}

/// Finite number or 0. Numeric strings count.
fn coerce_number(v: Option<&Value>) -> f64 {
    let n = match v {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    n.filter(|x| x.is_finite()).unwrap_or(0.0)
}

impl DashboardStats {
    pub fn from_value(data: &Value) -> Self {
        let n = |k: &str| coerce_number(data.get(k));
        DashboardStats {
            weekly_goal: n("weekly_goal"),
            mastery_level: n("mastery_level"),
            study_streak: n("study_streak"),
            focus_score: n("focus_score"),
            retention_rate: n("retention_rate"),
            cards_mastered: n("cards_mastered"),
            minutes_per_day: n("minutes_per_day"),
            accuracy: n("accuracy"),
        }
    }

    /// Same stats with every figure rounded half-up to a whole number.
    pub fn rounded(&self) -> Self {
        let r = |x: f64| (x + 0.5).floor();
        DashboardStats {
            weekly_goal: r(self.weekly_goal),
            mastery_level: r(self.mastery_level),
            study_streak: r(self.study_streak),
            focus_score: r(self.focus_score),
            retention_rate: r(self.retention_rate),
            cards_mastered: r(self.cards_mastered),
            minutes_per_day: r(self.minutes_per_day),
            accuracy: r(self.accuracy),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardBundle {
    pub stats: DashboardStats,
    pub progress: Vec<Value>,
}

fn options(timeout_ms: u64, explicit_token: Option<&str>) -> RequestOptions {
    let mut opts = RequestOptions::new().timeout_ms(timeout_ms);
    if let Some(token) = explicit_token {
        let mut h = HeaderMap::new();
        if let Ok(v) = HeaderValue::from_str(&format!("Bearer {}", token)) {
            h.insert(AUTHORIZATION, v);
        }
        opts = opts.headers(h);
    }
    opts
}

pub async fn fetch_user_stats(api: &ApiClient, explicit_token: Option<&str>) -> DashboardStats {
    match api
        .get_json("/dashboard", &options(DASHBOARD_TIMEOUT_MS, explicit_token))
        .await
    {
        Ok(data) => DashboardStats::from_value(&data),
        Err(e) => {
            log::error!("Error fetching dashboard data: {}", e);
            DashboardStats::default()
        }
    }
}

pub async fn fetch_progress(api: &ApiClient, explicit_token: Option<&str>) -> Vec<Value> {
    match api
        .get_json("/progress", &options(PROGRESS_TIMEOUT_MS, explicit_token))
        .await
    {
        Ok(Value::Array(items)) => items,
        Ok(_) => Vec::new(),
        Err(e) => {
            log::error!("Error fetching progress: {}", e);
            Vec::new()
        }
    }
}

pub async fn fetch_dashboard_bundle(api: &ApiClient, explicit_token: Option<&str>) -> DashboardBundle {
    let (stats, progress) = tokio::join!(
        fetch_user_stats(api, explicit_token),
        fetch_progress(api, explicit_token)
    );
    DashboardBundle { stats, progress }
}

/// Everything the study overview shows: decks, progress, goal and stats.
#[derive(Debug, Clone, Serialize)]
pub struct UserData {
    pub decks: Vec<Value>,
    pub progress: Vec<Value>,
    pub weekly_goal: u32,
    pub stats: DashboardStats,
}

fn goal_from(data: &Value) -> Option<u32> {
    let goal = coerce_number(data.get("weekly_goal"));
    if goal > 0.0 {
        Some(goal.round().min(u32::MAX as f64) as u32)
    } else {
        None
    }
}

/// Loads decks and progress (both required), then the dashboard. A failing
/// dashboard leaves the goal at 10 and the stats at zero.
pub async fn fetch_user_data(api: &ApiClient) -> Result<UserData> {
    let opts = RequestOptions::new();
    let decks = match api.get_json("/decks", &opts).await? {
        Value::Array(items) => items,
        Value::Object(mut m) => match m.remove("items") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    let progress = match api.get_json("/progress", &opts).await? {
        Value::Array(items) => items,
        _ => Vec::new(),
    };

    let (weekly_goal, stats) = match api.get_json("/dashboard", &opts).await {
        Ok(data) => (
            goal_from(&data).unwrap_or(DEFAULT_WEEKLY_GOAL),
            DashboardStats::from_value(&data).rounded(),
        ),
        Err(e) => {
            log::error!("Failed to load dashboard stats: {}", e);
            (DEFAULT_WEEKLY_GOAL, DashboardStats::default())
        }
    };
    let stats = DashboardStats {
        weekly_goal: f64::from(weekly_goal),
        ..stats
    };

    Ok(UserData {
        decks,
        progress,
        weekly_goal,
        stats,
    })
}

/// Returns the goal the backend echoed, or `goal` when it echoed nothing usable.
pub async fn update_weekly_goal(api: &ApiClient, goal: u32) -> Result<u32> {
    let data = api
        .put_json(
            "/user/stats",
            &json!({ "weekly_goal": goal }),
            &RequestOptions::new().timeout_ms(UPDATE_GOAL_TIMEOUT_MS),
        )
        .await?;
    Ok(data
        .get("weekly_goal")
        .and_then(Value::as_u64)
        .and_then(|g| u32::try_from(g).ok())
        .unwrap_or(goal))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_coerce_bad_values_to_zero() {
        let stats = DashboardStats::from_value(&json!({
            "weekly_goal": 20,
            "mastery_level": "42.5",
            "study_streak": null,
            "focus_score": "n/a",
            "accuracy": 0.9
        }));
        assert_eq!(stats.weekly_goal, 20.0);
        assert_eq!(stats.mastery_level, 42.5);
        assert_eq!(stats.study_streak, 0.0);
        assert_eq!(stats.focus_score, 0.0);
        assert_eq!(stats.retention_rate, 0.0);
        assert_eq!(stats.accuracy, 0.9);
    }

    #[test]
    fn rounding_is_half_up() {
        let stats = DashboardStats {
            mastery_level: 42.5,
            focus_score: 7.49,
            accuracy: 88.51,
            ..DashboardStats::default()
        }
        .rounded();
        assert_eq!(stats.mastery_level, 43.0);
        assert_eq!(stats.focus_score, 7.0);
        assert_eq!(stats.accuracy, 89.0);
    }

    #[test]
    fn zero_or_missing_goal_is_not_a_goal() {
        assert_eq!(goal_from(&json!({"weekly_goal": 0})), None);
        assert_eq!(goal_from(&json!({})), None);
        assert_eq!(goal_from(&json!({"weekly_goal": "15"})), Some(15));
    }

    #[test]
    fn non_object_payload_gives_defaults() {
        assert_eq!(
            DashboardStats::from_value(&Value::String("oops".into())),
            DashboardStats::default()
        );
    }
}
