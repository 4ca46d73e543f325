use std::{str::FromStr, time::Duration};

use shared::SurfaceType;

use crate::{
    builder::DEFAULT_FREE_DRAW_MIN_DISTANCE_M, history::DEFAULT_HISTORY_LIMIT,
    metrics::DEFAULT_WALKING_SPEED_KMH, snap::SnapOptions,
};

const DEFAULT_API_ROOT: &str = "http://localhost:8080/api";

#[derive(Debug, Clone)]
pub struct DraftConfig {
    pub api_root: String,
    pub http_timeout: Duration,
    pub snap_enabled: bool,
    pub snap_threshold_m: f64,
    pub snap_timeout: Duration,
    pub free_draw_min_distance_m: f64,
    pub history_limit: usize,
    pub walking_speed_kmh: f64,
    pub route_name: String,
    pub segment_surface: SurfaceType,
}

impl Default for DraftConfig {
    fn default() -> Self {
        Self {
            api_root: DEFAULT_API_ROOT.to_string(),
            http_timeout: Duration::from_secs(10),
            snap_enabled: true,
            snap_threshold_m: 40.0,
            snap_timeout: Duration::from_millis(1500),
            free_draw_min_distance_m: DEFAULT_FREE_DRAW_MIN_DISTANCE_M,
            history_limit: DEFAULT_HISTORY_LIMIT,
            walking_speed_kmh: DEFAULT_WALKING_SPEED_KMH,
            route_name: "Route draft".to_string(),
            segment_surface: SurfaceType::FOREST_TRAIL,
        }
    }
}

impl DraftConfig {
    /// Reads `DRAFTER_*` variables, keeping the default for anything unset or
    /// unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_root: api_root(),
            http_timeout: env_parse("DRAFTER_HTTP_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.http_timeout),
            snap_enabled: env_flag("DRAFTER_SNAP_ENABLED").unwrap_or(defaults.snap_enabled),
            snap_threshold_m: env_parse("DRAFTER_SNAP_THRESHOLD_M")
                .unwrap_or(defaults.snap_threshold_m),
            snap_timeout: env_parse("DRAFTER_SNAP_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.snap_timeout),
            free_draw_min_distance_m: env_parse("DRAFTER_FREE_DRAW_MIN_M")
                .unwrap_or(defaults.free_draw_min_distance_m),
            history_limit: env_parse("DRAFTER_HISTORY_LIMIT").unwrap_or(defaults.history_limit),
            walking_speed_kmh: env_parse("DRAFTER_WALKING_SPEED_KMH")
                .unwrap_or(defaults.walking_speed_kmh),
            route_name: std::env::var("DRAFTER_ROUTE_NAME").unwrap_or(defaults.route_name),
            segment_surface: std::env::var("DRAFTER_SEGMENT_SURFACE")
                .map(SurfaceType::new)
                .unwrap_or(defaults.segment_surface),
        }
    }

    pub fn snap_options(&self) -> SnapOptions {
        SnapOptions {
            enabled: self.snap_enabled,
            threshold_meters: self.snap_threshold_m,
            timeout: self.snap_timeout,
        }
    }
}

fn api_root() -> String {
    if let Ok(url) = std::env::var("DRAFTER_API_ROOT") {
        return url.trim_end_matches('/').to_string();
    }
    if let Some(url) = option_env!("DRAFTER_API_ROOT") {
        return url.trim_end_matches('/').to_string();
    }
    DEFAULT_API_ROOT.to_string()
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("ignoring invalid value {raw:?} for {key}");
            None
        }
    }
}

fn env_flag(key: &str) -> Option<bool> {
    let raw = std::env::var(key).ok()?;
    let flag = parse_flag(&raw);
    if flag.is_none() {
        tracing::warn!("ignoring invalid value {raw:?} for {key}");
    }
    flag
}

/// Accepts `1`/`0`, `true`/`false`, `yes`/`no` and `on`/`off`, in any case.
fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
