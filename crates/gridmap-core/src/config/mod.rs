use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::geom::LatLng;

/// Editor tunables. Every field has a default; hosts override a subset with a JSON overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    pub blink_interval_ms: u64,
    pub blink_dim_opacity: f64,
    /// Lifetime of success/info notices. Errors never expire.
    pub notice_ttl_ms: u64,
    pub login_redirect_delay_ms: u64,
    pub zigzag_segments: usize,
    pub zigzag_variation: f64,
    pub max_sync_attempts: u32,
    pub map: MapViewConfig,
    pub colors: ColorConfig,
    pub api_base_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MapViewConfig {
    pub center: LatLng,
    pub zoom: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ColorConfig {
    pub healthy: String,
    pub down: String,
    /// Pin color per provider type, in display order.
    pub types: IndexMap<String, String>,
    pub fallback_type: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            blink_interval_ms: 800,
            blink_dim_opacity: 0.35,
            notice_ttl_ms: 3000,
            login_redirect_delay_ms: 1500,
            zigzag_segments: 5,
            zigzag_variation: 0.5,
            max_sync_attempts: 3,
            map: MapViewConfig::default(),
            colors: ColorConfig::default(),
            api_base_url: "http://localhost:3001/api/".to_string(),
        }
    }
}

impl Default for MapViewConfig {
    fn default() -> Self {
        Self {
            center: LatLng::new(20.0, 0.0),
            zoom: 2,
        }
    }
}

impl Default for ColorConfig {
    fn default() -> Self {
        let mut types = IndexMap::new();
        types.insert("Exchange".to_string(), "#4285F4".to_string());
        types.insert("Broker".to_string(), "#DB4437".to_string());
        types.insert("Market Maker".to_string(), "#0F9D58".to_string());
        Self {
            healthy: "#0F9D58".to_string(),
            down: "#DB4437".to_string(),
            types,
            fallback_type: "#757575".to_string(),
        }
    }
}

impl ColorConfig {
    pub fn type_color(&self, kind: &str) -> &str {
        self.types
            .get(kind)
            .map(String::as_str)
            .unwrap_or(self.fallback_type.as_str())
    }
}

impl EditorConfig {
    /// Defaults overlaid with `overrides` (a JSON object, merged recursively).
    pub fn from_overrides(overrides: &Value) -> Result<Self> {
        let mut base = serde_json::to_value(Self::default()).map_err(config_error)?;
        deep_merge_value(&mut base, overrides);
        let cfg: Self = serde_json::from_value(base).map_err(config_error)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.blink_interval_ms == 0 {
            return Err(Error::Config {
                message: "blinkIntervalMs must be positive".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.blink_dim_opacity) {
            return Err(Error::Config {
                message: format!("blinkDimOpacity out of range: {}", self.blink_dim_opacity),
            });
        }
        if self.zigzag_segments == 0 {
            return Err(Error::Config {
                message: "zigzagSegments must be at least 1".to_string(),
            });
        }
        if self.max_sync_attempts == 0 {
            return Err(Error::Config {
                message: "maxSyncAttempts must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn blink_interval(&self) -> Duration {
        Duration::from_millis(self.blink_interval_ms)
    }

    pub fn notice_ttl(&self) -> Duration {
        Duration::from_millis(self.notice_ttl_ms)
    }

    pub fn login_redirect_delay(&self) -> Duration {
        Duration::from_millis(self.login_redirect_delay_ms)
    }
}

fn config_error(err: serde_json::Error) -> Error {
    Error::Config {
        message: err.to_string(),
    }
}

fn deep_merge_value(base: &mut Value, incoming: &Value) {
    match (base, incoming) {
        (Value::Object(base_map), Value::Object(in_map)) => {
            for (key, in_value) in in_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge_value(base_value, in_value),
                    None => {
                        base_map.insert(key.clone(), in_value.clone());
                    }
                }
            }
        }
        (base_slot, in_value) => {
            *base_slot = in_value.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_match_the_editor_contract() {
        let cfg = EditorConfig::default();
        assert_eq!(cfg.blink_interval(), Duration::from_millis(800));
        assert_eq!(cfg.notice_ttl(), Duration::from_millis(3000));
        assert_eq!(cfg.zigzag_segments, 5);
        assert_eq!(cfg.colors.type_color("Broker"), "#DB4437");
        assert_eq!(cfg.colors.type_color("Custodian"), "#757575");
    }

    #[test]
    fn overrides_merge_nested_objects() {
        let cfg = EditorConfig::from_overrides(&json!({
            "blinkIntervalMs": 250,
            "map": { "zoom": 5 },
            "colors": { "types": { "Custodian": "#000000" } }
        }))
        .unwrap();
        assert_eq!(cfg.blink_interval_ms, 250);
        assert_eq!(cfg.map.zoom, 5);
        assert_eq!(cfg.map.center, LatLng::new(20.0, 0.0));
        assert_eq!(cfg.colors.type_color("Custodian"), "#000000");
        assert_eq!(cfg.colors.type_color("Exchange"), "#4285F4");
    }

    #[test]
    fn invalid_overrides_are_config_errors() {
        let err = EditorConfig::from_overrides(&json!({ "zigzagSegments": 0 })).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));

        let err = EditorConfig::from_overrides(&json!({ "blinkIntervalMs": "fast" })).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
