//! Response payload of one drilling-source iteration
//!
//! The simulator is loosely typed: numbers sometimes arrive as strings, as
//! `null`, or not at all. Every numeric field is therefore parsed leniently
//! and a value that cannot be read as a finite number becomes `None`.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::path::ObstaclePosition;

/// Directional action taken by the simulator for one step
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DrillingAction {
    /// Measured-depth length of the step
    #[serde(default, deserialize_with = "lenient_f64")]
    pub step_md: Option<f64>,

    /// Inclination from vertical, in degrees
    #[serde(default, deserialize_with = "lenient_f64")]
    pub inclination: Option<f64>,

    /// Azimuth in the horizontal plane, in degrees
    #[serde(default, deserialize_with = "lenient_f64")]
    pub azimuth: Option<f64>,

    /// Action kind, e.g. "drill" or "stop"
    #[serde(default, rename = "action", deserialize_with = "lenient_string")]
    pub kind: Option<String>,
}

impl DrillingAction {
    pub fn is_drill(&self) -> bool {
        self.kind
            .as_deref()
            .map(|k| k.trim().eq_ignore_ascii_case("drill"))
            .unwrap_or(false)
    }
}

/// Obstacle information reported by the simulator
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObstacleReport {
    pub detected: bool,
    pub position: Option<ObstaclePosition>,
}

/// Ephemeral result of one request against the drilling source
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IterationResult {
    #[serde(default, deserialize_with = "lenient_action")]
    pub action: Option<DrillingAction>,

    /// Authoritative cumulative measured depth
    #[serde(default, deserialize_with = "lenient_f64")]
    pub current_md: Option<f64>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub observed_lithology: Option<String>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub precision_improvement: Option<f64>,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub image_quality: Option<f64>,

    /// Frame location relative to the source base URL
    #[serde(default, deserialize_with = "lenient_string")]
    pub frame_path: Option<String>,

    /// Inline frame, either a data URI or raw base64
    #[serde(default, deserialize_with = "lenient_string")]
    pub frame_image_base64: Option<String>,

    #[serde(default, deserialize_with = "lenient_bool")]
    pub obstacle_detected: Option<bool>,

    #[serde(default, deserialize_with = "lenient_obstacle_position")]
    pub obstacle_position: Option<ObstaclePosition>,
}

impl IterationResult {
    /// Parse a raw response body
    pub fn from_json(body: &str) -> serde_json::Result<Self> {
        serde_json::from_str(body)
    }

    pub fn obstacle(&self) -> ObstacleReport {
        ObstacleReport {
            detected: self.obstacle_detected.unwrap_or(false),
            position: self.obstacle_position,
        }
    }

    pub fn has_frame(&self) -> bool {
        self.frame_image_base64.as_deref().is_some_and(|s| !s.trim().is_empty())
            || self.frame_path.as_deref().is_some_and(|s| !s.trim().is_empty())
    }
}

fn number_from_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_from_value))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        Some(Value::Number(n)) => n.as_f64().map(|v| v != 0.0),
        _ => None,
    })
}

fn lenient_action<'de, D>(deserializer: D) -> Result<Option<DrillingAction>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(v @ Value::Object(_)) => serde_json::from_value(v).ok(),
        _ => None,
    })
}

fn lenient_obstacle_position<'de, D>(deserializer: D) -> Result<Option<ObstaclePosition>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let Some(Value::Object(map)) = value else {
        return Ok(None);
    };

    let x = map.get("x").and_then(number_from_value);
    let y = map.get("y").and_then(number_from_value);
    let depth = map.get("depth").and_then(number_from_value);

    Ok(match (x, y, depth) {
        (Some(x), Some(y), Some(depth)) => Some(ObstaclePosition { x, y, depth }),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_response() {
        let body = r#"{
            "action": {"step_md": 12.5, "inclination": 30, "azimuth": 45.0, "action": "drill"},
            "current_md": 112.5,
            "observed_lithology": "Sandstone",
            "precision_improvement": 8.0,
            "image_quality": 61.0,
            "frame_path": "frames/frame_3.png"
        }"#;

        let result = IterationResult::from_json(body).unwrap();
        let action = result.action.clone().unwrap();
        assert_eq!(action.step_md, Some(12.5));
        assert_eq!(action.inclination, Some(30.0));
        assert!(action.is_drill());
        assert_eq!(result.current_md, Some(112.5));
        assert_eq!(result.observed_lithology.as_deref(), Some("Sandstone"));
        assert_eq!(result.frame_path.as_deref(), Some("frames/frame_3.png"));
        assert!(result.has_frame());
    }

    #[test]
    fn test_malformed_numbers_become_none() {
        let body = r#"{
            "action": {"step_md": "abc", "inclination": null, "azimuth": "90", "action": 7},
            "current_md": "not a number",
            "image_quality": true
        }"#;

        let result = IterationResult::from_json(body).unwrap();
        let action = result.action.unwrap();
        assert_eq!(action.step_md, None);
        assert_eq!(action.inclination, None);
        assert_eq!(action.azimuth, Some(90.0));
        assert!(!action.is_drill());
        assert_eq!(result.current_md, None);
        assert_eq!(result.image_quality, None);
    }

    #[test]
    fn test_non_object_action_is_absent() {
        let result = IterationResult::from_json(r#"{"action": "drill"}"#).unwrap();
        assert!(result.action.is_none());
    }

    #[test]
    fn test_empty_object() {
        let result = IterationResult::from_json("{}").unwrap();
        assert_eq!(result, IterationResult::default());
        assert!(!result.has_frame());
        assert!(!result.obstacle().detected);
    }

    #[test]
    fn test_obstacle_report() {
        let body = r#"{"obstacle_detected": "true", "obstacle_position": {"x": 1, "y": 2, "depth": 30}}"#;
        let result = IterationResult::from_json(body).unwrap();
        let obstacle = result.obstacle();
        assert!(obstacle.detected);
        assert_eq!(
            obstacle.position,
            Some(ObstaclePosition {
                x: 1.0,
                y: 2.0,
                depth: 30.0
            })
        );
    }
}
