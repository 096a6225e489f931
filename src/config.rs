use anyhow::{Context, Result};
use std::collections::BTreeMap;

/// Maximum endpoint distance, in meters, for a shape and an itinerary to be
/// considered the same route.
pub const DEFAULT_TOLERANCE_METERS: f64 = 200.0;

/// Tunables of the unification core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnifyConfig {
    pub tolerance_meters: f64,
}

impl Default for UnifyConfig {
    fn default() -> Self {
        Self {
            tolerance_meters: DEFAULT_TOLERANCE_METERS,
        }
    }
}

impl UnifyConfig {
    pub fn with_tolerance(tolerance_meters: f64) -> Result<Self> {
        if !tolerance_meters.is_finite() || tolerance_meters < 0.0 {
            anyhow::bail!("tolerance must be a non-negative number of meters, got {tolerance_meters}");
        }
        Ok(Self { tolerance_meters })
    }
}

/// The set of lines a run should process.
///
/// Stored as a JSON object keyed by line number; values are ignored so the
/// operator's existing line → route map can be used as is:
/// ```json
/// {
///   "022": [1904, 1905],
///   "203": []
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct LineSelection {
    entries: BTreeMap<String, serde_json::Value>,
}

impl LineSelection {
    /// Loads the selection from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read line selection '{path}'"))?;
        Self::from_json(&content).with_context(|| format!("invalid line selection '{path}'"))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let entries: BTreeMap<String, serde_json::Value> = serde_json::from_str(content)?;
        Ok(Self { entries })
    }

    pub fn contains(&self, line_number: &str) -> bool {
        self.entries.contains_key(line_number)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Selected line numbers in ascending order.
    pub fn line_numbers(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tolerance() {
        assert_eq!(UnifyConfig::default().tolerance_meters, 200.0);
    }

    #[test]
    fn test_rejects_negative_tolerance() {
        assert!(UnifyConfig::with_tolerance(-1.0).is_err());
        assert!(UnifyConfig::with_tolerance(f64::NAN).is_err());
        assert_eq!(UnifyConfig::with_tolerance(50.0).unwrap().tolerance_meters, 50.0);
    }

    #[test]
    fn test_line_selection_keys() {
        let selection = LineSelection::from_json(r#"{"203": [1], "022": null}"#).unwrap();
        assert!(selection.contains("022"));
        assert!(!selection.contains("100"));
        assert_eq!(selection.line_numbers().collect::<Vec<_>>(), vec!["022", "203"]);
    }

    #[test]
    fn test_line_selection_rejects_list() {
        assert!(LineSelection::from_json(r#"["022"]"#).is_err());
    }
}
