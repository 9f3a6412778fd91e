//! Terrain feature code to cost multiplier table.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default table for ISOM-style symbol codes. Negative entries are barriers.
const PRODUCTION_DEFAULTS: &[(&str, f32)] = &[
    ("201", -1.0),
    ("301", -1.0),
    ("307", -1.0),
    ("509", -1.0),
    ("513", -1.0),
    ("514", -1.0),
    ("515", -1.0),
    ("516", -1.0),
    ("520", -1.0),
    ("526", -1.0),
    ("528", -1.0),
    ("529", -1.0),
    ("206", -1.0),
    ("417", -1.0),
    ("518", -1.0),
    ("202", 10.0),
    ("210", 1.25),
    ("211", 1.67),
    ("212", 5.0),
    ("213", 1.25),
    ("302", 5.0),
    ("308", 2.0),
    ("309", 1.67),
    ("310", 1.43),
    ("403", 1.25),
    ("404", 1.25),
    ("406", 1.50),
    ("407", 1.50),
    ("408", 1.67),
    ("409", 1.67),
    ("410", 5.0),
    ("412", 1.11),
    ("413", 1.11),
    ("414", 1.11),
    ("311", 1.01),
    ("401", 1.0),
    ("402", 1.0),
    ("405", 1.0),
    ("501", 0.6),
    ("502", 0.6),
    ("503", 0.6),
    ("504", 0.6),
    ("505", 0.6),
    ("506", 0.65),
    ("507", 0.75),
    ("508", 0.8),
    ("519", 0.9),
    ("527", 1.0),
];

/// Mapping from terrain feature code to traversal cost multiplier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObstacleCostMap {
    costs: BTreeMap<String, f32>,
}

impl ObstacleCostMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn production_defaults() -> Self {
        PRODUCTION_DEFAULTS
            .iter()
            .map(|(code, cost)| (code.to_string(), *cost))
            .collect()
    }

    /// Parse `code: value` lines. Blank lines and `#` comments are skipped.
    pub fn parse(text: &str) -> Result<Self, PipelineError> {
        let mut costs = BTreeMap::new();
        for (idx, raw_line) in text.lines().enumerate() {
            let line_number = idx + 1;
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((code, value)) = line.split_once(':') else {
                return Err(PipelineError::Configuration(format!(
                    "obstacle costs line {}: missing ':' in '{}'",
                    line_number, line
                )));
            };
            let code = code.trim();
            if code.is_empty() {
                return Err(PipelineError::Configuration(format!(
                    "obstacle costs line {}: empty code",
                    line_number
                )));
            }
            let value = value.trim();
            let cost: f32 = value.parse().map_err(|_| {
                PipelineError::Configuration(format!(
                    "obstacle costs line {}: invalid value '{}'",
                    line_number, value
                ))
            })?;
            costs.insert(code.to_string(), cost);
        }
        Ok(Self { costs })
    }

    pub fn insert(&mut self, code: impl Into<String>, cost: f32) {
        self.costs.insert(code.into(), cost);
    }

    pub fn get(&self, code: &str) -> Option<f32> {
        self.costs.get(code).copied()
    }

    pub fn is_barrier(&self, code: &str) -> bool {
        self.get(code).map(|cost| cost < 0.0).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.costs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.costs.iter().map(|(code, cost)| (code.as_str(), *cost))
    }
}

impl FromIterator<(String, f32)> for ObstacleCostMap {
    fn from_iter<I: IntoIterator<Item = (String, f32)>>(iter: I) -> Self {
        Self {
            costs: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_entries_and_skips_comments() {
        let table = ObstacleCostMap::parse("# barriers\n201: -1.0\n\n  302 :5.0  \n501: 0.6\n")
            .expect("valid table");
        assert_eq!(table.len(), 3);
        assert_eq!(table.get("302"), Some(5.0));
        assert!(table.is_barrier("201"));
        assert!(!table.is_barrier("501"));
        assert!(!table.is_barrier("999"));
    }

    #[test]
    fn later_entries_override_earlier_ones() {
        let table = ObstacleCostMap::parse("401: 1.0\n401: 2.5").unwrap();
        assert_eq!(table.get("401"), Some(2.5));
    }

    #[test]
    fn reports_line_number_on_bad_input() {
        let err = ObstacleCostMap::parse("201: -1\n302 5.0").unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(ref msg) if msg.contains("line 2")));

        let err = ObstacleCostMap::parse(": 1.0").unwrap_err();
        assert!(err.to_string().contains("empty code"));

        let err = ObstacleCostMap::parse("401: fast").unwrap_err();
        assert!(err.to_string().contains("invalid value 'fast'"));
    }

    #[test]
    fn production_defaults_contain_barriers_and_fast_terrain() {
        let table = ObstacleCostMap::production_defaults();
        assert!(table.is_barrier("201"));
        assert!(table.is_barrier("518"));
        assert_eq!(table.get("202"), Some(10.0));
        assert_eq!(table.get("501"), Some(0.6));
        assert_eq!(table.len(), PRODUCTION_DEFAULTS.len());
    }
}
