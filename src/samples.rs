//! Built-in sample machines, compiled into the binary and parsed once on first use.

use crate::parser::{parse, Description};
use crate::types::NdtmError;
use log::error;

// Default embedded samples, keyed by file stem
const SAMPLE_TEXTS: [(&str, &str); 4] = [
    ("contains-ab", include_str!("../demos/contains-ab.ndtm")),
    ("endless-walk", include_str!("../demos/endless-walk.ndtm")),
    ("even-length", include_str!("../demos/even-length.ndtm")),
    ("scan-right", include_str!("../demos/scan-right.ndtm")),
];

/// A named sample together with its source text.
#[derive(Debug)]
pub struct Sample {
    pub name: &'static str,
    pub source: &'static str,
    pub description: Description,
}

lazy_static::lazy_static! {
    pub static ref SAMPLES: Vec<Sample> = SAMPLE_TEXTS
        .iter()
        .filter_map(|&(name, source)| match parse(source) {
            Ok(description) => Some(Sample {
                name,
                source,
                description,
            }),
            Err(e) => {
                error!("Failed to parse sample {}: {}", name, e);
                None
            }
        })
        .collect();
}

pub struct SampleManager;

impl SampleManager {
    /// List all sample names, in alphabetical order.
    pub fn names() -> Vec<&'static str> {
        SAMPLES.iter().map(|sample| sample.name).collect()
    }

    /// Get a sample by its name.
    pub fn get(name: &str) -> Result<&'static Sample, NdtmError> {
        SAMPLES
            .iter()
            .find(|sample| sample.name == name)
            .ok_or_else(|| NdtmError::ValidationError(format!("Sample '{}' not found", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use crate::types::Verdict;

    #[test]
    fn test_all_samples_parse() {
        assert_eq!(SampleManager::names().len(), SAMPLE_TEXTS.len());
        assert_eq!(
            SampleManager::names(),
            vec!["contains-ab", "endless-walk", "even-length", "scan-right"]
        );
    }

    #[test]
    fn test_sample_not_found() {
        let result = SampleManager::get("missing");
        assert!(matches!(result, Err(NdtmError::ValidationError(_))));
    }

    #[test]
    fn test_sample_verdicts() {
        let expected = [
            ("scan-right", vec![Verdict::Accept, Verdict::Accept, Verdict::Reject]),
            ("contains-ab", vec![Verdict::Accept, Verdict::Reject, Verdict::Accept]),
            ("endless-walk", vec![Verdict::Undecided]),
            ("even-length", vec![Verdict::Accept, Verdict::Reject, Verdict::Accept]),
        ];

        for (name, verdicts) in expected {
            let sample = SampleManager::get(name).unwrap();
            assert_eq!(
                sample.description.verdicts(EngineConfig::default()).unwrap(),
                verdicts,
                "sample {}",
                name
            );
        }
    }
}
