//! Dataset classification.

use serde::Serialize;

use crate::config::DatasetConfig;

/// Which canonical schema a dataset id maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    /// Hospital General Information.
    Hospitals,
    /// HCAHPS patient survey scores; lookups are keyed by provider id.
    Hcahps,
    /// Any other dataset id. Served with the hospital row shape.
    Generic,
}

impl DatasetKind {
    /// Classify a normalized (lowercase) dataset id.
    pub fn classify(dataset: &str, datasets: &DatasetConfig) -> Self {
        if dataset.eq_ignore_ascii_case(&datasets.hcahps_id) {
            DatasetKind::Hcahps
        } else if dataset.eq_ignore_ascii_case(&datasets.hospitals_id) {
            DatasetKind::Hospitals
        } else {
            DatasetKind::Generic
        }
    }

    pub fn is_hcahps(self) -> bool {
        self == DatasetKind::Hcahps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        let datasets = DatasetConfig::default();
        assert_eq!(DatasetKind::classify("xubh-q36u", &datasets), DatasetKind::Hospitals);
        assert_eq!(DatasetKind::classify("DGCK-SYFZ", &datasets), DatasetKind::Hcahps);
        assert_eq!(DatasetKind::classify("77hc-ibv8", &datasets), DatasetKind::Generic);
    }
}
