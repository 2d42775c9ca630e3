// ============================================================
// Layer 3 — Dataset Information
// ============================================================
// data_info.json maps each dataset name to the classes used in
// a run and the number of input channels of its images:
//
//   {
//     "MNIST":   { "class_index": [0, 1, ..., 9], "input_channels": 1 },
//     "CIFAR10": { "class_index": [0, 1, ..., 9], "input_channels": 3 }
//   }
//
// The class count of a run is always class_index.len().

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::error::{PipelineError, PipelineResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetInfo {
    /// Raw dataset labels kept for the run, in output order
    pub class_index:    Vec<usize>,
    pub input_channels: usize,
}

impl DatasetInfo {
    pub fn num_classes(&self) -> usize {
        self.class_index.len()
    }
}

/// The whole data_info.json document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataInfoTable {
    entries: HashMap<String, DatasetInfo>,
}

impl DataInfoTable {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn get(&self, dataset: &str) -> PipelineResult<&DatasetInfo> {
        self.entries
            .get(dataset)
            .ok_or_else(|| PipelineError::UnsupportedDataset(dataset.to_string()))
    }
}
