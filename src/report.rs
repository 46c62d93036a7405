/*
BSD 2-Clause License

Copyright (c) 2022, Diagnosis and Control of Clouds Laboratory
All rights reserved.

Redistribution and use in source and binary forms, with or without
modification, are permitted provided that the following conditions are met:

1. Redistributions of source code must retain the above copyright notice, this
   list of conditions and the following disclaimer.

2. Redistributions in binary form must reproduce the above copyright notice,
   this list of conditions and the following disclaimer in the documentation
   and/or other materials provided with the distribution.

THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS"
AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO, THE
IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE ARE
DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR CONTRIBUTORS BE LIABLE
FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL, EXEMPLARY, OR CONSEQUENTIAL
DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR
SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER
CAUSED AND ON ANY THEORY OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY,
OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

*/

//! The structured result of a run: per-epoch summaries carrying enough
//! detail to reconstruct every metric without reopening a sketch.

use serde::{Deserialize, Serialize};

use disketch_common::FlowKey;

use crate::heavyhitter::HeavyHitterDetector;
use crate::sketch::{Sketch, SketchKind};

/// A flow's estimate under every method, kept only for flows that were
/// real heavy hitters in the epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowMetric {
    pub flow: FlowKey,
    pub ideal: u64,
    pub full_sketch: u64,
    pub disketch: u64,
}

/// One fragment's snapshot of its sketch at a sub-epoch boundary.
#[derive(Debug, Clone, Serialize)]
pub struct SubepochRecord {
    pub fragment_index: usize,
    pub epoch_id: u64,
    pub subepoch_id: u32,
    pub total_subepochs: u32,
    pub hash_seed: u64,
    pub packet_count: u64,
    pub rho_estimate: f64,
    pub sketch_kind: SketchKind,
    #[serde(skip)]
    pub snapshot: Sketch,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FragmentEpochReport {
    pub epoch_id: u64,
    pub rho_average: f64,
    pub records: Vec<SubepochRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EpochSummary {
    pub epoch_id: u64,
    pub rho_average: f64,
    pub total_packets: u64,
    pub total_flows: u64,
    pub heavy_hitter_threshold: f64,
    pub flow_metrics: Vec<FlowMetric>,
    pub full_sketch_detector: HeavyHitterDetector,
    pub disketch_detector: HeavyHitterDetector,
    pub fragment_subepoch_counts: Vec<u32>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DiSketchReport {
    pub epochs: Vec<EpochSummary>,
}

impl DiSketchReport {
    pub fn new() -> Self {
        DiSketchReport::default()
    }

    /// Roll every epoch's full-sketch detector into one run total.
    pub fn total_full_sketch_detector(&self) -> HeavyHitterDetector {
        let mut total = HeavyHitterDetector::new();
        for epoch in &self.epochs {
            total.accumulate(&epoch.full_sketch_detector);
        }
        total
    }

    pub fn total_disketch_detector(&self) -> HeavyHitterDetector {
        let mut total = HeavyHitterDetector::new();
        for epoch in &self.epochs {
            total.accumulate(&epoch.disketch_detector);
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_rolls_up_to_zeroed_detectors() {
        let report = DiSketchReport::new();
        assert_eq!(report.total_full_sketch_detector(), HeavyHitterDetector::new());
        assert_eq!(report.total_disketch_detector(), HeavyHitterDetector::new());
    }

    #[test]
    fn rollup_sums_across_epochs() {
        let mut report = DiSketchReport::new();
        let mut a = HeavyHitterDetector::new();
        a.record(true, true);
        let mut b = HeavyHitterDetector::new();
        b.record(true, true);
        report.epochs.push(EpochSummary {
            epoch_id: 0,
            rho_average: 0.0,
            total_packets: 0,
            total_flows: 0,
            heavy_hitter_threshold: 0.0,
            flow_metrics: Vec::new(),
            full_sketch_detector: a,
            disketch_detector: HeavyHitterDetector::new(),
            fragment_subepoch_counts: Vec::new(),
        });
        report.epochs.push(EpochSummary {
            epoch_id: 1,
            rho_average: 0.0,
            total_packets: 0,
            total_flows: 0,
            heavy_hitter_threshold: 0.0,
            flow_metrics: Vec::new(),
            full_sketch_detector: b,
            disketch_detector: HeavyHitterDetector::new(),
            fragment_subepoch_counts: Vec::new(),
        });
        assert_eq!(report.total_full_sketch_detector().tp, 2);
    }
}
