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

//! A confusion matrix over heavy-hitter classification, plus the derived
//! metrics reported for both `FullSketch` and `DiSketch`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeavyHitterDetector {
    pub tp: u64,
    pub fp: u64,
    pub fn_: u64,
    pub tn: u64,
}

impl HeavyHitterDetector {
    pub fn new() -> Self {
        HeavyHitterDetector::default()
    }

    /// Classify one flow against the ideal/estimate pair and bump the
    /// matching cell. A flow is heavy when its count meets the configured
    /// threshold.
    pub fn record(&mut self, ideal_is_heavy: bool, estimate_is_heavy: bool) {
        match (ideal_is_heavy, estimate_is_heavy) {
            (true, true) => self.tp += 1,
            (false, true) => self.fp += 1,
            (true, false) => self.fn_ += 1,
            (false, false) => self.tn += 1,
        }
    }

    pub fn reset(&mut self) {
        *self = HeavyHitterDetector::default();
    }

    /// Fold another detector's tallies into this one; used to roll
    /// per-sub-epoch or per-fragment detectors up into an epoch total.
    pub fn accumulate(&mut self, other: &HeavyHitterDetector) {
        self.tp += other.tp;
        self.fp += other.fp;
        self.fn_ += other.fn_;
        self.tn += other.tn;
    }

    pub fn precision(&self) -> f64 {
        let denom = self.tp + self.fp;
        if denom == 0 {
            0.0
        } else {
            self.tp as f64 / denom as f64
        }
    }

    pub fn recall(&self) -> f64 {
        let denom = self.tp + self.fn_;
        if denom == 0 {
            0.0
        } else {
            self.tp as f64 / denom as f64
        }
    }

    pub fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    pub fn accuracy(&self) -> f64 {
        let denom = self.tp + self.fp + self.fn_ + self.tn;
        if denom == 0 {
            0.0
        } else {
            (self.tp + self.tn) as f64 / denom as f64
        }
    }

    pub fn fpr(&self) -> f64 {
        let denom = self.fp + self.tn;
        if denom == 0 {
            0.0
        } else {
            self.fp as f64 / denom as f64
        }
    }

    pub fn fnr(&self) -> f64 {
        let denom = self.fn_ + self.tp;
        if denom == 0 {
            0.0
        } else {
            self.fn_ as f64 / denom as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_classification_scores_one() {
        let mut detector = HeavyHitterDetector::new();
        detector.record(true, true);
        detector.record(true, true);
        detector.record(false, false);
        assert_eq!(detector.precision(), 1.0);
        assert_eq!(detector.recall(), 1.0);
        assert_eq!(detector.f1(), 1.0);
        assert_eq!(detector.accuracy(), 1.0);
    }

    #[test]
    fn zero_denominators_yield_zero_not_nan() {
        let detector = HeavyHitterDetector::new();
        assert_eq!(detector.precision(), 0.0);
        assert_eq!(detector.recall(), 0.0);
        assert_eq!(detector.f1(), 0.0);
        assert_eq!(detector.accuracy(), 0.0);
    }

    #[test]
    fn accumulate_sums_every_cell() {
        let mut total = HeavyHitterDetector::new();
        let mut a = HeavyHitterDetector::new();
        a.record(true, true);
        a.record(false, true);
        let mut b = HeavyHitterDetector::new();
        b.record(true, false);
        b.record(false, false);
        total.accumulate(&a);
        total.accumulate(&b);
        assert_eq!(total.tp, 1);
        assert_eq!(total.fp, 1);
        assert_eq!(total.fn_, 1);
        assert_eq!(total.tn, 1);
    }

    #[test]
    fn reset_clears_all_cells() {
        let mut detector = HeavyHitterDetector::new();
        detector.record(true, true);
        detector.reset();
        assert_eq!(detector, HeavyHitterDetector::default());
    }
}
