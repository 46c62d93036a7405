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

use itertools::Itertools;

use disketch_common::{DiSketchError, FlowKey};

use crate::hash::{hash_flow, row_seed, sign_hash};
use crate::sketch::COUNTER_SIZE;

/// Same shape as CountMin, but each row also carries a ±1 sign hash;
/// update adds a signed delta, query returns the median of the per-row
/// signed reads.
#[derive(Debug, Clone)]
pub struct CountSketchSketch {
    seed: u64,
    width: usize,
    counters: Vec<Vec<i64>>,
}

impl CountSketchSketch {
    pub fn new(seed: u64, depth: u32, memory_bytes: u64) -> Result<Self, DiSketchError> {
        let depth = depth.max(1) as usize;
        let width = (memory_bytes / (depth as u64 * COUNTER_SIZE)) as usize;
        if width == 0 {
            return Err(DiSketchError::Configuration(format!(
                "CountSketch width collapsed to zero (depth={}, memory_bytes={})",
                depth, memory_bytes
            )));
        }
        Ok(CountSketchSketch {
            seed,
            width,
            counters: vec![vec![0i64; width]; depth],
        })
    }

    fn row_seed(&self, row_index: usize) -> u64 {
        row_seed(self.seed, row_index)
    }

    pub fn update(&mut self, flow: FlowKey, delta: i64) {
        for (row_index, row) in self.counters.iter_mut().enumerate() {
            let seed = self.row_seed(row_index);
            let bucket = hash_flow(flow, seed, self.width as u64) as usize;
            let sign = sign_hash(flow, seed);
            row[bucket] += sign * delta;
        }
    }

    pub fn query(&self, flow: FlowKey) -> u64 {
        let estimates: Vec<i64> = self
            .counters
            .iter()
            .enumerate()
            .map(|(row_index, row)| {
                let seed = self.row_seed(row_index);
                let bucket = hash_flow(flow, seed, self.width as u64) as usize;
                let sign = sign_hash(flow, seed);
                row[bucket] * sign
            })
            .sorted()
            .collect();
        let median = if estimates.is_empty() {
            0
        } else if estimates.len() % 2 == 1 {
            estimates[estimates.len() / 2]
        } else {
            let mid = estimates.len() / 2;
            (estimates[mid - 1] + estimates[mid]) / 2
        };
        median.max(0) as u64
    }

    pub fn clear(&mut self) {
        for row in &mut self.counters {
            row.iter_mut().for_each(|c| *c = 0);
        }
    }

    pub(crate) fn raw_counters_view(&self) -> &[Vec<i64>] {
        &self.counters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimates_are_close_to_exact_counts() {
        let mut sketch = CountSketchSketch::new(3, 8, 32768).unwrap();
        let flow = FlowKey::new(1, 1);
        for _ in 0..1000 {
            sketch.update(flow, 1);
        }
        let estimate = sketch.query(flow) as i64;
        assert!((estimate - 1000).abs() < 200);
    }

    #[test]
    fn clear_resets_all_counters() {
        let mut sketch = CountSketchSketch::new(1, 2, 1024).unwrap();
        let flow = FlowKey::new(9, 9);
        sketch.update(flow, 5);
        sketch.clear();
        assert_eq!(sketch.query(flow), 0);
    }

    #[test]
    fn degenerate_width_is_rejected() {
        assert!(CountSketchSketch::new(1, 8, 16).is_err());
    }
}
