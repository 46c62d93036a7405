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

use disketch_common::{DiSketchError, FlowKey};

use crate::hash::{hash_flow, row_seed};
use crate::sketch::COUNTER_SIZE;

/// `depth` rows of `width` counters; update adds delta to one position per
/// row; query returns the minimum across rows.
#[derive(Debug, Clone)]
pub struct CountMinSketch {
    seed: u64,
    width: usize,
    counters: Vec<Vec<i64>>,
}

impl CountMinSketch {
    pub fn new(seed: u64, depth: u32, memory_bytes: u64) -> Result<Self, DiSketchError> {
        let depth = depth.max(1) as usize;
        let width = (memory_bytes / (depth as u64 * COUNTER_SIZE)) as usize;
        if width == 0 {
            return Err(DiSketchError::Configuration(format!(
                "CountMin sketch width collapsed to zero (depth={}, memory_bytes={})",
                depth, memory_bytes
            )));
        }
        Ok(CountMinSketch {
            seed,
            width,
            counters: vec![vec![0i64; width]; depth],
        })
    }

    pub fn update(&mut self, flow: FlowKey, delta: i64) {
        for (row_index, row) in self.counters.iter_mut().enumerate() {
            let bucket = hash_flow(flow, row_seed(self.seed, row_index), self.width as u64) as usize;
            row[bucket] += delta;
        }
    }

    pub fn query(&self, flow: FlowKey) -> u64 {
        self.counters
            .iter()
            .enumerate()
            .map(|(row_index, row)| {
                let bucket = hash_flow(flow, row_seed(self.seed, row_index), self.width as u64) as usize;
                row[bucket]
            })
            .min()
            .unwrap_or(0)
            .max(0) as u64
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
    fn over_estimates_or_matches_exactly() {
        let mut sketch = CountMinSketch::new(1, 4, 4096).unwrap();
        let a = FlowKey::new(1, 1);
        let b = FlowKey::new(2, 2);
        for _ in 0..100 {
            sketch.update(a, 1);
        }
        for _ in 0..10 {
            sketch.update(b, 1);
        }
        assert!(sketch.query(a) >= 100);
        assert!(sketch.query(b) >= 10);
    }

    #[test]
    fn clear_resets_all_counters() {
        let mut sketch = CountMinSketch::new(1, 2, 1024).unwrap();
        let flow = FlowKey::new(9, 9);
        sketch.update(flow, 5);
        sketch.clear();
        assert_eq!(sketch.query(flow), 0);
    }

    #[test]
    fn degenerate_width_is_rejected() {
        assert!(CountMinSketch::new(1, 8, 16).is_err());
    }
}
