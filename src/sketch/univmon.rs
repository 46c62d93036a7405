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

use crate::hash::hash_flow;
use crate::sketch::countsketch::CountSketchSketch;

/// Row count used inside each per-layer CountSketch. UnivMon's `depth`
/// parameter names the number of *layers*, not the row count of any one
/// layer's internal sketch, so this is a separate, fixed constant.
const UNIVMON_LAYER_ROWS: u32 = 4;

/// A stack of CountSketch layers. Each packet is promoted from layer 0
/// upward by a deterministic per-flow coin flip (so repeated updates for
/// the same flow are always promoted to the same height); `query` walks
/// back down to the highest layer the flow reached and scales that
/// layer's estimate by `2^level`, the standard recursive-estimation trick.
#[derive(Debug, Clone)]
pub struct UnivMonSketch {
    seed: u64,
    layers: Vec<CountSketchSketch>,
}

impl UnivMonSketch {
    pub fn new(seed: u64, depth: u32, memory_bytes: u64) -> Result<Self, DiSketchError> {
        let depth = depth.max(1) as usize;
        let per_layer_memory = memory_bytes / depth as u64;
        let mut layers = Vec::with_capacity(depth);
        for level in 0..depth {
            let layer_seed = seed ^ (level as u64 + 1).wrapping_mul(0x2545_f491_4f6c_dd1d);
            layers.push(CountSketchSketch::new(layer_seed, UNIVMON_LAYER_ROWS, per_layer_memory)?);
        }
        Ok(UnivMonSketch { seed, layers })
    }

    fn included_at_level(&self, flow: FlowKey, level: usize) -> bool {
        let level_seed = self.seed.wrapping_add((level as u64 + 1).wrapping_mul(0xabcd_1234_9e37_79b9));
        hash_flow(flow, level_seed, 2) == 0
    }

    /// Highest layer index this flow is promoted to, by cascading coin
    /// flips starting from layer 0 (always included).
    fn reached_level(&self, flow: FlowKey) -> usize {
        let mut reached = 0;
        for level in 1..self.layers.len() {
            if self.included_at_level(flow, level) {
                reached = level;
            } else {
                break;
            }
        }
        reached
    }

    pub fn update(&mut self, flow: FlowKey, delta: i64) {
        let reached = self.reached_level(flow);
        for layer in self.layers.iter_mut().take(reached + 1) {
            layer.update(flow, delta);
        }
    }

    pub fn query(&self, flow: FlowKey) -> u64 {
        let reached = self.reached_level(flow);
        let estimate = self.layers[reached].query(flow);
        estimate.saturating_mul(1u64 << reached)
    }

    pub fn clear(&mut self) {
        for layer in &mut self.layers {
            layer.clear();
        }
    }

    pub(crate) fn raw_counters_view(&self) -> &[Vec<i64>] {
        self.layers[0].raw_counters_view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_layer_behaves_like_a_countsketch() {
        let mut sketch = UnivMonSketch::new(1, 1, 16384).unwrap();
        let flow = FlowKey::new(1, 1);
        for _ in 0..500 {
            sketch.update(flow, 1);
        }
        let estimate = sketch.query(flow) as i64;
        assert!((estimate - 500).abs() < 150);
    }

    #[test]
    fn clear_resets_every_layer() {
        let mut sketch = UnivMonSketch::new(1, 4, 65536).unwrap();
        let flow = FlowKey::new(3, 4);
        for _ in 0..50 {
            sketch.update(flow, 1);
        }
        sketch.clear();
        assert_eq!(sketch.query(flow), 0);
    }

    #[test]
    fn degenerate_width_is_rejected() {
        assert!(UnivMonSketch::new(1, 8, 16).is_err());
    }

    #[test]
    fn reached_level_is_stable_across_calls() {
        let sketch = UnivMonSketch::new(7, 6, 65536).unwrap();
        let flow = FlowKey::new(11, 22);
        let a = sketch.reached_level(flow);
        let b = sketch.reached_level(flow);
        assert_eq!(a, b);
    }
}
