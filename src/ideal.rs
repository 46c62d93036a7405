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

//! The exact per-flow counter used as ground truth (`FullSketch`'s
//! reference and the basis every detector's confusion matrix is measured
//! against). Unlike the sketch family this never approximates, so it only
//! needs a map; `IndexMap` is used instead of `std::collections::HashMap`
//! so that enumerating flows in report order is reproducible across runs
//! with identical input.

use indexmap::IndexMap;

use disketch_common::FlowKey;

#[derive(Debug, Clone, Default)]
pub struct IdealCounter {
    counts: IndexMap<FlowKey, u64>,
}

impl IdealCounter {
    pub fn new() -> Self {
        IdealCounter { counts: IndexMap::new() }
    }

    pub fn update(&mut self, flow: FlowKey, delta: u64) {
        *self.counts.entry(flow).or_insert(0) += delta;
    }

    pub fn query(&self, flow: FlowKey) -> u64 {
        self.counts.get(&flow).copied().unwrap_or(0)
    }

    /// Flows in first-seen order, paired with their exact counts.
    pub fn get_raw_data(&self) -> impl Iterator<Item = (FlowKey, u64)> + '_ {
        self.counts.iter().map(|(flow, count)| (*flow, *count))
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }
}
