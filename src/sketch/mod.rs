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

//! The sketch family: CountMin, CountSketch, and UnivMon, dispatched
//! through one closed enum rather than a trait object — a finite, closed
//! set of variants, so a tagged enum is the right shape here rather than
//! open-ended subtype polymorphism.

mod countmin;
mod countsketch;
mod univmon;

use serde::{Deserialize, Serialize};

use disketch_common::{DiSketchError, FlowKey};

pub use countmin::CountMinSketch;
pub use countsketch::CountSketchSketch;
pub use univmon::UnivMonSketch;

/// Counters are stored as signed 64-bit values across every variant so that
/// `Fragment`'s rho computation can read them uniformly, even though
/// CountMin counters in this simulator never go negative (every packet is
/// a `+1` update, never a subtraction).
pub(crate) const COUNTER_SIZE: u64 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SketchKind {
    CountMin,
    CountSketch,
    UnivMon,
}

impl SketchKind {
    /// Case insensitive; unknown values fall back to `CountSketch`.
    pub fn parse(value: &str) -> SketchKind {
        match value {
            "CountMin" | "countmin" => SketchKind::CountMin,
            "UnivMon" | "univmon" => SketchKind::UnivMon,
            "CountSketch" | "countsketch" => SketchKind::CountSketch,
            _ => SketchKind::CountSketch,
        }
    }
}

/// A counting sketch: `update`, `query`, `clear`, and (via `Clone`)
/// snapshot semantics.
#[derive(Debug, Clone)]
pub enum Sketch {
    CountMin(CountMinSketch),
    CountSketch(CountSketchSketch),
    UnivMon(UnivMonSketch),
}

impl Sketch {
    /// Construct a sketch of `kind` with `depth` rows (or, for `UnivMon`,
    /// layers) under a `memory_bytes` budget. Fails with
    /// `DiSketchError::Configuration` when the derived width collapses to
    /// zero.
    pub fn new(kind: SketchKind, seed: u64, depth: u32, memory_bytes: u64) -> Result<Self, DiSketchError> {
        match kind {
            SketchKind::CountMin => Ok(Sketch::CountMin(CountMinSketch::new(seed, depth, memory_bytes)?)),
            SketchKind::CountSketch => {
                Ok(Sketch::CountSketch(CountSketchSketch::new(seed, depth, memory_bytes)?))
            }
            SketchKind::UnivMon => Ok(Sketch::UnivMon(UnivMonSketch::new(seed, depth, memory_bytes)?)),
        }
    }

    pub fn kind(&self) -> SketchKind {
        match self {
            Sketch::CountMin(_) => SketchKind::CountMin,
            Sketch::CountSketch(_) => SketchKind::CountSketch,
            Sketch::UnivMon(_) => SketchKind::UnivMon,
        }
    }

    pub fn update(&mut self, flow: FlowKey, delta: i64) {
        match self {
            Sketch::CountMin(s) => s.update(flow, delta),
            Sketch::CountSketch(s) => s.update(flow, delta),
            Sketch::UnivMon(s) => s.update(flow, delta),
        }
    }

    pub fn query(&self, flow: FlowKey) -> u64 {
        match self {
            Sketch::CountMin(s) => s.query(flow),
            Sketch::CountSketch(s) => s.query(flow),
            Sketch::UnivMon(s) => s.query(flow),
        }
    }

    pub fn clear(&mut self) {
        match self {
            Sketch::CountMin(s) => s.clear(),
            Sketch::CountSketch(s) => s.clear(),
            Sketch::UnivMon(s) => s.clear(),
        }
    }

    /// Raw counter rows, needed only by `Fragment` to compute rho and
    /// never exposed outside it. `UnivMon` has no rho contract, so it
    /// exposes its base layer without claiming that value is meaningful
    /// for load estimation.
    pub(crate) fn raw_counters_view(&self) -> &[Vec<i64>] {
        match self {
            Sketch::CountMin(s) => s.raw_counters_view(),
            Sketch::CountSketch(s) => s.raw_counters_view(),
            Sketch::UnivMon(s) => s.raw_counters_view(),
        }
    }
}
