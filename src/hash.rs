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

//! A single deterministic keyed hash, used everywhere a flow needs to be
//! mapped into a bucket or a seed-space: sub-epoch assignment, path
//! selection, and the per-row hash families inside the sketches.

use disketch_common::FlowKey;

/// 64-bit golden-ratio constant used to spread successive seeds apart.
const GOLDEN: u64 = 0x9e3779b97f4a7c15;

/// splitmix64-style avalanche mix. Cheap, deterministic, well-distributed.
fn mix64(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xbf58476d1ce4e5b9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94d049bb133111eb);
    x ^= x >> 31;
    x
}

/// `h(flow, seed, modulus) -> integer in [0, modulus)`.
///
/// Returns 0 when `modulus == 0` (callers that can hit a zero modulus must
/// guard against it themselves; this function never panics).
pub fn hash_flow(flow: FlowKey, seed: u64, modulus: u64) -> u64 {
    if modulus == 0 {
        return 0;
    }
    let combined = (flow.src as u64)
        .wrapping_mul(GOLDEN)
        .wrapping_add((flow.dst as u64).wrapping_mul(GOLDEN.rotate_left(17)))
        .wrapping_add(seed);
    mix64(combined) % modulus
}

/// Derive an independent per-row seed from a fragment-level master seed.
/// Used by the sketches to make each row's hash family independent without
/// carrying a separate seed table around.
pub fn row_seed(master_seed: u64, row_index: usize) -> u64 {
    master_seed ^ (row_index as u64).wrapping_mul(GOLDEN)
}

/// A ±1 sign derived from the same hash family, used by CountSketch.
pub fn sign_hash(flow: FlowKey, seed: u64) -> i64 {
    if hash_flow(flow, seed.rotate_left(1), 2) == 0 {
        1
    } else {
        -1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_across_calls() {
        let flow = FlowKey::new(10, 20);
        let a = hash_flow(flow, 42, 16);
        let b = hash_flow(flow, 42, 16);
        assert_eq!(a, b);
    }

    #[test]
    fn stays_within_modulus() {
        let flow = FlowKey::new(1, 2);
        for seed in 0..64u64 {
            let modulus = 7u64;
            let h = hash_flow(flow, seed, modulus);
            assert!(h < modulus);
        }
    }

    #[test]
    fn zero_modulus_never_panics() {
        let flow = FlowKey::new(1, 2);
        assert_eq!(hash_flow(flow, 1, 0), 0);
    }

    #[test]
    fn different_flows_spread_across_buckets() {
        let modulus = 32u64;
        let mut seen = std::collections::HashSet::new();
        for dst in 0..modulus {
            seen.insert(hash_flow(FlowKey::new(1, dst as u32), 7, modulus));
        }
        assert!(seen.len() > modulus as usize / 2);
    }

    #[test]
    fn sign_hash_is_plus_or_minus_one() {
        let flow = FlowKey::new(5, 6);
        for seed in 0..20u64 {
            let s = sign_hash(flow, seed);
            assert!(s == 1 || s == -1);
        }
    }
}
