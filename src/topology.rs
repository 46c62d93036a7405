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

//! Maps a flow to a stable path through the fragment topology.

use disketch_common::FlowKey;

use crate::fragment::FragmentSetting;
use crate::hash::hash_flow;

#[derive(Debug, Clone)]
pub struct PathSetting {
    pub name: String,
    pub node_indices: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct TopologyConfig {
    pub fragments: Vec<FragmentSetting>,
    pub paths: Vec<PathSetting>,
}

#[derive(Debug, Clone)]
pub struct Topology {
    config: TopologyConfig,
}

impl Topology {
    pub fn new(config: TopologyConfig) -> Self {
        Topology { config }
    }

    pub fn fragment(&self, index: usize) -> &FragmentSetting {
        &self.config.fragments[index]
    }

    pub fn fragments(&self) -> &[FragmentSetting] {
        &self.config.fragments
    }

    pub fn paths(&self) -> &[PathSetting] {
        &self.config.paths
    }

    pub fn path_count(&self) -> usize {
        self.config.paths.len()
    }

    /// Hashes on `(|paths|, |paths|)` — the modulus doubling as the seed.
    pub fn pick_path(&self, flow: FlowKey) -> &PathSetting {
        let count = self.config.paths.len() as u64;
        let index = hash_flow(flow, count, count) as usize;
        &self.config.paths[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_topology() -> Topology {
        Topology::new(TopologyConfig {
            fragments: vec![
                FragmentSetting::new("f0".to_string()),
                FragmentSetting::new("f1".to_string()),
            ],
            paths: vec![
                PathSetting { name: "p0".to_string(), node_indices: vec![0] },
                PathSetting { name: "p1".to_string(), node_indices: vec![0, 1] },
                PathSetting { name: "p2".to_string(), node_indices: vec![1] },
            ],
        })
    }

    #[test]
    fn pick_path_is_deterministic() {
        let topology = sample_topology();
        let flow = FlowKey::new(7, 9);
        let a = topology.pick_path(flow).name.clone();
        let b = topology.pick_path(flow).name.clone();
        assert_eq!(a, b);
    }

    #[test]
    fn pick_path_stays_in_range() {
        let topology = sample_topology();
        for dst in 0..50u32 {
            let path = topology.pick_path(FlowKey::new(1, dst));
            assert!(topology.paths().iter().any(|p| p.name == path.name));
        }
    }
}
