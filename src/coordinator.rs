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

//! Drives the epoch loop: dispatches packets to the full sketch and to
//! the fragments along each flow's path, then reconstructs per-flow
//! estimates by temporal-then-spatial aggregation.

use itertools::Itertools;

use disketch_common::{DiSketchError, FlowKey, PacketRecord};

use crate::fragment::Fragment;
use crate::ideal::IdealCounter;
use crate::report::{DiSketchReport, EpochSummary, FlowMetric, FragmentEpochReport};
use crate::sketch::{Sketch, SketchKind};
use crate::topology::{PathSetting, Topology, TopologyConfig};

#[derive(Debug, Clone)]
pub struct Config {
    pub pcap_path: String,
    pub topology: TopologyConfig,
    pub max_epochs: u32,
    pub full_sketch_depth: u32,
    pub heavy_hitter_ratio: f64,
    pub epoch_duration_ns: u64,
    pub sketch_kind: SketchKind,
    pub enable_progress_bar: bool,
}

/// DiSketch's main driver: ties a `Topology` to a run `Config`, iterates
/// the time-sorted packet sequence epoch by epoch, and produces a
/// `DiSketchReport`.
pub struct Coordinator {
    config: Config,
    topology: Topology,
}

impl Coordinator {
    pub fn new(config: Config) -> Result<Self, DiSketchError> {
        if config.topology.fragments.is_empty() {
            return Err(DiSketchError::Configuration("topology has no fragments".to_string()));
        }
        if config.topology.paths.is_empty() {
            return Err(DiSketchError::Configuration("topology has no paths".to_string()));
        }
        let topology = Topology::new(config.topology.clone());
        Ok(Coordinator { config, topology })
    }

    /// Runs the full simulation. `on_epoch` is an optional progress hook,
    /// purely cosmetic; it never changes report contents.
    pub fn run(
        &self,
        packets: &[PacketRecord],
        mut on_epoch: Option<&mut dyn FnMut(u64, u64)>,
    ) -> Result<DiSketchReport, DiSketchError> {
        let mut report = DiSketchReport::new();
        if packets.is_empty() {
            return Ok(report);
        }

        let epoch_duration = self.config.epoch_duration_ns.max(1);
        let first_ts = packets.first().unwrap().timestamp_ns;
        let last_ts = packets.last().unwrap().timestamp_ns;
        if last_ts < first_ts {
            return Ok(report);
        }
        let mut total_epochs = (last_ts - first_ts) / epoch_duration + 1;
        if self.config.max_epochs > 0 {
            total_epochs = total_epochs.min(self.config.max_epochs as u64);
        }

        let mut fragments: Vec<Fragment> = Vec::with_capacity(self.topology.fragments().len());
        for (index, setting) in self.topology.fragments().iter().enumerate() {
            fragments.push(Fragment::new(index, setting.clone(), epoch_duration)?);
        }

        let full_sketch_memory: u64 = self.topology.fragments().iter().map(|f| f.memory_bytes).sum();
        let mut full_sketch = Sketch::new(self.config.sketch_kind, 0, self.config.full_sketch_depth, full_sketch_memory)?;

        let mut packet_index = 0usize;
        for epoch in 0..total_epochs {
            let epoch_start = first_ts + epoch * epoch_duration;
            let epoch_end = epoch_start + epoch_duration;

            for fragment in &mut fragments {
                fragment.begin_epoch(epoch, epoch_start)?;
            }
            full_sketch.clear();
            let mut ideal = IdealCounter::new();
            let mut epoch_packet_count: u64 = 0;

            while packet_index < packets.len() {
                let packet = &packets[packet_index];
                let ts = packet.timestamp_ns;
                if ts < epoch_start {
                    packet_index += 1;
                    continue;
                }
                if ts >= epoch_end {
                    break;
                }
                epoch_packet_count += 1;
                ideal.update(packet.flow, 1);
                full_sketch.update(packet.flow, 1);

                let path = self.topology.pick_path(packet.flow);
                let single_hop = path.node_indices.len() <= 1;
                for &node_index in &path.node_indices {
                    fragments[node_index].process_packet(packet.flow, ts, single_hop);
                }
                packet_index += 1;
            }

            let mut fragment_reports: Vec<FragmentEpochReport> = Vec::with_capacity(fragments.len());
            let mut rho_sum = 0.0;
            let mut rho_count = 0u32;
            for fragment in &mut fragments {
                let fragment_report = fragment.close_epoch();
                rho_sum += fragment_report.rho_average;
                if !fragment_report.records.is_empty() {
                    rho_count += 1;
                }
                fragment_reports.push(fragment_report);
            }

            let rho_average = if rho_count == 0 { 0.0 } else { rho_sum / rho_count as f64 };
            let fragment_subepoch_counts: Vec<u32> = fragment_reports
                .iter()
                .map(|r| r.records.first().map(|rec| rec.total_subepochs).unwrap_or(0))
                .collect();

            let threshold = epoch_packet_count as f64 * self.config.heavy_hitter_ratio;

            let mut summary = EpochSummary {
                epoch_id: epoch,
                rho_average,
                total_packets: epoch_packet_count,
                total_flows: ideal.len() as u64,
                heavy_hitter_threshold: threshold,
                flow_metrics: Vec::new(),
                full_sketch_detector: Default::default(),
                disketch_detector: Default::default(),
                fragment_subepoch_counts,
            };

            for (flow, ideal_count) in ideal.get_raw_data() {
                let is_real_heavy = threshold <= 0.0 || ideal_count as f64 >= threshold;

                let full_estimate = full_sketch.query(flow);
                let detected_by_full = full_estimate as f64 >= threshold;
                summary.full_sketch_detector.record(is_real_heavy, detected_by_full);

                let path = self.topology.pick_path(flow);
                let disketch_estimate = self.spatial_aggregation(flow, path, &fragment_reports);
                let detected_by_disketch = disketch_estimate as f64 >= threshold;
                summary.disketch_detector.record(is_real_heavy, detected_by_disketch);

                if threshold <= 0.0 || ideal_count as f64 >= threshold {
                    summary.flow_metrics.push(FlowMetric {
                        flow,
                        ideal: ideal_count,
                        full_sketch: full_estimate,
                        disketch: disketch_estimate,
                    });
                }
            }

            if let Some(ref mut hook) = on_epoch {
                hook(epoch, total_epochs);
            }

            report.epochs.push(summary);
        }

        Ok(report)
    }

    /// Combines each path node's temporal estimate for one flow into a
    /// single spatial estimate, using the sketch family's own combiner.
    fn spatial_aggregation(&self, flow: FlowKey, path: &PathSetting, fragment_reports: &[FragmentEpochReport]) -> u64 {
        if fragment_reports.is_empty() {
            return 0;
        }
        let single_hop = path.node_indices.len() <= 1;
        let mut values: Vec<u64> = Vec::new();
        for &node_index in &path.node_indices {
            if node_index >= fragment_reports.len() {
                continue;
            }
            let fragment_report = &fragment_reports[node_index];
            if let Some(first) = fragment_report.records.first() {
                if first.fragment_index != node_index {
                    continue;
                }
            }
            let boost_single_hop = self.topology.fragment(node_index).boost_single_hop;
            let value = Fragment::temporal_aggregation(flow, fragment_report, single_hop, boost_single_hop);
            if value > 0 {
                values.push(value);
            }
        }
        if values.is_empty() {
            return 0;
        }
        match self.config.sketch_kind {
            SketchKind::CountMin => *values.iter().min().unwrap(),
            SketchKind::CountSketch => {
                let values: Vec<u64> = values.into_iter().sorted().collect();
                let mid = values.len() / 2;
                if values.len() % 2 == 1 {
                    values[mid]
                } else {
                    (values[mid - 1] + values[mid]) / 2
                }
            }
            SketchKind::UnivMon => values.iter().sum::<u64>() / values.len() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::FragmentSetting;

    fn packet(flow: FlowKey, ts: u64) -> PacketRecord {
        PacketRecord { flow, timestamp_ns: ts }
    }

    fn fragment_setting(name: &str, kind: SketchKind) -> FragmentSetting {
        FragmentSetting {
            name: name.to_string(),
            kind,
            depth: 2,
            memory_bytes: 4096,
            initial_subepoch: 1,
            max_subepoch: 1,
            rho_target: 1.0,
            boost_single_hop: false,
        }
    }

    fn path(name: &str, nodes: Vec<usize>) -> PathSetting {
        PathSetting { name: name.to_string(), node_indices: nodes }
    }

    #[test]
    fn single_fragment_single_path_one_epoch() {
        let config = Config {
            pcap_path: String::new(),
            topology: TopologyConfig {
                fragments: vec![fragment_setting("f0", SketchKind::CountMin)],
                paths: vec![path("p0", vec![0])],
            },
            max_epochs: 0,
            full_sketch_depth: 2,
            heavy_hitter_ratio: 0.0001,
            epoch_duration_ns: 1_000_000_000,
            sketch_kind: SketchKind::CountMin,
            enable_progress_bar: false,
        };
        let coordinator = Coordinator::new(config).unwrap();
        let a = FlowKey::new(1, 1);
        let b = FlowKey::new(2, 2);
        let c = FlowKey::new(3, 3);
        let packets = vec![packet(a, 0), packet(a, 10), packet(a, 20), packet(b, 30), packet(c, 40)];
        let report = coordinator.run(&packets, None).unwrap();
        assert_eq!(report.epochs.len(), 1);
        let epoch = &report.epochs[0];
        assert_eq!(epoch.total_packets, 5);
        assert_eq!(epoch.total_flows, 3);
        assert_eq!(epoch.full_sketch_detector.tp, 3);
        assert_eq!(epoch.disketch_detector.tp, 3);
    }

    #[test]
    fn determinism_across_repeated_runs() {
        let config = || Config {
            pcap_path: String::new(),
            topology: TopologyConfig {
                fragments: vec![
                    fragment_setting("f0", SketchKind::CountSketch),
                    fragment_setting("f1", SketchKind::CountSketch),
                ],
                paths: vec![path("p0", vec![0, 1])],
            },
            max_epochs: 0,
            full_sketch_depth: 4,
            heavy_hitter_ratio: 0.0001,
            epoch_duration_ns: 1_000_000_000,
            sketch_kind: SketchKind::CountSketch,
            enable_progress_bar: false,
        };
        let packets: Vec<PacketRecord> = (0..500u64)
            .map(|t| packet(FlowKey::new(1, (t % 13) as u32), t * 1_000_000))
            .collect();

        let first = Coordinator::new(config()).unwrap().run(&packets, None).unwrap();
        let second = Coordinator::new(config()).unwrap().run(&packets, None).unwrap();

        assert_eq!(first.epochs.len(), second.epochs.len());
        for (a, b) in first.epochs.iter().zip(second.epochs.iter()) {
            assert_eq!(a.total_packets, b.total_packets);
            assert_eq!(a.total_flows, b.total_flows);
            assert_eq!(a.fragment_subepoch_counts, b.fragment_subepoch_counts);
            assert_eq!(a.full_sketch_detector, b.full_sketch_detector);
            assert_eq!(a.disketch_detector, b.disketch_detector);
        }
    }

    #[test]
    fn empty_input_yields_empty_report() {
        let config = Config {
            pcap_path: String::new(),
            topology: TopologyConfig {
                fragments: vec![fragment_setting("f0", SketchKind::CountMin)],
                paths: vec![path("p0", vec![0])],
            },
            max_epochs: 0,
            full_sketch_depth: 2,
            heavy_hitter_ratio: 0.0001,
            epoch_duration_ns: 1_000_000_000,
            sketch_kind: SketchKind::CountMin,
            enable_progress_bar: false,
        };
        let coordinator = Coordinator::new(config).unwrap();
        let report = coordinator.run(&[], None).unwrap();
        assert!(report.epochs.is_empty());
    }

    #[test]
    fn empty_topology_is_a_configuration_error() {
        let config = Config {
            pcap_path: String::new(),
            topology: TopologyConfig { fragments: Vec::new(), paths: Vec::new() },
            max_epochs: 0,
            full_sketch_depth: 2,
            heavy_hitter_ratio: 0.0001,
            epoch_duration_ns: 1_000_000_000,
            sketch_kind: SketchKind::CountMin,
            enable_progress_bar: false,
        };
        assert!(Coordinator::new(config).is_err());
    }
}
