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

//! One measurement node: owns a sketch, subdivides its epoch into
//! sub-epochs, samples each flow into exactly one (or two) of them, and
//! adapts the sub-epoch count from epoch to epoch based on load.

use disketch_common::{DiSketchError, FlowKey};

use crate::hash::{hash_flow, row_seed};
use crate::report::{FragmentEpochReport, SubepochRecord};
use crate::sketch::{Sketch, SketchKind};

const MIN_SUBEPOCH: u32 = 1;

#[derive(Debug, Clone)]
pub struct FragmentSetting {
    pub name: String,
    pub kind: SketchKind,
    pub depth: u32,
    pub memory_bytes: u64,
    pub initial_subepoch: u32,
    pub max_subepoch: u32,
    pub rho_target: f64,
    pub boost_single_hop: bool,
}

impl FragmentSetting {
    pub fn new(name: String) -> Self {
        FragmentSetting {
            name,
            kind: SketchKind::CountSketch,
            depth: 4,
            memory_bytes: 8 * 1024 * 1024,
            initial_subepoch: 1,
            max_subepoch: 8,
            rho_target: 1.0,
            boost_single_hop: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Fragment {
    index: usize,
    setting: FragmentSetting,
    epoch_duration_ns: u64,
    hash_seed: u64,
    epoch_id: u64,
    epoch_start_ns: u64,
    subepoch_count: u32,
    current_subepoch: u32,
    subepoch_duration_ns: u64,
    packet_counter: u64,
    rho_accum: f64,
    sketch: Sketch,
    emitted_records: Vec<SubepochRecord>,
}

impl Fragment {
    pub fn new(index: usize, setting: FragmentSetting, epoch_duration_ns: u64) -> Result<Self, DiSketchError> {
        let subepoch_count = setting.initial_subepoch.max(MIN_SUBEPOCH);
        let sketch = Sketch::new(setting.kind, 0, setting.depth, setting.memory_bytes)?;
        let epoch_duration_ns = epoch_duration_ns.max(1);
        let subepoch_duration_ns = (epoch_duration_ns / subepoch_count as u64).max(1);
        Ok(Fragment {
            index,
            setting,
            epoch_duration_ns,
            hash_seed: 0,
            epoch_id: 0,
            epoch_start_ns: 0,
            subepoch_count,
            current_subepoch: 0,
            subepoch_duration_ns,
            packet_counter: 0,
            rho_accum: 0.0,
            sketch,
            emitted_records: Vec::new(),
        })
    }

    pub fn config(&self) -> &FragmentSetting {
        &self.setting
    }

    pub fn begin_epoch(&mut self, epoch_id: u64, epoch_start_ns: u64) -> Result<(), DiSketchError> {
        self.epoch_id = epoch_id;
        self.epoch_start_ns = epoch_start_ns;
        self.current_subepoch = 0;
        self.packet_counter = 0;
        self.rho_accum = 0.0;
        self.emitted_records.clear();
        self.hash_seed = ((self.index as u64) << 32) | epoch_id;
        self.sketch = Sketch::new(self.setting.kind, self.hash_seed, self.setting.depth, self.setting.memory_bytes)?;
        self.subepoch_duration_ns = (self.epoch_duration_ns / self.subepoch_count as u64).max(1);
        Ok(())
    }

    pub fn process_packet(&mut self, flow: FlowKey, packet_time_ns: u64, single_hop: bool) {
        if packet_time_ns < self.epoch_start_ns {
            return;
        }
        let delta = packet_time_ns - self.epoch_start_ns;
        let subepoch_index = ((delta / self.subepoch_duration_ns) as u32).min(self.subepoch_count - 1);
        if subepoch_index > self.current_subepoch {
            self.flush_until(subepoch_index);
        }
        if !Fragment::should_track(
            flow,
            self.hash_seed,
            subepoch_index,
            self.subepoch_count,
            single_hop,
            self.setting.boost_single_hop,
        ) {
            return;
        }
        self.update_sketch_and_rho(flow);
        self.packet_counter += 1;
    }

    pub fn close_epoch(&mut self) -> FragmentEpochReport {
        self.flush_until(self.subepoch_count);
        self.flush_current();

        let sum: f64 = self.emitted_records.iter().map(|r| r.rho_estimate).sum();
        let rho_average = if self.emitted_records.is_empty() {
            0.0
        } else {
            sum / self.emitted_records.len() as f64
        };

        let report = FragmentEpochReport {
            epoch_id: self.epoch_id,
            rho_average,
            records: std::mem::take(&mut self.emitted_records),
        };

        self.adjust_subepoch(rho_average);
        report
    }

    fn flush_current(&mut self) {
        if self.packet_counter == 0 {
            return;
        }
        let record = SubepochRecord {
            fragment_index: self.index,
            epoch_id: self.epoch_id,
            subepoch_id: self.current_subepoch,
            total_subepochs: self.subepoch_count,
            hash_seed: self.hash_seed,
            packet_count: self.packet_counter,
            rho_estimate: self.current_rho(),
            sketch_kind: self.setting.kind,
            snapshot: self.sketch.clone(),
        };
        self.emitted_records.push(record);
        self.sketch.clear();
        self.rho_accum = 0.0;
    }

    fn flush_until(&mut self, target_subepoch: u32) {
        while self.current_subepoch < target_subepoch {
            self.flush_current();
            self.current_subepoch += 1;
            self.packet_counter = 0;
        }
    }

    /// The bucket the fragment's representative row (row 0) assigns to
    /// `flow`, used to read that counter before/after an update so ρ can
    /// be adjusted incrementally instead of rescanning the whole sketch.
    fn row0_bucket(&self, flow: FlowKey) -> usize {
        let width = self.sketch.raw_counters_view()[0].len() as u64;
        let seed = row_seed(self.hash_seed, 0);
        hash_flow(flow, seed, width) as usize
    }

    fn update_sketch_and_rho(&mut self, flow: FlowKey) {
        match self.setting.kind {
            SketchKind::CountMin => {
                let width = self.sketch.raw_counters_view()[0].len() as f64;
                self.sketch.update(flow, 1);
                self.rho_accum += 1.0 / width;
            }
            SketchKind::CountSketch => {
                let bucket = self.row0_bucket(flow);
                let width = self.sketch.raw_counters_view()[0].len() as f64;
                let old = self.sketch.raw_counters_view()[0][bucket] as f64;
                self.sketch.update(flow, 1);
                let new = self.sketch.raw_counters_view()[0][bucket] as f64;
                self.rho_accum += (new * new - old * old) / width;
            }
            SketchKind::UnivMon => {
                self.sketch.update(flow, 1);
            }
        }
    }

    /// ρ for the sketch state right now. CountSketch's `rho_accum` holds
    /// ρ², so it is reported through `sqrt`.
    fn current_rho(&self) -> f64 {
        match self.setting.kind {
            SketchKind::CountMin => self.rho_accum,
            SketchKind::CountSketch => self.rho_accum.max(0.0).sqrt(),
            SketchKind::UnivMon => 0.0,
        }
    }

    pub fn should_track(
        flow: FlowKey,
        hash_seed: u64,
        subepoch_id: u32,
        total_subepochs: u32,
        single_hop: bool,
        boost_single_hop: bool,
    ) -> bool {
        let assigned = hash_flow(flow, hash_seed, total_subepochs as u64) as u32;
        if subepoch_id == assigned {
            return true;
        }
        if boost_single_hop && single_hop && total_subepochs >= 2 {
            let second = (assigned + total_subepochs / 2) % total_subepochs.max(1);
            return subepoch_id == second;
        }
        false
    }

    pub fn temporal_aggregation(
        flow: FlowKey,
        report: &FragmentEpochReport,
        single_hop: bool,
        boost_single_hop: bool,
    ) -> u64 {
        for record in &report.records {
            if !Fragment::should_track(
                flow,
                record.hash_seed,
                record.subepoch_id,
                record.total_subepochs,
                single_hop,
                boost_single_hop,
            ) {
                continue;
            }
            let value = record.snapshot.query(flow);
            return value * record.total_subepochs as u64;
        }
        0
    }

    fn adjust_subepoch(&mut self, avg_rho: f64) {
        if self.setting.kind == SketchKind::UnivMon {
            self.subepoch_count = self.setting.initial_subepoch.max(MIN_SUBEPOCH);
            return;
        }
        let mut next = self.subepoch_count;
        if avg_rho > 2.0 * self.setting.rho_target && self.subepoch_count < self.setting.max_subepoch {
            next = (self.subepoch_count * 2).min(self.setting.max_subepoch);
        } else if avg_rho < 0.5 * self.setting.rho_target && self.subepoch_count > MIN_SUBEPOCH {
            next = (self.subepoch_count / 2).max(MIN_SUBEPOCH);
        }
        self.subepoch_count = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setting(kind: SketchKind) -> FragmentSetting {
        FragmentSetting {
            name: "f0".to_string(),
            kind,
            depth: 2,
            memory_bytes: 4096,
            initial_subepoch: 1,
            max_subepoch: 1,
            rho_target: 1.0,
            boost_single_hop: false,
        }
    }

    #[test]
    fn begin_then_close_with_no_packets_is_empty_and_reusable() {
        let mut fragment = Fragment::new(0, setting(SketchKind::CountMin), 1_000_000_000).unwrap();
        fragment.begin_epoch(0, 0).unwrap();
        let report = fragment.close_epoch();
        assert!(report.records.is_empty());
        assert_eq!(report.rho_average, 0.0);
        fragment.begin_epoch(1, 1_000_000_000).unwrap();
    }

    #[test]
    fn single_subepoch_aggregation_matches_raw_query() {
        let mut fragment = Fragment::new(0, setting(SketchKind::CountMin), 1_000_000_000).unwrap();
        fragment.begin_epoch(0, 0).unwrap();
        let flow = FlowKey::new(1, 2);
        for t in 0..10 {
            fragment.process_packet(flow, t, true);
        }
        let report = fragment.close_epoch();
        let aggregated = Fragment::temporal_aggregation(flow, &report, true, false);
        assert_eq!(aggregated, 10);
    }

    #[test]
    fn out_of_window_packets_are_dropped() {
        let mut fragment = Fragment::new(0, setting(SketchKind::CountMin), 1_000_000_000).unwrap();
        fragment.begin_epoch(5, 1_000_000_000).unwrap();
        fragment.process_packet(FlowKey::new(1, 1), 500_000_000, true);
        let report = fragment.close_epoch();
        assert!(report.records.is_empty());
    }

    #[test]
    fn should_track_is_pure() {
        let flow = FlowKey::new(3, 4);
        let a = Fragment::should_track(flow, 99, 0, 4, false, false);
        let b = Fragment::should_track(flow, 99, 0, 4, false, false);
        assert_eq!(a, b);
    }

    #[test]
    fn single_subepoch_disables_boost_second_slot() {
        let flow = FlowKey::new(3, 4);
        let assigned = hash_flow(flow, 42, 1) as u32;
        assert_eq!(assigned, 0);
        assert!(Fragment::should_track(flow, 42, 0, 1, true, true));
    }

    #[test]
    fn univmon_never_expands_subepoch_count() {
        let mut setting = setting(SketchKind::UnivMon);
        setting.initial_subepoch = 1;
        setting.max_subepoch = 8;
        let mut fragment = Fragment::new(0, setting, 1_000_000_000).unwrap();
        fragment.begin_epoch(0, 0).unwrap();
        for t in 0..1000 {
            fragment.process_packet(FlowKey::new(1, 1), t, true);
        }
        fragment.close_epoch();
        fragment.begin_epoch(1, 1_000_000_000).unwrap();
        assert_eq!(fragment.subepoch_count, 1);
    }

    /// With `boost_single_hop = false`, every flow across a large random
    /// population lands in exactly one sub-epoch.
    #[test]
    fn random_flows_land_in_exactly_one_subepoch_when_not_boosted() {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        let mut setting = setting(SketchKind::CountSketch);
        setting.initial_subepoch = 4;
        setting.max_subepoch = 4;
        let mut fragment = Fragment::new(0, setting, 1_000_000_000).unwrap();
        fragment.begin_epoch(0, 0).unwrap();

        let flows: Vec<FlowKey> = (0..500).map(|_| FlowKey::new(rng.gen(), rng.gen())).collect();
        for (i, &flow) in flows.iter().enumerate() {
            let t = (i as u64 * 1_000_000_000) / flows.len() as u64;
            fragment.process_packet(flow, t, true);
        }
        let report = fragment.close_epoch();

        for &flow in &flows {
            let matches = report
                .records
                .iter()
                .filter(|r| Fragment::should_track(flow, r.hash_seed, r.subepoch_id, r.total_subepochs, true, false))
                .count();
            assert!(matches <= 1, "flow {:?} matched {} sub-epochs", flow, matches);
        }
    }

    #[test]
    fn adaptive_expansion_then_contraction() {
        let mut setting = setting(SketchKind::CountMin);
        setting.max_subepoch = 8;
        setting.rho_target = 1.0;
        let mut fragment = Fragment::new(0, setting, 1_000_000_000).unwrap();
        fragment.begin_epoch(0, 0).unwrap();
        for t in 0..20_000 {
            fragment.process_packet(FlowKey::new(1, (t % 50) as u32), t, true);
        }
        fragment.close_epoch();
        assert!(fragment.subepoch_count > 1);

        fragment.begin_epoch(1, 1_000_000_000).unwrap();
        fragment.process_packet(FlowKey::new(9, 9), 0, true);
        fragment.close_epoch();
        assert_eq!(fragment.subepoch_count, 1);
    }
}
