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

//! Loads and validates the INI configuration file into the `Config` the
//! coordinator consumes. Sections: `[global]`, one or more
//! `[fragment:<name>]`, one or more `[path:<name>]`.

use std::collections::HashMap;

use config::{Config as RawConfig, File, FileFormat};

use disketch_common::DiSketchError;

use crate::coordinator::Config;
use crate::fragment::FragmentSetting;
use crate::sketch::SketchKind;
use crate::topology::{PathSetting, TopologyConfig};

const DEFAULT_FRAGMENT_MEMORY: u64 = 8 * 1024 * 1024;

/// Reads and validates `ini_path`, producing the coordinator's `Config`.
pub fn load(ini_path: &str) -> Result<Config, DiSketchError> {
    let mut raw = RawConfig::default();
    raw.merge(File::new(ini_path, FileFormat::Ini))
        .map_err(|e| DiSketchError::Configuration(format!("failed to read {}: {}", ini_path, e)))?;

    let sections: HashMap<String, HashMap<String, String>> = raw
        .try_into()
        .map_err(|e| DiSketchError::Configuration(format!("malformed ini: {}", e)))?;

    let global = sections.get("global").cloned().unwrap_or_default();

    let pcap_path = global.get("pcap").cloned().unwrap_or_default();
    if pcap_path.is_empty() {
        return Err(DiSketchError::Configuration("configuration is missing a pcap path".to_string()));
    }

    let sketch_kind = SketchKind::parse(global.get("sketch_kind").map(String::as_str).unwrap_or("CountSketch"));
    let epoch_duration_ns = parse_u64(global.get("epoch_ns"), 1_000_000_000);
    let max_epochs = parse_u64(global.get("max_epochs"), 0) as u32;
    let full_sketch_depth = parse_u64(global.get("full_sketch_depth"), 8) as u32;
    let heavy_hitter_ratio = parse_f64(global.get("heavy_ratio"), 0.0001);
    let enable_progress_bar = parse_bool(global.get("progress_bar"), true);

    let mut fragments = Vec::new();
    let mut fragment_index: HashMap<String, usize> = HashMap::new();

    let mut section_names: Vec<&String> = sections.keys().collect();
    section_names.sort();

    for section_name in &section_names {
        if !section_name.starts_with("fragment:") {
            continue;
        }
        let fields = &sections[*section_name];
        let mut name = fields.get("name").cloned().unwrap_or_default();
        if name.is_empty() {
            name = section_name["fragment:".len()..].to_string();
        }

        let kind = match fields.get("kind") {
            Some(value) if !value.is_empty() => SketchKind::parse(value),
            _ => sketch_kind,
        };

        let memory_bytes = parse_u64(fields.get("memory"), DEFAULT_FRAGMENT_MEMORY);
        let mut depth = parse_u64(fields.get("depth"), 1) as u32;
        if depth == 0 {
            depth = 1;
        }
        let initial_subepoch = parse_u64(fields.get("initial_subepoch"), 1).max(1) as u32;
        let mut max_subepoch = parse_u64(fields.get("max_subepoch"), initial_subepoch as u64) as u32;
        if max_subepoch < initial_subepoch {
            max_subepoch = initial_subepoch;
        }
        let rho_target = parse_f64(fields.get("rho_target"), 1.0);
        let boost_single_hop = parse_bool(fields.get("boost_single_hop"), false);

        fragment_index.insert(name.clone(), fragments.len());
        fragments.push(FragmentSetting {
            name,
            kind,
            depth,
            memory_bytes,
            initial_subepoch,
            max_subepoch,
            rho_target,
            boost_single_hop,
        });
    }

    if fragments.is_empty() {
        return Err(DiSketchError::Configuration("configuration is missing any [fragment:*] section".to_string()));
    }

    let mut paths = Vec::new();
    for section_name in &section_names {
        if !section_name.starts_with("path:") {
            continue;
        }
        let fields = &sections[*section_name];
        let mut name = fields.get("name").cloned().unwrap_or_default();
        if name.is_empty() {
            name = section_name["path:".len()..].to_string();
        }

        let nodes_str = fields.get("nodes").cloned().unwrap_or_default();
        if nodes_str.is_empty() {
            return Err(DiSketchError::Configuration(format!("path {} is missing a nodes list", section_name)));
        }

        let mut node_indices = Vec::new();
        for node_name in nodes_str.split(',').map(str::trim) {
            let index = fragment_index
                .get(node_name)
                .ok_or_else(|| DiSketchError::Configuration(format!("path {} references undefined node {}", section_name, node_name)))?;
            node_indices.push(*index);
        }
        if node_indices.is_empty() {
            return Err(DiSketchError::Configuration(format!("path {} has no valid nodes", section_name)));
        }

        paths.push(PathSetting { name, node_indices });
    }

    if paths.is_empty() {
        return Err(DiSketchError::Configuration("configuration is missing any [path:*] section".to_string()));
    }

    Ok(Config {
        pcap_path,
        topology: TopologyConfig { fragments, paths },
        max_epochs,
        full_sketch_depth,
        heavy_hitter_ratio,
        epoch_duration_ns,
        sketch_kind,
        enable_progress_bar,
    })
}

fn parse_u64(value: Option<&String>, default: u64) -> u64 {
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn parse_f64(value: Option<&String>, default: f64) -> f64 {
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn parse_bool(value: Option<&String>, default: bool) -> bool {
    match value.map(String::as_str) {
        Some("1") | Some("true") | Some("TRUE") | Some("True") => true,
        Some("0") | Some("false") | Some("FALSE") | Some("False") => false,
        _ => default,
    }
}
