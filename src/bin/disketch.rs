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

//! Wires the settings loader, the pcap packet source, the coordinator and
//! the CSV formatter together.

use chrono::Local;

use disketch::coordinator::Coordinator;
use disketch::options::CliOptions;
use disketch::packet_source::parse_pcap_file;
use disketch::{format, settings};

fn run() -> Result<(), disketch::DiSketchError> {
    let options = CliOptions::parse();
    let config = settings::load(&options.config_path)?;
    let enable_progress = config.enable_progress_bar && !options.quiet;
    let started_at = Local::now();

    let packets = parse_pcap_file(&config.pcap_path)?;
    let coordinator = Coordinator::new(config)?;

    let total_packets = packets.len();
    let mut progress = |epoch: u64, total_epochs: u64| {
        if enable_progress {
            eprintln!("epoch {}/{}", epoch + 1, total_epochs);
        }
    };
    let hook: Option<&mut dyn FnMut(u64, u64)> = if enable_progress { Some(&mut progress) } else { None };
    let report = coordinator.run(&packets, hook)?;

    println!("{}", format::render_csv(&report, !options.quiet));
    if !options.quiet {
        let elapsed = Local::now() - started_at;
        eprintln!(
            "processed {} packets across {} epochs in {}ms (started {})",
            total_packets,
            report.epochs.len(),
            elapsed.num_milliseconds(),
            started_at.to_rfc3339(),
        );
    }
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("disketch: {}", err);
        std::process::exit(1);
    }
}
