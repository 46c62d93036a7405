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

//! Renders a `DiSketchReport` as the method-comparison table, plus a
//! JSON dump for offline inspection.

use disketch_common::DiSketchError;

use crate::heavyhitter::HeavyHitterDetector;
use crate::report::DiSketchReport;

const CSV_HEADER: &str = "method,precision,recall,f1,accuracy,tp,fp,fn,tn";

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

fn csv_row(method: &str, detector: &HeavyHitterDetector) -> String {
    format!(
        "{},{},{},{},{},{},{},{},{}",
        method,
        round6(detector.precision()),
        round6(detector.recall()),
        round6(detector.f1()),
        round6(detector.accuracy()),
        detector.tp,
        detector.fp,
        detector.fn_,
        detector.tn,
    )
}

/// Render the `FullSketch`/`DiSketch` comparison as CSV. `with_header`
/// controls whether the column header line is emitted (the CLI's
/// `--quiet` flag suppresses it).
pub fn render_csv(report: &DiSketchReport, with_header: bool) -> String {
    let mut lines = Vec::new();
    if with_header {
        lines.push(CSV_HEADER.to_string());
    }
    lines.push(csv_row("FullSketch", &report.total_full_sketch_detector()));
    lines.push(csv_row("DiSketch", &report.total_disketch_detector()));
    lines.join("\n")
}

/// Serialize the full per-epoch report to JSON, for users who want more
/// detail than the CSV totals expose. CSV remains the default output;
/// this is not called by the CLI automatically.
pub fn render_json(report: &DiSketchReport) -> Result<String, DiSketchError> {
    serde_json::to_string_pretty(report).map_err(|e| DiSketchError::Configuration(format!("failed to serialize report: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::DiSketchReport;

    #[test]
    fn csv_has_one_header_and_two_method_rows() {
        let report = DiSketchReport::new();
        let csv = render_csv(&report, true);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].starts_with("FullSketch,"));
        assert!(lines[2].starts_with("DiSketch,"));
    }

    #[test]
    fn quiet_mode_omits_the_header() {
        let report = DiSketchReport::new();
        let csv = render_csv(&report, false);
        assert_eq!(csv.lines().count(), 2);
    }

    #[test]
    fn metrics_round_to_six_decimals() {
        let mut detector = HeavyHitterDetector::new();
        detector.record(true, true);
        detector.record(true, false);
        detector.record(true, false);
        let row = csv_row("FullSketch", &detector);
        let precision_field = row.split(',').nth(1).unwrap();
        assert_eq!(precision_field, "1");
        let recall_field = row.split(',').nth(2).unwrap();
        assert_eq!(recall_field, "0.333333");
    }

    #[test]
    fn json_round_trip_contains_epoch_count() {
        let report = DiSketchReport::new();
        let json = render_json(&report).unwrap();
        assert!(json.contains("\"epochs\""));
    }
}
