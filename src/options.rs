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

//! Command-line surface for the `disketch` binary.

use clap::{App, Arg};

pub const DEFAULT_CONFIG_PATH: &str = "disketch.ini";

pub struct CliOptions {
    pub config_path: String,
    pub quiet: bool,
}

impl CliOptions {
    pub fn parse() -> CliOptions {
        let matches = App::new("disketch")
            .version("1.0.0")
            .about("Distributed network-traffic measurement simulator")
            .arg(
                Arg::with_name("config")
                    .short("c")
                    .long("config")
                    .value_name("PATH")
                    .help("Path to the INI configuration file")
                    .takes_value(true)
                    .default_value(DEFAULT_CONFIG_PATH),
            )
            .arg(
                Arg::with_name("quiet")
                    .short("q")
                    .long("quiet")
                    .help("Suppress the CSV header and progress output")
                    .takes_value(false),
            )
            .get_matches();

        CliOptions {
            config_path: matches.value_of("config").unwrap_or(DEFAULT_CONFIG_PATH).to_string(),
            quiet: matches.is_present("quiet"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_path_is_disketch_ini() {
        assert_eq!(DEFAULT_CONFIG_PATH, "disketch.ini");
    }
}
