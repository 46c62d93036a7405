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

//! DiSketch: a distributed network-traffic measurement simulator.
//!
//! A stream of packets, each carrying a flow identity and an arrival time,
//! is split across a topology of measurement fragments. Each fragment
//! subdivides its epoch into sub-epochs to spread sketch load, then the
//! coordinator reconstructs a per-flow estimate by aggregating temporally
//! (across one fragment's sub-epochs) and then spatially (across the
//! fragments on a flow's path), and compares the result against a
//! monolithic full sketch fed the same packets.

pub mod coordinator;
pub mod format;
pub mod fragment;
pub mod hash;
pub mod heavyhitter;
pub mod ideal;
pub mod options;
pub mod packet_source;
pub mod report;
pub mod settings;
pub mod sketch;
pub mod topology;

pub use disketch_common::{DiSketchError, FlowKey, PacketRecord};
