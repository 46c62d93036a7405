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

use std::io::{Cursor, Read};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};

use disketch_common::{DiSketchError, FlowKey, PacketRecord};

const GLOBAL_HEADER_LEN: usize = 24;
const PACKET_HEADER_LEN: usize = 16;
const ETHERNET_HEADER_LEN: usize = 14;
const IPV4_SRC_OFFSET: usize = 12;
const IPV4_DST_OFFSET: usize = 16;

const MAGIC_MICRO_LE: u32 = 0xa1b2c3d4;
const MAGIC_MICRO_BE: u32 = 0xd4c3b2a1;
const MAGIC_NANO_LE: u32 = 0xa1b2_3c4d;
const MAGIC_NANO_BE: u32 = 0x4d3c_b2a1;

#[derive(Clone, Copy)]
enum Endianness {
    Little,
    Big,
}

/// Parse a pcap file into a timestamp-sorted `Vec<PacketRecord>`.
/// Non-IPv4 or truncated frames are skipped, not errors; a file that
/// yields zero packets is `DiSketchError::Input`.
pub fn parse_pcap_file(path: &str) -> Result<Vec<PacketRecord>, DiSketchError> {
    let bytes = std::fs::read(path).map_err(|e| DiSketchError::Input(format!("failed to read {}: {}", path, e)))?;
    let mut packets = parse_pcap_bytes(&bytes)?;
    packets.sort_by_key(|p| p.timestamp_ns);
    Ok(packets)
}

fn parse_pcap_bytes(bytes: &[u8]) -> Result<Vec<PacketRecord>, DiSketchError> {
    if bytes.len() < GLOBAL_HEADER_LEN {
        return Err(DiSketchError::Input("pcap file is shorter than a global header".to_string()));
    }

    let magic_le = LittleEndian::read_u32(&bytes[0..4]);
    let (endianness, nanosecond_precision) = match magic_le {
        MAGIC_MICRO_LE => (Endianness::Little, false),
        MAGIC_MICRO_BE => (Endianness::Big, false),
        MAGIC_NANO_LE => (Endianness::Little, true),
        MAGIC_NANO_BE => (Endianness::Big, true),
        _ => return Err(DiSketchError::Input("unrecognised pcap magic number".to_string())),
    };

    let mut cursor = Cursor::new(&bytes[GLOBAL_HEADER_LEN..]);
    let mut packets = Vec::new();

    loop {
        let header = match read_packet_header(&mut cursor, endianness) {
            Some(header) => header,
            None => break,
        };
        let mut payload = vec![0u8; header.captured_len as usize];
        if cursor.read_exact(&mut payload).is_err() {
            break;
        }

        if let Some(flow) = extract_ipv4_flow(&payload) {
            let fraction_ns = if nanosecond_precision { header.ts_frac as u64 } else { header.ts_frac as u64 * 1000 };
            let timestamp_ns = header.ts_sec as u64 * 1_000_000_000 + fraction_ns;
            packets.push(PacketRecord { flow, timestamp_ns });
        }
    }

    if packets.is_empty() {
        return Err(DiSketchError::Input("pcap file yielded zero IPv4 packets".to_string()));
    }
    Ok(packets)
}

struct PacketHeader {
    ts_sec: u32,
    ts_frac: u32,
    captured_len: u32,
}

fn read_packet_header(cursor: &mut Cursor<&[u8]>, endianness: Endianness) -> Option<PacketHeader> {
    if (cursor.get_ref().len() as u64 - cursor.position()) < PACKET_HEADER_LEN as u64 {
        return None;
    }
    let (ts_sec, ts_frac, captured_len, _orig_len) = match endianness {
        Endianness::Little => (
            cursor.read_u32::<LittleEndian>().ok()?,
            cursor.read_u32::<LittleEndian>().ok()?,
            cursor.read_u32::<LittleEndian>().ok()?,
            cursor.read_u32::<LittleEndian>().ok()?,
        ),
        Endianness::Big => (
            cursor.read_u32::<BigEndian>().ok()?,
            cursor.read_u32::<BigEndian>().ok()?,
            cursor.read_u32::<BigEndian>().ok()?,
            cursor.read_u32::<BigEndian>().ok()?,
        ),
    };
    Some(PacketHeader { ts_sec, ts_frac, captured_len })
}

fn extract_ipv4_flow(frame: &[u8]) -> Option<FlowKey> {
    if frame.len() < ETHERNET_HEADER_LEN + IPV4_DST_OFFSET + 4 {
        return None;
    }
    let ip_header = &frame[ETHERNET_HEADER_LEN..];
    let version = ip_header[0] >> 4;
    if version != 4 {
        return None;
    }
    let src = BigEndian::read_u32(&ip_header[IPV4_SRC_OFFSET..IPV4_SRC_OFFSET + 4]);
    let dst = BigEndian::read_u32(&ip_header[IPV4_DST_OFFSET..IPV4_DST_OFFSET + 4]);
    Some(FlowKey::new(src, dst))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_global_header(bytes: &mut Vec<u8>, magic: u32) {
        bytes.extend_from_slice(&magic.to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&4u16.to_le_bytes());
        bytes.extend_from_slice(&0i32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&65535u32.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
    }

    fn push_ipv4_frame(bytes: &mut Vec<u8>, ts_sec: u32, ts_frac: u32, src: u32, dst: u32) {
        let mut frame = vec![0u8; ETHERNET_HEADER_LEN + 20];
        frame[ETHERNET_HEADER_LEN] = 0x45;
        frame[ETHERNET_HEADER_LEN + IPV4_SRC_OFFSET..ETHERNET_HEADER_LEN + IPV4_SRC_OFFSET + 4]
            .copy_from_slice(&src.to_be_bytes());
        frame[ETHERNET_HEADER_LEN + IPV4_DST_OFFSET..ETHERNET_HEADER_LEN + IPV4_DST_OFFSET + 4]
            .copy_from_slice(&dst.to_be_bytes());
        bytes.extend_from_slice(&ts_sec.to_le_bytes());
        bytes.extend_from_slice(&ts_frac.to_le_bytes());
        bytes.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&frame);
    }

    #[test]
    fn parses_microsecond_little_endian_pcap() {
        let mut bytes = Vec::new();
        push_global_header(&mut bytes, MAGIC_MICRO_LE);
        push_ipv4_frame(&mut bytes, 1, 500_000, 0x0a000001, 0x0a000002);
        push_ipv4_frame(&mut bytes, 0, 0, 0x0a000003, 0x0a000004);

        let mut packets = parse_pcap_bytes(&bytes).unwrap();
        packets.sort_by_key(|p| p.timestamp_ns);
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].timestamp_ns, 0);
        assert_eq!(packets[1].timestamp_ns, 1_500_000_000);
        assert_eq!(packets[1].flow, FlowKey::new(0x0a000001, 0x0a000002));
    }

    #[test]
    fn nanosecond_precision_is_not_scaled() {
        let mut bytes = Vec::new();
        push_global_header(&mut bytes, MAGIC_NANO_LE);
        push_ipv4_frame(&mut bytes, 1, 42, 0x0a000001, 0x0a000002);
        let packets = parse_pcap_bytes(&bytes).unwrap();
        assert_eq!(packets[0].timestamp_ns, 1_000_000_042);
    }

    #[test]
    fn non_ipv4_frames_are_skipped_not_errors() {
        let mut bytes = Vec::new();
        push_global_header(&mut bytes, MAGIC_MICRO_LE);
        let mut frame = vec![0u8; ETHERNET_HEADER_LEN + 20];
        frame[ETHERNET_HEADER_LEN] = 0x60; // IPv6 version nibble
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&frame);

        assert!(parse_pcap_bytes(&bytes).is_err());
    }

    #[test]
    fn unrecognised_magic_is_an_input_error() {
        let bytes = vec![0u8; GLOBAL_HEADER_LEN];
        assert!(parse_pcap_bytes(&bytes).is_err());
    }
}
