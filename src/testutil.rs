//! Builders for synthetic replay files used across the unit tests

use std::io::Write;

use crate::events::{MatchStats, PlayerId};
use crate::header::{history, FILE_MAGIC, GAME_HEADER_MAGIC};

/// LSB-first bit writer, the inverse of `BitCursor`
#[derive(Debug, Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    bit_len: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_bits(&mut self, value: u64, width: usize) {
        for i in 0..width {
            if self.bit_len % 8 == 0 {
                self.bytes.push(0);
            }
            if (value >> i) & 1 == 1 {
                let last = self.bytes.len() - 1;
                self.bytes[last] |= 1 << (self.bit_len % 8);
            }
            self.bit_len += 1;
        }
    }

    pub fn write_u8(&mut self, value: u8) {
        self.write_bits(value as u64, 8);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.write_bits(value as u64, 32);
    }

    pub fn write_f32(&mut self, value: f32) {
        self.write_u32(value.to_bits());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.write_u8(b);
        }
    }

    pub fn write_fstring(&mut self, value: &str) {
        let mut bytes = Vec::new();
        put_fstring(&mut bytes, value);
        self.write_bytes(&bytes);
    }

    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_i32(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_fstring(out: &mut Vec<u8>, value: &str) {
    if value.is_empty() {
        put_i32(out, 0);
        return;
    }
    put_i32(out, value.len() as i32 + 1);
    out.extend_from_slice(value.as_bytes());
    out.push(0);
}

/// File header builder
#[derive(Debug, Clone)]
pub struct HeaderBuilder {
    file_version: u32,
    custom_versions: Vec<([u8; 16], i32)>,
    compressed: bool,
    encryption_key: Option<Vec<u8>>,
}

impl HeaderBuilder {
    pub const TIMESTAMP: u64 = 637_500_000_000_000_000;

    pub fn new(file_version: u32) -> Self {
        Self {
            file_version,
            custom_versions: Vec::new(),
            compressed: false,
            encryption_key: None,
        }
    }

    pub fn custom_version(mut self, guid: [u8; 16], version: i32) -> Self {
        self.custom_versions.push((guid, version));
        self
    }

    pub fn compressed(mut self, compressed: bool) -> Self {
        self.compressed = compressed;
        self
    }

    /// Mark the replay encrypted with this key
    pub fn encryption_key(mut self, key: Vec<u8>) -> Self {
        self.encryption_key = Some(key);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        put_u32(&mut out, FILE_MAGIC);
        put_u32(&mut out, self.file_version);

        if self.file_version >= history::CUSTOM_VERSIONS {
            put_i32(&mut out, self.custom_versions.len() as i32);
            for (guid, version) in &self.custom_versions {
                out.extend_from_slice(guid);
                put_i32(&mut out, *version);
            }
        }

        put_u32(&mut out, 600_000);
        put_u32(&mut out, 2);
        put_u32(&mut out, 4_834_550);
        put_fstring(&mut out, "Unsaved Replay");
        put_u32(&mut out, 0);

        if self.file_version >= history::RECORDED_TIMESTAMP {
            out.extend_from_slice(&Self::TIMESTAMP.to_le_bytes());
        }
        if self.file_version >= history::COMPRESSION {
            put_u32(&mut out, self.compressed as u32);
        }
        if self.file_version >= history::ENCRYPTION {
            put_u32(&mut out, self.encryption_key.is_some() as u32);
            let key = self.encryption_key.as_deref().unwrap_or(&[]);
            put_i32(&mut out, key.len() as i32);
            out.extend_from_slice(key);
        }
        out
    }
}

/// Fortnite header chunk builder
#[derive(Debug, Clone)]
pub struct GameHeaderBuilder {
    branch: String,
    engine_network_version: u32,
    levels: Vec<(String, u32)>,
    game_data: Vec<String>,
}

impl GameHeaderBuilder {
    pub fn new(branch: &str) -> Self {
        Self {
            branch: branch.to_string(),
            engine_network_version: 11,
            levels: Vec::new(),
            game_data: Vec::new(),
        }
    }

    pub fn engine_network_version(mut self, version: u32) -> Self {
        self.engine_network_version = version;
        self
    }

    pub fn level(mut self, name: &str, time: u32) -> Self {
        self.levels.push((name.to_string(), time));
        self
    }

    pub fn game_data(mut self, value: &str) -> Self {
        self.game_data.push(value.to_string());
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        put_u32(&mut out, GAME_HEADER_MAGIC);
        put_u32(&mut out, 14);
        put_u32(&mut out, 0x1234_5678);
        put_u32(&mut out, self.engine_network_version);
        put_u32(&mut out, 0);
        out.extend_from_slice(&[0xAB; 16]);
        put_u16(&mut out, 4);
        put_u16(&mut out, 26);
        put_u16(&mut out, 0);
        put_u32(&mut out, 4_834_550);
        put_fstring(&mut out, &self.branch);

        put_i32(&mut out, self.levels.len() as i32);
        for (name, time) in &self.levels {
            put_fstring(&mut out, name);
            put_u32(&mut out, *time);
        }

        put_u32(&mut out, 0);

        put_i32(&mut out, self.game_data.len() as i32);
        for value in &self.game_data {
            put_fstring(&mut out, value);
        }
        out
    }
}

/// Whole-file builder: a header followed by chunks in call order
#[derive(Debug, Clone)]
pub struct ReplayBuilder {
    header: HeaderBuilder,
    chunks: Vec<u8>,
}

impl ReplayBuilder {
    pub fn new() -> Self {
        Self::with_header(HeaderBuilder::new(history::CUSTOM_VERSIONS))
    }

    pub fn compressed() -> Self {
        Self::with_header(HeaderBuilder::new(history::CUSTOM_VERSIONS).compressed(true))
    }

    pub fn with_header(header: HeaderBuilder) -> Self {
        Self {
            header,
            chunks: Vec::new(),
        }
    }

    pub fn raw_chunk(mut self, chunk_type: u32, payload: Vec<u8>) -> Self {
        put_u32(&mut self.chunks, chunk_type);
        put_i32(&mut self.chunks, payload.len() as i32);
        self.chunks.extend_from_slice(&payload);
        self
    }

    pub fn game_header(self, game: GameHeaderBuilder) -> Self {
        let payload = game.build();
        self.raw_chunk(0, payload)
    }

    pub fn event_chunk(self, records: &[Vec<u8>]) -> Self {
        self.raw_chunk(3, records.concat())
    }

    pub fn checkpoint_chunk(self, records: &[Vec<u8>]) -> Self {
        self.raw_chunk(2, records.concat())
    }

    /// Replay-data chunk around `body`, with stream times when the file
    /// version records them
    pub fn replay_data(self, start_ms: u32, end_ms: u32, body: Vec<u8>) -> Self {
        let mut payload = Vec::new();
        if self.header.file_version >= history::STREAM_CHUNK_TIMES {
            put_u32(&mut payload, start_ms);
            put_u32(&mut payload, end_ms);
            put_u32(&mut payload, body.len() as u32);
            put_u32(&mut payload, body.len() as u32);
        }
        payload.extend_from_slice(&body);
        self.raw_chunk(1, payload)
    }

    /// Replay-data chunk holding `body` zlib-compressed
    pub fn compressed_replay_data(self, start_ms: u32, end_ms: u32, body: &[u8]) -> Self {
        let envelope = compression_envelope(2, body.len() as u32, &zlib(body));
        self.replay_data(start_ms, end_ms, envelope)
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = self.header.build();
        out.extend_from_slice(&self.chunks);
        out
    }
}

fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn compression_envelope(method: u32, decompressed_size: u32, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    put_u32(&mut out, method);
    put_u32(&mut out, decompressed_size);
    put_u32(&mut out, data.len() as u32);
    out.extend_from_slice(data);
    out
}

/// Frame one event record; `end_ms` equals `start_ms`
pub fn event_record(
    id: &str,
    group: &str,
    metadata: &str,
    start_ms: u32,
    payload: &[u8],
) -> Vec<u8> {
    let mut out = Vec::new();
    put_fstring(&mut out, id);
    put_fstring(&mut out, group);
    put_fstring(&mut out, metadata);
    put_u32(&mut out, start_ms);
    put_u32(&mut out, start_ms);
    put_u32(&mut out, payload.len() as u32);
    out.extend_from_slice(payload);
    out
}

fn write_player(writer: &mut BitWriter, player: &PlayerId) {
    match player {
        PlayerId::Bot => writer.write_u8(0x03),
        PlayerId::Name(name) => {
            writer.write_u8(0x10);
            writer.write_fstring(name);
        }
        PlayerId::Guid(hex) => {
            let bytes: Vec<u8> = (0..hex.len())
                .step_by(2)
                .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).unwrap())
                .collect();
            writer.write_u8(0x11);
            writer.write_u8(bytes.len() as u8);
            writer.write_bytes(&bytes);
        }
        PlayerId::Unresolved(tag) => {
            writer.write_u8(*tag);
            writer.write_u8(0);
        }
    }
}

/// Elimination payload in the season 9+ layout
pub fn elimination_payload(
    eliminated: &PlayerId,
    eliminator: &PlayerId,
    gun_type: u8,
    knocked: bool,
) -> Vec<u8> {
    let mut writer = BitWriter::new();
    writer.write_bytes(&[0x5C; 85]);
    write_player(&mut writer, eliminated);
    write_player(&mut writer, eliminator);
    writer.write_u8(gun_type);
    writer.write_u32(knocked as u32);
    writer.finish()
}

/// Elimination payload in a pre-season 9 layout
pub fn legacy_elimination_payload(
    preamble: usize,
    eliminated: &str,
    eliminator: &str,
    gun_type: u8,
    knocked: bool,
) -> Vec<u8> {
    let mut writer = BitWriter::new();
    writer.write_bytes(&vec![0x5C; preamble]);
    writer.write_fstring(eliminated);
    writer.write_fstring(eliminator);
    writer.write_u8(gun_type);
    writer.write_u32(knocked as u32);
    writer.finish()
}

pub fn match_stats_payload(stats: &MatchStats) -> Vec<u8> {
    let mut writer = BitWriter::new();
    writer.write_u32(0);
    writer.write_f32(stats.accuracy);
    for value in [
        stats.assists,
        stats.eliminations,
        stats.weapon_damage,
        stats.other_damage,
        stats.revives,
        stats.damage_taken,
        stats.damage_structures,
        stats.materials_gathered,
        stats.materials_used,
        stats.total_traveled,
    ] {
        writer.write_u32(value);
    }
    writer.finish()
}

pub fn team_stats_payload(team_id: u32, placement: u32, player_count: u32) -> Vec<u8> {
    let mut writer = BitWriter::new();
    writer.write_u32(team_id);
    writer.write_u32(placement);
    writer.write_u32(player_count);
    writer.finish()
}
