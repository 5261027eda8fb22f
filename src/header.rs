//! Replay file header and the Fortnite header chunk
//!
//! ## File header layout (little endian)
//!
//! | Field           | Type                         | Since version      |
//! |-----------------|------------------------------|--------------------|
//! | magic           | u32 (`0x1CA2E27F`)           |                    |
//! | file_version    | u32                          |                    |
//! | custom_versions | i32 count × (GUID, i32)      | CUSTOM_VERSIONS    |
//! | length_in_ms    | u32                          |                    |
//! | network_version | u32                          |                    |
//! | changelist      | u32                          |                    |
//! | friendly_name   | FString                      |                    |
//! | is_live         | u32 bool                     |                    |
//! | timestamp       | u64                          | RECORDED_TIMESTAMP |
//! | is_compressed   | u32 bool                     | COMPRESSION        |
//! | is_encrypted    | u32 bool                     | ENCRYPTION         |
//! | encryption_key  | i32 count + bytes            | ENCRYPTION         |

use serde::Serialize;

use crate::cursor::ByteCursor;
use crate::error::{Error, Result};

/// Magic number at the start of every replay file
pub const FILE_MAGIC: u32 = 0x1CA2_E27F;

/// Magic number at the start of the Fortnite header chunk
pub const GAME_HEADER_MAGIC: u32 = 0x2CF5_A13D;

/// File format history versions
pub mod history {
    pub const INITIAL: u32 = 0;
    pub const FIXED_SIZE_FRIENDLY_NAME: u32 = 1;
    pub const COMPRESSION: u32 = 2;
    pub const RECORDED_TIMESTAMP: u32 = 3;
    pub const STREAM_CHUNK_TIMES: u32 = 4;
    pub const FRIENDLY_NAME_ENCODING: u32 = 5;
    pub const ENCRYPTION: u32 = 6;
    pub const CUSTOM_VERSIONS: u32 = 7;
}

/// Header network versions that change the Fortnite header chunk layout
pub mod network_history {
    pub const MULTIPLE_LEVELS: u32 = 6;
    pub const MULTIPLE_LEVELS_TIME_CHANGES: u32 = 7;
    pub const HEADER_FLAGS: u32 = 9;
    pub const SAVE_FULL_ENGINE_VERSION: u32 = 11;
    pub const HEADER_GUID: u32 = 12;
}

bitflags::bitflags! {
    /// Header flag set
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ReplayFlags: u32 {
        const COMPRESSED = 1 << 0;
        const ENCRYPTED = 1 << 1;
        const LIVE = 1 << 2;
        /// A Fortnite header chunk was decoded
        const HAS_GAME_DATA = 1 << 3;
    }
}

impl Serialize for ReplayFlags {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.bits().serialize(serializer)
    }
}

/// Engine custom version entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomVersion {
    pub guid: [u8; 16],
    pub version: i32,
}

/// Replay file header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayHeader {
    pub magic: u32,
    pub file_version: u32,
    pub custom_versions: Vec<CustomVersion>,
    pub length_in_ms: u32,
    pub network_version: u32,
    pub changelist: u32,
    pub friendly_name: String,
    /// .NET ticks; absent before RECORDED_TIMESTAMP
    pub timestamp: Option<u64>,
    pub flags: ReplayFlags,
    #[serde(skip)]
    pub encryption_key: Vec<u8>,
}

impl ReplayHeader {
    /// Parse the header from the start of the file
    ///
    /// Any failure here, including truncation, is reported as
    /// [`Error::InvalidFormat`]: without a header nothing else can be read.
    pub fn parse(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        Self::parse_inner(cursor).map_err(|e| match e {
            Error::InvalidFormat(_) => e,
            other => Error::InvalidFormat(format!("unreadable file header: {}", other)),
        })
    }

    fn parse_inner(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let magic = cursor.read_u32()?;
        if magic != FILE_MAGIC {
            return Err(Error::InvalidFormat(format!(
                "bad magic number 0x{:08X} (expected 0x{:08X})",
                magic, FILE_MAGIC
            )));
        }

        let file_version = cursor.read_u32()?;

        let mut custom_versions = Vec::new();
        if file_version >= history::CUSTOM_VERSIONS {
            let count = read_count(cursor, 20)?;
            custom_versions.reserve(count);
            for _ in 0..count {
                custom_versions.push(CustomVersion {
                    guid: cursor.read_guid()?,
                    version: cursor.read_i32()?,
                });
            }
        }

        let length_in_ms = cursor.read_u32()?;
        let network_version = cursor.read_u32()?;
        let changelist = cursor.read_u32()?;
        let friendly_name = cursor.read_fstring()?;

        let mut flags = ReplayFlags::empty();
        if cursor.read_bool()? {
            flags.insert(ReplayFlags::LIVE);
        }

        let timestamp = if file_version >= history::RECORDED_TIMESTAMP {
            Some(cursor.read_u64()?)
        } else {
            None
        };

        if file_version >= history::COMPRESSION && cursor.read_bool()? {
            flags.insert(ReplayFlags::COMPRESSED);
        }

        let mut encryption_key = Vec::new();
        if file_version >= history::ENCRYPTION {
            if cursor.read_bool()? {
                flags.insert(ReplayFlags::ENCRYPTED);
            }
            encryption_key = cursor.read_byte_array()?;
        }

        Ok(ReplayHeader {
            magic,
            file_version,
            custom_versions,
            length_in_ms,
            network_version,
            changelist,
            friendly_name,
            timestamp,
            flags,
            encryption_key,
        })
    }

    pub fn is_compressed(&self) -> bool {
        self.flags.contains(ReplayFlags::COMPRESSED)
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags.contains(ReplayFlags::ENCRYPTED)
    }

    pub fn is_live(&self) -> bool {
        self.flags.contains(ReplayFlags::LIVE)
    }

    /// Whether replay-data chunks carry start/end times and a memory size
    pub fn has_chunk_times(&self) -> bool {
        self.file_version >= history::STREAM_CHUNK_TIMES
    }
}

/// Game release parsed from the header branch, e.g. `++Fortnite+Release-4.2`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Release {
    pub major: u16,
    pub minor: u16,
}

impl Release {
    /// Development branch (`++Fortnite+Main`), newer than any numbered release
    pub const MAIN: Release = Release {
        major: u16::MAX,
        minor: u16::MAX,
    };

    pub fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }

    /// Parse a branch name; `None` if it is not a Fortnite branch
    pub fn from_branch(branch: &str) -> Option<Self> {
        let rest = branch.strip_prefix("++Fortnite+")?;
        if rest == "Main" {
            return Some(Release::MAIN);
        }
        let version = rest.strip_prefix("Release-")?;
        let mut parts = version.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = match parts.next() {
            Some(minor) => minor.parse().ok()?,
            None => 0,
        };
        Some(Release { major, minor })
    }
}

/// A level entry in the Fortnite header chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelInfo {
    pub name: String,
    pub time: Option<u32>,
}

/// Fortnite header chunk (chunk type 0)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameHeader {
    pub network_version: u32,
    pub network_checksum: u32,
    pub engine_network_version: u32,
    pub game_network_protocol: u32,
    pub guid: Option<[u8; 16]>,
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
    pub changelist: u32,
    pub branch: String,
    pub levels: Vec<LevelInfo>,
    pub flags: u32,
    pub game_specific_data: Vec<String>,
}

impl GameHeader {
    /// Parse the payload of a header chunk
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(data);

        let magic = cursor.read_u32()?;
        if magic != GAME_HEADER_MAGIC {
            return Err(Error::CorruptChunk(format!(
                "bad header chunk magic 0x{:08X}",
                magic
            )));
        }

        let network_version = cursor.read_u32()?;
        let network_checksum = cursor.read_u32()?;
        let engine_network_version = cursor.read_u32()?;
        let game_network_protocol = cursor.read_u32()?;

        let guid = if network_version >= network_history::HEADER_GUID {
            Some(cursor.read_guid()?)
        } else {
            None
        };

        let (major, minor, patch, changelist, branch) =
            if network_version >= network_history::SAVE_FULL_ENGINE_VERSION {
                let major = cursor.read_u16()?;
                let minor = cursor.read_u16()?;
                let patch = cursor.read_u16()?;
                let changelist = cursor.read_u32()?;
                let branch = cursor.read_fstring()?;
                (major, minor, patch, changelist, branch)
            } else {
                (0, 0, 0, cursor.read_u32()?, String::new())
            };

        let mut levels = Vec::new();
        if network_version >= network_history::MULTIPLE_LEVELS {
            let count = read_count(&mut cursor, 4)?;
            for _ in 0..count {
                let name = cursor.read_fstring()?;
                let time = if network_version >= network_history::MULTIPLE_LEVELS_TIME_CHANGES {
                    Some(cursor.read_u32()?)
                } else {
                    None
                };
                levels.push(LevelInfo { name, time });
            }
        }

        let flags = if network_version >= network_history::HEADER_FLAGS {
            cursor.read_u32()?
        } else {
            0
        };

        let count = read_count(&mut cursor, 4)?;
        let mut game_specific_data = Vec::with_capacity(count);
        for _ in 0..count {
            game_specific_data.push(cursor.read_fstring()?);
        }

        Ok(GameHeader {
            network_version,
            network_checksum,
            engine_network_version,
            game_network_protocol,
            guid,
            major,
            minor,
            patch,
            changelist,
            branch,
            levels,
            flags,
            game_specific_data,
        })
    }

    /// Release parsed from the branch name
    pub fn release(&self) -> Option<Release> {
        Release::from_branch(&self.branch)
    }
}

/// Read an `i32` element count, rejecting counts the remaining bytes could
/// not possibly hold at `min_element_size` bytes per element
fn read_count(cursor: &mut ByteCursor<'_>, min_element_size: usize) -> Result<usize> {
    let offset = cursor.position();
    let count = cursor.read_i32()?;
    if count < 0 || count as usize > cursor.remaining() / min_element_size {
        return Err(Error::CorruptChunk(format!(
            "implausible element count {} at offset {}",
            count, offset
        )));
    }
    Ok(count as usize)
}
