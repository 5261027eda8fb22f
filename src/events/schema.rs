//! Payload schemas keyed by event group or metadata name
//!
//! Each schema is a plain decode function over a bounded [`BitCursor`].
//! Lookup is total: names without a schema fall through to
//! [`EventKind::Unknown`] in the decoder, never to an error. Decoders read
//! only the fields they know about, so trailing fields added by newer game
//! versions are ignored.

use crate::cursor::BitCursor;
use crate::error::Result;
use crate::events::types::{Elimination, EventKind, MatchStats, PlayerId, TeamStats};
use crate::header::{GameHeader, Release};

/// Group name of elimination events
pub const PLAYER_ELIMINATION: &str = "playerElim";
/// Metadata name of the recording player's stats
pub const MATCH_STATS: &str = "AthenaMatchStats";
/// Metadata name of the recording team's placement
pub const TEAM_STATS: &str = "AthenaMatchTeamStats";

/// Player identity tags used by the modern elimination layout
mod player_tag {
    pub const BOT: u8 = 0x03;
    pub const NAMED: u8 = 0x10;
    pub const ACCOUNT: u8 = 0x11;
}

/// Field of the framing a schema is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKey {
    Group(&'static str),
    Metadata(&'static str),
}

impl SchemaKey {
    fn matches(&self, group: &str, metadata: &str) -> bool {
        match self {
            SchemaKey::Group(name) => *name == group,
            SchemaKey::Metadata(name) => *name == metadata,
        }
    }
}

/// Decode a payload into one event variant
pub type DecodeFn = fn(&mut BitCursor<'_>, &DecodeContext) -> Result<EventKind>;

pub struct Schema {
    pub name: &'static str,
    pub key: SchemaKey,
    pub decode: DecodeFn,
}

/// Known schemas, checked in order
pub static SCHEMAS: &[Schema] = &[
    Schema {
        name: "elimination",
        key: SchemaKey::Group(PLAYER_ELIMINATION),
        decode: decode_elimination,
    },
    Schema {
        name: "match-stats",
        key: SchemaKey::Metadata(MATCH_STATS),
        decode: decode_match_stats,
    },
    Schema {
        name: "team-stats",
        key: SchemaKey::Metadata(TEAM_STATS),
        decode: decode_team_stats,
    },
];

/// Find the schema for a record's group/metadata pair
pub fn lookup(group: &str, metadata: &str) -> Option<&'static Schema> {
    SCHEMAS
        .iter()
        .find(|schema| schema.key.matches(group, metadata))
}

/// Elimination payload layout, which changed across game releases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EliminationLayout {
    /// Season 9 onwards: 85-byte preamble, tagged player identities
    Modern,
    /// Earlier releases: a release-specific preamble, then two name strings
    Legacy { preamble: usize },
}

impl EliminationLayout {
    pub const MODERN_PREAMBLE: usize = 85;

    /// Pick the layout for a replay; without a game header the newest is used
    ///
    /// A branch that does not name a release is treated like `Main`.
    pub fn for_game(game: Option<&GameHeader>) -> Self {
        let Some(game) = game else {
            return EliminationLayout::Modern;
        };
        let release = game.release().unwrap_or(Release::MAIN);

        if game.engine_network_version >= 11 && release.major >= 9 {
            return EliminationLayout::Modern;
        }

        let preamble = if release < Release::new(4, 2) {
            12
        } else if release == Release::new(4, 2) {
            40
        } else {
            45
        };
        EliminationLayout::Legacy { preamble }
    }
}

/// Per-replay state the schema decoders need
#[derive(Debug, Clone)]
pub struct DecodeContext {
    pub layout: EliminationLayout,
    /// Start time of the record being decoded, from the framing
    pub start_ms: u32,
}

impl DecodeContext {
    pub fn new(layout: EliminationLayout) -> Self {
        Self {
            layout,
            start_ms: 0,
        }
    }
}

fn decode_elimination(cursor: &mut BitCursor<'_>, ctx: &DecodeContext) -> Result<EventKind> {
    let (eliminated, eliminator) = match ctx.layout {
        EliminationLayout::Modern => {
            cursor.skip_bytes(EliminationLayout::MODERN_PREAMBLE)?;
            (read_player(cursor)?, read_player(cursor)?)
        }
        EliminationLayout::Legacy { preamble } => {
            cursor.skip_bytes(preamble)?;
            (read_player_name(cursor)?, read_player_name(cursor)?)
        }
    };
    let gun_type = cursor.read_u8()?;
    let knocked = cursor.read_bool()?;

    Ok(EventKind::Elimination(Elimination {
        eliminated,
        eliminator,
        gun_type,
        knocked,
        timestamp: ctx.start_ms,
    }))
}

fn read_player(cursor: &mut BitCursor<'_>) -> Result<PlayerId> {
    let tag = cursor.read_u8()?;
    match tag {
        player_tag::BOT => Ok(PlayerId::Bot),
        player_tag::NAMED => Ok(PlayerId::Name(cursor.read_fstring()?)),
        _ => {
            let size = cursor.read_u8()? as usize;
            let id = cursor.read_bytes(size)?;
            if tag != player_tag::ACCOUNT || id.is_empty() {
                return Ok(PlayerId::Unresolved(tag));
            }
            Ok(PlayerId::Guid(
                id.iter().map(|b| format!("{:02X}", b)).collect(),
            ))
        }
    }
}

fn read_player_name(cursor: &mut BitCursor<'_>) -> Result<PlayerId> {
    let name = cursor.read_fstring()?;
    if name.is_empty() {
        return Ok(PlayerId::Unresolved(0));
    }
    Ok(PlayerId::Name(name))
}

fn decode_match_stats(cursor: &mut BitCursor<'_>, _ctx: &DecodeContext) -> Result<EventKind> {
    let _unknown = cursor.read_u32()?;
    Ok(EventKind::MatchStats(MatchStats {
        accuracy: cursor.read_f32()?,
        assists: cursor.read_u32()?,
        eliminations: cursor.read_u32()?,
        weapon_damage: cursor.read_u32()?,
        other_damage: cursor.read_u32()?,
        revives: cursor.read_u32()?,
        damage_taken: cursor.read_u32()?,
        damage_structures: cursor.read_u32()?,
        materials_gathered: cursor.read_u32()?,
        materials_used: cursor.read_u32()?,
        total_traveled: cursor.read_u32()?,
    }))
}

fn decode_team_stats(cursor: &mut BitCursor<'_>, _ctx: &DecodeContext) -> Result<EventKind> {
    Ok(EventKind::TeamStats(TeamStats {
        team_id: cursor.read_u32()?,
        placement: cursor.read_u32()?,
        player_count: cursor.read_u32()?,
    }))
}
