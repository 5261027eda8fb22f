//! Event and checkpoint record decoding

pub mod decoder;
pub mod schema;
pub mod types;

pub use decoder::{read_records, EventDecoder};
pub use schema::{DecodeContext, EliminationLayout, Schema, SchemaKey};
pub use types::{
    Elimination, Event, EventKind, EventRecord, MatchStats, PlayerId, TeamStats, UnknownEvent,
    Weapon,
};
