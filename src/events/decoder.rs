//! Event framing and payload classification
//!
//! Event and checkpoint chunks hold a run of byte-aligned sub-records:
//!
//! | Field    | Type    |
//! |----------|---------|
//! | id       | FString |
//! | group    | FString |
//! | metadata | FString |
//! | start_ms | u32     |
//! | end_ms   | u32     |
//! | size     | u32     |
//! | payload  | size    |
//!
//! The framing is read with a [`ByteCursor`]; each payload is then decoded
//! through a [`BitCursor`] bounded to `size` bytes.

use std::borrow::Cow;

use crate::crypto;
use crate::cursor::{BitCursor, ByteCursor};
use crate::error::{Error, Result};
use crate::events::schema::{self, DecodeContext, EliminationLayout};
use crate::events::types::{Event, EventKind, EventRecord, UnknownEvent};
use crate::header::{GameHeader, ReplayHeader};

/// Split a chunk payload into framed records
///
/// Returns every record framed before the first failure, together with that
/// failure. A framing error never affects records already returned.
pub fn read_records(payload: &[u8]) -> (Vec<EventRecord<'_>>, Option<Error>) {
    let mut cursor = ByteCursor::new(payload);
    let mut records = Vec::new();

    while !cursor.is_at_end() {
        match read_record(&mut cursor) {
            Ok(record) => records.push(record),
            Err(e) => return (records, Some(e)),
        }
    }

    (records, None)
}

fn read_record<'a>(cursor: &mut ByteCursor<'a>) -> Result<EventRecord<'a>> {
    let id = cursor.read_fstring()?;
    let group = cursor.read_fstring()?;
    let metadata = cursor.read_fstring()?;
    let start_ms = cursor.read_u32()?;
    let end_ms = cursor.read_u32()?;
    let size = cursor.read_u32()? as usize;
    let payload = cursor.read_slice(size)?;

    Ok(EventRecord {
        id,
        group,
        metadata,
        start_ms,
        end_ms,
        payload,
    })
}

/// Classifies framed records for one replay
pub struct EventDecoder<'h> {
    key: Option<&'h [u8]>,
    layout: EliminationLayout,
}

impl<'h> EventDecoder<'h> {
    pub fn new(header: &'h ReplayHeader, game: Option<&GameHeader>) -> Self {
        Self {
            key: header
                .is_encrypted()
                .then_some(header.encryption_key.as_slice()),
            layout: EliminationLayout::for_game(game),
        }
    }

    pub fn layout(&self) -> EliminationLayout {
        self.layout
    }

    /// Classify a record; never fails, falling back to [`EventKind::Unknown`]
    pub fn decode(&self, record: &EventRecord<'_>) -> Event {
        Event {
            id: record.id.clone(),
            group: record.group.clone(),
            metadata: record.metadata.clone(),
            start_ms: record.start_ms,
            end_ms: record.end_ms,
            kind: self.classify(record),
        }
    }

    fn classify(&self, record: &EventRecord<'_>) -> EventKind {
        let payload: Cow<'_, [u8]> = match self.key {
            Some(key) => match crypto::decrypt_aes_ecb(key, record.payload) {
                Ok(plain) => Cow::Owned(plain),
                Err(e) => {
                    return EventKind::Unknown(UnknownEvent::failed(record.payload.to_vec(), e))
                }
            },
            None => Cow::Borrowed(record.payload),
        };

        let Some(schema) = schema::lookup(&record.group, &record.metadata) else {
            return EventKind::Unknown(UnknownEvent::unrecognised(payload.into_owned()));
        };

        let ctx = DecodeContext {
            layout: self.layout,
            start_ms: record.start_ms,
        };
        let mut root = BitCursor::new(&payload);
        let result = root
            .with_limit(payload.len() * 8)
            .and_then(|mut cursor| (schema.decode)(&mut cursor, &ctx));

        match result {
            Ok(kind) => kind,
            Err(e) => {
                let error = format!("{} payload: {}", schema.name, e);
                EventKind::Unknown(UnknownEvent::failed(payload.into_owned(), error))
            }
        }
    }
}
