//! Fold classified events into match results

use std::collections::BTreeMap;

use crate::diagnostics::Diagnostics;
use crate::events::{Elimination, Event, EventKind, MatchStats, TeamStats};

/// Accumulates events in encounter order
///
/// Stats snapshots are cumulative, so for both overall stats and each team
/// the record with the latest start time wins; on equal start times the one
/// encountered last wins.
#[derive(Debug, Default)]
pub struct Extractor {
    eliminations: Vec<Elimination>,
    stats: Option<(u32, MatchStats)>,
    team_stats: BTreeMap<u32, (u32, TeamStats)>,
}

/// Final output of an [`Extractor`]
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub eliminations: Vec<Elimination>,
    pub stats: Option<MatchStats>,
    pub team_stats: BTreeMap<u32, TeamStats>,
}

impl Extractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Event, diagnostics: &mut Diagnostics) {
        match event.kind {
            EventKind::Elimination(elim) => self.eliminations.push(elim),
            EventKind::MatchStats(stats) => {
                if newer_or_equal(self.stats.as_ref().map(|(t, _)| *t), event.start_ms) {
                    self.stats = Some((event.start_ms, stats));
                }
            }
            EventKind::TeamStats(team) => {
                let current = self.team_stats.get(&team.team_id).map(|(t, _)| *t);
                if newer_or_equal(current, event.start_ms) {
                    self.team_stats.insert(team.team_id, (event.start_ms, team));
                }
            }
            EventKind::Unknown(unknown) => {
                if let Some(error) = &unknown.error {
                    diagnostics.failed_records += 1;
                    diagnostics.warn(format!(
                        "record '{}' ({}/{}) at {} ms failed to decode: {}",
                        event.id, event.group, event.metadata, event.start_ms, error
                    ));
                } else {
                    diagnostics.unknown_records += 1;
                }
            }
        }
    }

    pub fn finish(self) -> Extracted {
        let mut eliminations = self.eliminations;
        // sort_by_key is stable: equal timestamps keep encounter order
        eliminations.sort_by_key(|elim| elim.timestamp);

        Extracted {
            eliminations,
            stats: self.stats.map(|(_, stats)| stats),
            team_stats: self
                .team_stats
                .into_iter()
                .map(|(id, (_, team))| (id, team))
                .collect(),
        }
    }
}

fn newer_or_equal(current: Option<u32>, candidate: u32) -> bool {
    current.map_or(true, |current| candidate >= current)
}
