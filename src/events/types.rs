//! Event records and their classified forms

use std::fmt;

use serde::Serialize;

/// A framed event sub-record as it appears inside an event or checkpoint chunk
///
/// The payload still borrows the chunk it came from; classification copies
/// out only the typed fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord<'a> {
    pub id: String,
    pub group: String,
    pub metadata: String,
    pub start_ms: u32,
    pub end_ms: u32,
    pub payload: &'a [u8],
}

/// A classified event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub id: String,
    pub group: String,
    pub metadata: String,
    pub start_ms: u32,
    pub end_ms: u32,
    pub kind: EventKind,
}

/// Every record maps to exactly one of these
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum EventKind {
    Elimination(Elimination),
    MatchStats(MatchStats),
    TeamStats(TeamStats),
    Unknown(UnknownEvent),
}

/// A record with no known schema, or whose payload failed to decode
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnknownEvent {
    #[serde(skip)]
    pub raw: Vec<u8>,
    /// Set when a known schema matched but decoding the payload failed
    pub error: Option<String>,
}

impl UnknownEvent {
    pub fn unrecognised(raw: Vec<u8>) -> Self {
        Self { raw, error: None }
    }

    pub fn failed(raw: Vec<u8>, error: impl fmt::Display) -> Self {
        Self {
            raw,
            error: Some(error.to_string()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Identity of a player in an elimination
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum PlayerId {
    /// Anonymous AI player
    Bot,
    /// Display name (named bots, and players in older releases)
    Name(String),
    /// Epic account id, upper-case hex
    Guid(String),
    /// The identity could not be resolved; carries the tag byte seen
    Unresolved(u8),
}

impl PlayerId {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, PlayerId::Unresolved(_))
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerId::Bot => write!(f, "Bot"),
            PlayerId::Name(name) => write!(f, "{}", name),
            PlayerId::Guid(id) => write!(f, "{}", id),
            PlayerId::Unresolved(tag) => write!(f, "<unresolved 0x{:02X}>", tag),
        }
    }
}

/// Cause of an elimination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Weapon {
    Storm,
    Fall,
    Pistol,
    Shotgun,
    AssaultRifle,
    Smg,
    Sniper,
    Pickaxe,
    Grenade,
    GrenadeLauncher,
    RocketLauncher,
    Minigun,
    Bow,
    Trap,
    FinallyEliminated,
    GasGrenade,
    TeamSwitch,
    Unknown(u8),
}

impl From<u8> for Weapon {
    fn from(value: u8) -> Self {
        match value {
            0 => Weapon::Storm,
            1 => Weapon::Fall,
            2 => Weapon::Pistol,
            3 => Weapon::Shotgun,
            4 => Weapon::AssaultRifle,
            5 => Weapon::Smg,
            6 => Weapon::Sniper,
            7 => Weapon::Pickaxe,
            8 => Weapon::Grenade,
            10 => Weapon::GrenadeLauncher,
            11 => Weapon::RocketLauncher,
            12 => Weapon::Minigun,
            13 => Weapon::Bow,
            14 => Weapon::Trap,
            15 => Weapon::FinallyEliminated,
            23 => Weapon::GasGrenade,
            26 => Weapon::TeamSwitch,
            other => Weapon::Unknown(other),
        }
    }
}

/// A player being knocked or eliminated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Elimination {
    pub eliminated: PlayerId,
    pub eliminator: PlayerId,
    pub gun_type: u8,
    pub knocked: bool,
    /// Milliseconds since the start of the recording
    pub timestamp: u32,
}

impl Elimination {
    pub fn weapon(&self) -> Weapon {
        Weapon::from(self.gun_type)
    }
}

impl fmt::Display for Elimination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} got {} by {} with {:?}",
            self.eliminated,
            if self.knocked { "knocked" } else { "eliminated" },
            self.eliminator,
            self.weapon()
        )
    }
}

/// End-of-match stats of the recording player
///
/// The format emits cumulative snapshots, never deltas.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchStats {
    /// Hit ratio, 0.0..=1.0
    pub accuracy: f32,
    pub assists: u32,
    pub eliminations: u32,
    pub weapon_damage: u32,
    pub other_damage: u32,
    pub revives: u32,
    pub damage_taken: u32,
    pub damage_structures: u32,
    pub materials_gathered: u32,
    pub materials_used: u32,
    /// Centimetres
    pub total_traveled: u32,
}

// Accuracy compares by bit pattern so a NaN snapshot equals itself
impl PartialEq for MatchStats {
    fn eq(&self, other: &Self) -> bool {
        self.accuracy.to_bits() == other.accuracy.to_bits()
            && self.assists == other.assists
            && self.eliminations == other.eliminations
            && self.weapon_damage == other.weapon_damage
            && self.other_damage == other.other_damage
            && self.revives == other.revives
            && self.damage_taken == other.damage_taken
            && self.damage_structures == other.damage_structures
            && self.materials_gathered == other.materials_gathered
            && self.materials_used == other.materials_used
            && self.total_traveled == other.total_traveled
    }
}

impl Eq for MatchStats {}

impl MatchStats {
    /// Accuracy as a whole percentage, truncated
    pub fn accuracy_percent(&self) -> u32 {
        (self.accuracy * 100.0) as u32
    }

    /// Distance travelled in kilometres, rounded
    pub fn total_traveled_km(&self) -> u32 {
        (self.total_traveled as f64 / 100_000.0).round() as u32
    }
}

/// Placement of a team at the end of the match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TeamStats {
    pub team_id: u32,
    pub placement: u32,
    pub player_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weapon_from() {
        assert_eq!(Weapon::from(0), Weapon::Storm);
        assert_eq!(Weapon::from(3), Weapon::Shotgun);
        assert_eq!(Weapon::from(26), Weapon::TeamSwitch);
        assert_eq!(Weapon::from(9), Weapon::Unknown(9));
        assert_eq!(Weapon::from(200), Weapon::Unknown(200));
    }

    #[test]
    fn test_elimination_display() {
        let elim = Elimination {
            eliminated: PlayerId::Name("Alice".into()),
            eliminator: PlayerId::Bot,
            gun_type: 3,
            knocked: true,
            timestamp: 1000,
        };
        assert_eq!(elim.to_string(), "Alice got knocked by Bot with Shotgun");
    }

    #[test]
    fn test_player_id_resolution() {
        assert!(PlayerId::Bot.is_resolved());
        assert!(PlayerId::Guid("ABCD".into()).is_resolved());
        assert!(!PlayerId::Unresolved(0x42).is_resolved());
        assert_eq!(PlayerId::Unresolved(0x42).to_string(), "<unresolved 0x42>");
    }

    #[test]
    fn test_match_stats_conversions() {
        let stats = MatchStats {
            accuracy: 0.2256,
            total_traveled: 412_345,
            ..Default::default()
        };
        assert_eq!(stats.accuracy_percent(), 22);
        assert_eq!(stats.total_traveled_km(), 4);
    }

    #[test]
    fn test_match_stats_nan_accuracy_equals_itself() {
        let stats = MatchStats {
            accuracy: f32::NAN,
            eliminations: 2,
            ..Default::default()
        };
        assert_eq!(stats, stats.clone());
        assert_ne!(
            stats,
            MatchStats {
                accuracy: 0.5,
                eliminations: 2,
                ..Default::default()
            }
        );
    }
}
