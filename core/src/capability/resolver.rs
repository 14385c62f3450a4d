//! Version-ladder policy for platform capability aliases.
//!
//! The ladder is a table of API-level floors, highest first. A level matches
//! the first row whose floor it reaches, so every level maps to exactly one
//! row and the decision stays exhaustive.

use super::{ApiLevel, CapabilityAlias, CapabilityCategory};

use CapabilityAlias::{BluetoothLegacy, BluetoothNearby, Location, LocationCoarse};

/// One row of the ladder.
struct Rung {
    floor: ApiLevel,
    default_set: &'static [CapabilityAlias],
    bluetooth: &'static [CapabilityAlias],
    location: &'static [CapabilityAlias],
}

const LADDER: &[Rung] = &[
    Rung {
        floor: ApiLevel::TIRAMISU,
        default_set: &[BluetoothNearby],
        bluetooth: &[BluetoothNearby],
        location: &[Location],
    },
    Rung {
        floor: ApiLevel::S,
        default_set: &[BluetoothNearby, Location],
        bluetooth: &[BluetoothNearby],
        location: &[Location],
    },
    Rung {
        floor: ApiLevel::Q,
        default_set: &[BluetoothLegacy, Location],
        bluetooth: &[BluetoothLegacy],
        location: &[Location],
    },
    Rung {
        floor: ApiLevel(0),
        default_set: &[BluetoothLegacy, LocationCoarse],
        bluetooth: &[BluetoothLegacy],
        location: &[LocationCoarse],
    },
];

fn rung(level: ApiLevel) -> &'static Rung {
    // The last rung has a zero floor, so the search always succeeds.
    LADDER
        .iter()
        .find(|r| level >= r.floor)
        .unwrap_or(&LADDER[LADDER.len() - 1])
}

/// Aliases needed for baseline operation at `level`.
pub fn default_aliases(level: ApiLevel) -> &'static [CapabilityAlias] {
    rung(level).default_set
}

/// Aliases needed for an explicitly requested category at `level`.
pub fn aliases_for(level: ApiLevel, category: CapabilityCategory) -> &'static [CapabilityAlias] {
    let rung = rung(level);
    match category {
        CapabilityCategory::Bluetooth => rung.bluetooth,
        CapabilityCategory::Location => rung.location,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ladder_is_sorted_and_terminated() {
        for pair in LADDER.windows(2) {
            assert!(pair[0].floor > pair[1].floor);
        }
        assert_eq!(LADDER.last().map(|r| r.floor), Some(ApiLevel(0)));
    }

    #[test]
    fn test_default_sets() {
        assert_eq!(default_aliases(ApiLevel(34)), &[BluetoothNearby]);
        assert_eq!(default_aliases(ApiLevel::TIRAMISU), &[BluetoothNearby]);
        assert_eq!(default_aliases(ApiLevel(32)), &[BluetoothNearby, Location]);
        assert_eq!(default_aliases(ApiLevel::S), &[BluetoothNearby, Location]);
        assert_eq!(default_aliases(ApiLevel(30)), &[BluetoothLegacy, Location]);
        assert_eq!(default_aliases(ApiLevel::Q), &[BluetoothLegacy, Location]);
        assert_eq!(default_aliases(ApiLevel(28)), &[BluetoothLegacy, LocationCoarse]);
        assert_eq!(default_aliases(ApiLevel(0)), &[BluetoothLegacy, LocationCoarse]);
    }

    #[test]
    fn test_bluetooth_category() {
        assert_eq!(aliases_for(ApiLevel(28), CapabilityCategory::Bluetooth), &[BluetoothLegacy]);
        assert_eq!(aliases_for(ApiLevel(29), CapabilityCategory::Bluetooth), &[BluetoothLegacy]);
        assert_eq!(aliases_for(ApiLevel(31), CapabilityCategory::Bluetooth), &[BluetoothNearby]);
        assert_eq!(aliases_for(ApiLevel(33), CapabilityCategory::Bluetooth), &[BluetoothNearby]);
    }

    #[test]
    fn test_location_category() {
        assert_eq!(aliases_for(ApiLevel(28), CapabilityCategory::Location), &[LocationCoarse]);
        assert_eq!(aliases_for(ApiLevel(29), CapabilityCategory::Location), &[Location]);
        assert_eq!(aliases_for(ApiLevel(33), CapabilityCategory::Location), &[Location]);
    }

    #[test]
    fn test_every_level_requests_bluetooth() {
        for level in 0..=40 {
            let set = default_aliases(ApiLevel(level));
            assert!(set.iter().any(|a| a.is_bluetooth()), "level {level}");
        }
    }

    #[test]
    fn test_resolution_is_deterministic() {
        for level in 0..=40 {
            assert_eq!(default_aliases(ApiLevel(level)), default_aliases(ApiLevel(level)));
        }
    }
}
