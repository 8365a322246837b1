use crate::units::{WeightUnit, convert};

pub const KG_PLATES: [f64; 7] = [25.0, 20.0, 15.0, 10.0, 5.0, 2.5, 1.25];
pub const LBS_PLATES: [f64; 6] = [45.0, 35.0, 25.0, 10.0, 5.0, 2.5];

/// Standard bar weight for a unit: 20 kg or 45 lbs.
pub fn default_bar(unit: WeightUnit) -> f64 {
    match unit {
        WeightUnit::Kg => 20.0,
        WeightUnit::Lbs => 45.0,
    }
}

pub fn available_plates(unit: WeightUnit) -> &'static [f64] {
    match unit {
        WeightUnit::Kg => &KG_PLATES,
        WeightUnit::Lbs => &LBS_PLATES,
    }
}

/// How many plates of one size go on each side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlateCount {
    pub plate: f64,
    pub count: u64,
}

/// Plates to load on each side of the bar, heaviest first.
///
/// Returns an empty list when the target is lighter than the bar. Any
/// remainder smaller than the lightest plate is left unloaded.
pub fn plates_per_side(target: f64, bar: f64, unit: WeightUnit) -> Vec<PlateCount> {
    if !target.is_finite() || target < bar {
        return Vec::new();
    }
    let mut remaining = (target - bar) / 2.0;
    let mut plates = Vec::new();
    for &plate in available_plates(unit) {
        let count = (remaining / plate).floor();
        if count >= 1.0 {
            remaining -= count * plate;
            plates.push(PlateCount {
                plate,
                count: count as u64,
            });
        }
    }
    plates
}

/// Plate breakdown for a weight recorded in another unit, loaded on a bar of
/// the display unit.
pub fn plates_for_recorded(
    value: f64,
    recorded: WeightUnit,
    display: WeightUnit,
) -> Vec<PlateCount> {
    plates_per_side(convert(value, recorded, display), default_bar(display), display)
}

/// Total weight on the bar for a given plate list.
pub fn loaded_total(plates_per_side: &[PlateCount], bar: f64) -> f64 {
    bar + 2.0 * plates_per_side.iter().map(|p| p.plate * p.count as f64).sum::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pc(plate: f64, count: u64) -> PlateCount {
        PlateCount { plate, count }
    }

    #[test]
    fn kg_breakdown() {
        assert_eq!(plates_per_side(100.0, 20.0, WeightUnit::Kg), vec![pc(25.0, 1), pc(15.0, 1)]);
        assert_eq!(plates_per_side(62.5, 20.0, WeightUnit::Kg), vec![pc(20.0, 1), pc(1.25, 1)]);
        assert_eq!(plates_per_side(220.0, 20.0, WeightUnit::Kg), vec![pc(25.0, 4)]);
    }

    #[test]
    fn lbs_breakdown() {
        assert_eq!(plates_per_side(225.0, 45.0, WeightUnit::Lbs), vec![pc(45.0, 2)]);
        assert_eq!(plates_per_side(185.0, 45.0, WeightUnit::Lbs), vec![pc(45.0, 1), pc(25.0, 1)]);
    }

    #[test]
    fn lighter_than_bar_is_empty() {
        assert!(plates_per_side(15.0, 20.0, WeightUnit::Kg).is_empty());
        assert!(plates_per_side(f64::NAN, 20.0, WeightUnit::Kg).is_empty());
        assert!(plates_per_side(20.0, 20.0, WeightUnit::Kg).is_empty());
    }

    #[test]
    fn huge_targets_stay_one_entry_per_plate_size() {
        let plates = plates_per_side(1e12, 20.0, WeightUnit::Kg);
        assert!(plates.len() <= KG_PLATES.len());
        assert_eq!(plates[0].plate, 25.0);
        assert_eq!(plates[0].count, 19_999_999_999);
    }

    #[test]
    fn converts_recorded_weight_before_loading() {
        // 100 kg is about 220.5 lbs: 45 + 2 * (45 + 35 + 5 + 2.5)
        let plates = plates_for_recorded(100.0, WeightUnit::Kg, WeightUnit::Lbs);
        assert_eq!(plates, vec![pc(45.0, 1), pc(35.0, 1), pc(5.0, 1), pc(2.5, 1)]);
        assert_eq!(loaded_total(&plates, 45.0), 220.0);
    }
}
