// Apartment progress roll-ups and the project-wide blend.
//
// Apartment activities are fractions; every figure that leaves this module is
// a percentage on a 0–100 scale. Empty scopes produce zeros, never NaN.
use crate::types::{ApartmentRecord, Filters, LcrgRow};
use crate::util::average;
use crate::weights::{apartment_weights, Boost, ACTIVITY_COLS, FINISHES_SHARE, STRUCTURE_SHARE, TOWER_BLEND};
use std::collections::BTreeMap;

/// Weighted completion of one set of activity fractions, as a percentage.
pub fn compute_overall(activities: &[f64; 12]) -> f64 {
    let weights = apartment_weights();
    weights.weighted_sum(|name| {
        ACTIVITY_COLS
            .iter()
            .position(|a| *a == name)
            .map(|i| activities[i])
            .unwrap_or(0.0)
    }) * 100.0
}

/// Per-activity mean over a set of apartments (all zeros for an empty set).
pub fn mean_activities<'a, I>(records: I) -> [f64; 12]
where
    I: IntoIterator<Item = &'a ApartmentRecord>,
{
    let mut sums = [0.0; 12];
    let mut count = 0usize;
    for r in records {
        for (s, v) in sums.iter_mut().zip(r.activities.iter()) {
            *s += v;
        }
        count += 1;
    }
    if count > 0 {
        for s in sums.iter_mut() {
            *s /= count as f64;
        }
    }
    sums
}

/// Progress of the three towers in one domain.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TowerProgress {
    pub i: f64,
    pub l1: f64,
    pub l2: f64,
}

impl TowerProgress {
    /// Build from a per-tower lookup; towers that are not present count as 0.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<f64>,
    {
        let get = |t: &str| lookup(t).filter(|v| v.is_finite()).unwrap_or(0.0);
        Self {
            i: get("I"),
            l1: get("L1"),
            l2: get("L2"),
        }
    }

    pub fn get(&self, tower: &str) -> f64 {
        match tower {
            "I" => self.i,
            "L1" => self.l1,
            "L2" => self.l2,
            _ => 0.0,
        }
    }

    /// `0.40×I + 0.30×L1 + 0.30×L2`.
    pub fn project(&self) -> f64 {
        TOWER_BLEND.iter().map(|(t, w)| self.get(t) * w).sum()
    }
}

pub fn project_blend(i: f64, l1: f64, l2: f64) -> f64 {
    TowerProgress { i, l1, l2 }.project()
}

#[derive(Debug, Clone, PartialEq)]
pub struct TowerSummary {
    pub tower: String,
    pub activities: [f64; 12],
    pub overall: f64,
}

/// One row per tower: mean activity fractions and the boosted weighted overall.
pub fn tower_summary(records: &[ApartmentRecord], boost: Boost) -> Vec<TowerSummary> {
    let mut by_tower: BTreeMap<&str, Vec<&ApartmentRecord>> = BTreeMap::new();
    for r in records {
        by_tower.entry(r.tower.as_str()).or_default().push(r);
    }
    by_tower
        .into_iter()
        .map(|(tower, rs)| {
            let activities = mean_activities(rs);
            TowerSummary {
                tower: tower.to_string(),
                overall: boost.apply(compute_overall(&activities)),
                activities,
            }
        })
        .collect()
}

pub fn apartment_tower_progress(summary: &[TowerSummary]) -> TowerProgress {
    TowerProgress::from_lookup(|t| summary.iter().find(|s| s.tower == t).map(|s| s.overall))
}

#[derive(Debug, Clone, PartialEq)]
pub struct FloorSummary {
    pub tower: String,
    pub floor: i32,
    pub activities: [f64; 12],
    pub overall: f64,
}

/// One row per (tower, floor) within the tower/floor filters. No boost.
pub fn floor_summary(records: &[ApartmentRecord], filters: &Filters) -> Vec<FloorSummary> {
    let mut groups: BTreeMap<(&str, i32), Vec<&ApartmentRecord>> = BTreeMap::new();
    for r in records {
        if filters.tower.as_deref().map_or(false, |t| r.tower != t) {
            continue;
        }
        if filters.floor.map_or(false, |f| r.floor != f) {
            continue;
        }
        groups.entry((r.tower.as_str(), r.floor)).or_default().push(r);
    }
    groups
        .into_iter()
        .map(|((tower, floor), rs)| {
            let activities = mean_activities(rs);
            FloorSummary {
                tower: tower.to_string(),
                floor,
                overall: compute_overall(&activities),
                activities,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityComparison {
    pub activity: String,
    pub apartment: f64,
    pub floor: f64,
    pub tower: f64,
}

/// Everything the apartment view shows for the first apartment in scope.
#[derive(Debug, Clone, PartialEq)]
pub struct ApartmentDetail {
    pub record: ApartmentRecord,
    pub overall: f64,
    pub floor_overall: f64,
    pub tower_overall: f64,
    pub activities: Vec<ActivityComparison>,
}

pub fn apartment_detail(
    records: &[ApartmentRecord],
    filters: &Filters,
    tower_boost: Boost,
) -> Option<ApartmentDetail> {
    let record = records.iter().find(|r| filters.matches(r))?.clone();
    let floor_scope: Vec<&ApartmentRecord> = records
        .iter()
        .filter(|r| r.tower == record.tower && r.floor == record.floor)
        .collect();
    let tower_scope: Vec<&ApartmentRecord> =
        records.iter().filter(|r| r.tower == record.tower).collect();

    let floor_means = mean_activities(floor_scope.iter().copied());
    let tower_means = mean_activities(tower_scope.iter().copied());

    let activities = ACTIVITY_COLS
        .iter()
        .enumerate()
        .filter(|(_, a)| filters.matches_activity(a))
        .map(|(i, a)| ActivityComparison {
            activity: a.to_string(),
            apartment: record.activities[i] * 100.0,
            floor: floor_means[i] * 100.0,
            tower: tower_means[i] * 100.0,
        })
        .collect();

    Some(ApartmentDetail {
        overall: compute_overall(&record.activities),
        floor_overall: compute_overall(&floor_means),
        tower_overall: tower_boost.apply(compute_overall(&tower_means)),
        activities,
        record,
    })
}

/// The LCRG landing figure.
///
/// With Structure/Finishes columns on the LCRG rows the figure is the boosted
/// 40/60 blend; otherwise it is the mean of those rows' own progress.
#[derive(Debug, Clone, PartialEq)]
pub struct LcrgLanding {
    pub overall: f64,
    pub blended: bool,
}

pub fn structure_finishes_blend(structure: f64, finishes: f64, boost: Boost) -> f64 {
    boost.apply(structure * STRUCTURE_SHARE + finishes * FINISHES_SHARE)
}

pub fn lcrg_landing(rows: &[LcrgRow], boost: Boost) -> LcrgLanding {
    let lcrg: Vec<&LcrgRow> = rows.iter().filter(|r| r.is_lcrg()).collect();
    let blends: Vec<f64> = lcrg
        .iter()
        .filter_map(|r| match (r.structure, r.finishes) {
            (Some(s), Some(f)) => Some(structure_finishes_blend(s, f, boost)),
            _ => None,
        })
        .collect();
    if !blends.is_empty() {
        return LcrgLanding {
            overall: average(&blends),
            blended: true,
        };
    }
    let progress: Vec<f64> = lcrg.iter().map(|r| r.progress).collect();
    LcrgLanding {
        overall: average(&progress),
        blended: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weights::{Boost, TOWER_SUMMARY_BOOST};

    fn apt(tower: &str, no: i64, floor: i32, values: &[(&str, f64)]) -> ApartmentRecord {
        let mut activities = [0.0; 12];
        for (name, v) in values {
            let i = ACTIVITY_COLS.iter().position(|a| a == name).unwrap();
            activities[i] = *v;
        }
        ApartmentRecord {
            tower: tower.to_string(),
            apartment_no: no,
            floor,
            activities,
        }
    }

    #[test]
    fn overall_for_mep_and_ceiling() {
        let r = apt("I", 101, 1, &[("MEP Work", 0.5), ("Ceiling", 1.0)]);
        assert!((compute_overall(&r.activities) - 21.0).abs() < 1e-9);
    }

    #[test]
    fn overall_is_bounded() {
        assert_eq!(compute_overall(&[0.0; 12]), 0.0);
        assert!((compute_overall(&[1.0; 12]) - 100.0).abs() < 1e-9);
        let half = compute_overall(&[0.5; 12]);
        assert!((half - 50.0).abs() < 1e-9);
    }

    #[test]
    fn blend_is_exact() {
        assert!((project_blend(80.0, 50.0, 20.0) - (32.0 + 15.0 + 6.0)).abs() < 1e-9);
        assert_eq!(project_blend(0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn empty_scope_is_zero() {
        assert_eq!(mean_activities(std::iter::empty()), [0.0; 12]);
        assert!(tower_summary(&[], TOWER_SUMMARY_BOOST).is_empty());
        assert_eq!(apartment_tower_progress(&[]).project(), 0.0);
        assert!(apartment_detail(&[], &Filters::default(), Boost::NONE).is_none());
        let landing = lcrg_landing(&[], Boost::NONE);
        assert_eq!(landing.overall, 0.0);
        assert!(!landing.overall.is_nan());
    }

    #[test]
    fn tower_summary_applies_boost_and_cap() {
        let records = vec![
            apt("I", 101, 1, &[("Tile Work", 1.0)]),
            apt("I", 102, 1, &[("Tile Work", 0.0)]),
            apt("L1", 201, 2, &[("MEP Work", 1.0), ("Ceiling", 1.0), ("Tile Work", 1.0), ("Paint Work", 1.0), ("Aluminum Work", 1.0), ("Wood Work", 1.0)]),
        ];
        let summary = tower_summary(&records, TOWER_SUMMARY_BOOST);
        assert_eq!(summary.len(), 2);
        // 0.5 × 0.22 × 100 = 11, × 1.13
        assert!((summary[0].overall - 12.43).abs() < 1e-9);
        // 89% raw, boosted past 100 and capped
        assert_eq!(summary[1].overall, 100.0);
        let towers = apartment_tower_progress(&summary);
        assert_eq!(towers.l2, 0.0);
        assert!((towers.project() - (12.43 * 0.4 + 30.0)).abs() < 1e-9);
    }

    #[test]
    fn detail_compares_apartment_floor_and_tower() {
        let records = vec![
            apt("I", 101, 1, &[("MEP Work", 1.0)]),
            apt("I", 102, 1, &[("MEP Work", 0.0)]),
            apt("I", 201, 2, &[("MEP Work", 0.5)]),
        ];
        let filters = Filters {
            apartment: Some(101),
            activity: Some("mep".into()),
            ..Filters::default()
        };
        let d = apartment_detail(&records, &filters, Boost::NONE).unwrap();
        assert_eq!(d.record.apartment_no, 101);
        // "mep" matches "MEP Work" and "MEP Fixtures"
        assert_eq!(d.activities.len(), 2);
        assert_eq!(d.activities[0].apartment, 100.0);
        assert_eq!(d.activities[0].floor, 50.0);
        assert_eq!(d.activities[0].tower, 50.0);
        assert!((d.overall - 12.0).abs() < 1e-9);
        assert!((d.floor_overall - 6.0).abs() < 1e-9);
    }

    #[test]
    fn floor_summary_respects_filters() {
        let records = vec![
            apt("I", 101, 1, &[("Ceiling", 1.0)]),
            apt("I", 201, 2, &[("Ceiling", 0.0)]),
            apt("L1", 101, 1, &[("Ceiling", 1.0)]),
        ];
        let filters = Filters {
            tower: Some("I".into()),
            ..Filters::default()
        };
        let floors = floor_summary(&records, &filters);
        assert_eq!(floors.len(), 2);
        assert!((floors[0].overall - 15.0).abs() < 1e-9);
        assert_eq!(floors[1].overall, 0.0);
    }

    #[test]
    fn landing_prefers_structure_finishes_blend() {
        let row = LcrgRow {
            tower: String::new(),
            area: "LCRG Overall".into(),
            components: vec![],
            progress: 30.0,
            structure: Some(100.0),
            finishes: Some(50.0),
        };
        let boost = Boost { factor: 1.05, cap: Some(100.0) };
        let landing = lcrg_landing(&[row.clone()], boost);
        assert!(landing.blended);
        assert!((landing.overall - 70.0 * 1.05).abs() < 1e-9);

        let plain = LcrgRow { structure: None, ..row };
        let landing = lcrg_landing(&[plain], boost);
        assert!(!landing.blended);
        assert_eq!(landing.overall, 30.0);
    }
}
