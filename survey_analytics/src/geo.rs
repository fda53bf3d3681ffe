use crate::models::{AggregateRow, CoordinateEntry};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Geographic centre of Mexico, used to frame the maps.
pub const MAP_CENTER: (f64, f64) = (23.6345, -102.5528);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub label: String,
    pub latitude: f64,
    pub longitude: f64,
    pub value: f64,
    /// False when no aggregate row carried this label and `value` was
    /// filled with zero.
    pub matched: bool,
}

/// Left join of the coordinate table with a one-key aggregate.
///
/// Labels are compared exactly (case, accents and whitespace included).
/// Aggregate rows without coordinates are dropped.
pub fn join_coordinates(coords: &[CoordinateEntry], aggregate: &[AggregateRow]) -> Vec<GeoPoint> {
    let by_label: HashMap<&str, f64> = aggregate.iter().map(|r| (r.label(), r.amount)).collect();

    let points: Vec<GeoPoint> = coords
        .iter()
        .map(|entry| {
            let found = by_label.get(entry.label.as_str()).copied();
            GeoPoint {
                label: entry.label.clone(),
                latitude: entry.lat,
                longitude: entry.lng,
                value: found.unwrap_or(0.0),
                matched: found.is_some(),
            }
        })
        .collect();

    let unmatched = points.iter().filter(|p| !p.matched).count();
    if unmatched > 0 {
        debug!(
            "{} of {} coordinate labels had no aggregate match, filled with zero",
            unmatched,
            points.len()
        );
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(label: &str) -> CoordinateEntry {
        CoordinateEntry {
            label: label.to_string(),
            lat: 19.0,
            lng: -99.0,
        }
    }

    fn row(label: &str, amount: f64) -> AggregateRow {
        AggregateRow {
            keys: vec![label.to_string()],
            amount,
        }
    }

    #[test]
    fn test_unmatched_coordinate_gets_zero() {
        let coords = vec![coord("A"), coord("B")];
        let aggregate = vec![row("A", 125.0)];

        let points = join_coordinates(&coords, &aggregate);

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].value, 125.0);
        assert!(points[0].matched);
        assert_eq!(points[1].label, "B");
        assert_eq!(points[1].value, 0.0);
        assert!(!points[1].matched);
    }

    #[test]
    fn test_aggregate_without_coordinates_is_dropped() {
        let coords = vec![coord("Querétaro")];
        let aggregate = vec![row("Queretaro", 10.0), row("Querétaro", 4.0), row("Atlantis", 99.0)];

        let points = join_coordinates(&coords, &aggregate);

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].value, 4.0);
    }

    #[test]
    fn test_match_is_case_and_whitespace_sensitive() {
        let coords = vec![coord("Nuevo León")];
        let aggregate = vec![row("nuevo león", 1.0), row("Nuevo León ", 2.0)];

        let points = join_coordinates(&coords, &aggregate);
        assert!(!points[0].matched);
        assert_eq!(points[0].value, 0.0);
    }
}
