//! Reassembly of flat detailed rows into `(year, source)` bundles.

use std::collections::HashMap;

use crate::{DetailedGroup, DetailedRow};

/// Groups rows by `(year, source)`.
///
/// Rows are stable-sorted by `age_start` (absent lower bound first) and
/// scanned once; groups come out in the order their first row is seen, and
/// each group keeps the age order of its rows. Scope ids and unit are taken
/// from the first row of each group.
pub fn group_detailed_rows(mut rows: Vec<DetailedRow>) -> Vec<DetailedGroup> {
    rows.sort_by_key(|row| row.datum.age_start);
    let mut groups: Vec<DetailedGroup> = Vec::new();
    let mut positions: HashMap<(i32, String), usize> = HashMap::new();
    for row in rows {
        let key = (row.year, row.source.clone());
        match positions.get(&key) {
            Some(&index) => groups[index].data.push(row.datum),
            None => {
                positions.insert(key, groups.len());
                groups.push(DetailedGroup {
                    indicator_id: row.indicator_id,
                    territory_id: row.territory_id,
                    oktmo: row.oktmo,
                    unit: row.unit,
                    year: row.year,
                    source: row.source,
                    data: vec![row.datum],
                });
            }
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::group_detailed_rows;
    use crate::{DetailedDatum, DetailedRow};

    fn row(id: i64, year: i32, source: &str, age_start: Option<i32>) -> DetailedRow {
        DetailedRow {
            id,
            indicator_id: 1,
            territory_id: Some(10),
            oktmo: None,
            unit: "persons".to_string(),
            year,
            source: source.to_string(),
            datum: DetailedDatum {
                age_start,
                age_end: None,
                male: Some(id as f64),
                female: None,
            },
        }
    }

    #[test]
    fn groups_by_year_and_source() {
        let groups = group_detailed_rows(vec![
            row(1, 2020, "A", Some(0)),
            row(2, 2020, "B", Some(0)),
            row(3, 2020, "A", Some(18)),
        ]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].source, "A");
        let ages: Vec<_> = groups[0].data.iter().map(|d| d.age_start).collect();
        assert_eq!(ages, vec![Some(0), Some(18)]);
        assert_eq!(groups[1].source, "B");
        assert_eq!(groups[1].data.len(), 1);
    }

    #[test]
    fn emission_follows_first_seen_in_age_order() {
        // Source "late" owns the youngest band, so it is emitted first even
        // though its rows arrive last.
        let groups = group_detailed_rows(vec![
            row(1, 2019, "early", Some(20)),
            row(2, 2021, "early", Some(40)),
            row(3, 2020, "late", Some(5)),
        ]);
        let keys: Vec<_> = groups
            .iter()
            .map(|g| (g.year, g.source.as_str()))
            .collect();
        assert_eq!(keys, vec![(2020, "late"), (2019, "early"), (2021, "early")]);
    }

    #[test]
    fn equal_ages_keep_input_order() {
        let groups = group_detailed_rows(vec![
            row(7, 2020, "A", Some(0)),
            row(8, 2020, "A", Some(0)),
            row(9, 2020, "A", None),
        ]);
        assert_eq!(groups.len(), 1);
        let males: Vec<_> = groups[0].data.iter().map(|d| d.male).collect();
        assert_eq!(males, vec![Some(9.0), Some(7.0), Some(8.0)]);
    }

    #[test]
    fn empty_input_yields_no_groups() {
        assert!(group_detailed_rows(Vec::new()).is_empty());
    }
}
