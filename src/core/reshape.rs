use crate::domain::model::{AxisRole, PlotPoint, SkillInterval};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Splits one interval into its start and end points.
pub fn interval_points(record: usize, interval: &SkillInterval) -> [PlotPoint; 2] {
    let point = |axis_role, value| PlotPoint {
        record,
        name: interval.name.clone(),
        category: interval.category.clone(),
        axis_role,
        value,
        ongoing: interval.ongoing,
    };

    [
        point(AxisRole::Start, interval.start),
        point(AxisRole::End, interval.end),
    ]
}

/// Long-form reshape: `[start_0, end_0, start_1, end_1, ...]`.
pub fn reshape(intervals: &[SkillInterval]) -> Vec<PlotPoint> {
    intervals
        .iter()
        .enumerate()
        .flat_map(|(record, interval)| interval_points(record, interval))
        .collect()
}

/// One skill's line, regrouped from its start and end points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillLine<'a> {
    pub record: usize,
    pub name: &'a str,
    pub category: Option<&'a str>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub ongoing: bool,
}

impl SkillLine<'_> {
    pub fn duration_years(&self) -> f64 {
        (self.end - self.start).num_days() as f64 / 365.25
    }
}

/// Groups points back into lines, ordered by record. Records missing either
/// endpoint are skipped.
pub fn skill_lines(points: &[PlotPoint]) -> Vec<SkillLine<'_>> {
    let mut grouped: BTreeMap<usize, (Option<&PlotPoint>, Option<&PlotPoint>)> = BTreeMap::new();
    for point in points {
        let entry = grouped.entry(point.record).or_default();
        match point.axis_role {
            AxisRole::Start => entry.0 = Some(point),
            AxisRole::End => entry.1 = Some(point),
        }
    }

    grouped
        .into_iter()
        .filter_map(|(record, pair)| match pair {
            (Some(start), Some(end)) => Some(SkillLine {
                record,
                name: &start.name,
                category: start.category.as_deref(),
                start: start.value,
                end: end.value,
                ongoing: end.ongoing,
            }),
            _ => None,
        })
        .collect()
}
