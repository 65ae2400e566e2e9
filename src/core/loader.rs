use crate::domain::model::SkillInterval;
use crate::utils::error::{Result, TimelineError};
use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

pub const NAME_COLUMN: &str = "name";
pub const START_COLUMN: &str = "start";
pub const END_COLUMN: &str = "end";
pub const CATEGORY_COLUMN: &str = "category";

#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    /// End date given to rows with an empty `end` cell.
    pub ongoing_end: NaiveDate,
    /// Drop ordering prefixes such as `"03 "` from skill names.
    pub strip_numeric_prefix: bool,
}

struct ColumnIndex {
    name: usize,
    start: usize,
    end: usize,
    category: Option<usize>,
}

impl ColumnIndex {
    fn from_headers(headers: &csv::StringRecord, source_name: &str) -> Result<Self> {
        let find = |column: &str| {
            headers
                .iter()
                .position(|header| header.trim().eq_ignore_ascii_case(column))
        };
        let require = |column: &str| {
            find(column).ok_or_else(|| TimelineError::SchemaError {
                source_name: source_name.to_string(),
                column: column.to_string(),
            })
        };

        Ok(Self {
            name: require(NAME_COLUMN)?,
            start: require(START_COLUMN)?,
            end: require(END_COLUMN)?,
            category: find(CATEGORY_COLUMN),
        })
    }
}

fn numeric_prefix() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d+[.)]?\s+").expect("valid prefix regex"))
}

/// `"03 Python"` and `"3. Python"` become `"Python"`.
pub fn clean_name(name: &str) -> String {
    let stripped = numeric_prefix().replace(name.trim(), "");
    if stripped.trim().is_empty() {
        name.trim().to_string()
    } else {
        stripped.trim().to_string()
    }
}

/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, `YYYY-MM`, `YYYY` and ISO date-times.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();

    for format in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }

    // Date-time: keep the calendar part.
    if value.len() > 10 && matches!(value.as_bytes()[10], b'T' | b' ') {
        if let Some(date_part) = value.get(..10) {
            if let Ok(date) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
                return Some(date);
            }
        }
    }

    let normalized = value.replace('/', "-");
    if let Some((year, month)) = normalized.split_once('-') {
        if year.len() == 4 && (1..=2).contains(&month.len()) {
            let year = year.parse::<i32>().ok()?;
            let month = month.parse::<u32>().ok()?;
            return NaiveDate::from_ymd_opt(year, month, 1);
        }
    }

    if value.len() == 4 && value.bytes().all(|b| b.is_ascii_digit()) {
        let year = value.parse::<i32>().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1);
    }

    None
}

/// Parses CSV bytes into skill intervals in row order.
///
/// `source_name` only labels errors.
pub fn parse_intervals(
    data: &[u8],
    source_name: &str,
    options: &LoadOptions,
) -> Result<Vec<SkillInterval>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(data);

    let columns = ColumnIndex::from_headers(reader.headers()?, source_name)?;
    let mut intervals = Vec::new();

    for result in reader.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let cell = |index: usize| record.get(index).unwrap_or("").trim();

        let raw_name = cell(columns.name);
        if raw_name.is_empty() {
            return Err(TimelineError::InvalidRecordError {
                source_name: source_name.to_string(),
                line,
                message: "skill name is empty".to_string(),
            });
        }

        let parse_column = |column: &str, value: &str| {
            parse_date(value).ok_or_else(|| TimelineError::DateParseError {
                source_name: source_name.to_string(),
                line,
                column: column.to_string(),
                value: value.to_string(),
            })
        };

        let start = parse_column(START_COLUMN, cell(columns.start))?;
        let end_cell = cell(columns.end);
        let (end, ongoing) = if end_cell.is_empty() {
            (options.ongoing_end.max(start), true)
        } else {
            let end = parse_column(END_COLUMN, end_cell)?;
            if end < start {
                return Err(TimelineError::InvalidRecordError {
                    source_name: source_name.to_string(),
                    line,
                    message: format!("'{}' ends ({}) before it starts ({})", raw_name, end, start),
                });
            }
            (end, false)
        };

        let category = columns
            .category
            .map(cell)
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        let name = if options.strip_numeric_prefix {
            clean_name(raw_name)
        } else {
            raw_name.to_string()
        };

        intervals.push(SkillInterval {
            name,
            category,
            start,
            end,
            ongoing,
        });
    }

    tracing::debug!("Parsed {} skill intervals from {}", intervals.len(), source_name);
    Ok(intervals)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn options() -> LoadOptions {
        LoadOptions {
            ongoing_end: date(2026, 10, 16),
            strip_numeric_prefix: true,
        }
    }

    #[test]
    fn test_parse_rows_in_order() {
        let csv = "name,start,end,category\n\
                   Python,2015-01-01,2025-12-31,programming\n\
                   Git,2010-03-01,2020-01-01,\n";

        let intervals = parse_intervals(csv.as_bytes(), "skills.csv", &options()).unwrap();

        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[0].name, "Python");
        assert_eq!(intervals[0].category.as_deref(), Some("programming"));
        assert_eq!(intervals[0].start, date(2015, 1, 1));
        assert_eq!(intervals[0].end, date(2025, 12, 31));
        assert!(!intervals[0].ongoing);
        assert_eq!(intervals[1].name, "Git");
        assert_eq!(intervals[1].category, None);
    }

    #[test]
    fn test_category_column_is_optional() {
        let csv = "name,start,end\nDocker,2016-05-01,2024-01-01\n";
        let intervals = parse_intervals(csv.as_bytes(), "skills.csv", &options()).unwrap();
        assert_eq!(intervals[0].category, None);
    }

    #[test]
    fn test_headers_are_case_insensitive_and_any_order() {
        let csv = "End , Name,START\n2020-01-01,Haskell,2012-01-01\n";
        let intervals = parse_intervals(csv.as_bytes(), "skills.csv", &options()).unwrap();
        assert_eq!(intervals[0].name, "Haskell");
        assert_eq!(intervals[0].start, date(2012, 1, 1));
        assert_eq!(intervals[0].end, date(2020, 1, 1));
    }

    #[test]
    fn test_empty_end_resolves_to_ongoing_sentinel() {
        let csv = "name,start,end\nRust,2019-06-01,\n";
        let intervals = parse_intervals(csv.as_bytes(), "skills.csv", &options()).unwrap();

        assert!(intervals[0].ongoing);
        assert_eq!(intervals[0].end, date(2026, 10, 16));
    }

    #[test]
    fn test_ongoing_sentinel_never_precedes_start() {
        let csv = "name,start,end\nZig,2027-01-01,\n";
        let intervals = parse_intervals(csv.as_bytes(), "skills.csv", &options()).unwrap();
        assert_eq!(intervals[0].end, intervals[0].start);
    }

    #[test]
    fn test_missing_required_column() {
        let csv = "name,start\nPython,2015-01-01\n";
        let result = parse_intervals(csv.as_bytes(), "skills.csv", &options());

        match result {
            Err(TimelineError::SchemaError { column, source_name }) => {
                assert_eq!(column, "end");
                assert_eq!(source_name, "skills.csv");
            }
            other => panic!("expected SchemaError, got {:?}", other),
        }
    }

    #[test]
    fn test_unparseable_end_names_line() {
        let csv = "name,start,end\nPython,2015-01-01,2020-01-01\nGo,2018-01-01,TBD\n";
        let result = parse_intervals(csv.as_bytes(), "skills.csv", &options());

        match result {
            Err(TimelineError::DateParseError {
                line, column, value, ..
            }) => {
                assert_eq!(line, 3);
                assert_eq!(column, "end");
                assert_eq!(value, "TBD");
            }
            other => panic!("expected DateParseError, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_start_is_a_date_error() {
        let csv = "name,start,end\nPython,,2020-01-01\n";
        let result = parse_intervals(csv.as_bytes(), "skills.csv", &options());
        assert!(matches!(result, Err(TimelineError::DateParseError { .. })));
    }

    #[test]
    fn test_reversed_interval_is_rejected() {
        let csv = "name,start,end\nPython,2020-01-01,2015-01-01\n";
        let result = parse_intervals(csv.as_bytes(), "skills.csv", &options());
        assert!(matches!(
            result,
            Err(TimelineError::InvalidRecordError { line: 2, .. })
        ));
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let csv = "name,start,end\n,2020-01-01,2021-01-01\n";
        let result = parse_intervals(csv.as_bytes(), "skills.csv", &options());
        assert!(matches!(result, Err(TimelineError::InvalidRecordError { .. })));
    }

    #[test]
    fn test_every_row_satisfies_start_before_end() {
        let csv = "name,start,end\nA,2001,2003\nB,2010-02,\nC,1999/12/31,2000-01-01T08:00:00\n";
        let intervals = parse_intervals(csv.as_bytes(), "skills.csv", &options()).unwrap();

        assert_eq!(intervals.len(), 3);
        for interval in &intervals {
            assert!(interval.start <= interval.end, "{:?}", interval);
        }
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2015-01-31"), Some(date(2015, 1, 31)));
        assert_eq!(parse_date("2015/01/31"), Some(date(2015, 1, 31)));
        assert_eq!(parse_date("2015-07"), Some(date(2015, 7, 1)));
        assert_eq!(parse_date("2015/07"), Some(date(2015, 7, 1)));
        assert_eq!(parse_date("2015"), Some(date(2015, 1, 1)));
        assert_eq!(parse_date("2015-07-04T10:30:00Z"), Some(date(2015, 7, 4)));
        assert_eq!(parse_date("2015-07-04 10:30"), Some(date(2015, 7, 4)));
        assert_eq!(parse_date("TBD"), None);
        assert_eq!(parse_date("2015-13-01"), None);
        assert_eq!(parse_date("2015-13"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_clean_name() {
        assert_eq!(clean_name("03 Python"), "Python");
        assert_eq!(clean_name("3. Google Cloud"), "Google Cloud");
        assert_eq!(clean_name("Google Cloud"), "Google Cloud");
        assert_eq!(clean_name("2024"), "2024");
        assert_eq!(clean_name("C++"), "C++");
    }
}
