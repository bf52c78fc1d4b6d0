use chrono::{NaiveDate, NaiveDateTime};
use csv::WriterBuilder;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("input file not found: {path}")]
    InputMissing { path: PathBuf },

    #[error("input is missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("unparseable timestamp '{0}'")]
    BadTimestamp(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Deserialize)]
pub struct CheckIn {
    #[serde(rename = "Timestamp")]
    timestamp: String,
    #[serde(rename = "Name")]
    name: String,
}

impl CheckIn {
    pub fn new(timestamp: impl Into<String>, name: impl Into<String>) -> Self {
        CheckIn {
            timestamp: timestamp.into(),
            name: name.into(),
        }
    }

    // identity key: surrounding whitespace trimmed, nothing else normalized
    pub fn name(&self) -> &str {
        self.name.trim()
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }
}

/// Derives the calendar date of a check-in. Full `DD/MM/YYYY HH:MM:SS`
/// first; when the time-of-day part is missing or malformed, the first
/// whitespace token is retried as a bare `DD/MM/YYYY`.
fn event_date(raw: &str) -> Result<NaiveDate> {
    if let Ok(stamp) = NaiveDateTime::parse_from_str(raw, "%d/%m/%Y %H:%M:%S") {
        return Ok(stamp.date());
    }
    let day = raw.split_whitespace().next().unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%d/%m/%Y")
        .map_err(|_| Error::BadTimestamp(raw.to_string()))
}

pub fn load_check_ins(path: &Path) -> Result<(Vec<CheckIn>, BTreeSet<String>)> {
    if !path.exists() {
        return Err(Error::InputMissing {
            path: path.to_path_buf(),
        });
    }
    load_check_ins_from(csv::Reader::from_path(path)?)
}

pub fn load_check_ins_from<R: io::Read>(
    mut reader: csv::Reader<R>,
) -> Result<(Vec<CheckIn>, BTreeSet<String>)> {
    let headers = reader.headers()?;
    for required in ["Timestamp", "Name"] {
        if !headers.iter().any(|column| column == required) {
            return Err(Error::MissingColumn(required));
        }
    }

    let mut check_ins = Vec::new();
    let mut roster = BTreeSet::new();
    for row in reader.deserialize::<CheckIn>() {
        let check_in = row?;
        roster.insert(check_in.name().to_string());
        check_ins.push(check_in);
    }
    Ok((check_ins, roster))
}

pub struct AbsenteeRow {
    pub date: NaiveDate,
    pub absent: Vec<String>,
}

impl AbsenteeRow {
    pub fn count(&self) -> usize {
        self.absent.len()
    }
}

impl Serialize for AbsenteeRow {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("AbsenteeRow", 3)?;
        state.serialize_field("Date", &self.date.to_string())?;
        state.serialize_field("Number Absent", &self.count())?;
        state.serialize_field("Absentees", &self.absent.join(", "))?;
        state.end()
    }
}

pub struct AttendanceRow {
    pub name: String,
    pub days_present: usize,
    pub total_days: usize,
}

impl AttendanceRow {
    pub fn percentage(&self) -> String {
        if self.total_days == 0 {
            // reference output leaves the degenerate no-days case as a bare 0
            return "0".to_string();
        }
        let ratio = self.days_present as f64 / self.total_days as f64;
        format!("{:.2}%", ratio * 100.0)
    }
}

impl Serialize for AttendanceRow {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("AttendanceRow", 4)?;
        state.serialize_field("Name", &self.name)?;
        state.serialize_field("Days Present", &self.days_present)?;
        state.serialize_field("Total Days", &self.total_days)?;
        state.serialize_field("Attendance Percentage", &self.percentage())?;
        state.end()
    }
}

pub struct Registrar {
    roster: BTreeSet<String>,
    by_date: BTreeMap<NaiveDate, BTreeSet<String>>,
}

impl Registrar {
    /// The roster is the universal population absence is measured against,
    /// so it is fixed up front from the full input; a name that never
    /// check-ins on a given date is absent that date.
    pub fn new(roster: BTreeSet<String>) -> Self {
        Registrar {
            roster,
            by_date: BTreeMap::new(),
        }
    }

    pub fn consume(&mut self, check_ins: impl Iterator<Item = CheckIn>) -> Result<()> {
        for check_in in check_ins {
            self.record_check_in(&check_in)?;
        }
        Ok(())
    }

    pub fn record_check_in(&mut self, check_in: &CheckIn) -> Result<()> {
        let date = event_date(check_in.timestamp())?;
        self.by_date
            .entry(date)
            .or_default()
            .insert(check_in.name().to_string());
        Ok(())
    }

    pub fn total_days(&self) -> usize {
        self.by_date.len()
    }

    /// One row per observed date in calendar order; absentees are the
    /// roster members without a check-in that date, lexically sorted.
    pub fn absentee_rows(&self) -> Vec<AbsenteeRow> {
        self.by_date
            .iter()
            .map(|(date, present)| AbsenteeRow {
                date: *date,
                absent: self.roster.difference(present).cloned().collect(),
            })
            .collect()
    }

    /// One row per roster member in lexical order.
    pub fn attendance_rows(&self) -> Vec<AttendanceRow> {
        self.roster
            .iter()
            .map(|name| AttendanceRow {
                name: name.clone(),
                days_present: self
                    .by_date
                    .values()
                    .filter(|present| present.contains(name))
                    .count(),
                total_days: self.total_days(),
            })
            .collect()
    }

    pub fn write_absentees<T: io::Write>(&self, target: T) -> Result<()> {
        let mut writer = WriterBuilder::new().from_writer(target);
        let rows = self.absentee_rows();
        if rows.is_empty() {
            // serialize only emits the header alongside a first record
            writer.write_record(["Date", "Number Absent", "Absentees"])?;
        }
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn write_percentages<T: io::Write>(&self, target: T) -> Result<()> {
        let mut writer = WriterBuilder::new().from_writer(target);
        let rows = self.attendance_rows();
        if rows.is_empty() {
            writer.write_record(["Name", "Days Present", "Total Days", "Attendance Percentage"])?;
        }
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
fn registrar_for(check_ins: Vec<CheckIn>) -> Registrar {
    let roster = check_ins
        .iter()
        .map(|check_in| check_in.name().to_string())
        .collect();
    let mut registrar = Registrar::new(roster);
    registrar
        .consume(check_ins.into_iter())
        .expect("timestamps in test fixtures parse");
    registrar
}

#[test]
fn duplicate_check_ins_collapse() {
    let registrar = registrar_for(vec![
        CheckIn::new("17/04/2025 08:00:00", "Alice"),
        CheckIn::new("17/04/2025 09:30:00", "Alice"),
    ]);

    assert_eq!(registrar.total_days(), 1);
    let rows = registrar.attendance_rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].days_present, 1);
}

#[test]
fn date_only_timestamp_falls_back() {
    assert_eq!(
        event_date("17/04/2025").unwrap(),
        NaiveDate::from_ymd_opt(2025, 4, 17).unwrap()
    );
}

#[test]
fn unpadded_timestamp_parses() {
    assert_eq!(
        event_date("7/4/2025 8:00:00").unwrap(),
        NaiveDate::from_ymd_opt(2025, 4, 7).unwrap()
    );
}

#[test]
fn garbage_timestamp_is_fatal() {
    let err = event_date("yesterday-ish").unwrap_err();
    assert!(matches!(err, Error::BadTimestamp(raw) if raw == "yesterday-ish"));
}

#[test]
fn trailing_junk_after_date_token_still_parses() {
    // primary tier rejects "17/04/2025 morning", fallback keeps the date
    assert_eq!(
        event_date("17/04/2025 morning").unwrap(),
        NaiveDate::from_ymd_opt(2025, 4, 17).unwrap()
    );
}

#[test]
fn absent_and_present_partition_the_roster() {
    let registrar = registrar_for(vec![
        CheckIn::new("17/04/2025 08:00:00", "Alice"),
        CheckIn::new("17/04/2025 08:05:00", "Bob"),
        CheckIn::new("18/04/2025 08:00:00", "Alice"),
        CheckIn::new("19/04/2025 08:00:00", "Carol"),
    ]);

    for row in registrar.absentee_rows() {
        let present = &registrar.by_date[&row.date];
        for name in &row.absent {
            assert!(!present.contains(name));
        }
        assert_eq!(row.count() + present.len(), registrar.roster.len());
    }
}

#[test]
fn roster_member_without_any_check_in_is_always_absent() {
    let (check_ins, mut roster) =
        load_check_ins_from(csv::Reader::from_reader(&b"Timestamp,Name\n"[..]))
            .expect("empty body loads");
    assert!(check_ins.is_empty());
    roster.insert("Ghost".to_string());
    roster.insert("Alice".to_string());

    let mut registrar = Registrar::new(roster);
    registrar
        .record_check_in(&CheckIn::new("17/04/2025 08:00:00", "Alice"))
        .unwrap();

    let rows = registrar.absentee_rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].absent, vec!["Ghost".to_string()]);
}

#[test]
fn percentage_formats_to_two_decimals() {
    let row = AttendanceRow {
        name: "Bob".to_string(),
        days_present: 1,
        total_days: 3,
    };
    assert_eq!(row.percentage(), "33.33%");
}

#[test]
fn zero_days_percentage_is_bare_zero() {
    let mut roster = BTreeSet::new();
    roster.insert("Alice".to_string());
    let registrar = Registrar::new(roster);

    assert_eq!(registrar.total_days(), 0);
    assert_eq!(registrar.attendance_rows()[0].percentage(), "0");
}

#[test]
fn names_are_trimmed_on_load() {
    let input = b"Timestamp,Name\n17/04/2025 08:00:00,  Alice \n" as &[u8];
    let (check_ins, roster) =
        load_check_ins_from(csv::Reader::from_reader(input)).unwrap();
    assert_eq!(check_ins[0].name(), "Alice");
    assert!(roster.contains("Alice"));
    assert_eq!(roster.len(), 1);
}

#[test]
fn missing_name_column_is_a_schema_error() {
    let input = b"Timestamp,Person\n17/04/2025 08:00:00,Alice\n" as &[u8];
    let err = load_check_ins_from(csv::Reader::from_reader(input)).unwrap_err();
    assert!(matches!(err, Error::MissingColumn("Name")));
}

#[test]
fn header_match_is_case_sensitive() {
    let input = b"timestamp,name\n17/04/2025 08:00:00,Alice\n" as &[u8];
    let err = load_check_ins_from(csv::Reader::from_reader(input)).unwrap_err();
    assert!(matches!(err, Error::MissingColumn("Timestamp")));
}

#[test]
fn extra_columns_are_ignored() {
    let input =
        b"Email,Timestamp,Name\nalice@example.com,17/04/2025 08:00:00,Alice\n" as &[u8];
    let (check_ins, roster) =
        load_check_ins_from(csv::Reader::from_reader(input)).unwrap();
    assert_eq!(check_ins.len(), 1);
    assert!(roster.contains("Alice"));
}

#[test]
fn missing_input_file_is_reported() {
    let err = load_check_ins(Path::new("no_such_attendance.csv")).unwrap_err();
    assert!(matches!(err, Error::InputMissing { .. }));
}
