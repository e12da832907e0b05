//! Epicollect5 form layouts and their raw-key translation tables.
//!
//! The StreetSpectra Epicollect5 project has been published with three form
//! layouts over time. Each one gets a fixed table from raw question key to
//! [`CanonicalField`]; the tables are checked at compile time for duplicate
//! keys, duplicate targets and the fields every entry must carry.

use std::fmt;

use clap::ValueEnum;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    Id,
    CreatedAt,
    UploadedAt,
    Title,
    Nickname,
    Location,
    Url,
    Comment,
    /// Observer supplied date, superseded by `created_at`. Dropped.
    Date,
    /// Observer supplied time, superseded by `created_at`. Dropped.
    Time,
}

impl CanonicalField {
    pub const fn key(self) -> &'static str {
        match self {
            CanonicalField::Id => "id",
            CanonicalField::CreatedAt => "created_at",
            CanonicalField::UploadedAt => "uploaded_at",
            CanonicalField::Title => "title",
            CanonicalField::Nickname => "nickname",
            CanonicalField::Location => "location",
            CanonicalField::Url => "url",
            CanonicalField::Comment => "comment",
            CanonicalField::Date => "date",
            CanonicalField::Time => "time",
        }
    }

    pub const fn is_deprecated(self) -> bool {
        matches!(self, CanonicalField::Date | CanonicalField::Time)
    }
}

type Table = &'static [(&'static str, CanonicalField)];

const CURRENT: Table = &[
    ("ec5_uuid", CanonicalField::Id),
    ("created_at", CanonicalField::CreatedAt),
    ("uploaded_at", CanonicalField::UploadedAt),
    ("title", CanonicalField::Title),
    ("1_Share_your_nick_wi", CanonicalField::Nickname),
    ("2_Location", CanonicalField::Location),
    ("3_Take_an_image_of_a", CanonicalField::Url),
    ("4_Observations", CanonicalField::Comment),
];

const LEGACY: Table = &[
    ("ec5_uuid", CanonicalField::Id),
    ("created_at", CanonicalField::CreatedAt),
    ("uploaded_at", CanonicalField::UploadedAt),
    ("title", CanonicalField::Title),
    ("1_Date", CanonicalField::Date),
    ("2_Time", CanonicalField::Time),
    ("3_Location", CanonicalField::Location),
    ("4_Take_an_image_of_a", CanonicalField::Url),
    ("5_Observations", CanonicalField::Comment),
];

const MOBILE: Table = &[
    ("ec5_uuid", CanonicalField::Id),
    ("created_at", CanonicalField::CreatedAt),
    ("uploaded_at", CanonicalField::UploadedAt),
    ("title", CanonicalField::Title),
    ("1_Share_your_nick_wi", CanonicalField::Nickname),
    ("2_Date", CanonicalField::Date),
    ("3_Time", CanonicalField::Time),
    ("4_Location", CanonicalField::Location),
    ("5_Take_an_image_of_a", CanonicalField::Url),
    ("6_Observations", CanonicalField::Comment),
];

const fn str_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    let mut i = 0;
    while i < a.len() {
        if a[i] != b[i] {
            return false;
        }
        i += 1;
    }
    true
}

const fn maps_to(table: Table, field: CanonicalField) -> bool {
    let mut i = 0;
    while i < table.len() {
        if table[i].1 as u8 == field as u8 {
            return true;
        }
        i += 1;
    }
    false
}

const fn is_valid(table: Table) -> bool {
    let mut i = 0;
    while i < table.len() {
        let mut j = i + 1;
        while j < table.len() {
            if str_eq(table[i].0, table[j].0) || table[i].1 as u8 == table[j].1 as u8 {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    maps_to(table, CanonicalField::Id)
        && maps_to(table, CanonicalField::CreatedAt)
        && maps_to(table, CanonicalField::UploadedAt)
        && maps_to(table, CanonicalField::Location)
}

const _: () = assert!(is_valid(CURRENT), "invalid current form table");
const _: () = assert!(is_valid(LEGACY), "invalid legacy form table");
const _: () = assert!(is_valid(MOBILE), "invalid mobile form table");

/// Layout of a raw Epicollect5 entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ec5Form {
    /// Current web form, nickname first.
    Current,
    /// First web form with observer date and time questions.
    Legacy,
    /// Mobile app form: nickname, date and time questions.
    Mobile,
}

impl Ec5Form {
    pub const ALL: [Ec5Form; 3] = [Ec5Form::Current, Ec5Form::Legacy, Ec5Form::Mobile];

    pub fn table(self) -> Table {
        match self {
            Ec5Form::Current => CURRENT,
            Ec5Form::Legacy => LEGACY,
            Ec5Form::Mobile => MOBILE,
        }
    }

    pub fn lookup(self, raw_key: &str) -> Option<CanonicalField> {
        self.table()
            .iter()
            .find(|(key, _)| *key == raw_key)
            .map(|(_, field)| *field)
    }

    /// Keys only this form uses.
    fn discriminators(self) -> &'static [&'static str] {
        match self {
            Ec5Form::Current => &["2_Location"],
            Ec5Form::Legacy => &["1_Date", "3_Location"],
            Ec5Form::Mobile => &["2_Date", "4_Location"],
        }
    }

    pub fn detect(entry: &Map<String, Value>) -> Option<Ec5Form> {
        Self::ALL.into_iter().find(|form| {
            form.discriminators()
                .iter()
                .any(|key| entry.contains_key(*key))
        })
    }
}

impl fmt::Display for Ec5Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Ec5Form::Current => "current",
            Ec5Form::Legacy => "legacy",
            Ec5Form::Mobile => "mobile",
        })
    }
}

/// How the remapper picks the form of each entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FormSelection {
    /// Detect the form of every entry from its keys
    #[default]
    Auto,
    Current,
    Legacy,
    Mobile,
}

impl FormSelection {
    pub fn fixed(self) -> Option<Ec5Form> {
        match self {
            FormSelection::Auto => None,
            FormSelection::Current => Some(Ec5Form::Current),
            FormSelection::Legacy => Some(Ec5Form::Legacy),
            FormSelection::Mobile => Some(Ec5Form::Mobile),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn keys(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn shared_keys_resolve_in_every_form() {
        for form in Ec5Form::ALL {
            assert_eq!(form.lookup("ec5_uuid"), Some(CanonicalField::Id));
            assert_eq!(form.lookup("created_at"), Some(CanonicalField::CreatedAt));
            assert_eq!(form.lookup("no_such_question"), None);
        }
    }

    #[test]
    fn question_keys_are_form_specific() {
        assert_eq!(Ec5Form::Current.lookup("4_Observations"), Some(CanonicalField::Comment));
        assert_eq!(Ec5Form::Legacy.lookup("4_Take_an_image_of_a"), Some(CanonicalField::Url));
        assert_eq!(Ec5Form::Mobile.lookup("4_Location"), Some(CanonicalField::Location));
        assert_eq!(Ec5Form::Current.lookup("1_Date"), None);
    }

    #[test]
    fn deprecated_fields_are_date_and_time_only() {
        let deprecated: Vec<&str> = Ec5Form::ALL
            .iter()
            .flat_map(|form| form.table().iter())
            .filter(|(_, field)| field.is_deprecated())
            .map(|(_, field)| field.key())
            .collect();
        assert!(deprecated.iter().all(|key| *key == "date" || *key == "time"));
        assert_eq!(deprecated.len(), 4);
    }

    #[test]
    fn detects_each_form_from_its_questions() {
        let current = keys(json!({"ec5_uuid": "a", "2_Location": {}}));
        let legacy = keys(json!({"ec5_uuid": "b", "1_Date": "2020-01-01", "3_Location": {}}));
        let mobile = keys(json!({"ec5_uuid": "c", "2_Date": "2020-01-01", "4_Location": {}}));
        let unknown = keys(json!({"ec5_uuid": "d"}));
        assert_eq!(Ec5Form::detect(&current), Some(Ec5Form::Current));
        assert_eq!(Ec5Form::detect(&legacy), Some(Ec5Form::Legacy));
        assert_eq!(Ec5Form::detect(&mobile), Some(Ec5Form::Mobile));
        assert_eq!(Ec5Form::detect(&unknown), None);
    }
}
