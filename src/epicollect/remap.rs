use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::epicollect::schema::{CanonicalField, Ec5Form, FormSelection};
use crate::error::RemapError;
use crate::observation::{Location, Observation, PROJECT, RECORD_TYPE, SOURCE_EPICOLLECT5};
use crate::timefmt::ec5_to_canonical;

/// Remap one raw Epicollect5 entry laid out as `form` into a canonical observation.
///
/// Every key must be known to the form's table. Timestamps are reformatted,
/// the deprecated date/time answers dropped and provenance fields added.
pub fn remap_entry(raw: Map<String, Value>, form: Ec5Form) -> Result<Observation, RemapError> {
    let mut fields: HashMap<CanonicalField, Value> = HashMap::with_capacity(raw.len());
    for (key, value) in raw {
        let field = form
            .lookup(&key)
            .ok_or(RemapError::UnknownField { field: key, form })?;
        if !field.is_deprecated() {
            fields.insert(field, value);
        }
    }

    let id = take_string(&mut fields, CanonicalField::Id)?
        .ok_or(RemapError::MissingField { field: "id" })?;
    let created_at = take_timestamp(&mut fields, CanonicalField::CreatedAt)?;
    let uploaded_at = take_timestamp(&mut fields, CanonicalField::UploadedAt)?;

    Ok(Observation {
        id,
        created_at,
        uploaded_at,
        title: take_string(&mut fields, CanonicalField::Title)?,
        nickname: take_string(&mut fields, CanonicalField::Nickname)?,
        location: normalize_location(fields.remove(&CanonicalField::Location)),
        url: take_string(&mut fields, CanonicalField::Url)?,
        comment: take_string(&mut fields, CanonicalField::Comment)?,
        project: PROJECT.to_string(),
        source: SOURCE_EPICOLLECT5.to_string(),
        kind: RECORD_TYPE.to_string(),
        written_at: None,
    })
}

/// Lazily remap raw entries, one output per input and in the same order.
///
/// The iterator is single-pass; callers collect into a `Result<Vec<_>, _>`
/// so the first failure aborts the whole batch.
pub fn remap_entries<I>(
    entries: I,
    selection: FormSelection,
) -> impl Iterator<Item = Result<Observation, RemapError>>
where
    I: IntoIterator<Item = Value>,
{
    entries
        .into_iter()
        .enumerate()
        .map(move |(index, entry)| {
            let Value::Object(raw) = entry else {
                return Err(RemapError::NotAnObject { index });
            };
            let form = match selection.fixed() {
                Some(form) => form,
                None => Ec5Form::detect(&raw).ok_or_else(|| RemapError::UnrecognizedForm {
                    id: raw
                        .get("ec5_uuid")
                        .and_then(Value::as_str)
                        .unwrap_or("#unknown")
                        .to_string(),
                })?,
            };
            remap_entry(raw, form)
        })
}

fn take_string(
    fields: &mut HashMap<CanonicalField, Value>,
    field: CanonicalField,
) -> Result<Option<String>, RemapError> {
    match fields.remove(&field) {
        None => Ok(None),
        Some(value) => serde_json::from_value(value).map_err(|source| RemapError::InvalidValue {
            field: field.key().to_string(),
            source,
        }),
    }
}

fn take_timestamp(
    fields: &mut HashMap<CanonicalField, Value>,
    field: CanonicalField,
) -> Result<String, RemapError> {
    let name = field.key();
    let raw = take_string(fields, field)?.ok_or(RemapError::MissingField { field: name })?;
    ec5_to_canonical(&raw).map_err(|source| RemapError::Timestamp {
        field: name,
        value: raw,
        source,
    })
}

fn normalize_location(value: Option<Value>) -> Location {
    let Some(Value::Object(location)) = value else {
        return Location::default();
    };
    Location {
        latitude: coordinate(location.get("latitude")),
        longitude: coordinate(location.get("longitude")),
        accuracy: coordinate(location.get("accuracy")),
    }
}

fn coordinate(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn current_entry() -> Value {
        json!({
            "ec5_uuid": "6b4d9f1c-0000-4000-8000-000000000001",
            "created_at": "2021-06-01T10:15:30.123Z",
            "uploaded_at": "2021-06-01T10:20:00.999Z",
            "title": "Madrid",
            "1_Share_your_nick_wi": "rafa",
            "2_Location": {"latitude": 40.4, "longitude": -3.7, "accuracy": 5},
            "3_Take_an_image_of_a": "https://five.epicollect.net/img/1.jpg",
            "4_Observations": "clear sky"
        })
    }

    fn legacy_entry() -> Value {
        json!({
            "ec5_uuid": "6b4d9f1c-0000-4000-8000-000000000002",
            "created_at": "2020-11-12T22:01:02.000Z",
            "uploaded_at": "2020-11-12T22:05:00.500Z",
            "title": "Cuenca",
            "1_Date": "12/11/2020",
            "2_Time": "23:00",
            "3_Location": {"latitude": "40.07", "longitude": "-2.13"},
            "4_Take_an_image_of_a": "https://five.epicollect.net/img/2.jpg",
            "5_Observations": ""
        })
    }

    fn mobile_entry() -> Value {
        json!({
            "ec5_uuid": "6b4d9f1c-0000-4000-8000-000000000003",
            "created_at": "2021-03-20T19:45:10.250Z",
            "uploaded_at": "2021-03-20T19:50:00.000Z",
            "title": "Granada",
            "1_Share_your_nick_wi": "ana",
            "2_Date": "20/03/2021",
            "3_Time": "20:45",
            "4_Location": {"latitude": 37.18, "longitude": "-3.6", "accuracy": 12},
            "5_Take_an_image_of_a": "https://five.epicollect.net/img/3.jpg",
            "6_Observations": "streetlight, LED"
        })
    }

    #[test]
    fn remaps_current_entry_to_full_record() {
        let observation = remap_entry(object(current_entry()), Ec5Form::Current).unwrap();
        assert_eq!(observation.id, "6b4d9f1c-0000-4000-8000-000000000001");
        assert_eq!(observation.created_at, "2021-06-01T10:15:30 UTC");
        assert_eq!(observation.uploaded_at, "2021-06-01T10:20:00 UTC");
        assert_eq!(observation.nickname.as_deref(), Some("rafa"));
        assert_eq!(observation.location.accuracy, Some(5.0));
        assert_eq!(observation.comment.as_deref(), Some("clear sky"));
        assert_eq!(observation.project, "street-spectra");
        assert_eq!(observation.source, "Epicollect5");
        assert_eq!(observation.kind, "observation");
    }

    #[test]
    fn legacy_entry_drops_date_time_and_nulls_missing_accuracy() {
        let observation = remap_entry(object(legacy_entry()), Ec5Form::Legacy).unwrap();
        let value = serde_json::to_value(&observation).unwrap();
        assert!(value.get("date").is_none());
        assert!(value.get("time").is_none());
        assert!(value["nickname"].is_null());
        assert_eq!(value["location"]["latitude"], json!(40.07));
        assert!(value["location"]["accuracy"].is_null());
        assert!(value["location"].as_object().unwrap().contains_key("accuracy"));
    }

    #[test]
    fn mobile_entry_drops_date_time_and_reads_shifted_questions() {
        let observation = remap_entry(object(mobile_entry()), Ec5Form::Mobile).unwrap();
        assert_eq!(observation.id, "6b4d9f1c-0000-4000-8000-000000000003");
        assert_eq!(observation.created_at, "2021-03-20T19:45:10 UTC");
        assert_eq!(observation.nickname.as_deref(), Some("ana"));
        assert_eq!(observation.location.latitude, Some(37.18));
        assert_eq!(observation.location.longitude, Some(-3.6));
        assert_eq!(observation.location.accuracy, Some(12.0));
        assert_eq!(
            observation.url.as_deref(),
            Some("https://five.epicollect.net/img/3.jpg")
        );
        assert_eq!(observation.comment.as_deref(), Some("streetlight, LED"));

        let value = serde_json::to_value(&observation).unwrap();
        assert!(value.get("date").is_none());
        assert!(value.get("time").is_none());
    }

    #[test]
    fn unknown_key_is_a_lookup_error() {
        let mut raw = object(current_entry());
        raw.insert("7_Extra_question".to_string(), json!("?"));
        let err = remap_entry(raw, Ec5Form::Current).unwrap_err();
        assert!(matches!(
            err,
            RemapError::UnknownField { ref field, form: Ec5Form::Current } if field == "7_Extra_question"
        ));
    }

    #[test]
    fn wrong_form_is_a_lookup_error() {
        let err = remap_entry(object(legacy_entry()), Ec5Form::Current).unwrap_err();
        assert!(matches!(err, RemapError::UnknownField { .. }));
    }

    #[test]
    fn bad_timestamp_fails_the_entry() {
        let mut raw = object(current_entry());
        raw.insert("created_at".to_string(), json!("2021-06-01 10:15"));
        let err = remap_entry(raw, Ec5Form::Current).unwrap_err();
        assert!(matches!(err, RemapError::Timestamp { field: "created_at", .. }));
    }

    #[test]
    fn missing_location_becomes_all_null() {
        let mut raw = object(current_entry());
        raw.insert("2_Location".to_string(), json!(""));
        let observation = remap_entry(raw, Ec5Form::Current).unwrap();
        assert_eq!(observation.location, Location::default());
    }

    #[test]
    fn batch_preserves_order_and_detects_forms() {
        let observations: Vec<Observation> =
            remap_entries(vec![legacy_entry(), current_entry()], FormSelection::Auto)
                .collect::<Result<_, _>>()
                .unwrap();
        assert_eq!(observations.len(), 2);
        assert!(observations[0].id.ends_with("02"));
        assert!(observations[1].id.ends_with("01"));
    }

    #[test]
    fn batch_aborts_on_first_bad_entry() {
        let result: Result<Vec<Observation>, RemapError> =
            remap_entries(vec![current_entry(), json!(42), legacy_entry()], FormSelection::Auto)
                .collect();
        assert!(matches!(result, Err(RemapError::NotAnObject { index: 1 })));
    }

    #[test]
    fn undetectable_entry_names_its_uuid() {
        let result: Result<Vec<Observation>, RemapError> =
            remap_entries(vec![json!({"ec5_uuid": "xyz"})], FormSelection::Auto).collect();
        assert!(matches!(result, Err(RemapError::UnrecognizedForm { ref id }) if id == "xyz"));
    }
}
