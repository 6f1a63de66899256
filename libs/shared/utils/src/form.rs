//! Deserializers for HTML form posts, where an untouched input arrives as an
//! empty string and `datetime-local` inputs may omit seconds.

use std::fmt::Display;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{de, Deserialize, Deserializer};

pub fn empty_string_as_none<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let opt = Option::<String>::deserialize(de)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => FromStr::from_str(s).map_err(de::Error::custom).map(Some),
    }
}

/// Trims and drops blank text fields.
pub fn trimmed_string<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(de)?;
    Ok(opt
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

pub fn optional_datetime<'de, D>(de: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(de)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_datetime_local(s)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid date/time: {}", s))),
    }
}

pub fn optional_date<'de, D>(de: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(de)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(de::Error::custom),
    }
}

/// Checkbox semantics: absent is false, `on`/`true`/`1` is true.
pub fn checkbox<'de, D>(de: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(de)?;
    Ok(matches!(
        opt.as_deref().map(|s| s.trim().to_ascii_lowercase()).as_deref(),
        Some("on" | "true" | "1")
    ))
}

pub fn parse_datetime_local(raw: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
    ];

    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Drops seconds and sub-seconds.
pub fn truncate_to_minute(dt: NaiveDateTime) -> NaiveDateTime {
    dt.with_second(0)
        .and_then(|d| d.with_nanosecond(0))
        .unwrap_or(dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        extract::{Form, FromRequest},
        http::{header, Request},
    };
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "empty_string_as_none")]
        page: Option<i64>,
        #[serde(default, deserialize_with = "trimmed_string")]
        search: Option<String>,
        #[serde(default, deserialize_with = "optional_datetime")]
        at: Option<NaiveDateTime>,
        #[serde(default, deserialize_with = "checkbox")]
        show_all: bool,
    }

    async fn parse(body: &'static str) -> Sample {
        let request = Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        let Form(sample) = Form::<Sample>::from_request(request, &()).await.unwrap();
        sample
    }

    #[tokio::test]
    async fn blank_fields_become_none() {
        let sample = parse("page=&search=+++&at=").await;
        assert_eq!(sample.page, None);
        assert_eq!(sample.search, None);
        assert_eq!(sample.at, None);
        assert!(!sample.show_all);
    }

    #[tokio::test]
    async fn filled_fields_are_parsed() {
        let sample = parse("page=3&search=+ben+&at=2026-10-19T09%3A30&show_all=on").await;
        assert_eq!(sample.page, Some(3));
        assert_eq!(sample.search.as_deref(), Some("ben"));
        assert_eq!(
            sample.at,
            NaiveDate::from_ymd_opt(2026, 10, 19).and_then(|d| d.and_hms_opt(9, 30, 0))
        );
        assert!(sample.show_all);
    }

    #[test]
    fn datetime_with_seconds_is_accepted_and_truncated() {
        let dt = parse_datetime_local("2026-10-19T09:30:45.250").unwrap();
        assert_eq!(
            truncate_to_minute(dt),
            NaiveDate::from_ymd_opt(2026, 10, 19)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap()
        );
        assert!(parse_datetime_local("19/10/2026").is_none());
    }
}
