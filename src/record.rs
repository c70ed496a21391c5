use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::NewRecipe;

pub type Record = Map<String, Value>;

// column widths from schema.sql
pub const MAX_AUTHOR_LEN: usize = 50;
pub const MAX_TITLE_LEN: usize = 150;
pub const MAX_URL_LEN: usize = 255;
pub const MAX_PHOTO_URL_LEN: usize = 255;
pub const MAX_INGREDIENT_NAME_LEN: usize = 100;

// DECIMAL(3, 2)
const MAX_RATING: f64 = 9.99;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("field '{field}' must be a string, got {value}")]
    NotText { field: &'static str, value: String },

    #[error("field '{field}' is not a number: {value}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("field '{field}' is out of range: {value}")]
    OutOfRange { field: &'static str, value: String },

    #[error("field '{field}' is longer than {max} characters")]
    TooLong { field: &'static str, max: usize },
}

pub fn record_url(record: &Record) -> Option<&str> {
    match record.get("url") {
        Some(Value::String(url)) if !url.is_empty() => Some(url),
        _ => None,
    }
}

pub fn record_title(record: &Record) -> &str {
    record
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or("Unknown")
}

pub fn ingredient_names(record: &Record) -> Vec<&str> {
    match record.get("ingredients") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .filter(|name| !name.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

pub fn check_ingredient_name(name: &str) -> Result<(), RecordError> {
    check_len("ingredient", name, MAX_INGREDIENT_NAME_LEN)
}

impl NewRecipe {
    /// Absent, null and blank values take defaults. Present values that cannot
    /// be read fail the record.
    pub fn from_record(record: &Record, scraped_on: NaiveDate) -> Result<Self, RecordError> {
        let url = text(record, "url")?;
        check_len("url", &url, MAX_URL_LEN)?;
        let author = text(record, "author")?;
        check_len("author", &author, MAX_AUTHOR_LEN)?;
        let title = text(record, "title")?;
        check_len("title", &title, MAX_TITLE_LEN)?;
        let photo_url = text(record, "photo_url")?;
        check_len("photo_url", &photo_url, MAX_PHOTO_URL_LEN)?;

        let ingredients = record
            .get("ingredients")
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()))
            .to_string();

        Ok(NewRecipe {
            author,
            title,
            cook_time_minutes: whole_number(record, "cook_time_minutes")?,
            prep_time_minutes: whole_number(record, "prep_time_minutes")?,
            total_time_minutes: whole_number(record, "total_time_minutes")?,
            description: text(record, "description")?,
            footnotes: text(record, "footnotes")?,
            ingredients,
            instructions: text(record, "instructions")?,
            rating_stars: rating(record, "rating_stars")?,
            review_count: whole_number(record, "review_count")?,
            time_scraped: scraped_on,
            url,
            photo_url,
        })
    }
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), RecordError> {
    if value.chars().count() > max {
        return Err(RecordError::TooLong { field, max });
    }
    Ok(())
}

fn text(record: &Record, field: &'static str) -> Result<String, RecordError> {
    match record.get(field) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(RecordError::NotText {
            field,
            value: other.to_string(),
        }),
    }
}

// Ok(None) means absent, use the default
fn number(record: &Record, field: &'static str) -> Result<Option<f64>, RecordError> {
    let invalid = |value: &Value| RecordError::InvalidNumber {
        field,
        value: value.to_string(),
    };
    match record.get(field) {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(None),
        Some(Value::Bool(true)) => Ok(Some(1.0)),
        Some(value @ Value::Number(n)) => n.as_f64().map(Some).ok_or_else(|| invalid(value)),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(value @ Value::String(s)) => match s.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(Some(n)),
            _ => Err(invalid(value)),
        },
        Some(other) => Err(invalid(other)),
    }
}

fn whole_number(record: &Record, field: &'static str) -> Result<i32, RecordError> {
    let value = match number(record, field)? {
        Some(n) => n.trunc(),
        None => return Ok(0),
    };
    if value < 0.0 || value > f64::from(i32::MAX) {
        return Err(RecordError::OutOfRange {
            field,
            value: value.to_string(),
        });
    }
    Ok(value as i32)
}

fn rating(record: &Record, field: &'static str) -> Result<BigDecimal, RecordError> {
    let value = number(record, field)?.unwrap_or(0.0);
    let rounded = format!("{:.2}", value);
    if value < 0.0 || rounded.parse::<f64>().map_or(true, |r| r > MAX_RATING) {
        return Err(RecordError::OutOfRange {
            field,
            value: value.to_string(),
        });
    }
    BigDecimal::from_str(&rounded).map_err(|_| RecordError::InvalidNumber {
        field,
        value: rounded,
    })
}
