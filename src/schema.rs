//! Request schema for customer records.
//!
//! Payloads arrive as untyped JSON. Every record in a batch is checked
//! against [`FIELDS`] and coerced into a [`CustomerRecord`]; any failure
//! rejects the whole batch with every issue found.

use crate::error::{ApiError, LocPart, ValidationIssue};
use crate::models::CustomerRecord;
use serde_json::{Map, Number, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Float,
}

/// The 19 columns of a customer record, in model column order.
pub const FIELDS: [(&str, FieldKind); 19] = [
    ("gender", FieldKind::Text),
    ("SeniorCitizen", FieldKind::Integer),
    ("Partner", FieldKind::Text),
    ("Dependents", FieldKind::Text),
    ("tenure", FieldKind::Integer),
    ("PhoneService", FieldKind::Text),
    ("MultipleLines", FieldKind::Text),
    ("InternetService", FieldKind::Text),
    ("OnlineSecurity", FieldKind::Text),
    ("OnlineBackup", FieldKind::Text),
    ("DeviceProtection", FieldKind::Text),
    ("TechSupport", FieldKind::Text),
    ("StreamingTV", FieldKind::Text),
    ("StreamingMovies", FieldKind::Text),
    ("Contract", FieldKind::Text),
    ("PaperlessBilling", FieldKind::Text),
    ("PaymentMethod", FieldKind::Text),
    ("MonthlyCharges", FieldKind::Float),
    ("TotalCharges", FieldKind::Float),
];

/// Validates a whole batch. No records are returned unless all are valid.
pub fn validate_batch(body: &Value) -> Result<Vec<CustomerRecord>, ApiError> {
    let items = body.as_array().ok_or_else(|| {
        ApiError::invalid(ValidationIssue::new(
            vec!["body".into()],
            "list_type",
            "Input should be a valid list",
        ))
    })?;

    let mut issues = Vec::new();
    let mut records = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        match validate_record(index, item) {
            Ok(record) => records.push(record),
            Err(mut found) => issues.append(&mut found),
        }
    }

    if issues.is_empty() {
        Ok(records)
    } else {
        Err(ApiError::Validation(issues))
    }
}

fn validate_record(index: usize, item: &Value) -> Result<CustomerRecord, Vec<ValidationIssue>> {
    let loc = |field: Option<&str>| {
        let mut loc: Vec<LocPart> = vec!["body".into(), index.into()];
        if let Some(field) = field {
            loc.push(field.into());
        }
        loc
    };

    let object = item.as_object().ok_or_else(|| {
        vec![ValidationIssue::new(
            loc(None),
            "dict_type",
            "Input should be a valid dictionary",
        )]
    })?;

    let mut issues = Vec::new();
    let mut coerced = Map::new();

    for (name, kind) in FIELDS {
        let Some(raw) = object.get(name) else {
            issues.push(ValidationIssue::new(loc(Some(name)), "missing", "Field required"));
            continue;
        };
        match coerce(kind, raw) {
            Ok(value) => {
                coerced.insert(name.to_string(), value);
            }
            Err((kind, msg)) => issues.push(ValidationIssue::new(loc(Some(name)), kind, msg)),
        }
    }

    if !issues.is_empty() {
        return Err(issues);
    }

    serde_json::from_value(Value::Object(coerced)).map_err(|e| {
        vec![ValidationIssue::new(loc(None), "model_type", e.to_string())]
    })
}

type Rejection = (&'static str, &'static str);

fn coerce(kind: FieldKind, raw: &Value) -> Result<Value, Rejection> {
    match kind {
        FieldKind::Text => match raw {
            Value::String(_) => Ok(raw.clone()),
            _ => Err(("string_type", "Input should be a valid string")),
        },
        FieldKind::Integer => coerce_integer(raw).map(Value::from),
        FieldKind::Float => {
            let value = coerce_float(raw)?;
            Number::from_f64(value)
                .map(Value::Number)
                .ok_or(("finite_number", "Input should be a finite number"))
        }
    }
}

fn coerce_integer(raw: &Value) -> Result<i64, Rejection> {
    const NOT_INTEGER: Rejection = ("int_parsing", "Input should be a valid integer");
    const FRACTIONAL: Rejection = (
        "int_from_float",
        "Input should be a valid integer, got a number with a fractional part",
    );

    match raw {
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            let f = n.as_f64().ok_or(NOT_INTEGER)?;
            whole_number(f).ok_or(FRACTIONAL)
        }
        Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                return Ok(i);
            }
            let f: f64 = s.parse().map_err(|_| NOT_INTEGER)?;
            whole_number(f).ok_or(FRACTIONAL)
        }
        _ => Err(("int_type", "Input should be a valid integer")),
    }
}

fn whole_number(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn coerce_float(raw: &Value) -> Result<f64, Rejection> {
    let value = match raw {
        Value::Bool(b) => Some(f64::from(u8::from(*b))),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => return Err(("float_type", "Input should be a valid number")),
    };
    match value {
        Some(f) if f.is_finite() => Ok(f),
        Some(_) => Err(("finite_number", "Input should be a finite number")),
        None => Err((
            "float_parsing",
            "Input should be a valid number, unable to parse string as a number",
        )),
    }
}
