//! Translation overlay stored in every content row's `translations` column.
//!
//! The persisted shape is `{ "<locale>": { "<field>": <value>, ... } }`. A
//! missing locale or a missing field means "inherit the base column".

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::Locale;

/// Per-locale partial overrides of a record's localizable fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Translations(BTreeMap<String, Map<String, Value>>);

impl Translations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lenient decode of a raw JSON column. Anything that is not an object of
    /// objects is ignored rather than rejected.
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };
        let entries = object
            .iter()
            .filter_map(|(locale, fields)| {
                fields
                    .as_object()
                    .map(|fields| (locale.clone(), fields.clone()))
            })
            .collect();
        Translations(entries)
    }

    pub fn get(&self, locale: Locale) -> Option<&Map<String, Value>> {
        self.0.get(locale.as_str())
    }

    /// Override for a single field, if present and not null.
    pub fn field(&self, locale: Locale, field: &str) -> Option<&Value> {
        self.get(locale)
            .and_then(|fields| fields.get(field))
            .filter(|value| !value.is_null())
    }

    pub fn set(&mut self, locale: Locale, fields: Map<String, Value>) {
        self.0.insert(locale.as_str().to_string(), fields);
    }

    pub fn with(mut self, locale: Locale, fields: Map<String, Value>) -> Self {
        self.set(locale, fields);
        self
    }

    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(locale, fields)| (locale.clone(), Value::Object(fields.clone())))
                .collect(),
        )
    }
}

/// A row type whose serialized form carries a `translations` key and a fixed
/// set of localizable fields.
pub trait Localizable: Serialize + DeserializeOwned + Clone {
    const LOCALIZED_FIELDS: &'static [&'static str];
}

/// Returns `record` with each of `fields` replaced by the locale's override
/// when one exists. The default locale is never overlaid.
pub fn apply_translations(record: &Value, locale: Locale, fields: &[&str]) -> Value {
    if locale.is_default() {
        return record.clone();
    }
    let Some(object) = record.as_object() else {
        return record.clone();
    };

    let mut localized = object.clone();
    let overrides = object
        .get("translations")
        .and_then(|t| t.get(locale.as_str()))
        .and_then(Value::as_object);

    if let Some(overrides) = overrides {
        for field in fields {
            if let Some(value) = overrides.get(*field).filter(|v| !v.is_null()) {
                localized.insert((*field).to_string(), value.clone());
            }
        }
    }

    Value::Object(localized)
}

/// Typed wrapper over [`apply_translations`].
///
/// Overrides are applied field by field. A scalar standing in for a string
/// column (`"year": 2024`) is read as its text; any other override that does
/// not fit the row type is skipped on its own, leaving the rest of the
/// locale's overrides in place.
pub fn localize<T: Localizable>(record: &T, locale: Locale) -> T {
    if locale.is_default() {
        return record.clone();
    }
    let value = match serde_json::to_value(record) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "failed to serialize record for localization");
            return record.clone();
        }
    };
    let Some(base) = value.as_object() else {
        return record.clone();
    };
    let Some(overrides) = base
        .get("translations")
        .and_then(|t| t.get(locale.as_str()))
        .and_then(Value::as_object)
    else {
        return record.clone();
    };

    let mut localized = base.clone();
    for field in T::LOCALIZED_FIELDS {
        let Some(value) = overrides.get(*field).filter(|v| !v.is_null()) else {
            continue;
        };
        let value = coerce_to_base(localized.get(*field), value);
        let previous = localized.insert((*field).to_string(), value);
        if serde_json::from_value::<T>(Value::Object(localized.clone())).is_err() {
            tracing::warn!(
                locale = %locale,
                field = *field,
                "translation override has the wrong type, keeping base value"
            );
            match previous {
                Some(previous) => localized.insert((*field).to_string(), previous),
                None => localized.remove(*field),
            };
        }
    }

    serde_json::from_value(Value::Object(localized)).unwrap_or_else(|_| record.clone())
}

/// Numbers and booleans overriding a string column become their text.
fn coerce_to_base(base: Option<&Value>, value: &Value) -> Value {
    match (base, value) {
        (Some(Value::String(_)), Value::Number(n)) => Value::String(n.to_string()),
        (Some(Value::String(_)), Value::Bool(b)) => Value::String(b.to_string()),
        _ => value.clone(),
    }
}

/// Returns a copy of `existing` with the entry for `locale` replaced by
/// `new_data` restricted to `fields`. Other locales are untouched.
pub fn upsert_translations(
    existing: &Translations,
    locale: Locale,
    new_data: &Map<String, Value>,
    fields: &[&str],
) -> Translations {
    let entry = fields
        .iter()
        .filter_map(|field| {
            new_data
                .get(*field)
                .filter(|value| !value.is_null())
                .map(|value| ((*field).to_string(), value.clone()))
        })
        .collect();

    let mut updated = existing.clone();
    updated.set(locale, entry);
    updated
}

/// Translations after an edit made in `locale`.
///
/// Default-locale edits mirror the full base snapshot into the default
/// entry. Other locales merge `provided` over their existing entry.
pub fn translations_after_edit(
    existing: &Translations,
    locale: Locale,
    provided: &Map<String, Value>,
    base_snapshot: &Map<String, Value>,
    fields: &[&str],
) -> Translations {
    if locale.is_default() {
        return upsert_translations(existing, locale, base_snapshot, fields);
    }
    let mut merged = existing.get(locale).cloned().unwrap_or_default();
    for (key, value) in provided {
        merged.insert(key.clone(), value.clone());
    }
    upsert_translations(existing, locale, &merged, fields)
}
