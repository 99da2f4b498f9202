//! Walks the two JSON-encoded city columns of a dentist row.
//!
//! `cities_served` is a JSON array of strings (a handful of legacy rows hold
//! a bare JSON string instead), `locations` is a JSON array of open objects
//! with an optional `"city"` key. Only city strings are rewritten; every
//! other key, value and ordering survives byte-for-byte. A column that fails
//! to decode is skipped and counted, never fatal for the row.

use serde_json::Value;

use crate::normalize::CityRules;

/// Outcome of repairing one row's city columns.
///
/// `cities` / `locations` carry the re-encoded JSON only when the column
/// actually changed, so the runner issues one UPDATE per changed column and
/// none for clean rows.
#[derive(Debug, Default)]
pub struct FieldRepair {
    pub cities: Option<String>,
    pub locations: Option<String>,
    /// Number of columns (0..=2) that held undecodable JSON and were skipped.
    pub malformed: usize,
}

impl FieldRepair {
    pub fn changed(&self) -> bool {
        self.cities.is_some() || self.locations.is_some()
    }
}

/// Decode an optional JSON column. `None`/empty is a valid absent field;
/// a present but unparseable payload is an explicit error the caller must
/// decide about (skip + count, per the error policy).
fn decode_column(raw: Option<&str>) -> Result<Option<Value>, serde_json::Error> {
    match raw {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => serde_json::from_str(s).map(Some),
    }
}

/// Run the normalizer over both city columns of a row.
pub fn repair_city_fields(
    rules: &CityRules,
    raw_cities: Option<&str>,
    raw_locations: Option<&str>,
) -> FieldRepair {
    let mut repair = FieldRepair::default();

    match decode_column(raw_cities) {
        Ok(Some(mut value)) => {
            if repair_cities_value(rules, &mut value) {
                repair.cities = encode(&value);
            }
        }
        Ok(None) => {}
        Err(err) => {
            log::debug!("skipping undecodable cities_served column: {err}");
            repair.malformed += 1;
        }
    }

    match decode_column(raw_locations) {
        Ok(Some(mut value)) => {
            if repair_locations_value(rules, &mut value) {
                repair.locations = encode(&value);
            }
        }
        Ok(None) => {}
        Err(err) => {
            log::debug!("skipping undecodable locations column: {err}");
            repair.malformed += 1;
        }
    }

    repair
}

fn encode(value: &Value) -> Option<String> {
    // Value -> String cannot fail for tree-shaped data; treat a failure as
    // "no change" rather than aborting the row.
    serde_json::to_string(value).ok()
}

/// Normalize every string in a cities value. Accepts the array form and the
/// legacy bare-string form; anything else is left untouched.
fn repair_cities_value(rules: &CityRules, value: &mut Value) -> bool {
    let mut changed = false;
    match value {
        Value::Array(items) => {
            for item in items.iter_mut() {
                if let Value::String(city) = item {
                    let (fixed, did_change) = rules.apply(city);
                    if did_change {
                        *city = fixed;
                        changed = true;
                    }
                }
            }
        }
        Value::String(city) => {
            let (fixed, did_change) = rules.apply(city);
            if did_change {
                *city = fixed;
                changed = true;
            }
        }
        _ => {}
    }
    changed
}

/// Normalize the `"city"` key of every location object, leaving all sibling
/// keys (and, with `preserve_order`, their order) untouched.
fn repair_locations_value(rules: &CityRules, value: &mut Value) -> bool {
    let Value::Array(locations) = value else {
        return false;
    };

    let mut changed = false;
    for location in locations.iter_mut() {
        let Value::Object(map) = location else {
            continue;
        };
        let Some(Value::String(city)) = map.get_mut("city") else {
            continue;
        };
        if city.is_empty() {
            continue;
        }
        let (fixed, did_change) = rules.apply(city);
        if did_change {
            *city = fixed;
            changed = true;
        }
    }
    changed
}
