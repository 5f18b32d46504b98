// SPDX-License-Identifier: Apache-2.0

//! Canonical JSON (sorted object keys) and the opaque pagination cursor codec.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::Error;

pub fn stable_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, Error> {
    let raw = serde_json::to_value(value).map_err(Error::CursorEncode)?;
    serde_json::to_vec(&normalize_json_value(raw)).map_err(Error::CursorEncode)
}

pub fn encode_cursor_payload<T: Serialize>(payload: &T) -> Result<String, Error> {
    let bytes = stable_json_bytes(payload)?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

pub fn decode_cursor_payload<T: DeserializeOwned>(token: &str) -> Result<T, Error> {
    let bytes = URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|e| Error::CursorNotBase64(e.to_string()))?;
    serde_json::from_slice::<T>(&bytes).map_err(|e| Error::CursorPayload(e.to_string()))
}

fn normalize_json_value(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map
                .into_iter()
                .map(|(k, v)| (k, normalize_json_value(v)))
                .collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (k, v) in entries {
                sorted.insert(k, v);
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_json_value).collect()),
        other => other,
    }
}
