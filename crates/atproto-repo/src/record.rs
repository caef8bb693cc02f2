//! Record block to JSON conversion
//!
//! Follows the atproto data model JSON mapping: CIDs become `{"$link": ...}`
//! and byte strings become `{"$bytes": ...}` (base64, no padding).

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use ipld_core::ipld::Ipld;
use serde_json::{Map, Number, Value};

use crate::error::{RepoError, Result};

/// Decode a DAG-CBOR record block into JSON
pub fn decode_record(block: &[u8]) -> Result<Value> {
    let ipld: Ipld =
        serde_ipld_dagcbor::from_slice(block).map_err(|e| RepoError::Decode(e.to_string()))?;
    ipld_to_json(&ipld)
}

/// Convert an IPLD value into its atproto JSON form
pub fn ipld_to_json(ipld: &Ipld) -> Result<Value> {
    Ok(match ipld {
        Ipld::Null => Value::Null,
        Ipld::Bool(b) => Value::Bool(*b),
        Ipld::Integer(i) => integer_to_json(*i)?,
        Ipld::Float(f) => Number::from_f64(*f)
            .map(Value::Number)
            .ok_or_else(|| RepoError::Decode(format!("non-finite float {f}")))?,
        Ipld::String(s) => Value::String(s.clone()),
        Ipld::Bytes(b) => single("$bytes", Value::String(STANDARD_NO_PAD.encode(b))),
        Ipld::List(items) => Value::Array(items.iter().map(ipld_to_json).collect::<Result<_>>()?),
        Ipld::Map(map) => {
            let mut obj = Map::new();
            for (k, v) in map {
                obj.insert(k.clone(), ipld_to_json(v)?);
            }
            Value::Object(obj)
        }
        Ipld::Link(cid) => single("$link", Value::String(cid.to_string())),
    })
}

fn integer_to_json(i: i128) -> Result<Value> {
    if let Ok(v) = i64::try_from(i) {
        return Ok(Value::Number(v.into()));
    }
    u64::try_from(i)
        .map(|v| Value::Number(v.into()))
        .map_err(|_| RepoError::Decode(format!("integer {i} out of range")))
}

fn single(key: &str, value: Value) -> Value {
    let mut obj = Map::new();
    obj.insert(key.to_string(), value);
    Value::Object(obj)
}
