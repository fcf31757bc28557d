//! Maps keyed by chain ids or addresses, written with string keys.
//!
//! Keys are written in sorted order so a saved config diffs cleanly. On read, two spellings of
//! the same key (`"1"` and `"01"`, or differently cased addresses) are rejected instead of one
//! silently winning.

use alloy::primitives::map::HashMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error};
use std::{collections::BTreeMap, fmt::Display, hash::Hash, str::FromStr};

/// Serializes a [`HashMap`] as an object with stringified, sorted keys.
pub fn serialize<S, K, V>(map: &HashMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
where
    K: ToString,
    V: Serialize,
    S: Serializer,
{
    map.iter().map(|(k, v)| (k.to_string(), v)).collect::<BTreeMap<_, _>>().serialize(serializer)
}

/// Deserializes an object into a [`HashMap`], parsing each key.
pub fn deserialize<'de, K, V, D>(deserializer: D) -> Result<HashMap<K, V>, D::Error>
where
    K: FromStr<Err: Display> + Hash + Eq + Display,
    V: Deserialize<'de>,
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, V>::deserialize(deserializer)?;
    let mut map = HashMap::with_capacity_and_hasher(raw.len(), Default::default());
    for (key, value) in raw {
        let key = K::from_str(&key).map_err(|err| D::Error::custom(format!("{key}: {err}")))?;
        if map.contains_key(&key) {
            return Err(D::Error::custom(format!("duplicate key {key}")));
        }
        map.insert(key, value);
    }
    Ok(map)
}
