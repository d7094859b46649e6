use serde::{Deserialize, Deserializer};

/// Decodes an explicit `null` the same way as a missing field.
///
/// Both Honeycomb and model servers send `null` for empty lists, structs and
/// strings; pair with `#[serde(default)]` so absent fields work too.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
