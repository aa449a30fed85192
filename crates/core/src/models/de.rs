//! Lenient field deserializers shared by the models.

use serde::{Deserialize, Deserializer};

/// Seconds as a finite, non-negative `f64`. `null`, negative and
/// non-finite values read as `0.0`.
pub(crate) fn non_negative_seconds<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0);
    Ok(if value.is_finite() { value.max(0.0) } else { 0.0 })
}

/// `T::default()` for an explicit `null`.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
