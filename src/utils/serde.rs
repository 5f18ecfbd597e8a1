/*!
 * Serde utilities for common serialization/deserialization patterns.
 *
 * Helpers shared by the archive object model where the stored JSON shape is
 * fixed by other writers and differs from the natural Rust representation.
 */

/// Maps `Option<T>` to a string field where the empty string means "none".
///
/// Writers store a newly created object's `prior_status` as `""` rather than
/// omitting it or writing `null`. All three forms read back as `None`; `None`
/// is always written as `""`.
///
/// # Usage with serde
///
/// ```rust
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Record {
///     #[serde(default, with = "changeflow_core::utils::serde::empty_string_as_none")]
///     previous: Option<String>,
/// }
/// ```
pub mod empty_string_as_none {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::fmt::Display;

    pub fn serialize<S, T>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Display,
    {
        match value {
            Some(inner) => serializer.collect_str(inner),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: From<String>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.filter(|s| !s.trim().is_empty()).map(T::from))
    }
}
