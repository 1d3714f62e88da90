pub mod activity;
pub mod chart;
pub mod group;
pub mod task;
pub mod user;

pub use activity::*;
pub use chart::*;
pub use group::*;
pub use task::*;
pub use user::*;

/// Coerção de campos na fronteira com o banco: documentos antigos podem ter
/// campos nulos ou numéricos gravados como double.
pub(crate) mod coerce {
    use mongodb::bson::{Bson, DateTime as BsonDateTime};
    use serde::{Deserialize, Deserializer};

    /// `null` vira o valor default do tipo
    pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + Default,
    {
        Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
    }

    /// Aceita inteiro ou double; `null` vira 0
    pub fn lenient_integer<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<f64>::deserialize(deserializer)?
            .map(|value| value.round() as i64)
            .unwrap_or(0))
    }

    /// Data BSON, string RFC 3339 ou millis desde epoch; qualquer outro
    /// valor vira `None`
    pub fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<BsonDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Bson>::deserialize(deserializer)? {
            Some(Bson::DateTime(ts)) => Some(ts),
            Some(Bson::Timestamp(ts)) => Some(BsonDateTime::from_millis(ts.time as i64 * 1000)),
            Some(Bson::String(text)) => chrono::DateTime::parse_from_rfc3339(text.trim())
                .ok()
                .map(|dt| BsonDateTime::from_millis(dt.timestamp_millis())),
            Some(Bson::Int64(millis)) => Some(BsonDateTime::from_millis(millis)),
            Some(Bson::Int32(millis)) => Some(BsonDateTime::from_millis(millis as i64)),
            Some(Bson::Double(millis)) if millis.is_finite() => Some(BsonDateTime::from_millis(millis as i64)),
            _ => None,
        })
    }
}
