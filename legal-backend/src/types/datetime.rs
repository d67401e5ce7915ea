use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// ポリシー承認日時の保存形式（ISO-8601、UTCオフセット付き）
pub const ACCEPTANCE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// 承認日時を属性値として保存する文字列に変換
pub fn acceptance_timestamp(at: DateTime<Utc>) -> String {
    at.format(ACCEPTANCE_TIMESTAMP_FORMAT).to_string()
}

/// 保存済みの承認日時を読み取る。RFC 3339 形式も受け付ける
pub fn parse_acceptance_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(value, ACCEPTANCE_TIMESTAMP_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// APIレスポンス用のUNIX秒タイムスタンプ
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn inner(&self) -> DateTime<Utc> {
        self.0
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.timestamp().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let timestamp = i64::deserialize(deserializer)?;
        DateTime::from_timestamp(timestamp, 0)
            .map(Self)
            .ok_or_else(|| serde::de::Error::custom("Invalid timestamp"))
    }
}

pub mod optional_timestamp {
    use super::*;

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(dt) => dt.timestamp().serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<i64>::deserialize(deserializer)? {
            Some(ts) => DateTime::from_timestamp(ts, 0)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom("Invalid timestamp")),
            None => Ok(None),
        }
    }
}
