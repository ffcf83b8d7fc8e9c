use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Player identifier as used in `/players/{id}`.
///
/// The ladder server hands these out as integers, but older fixtures use
/// strings, so both are accepted and kept in textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        PlayerId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PlayerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        string_or_number(deserializer).map(PlayerId)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Str(String),
    Int(i64),
    UInt(u64),
    Float(f64),
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Str(s) => s,
        StringOrNumber::Int(i) => i.to_string(),
        StringOrNumber::UInt(u) => u.to_string(),
        StringOrNumber::Float(f) => f.to_string(),
    })
}

/// A ladder member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PlayerId>,
    pub name: String,
    /// Go rank: negative values are kyu, zero and above are dan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<f64>,
    /// American Go Association membership number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aga_id: Option<i64>,
    /// Fields the client does not model; sent back untouched on update.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Player {
    #[allow(dead_code)]
    pub fn new(name: impl Into<String>) -> Self {
        Player {
            id: None,
            name: name.into(),
            rank: None,
            aga_id: None,
            extra: serde_json::Map::new(),
        }
    }
}

/// A single recorded game between the black and the white side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    #[serde(deserialize_with = "string_or_number")]
    pub black: String,
    #[serde(deserialize_with = "string_or_number")]
    pub white: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub white_won: Option<bool>,
    /// When the game was recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
}

impl MatchResult {
    pub fn new(black: impl Into<String>, white: impl Into<String>) -> Self {
        MatchResult {
            black: black.into(),
            white: white.into(),
            white_won: None,
            time: None,
        }
    }
}

/// Body of the results endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsCollection {
    #[serde(default)]
    pub results: Vec<MatchResult>,
}

impl ResultsCollection {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl From<Vec<MatchResult>> for ResultsCollection {
    fn from(results: Vec<MatchResult>) -> Self {
        ResultsCollection { results }
    }
}

/// Ladder standings, best player first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Standings {
    #[serde(default)]
    pub standings: Vec<Player>,
}
