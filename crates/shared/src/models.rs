//! Identifiers, cache topics and user-facing notifications.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Identifier of a backend entity.
///
/// The backend is not consistent about sending ids as numbers or strings,
/// so both `42` and `"42"` decode to the same value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Int(n) => Ok(Self(n.to_string())),
            Raw::Text(s) if s.trim().is_empty() => {
                Err(serde::de::Error::custom("entity id must not be empty"))
            }
            Raw::Text(s) => Ok(Self(s)),
        }
    }
}

/// Decodes an optional id field, treating values that cannot name an entity
/// (blank strings, fractional numbers, objects) as absent.
///
/// Use with `#[serde(default, deserialize_with = "optional_id")]` on fields
/// where a missing id falls back to a broader cache topic.
pub fn optional_id<'de, D>(deserializer: D) -> Result<Option<EntityId>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(entity_id_from_value))
}

fn entity_id_from_value(value: &serde_json::Value) -> Option<EntityId> {
    use serde_json::Value;

    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(EntityId::new(i.to_string()))
            } else if let Some(u) = n.as_u64() {
                Some(EntityId::from(u))
            } else {
                // 42.0 is still case 42.
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                    .map(|f| EntityId::new(format!("{}", f as i64)))
            }
        }
        Value::String(s) if !s.trim().is_empty() => Some(EntityId::new(s.clone())),
        _ => None,
    }
}

/// Kinds of entity that have both a collection and a per-entity cache topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Regulation,
    Case,
    Client,
    Document,
}

impl EntityKind {
    /// Path segment of the collection topic.
    pub fn collection(self) -> &'static str {
        match self {
            EntityKind::Regulation => "regulations",
            EntityKind::Case => "cases",
            EntityKind::Client => "clients",
            EntityKind::Document => "documents",
        }
    }
}

/// Topic under which the read cache stores one unit of fetched data.
///
/// Rendered with [`fmt::Display`] as a slash separated path, e.g. `cases`,
/// `cases/42` or `cases/42/documents`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Every entity of a kind, e.g. the case list.
    Collection(EntityKind),
    /// A single entity.
    Entity(EntityKind, EntityId),
    /// Documents attached to a case.
    CaseDocuments(EntityId),
    /// AI suggestions scoped to a case.
    CaseSuggestions(EntityId),
    /// AI suggestions across all cases.
    Suggestions,
    /// The notifications/alerts list.
    Alerts,
}

impl CacheKey {
    /// The specific key when an id is known, otherwise the collection key.
    pub fn entity_or_collection(kind: EntityKind, id: Option<EntityId>) -> Self {
        match id {
            Some(id) => CacheKey::Entity(kind, id),
            None => CacheKey::Collection(kind),
        }
    }

    /// Suggestions for a case when one is named, otherwise all suggestions.
    pub fn suggestions_for(case_id: Option<EntityId>) -> Self {
        match case_id {
            Some(id) => CacheKey::CaseSuggestions(id),
            None => CacheKey::Suggestions,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Collection(kind) => f.write_str(kind.collection()),
            CacheKey::Entity(kind, id) => write!(f, "{}/{}", kind.collection(), id),
            CacheKey::CaseDocuments(id) => write!(f, "cases/{}/documents", id),
            CacheKey::CaseSuggestions(id) => write!(f, "cases/{}/suggestions", id),
            CacheKey::Suggestions => f.write_str("suggestions"),
            CacheKey::Alerts => f.write_str("alerts"),
        }
    }
}

/// A user-visible toast/snackbar message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}
