//! Shapes of the observed service's comment listings.
//!
//! The service is loose about types (ids and counters arrive as numbers or as numeric
//! strings, lists may be `null`), so everything but the comment id is parsed leniently
//! and defaults when absent.

use anyhow::{anyhow, Context};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::CommentId;

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct RawListing {
    #[serde(default)]
    pub comments: Option<Vec<RawComment>>,
    #[serde(default)]
    pub reply_comments: Option<Vec<RawComment>>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub total: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub cursor: u64,
    #[serde(default, deserialize_with = "truthy")]
    pub has_more: bool,
}

impl RawListing {
    pub fn parse(body: &Value) -> anyhow::Result<RawListing> {
        if !body.is_object() {
            return Err(anyhow!("listing body is not a json object"));
        }
        RawListing::deserialize(body).context("parsing comment listing")
    }

    /// Top-level listings carry `comments`, reply listings `reply_comments`
    pub fn records(&self) -> &[RawComment] {
        self.comments
            .as_deref()
            .or(self.reply_comments.as_deref())
            .unwrap_or(&[])
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct RawUser {
    #[serde(default, deserialize_with = "lenient_string")]
    pub unique_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub nickname: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RawComment {
    #[serde(deserialize_with = "comment_id")]
    pub cid: CommentId,
    #[serde(default)]
    pub user: Option<RawUser>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub digg_count: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub reply_comment_total: u64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub create_time: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub reply_id: Option<String>,
    #[serde(default, deserialize_with = "truthy")]
    pub is_author_digged: bool,
    #[serde(default)]
    pub reply_comment: Option<Vec<RawComment>>,
}

impl RawComment {
    pub fn handle(&self) -> &str {
        self.user
            .as_ref()
            .and_then(|u| u.unique_id.as_deref())
            .unwrap_or("")
    }

    pub fn display_name(&self) -> &str {
        self.user
            .as_ref()
            .and_then(|u| u.nickname.as_deref())
            .unwrap_or("")
    }

    /// The comment this one answers, as declared by the record itself
    pub fn declared_parent(&self) -> Option<CommentId> {
        match self.reply_id.as_deref() {
            None | Some("") | Some("0") => None,
            Some(id) => Some(CommentId::from(id)),
        }
    }

    pub fn inline_replies(&self) -> &[RawComment] {
        self.reply_comment.as_deref().unwrap_or(&[])
    }
}

fn comment_id<'de, D: Deserializer<'de>>(d: D) -> Result<CommentId, D::Error> {
    use serde::de::Error;
    match Value::deserialize(d)? {
        Value::String(s) if !s.is_empty() => Ok(CommentId(s)),
        Value::Number(n) => Ok(CommentId(n.to_string())),
        other => Err(D::Error::custom(format!("invalid comment id {other}"))),
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_u64<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.).map(|f| f as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

fn lenient_i64<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

fn truthy<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_f64().map_or(false, |f| f != 0.),
        Some(Value::String(s)) => !s.is_empty() && s != "0",
        _ => false,
    })
}
