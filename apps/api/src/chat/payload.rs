//! Conversation turn and payload types.
//!
//! Wire format (JSONB column and API bodies):
//! - message: `{"type":"message","data":{"message":"..."}}`
//! - image: `{"type":"image_url","data":"https://..."}`
//! - confirmation: `{"type":"confirmation_request","request_type":"delete_expenses","data":{"message":"...","data":...}}`

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::extraction::types::{InsertCandidates, QueryCriteria, UpdateCandidate};
use crate::models::expense::ExpenseSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
    #[serde(rename = "insert_expenses")]
    Insert,
    #[serde(rename = "query_expenses")]
    Query,
    #[serde(rename = "update_expenses")]
    Update,
    #[serde(rename = "delete_expenses")]
    Delete,
}

/// The record an update targets, paired with the proposed new values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProposal {
    pub original: ExpenseSummary,
    pub changes: UpdateCandidate,
}

/// Intent-specific parameters awaiting an explicit apply call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StagedAction {
    Insert(InsertCandidates),
    Query(QueryCriteria),
    Update(UpdateProposal),
    Delete(Vec<ExpenseSummary>),
}

impl StagedAction {
    pub fn request_type(&self) -> RequestType {
        match self {
            StagedAction::Insert(_) => RequestType::Insert,
            StagedAction::Query(_) => RequestType::Query,
            StagedAction::Update(_) => RequestType::Update,
            StagedAction::Delete(_) => RequestType::Delete,
        }
    }

    fn from_value(request_type: RequestType, data: Value) -> serde_json::Result<Self> {
        Ok(match request_type {
            RequestType::Insert => StagedAction::Insert(serde_json::from_value(data)?),
            RequestType::Query => StagedAction::Query(serde_json::from_value(data)?),
            RequestType::Update => StagedAction::Update(serde_json::from_value(data)?),
            RequestType::Delete => StagedAction::Delete(serde_json::from_value(data)?),
        })
    }
}

/// A staged, unapplied proposal plus the prompt shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub prompt: String,
    pub action: StagedAction,
}

/// Typed content of one conversation turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPayload {
    PlainMessage { text: String },
    ImageReference { url: String },
    ConfirmationRequest(Confirmation),
}

impl ContentPayload {
    pub fn message(text: impl Into<String>) -> Self {
        ContentPayload::PlainMessage { text: text.into() }
    }

    pub fn confirmation(prompt: impl Into<String>, action: StagedAction) -> Self {
        ContentPayload::ConfirmationRequest(Confirmation {
            prompt: prompt.into(),
            action,
        })
    }
}

#[derive(Serialize)]
struct MessageBody<'a> {
    message: &'a str,
}

#[derive(Serialize)]
struct ConfirmationBody<'a> {
    message: &'a str,
    data: &'a StagedAction,
}

impl Serialize for ContentPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ContentPayload::PlainMessage { text } => {
                let mut s = serializer.serialize_struct("ContentPayload", 2)?;
                s.serialize_field("type", "message")?;
                s.serialize_field("data", &MessageBody { message: text })?;
                s.end()
            }
            ContentPayload::ImageReference { url } => {
                let mut s = serializer.serialize_struct("ContentPayload", 2)?;
                s.serialize_field("type", "image_url")?;
                s.serialize_field("data", url)?;
                s.end()
            }
            ContentPayload::ConfirmationRequest(confirmation) => {
                let mut s = serializer.serialize_struct("ContentPayload", 3)?;
                s.serialize_field("type", "confirmation_request")?;
                s.serialize_field("request_type", &confirmation.action.request_type())?;
                s.serialize_field(
                    "data",
                    &ConfirmationBody {
                        message: &confirmation.prompt,
                        data: &confirmation.action,
                    },
                )?;
                s.end()
            }
        }
    }
}

#[derive(Deserialize)]
struct RawPayload {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    request_type: Option<RequestType>,
    #[serde(default)]
    data: Value,
}

#[derive(Deserialize)]
struct RawConfirmationBody {
    message: String,
    #[serde(default)]
    data: Value,
}

impl<'de> Deserialize<'de> for ContentPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawPayload::deserialize(deserializer)?;
        match raw.kind.as_str() {
            "message" => {
                let text = raw
                    .data
                    .get("message")
                    .and_then(Value::as_str)
                    .ok_or_else(|| D::Error::missing_field("data.message"))?;
                Ok(ContentPayload::message(text))
            }
            "image_url" => {
                let url = raw
                    .data
                    .as_str()
                    .ok_or_else(|| D::Error::custom("image_url data must be a string"))?;
                Ok(ContentPayload::ImageReference {
                    url: url.to_string(),
                })
            }
            "confirmation_request" => {
                let request_type = raw
                    .request_type
                    .ok_or_else(|| D::Error::missing_field("request_type"))?;
                let body: RawConfirmationBody =
                    serde_json::from_value(raw.data).map_err(D::Error::custom)?;
                let action =
                    StagedAction::from_value(request_type, body.data).map_err(D::Error::custom)?;
                Ok(ContentPayload::confirmation(body.message, action))
            }
            other => Err(D::Error::unknown_variant(
                other,
                &["message", "image_url", "confirmation_request"],
            )),
        }
    }
}

/// One persisted entry in a user's conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationTurn {
    pub id: i64,
    #[serde(skip)]
    pub user_id: i64,
    pub role: Role,
    pub content: ContentPayload,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// The user turn and the assistant reply produced for one inbound message.
#[derive(Debug, Clone, Serialize)]
pub struct ChatExchange {
    pub user_message: ConversationTurn,
    pub assistant_message: ConversationTurn,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::types::ExpenseCandidate;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn test_plain_message_wire_shape() {
        let value = serde_json::to_value(ContentPayload::message("xin chào")).unwrap();
        assert_eq!(value, json!({"type": "message", "data": {"message": "xin chào"}}));
    }

    #[test]
    fn test_image_reference_wire_shape() {
        let payload = ContentPayload::ImageReference {
            url: "https://cdn/receipts/1/a.jpg".to_string(),
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({"type": "image_url", "data": "https://cdn/receipts/1/a.jpg"})
        );
        let back: ContentPayload = serde_json::from_value(value).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn test_insert_confirmation_wire_shape() {
        let payload = ContentPayload::confirmation(
            "Các khoản dưới đây đã được ghi nhận, bạn có muốn thêm không?",
            StagedAction::Insert(InsertCandidates {
                expenses: vec![ExpenseCandidate {
                    description: Some("cà phê".to_string()),
                    amount: Some(-30000),
                    expense_date: None,
                }],
            }),
        );
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["type"], "confirmation_request");
        assert_eq!(value["request_type"], "insert_expenses");
        assert_eq!(value["data"]["data"]["expenses"][0]["amount"], -30000);
        assert!(value["data"]["data"]["expenses"][0]["expense_date"].is_null());
    }

    #[test]
    fn test_delete_confirmation_decodes_from_stored_json() {
        let stored = json!({
            "type": "confirmation_request",
            "request_type": "delete_expenses",
            "data": {
                "message": "Tìm thấy 1 khoản chi. Bạn có chắc chắn muốn xóa chúng không?",
                "data": [{"id": 7, "description": "taxi", "amount": -80000, "expense_date": "2025-06-02"}]
            }
        });
        let payload: ContentPayload = serde_json::from_value(stored).unwrap();
        match payload {
            ContentPayload::ConfirmationRequest(c) => {
                assert_eq!(c.action.request_type(), RequestType::Delete);
                let StagedAction::Delete(rows) = c.action else {
                    panic!("expected delete action");
                };
                assert_eq!(rows[0].id, 7);
                assert_eq!(rows[0].expense_date, NaiveDate::from_ymd_opt(2025, 6, 2).unwrap());
            }
            other => panic!("expected confirmation, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_payload_type_is_rejected() {
        let result: Result<ContentPayload, _> =
            serde_json::from_value(json!({"type": "sticker", "data": "x"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_role_round_trips_through_str() {
        assert_eq!("assistant".parse::<Role>().unwrap(), Role::Assistant);
        assert_eq!(Role::User.as_str(), "user");
        assert!("system".parse::<Role>().is_err());
    }
}
