//! Purpose: Typed records and request payloads of the board REST contract.
//! Exports: `Identity`, `Post`, `Comment`, `UserSummary`, payload structs, `ListItem`, `Editable`.
//! Role: Wire shapes decoded from envelope `data` and encoded into request bodies.
//! Invariants: Field names follow the service's camelCase JSON.
//! Invariants: Unknown response fields are kept in `extra` rather than dropped.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::core::ident::LooseId;

/// A record that lives in a paged list.
pub trait ListItem {
    fn item_id(&self) -> i64;
}

/// A list item the ownership gate applies to.
pub trait Editable: ListItem {
    fn owner_id(&self) -> Option<&LooseId>;

    /// Text an edit starts from.
    fn editable_content(&self) -> &str;

    fn update_payload(draft: &str) -> Value {
        json!({ "content": draft })
    }

    /// Body of a create call for already-trimmed content.
    fn create_payload(content: &str) -> Value {
        json!({ "content": content })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: LooseId,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub type UserSummary = Identity;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<LooseId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ListItem for Post {
    fn item_id(&self) -> i64 {
        self.id
    }
}

impl Editable for Post {
    fn owner_id(&self) -> Option<&LooseId> {
        self.user_id.as_ref()
    }

    fn editable_content(&self) -> &str {
        &self.content
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub post_id: LooseId,
    pub user_id: LooseId,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ListItem for Comment {
    fn item_id(&self) -> i64 {
        self.id
    }
}

impl Editable for Comment {
    fn owner_id(&self) -> Option<&LooseId> {
        Some(&self.user_id)
    }

    fn editable_content(&self) -> &str {
        &self.content
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SignupForm {
    pub username: String,
    pub password: String,
    pub nickname: String,
    pub email: String,
}

impl SignupForm {
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.username.clone(), self.password.clone())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PostPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NewComment {
    pub content: String,
}
