//! Canned backend responses for the chat scenario
//!
//! Bodies are kept as literal JSON text so the mocked endpoints serve them
//! byte-for-byte. Typed views exist only to check that identifiers line up
//! across fixtures and to derive the texts the scenario waits for.

use serde::{Deserialize, Serialize};

use crate::error::{VerifyError, VerifyResult};

pub const SESSION_BODY: &str = r#"{"user": {"id": "user-1", "username": "Me", "avatarUrl": null}, "accessToken": "fake-token"}"#;

pub const CONVERSATIONS_BODY: &str = r#"[{"id": "conv-1", "title": "Test Chat", "type": "DIRECT", "participants": [{"id": "user-1", "username": "Me"}, {"id": "user-2", "username": "OtherUser"}], "updatedAt": "2023-01-01T12:00:00Z"}]"#;

pub const CONVERSATION_BODY: &str = r#"{"id": "conv-1", "title": "Test Chat", "type": "DIRECT", "participants": [{"id": "user-1", "username": "Me"}, {"id": "user-2", "username": "OtherUser"}]}"#;

pub const MESSAGES_BODY: &str = r#"{"content": [{"id": "msg-1", "body": "Hello world", "senderId": "user-2", "createdAt": "2023-01-01T12:00:00Z"}, {"id": "msg-2", "body": "Hi there!", "senderId": "user-1", "createdAt": "2023-01-01T12:01:00Z"}], "totalPages": 1, "totalElements": 2, "last": true}"#;

pub const PEER_PROFILE_BODY: &str = r#"{"id": "user-2", "username": "OtherUser", "avatarUrl": null}"#;

pub const ONLINE_USERS_BODY: &str = "[]";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionFixture {
    pub user: UserRef,
    pub access_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationFixture {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub participants: Vec<UserRef>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageFixture {
    pub id: String,
    pub body: String,
    pub sender_id: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePageFixture {
    pub content: Vec<MessageFixture>,
    pub total_pages: u32,
    pub total_elements: u64,
    pub last: bool,
}

/// Raw fixture bodies, one per mocked endpoint
#[derive(Debug, Clone)]
pub struct FixtureSet {
    pub session: String,
    pub conversations: String,
    pub conversation: String,
    pub messages: String,
    pub peer_profile: String,
}

/// Parsed fixtures after a successful consistency check
#[derive(Debug, Clone)]
pub struct FixtureViews {
    pub session: SessionFixture,
    pub conversations: Vec<ConversationFixture>,
    pub conversation: ConversationFixture,
    pub messages: MessagePageFixture,
    pub peer_profile: UserRef,
}

impl Default for FixtureSet {
    fn default() -> Self {
        Self::chat()
    }
}

impl FixtureSet {
    /// The one-conversation, two-message fixture set
    pub fn chat() -> Self {
        Self {
            session: SESSION_BODY.to_string(),
            conversations: CONVERSATIONS_BODY.to_string(),
            conversation: CONVERSATION_BODY.to_string(),
            messages: MESSAGES_BODY.to_string(),
            peer_profile: PEER_PROFILE_BODY.to_string(),
        }
    }

    /// Parse every body and check cross-fixture references.
    ///
    /// The UI attributes messages by sender id, so every sender must be either
    /// the session user or the peer, and both must take part in the
    /// conversation the list and the detail endpoint describe.
    pub fn validate(&self) -> VerifyResult<FixtureViews> {
        let views = FixtureViews {
            session: parse("session", &self.session)?,
            conversations: parse("conversation list", &self.conversations)?,
            conversation: parse("conversation detail", &self.conversation)?,
            messages: parse("message page", &self.messages)?,
            peer_profile: parse("peer profile", &self.peer_profile)?,
        };

        let me = &views.session.user.id;
        let peer = &views.peer_profile.id;

        if me == peer {
            return Err(inconsistent(format!(
                "session user and peer profile share id '{}'",
                me
            )));
        }

        let listed = views
            .conversations
            .iter()
            .find(|c| c.id == views.conversation.id)
            .ok_or_else(|| {
                inconsistent(format!(
                    "conversation '{}' is not in the conversation list",
                    views.conversation.id
                ))
            })?;

        if listed.title != views.conversation.title {
            return Err(inconsistent(format!(
                "conversation '{}' titled '{}' in list but '{}' in detail",
                listed.id, listed.title, views.conversation.title
            )));
        }

        for id in [me, peer] {
            if !views.conversation.participants.iter().any(|p| &p.id == id) {
                return Err(inconsistent(format!(
                    "'{}' is not a participant of '{}'",
                    id, views.conversation.id
                )));
            }
        }

        for msg in &views.messages.content {
            if &msg.sender_id != me && &msg.sender_id != peer {
                return Err(inconsistent(format!(
                    "message '{}' sent by unknown user '{}'",
                    msg.id, msg.sender_id
                )));
            }
        }

        if views.messages.total_elements != views.messages.content.len() as u64 {
            return Err(inconsistent(format!(
                "totalElements is {} but the page holds {} messages",
                views.messages.total_elements,
                views.messages.content.len()
            )));
        }

        Ok(views)
    }
}

impl FixtureViews {
    /// Text identifying the logged-in user
    pub fn identity_text(&self) -> &str {
        &self.session.user.username
    }

    pub fn conversation_title(&self) -> &str {
        &self.conversation.title
    }

    pub fn message_bodies(&self) -> impl Iterator<Item = &str> {
        self.messages.content.iter().map(|m| m.body.as_str())
    }
}

fn parse<T: serde::de::DeserializeOwned>(what: &str, body: &str) -> VerifyResult<T> {
    serde_json::from_str(body)
        .map_err(|e| VerifyError::FixtureInconsistent(format!("{} body is not valid: {}", what, e)))
}

fn inconsistent(reason: String) -> VerifyError {
    VerifyError::FixtureInconsistent(reason)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_fixtures_are_consistent() {
        let views = FixtureSet::chat().validate().unwrap();
        assert_eq!(views.identity_text(), "Me");
        assert_eq!(views.conversation_title(), "Test Chat");
        assert_eq!(
            views.message_bodies().collect::<Vec<_>>(),
            vec!["Hello world", "Hi there!"]
        );
        assert!(views.messages.last);
        assert_eq!(views.messages.total_pages, 1);
        assert_eq!(views.session.user.avatar_url, None);
    }

    #[test]
    fn test_unknown_sender_is_rejected() {
        let mut set = FixtureSet::chat();
        set.messages = set.messages.replace(r#""senderId": "user-2""#, r#""senderId": "user-3""#);

        let err = set.validate().unwrap_err();
        assert!(err.to_string().contains("user-3"), "got: {}", err);
    }

    #[test]
    fn test_peer_must_participate() {
        let mut set = FixtureSet::chat();
        set.peer_profile = r#"{"id": "user-9", "username": "Stranger", "avatarUrl": null}"#.to_string();

        let err = set.validate().unwrap_err();
        assert!(matches!(err, VerifyError::FixtureInconsistent(_)));
    }

    #[test]
    fn test_title_mismatch_is_rejected() {
        let mut set = FixtureSet::chat();
        set.conversation = set.conversation.replace("Test Chat", "Other Chat");

        assert!(set.validate().is_err());
    }

    #[test]
    fn test_malformed_body_is_rejected() {
        let mut set = FixtureSet::chat();
        set.session = "{not json".to_string();

        let err = set.validate().unwrap_err();
        assert!(err.to_string().contains("session"));
    }
}
