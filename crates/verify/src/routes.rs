//! Request interception rules
//!
//! Patterns use Playwright's glob syntax so the same string can be handed to
//! `page.route()` verbatim and resolved on the Rust side when classifying the
//! requests the browser reports.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::VerifyError;
use crate::fixtures::{self, FixtureSet};

/// A compiled URL glob
///
/// `**` matches any run of characters, `*` matches within one path segment,
/// `?` matches exactly one character and `{a,b}` matches either alternative.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UrlGlob {
    pattern: String,
    regex: Regex,
}

impl UrlGlob {
    pub fn new(pattern: &str) -> Result<Self, VerifyError> {
        let regex = Regex::new(&glob_to_regex(pattern)).map_err(|e| VerifyError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, url: &str) -> bool {
        self.regex.is_match(url)
    }
}

impl TryFrom<String> for UrlGlob {
    type Error = VerifyError;

    fn try_from(pattern: String) -> Result<Self, Self::Error> {
        Self::new(&pattern)
    }
}

impl From<UrlGlob> for String {
    fn from(glob: UrlGlob) -> Self {
        glob.pattern
    }
}

impl PartialEq for UrlGlob {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

fn glob_to_regex(glob: &str) -> String {
    let mut out = String::from("^");
    let mut chars = glob.chars().peekable();
    let mut in_group = false;

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push_str(&regex::escape(&next.to_string()));
                }
            }
            '*' => {
                if chars.peek() == Some(&'*') {
                    while chars.peek() == Some(&'*') {
                        chars.next();
                    }
                    out.push_str(".*");
                } else {
                    out.push_str("[^/]*");
                }
            }
            '?' => out.push('.'),
            '{' => {
                in_group = true;
                out.push('(');
            }
            '}' if in_group => {
                in_group = false;
                out.push(')');
            }
            ',' if in_group => out.push('|'),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }

    out.push('$');
    out
}

/// A canned response handed to `route.fulfill()`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockResponse {
    pub status: u16,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

impl MockResponse {
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: Some("application/json".to_string()),
            body: Some(body.into()),
        }
    }

    /// Status line only, no headers or body
    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            body: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub name: String,
    pub pattern: UrlGlob,
    pub response: MockResponse,
}

/// Interceptors in registration order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, pattern: &str, response: MockResponse) -> Result<&mut Self, VerifyError> {
        self.routes.push(Route {
            name: name.to_string(),
            pattern: UrlGlob::new(pattern)?,
            response,
        });
        Ok(self)
    }

    /// The route that would fulfil `url`.
    ///
    /// Later registrations shadow earlier ones, matching Playwright.
    pub fn resolve(&self, url: &str) -> Option<&Route> {
        self.routes.iter().rev().find(|r| r.pattern.matches(url))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Stand-ins for every backend endpoint the chat UI touches
    pub fn chat(set: &FixtureSet) -> Result<Self, VerifyError> {
        let mut table = Self::new();
        table
            .add("session", "**/api/v1/auth/google/session", MockResponse::json(200, set.session.as_str()))?
            .add("conversations", "**/api/v1/chat/conversations", MockResponse::json(200, set.conversations.as_str()))?
            .add("conversation", "**/api/v1/chat/conv-1", MockResponse::json(200, set.conversation.as_str()))?
            .add("messages", "**/api/v1/chat/conv-1/messages?*", MockResponse::json(200, set.messages.as_str()))?
            .add("peer-profile", "**/api/v1/users/user-2", MockResponse::json(200, set.peer_profile.as_str()))?
            .add("online-users", "**/api/v1/users/online", MockResponse::json(200, fixtures::ONLINE_USERS_BODY))?
            // Tells the UI the assistant feature is absent
            .add("ai-conversation", "**/api/v1/ai/conversation", MockResponse::status(404))?
            .add("realtime", "**/ws/**", MockResponse::status(101))?;
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_star_stays_in_segment() {
        let glob = UrlGlob::new("http://host/*/end").unwrap();
        assert!(glob.matches("http://host/a/end"));
        assert!(!glob.matches("http://host/a/b/end"));
    }

    #[test]
    fn test_double_star_crosses_segments() {
        let glob = UrlGlob::new("**/ws/**").unwrap();
        assert!(glob.matches("ws://localhost:5173/ws/chat/1"));
        assert!(!glob.matches("http://localhost:5173/api/v1/users/online"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let glob = UrlGlob::new("**/a.b+c").unwrap();
        assert!(glob.matches("http://x/a.b+c"));
        assert!(!glob.matches("http://x/aXbbc"));
    }

    #[test]
    fn test_brace_alternatives() {
        let glob = UrlGlob::new("**/*.{png,jpg}").unwrap();
        assert!(glob.matches("http://x/img/a.png"));
        assert!(glob.matches("http://x/img/a.jpg"));
        assert!(!glob.matches("http://x/img/a.gif"));
    }

    #[test]
    fn test_later_route_shadows_earlier() {
        let mut table = RouteTable::new();
        table
            .add("first", "**/api/**", MockResponse::status(500))
            .unwrap()
            .add("second", "**/api/v1/**", MockResponse::status(204))
            .unwrap();

        assert_eq!(table.resolve("http://x/api/v1/thing").unwrap().name, "second");
        assert_eq!(table.resolve("http://x/api/v2/thing").unwrap().name, "first");
    }

    #[test]
    fn test_route_table_yaml_uses_pattern_strings() {
        let table = RouteTable::chat(&FixtureSet::chat()).unwrap();
        let yaml = serde_yaml::to_string(&table).unwrap();
        assert!(yaml.contains("**/ws/**"), "yaml: {}", yaml);

        let back: RouteTable = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, table);
    }
}
