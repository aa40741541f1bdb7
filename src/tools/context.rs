use std::collections::HashMap;

/// Immutable request-scoped information available to tools.
///
/// A context is built fresh for every turn and never persisted with a run.
pub trait ToolContext: Send + Sync {
    /// Principal the turn runs on behalf of
    fn principal(&self) -> Option<&str> {
        None
    }

    /// Conversation the turn belongs to
    fn conversation_id(&self) -> Option<&str> {
        None
    }

    /// Get a custom context value by key
    fn get(&self, _key: &str) -> Option<&str> {
        None
    }
}

#[derive(Clone, Debug, Default)]
pub struct EmptyContext;

impl ToolContext for EmptyContext {}

/// Context carrying the caller's identity for one turn.
#[derive(Clone, Debug, Default)]
pub struct RequestToolContext {
    pub principal: Option<String>,
    pub conversation_id: Option<String>,
    pub custom: HashMap<String, String>,
}

impl RequestToolContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_principal<S: Into<String>>(mut self, principal: S) -> Self {
        self.principal = Some(principal.into());
        self
    }

    pub fn with_conversation_id<S: Into<String>>(mut self, conversation_id: S) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    pub fn with_custom<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.custom.insert(key.into(), value.into());
        self
    }
}

impl ToolContext for RequestToolContext {
    fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.custom.get(key).map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_context_accessors() {
        let ctx = RequestToolContext::new()
            .with_principal("user-1")
            .with_conversation_id("c1")
            .with_custom("locale", "en");
        assert_eq!(ctx.principal(), Some("user-1"));
        assert_eq!(ctx.conversation_id(), Some("c1"));
        assert_eq!(ctx.get("locale"), Some("en"));
        assert_eq!(ctx.get("missing"), None);
        assert_eq!(EmptyContext.principal(), None);
    }
}
