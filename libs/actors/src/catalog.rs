//! Message kind names for logs and the diagnostic dump

use std::borrow::Cow;
use std::collections::BTreeMap;
use types::MessageKind;

/// Names of the message kinds agreed between collaborating tasks
#[derive(Debug, Clone)]
pub struct MessageCatalog {
    names: BTreeMap<MessageKind, String>,
}

impl MessageCatalog {
    /// Catalog holding the built-in kinds only
    pub fn new() -> Self {
        let mut names = BTreeMap::new();
        names.insert(MessageKind::TIMER_EXPIRED, "TIMER_EXPIRED".to_string());
        names.insert(MessageKind::TERMINATE, "TERMINATE".to_string());
        names.insert(MessageKind::FAULT_REPORTED, "FAULT_REPORTED".to_string());
        Self { names }
    }

    /// Add or rename a kind
    pub fn register(&mut self, kind: MessageKind, name: impl Into<String>) -> &mut Self {
        self.names.insert(kind, name.into());
        self
    }

    pub fn name(&self, kind: MessageKind) -> Cow<'_, str> {
        match self.names.get(&kind) {
            Some(name) => Cow::Borrowed(name.as_str()),
            None => Cow::Owned(format!("kind-{}", kind.inner())),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self::new()
    }
}
