//! Per-connection Subscription Set
//!
//! Two ordered topic lists (public and private). A topic appears at most once
//! per list; the same topic may sit in both lists independently.

/// Topics a single connection is subscribed to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subscriptions {
    public: Vec<String>,
    private: Vec<String>,
}

impl Subscriptions {
    /// Create an empty subscription set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a public topic unless it is already present
    pub fn subscribe_public(&mut self, topic: &str) {
        insert_unique(&mut self.public, topic);
    }

    /// Add a private topic unless it is already present
    pub fn subscribe_private(&mut self, topic: &str) {
        insert_unique(&mut self.private, topic);
    }

    /// Remove every public entry equal to `topic`
    pub fn unsubscribe_public(&mut self, topic: &str) {
        remove_all(&mut self.public, topic);
    }

    /// Remove every private entry equal to `topic`
    pub fn unsubscribe_private(&mut self, topic: &str) {
        remove_all(&mut self.private, topic);
    }

    pub fn public(&self) -> &[String] {
        &self.public
    }

    pub fn private(&self) -> &[String] {
        &self.private
    }

    pub fn has_public(&self, topic: &str) -> bool {
        self.public.iter().any(|t| t == topic)
    }

    pub fn has_private(&self, topic: &str) -> bool {
        self.private.iter().any(|t| t == topic)
    }

    /// Snapshot of all subscriptions: public entries first, then private
    pub fn all(&self) -> Vec<String> {
        self.public
            .iter()
            .chain(self.private.iter())
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.public.is_empty() && self.private.is_empty()
    }
}

fn insert_unique(list: &mut Vec<String>, topic: &str) {
    if !list.iter().any(|t| t == topic) {
        list.push(topic.to_string());
    }
}

// `retain` keeps relative order and sizes the result by the actual
// number of survivors, so an absent topic or an empty list is a no-op.
fn remove_all(list: &mut Vec<String>, topic: &str) {
    list.retain(|t| t != topic);
}
