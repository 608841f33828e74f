//! The installation record and its channel set.

use crate::{InstallationId, ObjectId};

/// Insertion-ordered set of channel names.
///
/// Iteration order is the order channels were first added, so two reads of
/// the same record always list channels the same way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelSet(Vec<String>);

impl ChannelSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a channel. Returns `false` if it was already present.
    pub fn insert(&mut self, channel: impl Into<String>) -> bool {
        let channel = channel.into();
        if self.contains(&channel) {
            return false;
        }
        self.0.push(channel);
        true
    }

    /// Remove a channel. Returns `false` if it was not present.
    pub fn remove(&mut self, channel: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|c| c != channel);
        self.0.len() != before
    }

    #[must_use]
    pub fn contains(&self, channel: &str) -> bool {
        self.0.iter().any(|c| c == channel)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        self.0.clone()
    }

    /// Render as `[a, b]`, the list form hosts already parse.
    #[must_use]
    pub fn render(&self) -> String {
        format!("[{}]", self.0.join(", "))
    }
}

impl<S: Into<String>> FromIterator<S> for ChannelSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for channel in iter {
            set.insert(channel);
        }
        set
    }
}

/// The identity of one app install as known to the push service.
///
/// `object_id` is `None` until the first save has been acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationRecord {
    installation_id: InstallationId,
    object_id: Option<ObjectId>,
    channels: ChannelSet,
}

impl InstallationRecord {
    /// A freshly created record that has never been saved.
    #[must_use]
    pub fn new(installation_id: InstallationId) -> Self {
        Self {
            installation_id,
            object_id: None,
            channels: ChannelSet::new(),
        }
    }

    #[must_use]
    pub fn installation_id(&self) -> &InstallationId {
        &self.installation_id
    }

    #[must_use]
    pub fn object_id(&self) -> Option<&ObjectId> {
        self.object_id.as_ref()
    }

    #[must_use]
    pub fn channels(&self) -> &ChannelSet {
        &self.channels
    }

    pub fn channels_mut(&mut self) -> &mut ChannelSet {
        &mut self.channels
    }

    /// Mark the record as acknowledged by the service.
    ///
    /// The first acknowledged object id sticks; later saves keep it.
    pub fn acknowledge(&mut self, object_id: ObjectId) {
        if self.object_id.is_none() {
            self.object_id = Some(object_id);
        }
    }

    #[must_use]
    pub fn is_saved(&self) -> bool {
        self.object_id.is_some()
    }
}
