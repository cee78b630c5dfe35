//! The outward activity message and its display slots.

use std::fmt;
use std::str::FromStr;

use crate::EnumParseError;

/// A display slot on the presence card.
///
/// `Large` is the primary image, `Small` the secondary badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Large,
    Small,
}

/// Which image/text pair a slot shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SlotUsage {
    #[default]
    Language,
    Editor,
}

const SLOT_USAGE_VALUES: &[&str] = &["language", "editor"];

impl SlotUsage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            SlotUsage::Language => "language",
            SlotUsage::Editor => "editor",
        }
    }
}

impl fmt::Display for SlotUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlotUsage {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "language" | "lang" => Ok(SlotUsage::Language),
            "editor" => Ok(SlotUsage::Editor),
            _ => Err(EnumParseError::new("slot usage", s, SLOT_USAGE_VALUES)),
        }
    }
}

/// Flavor of the activity being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    /// A file is open and was edited recently.
    Editing,
    /// A file is open but has not been edited within the view timeout.
    Viewing,
    /// Nothing happened within the idle timeout.
    Idle,
    /// The last open file was closed.
    NoFile,
}

impl ActivityKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            ActivityKind::Editing => "editing",
            ActivityKind::Viewing => "viewing",
            ActivityKind::Idle => "idle",
            ActivityKind::NoFile => "no-file",
        }
    }
}

/// An image URL plus its hover text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImagePair {
    pub image: String,
    pub text: String,
}

impl ImagePair {
    #[must_use]
    pub fn new(image: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            text: text.into(),
        }
    }
}

/// A single link button shown under the activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub url: String,
}

/// The fully-resolved message sent to the presence service for one update.
///
/// A slot set to `None` is suppressed entirely rather than sent empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActivityPayload {
    pub state: String,
    pub details: String,
    pub large: Option<ImagePair>,
    pub small: Option<ImagePair>,
    /// Unix seconds at which the current active period started.
    pub start_timestamp: Option<i64>,
    pub button: Option<Button>,
}

impl ActivityPayload {
    #[must_use]
    pub fn slot(&self, slot: Slot) -> Option<&ImagePair> {
        match slot {
            Slot::Large => self.large.as_ref(),
            Slot::Small => self.small.as_ref(),
        }
    }

    pub fn slot_mut(&mut self, slot: Slot) -> &mut Option<ImagePair> {
        match slot {
            Slot::Large => &mut self.large,
            Slot::Small => &mut self.small,
        }
    }
}
