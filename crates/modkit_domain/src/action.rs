//! Moderation actions and their strictness order.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Allow,
    Warn,
    Escalate,
    Block,
}

impl Action {
    fn rank(self) -> u8 {
        match self {
            Action::Allow => 0,
            Action::Warn => 1,
            Action::Escalate => 2,
            Action::Block => 3,
        }
    }

    /// The strictest of two actions, per the `allow < warn < escalate < block`
    /// order.
    pub fn strictest(self, other: Action) -> Action {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Allow => "allow",
            Action::Warn => "warn",
            Action::Escalate => "escalate",
            Action::Block => "block",
        }
    }

    pub fn parse(s: &str) -> Option<Action> {
        match s {
            "allow" => Some(Action::Allow),
            "warn" => Some(Action::Warn),
            "escalate" => Some(Action::Escalate),
            "block" => Some(Action::Block),
            _ => None,
        }
    }
}

modkit_common::sqlx_text_enum!(Action);

impl PartialOrd for Action {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.rank().cmp(&other.rank()))
    }
}

impl Ord for Action {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}
