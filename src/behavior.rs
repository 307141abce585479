use std::fmt;
use std::str::FromStr;

use serde_derive::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Behavior {
    Working,
    Idle,
    Sleeping,
    Moving,
    Inactive,
}

impl Behavior {
    /// Fixed vote order. Ties in the temporal filter go to the earlier label.
    pub const ALL: [Behavior; 5] = [
        Behavior::Working,
        Behavior::Idle,
        Behavior::Sleeping,
        Behavior::Moving,
        Behavior::Inactive,
    ];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Behavior::Working => 0,
            Behavior::Idle => 1,
            Behavior::Sleeping => 2,
            Behavior::Moving => 3,
            Behavior::Inactive => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Behavior::Working => "working",
            Behavior::Idle => "idle",
            Behavior::Sleeping => "sleeping",
            Behavior::Moving => "moving",
            Behavior::Inactive => "inactive",
        }
    }
}

impl Default for Behavior {
    fn default() -> Self {
        Behavior::Inactive
    }
}

impl fmt::Display for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Behavior {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Behavior::ALL
            .iter()
            .copied()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| Error::UnknownBehavior(s.to_string()))
    }
}
