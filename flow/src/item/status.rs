use std::fmt;

/// Lifecycle state of an item. Transitions never go backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ItemStatus {
    Void,
    Ready,
    Complete,
}

impl ItemStatus {
    /// Single letter code used on the wire by the remote service.
    pub fn code(&self) -> &'static str {
        match self {
            ItemStatus::Void => "V",
            ItemStatus::Ready => "R",
            ItemStatus::Complete => "C",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "V" => Some(ItemStatus::Void),
            "R" => Some(ItemStatus::Ready),
            "C" => Some(ItemStatus::Complete),
            _ => None,
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
