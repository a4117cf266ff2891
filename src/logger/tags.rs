/// Log tags identify the subsystem a message comes from

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogTag {
    System,
    Config,
    Rpc,
    Websocket,
    Scanner,
    Cache,
    Pricing,
    Tracker,
}

impl LogTag {
    pub const ALL: [LogTag; 8] = [
        LogTag::System,
        LogTag::Config,
        LogTag::Rpc,
        LogTag::Websocket,
        LogTag::Scanner,
        LogTag::Cache,
        LogTag::Pricing,
        LogTag::Tracker,
    ];

    /// Key used on the command line (`--debug <key>`)
    pub fn to_debug_key(&self) -> &'static str {
        match self {
            LogTag::System => "system",
            LogTag::Config => "config",
            LogTag::Rpc => "rpc",
            LogTag::Websocket => "websocket",
            LogTag::Scanner => "scanner",
            LogTag::Cache => "cache",
            LogTag::Pricing => "pricing",
            LogTag::Tracker => "tracker",
        }
    }

    /// Uncolored label for file output
    pub fn to_plain_string(&self) -> String {
        self.to_debug_key().to_uppercase()
    }

    pub fn from_debug_key(key: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|tag| tag.to_debug_key() == key.trim().to_lowercase())
    }
}
