pub const DEFAULT_HISTORY_RETENTION: usize = 1000;
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 64;
pub const DEFAULT_ELIDE_DOCUMENT_NAMES: bool = false;
