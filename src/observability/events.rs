//! Observable cache events

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Lookup configuration loaded and validated
    ConfigLoaded,

    // Build
    /// Cache load begins
    CacheBuildStart,
    /// Cache sealed and ready for lookups
    CacheBuildComplete,
    /// Cache load aborted (FATAL)
    CacheBuildFailed,

    // Lookup
    /// More rows matched than the policy allows
    LookupAmbiguous,
    /// A lookup was rejected
    LookupFailed,
    /// Input stream finished
    LookupStreamComplete,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::CacheBuildStart => "CACHE_BUILD_START",
            Event::CacheBuildComplete => "CACHE_BUILD_COMPLETE",
            Event::CacheBuildFailed => "CACHE_BUILD_FAILED",
            Event::LookupAmbiguous => "LOOKUP_AMBIGUOUS",
            Event::LookupFailed => "LOOKUP_FAILED",
            Event::LookupStreamComplete => "LOOKUP_STREAM_COMPLETE",
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::CacheBuildFailed)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
