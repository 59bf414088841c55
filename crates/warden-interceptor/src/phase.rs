//! The host's ordered request-processing phases.

use std::fmt;

/// A phase of the host's request pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Phase {
    /// Right after the request head is read.
    PostRead = 0,
    /// Server-level rewrites.
    ServerRewrite = 1,
    /// Location lookup.
    FindConfig = 2,
    /// Location-level rewrites.
    Rewrite = 3,
    /// After rewrites, may restart location lookup.
    PostRewrite = 4,
    /// Before access control. Warden runs here.
    PreAccess = 5,
    /// Access control.
    Access = 6,
    /// After access control.
    PostAccess = 7,
    /// Before content generation.
    PreContent = 8,
    /// Content generation or upstream proxying.
    Content = 9,
    /// Request logging.
    Log = 10,
}

impl Phase {
    /// Returns the phase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PostRead => "post_read",
            Self::ServerRewrite => "server_rewrite",
            Self::FindConfig => "find_config",
            Self::Rewrite => "rewrite",
            Self::PostRewrite => "post_rewrite",
            Self::PreAccess => "preaccess",
            Self::Access => "access",
            Self::PostAccess => "post_access",
            Self::PreContent => "precontent",
            Self::Content => "content",
            Self::Log => "log",
        }
    }

    /// Returns true for phases that run before content generation.
    #[must_use]
    pub const fn is_before_content(self) -> bool {
        (self as u8) < (Self::Content as u8)
    }

    /// Returns all phases in order.
    #[must_use]
    pub const fn all() -> [Phase; 11] {
        [
            Self::PostRead,
            Self::ServerRewrite,
            Self::FindConfig,
            Self::Rewrite,
            Self::PostRewrite,
            Self::PreAccess,
            Self::Access,
            Self::PostAccess,
            Self::PreContent,
            Self::Content,
            Self::Log,
        ]
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
