/// What went wrong in a source or store call, coarse enough for the engine
/// to tell a bad deployment from a flaky network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Credentials, names, settings. Rerunning will not help.
    Config,
    /// Network, disk, remote 5xx. The next scheduled run may succeed.
    Io,
    /// Remote side handed back something unparseable.
    Format,
    Logic,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Config => "config",
            ErrorKind::Io => "io",
            ErrorKind::Format => "format",
            ErrorKind::Logic => "logic",
        }
    }

    pub fn is_transient(self) -> bool {
        self == ErrorKind::Io
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by [`MessageSource`](crate::MessageSource) and
/// [`PartitionStore`](crate::PartitionStore) implementations.
#[derive(Clone)]
pub struct PluginError {
    kind: ErrorKind,
    message: String,
}

impl PluginError {
    pub fn with_kind(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self { kind, message: msg.into() }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Config, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Io, msg)
    }

    pub fn format_err(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Format, msg)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// `"{ctx}: {message}"`, same kind.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        Self { kind: self.kind, message: format!("{ctx}: {}", self.message) }
    }
}

impl std::fmt::Debug for PluginError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::fmt::Display for PluginError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for PluginError {}

macro_rules! plugin_error_from {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl From<$ty> for PluginError {
                fn from(e: $ty) -> Self {
                    Self::with_kind(ErrorKind::$kind, e.to_string())
                }
            }
        )*
    };
}

plugin_error_from! {
    String => Logic,
    &str => Logic,
    std::io::Error => Io,
    serde_json::Error => Format,
}
