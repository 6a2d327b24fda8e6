use serde::{Deserialize, Serialize};
use std::fmt;

/// What kind of content a session publishes.
///
/// The mode selector in the window lists these in declaration order, so the
/// selector index maps directly onto the variant (see [`ContentMode::from_index`]).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentMode {
    /// A single file, served as-is.
    #[default]
    File,
    /// A directory tree, served with an index.
    Directory,
    /// A pre-built archive that the engine unpacks and serves.
    Archive,
}

impl ContentMode {
    /// All modes in selector order.
    pub const ALL: [ContentMode; 3] = [
        ContentMode::File,
        ContentMode::Directory,
        ContentMode::Archive,
    ];

    /// File extensions accepted by the path chooser in archive mode.
    pub const ARCHIVE_EXTENSIONS: &'static [&'static str] = &["zip"];

    /// Map a selector index back to a mode. Out-of-range indices fall back to `File`.
    pub fn from_index(index: i32) -> Self {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .unwrap_or_default()
    }

    /// Position of this mode in the selector.
    pub fn index(self) -> i32 {
        match self {
            ContentMode::File => 0,
            ContentMode::Directory => 1,
            ContentMode::Archive => 2,
        }
    }

    /// Label shown in the mode selector.
    pub fn label(self) -> &'static str {
        match self {
            ContentMode::File => "file",
            ContentMode::Directory => "directory",
            ContentMode::Archive => "zip",
        }
    }

    /// Whether the path chooser should pick a folder rather than a file.
    pub fn selects_directory(self) -> bool {
        matches!(self, ContentMode::Directory)
    }

    /// Check whether `path` is acceptable for this mode's chooser filter.
    ///
    /// Only archive mode restricts anything; the check is case-insensitive on the
    /// extension.
    pub fn accepts_path(self, path: &str) -> bool {
        match self {
            ContentMode::Archive => camino::Utf8Path::new(path)
                .extension()
                .map(|ext| {
                    Self::ARCHIVE_EXTENSIONS
                        .iter()
                        .any(|known| ext.eq_ignore_ascii_case(known))
                })
                .unwrap_or(false),
            ContentMode::File | ContentMode::Directory => true,
        }
    }
}

impl fmt::Display for ContentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContentMode::File => "file",
            ContentMode::Directory => "directory",
            ContentMode::Archive => "archive",
        };
        f.write_str(name)
    }
}

/// Values read from the input surface when the user presses the action button.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawInputs {
    pub path: String,
    pub mode: ContentMode,
    pub slug: bool,
    pub passphrase: String,
}

/// A fully validated publish request handed to the engine.
///
/// Built once per submission and moved into the command channel, so nothing on
/// the controller side can touch it after it is sent.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionRequest {
    /// Path of the file, directory or archive to publish
    pub path: String,
    pub mode: ContentMode,
    /// Append a random slug to the published address
    pub slug: bool,
    /// Passphrase the engine derives the service identity from (empty for a random identity)
    pub passphrase: String,
    /// How to reach the engine's control interface
    pub control_address: String,
    pub control_password: String,
    pub debug: bool,
}

impl SessionRequest {
    /// Whether the engine should treat the content as an archive to unpack.
    pub fn is_archive(&self) -> bool {
        self.mode == ContentMode::Archive
    }
}

// Secrets never reach the logs.
impl fmt::Debug for SessionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRequest")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("slug", &self.slug)
            .field("passphrase", &redact(&self.passphrase))
            .field("control_address", &self.control_address)
            .field("control_password", &redact(&self.control_password))
            .field("debug", &self.debug)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() { "<empty>" } else { "<redacted>" }
}

/// Successful outcome of a publish: the address the content is reachable at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishResult {
    pub address: String,
}

impl PublishResult {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

/// Failed outcome of a publish, carrying a message meant for the user.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct PublishError {
    pub message: String,
}

impl PublishError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
