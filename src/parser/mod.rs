//! Clipboard text parsing: video URL recognition and canonical ids.
//!
//! Recognition is pure and side-effect free. Text that is not a known video
//! URL shape yields `None`; a miss is never an error.
//!
//! # Example
//!
//! ```
//! use clipfetch_core::parser::recognize;
//!
//! let id = recognize("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=5s").unwrap();
//! assert_eq!(id.to_string(), "dQw4w9WgXcQ");
//! ```

mod video_url;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use video_url::{extract_video_id, extract_video_urls, recognize};

/// Canonical identifier of a source video.
///
/// Every recognized URL shape that refers to the same video yields the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    /// Wraps an already-extracted id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VideoId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}
