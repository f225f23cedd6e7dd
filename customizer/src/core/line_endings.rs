//! CRLF handling for patch targets.
//!
//! Patches match LF text. A checkout made with `core.autocrlf` on Windows has
//! CRLF files, so they are converted to LF before patching and back after.

/// Line terminator style of a text file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEndings {
    Lf,
    /// Every line break is `\r\n`.
    Crlf,
}

impl LineEndings {
    /// Mixed files count as `Lf` and are patched untouched.
    pub fn detect(contents: &str) -> Self {
        let breaks = contents.matches('\n').count();
        if breaks > 0 && contents.matches("\r\n").count() == breaks {
            LineEndings::Crlf
        } else {
            LineEndings::Lf
        }
    }

    pub fn to_lf(self, contents: &str) -> String {
        match self {
            LineEndings::Lf => contents.to_string(),
            LineEndings::Crlf => contents.replace("\r\n", "\n"),
        }
    }

    pub fn restore(self, contents: &str) -> String {
        match self {
            LineEndings::Lf => contents.to_string(),
            LineEndings::Crlf => contents.replace('\n', "\r\n"),
        }
    }
}
