//! Picture classification.
//!
//! A single predicate decides whether a file name is gallery media. Album
//! listings and archive exports both go through [`Classifier::is_picture`],
//! so a file shown in the gallery is always exportable and nothing else is.
//!
//! Matching is a case-sensitive suffix test. The stock set is upper-case
//! (`.CR2`, `.JPG`, `.MOV`), which is what cameras write; the lower-case
//! `-preview1.jpg` files that sit next to the raws never match it.

/// Suffixes recognised when no configuration overrides them.
pub const DEFAULT_EXTENSIONS: &[&str] = &[".CR2", ".JPG", ".MOV"];

/// Closed set of media suffixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classifier {
    extensions: Vec<String>,
}

impl Classifier {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extensions: extensions.into_iter().map(Into::into).collect(),
        }
    }

    /// True when `name` ends with one of the recognised suffixes.
    pub fn is_picture(&self, name: &str) -> bool {
        self.extensions.iter().any(|ext| name.ends_with(ext.as_str()))
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSIONS.iter().copied())
    }
}

/// Classify against [`DEFAULT_EXTENSIONS`].
pub fn is_picture_file(name: &str) -> bool {
    DEFAULT_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}
