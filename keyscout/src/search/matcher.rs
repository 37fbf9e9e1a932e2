use tracing::debug;

/// A keyword as requested plus its lower-cased form used for matching.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Keyword {
    original: String,
    lowered: String,
}

/// Case-insensitive substring matcher over a fixed keyword set
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    keywords: Vec<Keyword>,
}

impl KeywordMatcher {
    /// Creates a new KeywordMatcher; each keyword is lower-cased once here
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keywords: Vec<Keyword> = keywords
            .into_iter()
            .map(|k| {
                let original = k.into();
                let lowered = original.to_lowercase();
                Keyword { original, lowered }
            })
            .collect();

        debug!("Matcher built for {} keywords", keywords.len());
        Self { keywords }
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// Lower-cases `content` and returns every keyword (as originally spelled)
    /// it contains
    pub fn matching_keywords(&self, content: &str) -> Vec<&str> {
        self.matching_lowered(&content.to_lowercase())
    }

    /// Same as [`Self::matching_keywords`] for content that is already lower case
    pub fn matching_lowered(&self, lowered_content: &str) -> Vec<&str> {
        self.keywords
            .iter()
            .filter(|k| lowered_content.contains(k.lowered.as_str()))
            .map(|k| k.original.as_str())
            .collect()
    }
}
