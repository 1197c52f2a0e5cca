//! Article writing styles.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Writing style requested for an article. Each style is cached independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleStyle {
    #[default]
    Default,
    Short,
    Eli12,
    Technical,
    Analogies,
}

impl ArticleStyle {
    pub const ALL: [ArticleStyle; 5] = [
        ArticleStyle::Default,
        ArticleStyle::Short,
        ArticleStyle::Eli12,
        ArticleStyle::Technical,
        ArticleStyle::Analogies,
    ];

    /// Parse a style key, falling back to [`ArticleStyle::Default`] for anything unknown.
    pub fn from_query(value: Option<&str>) -> Self {
        value.and_then(Self::parse).unwrap_or_default()
    }

    /// Parse a style key exactly (case-insensitive, surrounding whitespace ignored).
    pub fn parse(value: &str) -> Option<Self> {
        let key = value.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|style| style.as_str() == key)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ArticleStyle::Default => "default",
            ArticleStyle::Short => "short",
            ArticleStyle::Eli12 => "eli12",
            ArticleStyle::Technical => "technical",
            ArticleStyle::Analogies => "analogies",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ArticleStyle::Default => "Default",
            ArticleStyle::Short => "Short",
            ArticleStyle::Eli12 => "Explain like I'm 12",
            ArticleStyle::Technical => "Technical",
            ArticleStyle::Analogies => "More analogies",
        }
    }

    /// Instruction handed to the model describing how to write in this style.
    pub fn directive(self) -> &'static str {
        match self {
            ArticleStyle::Default => "Write a balanced, magazine-style explainer.",
            ArticleStyle::Short => {
                "Write a shorter version. Keep sections tight and prefer punchy paragraphs."
            }
            ArticleStyle::Eli12 => {
                "Explain it as if the reader is 12 years old. \
                 Use simple words and everyday examples."
            }
            ArticleStyle::Technical => {
                "Make it more technical. Use precise language and describe the mechanisms involved."
            }
            ArticleStyle::Analogies => {
                "Lean on analogies and vivid mental pictures while staying accurate."
            }
        }
    }
}

impl fmt::Display for ArticleStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
