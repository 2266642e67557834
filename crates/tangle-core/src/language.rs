use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of languages the scan pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Java,
    Kotlin,
    ObjC,
    Swift,
    Ruby,
    Groovy,
    JavaScript,
    TypeScript,
    C,
    Cpp,
    Python,
    Go,
}

/// Line and block comment markers of one language, shared by the comment
/// filter and the source-lines-of-code counter.
#[derive(Debug, Clone, Copy)]
pub struct CommentStyle {
    pub line: &'static str,
    pub block_open: &'static str,
    pub block_close: &'static str,
}

impl Language {
    pub const ALL: [Language; 12] = [
        Language::Java,
        Language::Kotlin,
        Language::ObjC,
        Language::Swift,
        Language::Ruby,
        Language::Groovy,
        Language::JavaScript,
        Language::TypeScript,
        Language::C,
        Language::Cpp,
        Language::Python,
        Language::Go,
    ];

    /// Lowercase tag used in config files and metric key lookups.
    pub fn key(&self) -> &'static str {
        match self {
            Language::Java => "java",
            Language::Kotlin => "kotlin",
            Language::ObjC => "objc",
            Language::Swift => "swift",
            Language::Ruby => "ruby",
            Language::Groovy => "groovy",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Python => "py",
            Language::Go => "go",
        }
    }

    pub fn from_key(key: &str) -> Option<Language> {
        Language::ALL.iter().copied().find(|l| l.key() == key)
    }

    pub fn comment_style(&self) -> CommentStyle {
        match self {
            Language::Ruby => CommentStyle {
                line: "#",
                block_open: "=begin",
                block_close: "=end",
            },
            Language::Python => CommentStyle {
                line: "#",
                block_open: "\"\"\"",
                block_close: "\"\"\"",
            },
            _ => CommentStyle {
                line: "//",
                block_open: "/*",
                block_close: "*/",
            },
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// All file extensions (with leading dot) the scan considers source code.
/// Anything else is counted as skipped by the filesystem walker.
pub const KNOWN_EXTENSIONS: [&str; 15] = [
    ".java", ".swift", ".c", ".cpp", ".groovy", ".js", ".jsx", ".ts", ".tsx", ".kt", ".m", ".rb",
    ".h", ".py", ".go",
];

pub fn extension_known(extension: &str) -> bool {
    KNOWN_EXTENSIONS.contains(&extension)
}
