//! Extension-based language detection.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Source language inferred from a file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    JavaScript,
    TypeScript,
    Python,
    Java,
    Cpp,
    C,
    /// `.h` headers, shared by C and C++.
    Header,
    CSharp,
    Go,
    Rust,
    Ruby,
    Php,
}

impl Lang {
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        Some(match ext {
            "js" | "jsx" => Self::JavaScript,
            "ts" | "tsx" => Self::TypeScript,
            "py" => Self::Python,
            "java" => Self::Java,
            "cpp" => Self::Cpp,
            "c" => Self::C,
            "h" => Self::Header,
            "cs" => Self::CSharp,
            "go" => Self::Go,
            "rs" => Self::Rust,
            "rb" => Self::Ruby,
            "php" => Self::Php,
            _ => return None,
        })
    }

    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Human-readable name used in analytics histograms.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::JavaScript => "JavaScript",
            Self::TypeScript => "TypeScript",
            Self::Python => "Python",
            Self::Java => "Java",
            Self::Cpp => "C++",
            Self::C => "C",
            Self::Header => "C/C++",
            Self::CSharp => "C#",
            Self::Go => "Go",
            Self::Rust => "Rust",
            Self::Ruby => "Ruby",
            Self::Php => "PHP",
        }
    }

    /// Languages the dependency extractor scans for `import` statements.
    #[must_use]
    pub fn is_script(self) -> bool {
        matches!(self, Self::JavaScript | Self::TypeScript)
    }
}

/// Display name for `path`, or `"Other"` when the extension is unknown.
#[must_use]
pub fn language_name(path: &Path) -> &'static str {
    Lang::from_path(path).map_or("Other", Lang::display_name)
}

#[must_use]
pub fn is_code_file(path: &Path) -> bool {
    Lang::from_path(path).is_some()
}

#[must_use]
pub fn is_script_file(path: &Path) -> bool {
    Lang::from_path(path).is_some_and(Lang::is_script)
}
