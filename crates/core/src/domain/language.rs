use std::fmt;
use std::path::Path;

/// Languages the grading toolchains know how to build.
///
/// Adding a language means adding a variant here, its extensions in
/// [`SourceLanguage::from_extension`], and a toolchain entry in the grader
/// configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceLanguage {
    C,
    Cpp,
}

impl SourceLanguage {
    pub const ALL: [SourceLanguage; 2] = [SourceLanguage::C, SourceLanguage::Cpp];

    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "c" => Some(Self::C),
            "cpp" | "cc" | "cxx" | "c++" => Some(Self::Cpp),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::C => "c",
            Self::Cpp => "cpp",
        }
    }
}

impl fmt::Display for SourceLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
