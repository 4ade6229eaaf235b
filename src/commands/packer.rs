//! Repository packing.
//!
//! The packed form is one `<file path="..">` block per text file, which is what the repo,
//! doc and plan prompts embed. Token counts are estimated at four characters per token.

use std::path::Path;

use crate::error::ProviderError;

/// Characters per estimated token
const CHARS_PER_TOKEN: usize = 4;

/// Extra ignore file honoured alongside `.gitignore`
pub const PACK_IGNORE_FILE: &str = ".repomixignore";

/// Files larger than this are left out of the pack
pub const DEFAULT_MAX_FILE_BYTES: u64 = 1024 * 1024;

/// One packed file, path relative to the pack root with `/` separators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedFile {
    pub path: String,
    pub content: String,
}

impl PackedFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// A packed repository
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackedRepo {
    pub files: Vec<PackedFile>,
}

impl PackedRepo {
    pub fn new(files: Vec<PackedFile>) -> Self {
        Self { files }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.path.as_str())
    }

    /// Render every file as a tagged block
    pub fn render(&self) -> String {
        let mut out = String::new();
        for file in &self.files {
            out.push_str(&format!("<file path=\"{}\">\n", file.path));
            out.push_str(&file.content);
            if !file.content.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("</file>\n\n");
        }
        out
    }

    /// Estimated token count of the rendered pack
    pub fn token_count(&self) -> u64 {
        estimate_tokens(&self.render())
    }

    /// Keep only files whose path is in `paths`, preserving pack order
    pub fn retain_paths<'a, I>(&self, paths: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let wanted: std::collections::HashSet<&str> = paths.into_iter().collect();
        Self {
            files: self
                .files
                .iter()
                .filter(|f| wanted.contains(f.path.as_str()))
                .cloned()
                .collect(),
        }
    }
}

/// Token estimate used for triage hints
pub fn estimate_tokens(text: &str) -> u64 {
    text.chars().count().div_ceil(CHARS_PER_TOKEN) as u64
}

/// Turns a directory into a [`PackedRepo`]
pub trait Packer: Send + Sync {
    fn pack(&self, root: &Path) -> Result<PackedRepo, ProviderError>;
}

/// Gitignore-aware filesystem packer
#[derive(Debug, Clone)]
pub struct FsPacker {
    pub max_file_bytes: u64,
}

impl Default for FsPacker {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

impl Packer for FsPacker {
    fn pack(&self, root: &Path) -> Result<PackedRepo, ProviderError> {
        if !root.is_dir() {
            return Err(ProviderError::ConfigurationError(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        let walker = ignore::WalkBuilder::new(root)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .require_git(false)
            .add_custom_ignore_filename(PACK_IGNORE_FILE)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        let mut files = Vec::new();
        for entry in walker.filter_map(|e| e.ok()) {
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let path = entry.path();
            if entry
                .metadata()
                .is_ok_and(|m| m.len() > self.max_file_bytes)
            {
                tracing::debug!("Skipping large file {}", path.display());
                continue;
            }
            let Ok(bytes) = std::fs::read(path) else {
                tracing::debug!("Skipping unreadable file {}", path.display());
                continue;
            };
            if bytes.iter().take(8000).any(|b| *b == 0) {
                continue;
            }
            let Ok(content) = String::from_utf8(bytes) else {
                continue;
            };
            let relative = path.strip_prefix(root).unwrap_or(path);
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            files.push(PackedFile::new(relative, content));
        }

        tracing::debug!("Packed {} files from {}", files.len(), root.display());
        Ok(PackedRepo::new(files))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn packs_text_files_honouring_ignores() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/main.rs"), "fn main() {}\n").unwrap();
        fs::write(root.join("notes.txt"), "hello").unwrap();
        fs::write(root.join("build.log"), "noise").unwrap();
        fs::write(root.join("secret.env"), "KEY=1").unwrap();
        fs::write(root.join("blob.bin"), [0u8, 1, 2, 3]).unwrap();
        fs::write(root.join(".gitignore"), "*.log\n").unwrap();
        fs::write(root.join(PACK_IGNORE_FILE), "*.env\n").unwrap();

        let packed = FsPacker::default().pack(root).unwrap();
        let paths: Vec<&str> = packed.paths().collect();
        assert!(paths.contains(&"src/main.rs"));
        assert!(paths.contains(&"notes.txt"));
        assert!(!paths.contains(&"build.log"));
        assert!(!paths.contains(&"secret.env"));
        assert!(!paths.contains(&"blob.bin"));
    }

    #[test]
    fn skips_oversized_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("big.txt"), "x".repeat(64)).unwrap();
        fs::write(dir.path().join("small.txt"), "x").unwrap();
        let packer = FsPacker { max_file_bytes: 16 };
        let packed = packer.pack(dir.path()).unwrap();
        assert_eq!(packed.paths().collect::<Vec<_>>(), vec!["small.txt"]);
    }

    #[test]
    fn missing_root_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FsPacker::default().pack(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, ProviderError::ConfigurationError(_)));
    }

    #[test]
    fn renders_blocks_and_estimates_tokens() {
        let repo = PackedRepo::new(vec![PackedFile::new("a.rs", "abcd")]);
        assert_eq!(repo.render(), "<file path=\"a.rs\">\nabcd\n</file>\n\n");
        assert_eq!(estimate_tokens("abcdefgh"), 2);
        assert_eq!(estimate_tokens("abcde"), 2);
        assert_eq!(repo.token_count(), estimate_tokens(&repo.render()));
    }

    #[test]
    fn retains_selected_paths_in_order() {
        let repo = PackedRepo::new(vec![
            PackedFile::new("a", "1"),
            PackedFile::new("b", "2"),
            PackedFile::new("c", "3"),
        ]);
        let kept = repo.retain_paths(["c", "a", "zzz"]);
        assert_eq!(kept.paths().collect::<Vec<_>>(), vec!["a", "c"]);
    }
}
