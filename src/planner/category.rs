use std::collections::HashMap;
use tracing::warn;

pub const NO_EXTENSION: &str = "no-extension";

const BUILTIN_CATEGORIES: &[(&str, &str)] = &[
    // Text
    ("txt", "text"),
    ("doc", "text"),
    ("docx", "text"),
    ("pdf", "text"),
    ("md", "text"),
    ("rtf", "text"),
    // Images
    ("jpg", "images"),
    ("jpeg", "images"),
    ("png", "images"),
    ("gif", "images"),
    ("bmp", "images"),
    ("svg", "images"),
    ("psd", "images"),
    ("xd", "images"),
    ("ai", "images"),
    ("eps", "images"),
    ("webp", "images"),
    // Videos
    ("mp4", "videos"),
    ("avi", "videos"),
    ("mov", "videos"),
    ("mkv", "videos"),
    ("webm", "videos"),
    // Audio
    ("mp3", "audio"),
    ("wav", "audio"),
    ("flac", "audio"),
    ("aac", "audio"),
    // Executables
    ("exe", "executables"),
    ("bat", "executables"),
    ("sh", "executables"),
    ("jar", "executables"),
    // Compressed
    ("zip", "compressed"),
    ("rar", "compressed"),
    ("tar", "compressed"),
    ("gz", "compressed"),
    // Others
    ("iso", "disks"),
    ("dll", "system-files"),
    ("json", "json"),
];

/// Read-only extension to category lookup, built once at startup.
#[derive(Debug, Clone)]
pub struct CategoryTable {
    categories: HashMap<String, String>,
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// True when `label` names exactly one directory level below a year
/// directory.
pub fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label != "."
        && label != ".."
        && !label.contains(['/', '\\', '\0'])
}

impl CategoryTable {
    pub fn builtin() -> Self {
        Self::from_entries(
            BUILTIN_CATEGORIES
                .iter()
                .map(|(ext, label)| (ext.to_string(), label.to_string())),
        )
    }

    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            categories: entries
                .into_iter()
                .map(|(ext, label)| (normalize_extension(&ext), label))
                .collect(),
        }
    }

    /// Built-in table with `overrides` layered on top.
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Self {
        let mut table = Self::builtin();
        for (ext, label) in overrides {
            table
                .categories
                .insert(normalize_extension(ext), label.clone());
        }
        table
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Category label for a file name. Unknown extensions are their own
    /// category; names without an extension get [`NO_EXTENSION`].
    pub fn categorize(&self, file_name: &str) -> String {
        let Some(extension) = extension_of(file_name) else {
            return NO_EXTENSION.to_string();
        };
        match self.categories.get(&extension.to_ascii_lowercase()) {
            Some(label) => label.clone(),
            None => {
                warn!("No mapping for {}...", extension);
                extension.to_string()
            }
        }
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim_start_matches('.').to_ascii_lowercase()
}

/// Text after the last dot, ignoring a leading dot (dotfiles) and a trailing
/// one.
fn extension_of(file_name: &str) -> Option<&str> {
    let dot = file_name.rfind('.')?;
    if dot == 0 || dot == file_name.len() - 1 {
        return None;
    }
    Some(&file_name[dot + 1..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_extensions() {
        let table = CategoryTable::builtin();
        assert_eq!(table.categorize("notes.txt"), "text");
        assert_eq!(table.categorize("holiday.jpeg"), "images");
        assert_eq!(table.categorize("clip.mkv"), "videos");
        assert_eq!(table.categorize("setup.dll"), "system-files");
    }

    #[test]
    fn test_extension_lookup_ignores_case() {
        let table = CategoryTable::builtin();
        assert_eq!(table.categorize("IMG_0001.JPG"), "images");
    }

    #[test]
    fn test_unknown_extension_passes_through() {
        let table = CategoryTable::builtin();
        assert_eq!(table.categorize("model.blend"), "blend");
    }

    #[test]
    fn test_missing_extension() {
        let table = CategoryTable::builtin();
        assert_eq!(table.categorize("Makefile"), NO_EXTENSION);
        assert_eq!(table.categorize(".bashrc"), NO_EXTENSION);
        assert_eq!(table.categorize("trailing."), NO_EXTENSION);
    }

    #[test]
    fn test_overrides_replace_and_extend() {
        let mut overrides = HashMap::new();
        overrides.insert(".HEIC".to_string(), "images".to_string());
        overrides.insert("json".to_string(), "data".to_string());
        let table = CategoryTable::with_overrides(&overrides);
        assert_eq!(table.categorize("photo.heic"), "images");
        assert_eq!(table.categorize("export.json"), "data");
        assert_eq!(table.len(), CategoryTable::builtin().len() + 1);
    }
}
