//! System font resolution for the drawtext filter.
//!
//! drawtext renders most reliably with an explicit `fontfile`; relying on
//! fontconfig is not portable across the platforms we ship on. The
//! resolver scans platform font directories for the requested family and
//! style, falling back through less specific variants and finally a set
//! of fonts that exist on nearly every system.

use std::path::{Path, PathBuf};

use tracing::warn;

/// Widely available fonts, tried when the requested family is missing.
const FALLBACK_FONTS: &[&str] = &[
    "DejaVuSans",
    "LiberationSans-Regular",
    "Arial",
    "Helvetica",
    "NotoSans-Regular",
];

const FONT_EXTENSIONS: &[&str] = &["ttf", "otf", "ttc"];

/// Maximum directory nesting to scan (Linux font trees are one or two
/// levels deep, e.g. truetype/dejavu/).
const MAX_SCAN_DEPTH: usize = 3;

/// Resolves font family names to font files on disk.
pub struct FontResolver {
    search_dirs: Vec<PathBuf>,
}

impl Default for FontResolver {
    fn default() -> Self {
        Self {
            search_dirs: platform_font_dirs(),
        }
    }
}

impl FontResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver over explicit directories (tests).
    pub fn with_dirs(search_dirs: Vec<PathBuf>) -> Self {
        Self { search_dirs }
    }

    /// Resolves a family plus style to a font file.
    ///
    /// Tries the styled variant first, then the regular cut of the same
    /// family, then the fallback set. Returns None only when nothing at
    /// all is found; callers then omit `fontfile` and let the encoder
    /// use its own default.
    pub fn resolve(&self, family: &str, bold: bool, italic: bool) -> Option<PathBuf> {
        for stem in candidate_stems(family, bold, italic) {
            if let Some(path) = self.find_font(&stem) {
                return Some(path);
            }
        }

        for fallback in FALLBACK_FONTS {
            if let Some(path) = self.find_font(fallback) {
                warn!(
                    "Font family '{}' not found, falling back to '{}'",
                    family, fallback
                );
                return Some(path);
            }
        }

        warn!("No usable font found for family '{}'", family);
        None
    }

    fn find_font(&self, stem: &str) -> Option<PathBuf> {
        let wanted = stem.to_ascii_lowercase();
        for dir in &self.search_dirs {
            if let Some(path) = scan_dir(dir, &wanted, 0) {
                return Some(path);
            }
        }
        None
    }
}

/// Candidate file stems for a family and style, most specific first.
fn candidate_stems(family: &str, bold: bool, italic: bool) -> Vec<String> {
    let base: String = family.chars().filter(|c| !c.is_whitespace()).collect();
    let mut stems = Vec::new();

    match (bold, italic) {
        (true, true) => {
            stems.push(format!("{}-BoldItalic", base));
            stems.push(format!("{}bi", base));
            stems.push(format!("{}-Bold", base));
        }
        (true, false) => {
            stems.push(format!("{}-Bold", base));
            stems.push(format!("{}bd", base));
        }
        (false, true) => {
            stems.push(format!("{}-Italic", base));
            stems.push(format!("{}i", base));
        }
        (false, false) => {}
    }

    stems.push(base.clone());
    stems.push(format!("{}-Regular", base));
    stems
}

fn scan_dir(dir: &Path, wanted_stem: &str, depth: usize) -> Option<PathBuf> {
    if depth > MAX_SCAN_DEPTH {
        return None;
    }
    let entries = std::fs::read_dir(dir).ok()?;

    let mut subdirs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            subdirs.push(path);
            continue;
        }

        let extension_ok = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| FONT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if !extension_ok {
            continue;
        }

        let stem_matches = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.eq_ignore_ascii_case(wanted_stem))
            .unwrap_or(false);
        if stem_matches {
            return Some(path);
        }
    }

    for subdir in subdirs {
        if let Some(found) = scan_dir(&subdir, wanted_stem, depth + 1) {
            return Some(found);
        }
    }
    None
}

fn platform_font_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    #[cfg(target_os = "windows")]
    {
        if let Ok(windir) = std::env::var("WINDIR") {
            dirs.push(PathBuf::from(windir).join("Fonts"));
        } else {
            dirs.push(PathBuf::from(r"C:\Windows\Fonts"));
        }
    }

    #[cfg(target_os = "macos")]
    {
        dirs.push(PathBuf::from("/System/Library/Fonts"));
        dirs.push(PathBuf::from("/Library/Fonts"));
        if let Some(home) = dirs::home_dir() {
            dirs.push(home.join("Library").join("Fonts"));
        }
    }

    #[cfg(target_os = "linux")]
    {
        dirs.push(PathBuf::from("/usr/share/fonts"));
        dirs.push(PathBuf::from("/usr/local/share/fonts"));
        if let Some(data) = dirs::data_dir() {
            dirs.push(data.join("fonts"));
        }
        if let Some(home) = dirs::home_dir() {
            dirs.push(home.join(".fonts"));
        }
    }

    dirs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_font_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("truetype").join("testsans");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("TestSans.ttf"), b"").unwrap();
        std::fs::write(nested.join("TestSans-Bold.ttf"), b"").unwrap();
        std::fs::write(dir.path().join("DejaVuSans.ttf"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();
        dir
    }

    #[test]
    fn test_resolves_exact_family() {
        let dir = fake_font_dir();
        let resolver = FontResolver::with_dirs(vec![dir.path().to_path_buf()]);

        let path = resolver.resolve("Test Sans", false, false).unwrap();
        assert_eq!(path.file_name().unwrap(), "TestSans.ttf");
    }

    #[test]
    fn test_resolves_bold_variant() {
        let dir = fake_font_dir();
        let resolver = FontResolver::with_dirs(vec![dir.path().to_path_buf()]);

        let path = resolver.resolve("TestSans", true, false).unwrap();
        assert_eq!(path.file_name().unwrap(), "TestSans-Bold.ttf");
    }

    #[test]
    fn test_missing_style_falls_back_to_regular() {
        let dir = fake_font_dir();
        let resolver = FontResolver::with_dirs(vec![dir.path().to_path_buf()]);

        // No italic cut exists; the regular file should be used.
        let path = resolver.resolve("TestSans", false, true).unwrap();
        assert_eq!(path.file_name().unwrap(), "TestSans.ttf");
    }

    #[test]
    fn test_unknown_family_uses_fallback_font() {
        let dir = fake_font_dir();
        let resolver = FontResolver::with_dirs(vec![dir.path().to_path_buf()]);

        let path = resolver.resolve("Nonexistent Family", false, false).unwrap();
        assert_eq!(path.file_name().unwrap(), "DejaVuSans.ttf");
    }

    #[test]
    fn test_empty_dirs_resolve_to_none() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = FontResolver::with_dirs(vec![dir.path().to_path_buf()]);
        assert!(resolver.resolve("Anything", false, false).is_none());
    }

    #[test]
    fn test_ignores_non_font_files() {
        let dir = fake_font_dir();
        let resolver = FontResolver::with_dirs(vec![dir.path().to_path_buf()]);

        // notes.txt matches the stem but is not a font file; the resolver
        // skips it and lands on the fallback font instead.
        let path = resolver.resolve("notes", false, false).unwrap();
        assert_eq!(path.file_name().unwrap(), "DejaVuSans.ttf");
    }
}
