use std::path::Path;

/// Supported extensions and the registry identifier they map to.
const EXTENSIONS: &[(&str, &str)] = &[
    ("cs", "csharp"),
    ("kt", "kotlin"),
    ("kts", "kotlin"),
    ("php", "php"),
    ("phtml", "php"),
    ("swift", "swift"),
    ("js", "javascript"),
    ("mjs", "javascript"),
    ("cjs", "javascript"),
    ("jsx", "jsx"),
    ("ts", "typescript"),
    ("mts", "typescript"),
    ("cts", "typescript"),
    ("tsx", "tsx"),
];

/// Case-insensitive; a leading dot is ignored.
pub fn language_for_extension(ext: &str) -> Option<&'static str> {
    let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
    EXTENSIONS
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, lang)| *lang)
}

pub fn language_for_path(path: &Path) -> Option<&'static str> {
    path.extension()
        .and_then(|s| s.to_str())
        .and_then(language_for_extension)
}

pub fn supported_extensions() -> impl Iterator<Item = &'static str> {
    EXTENSIONS.iter().map(|(ext, _)| *ext)
}
