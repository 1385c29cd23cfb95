use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

/// Placeholder the authoring tool writes in front of every stored asset.
pub const CONTENT_STORAGE_PLACEHOLDER: &str = "${☣ CONTENTSTORAGE}";
/// Placeholder the player resolves to the archive's own location.
pub const IMG_PLACEHOLDER: &str = "${☣ LOCALPATH}";
/// Directory images are rewritten to inside an archive.
pub const PERSEUS_IMG_DIR: &str = "${☣ LOCALPATH}/images";
/// Separates the SVG body from its JSON sidecar in a graphie blob.
pub const GRAPHIE_DELIMITER: &[u8] = b"\n\n";

/// Timestamp stamped on every archive entry, `(year, month, day, hour, minute, second)`.
pub const ENTRY_TIMESTAMP: (u16, u16, u16, u16, u16, u16) = (2013, 3, 14, 1, 59, 26);
/// Comment attached to every archive entry.
pub const ENTRY_COMMENT: &str = "Perseus file generated during export process";

// `$$x$$` becomes `$x$`.
regex!(FORMULA_REGEX, r"\$(\$.+\$)\$");
regex!(MARKDOWN_IMAGE_REGEX, r"!\[(?:[^\]]*)]\(([^\)]+)\)");
// Path with an optional ` =WxH` size suffix.
regex!(IMAGE_PATH_REGEX, r"(.+/images/[^\s]+)(?:\s=([0-9\.]+)x([0-9\.]+))?");

regex!(INTEGER_REGEX, r"^[+-]?\d+$");
regex!(THOUSANDS_REGEX, r"^[+-]?\d{1,3}(?:,\d{3})+(?:\.\d+)?$");
regex!(DECIMAL_REGEX, r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?$");
regex!(FRACTION_REGEX, r"^([+-]?\d+)\s*/\s*(\d+)$");
regex!(MIXED_NUMBER_REGEX, r"^([+-]?)(\d+)\s+(\d+)\s*/\s*(\d+)$");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_dir_is_under_local_path() {
        assert_eq!(PERSEUS_IMG_DIR, format!("{IMG_PLACEHOLDER}/images"));
    }
}
