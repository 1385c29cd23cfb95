//! Thumbnail encodings: small PNGs stored inline as base64 data URIs.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use derive_more::{Display, Error};
use exn::{OptionExt, ResultExt};
use image::ImageFormat;
use serde_json::{Value, json};
use std::io::Cursor;

pub type Result<T> = std::result::Result<T, exn::Exn<ThumbnailError>>;

/// Thumbnail failures. Both are recovered from by the caller.
#[derive(Debug, Display, Error)]
pub enum ThumbnailError {
    /// The source image could not be read or decoded.
    #[display("could not derive thumbnail: {_0}")]
    Derivation(#[error(not(source))] String),
    /// A stored encoding is not the expected JSON object or data URI.
    #[display("malformed thumbnail encoding: {_0}")]
    MalformedEncoding(#[error(not(source))] String),
}

const DATA_URI_PREFIX: &str = "data:image/";
const BASE64_MARKER: &str = ";base64,";

/// Extract the data URI from a stored encoding.
///
/// Returns `None` when there is no encoding or it has no `base64` value.
pub fn parse_encoding(raw: Option<&str>) -> Result<Option<String>> {
    let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) else {
        return Ok(None);
    };
    let value: Value = serde_json::from_str(raw).or_raise(|| ThumbnailError::MalformedEncoding(raw.to_string()))?;
    if !value.is_object() {
        exn::bail!(ThumbnailError::MalformedEncoding(raw.to_string()));
    }
    Ok(base64_value(&value))
}

/// The non-empty `base64` string of an already parsed encoding object.
pub fn base64_value(encoding: &Value) -> Option<String> {
    encoding.get("base64").and_then(Value::as_str).filter(|s| !s.is_empty()).map(str::to_string)
}

/// The JSON stored back on a node after deriving its thumbnail.
pub fn encoding_json(data_uri: &str) -> String {
    json!({"base64": data_uri, "points": [], "zoom": 0}).to_string()
}

/// Downscale an image to fit a `size`x`size` box and encode it as a PNG
/// data URI.
pub fn derive_encoding(bytes: &[u8], size: u32) -> Result<String> {
    let image = image::load_from_memory(bytes).or_raise(|| ThumbnailError::Derivation("unrecognized image".into()))?;
    let mut png = Vec::new();
    image
        .thumbnail(size, size)
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .or_raise(|| ThumbnailError::Derivation("could not encode PNG".into()))?;
    Ok(format!("{DATA_URI_PREFIX}png{BASE64_MARKER}{}", STANDARD.encode(png)))
}

/// Decode a data URI into its bytes and file extension.
pub fn decode_data_uri(data_uri: &str) -> Result<(Vec<u8>, String)> {
    let malformed = || ThumbnailError::MalformedEncoding(truncated(data_uri));
    let rest = data_uri.strip_prefix(DATA_URI_PREFIX).ok_or_raise(malformed)?;
    let (subtype, payload) = rest.split_once(BASE64_MARKER).ok_or_raise(malformed)?;
    let extension = match subtype {
        "jpeg" => "jpg",
        "svg+xml" => "svg",
        other => other,
    };
    let bytes = STANDARD.decode(payload.trim()).or_raise(malformed)?;
    Ok((bytes, extension.to_string()))
}

fn truncated(value: &str) -> String {
    value.chars().take(48).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_pixel(width, height, Rgb([200, 30, 30]));
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        bytes
    }

    #[test]
    fn test_derived_thumbnail_fits_box() {
        let encoding = derive_encoding(&png(512, 256), 128).unwrap();
        let (bytes, extension) = decode_data_uri(&encoding).unwrap();
        assert_eq!(extension, "png");
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (128, 64));
    }

    #[test]
    fn test_unreadable_image() {
        let err = derive_encoding(b"definitely not an image", 128).unwrap_err();
        assert!(matches!(&*err, ThumbnailError::Derivation(_)));
    }

    #[test]
    fn test_parse_encoding() {
        let stored = encoding_json("data:image/png;base64,AAAA");
        assert_eq!(parse_encoding(Some(&stored)).unwrap().as_deref(), Some("data:image/png;base64,AAAA"));
        assert_eq!(parse_encoding(None).unwrap(), None);
        assert_eq!(parse_encoding(Some(r#"{"base64": ""}"#)).unwrap(), None);
        let err = parse_encoding(Some("not json")).unwrap_err();
        assert!(matches!(&*err, ThumbnailError::MalformedEncoding(_)));
        assert!(parse_encoding(Some("[1, 2]")).is_err());
    }

    #[test]
    fn test_malformed_data_uri() {
        assert!(decode_data_uri("https://example.com/a.png").is_err());
        assert!(decode_data_uri("data:image/png;base64,@@@").is_err());
    }
}
