//! `data:` URI helpers (encode / decode base64 payloads).

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use tracing::debug;

use crate::ImageError;

/// Wrap raw bytes as `data:<mime>;base64,<payload>`.
pub fn bytes_to_data_uri(bytes: &[u8], mime: &str) -> String {
    format!("data:{mime};base64,{}", BASE64.encode(bytes))
}

/// Wrap image file bytes as a data URI, taking the MIME type from the
/// bytes themselves.
pub fn sniff_data_uri(bytes: &[u8]) -> crate::Result<String> {
    let format = image::guess_format(bytes).map_err(ImageError::Decode)?;
    Ok(bytes_to_data_uri(bytes, format.to_mime_type()))
}

/// Split a base64 data URI into its MIME type and decoded payload.
pub fn decode_data_uri(uri: &str) -> crate::Result<(String, Vec<u8>)> {
    let rest = uri.strip_prefix("data:").ok_or(ImageError::NotDataUri)?;
    let (header, payload) = rest.split_once(',').ok_or(ImageError::NotDataUri)?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or(ImageError::NotDataUri)?;
    let bytes = BASE64.decode(payload.trim())?;
    Ok((mime.to_string(), bytes))
}

/// Decode a data URI image into (RGBA pixels, width, height).
pub fn decode_rgba(uri: &str) -> crate::Result<(Vec<u8>, u32, u32)> {
    let (mime, bytes) = decode_data_uri(uri)?;
    let img = image::load_from_memory(&bytes).map_err(ImageError::Decode)?;
    let rgba = img.to_rgba8();
    let (w, h) = rgba.dimensions();
    if w == 0 || h == 0 {
        return Err(ImageError::InvalidDimensions { width: w, height: h });
    }
    debug!("Decoded {mime} image ({w}x{h})");
    Ok((rgba.into_raw(), w, h))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_png() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(2, 3, image::Rgba([10, 20, 30, 255]));
        let mut out = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn data_uri_round_trip() {
        let uri = bytes_to_data_uri(b"hello", "text/plain");
        assert_eq!(uri, "data:text/plain;base64,aGVsbG8=");
        let (mime, bytes) = decode_data_uri(&uri).unwrap();
        assert_eq!(mime, "text/plain");
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn rejects_non_data_uris() {
        assert!(matches!(
            decode_data_uri("https://example.com/a.png"),
            Err(ImageError::NotDataUri)
        ));
        assert!(matches!(
            decode_data_uri("data:image/png,raw"),
            Err(ImageError::NotDataUri)
        ));
        assert!(matches!(
            decode_data_uri("data:image/png;base64,@@@"),
            Err(ImageError::Base64(_))
        ));
    }

    #[test]
    fn sniffs_png_and_decodes_pixels() {
        let uri = sniff_data_uri(&tiny_png()).unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
        let (pixels, w, h) = decode_rgba(&uri).unwrap();
        assert_eq!((w, h), (2, 3));
        assert_eq!(&pixels[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn svg_is_not_decodable() {
        let svg = br#"<svg xmlns="http://www.w3.org/2000/svg"/>"#;
        assert!(matches!(sniff_data_uri(svg), Err(ImageError::Decode(_))));
    }
}
