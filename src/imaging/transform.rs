use crate::error::{Result, StagingError};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ExtendedColorType, ImageEncoder, ImageReader};
use reqwest::Client;
use std::io::Cursor;

pub fn encode_data_uri(bytes: &[u8], mime_type: &str) -> String {
    format!("data:{};base64,{}", mime_type, BASE64.encode(bytes))
}

/// Split a base64 `data:` URI into its payload and MIME type.
pub fn decode_data_uri(uri: &str) -> Result<(Vec<u8>, String)> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| StagingError::Image("not a data URI".into()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| StagingError::Image("data URI has no payload".into()))?;
    let mime_type = header
        .strip_suffix(";base64")
        .ok_or_else(|| StagingError::Image("only base64 data URIs are supported".into()))?;

    let bytes = BASE64
        .decode(payload.trim())
        .map_err(|e| StagingError::Image(format!("invalid base64 payload: {}", e)))?;
    let mime_type = if mime_type.is_empty() {
        "application/octet-stream"
    } else {
        mime_type
    };
    Ok((bytes, mime_type.to_string()))
}

/// Width and height read from the image header without a full decode.
pub fn image_dimensions(bytes: &[u8]) -> Result<(u32, u32)> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| StagingError::Image(format!("cannot sniff image format: {}", e)))?;
    Ok(reader.into_dimensions()?)
}

/// Accept `data:` URIs and http(s) URLs whose host is in `allowed_hosts`
/// (exact match or a subdomain of an entry).
pub fn check_image_source(url: &str, allowed_hosts: &[String]) -> Result<()> {
    if url.starts_with("data:") {
        return Ok(());
    }

    let parsed = reqwest::Url::parse(url)
        .map_err(|e| StagingError::Validation(format!("imageUrl is not a valid URL: {}", e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(StagingError::Validation(format!(
            "imageUrl scheme '{}' is not allowed",
            parsed.scheme()
        )));
    }
    let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
    let allowed = allowed_hosts.iter().any(|entry| {
        let entry = entry.trim().to_ascii_lowercase();
        !entry.is_empty() && (host == entry || host.ends_with(&format!(".{}", entry)))
    });
    if !allowed {
        return Err(StagingError::Validation(format!(
            "imageUrl host '{}' is not allowed",
            host
        )));
    }
    Ok(())
}

fn too_large(max_bytes: usize) -> StagingError {
    StagingError::Image(format!("image exceeds the {} byte limit", max_bytes))
}

/// Download at most `max_bytes` of image data. `data:` URIs are decoded locally.
pub async fn fetch_image(http: &Client, url: &str, max_bytes: usize) -> Result<Vec<u8>> {
    if url.starts_with("data:") {
        let (bytes, _) = decode_data_uri(url)?;
        if bytes.len() > max_bytes {
            return Err(too_large(max_bytes));
        }
        return Ok(bytes);
    }

    let mut response = http
        .get(url)
        .send()
        .await
        .map_err(|e| StagingError::Request(format!("failed downloading image ({}): {}", url, e)))?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(StagingError::Response(format!(
            "image download failed ({}): {}",
            status.as_u16(),
            body.chars().take(512).collect::<String>()
        )));
    }
    if response.content_length().map_or(false, |len| len > max_bytes as u64) {
        return Err(too_large(max_bytes));
    }

    let mut bytes = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if bytes.len() + chunk.len() > max_bytes {
            return Err(too_large(max_bytes));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// Scale to cover `width`x`height`, crop the overflow evenly, and encode as JPEG.
pub fn cover_resize_jpeg(bytes: &[u8], width: u32, height: u32, quality: u8) -> Result<Vec<u8>> {
    let source = image::load_from_memory(bytes)?;
    let fitted = if source.width() == width && source.height() == height {
        source
    } else {
        source.resize_to_fill(width, height, FilterType::Lanczos3)
    };
    let rgb = fitted.to_rgb8();

    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality).write_image(
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(buf)
}

#[cfg(test)]
pub(crate) fn test_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, 80)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
    buf
}
