//! Shared helpers for the two assemblers: which files they accept, in what
//! order, and how to measure them.

use std::io::Cursor;
use std::path::Path;

use image::ImageReader;
use tracing::warn;

use crate::contract::DownloadedImage;
use crate::error::DecodeError;

pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Lowercased extension of `path` if it is one the assemblers handle.
pub fn supported_extension(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    SUPPORTED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Extension as used in media types and resource names (`jpg` becomes `jpeg`).
pub fn normalized_extension(ext: &str) -> String {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" => "jpeg".to_string(),
        other => other.to_string(),
    }
}

pub fn media_type(ext: &str) -> String {
    format!("image/{}", normalized_extension(ext))
}

/// The images an assembler should use, in sequence order.
///
/// Files with unsupported extensions are logged and dropped.
pub fn assembly_order(images: &[DownloadedImage]) -> Vec<&DownloadedImage> {
    let mut ordered: Vec<&DownloadedImage> = images
        .iter()
        .filter(|image| {
            let keep = supported_extension(&image.local_path).is_some();
            if !keep {
                warn!(
                    path = %image.local_path.display(),
                    "Skipping file with unsupported image extension"
                );
            }
            keep
        })
        .collect();
    ordered.sort_by_key(|image| image.sequence_index);
    ordered
}

/// Pixel width and height of an encoded image, read from its header.
pub fn probe_dimensions(bytes: &[u8]) -> Result<(u32, u32), DecodeError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DecodeError::Image(e.to_string()))?
        .into_dimensions()
        .map_err(|e| DecodeError::Image(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        image::DynamicImage::new_rgb8(width, height)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn downloaded(name: &str, index: usize) -> DownloadedImage {
        DownloadedImage {
            source_url: format!("https://example.com/{name}"),
            local_path: PathBuf::from("images").join(name),
            sequence_index: index,
            byte_size: 1,
        }
    }

    #[test]
    fn extension_filtering_is_case_insensitive() {
        assert_eq!(supported_extension(Path::new("0001.JPG")).as_deref(), Some("jpg"));
        assert_eq!(supported_extension(Path::new("0002.webp")).as_deref(), Some("webp"));
        assert_eq!(supported_extension(Path::new("0003.php")), None);
        assert_eq!(supported_extension(Path::new("0004")), None);
    }

    #[test]
    fn jpg_media_type_is_jpeg() {
        assert_eq!(media_type("jpg"), "image/jpeg");
        assert_eq!(media_type("JPEG"), "image/jpeg");
        assert_eq!(media_type("png"), "image/png");
    }

    #[test]
    fn order_follows_sequence_and_drops_unsupported() {
        let images = vec![
            downloaded("0003.png", 3),
            downloaded("0001.jpg", 1),
            downloaded("0002.html", 2),
        ];
        let ordered: Vec<_> = assembly_order(&images)
            .into_iter()
            .map(|i| i.sequence_index)
            .collect();
        assert_eq!(ordered, vec![1, 3]);
    }

    #[test]
    fn probes_png_dimensions() {
        assert_eq!(probe_dimensions(&png(37, 52)).unwrap(), (37, 52));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(matches!(
            probe_dimensions(b"definitely not an image"),
            Err(DecodeError::Image(_))
        ));
    }
}
