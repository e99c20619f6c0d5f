//! Reflowable e-book output: one chapter per image.

use std::path::{Path, PathBuf};

use epub_builder::{EpubBuilder, EpubContent, EpubVersion, ReferenceType, ZipLibrary};
use tracing::{error, info};

use crate::contract::DownloadedImage;
use crate::download::persist_atomically;
use crate::error::AssemblyError;
use crate::images::{assembly_order, media_type, normalized_extension, supported_extension};

/// Navigation page opening the spine; it links every chapter in order.
pub const NAV_DOCUMENT: &str = "contents.xhtml";
const NAV_TITLE: &str = "Pages";

const LANGUAGE: &str = "en";
const AUTHOR: &str = "Comic Compiler";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpubReport {
    pub path: PathBuf,
    /// Chapter documents in reading order.
    pub chapters: Vec<String>,
    /// Resource name of the cover image.
    pub cover: Option<String>,
    pub spine: Vec<String>,
    pub skipped: usize,
}

/// Names for the chapter built from the image at `position` (0-based).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterNames {
    pub resource: String,
    pub document: String,
    pub title: String,
}

impl ChapterNames {
    pub fn new(position: usize, ext: &str) -> Self {
        Self {
            resource: format!("image_{position:03}.{}", normalized_extension(ext)),
            document: format!("page_{position:03}.xhtml"),
            title: format!("Page {}", position + 1),
        }
    }

    fn xhtml(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head>
    <title>{title}</title>
    <style>
        body {{ margin: 0; padding: 0; text-align: center; }}
        img {{ max-width: 100%; height: auto; }}
    </style>
</head>
<body>
    <img src="{resource}" alt="{title}"/>
</body>
</html>
"#,
            title = self.title,
            resource = self.resource,
        )
    }
}

fn epub_err(e: impl std::fmt::Display) -> AssemblyError {
    AssemblyError::Epub(e.to_string())
}

/// Build the EPUB for one issue at `output_path`.
///
/// Images that cannot be read are logged and left out; the book is still
/// written with the remaining chapters.
pub fn assemble(
    images: &[DownloadedImage],
    output_path: &Path,
    title: &str,
) -> Result<EpubReport, AssemblyError> {
    let ordered = assembly_order(images);
    if ordered.is_empty() {
        error!(path = %output_path.display(), "No images found for EPUB creation");
        return Err(AssemblyError::NoImages);
    }
    info!(images = ordered.len(), "Creating EPUB");

    let mut builder = EpubBuilder::new(ZipLibrary::new().map_err(epub_err)?).map_err(epub_err)?;
    builder.epub_version(EpubVersion::V30);
    builder.metadata("title", title).map_err(epub_err)?;
    builder.metadata("author", AUTHOR).map_err(epub_err)?;
    builder.metadata("lang", LANGUAGE).map_err(epub_err)?;

    // Resources first, so the navigation page only links chapters that exist.
    let mut pages: Vec<ChapterNames> = Vec::with_capacity(ordered.len());
    let mut cover = None;
    let mut skipped = 0;

    for (position, image) in ordered.iter().enumerate() {
        let path = &image.local_path;
        let ext = supported_extension(path).unwrap_or_default();
        let names = ChapterNames::new(position, &ext);

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Error processing image for EPUB, skipping");
                skipped += 1;
                continue;
            }
        };

        let mime = media_type(&ext);
        let registered = if cover.is_none() {
            builder.add_cover_image(&names.resource, bytes.as_slice(), mime)
        } else {
            builder.add_resource(&names.resource, bytes.as_slice(), mime)
        };
        if let Err(e) = registered {
            error!(path = %path.display(), error = %e, "Error processing image for EPUB, skipping");
            skipped += 1;
            continue;
        }
        if cover.is_none() {
            cover = Some(names.resource.clone());
        }
        pages.push(names);
    }

    if pages.is_empty() {
        error!(path = %output_path.display(), "No readable images for EPUB");
        return Err(AssemblyError::NoRenderablePages {
            attempted: ordered.len(),
        });
    }

    // Spine order is the order content is added. An untitled entry stays out
    // of the table of contents.
    let mut spine = Vec::with_capacity(pages.len() + 1);
    let nav = nav_xhtml(&pages);
    builder
        .add_content(EpubContent::new(NAV_DOCUMENT, nav.as_bytes()).reftype(ReferenceType::Toc))
        .map_err(epub_err)?;
    spine.push(NAV_DOCUMENT.to_string());

    for names in &pages {
        let xhtml = names.xhtml();
        builder
            .add_content(
                EpubContent::new(names.document.as_str(), xhtml.as_bytes())
                    .title(names.title.as_str())
                    .reftype(ReferenceType::Text),
            )
            .map_err(epub_err)?;
        spine.push(names.document.clone());
    }

    let mut bytes = Vec::new();
    builder.generate(&mut bytes).map_err(epub_err)?;

    persist_atomically(output_path, &bytes).map_err(|source| {
        error!(path = %output_path.display(), error = ?source, "Failed to write EPUB");
        AssemblyError::Write {
            path: output_path.to_path_buf(),
            source,
        }
    })?;
    info!(
        path = %output_path.display(),
        chapters = pages.len(),
        skipped,
        "EPUB created"
    );

    Ok(EpubReport {
        path: output_path.to_path_buf(),
        chapters: pages.into_iter().map(|names| names.document).collect(),
        cover,
        spine,
        skipped,
    })
}

fn nav_xhtml(pages: &[ChapterNames]) -> String {
    let items: String = pages
        .iter()
        .map(|names| {
            format!(
                "        <li><a href=\"{}\">{}</a></li>\n",
                names.document, names.title
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head>
    <title>{NAV_TITLE}</title>
</head>
<body>
    <nav epub:type="toc">
    <h1>{NAV_TITLE}</h1>
    <ol>
{items}    </ol>
    </nav>
</body>
</html>
"#
    )
}
