//! SVG pages to a single PDF
//!
//! Each page is parsed with usvg and converted to a one-page PDF in memory by
//! svg2pdf (page size = the SVG's intrinsic size at 72 dpi). The one-page
//! documents are then renumbered into a shared object space and hung off a
//! single page tree with lopdf.
//!
//! Input images are deleted only after the output has been written. If any
//! step fails they stay on disk for inspection.
//!
//! This is CPU-bound and synchronous; async callers should use
//! `tokio::task::spawn_blocking`.

use crate::models::AssetFile;
use lopdf::{dictionary, Document, Object, ObjectId};
use std::path::{Path, PathBuf};
use svg2pdf::usvg;
use svg2pdf::{ConversionOptions, PageOptions};
use thiserror::Error;
use tracing::{debug, info};

/// Document assembly errors
#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("No pages to assemble")]
    NoPages,

    #[error("Failed to read page {path}: {source}")]
    ReadPage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid SVG {path}: {message}")]
    InvalidSvg { path: PathBuf, message: String },

    #[error("PDF conversion failed for {path}: {message}")]
    Conversion { path: PathBuf, message: String },

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of a successful assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledDocument {
    pub path: PathBuf,
    pub page_count: usize,
}

/// Image asset paths sorted by ascending section
///
/// Assets of non-paginated formats are ignored.
pub fn order_pages(assets: &[AssetFile]) -> Vec<PathBuf> {
    let mut pages: Vec<&AssetFile> = assets
        .iter()
        .filter(|asset| asset.format.is_paginated())
        .collect();
    pages.sort_by_key(|asset| asset.section);
    pages.into_iter().map(|asset| asset.path.clone()).collect()
}

/// Convert `ordered_image_paths` into one PDF at `output_path`, then delete them
///
/// Page order in the output equals the order of `ordered_image_paths`.
pub fn assemble_document(
    output_path: &Path,
    ordered_image_paths: &[PathBuf],
) -> Result<AssembledDocument, AssembleError> {
    if ordered_image_paths.is_empty() {
        return Err(AssembleError::NoPages);
    }

    let mut options = usvg::Options::default();
    options.fontdb_mut().load_system_fonts();

    let mut pages = Vec::with_capacity(ordered_image_paths.len());
    for (index, path) in ordered_image_paths.iter().enumerate() {
        debug!(page = index, path = %path.display(), "Rendering page");
        pages.push(render_page(path, &options)?);
    }

    let page_count = pages.len();
    let mut merged = merge_pages(pages)?;
    merged.compress();
    merged
        .save(output_path)
        .map_err(|e| AssembleError::Pdf(format!("write {}: {}", output_path.display(), e)))?;

    info!(path = %output_path.display(), pages = page_count, "Document written");

    cleanup_images(ordered_image_paths)?;

    Ok(AssembledDocument {
        path: output_path.to_path_buf(),
        page_count,
    })
}

/// Delete intermediate page images
pub fn cleanup_images(paths: &[PathBuf]) -> Result<(), AssembleError> {
    for path in paths {
        std::fs::remove_file(path)?;
        debug!(path = %path.display(), "Removed page image");
    }
    Ok(())
}

/// One SVG file to a one-page PDF document
fn render_page(path: &Path, options: &usvg::Options) -> Result<Document, AssembleError> {
    let data = std::fs::read(path).map_err(|source| AssembleError::ReadPage {
        path: path.to_path_buf(),
        source,
    })?;

    let tree = usvg::Tree::from_data(&data, options).map_err(|e| AssembleError::InvalidSvg {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let pdf = svg2pdf::to_pdf(&tree, ConversionOptions::default(), PageOptions::default())
        .map_err(|e| AssembleError::Conversion {
            path: path.to_path_buf(),
            message: format!("{:?}", e),
        })?;

    Document::load_mem(&pdf).map_err(|e| AssembleError::Pdf(e.to_string()))
}

/// Append every page of every document, in order, under one page tree
fn merge_pages(documents: Vec<Document>) -> Result<Document, AssembleError> {
    let mut merged = Document::with_version("1.7");
    let pages_id = merged.new_object_id();
    let mut kids: Vec<Object> = Vec::new();

    for mut document in documents {
        document.renumber_objects_with(merged.max_id + 1);
        merged.max_id = document.max_id;

        // get_pages is keyed by page number, so values come out in page order
        let page_ids: Vec<ObjectId> = document.get_pages().into_values().collect();

        for (object_id, object) in document.objects {
            if !is_page_tree_root(&object) {
                merged.objects.insert(object_id, object);
            }
        }

        for page_id in page_ids {
            let page = merged
                .get_object_mut(page_id)
                .and_then(|object| object.as_dict_mut())
                .map_err(|e| AssembleError::Pdf(format!("page {:?}: {}", page_id, e)))?;
            page.set("Parent", pages_id);
            kids.push(Object::Reference(page_id));
        }
    }

    let count = kids.len() as i64;
    merged.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = merged.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    merged.trailer.set("Root", catalog_id);

    Ok(merged)
}

/// Catalog and Pages nodes are rebuilt for the merged document
fn is_page_tree_root(object: &Object) -> bool {
    match object {
        Object::Dictionary(dict) => matches!(
            dict.get(b"Type"),
            Ok(Object::Name(name)) if name.as_slice() == b"Catalog" || name.as_slice() == b"Pages"
        ),
        _ => false,
    }
}
