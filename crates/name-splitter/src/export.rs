//! PDF export of rendered pages
//!
//! Each page image becomes one PDF page holding a single RGB image XObject
//! that fills the page. Alpha is flattened onto white.

use crate::constants::px_to_pt;
use crate::raster::{ImageData, decode_image};
use crate::render::RenderedPage;
use crate::types::*;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::fs;
use std::path::{Path, PathBuf};

/// Concatenate the `layer` image of every page into one PDF at `output_path`.
///
/// Pages without that layer are skipped. Page size is the image size at
/// `dpi`.
pub fn export_pdf(
    pages: &[RenderedPage],
    output_path: &Path,
    layer: &str,
    dpi: u32,
) -> Result<PathBuf> {
    let images = pages
        .iter()
        .filter_map(|page| page.layer_path(layer))
        .map(decode_image)
        .collect::<Result<Vec<_>>>()?;
    if images.is_empty() {
        return Err(SplitError::InvalidArgument(format!(
            "No page images found for layer '{layer}'"
        )));
    }

    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let mut page_refs = Vec::with_capacity(images.len());
    for image in &images {
        let page_id = add_image_page(&mut doc, image, pages_id, dpi);
        page_refs.push(Object::Reference(page_id));
    }

    let count = page_refs.len() as i64;
    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(page_refs)),
        ("Count", Object::Integer(count)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }
    doc.save(output_path)?;
    log::info!(
        "Exported {} page(s) to {}",
        images.len(),
        output_path.display()
    );
    Ok(output_path.to_path_buf())
}

fn add_image_page(doc: &mut Document, image: &ImageData, parent: ObjectId, dpi: u32) -> ObjectId {
    let width_pt = px_to_pt(image.width(), dpi);
    let height_pt = px_to_pt(image.height(), dpi);

    let mut image_dict = Dictionary::new();
    image_dict.set("Type", Object::Name(b"XObject".to_vec()));
    image_dict.set("Subtype", Object::Name(b"Image".to_vec()));
    image_dict.set("Width", Object::Integer(i64::from(image.width())));
    image_dict.set("Height", Object::Integer(i64::from(image.height())));
    image_dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
    image_dict.set("BitsPerComponent", Object::Integer(8));
    let image_id = doc.add_object(Stream::new(image_dict, rgb_on_white(image)));

    let mut xobjects = Dictionary::new();
    xobjects.set("Im0", Object::Reference(image_id));
    let mut resources = Dictionary::new();
    resources.set("XObject", Object::Dictionary(xobjects));

    let content = format!("q\n{width_pt:.4} 0 0 {height_pt:.4} 0 0 cm\n/Im0 Do\nQ\n");
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

    let mut page_dict = Dictionary::new();
    page_dict.set("Type", Object::Name(b"Page".to_vec()));
    page_dict.set("Parent", Object::Reference(parent));
    page_dict.set(
        "MediaBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(width_pt),
            Object::Real(height_pt),
        ]),
    );
    page_dict.set("Contents", Object::Reference(content_id));
    page_dict.set("Resources", Object::Dictionary(resources));
    doc.add_object(page_dict)
}

/// Packed RGB bytes with alpha flattened onto white
fn rgb_on_white(image: &ImageData) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(image.pixels().len() * 3);
    for &[r, g, b, a] in image.pixels() {
        let a = u32::from(a);
        let flatten = |c: u8| ((u32::from(c) * a + 255 * (255 - a) + 127) / 255) as u8;
        bytes.extend([flatten(r), flatten(g), flatten(b)]);
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_on_white() {
        let image = ImageData::from_pixels(
            3,
            1,
            vec![[10, 20, 30, 255], [10, 20, 30, 0], [0, 0, 0, 128]],
        )
        .unwrap();

        assert_eq!(
            rgb_on_white(&image),
            vec![10, 20, 30, 255, 255, 255, 127, 127, 127]
        );
    }
}
