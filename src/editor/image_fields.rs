//! Embedding raster images into field widgets.
//!
//! The image replaces the normal appearance of the field's first widget.
//! It is scaled uniformly to the widget's content area (the rectangle inside
//! the border) and centered, so it is never cropped or distorted.

use lopdf::{dictionary, Object, Stream};

use super::field_values::{form_xobject, set_normal_appearance};
use super::form_fields::Field;
use crate::document::PdfDocument;
use crate::error::{Error, Result};
use crate::geometry::Rect;
use crate::object::dict_by_id_mut;
use crate::writer::image_handler::EmbeddedImage;

/// Resource name of the image inside the appearance stream.
const IMAGE_RESOURCE: &str = "Img0";

/// Where an image lands inside a widget, in appearance-space coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePlacement {
    /// Area inside the border available to the image
    pub content: Rect,
    /// Area the image actually covers
    pub image: Rect,
}

/// Compute the placement of a `width` x `height` image in a widget.
///
/// # Errors
///
/// [`Error::InvalidArgument`] when the border leaves no room for content.
pub fn image_placement(widget_rect: &Rect, border_width: f32, width: u32, height: u32) -> Result<ImagePlacement> {
    let content = Rect::new(0.0, 0.0, widget_rect.width, widget_rect.height).inset(border_width);
    if content.is_empty() {
        return Err(Error::InvalidArgument(format!(
            "widget of {}x{} has no room inside a border of {}",
            widget_rect.width, widget_rect.height, border_width
        )));
    }
    Ok(ImagePlacement {
        content,
        image: content.fit_centered(width as f32, height as f32),
    })
}

/// Draw `bytes` as the appearance of the field's first widget.
pub(crate) fn embed_image(doc: &mut PdfDocument, field: &Field, bytes: &[u8]) -> Result<ImagePlacement> {
    let widget = field
        .widgets()
        .first()
        .ok_or_else(|| Error::InvalidPdf(format!("field '{}' has no widget", field.name())))?;

    let image = EmbeddedImage::from_bytes(bytes)?;
    let placement = image_placement(&widget.rect, widget.border_width, image.width, image.height)?;

    let graph = doc.graph_mut();
    let image_id = image.add_to_document(graph);

    let placed = placement.image;
    let content = format!(
        "q\n{:.4} 0 0 {:.4} {:.4} {:.4} cm\n/{} Do\nQ\n",
        placed.width, placed.height, placed.x, placed.y, IMAGE_RESOURCE
    );
    let resources = dictionary! {
        "XObject" => dictionary! { IMAGE_RESOURCE => Object::Reference(image_id) },
    };
    let form_id = graph.add_object(Stream::new(form_xobject(&widget.rect, resources), content.into_bytes()));

    set_normal_appearance(graph, widget.id, Object::Reference(form_id))?;
    if let Some(dict) = dict_by_id_mut(graph, widget.id) {
        dict.remove(b"AS");
    }

    log::debug!(
        "Embedded {}x{} image into '{}' at {:?}",
        image.width,
        image.height,
        field.name(),
        placed
    );
    Ok(placement)
}
