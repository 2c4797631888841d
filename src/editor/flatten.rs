//! Form flattening: bake widget appearances into page content.
//!
//! Each visible widget's normal appearance is drawn as a Form XObject on its
//! page, positioned with the mapping of ISO 32000-1:2008 Section 12.5.5
//! (Algorithm 8.1): the appearance BBox, transformed by the form's Matrix,
//! is fitted onto the annotation Rect. Widget annotations are then removed
//! and the AcroForm is emptied, so the document is no longer interactive.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use super::field_values::{annotation_dict, annotation_flags, appearance_state};
use crate::document::{is_widget, page_resources, resource_names, PdfDocument};
use crate::error::{Error, Result};
use crate::geometry::{Rect, IDENTITY_MATRIX};
use crate::object::{dict_by_id, dict_by_id_mut, get_dict, matrix_of, name, rect_of};
use crate::writer::form_fields::AnnotationFlags;

/// Prefix of XObject resource names added by flattening.
const FLATTEN_XOBJECT_PREFIX: &str = "Flat";

/// Outcome of flattening a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlattenSummary {
    /// Pages whose content received at least one appearance
    pub pages: usize,
    /// Appearances drawn into page content
    pub drawn: usize,
    /// Widget annotations removed (drawn, hidden or without appearance)
    pub removed: usize,
}

/// A widget appearance ready to be placed on its page.
#[derive(Debug, Clone)]
struct WidgetAppearance {
    stream_id: ObjectId,
    bbox: Rect,
    matrix: [f32; 6],
    rect: Rect,
}

/// Flatten every widget of the document and empty the AcroForm.
pub(crate) fn flatten_form(doc: &mut PdfDocument) -> Result<FlattenSummary> {
    let mut summary = FlattenSummary::default();

    for page_id in doc.page_ids() {
        let annots = doc.page_annotations(page_id);
        let (widgets, others): (Vec<Object>, Vec<Object>) =
            annots.into_iter().partition(|entry| is_widget(doc.graph(), entry));
        if widgets.is_empty() {
            continue;
        }

        let appearances: Vec<WidgetAppearance> = widgets
            .iter()
            .filter_map(|entry| widget_appearance(doc.graph(), entry))
            .collect();

        if !appearances.is_empty() {
            draw_appearances(doc.graph_mut(), page_id, &appearances)?;
            summary.pages += 1;
            summary.drawn += appearances.len();
        }

        summary.removed += widgets.len();
        doc.set_page_annotations(page_id, others)?;
    }

    let acroform = doc.acroform_mut()?;
    acroform.set("Fields", Vec::<Object>::new());
    acroform.remove(b"NeedAppearances");
    acroform.remove(b"XFA");
    acroform.remove(b"CO");

    log::info!(
        "Flattened form: {} appearance(s) drawn on {} page(s), {} widget(s) removed",
        summary.drawn,
        summary.pages,
        summary.removed
    );
    Ok(summary)
}

/// Normal appearance of a widget annotation, if it should be drawn.
fn widget_appearance(graph: &Document, entry: &Object) -> Option<WidgetAppearance> {
    let annot = annotation_dict(graph, entry)?;

    let flags = AnnotationFlags::from_bits_retain(annotation_flags(graph, annot));
    if flags.contains(AnnotationFlags::HIDDEN) {
        return None;
    }

    let rect = annot.get(b"Rect").ok().and_then(|r| rect_of(graph, r))?;
    let ap = get_dict(graph, annot, b"AP")?;
    let normal = ap.get(b"N").ok()?;

    // /N is either a stream or a dictionary of streams keyed by state.
    let stream_id = match normal {
        Object::Reference(id) => match graph.get_object(*id).ok()? {
            Object::Stream(_) => *id,
            Object::Dictionary(states) => state_stream(graph, annot, states)?,
            _ => return None,
        },
        Object::Dictionary(states) => state_stream(graph, annot, states)?,
        _ => return None,
    };

    let form = dict_by_id(graph, stream_id)?;
    let bbox = form.get(b"BBox").ok().and_then(|b| rect_of(graph, b))?;
    let matrix = form
        .get(b"Matrix")
        .ok()
        .and_then(|m| matrix_of(graph, m))
        .unwrap_or(IDENTITY_MATRIX);

    if bbox.transform(&matrix).is_empty() || rect.is_empty() {
        log::debug!("Skipping degenerate appearance {:?}", stream_id);
        return None;
    }

    Some(WidgetAppearance {
        stream_id,
        bbox,
        matrix,
        rect,
    })
}

/// Stream for the widget's `/AS` state in a state dictionary.
fn state_stream(graph: &Document, annot: &Dictionary, states: &Dictionary) -> Option<ObjectId> {
    let state = appearance_state(graph, annot)?;
    match states.get(state.as_bytes()).ok()? {
        Object::Reference(id) => match graph.get_object(*id).ok()? {
            Object::Stream(_) => Some(*id),
            _ => None,
        },
        _ => None,
    }
}

/// Register the appearances as page XObjects and draw them over the content.
fn draw_appearances(graph: &mut Document, page_id: ObjectId, appearances: &[WidgetAppearance]) -> Result<()> {
    let mut resources = page_resources(graph, page_id);
    let existing = resource_names(graph, &resources, b"XObject");
    let mut xobjects = get_dict(graph, &resources, b"XObject").cloned().unwrap_or_default();

    let mut overlay = Vec::new();
    let mut counter = 0usize;
    for appearance in appearances {
        let resource_name = loop {
            let candidate = format!("{}{}", FLATTEN_XOBJECT_PREFIX, counter);
            counter += 1;
            if !existing.iter().any(|n| n.as_slice() == candidate.as_bytes()) {
                break candidate;
            }
        };

        mark_form_xobject(graph, appearance.stream_id);
        xobjects.set(resource_name.as_str(), Object::Reference(appearance.stream_id));
        overlay.extend_from_slice(&placement_operators(appearance, &resource_name));
    }
    resources.set("XObject", xobjects);

    let existing_contents = page_contents(graph, page_id);
    let open_id = graph.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let mut closing = b"Q\n".to_vec();
    closing.extend_from_slice(&overlay);
    let close_id = graph.add_object(Stream::new(Dictionary::new(), closing));

    let mut contents = vec![Object::Reference(open_id)];
    contents.extend(existing_contents);
    contents.push(Object::Reference(close_id));

    let page = dict_by_id_mut(graph, page_id)
        .ok_or_else(|| Error::InvalidPdf(format!("page {:?} is not a dictionary", page_id)))?;
    page.set("Contents", contents);
    page.set("Resources", resources);
    Ok(())
}

/// `cm` and `Do` operators drawing one appearance at its widget rectangle.
fn placement_operators(appearance: &WidgetAppearance, resource_name: &str) -> Vec<u8> {
    // Do applies the form Matrix itself; only map the transformed BBox.
    let transformed = appearance.bbox.transform(&appearance.matrix);
    let rect = appearance.rect;
    let sx = rect.width / transformed.width;
    let sy = rect.height / transformed.height;
    let tx = rect.x - transformed.x * sx;
    let ty = rect.y - transformed.y * sy;

    format!(
        "q\n{:.6} 0 0 {:.6} {:.6} {:.6} cm\n/{} Do\nQ\n",
        sx, sy, tx, ty, resource_name
    )
    .into_bytes()
}

/// Make sure an appearance stream declares itself as a Form XObject.
fn mark_form_xobject(graph: &mut Document, stream_id: ObjectId) {
    if let Some(form) = dict_by_id_mut(graph, stream_id) {
        if !form.has(b"Type") {
            form.set("Type", name("XObject"));
        }
        if !form.has(b"Subtype") {
            form.set("Subtype", name("Form"));
        }
    }
}

/// Current `/Contents` of a page as a list of stream references.
fn page_contents(graph: &Document, page_id: ObjectId) -> Vec<Object> {
    let Some(page) = dict_by_id(graph, page_id) else {
        return Vec::new();
    };
    match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match graph.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            Ok(_) => vec![Object::Reference(*id)],
            Err(_) => Vec::new(),
        },
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}
