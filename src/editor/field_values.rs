//! Reading and writing field values.
//!
//! Text and choice fields store their value as a PDF text string in `/V`.
//! Checkboxes and radio groups store the name of their export state; each
//! widget then shows that state through `/AS`. Writing a value optionally
//! rebuilds the widgets' normal appearances, see [`AppearanceMode`].

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use super::form_fields::{Field, FieldKind, Widget};
use crate::config::FormOptions;
use crate::document::PdfDocument;
use crate::error::{Error, Result};
use crate::geometry::Rect;
use crate::object::{
    dict_by_id, dict_by_id_mut, dict_of, encode_text_string, get, get_dict, inherited, integer_of,
    name, name_of, number_of, rect_object, resolve, text_of,
};
use crate::writer::form_fields::{
    raw_bits, Color, DefaultAppearance, FormAppearanceGenerator, TextAlignment, TextFieldFlags,
    TextStyle,
};

/// Name of the off state of checkboxes and radio buttons.
pub const OFF_STATE: &str = "Off";

/// Whether writing a value rebuilds the widgets' appearance streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppearanceMode {
    /// Always rebuild the appearance from the new value
    Regenerate,
    /// Keep existing appearances; viewers are asked to rebuild them
    Keep,
    /// Let the field kind decide (rebuild text and choice fields only)
    #[default]
    Auto,
}

impl AppearanceMode {
    /// Resolve the mode for a field kind.
    pub fn regenerates(&self, kind: FieldKind) -> bool {
        match self {
            AppearanceMode::Regenerate => true,
            AppearanceMode::Keep => false,
            AppearanceMode::Auto => kind.regenerates_by_default(),
        }
    }
}

impl From<bool> for AppearanceMode {
    fn from(regenerate: bool) -> Self {
        if regenerate {
            AppearanceMode::Regenerate
        } else {
            AppearanceMode::Keep
        }
    }
}

/// Current value of a field.
///
/// Push buttons, signatures and fields without `/V` read as an empty string.
/// Multi-select choice values read as their first selection.
pub(crate) fn read_value(graph: &Document, field: &Field) -> String {
    if !field.kind().has_value() {
        return String::new();
    }
    let Some(dict) = dict_by_id(graph, field.object_id()) else {
        return String::new();
    };
    match inherited(graph, dict, b"V") {
        Some(Object::Array(items)) => items
            .first()
            .and_then(|item| resolve(graph, item))
            .and_then(text_of)
            .unwrap_or_default(),
        Some(value) => text_of(value).unwrap_or_default(),
        None => String::new(),
    }
}

/// Store `value` in a field and update its widgets.
pub(crate) fn write_value(
    doc: &mut PdfDocument,
    field: &Field,
    value: &str,
    mode: AppearanceMode,
    options: &FormOptions,
) -> Result<()> {
    let regenerate = mode.regenerates(field.kind());
    match field.kind() {
        FieldKind::Text | FieldKind::Choice => write_text(doc, field, value, regenerate, options),
        FieldKind::Checkbox | FieldKind::Radio => write_state(doc, field, value, regenerate, options),
        kind => Err(Error::InvalidArgument(format!(
            "{} field '{}' has no text value",
            kind,
            field.name()
        ))),
    }
}

fn field_dict_mut<'a>(doc: &'a mut PdfDocument, field: &Field) -> Result<&'a mut Dictionary> {
    dict_by_id_mut(doc.graph_mut(), field.object_id())
        .ok_or_else(|| Error::InvalidPdf(format!("field '{}' is not a dictionary", field.name())))
}

fn write_text(
    doc: &mut PdfDocument,
    field: &Field,
    value: &str,
    regenerate: bool,
    options: &FormOptions,
) -> Result<()> {
    let dict = field_dict_mut(doc, field)?;
    dict.set("V", encode_text_string(value));
    if field.kind() == FieldKind::Choice {
        // Selected indices would contradict the new value.
        dict.remove(b"I");
    }

    let mut needs_viewer_rebuild = !regenerate;
    if regenerate {
        for widget in field.widgets() {
            needs_viewer_rebuild |= regenerate_text_widget(doc, field, widget, value, options)?;
        }
        log::debug!("Regenerated {} appearance(s) of '{}'", field.widgets().len(), field.name());
    }
    if needs_viewer_rebuild {
        doc.set_need_appearances(true)?;
    }
    Ok(())
}

/// Resolve the text style of a widget from `/DA`, `/Q` and the field flags.
fn text_style(
    doc: &PdfDocument,
    field: &Field,
    widget: &Dictionary,
    options: &FormOptions,
) -> TextStyle {
    let graph = doc.graph();
    let acroform = doc.acroform().ok();

    let da = inherited(graph, widget, b"DA")
        .and_then(text_of)
        .or_else(|| doc.default_appearance())
        .unwrap_or_default();
    let parsed = DefaultAppearance::parse(&da);
    let (r, g, b) = options.text_color;

    let q = inherited(graph, widget, b"Q")
        .or_else(|| acroform.and_then(|form| get(graph, form, b"Q")))
        .and_then(integer_of)
        .unwrap_or(0);

    let flags = TextFieldFlags::from_bits_retain(field.flags());
    let is_text = field.kind() == FieldKind::Text;

    TextStyle {
        font: parsed.font.unwrap_or_else(|| options.default_font.clone()),
        size: parsed.size.unwrap_or(options.default_font_size),
        color: parsed.color.unwrap_or(Color::Rgb(r, g, b)),
        alignment: TextAlignment::from_q(q),
        multiline: is_text && flags.contains(TextFieldFlags::MULTILINE),
        password: is_text && flags.contains(TextFieldFlags::PASSWORD),
        auto_size_range: (options.min_auto_font_size, options.max_auto_font_size),
    }
}

/// `/MK` color entry (`BG` or `BC`) of a widget.
fn mk_color(graph: &Document, widget: &Dictionary, key: &[u8]) -> Option<Color> {
    let mk = get_dict(graph, widget, b"MK")?;
    let components: Vec<f32> = match get(graph, mk, key)? {
        Object::Array(items) => items
            .iter()
            .filter_map(|item| resolve(graph, item).and_then(number_of))
            .collect(),
        _ => return None,
    };
    Color::from_components(&components)
}

fn appearance_generator(graph: &Document, widget: &Dictionary, border_width: f32) -> FormAppearanceGenerator {
    FormAppearanceGenerator::new()
        .with_background(mk_color(graph, widget, b"BG"))
        .with_border(border_width, mk_color(graph, widget, b"BC"))
}

fn widget_dict<'a>(graph: &'a Document, widget: &Widget) -> Result<&'a Dictionary> {
    dict_by_id(graph, widget.id)
        .ok_or_else(|| Error::InvalidPdf(format!("widget {:?} is not a dictionary", widget.id)))
}

/// Form XObject dictionary with a BBox matching `rect` at the origin.
pub(crate) fn form_xobject(rect: &Rect, resources: Dictionary) -> Dictionary {
    dictionary! {
        "Type" => "XObject",
        "Subtype" => "Form",
        "BBox" => rect_object(&Rect::new(0.0, 0.0, rect.width, rect.height)),
        "Resources" => resources,
    }
}

/// Rebuild the normal appearance of a text or choice widget.
///
/// Returns true when the text contains characters the appearance cannot show.
fn regenerate_text_widget(
    doc: &mut PdfDocument,
    field: &Field,
    widget: &Widget,
    value: &str,
    options: &FormOptions,
) -> Result<bool> {
    let (style, generator) = {
        let graph = doc.graph();
        let dict = widget_dict(graph, widget)?;
        (
            text_style(doc, field, dict, options),
            appearance_generator(graph, dict, widget.border_width),
        )
    };

    let bbox = Rect::new(0.0, 0.0, widget.rect.width, widget.rect.height);
    let (content, lossy) = generator.text_field_appearance(bbox, value, &style);

    let font = doc.font_resource(&style.font)?;
    let resources = dictionary! {
        "Font" => dictionary! { style.font.as_str() => font },
    };
    let graph = doc.graph_mut();
    let stream_id = graph.add_object(Stream::new(form_xobject(&widget.rect, resources), content));
    set_normal_appearance(graph, widget.id, Object::Reference(stream_id))?;

    Ok(lossy)
}

/// Replace the widget's `/AP` with a single normal appearance.
pub(crate) fn set_normal_appearance(graph: &mut Document, widget_id: ObjectId, normal: Object) -> Result<()> {
    let dict = dict_by_id_mut(graph, widget_id)
        .ok_or_else(|| Error::InvalidPdf(format!("widget {:?} is not a dictionary", widget_id)))?;
    dict.set("AP", dictionary! { "N" => normal });
    Ok(())
}

/// Appearance state names declared by a widget's normal appearance.
pub(crate) fn appearance_states(graph: &Document, widget: &Dictionary) -> Vec<String> {
    let Some(ap) = get_dict(graph, widget, b"AP") else {
        return Vec::new();
    };
    match get(graph, ap, b"N") {
        Some(Object::Dictionary(states)) => states
            .iter()
            .map(|(key, _)| String::from_utf8_lossy(key).into_owned())
            .collect(),
        _ => Vec::new(),
    }
}

fn write_state(
    doc: &mut PdfDocument,
    field: &Field,
    value: &str,
    regenerate: bool,
    options: &FormOptions,
) -> Result<()> {
    // The state name is stored as given, even if no widget declares it.
    field_dict_mut(doc, field)?.set("V", name(value));

    for widget in field.widgets() {
        if regenerate {
            regenerate_button_widget(doc, field, widget, value, options)?;
        }

        let graph = doc.graph_mut();
        let states = appearance_states(graph, widget_dict(graph, widget)?);
        let shown = if states.iter().any(|s| s == value) { value } else { OFF_STATE };
        if !states.iter().any(|s| s == value) && value != OFF_STATE {
            log::debug!("Widget {:?} of '{}' has no state /{}", widget.id, field.name(), value);
        }
        if let Some(dict) = dict_by_id_mut(graph, widget.id) {
            dict.set("AS", name(shown));
        }
    }
    Ok(())
}

/// Rebuild the on and off appearances of a checkbox or radio widget.
fn regenerate_button_widget(
    doc: &mut PdfDocument,
    field: &Field,
    widget: &Widget,
    value: &str,
    options: &FormOptions,
) -> Result<()> {
    let graph = doc.graph();
    let dict = widget_dict(graph, widget)?;

    let declared = appearance_states(graph, dict);
    let on_state = declared
        .iter()
        .find(|state| state.as_str() != OFF_STATE)
        .cloned()
        .or_else(|| (value != OFF_STATE).then(|| value.to_string()))
        .unwrap_or_else(|| "Yes".to_string());

    let da = inherited(graph, dict, b"DA").and_then(text_of).unwrap_or_default();
    let (r, g, b) = options.text_color;
    let mark_color = DefaultAppearance::parse(&da).color.unwrap_or(Color::Rgb(r, g, b));
    let generator = appearance_generator(graph, dict, widget.border_width);

    let bbox = Rect::new(0.0, 0.0, widget.rect.width, widget.rect.height);
    let (on, off) = match field.kind() {
        FieldKind::Radio => (
            generator.radio_on_appearance(bbox, mark_color),
            generator.radio_off_appearance(bbox),
        ),
        _ => (
            generator.checkbox_on_appearance(bbox, mark_color),
            generator.checkbox_off_appearance(bbox),
        ),
    };

    let graph = doc.graph_mut();
    let on_id = graph.add_object(Stream::new(form_xobject(&widget.rect, Dictionary::new()), on.into_bytes()));
    let off_id = graph.add_object(Stream::new(form_xobject(&widget.rect, Dictionary::new()), off.into_bytes()));

    let mut states = Dictionary::new();
    states.set(on_state.as_str(), Object::Reference(on_id));
    states.set(OFF_STATE, Object::Reference(off_id));
    set_normal_appearance(graph, widget.id, Object::Dictionary(states))?;

    log::debug!("Regenerated /{} and /Off appearances of '{}'", on_state, field.name());
    Ok(())
}

/// Widget flags (`/F`) of an annotation dictionary.
pub(crate) fn annotation_flags(graph: &Document, annot: &Dictionary) -> u32 {
    get(graph, annot, b"F").and_then(integer_of).map(raw_bits).unwrap_or(0)
}

/// Name of the widget's current appearance state, if any.
pub(crate) fn appearance_state(graph: &Document, annot: &Dictionary) -> Option<String> {
    get(graph, annot, b"AS").and_then(name_of)
}

/// Resolve an annotation entry to its dictionary.
pub(crate) fn annotation_dict<'a>(graph: &'a Document, entry: &'a Object) -> Option<&'a Dictionary> {
    resolve(graph, entry).and_then(dict_of)
}
