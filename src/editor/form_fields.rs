//! Field registry: the in-memory index of a document's form fields.
//!
//! The registry walks the AcroForm field tree once, at open time, and keeps
//! one [`Field`] record per terminal field. Records live in an arena and are
//! addressed by [`FieldId`]; an ordered index maps fully-qualified names to
//! ids, so renaming a field is a key swap that keeps iteration order.
//!
//! # Naming
//!
//! Fully-qualified names join the partial `/T` names of a field and its
//! ancestors with `.` (ISO 32000-1:2008, Section 12.7.3.2). A field with
//! several widgets (typically a radio group) can additionally be addressed
//! by widget position: `language.0`, `language.1`, ... These aliases never
//! shadow a real field name and are not counted as fields.

use std::borrow::Borrow;
use std::collections::{HashMap, HashSet};
use std::fmt;

use indexmap::IndexMap;
use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::document::PdfDocument;
use crate::error::{Error, Result};
use crate::geometry::Rect;
use crate::object::{
    dict_by_id, dict_by_id_mut, encode_text_string, get, get_array, get_dict, inherited, integer_of,
    name_of, number_of, rect_of, text_of, MAX_PARENT_DEPTH,
};
use crate::writer::form_fields::{raw_bits, ButtonFieldFlags};

/// A validated, non-empty fully-qualified field name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldName(String);

impl FieldName {
    /// Validate a field name.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if the name is empty.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidArgument("field name must not be empty".to_string()));
        }
        Ok(Self(name))
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for FieldName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for FieldName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Stable handle to a field in the registry arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldId(usize);

/// Result of resolving a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// The name resolves to this field
    Found(FieldId),
    /// No field or widget alias carries this name
    NotFound,
}

/// Kind of a terminal form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Text field (`/FT /Tx`)
    Text,
    /// Checkbox (`/FT /Btn`, neither radio nor push button)
    Checkbox,
    /// Radio button group (`/FT /Btn` with the radio flag)
    Radio,
    /// Push button (`/FT /Btn` with the push button flag)
    PushButton,
    /// Combo box or list box (`/FT /Ch`)
    Choice,
    /// Signature field (`/FT /Sig`)
    Signature,
}

impl FieldKind {
    /// Classify a field from its `/FT` name and `/Ff` flags.
    pub fn from_pdf(field_type: &str, flags: u32) -> Option<Self> {
        match field_type {
            "Tx" => Some(FieldKind::Text),
            "Ch" => Some(FieldKind::Choice),
            "Sig" => Some(FieldKind::Signature),
            "Btn" => {
                let flags = ButtonFieldFlags::from_bits_retain(flags);
                if flags.contains(ButtonFieldFlags::PUSHBUTTON) {
                    Some(FieldKind::PushButton)
                } else if flags.contains(ButtonFieldFlags::RADIO) {
                    Some(FieldKind::Radio)
                } else {
                    Some(FieldKind::Checkbox)
                }
            },
            _ => None,
        }
    }

    /// The `/FT` name of this kind.
    pub fn pdf_type(&self) -> &'static str {
        match self {
            FieldKind::Text => "Tx",
            FieldKind::Checkbox | FieldKind::Radio | FieldKind::PushButton => "Btn",
            FieldKind::Choice => "Ch",
            FieldKind::Signature => "Sig",
        }
    }

    /// Whether setting a value rebuilds appearances when the caller leaves
    /// the choice to the field.
    ///
    /// Text and choice appearances show the value itself, so they go stale;
    /// button widgets already carry one appearance per state.
    pub fn regenerates_by_default(&self) -> bool {
        matches!(self, FieldKind::Text | FieldKind::Choice)
    }

    /// Whether the field carries a value at all.
    pub fn has_value(&self) -> bool {
        !matches!(self, FieldKind::PushButton | FieldKind::Signature)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FieldKind::Text => "text",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Radio => "radio",
            FieldKind::PushButton => "push button",
            FieldKind::Choice => "choice",
            FieldKind::Signature => "signature",
        };
        f.write_str(label)
    }
}

/// One on-page occurrence of a field.
#[derive(Debug, Clone, PartialEq)]
pub struct Widget {
    /// Widget annotation object
    pub id: ObjectId,
    /// Placement on the page
    pub rect: Rect,
    /// Border width from `/BS /W`; 0 without `/BS`, 1 when `/W` is absent
    pub border_width: f32,
}

/// A terminal form field.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: FieldName,
    kind: FieldKind,
    object_id: ObjectId,
    parent_id: Option<ObjectId>,
    parent_name: Option<String>,
    flags: u32,
    widgets: Vec<Widget>,
}

impl Field {
    /// Fully-qualified name.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Field kind.
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Field dictionary object.
    pub fn object_id(&self) -> ObjectId {
        self.object_id
    }

    /// Raw (inherited) `/Ff` bits.
    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// Widgets in `/Kids` order; never empty.
    pub fn widgets(&self) -> &[Widget] {
        &self.widgets
    }
}

/// Ordered index of a document's terminal fields.
#[derive(Debug, Default)]
pub struct FieldRegistry {
    slots: Vec<Option<Field>>,
    index: IndexMap<FieldName, FieldId>,
    aliases: HashMap<String, FieldId>,
}

impl FieldRegistry {
    /// Build the registry by walking the document's field tree.
    ///
    /// Malformed entries (missing `/FT`, no usable widget, reference cycles)
    /// are skipped with a warning. When two terminal fields share a
    /// fully-qualified name the first one wins.
    pub fn scan(doc: &PdfDocument) -> Self {
        let graph = doc.graph();
        let mut registry = FieldRegistry::default();
        let mut visited = HashSet::new();

        for root_id in doc.root_field_ids() {
            walk_field(graph, root_id, None, None, 0, &mut visited, &mut registry);
        }

        let ids: Vec<FieldId> = registry.index.values().copied().collect();
        for id in ids {
            registry.add_aliases(id);
        }

        log::debug!(
            "Indexed {} form fields ({} widget aliases)",
            registry.len(),
            registry.aliases.len()
        );
        registry
    }

    /// Number of fields (aliases excluded).
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True when the form has no fields.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Resolve a name or widget alias.
    pub fn resolve(&self, name: &str) -> Lookup {
        match self.index.get(name).or_else(|| self.aliases.get(name)) {
            Some(id) => Lookup::Found(*id),
            None => Lookup::NotFound,
        }
    }

    /// Field record by id.
    pub fn get(&self, id: FieldId) -> Option<&Field> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    /// Field record by name.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownField`] if no field resolves under `name`.
    pub fn field(&self, name: &str) -> Result<&Field> {
        match self.resolve(name) {
            Lookup::Found(id) => self.get(id).ok_or_else(|| Error::unknown_field(name)),
            Lookup::NotFound => Err(Error::unknown_field(name)),
        }
    }

    /// Field names in document order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(FieldName::as_str)
    }

    /// Fields in document order.
    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.index.values().filter_map(|id| self.get(*id))
    }

    /// Rename a field, updating its partial name in the document.
    ///
    /// The new name must keep the field under the same parent: only the last
    /// name component can change for fields that have a parent field.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownField`] if `old` is not a field name
    /// - [`Error::DuplicateField`] if `new` is already a field name
    /// - [`Error::InvalidArgument`] if `new` is empty, moves the field, or
    ///   would put a period in its partial name
    pub fn rename(&mut self, doc: &mut PdfDocument, old: &str, new: &str) -> Result<()> {
        let new_name = FieldName::new(new)?;
        let Some(idx) = self.index.get_index_of(old) else {
            return Err(Error::unknown_field(old));
        };
        if old == new {
            return Ok(());
        }
        if self.index.contains_key(new) {
            return Err(Error::DuplicateField(new.to_string()));
        }

        let id = self.index[idx];
        let field = self.get(id).ok_or_else(|| Error::unknown_field(old))?;
        let partial = match field.parent_name.as_deref() {
            Some(parent) => new
                .strip_prefix(parent)
                .and_then(|rest| rest.strip_prefix('.'))
                .filter(|rest| !rest.is_empty())
                .ok_or_else(|| {
                    Error::InvalidArgument(format!(
                        "'{}' must stay under parent field '{}'",
                        new, parent
                    ))
                })?,
            None => new,
        };
        // partial names never contain a period
        if partial.contains('.') {
            return Err(Error::InvalidArgument(format!(
                "'{}' would need a period inside the partial name '{}'",
                new, partial
            )));
        }

        let object_id = field.object_id;
        dict_by_id_mut(doc.graph_mut(), object_id)
            .ok_or_else(|| Error::InvalidPdf(format!("field '{}' is not a dictionary", old)))?
            .set("T", encode_text_string(partial));

        // Swap the key in place: remove, append, then move back to `idx`.
        self.index.swap_remove_index(idx);
        self.index.insert(new_name.clone(), id);
        let last = self.index.len() - 1;
        self.index.swap_indices(idx, last);

        if let Some(slot) = self.slots.get_mut(id.0).and_then(Option::as_mut) {
            slot.name = new_name;
        }
        self.aliases.retain(|_, target| *target != id);
        self.aliases.remove(new);
        self.add_aliases(id);

        log::debug!("Renamed field '{}' to '{}'", old, new);
        Ok(())
    }

    /// Remove a field and its widgets from the document.
    ///
    /// The field is detached from its parent's `/Kids` (or the AcroForm
    /// `/Fields` array), from `/CO`, and its widgets from page `/Annots`.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownField`] if `name` is not a field name.
    pub fn remove(&mut self, doc: &mut PdfDocument, name: &str) -> Result<Field> {
        let Some(idx) = self.index.get_index_of(name) else {
            return Err(Error::unknown_field(name));
        };
        let id = self.index[idx];
        let field = self.get(id).cloned().ok_or_else(|| Error::unknown_field(name))?;

        let acroform_id = doc.acroform_id();
        let container = field.parent_id.unwrap_or(acroform_id);
        let key: &[u8] = if field.parent_id.is_some() { b"Kids" } else { b"Fields" };
        remove_reference(doc.graph_mut(), container, key, field.object_id)?;
        remove_reference(doc.graph_mut(), acroform_id, b"CO", field.object_id)?;

        let widget_ids: Vec<ObjectId> = field.widgets.iter().map(|w| w.id).collect();
        let detached = doc.detach_annotations(&widget_ids)?;

        self.index.shift_remove_index(idx);
        self.slots[id.0] = None;
        self.aliases.retain(|_, target| *target != id);

        log::debug!("Removed field '{}' ({} widget annotations)", name, detached);
        Ok(field)
    }

    /// Forget every field.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.index.clear();
        self.aliases.clear();
    }

    fn insert(&mut self, field: Field) {
        if self.index.contains_key(field.name.as_str()) {
            log::warn!("Duplicate field name '{}', keeping the first", field.name);
            return;
        }
        let id = FieldId(self.slots.len());
        self.index.insert(field.name.clone(), id);
        self.slots.push(Some(field));
    }

    fn add_aliases(&mut self, id: FieldId) {
        let Some(field) = self.get(id) else {
            return;
        };
        if field.widgets.len() < 2 {
            return;
        }
        let aliases: Vec<String> = (0..field.widgets.len())
            .map(|i| format!("{}.{}", field.name, i))
            .filter(|alias| !self.index.contains_key(alias.as_str()))
            .collect();
        for alias in aliases {
            self.aliases.entry(alias).or_insert(id);
        }
    }
}

/// Remove `target` from the array under `key` in the dictionary `container`.
fn remove_reference(graph: &mut Document, container: ObjectId, key: &[u8], target: ObjectId) -> Result<()> {
    let (array_id, items) = {
        let dict = dict_by_id(graph, container)
            .ok_or_else(|| Error::InvalidPdf(format!("object {:?} is not a dictionary", container)))?;
        let array_id = match dict.get(key) {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        };
        match get_array(graph, dict, key) {
            Some(items) => (array_id, items.clone()),
            None => return Ok(()),
        }
    };

    let kept: Vec<Object> = items
        .into_iter()
        .filter(|item| !matches!(item, Object::Reference(id) if *id == target))
        .collect();

    match array_id {
        Some(id) => {
            if let Ok(slot) = graph.get_object_mut(id) {
                *slot = Object::Array(kept);
            }
        },
        None => {
            if let Some(dict) = dict_by_id_mut(graph, container) {
                dict.set(key.to_vec(), kept);
            }
        },
    }
    Ok(())
}

/// Recursively index the field rooted at `id`.
fn walk_field(
    graph: &Document,
    id: ObjectId,
    parent_id: Option<ObjectId>,
    parent_name: Option<&str>,
    depth: usize,
    visited: &mut HashSet<ObjectId>,
    registry: &mut FieldRegistry,
) {
    if depth > MAX_PARENT_DEPTH {
        log::warn!("Field tree deeper than {} levels, skipping {:?}", MAX_PARENT_DEPTH, id);
        return;
    }
    if !visited.insert(id) {
        log::warn!("Field {:?} is referenced twice, skipping", id);
        return;
    }
    let Some(dict) = dict_by_id(graph, id) else {
        log::warn!("Field {:?} is not a dictionary, skipping", id);
        return;
    };

    let Some(partial) = get(graph, dict, b"T").and_then(text_of) else {
        log::warn!("Field {:?} has no /T entry, skipping", id);
        return;
    };
    let full_name = match parent_name {
        Some(parent) => format!("{}.{}", parent, partial),
        None => partial,
    };

    let mut widget_ids = Vec::new();
    let mut has_kids = false;
    if let Some(kids) = get_array(graph, dict, b"Kids") {
        has_kids = !kids.is_empty();
        for kid in kids {
            let Object::Reference(kid_id) = kid else {
                log::warn!("Skipping inline kid of field '{}'", full_name);
                continue;
            };
            let Some(kid_dict) = dict_by_id(graph, *kid_id) else {
                continue;
            };
            if kid_dict.has(b"T") {
                walk_field(graph, *kid_id, Some(id), Some(full_name.as_str()), depth + 1, visited, registry);
            } else {
                widget_ids.push(*kid_id);
            }
        }
    }

    // Only kids with their own names: this is a non-terminal node.
    if has_kids && widget_ids.is_empty() {
        return;
    }
    if !has_kids {
        widget_ids.push(id);
    }

    let Some(field_type) = inherited(graph, dict, b"FT").and_then(name_of) else {
        log::warn!("Field '{}' has no /FT entry, skipping", full_name);
        return;
    };
    let flags = inherited(graph, dict, b"Ff").and_then(integer_of).map(raw_bits).unwrap_or(0);
    let Some(kind) = FieldKind::from_pdf(&field_type, flags) else {
        log::warn!("Field '{}' has unknown type /{}, skipping", full_name, field_type);
        return;
    };

    let widgets: Vec<Widget> = widget_ids
        .into_iter()
        .filter_map(|widget_id| read_widget(graph, widget_id, &full_name))
        .collect();
    if widgets.is_empty() {
        log::warn!("Field '{}' has no usable widget, skipping", full_name);
        return;
    }

    let name = match FieldName::new(full_name) {
        Ok(name) => name,
        Err(_) => {
            log::warn!("Field {:?} has an empty name, skipping", id);
            return;
        },
    };
    registry.insert(Field {
        name,
        kind,
        object_id: id,
        parent_id,
        parent_name: parent_name.map(str::to_string),
        flags,
        widgets,
    });
}

fn read_widget(graph: &Document, id: ObjectId, field_name: &str) -> Option<Widget> {
    let dict = dict_by_id(graph, id)?;
    let Some(rect) = dict.get(b"Rect").ok().and_then(|r| rect_of(graph, r)) else {
        log::warn!("Widget {:?} of field '{}' has no /Rect", id, field_name);
        return None;
    };
    Some(Widget {
        id,
        rect,
        border_width: border_width(graph, dict),
    })
}

/// Border width of a widget: 0 without `/BS`, 1 when `/BS` has no `/W`.
pub(crate) fn border_width(graph: &Document, widget: &Dictionary) -> f32 {
    match get_dict(graph, widget, b"BS") {
        Some(bs) => get(graph, bs, b"W").and_then(number_of).unwrap_or(1.0).max(0.0),
        None => 0.0,
    }
}
