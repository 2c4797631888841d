//! PDF document model.
//!
//! [`PdfDocument`] wraps a parsed `lopdf` object graph and keeps the few
//! structural facts the form code relies on: where the interactive form
//! (AcroForm) dictionary lives and where its default font resources are.
//! Loading normalizes the form into one shape so that later mutation never
//! has to care whether an entry was written inline or indirectly.

use std::path::{Path, PathBuf};

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};

use crate::config::SaveOptions;
use crate::error::{Error, Result};
use crate::object::{dict_by_id, dict_by_id_mut, get_array, get_dict, name, resolve};

/// Base fonts for the standard resource names used in `/DA` strings.
const STANDARD_FONT_NAMES: [(&str, &str); 8] = [
    ("Helv", "Helvetica"),
    ("HeBo", "Helvetica-Bold"),
    ("HeOb", "Helvetica-Oblique"),
    ("TiRo", "Times-Roman"),
    ("TiBo", "Times-Bold"),
    ("Cour", "Courier"),
    ("CoBo", "Courier-Bold"),
    ("ZaDb", "ZapfDingbats"),
];

/// A parsed PDF document carrying an interactive form.
///
/// # Example
///
/// ```no_run
/// use fillable_pdf::document::PdfDocument;
///
/// let doc = PdfDocument::open("form.pdf")?;
/// println!("pages: {}", doc.page_ids().len());
/// # Ok::<(), fillable_pdf::error::Error>(())
/// ```
pub struct PdfDocument {
    inner: Document,
    acroform_id: ObjectId,
    fonts_id: ObjectId,
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("objects", &self.inner.objects.len())
            .field("acroform_id", &self.acroform_id)
            .finish_non_exhaustive()
    }
}

impl PdfDocument {
    /// Open a PDF document from a file path.
    ///
    /// # Errors
    ///
    /// - [`Error::FileNotFound`] if the path does not exist
    /// - [`Error::Io`] if the file exists but cannot be read
    /// - [`Error::CorruptOrUnsupported`] if the bytes do not parse, the
    ///   document is encrypted, or it has no interactive form
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::io(path, e)
            }
        })?;
        Self::from_bytes(&data, path)
    }

    /// Parse a document held in memory. `path` is only used in errors.
    pub fn from_bytes(data: &[u8], path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let reject = |reason: String| Error::CorruptOrUnsupported {
            path: path.clone(),
            reason,
        };

        let mut inner = Document::load_mem(data).map_err(|e| reject(e.to_string()))?;
        if inner.is_encrypted() {
            return Err(reject("document is encrypted".to_string()));
        }

        let acroform_id =
            normalize_acroform(&mut inner).ok_or_else(|| reject("document has no AcroForm".to_string()))?;
        let fonts_id = normalize_font_resources(&mut inner, acroform_id)
            .ok_or_else(|| reject("AcroForm default resources are malformed".to_string()))?;

        Ok(Self {
            inner,
            acroform_id,
            fonts_id,
        })
    }

    /// The underlying object graph.
    pub fn graph(&self) -> &Document {
        &self.inner
    }

    /// The underlying object graph, mutably.
    pub fn graph_mut(&mut self) -> &mut Document {
        &mut self.inner
    }

    /// Object id of the AcroForm dictionary.
    pub fn acroform_id(&self) -> ObjectId {
        self.acroform_id
    }

    /// The AcroForm dictionary.
    pub fn acroform(&self) -> Result<&Dictionary> {
        dict_by_id(&self.inner, self.acroform_id)
            .ok_or_else(|| Error::InvalidPdf("AcroForm is not a dictionary".to_string()))
    }

    /// The AcroForm dictionary, mutably.
    pub fn acroform_mut(&mut self) -> Result<&mut Dictionary> {
        dict_by_id_mut(&mut self.inner, self.acroform_id)
            .ok_or_else(|| Error::InvalidPdf("AcroForm is not a dictionary".to_string()))
    }

    /// Object ids listed in the AcroForm `/Fields` array, in order.
    pub fn root_field_ids(&self) -> Vec<ObjectId> {
        let Ok(acroform) = self.acroform() else {
            return Vec::new();
        };
        let Some(fields) = get_array(&self.inner, acroform, b"Fields") else {
            return Vec::new();
        };
        fields
            .iter()
            .filter_map(|entry| match entry {
                Object::Reference(id) => Some(*id),
                other => {
                    log::warn!("Skipping non-reference /Fields entry: {:?}", other);
                    None
                },
            })
            .collect()
    }

    /// Set or clear `/NeedAppearances` on the AcroForm.
    pub fn set_need_appearances(&mut self, needed: bool) -> Result<()> {
        let acroform = self.acroform_mut()?;
        if needed {
            acroform.set("NeedAppearances", true);
        } else {
            acroform.remove(b"NeedAppearances");
        }
        Ok(())
    }

    /// Form-level `/DA` string, if any.
    pub fn default_appearance(&self) -> Option<String> {
        let acroform = self.acroform().ok()?;
        crate::object::get(&self.inner, acroform, b"DA").and_then(crate::object::text_of)
    }

    /// Font resource entry for `font_name` from the form's default resources.
    ///
    /// Fonts missing from `/DR` are added as standard Type 1 fonts with
    /// `WinAnsiEncoding`, so every appearance stream can reference them.
    pub fn font_resource(&mut self, font_name: &str) -> Result<Object> {
        if let Some(existing) = dict_by_id(&self.inner, self.fonts_id).and_then(|fonts| fonts.get(font_name.as_bytes()).ok())
        {
            return Ok(existing.clone());
        }

        let base_font = STANDARD_FONT_NAMES
            .iter()
            .find(|(resource, _)| *resource == font_name)
            .map(|(_, base)| *base)
            .unwrap_or("Helvetica");
        let mut font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => base_font,
        };
        if base_font != "ZapfDingbats" {
            font.set("Encoding", "WinAnsiEncoding");
        }
        let font_id = self.inner.add_object(font);
        log::debug!("Added font resource /{} ({})", font_name, base_font);

        let fonts = dict_by_id_mut(&mut self.inner, self.fonts_id)
            .ok_or_else(|| Error::InvalidPdf("/DR /Font is not a dictionary".to_string()))?;
        fonts.set(font_name, Object::Reference(font_id));
        Ok(Object::Reference(font_id))
    }

    /// Page object ids in page order.
    pub fn page_ids(&self) -> Vec<ObjectId> {
        self.inner.get_pages().into_values().collect()
    }

    /// Entries of a page's `/Annots` array (unresolved).
    pub fn page_annotations(&self, page_id: ObjectId) -> Vec<Object> {
        dict_by_id(&self.inner, page_id)
            .and_then(|page| get_array(&self.inner, page, b"Annots"))
            .cloned()
            .unwrap_or_default()
    }

    /// Replace a page's `/Annots` array; an empty list removes the entry.
    pub fn set_page_annotations(&mut self, page_id: ObjectId, annots: Vec<Object>) -> Result<()> {
        let page = dict_by_id_mut(&mut self.inner, page_id)
            .ok_or_else(|| Error::InvalidPdf(format!("page {:?} is not a dictionary", page_id)))?;
        if annots.is_empty() {
            page.remove(b"Annots");
        } else {
            page.set("Annots", annots);
        }
        Ok(())
    }

    /// Remove the given annotation objects from every page.
    ///
    /// Returns how many `/Annots` entries were dropped.
    pub fn detach_annotations(&mut self, ids: &[ObjectId]) -> Result<usize> {
        let mut removed = 0;
        for page_id in self.page_ids() {
            let annots = self.page_annotations(page_id);
            let before = annots.len();
            let kept: Vec<Object> = annots
                .into_iter()
                .filter(|entry| !matches!(entry, Object::Reference(id) if ids.contains(id)))
                .collect();
            if kept.len() != before {
                removed += before - kept.len();
                self.set_page_annotations(page_id, kept)?;
            }
        }
        Ok(removed)
    }

    /// Serialize the graph to bytes.
    ///
    /// Unreachable objects are pruned and streams compressed first when
    /// requested by `options`.
    pub fn serialize(&mut self, options: &SaveOptions) -> Result<Vec<u8>> {
        if options.garbage_collect {
            let pruned = self.inner.prune_objects();
            log::debug!("Pruned {} unreachable objects", pruned.len());
        }
        if options.compress {
            self.inner.compress();
        }

        let mut buffer = Vec::new();
        self.inner
            .save_to(&mut buffer)
            .map_err(|e| Error::InvalidPdf(format!("serialization failed: {}", e)))?;
        Ok(buffer)
    }
}

/// Object id of the catalog, from the trailer's `/Root`.
fn catalog_id(doc: &Document) -> Option<ObjectId> {
    match doc.trailer.get(b"Root").ok()? {
        Object::Reference(id) => Some(*id),
        _ => None,
    }
}

/// Make the AcroForm and its `/Fields` entries indirect objects.
///
/// Returns the AcroForm object id, or `None` when the catalog has no form.
fn normalize_acroform(doc: &mut Document) -> Option<ObjectId> {
    let root_id = catalog_id(doc)?;
    let entry = dict_by_id(doc, root_id)?.get(b"AcroForm").ok()?.clone();

    let acroform_id = match entry {
        Object::Reference(id) => {
            dict_by_id(doc, id)?;
            id
        },
        Object::Dictionary(dict) => {
            let id = doc.add_object(dict);
            dict_by_id_mut(doc, root_id)?.set("AcroForm", Object::Reference(id));
            id
        },
        _ => return None,
    };

    let fields: Vec<Object> = {
        let acroform = dict_by_id(doc, acroform_id)?;
        get_array(doc, acroform, b"Fields").cloned().unwrap_or_default()
    };
    let fields: Vec<Object> = fields
        .into_iter()
        .map(|entry| match entry {
            Object::Dictionary(dict) => Object::Reference(doc.add_object(dict)),
            other => other,
        })
        .collect();
    dict_by_id_mut(doc, acroform_id)?.set("Fields", fields);

    Some(acroform_id)
}

/// Make `/DR` and `/DR /Font` indirect dictionaries, creating them if absent.
///
/// Returns the id of the font dictionary.
fn normalize_font_resources(doc: &mut Document, acroform_id: ObjectId) -> Option<ObjectId> {
    let dr_id = indirect_child(doc, acroform_id, b"DR")?;
    indirect_child(doc, dr_id, b"Font")
}

/// Ensure `parent[key]` is a reference to a dictionary and return its id.
fn indirect_child(doc: &mut Document, parent_id: ObjectId, key: &[u8]) -> Option<ObjectId> {
    let entry = dict_by_id(doc, parent_id)?.get(key).ok().cloned();
    let child = match entry {
        Some(Object::Reference(id)) if dict_by_id(doc, id).is_some() => return Some(id),
        Some(Object::Dictionary(dict)) => dict,
        Some(Object::Reference(_)) | None => Dictionary::new(),
        Some(_) => return None,
    };
    let child_id = doc.add_object(child);
    dict_by_id_mut(doc, parent_id)?.set(key.to_vec(), Object::Reference(child_id));
    Some(child_id)
}

/// Effective `/Resources` of a page, following the page tree.
pub(crate) fn page_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    dict_by_id(doc, page_id)
        .and_then(|page| crate::object::inherited(doc, page, b"Resources"))
        .and_then(crate::object::dict_of)
        .cloned()
        .unwrap_or_default()
}

/// Names of keys in a resource sub-dictionary (such as `/XObject`).
pub(crate) fn resource_names(doc: &Document, resources: &Dictionary, category: &[u8]) -> Vec<Vec<u8>> {
    get_dict(doc, resources, category)
        .map(|dict| dict.iter().map(|(key, _)| key.clone()).collect())
        .unwrap_or_default()
}

/// True when `obj` is (or references) a `/Widget` annotation.
pub(crate) fn is_widget(doc: &Document, obj: &Object) -> bool {
    resolve(doc, obj)
        .and_then(crate::object::dict_of)
        .and_then(|dict| dict.get(b"Subtype").ok())
        .map(|subtype| *subtype == name("Widget"))
        .unwrap_or(false)
}
