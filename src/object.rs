//! Helpers for reading and building objects in the `lopdf` object graph.
//!
//! The graph hands out raw [`Object`]s that may be indirect references,
//! integers standing in for reals, or byte strings in one of two text
//! encodings. The functions here resolve those variations once so the form
//! code can ask simple questions ("what is the /Rect of this widget?").

use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};

use crate::geometry::Rect;

/// Maximum number of reference hops followed before giving up.
const MAX_REFERENCE_DEPTH: usize = 32;

/// Maximum number of /Parent hops followed when looking up inherited keys.
pub(crate) const MAX_PARENT_DEPTH: usize = 32;

/// Follow indirect references until a direct object is reached.
pub(crate) fn resolve<'a>(doc: &'a Document, mut obj: &'a Object) -> Option<&'a Object> {
    for _ in 0..MAX_REFERENCE_DEPTH {
        match obj {
            Object::Reference(id) => obj = doc.get_object(*id).ok()?,
            _ => return Some(obj),
        }
    }
    log::warn!("Reference chain deeper than {} hops", MAX_REFERENCE_DEPTH);
    None
}

/// Dictionary of a dictionary or stream object.
pub(crate) fn dict_of(obj: &Object) -> Option<&Dictionary> {
    match obj {
        Object::Dictionary(dict) => Some(dict),
        Object::Stream(stream) => Some(&stream.dict),
        _ => None,
    }
}

/// Dictionary stored under an object id.
pub(crate) fn dict_by_id(doc: &Document, id: ObjectId) -> Option<&Dictionary> {
    doc.get_object(id).ok().and_then(dict_of)
}

/// Mutable dictionary stored under an object id.
pub(crate) fn dict_by_id_mut(doc: &mut Document, id: ObjectId) -> Option<&mut Dictionary> {
    match doc.get_object_mut(id).ok()? {
        Object::Dictionary(dict) => Some(dict),
        Object::Stream(stream) => Some(&mut stream.dict),
        _ => None,
    }
}

/// Resolved value of `key` in `dict`.
pub(crate) fn get<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    dict.get(key).ok().and_then(|obj| resolve(doc, obj))
}

/// Resolved dictionary under `key`.
pub(crate) fn get_dict<'a>(
    doc: &'a Document,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Dictionary> {
    get(doc, dict, key).and_then(dict_of)
}

/// Resolved array under `key`.
pub(crate) fn get_array<'a>(
    doc: &'a Document,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Vec<Object>> {
    match get(doc, dict, key)? {
        Object::Array(items) => Some(items),
        _ => None,
    }
}

/// Look up `key` on a field dictionary, then on its ancestors.
///
/// Field attributes such as /FT, /Ff, /V and /DA are inheritable
/// (ISO 32000-1:2008, Section 12.7.3.1).
pub(crate) fn inherited<'a>(
    doc: &'a Document,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = dict;
    for _ in 0..MAX_PARENT_DEPTH {
        if let Some(value) = get(doc, current, key) {
            return Some(value);
        }
        current = get_dict(doc, current, b"Parent")?;
    }
    None
}

/// Name object as a string.
pub(crate) fn name_of(obj: &Object) -> Option<String> {
    match obj {
        Object::Name(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

/// Integer or real as `f32`.
pub(crate) fn number_of(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// Integer value; reals are truncated.
pub(crate) fn integer_of(obj: &Object) -> Option<i64> {
    match obj {
        Object::Integer(i) => Some(*i),
        Object::Real(r) => Some(*r as i64),
        _ => None,
    }
}

/// Text carried by a string or name object.
pub(crate) fn text_of(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        Object::Name(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

/// Numbers of a resolved array, requiring at least `len` numeric entries.
fn numbers_of(doc: &Document, obj: &Object, len: usize) -> Option<Vec<f32>> {
    let items = match resolve(doc, obj)? {
        Object::Array(items) => items,
        _ => return None,
    };
    let values: Vec<f32> = items
        .iter()
        .filter_map(|item| resolve(doc, item).and_then(number_of))
        .collect();
    if values.len() >= len {
        Some(values)
    } else {
        None
    }
}

/// Rectangle from a `[x1 y1 x2 y2]` array.
pub(crate) fn rect_of(doc: &Document, obj: &Object) -> Option<Rect> {
    let v = numbers_of(doc, obj, 4)?;
    Some(Rect::from_points(v[0], v[1], v[2], v[3]))
}

/// Matrix from a `[a b c d e f]` array.
pub(crate) fn matrix_of(doc: &Document, obj: &Object) -> Option<[f32; 6]> {
    let v = numbers_of(doc, obj, 6)?;
    Some([v[0], v[1], v[2], v[3], v[4], v[5]])
}

/// Name object from a string.
pub(crate) fn name(value: &str) -> Object {
    Object::Name(value.as_bytes().to_vec())
}

/// `[x1 y1 x2 y2]` array object for a rectangle.
pub(crate) fn rect_object(rect: &Rect) -> Object {
    Object::Array(vec![
        Object::from(rect.x),
        Object::from(rect.y),
        Object::from(rect.right()),
        Object::from(rect.top()),
    ])
}

/// Decode a PDF text string that may be UTF-16BE (with BOM) or PDFDocEncoding.
///
/// Per ISO 32000-1:2008, Section 7.9.2.2 - Text String Type.
pub fn decode_text_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }

    bytes.iter().filter_map(|&b| pdfdoc_char(b)).collect()
}

/// Encode text as a PDF string object.
///
/// PDFDocEncoding is used when every character has a code there; anything
/// else is written as UTF-16BE with a byte order mark.
pub fn encode_text_string(text: &str) -> Object {
    let bytes: Vec<u8> = if is_pdfdoc_encodable(text) {
        text.chars().filter_map(pdfdoc_byte).collect()
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        bytes
    };
    Object::String(bytes, StringFormat::Literal)
}

/// True when every character of `text` exists in PDFDocEncoding.
pub(crate) fn is_pdfdoc_encodable(text: &str) -> bool {
    text.chars().all(|c| pdfdoc_byte(c).is_some())
}

/// PDFDocEncoding code for a character (ISO 32000-1:2008, Annex D.2).
pub(crate) fn pdfdoc_byte(c: char) -> Option<u8> {
    let code = c as u32;
    match code {
        0x09 | 0x0A | 0x0D | 0x20..=0x7E => Some(code as u8),
        0xA0..=0xFF if code != 0xAD => Some(code as u8),
        _ => PDFDOC_HIGH
            .iter()
            .position(|&mapped| mapped == c)
            .map(|offset| 0x80 + offset as u8),
    }
}

fn pdfdoc_char(code: u8) -> Option<char> {
    match code {
        0x00..=0x7F => Some(code as char),
        0x80..=0x9E => Some(PDFDOC_HIGH[(code - 0x80) as usize]),
        0x9F => None,
        _ => Some(code as char),
    }
}

/// PDFDocEncoding characters for codes 0x80-0x9E.
const PDFDOC_HIGH: [char; 31] = [
    '\u{2022}', '\u{2020}', '\u{2021}', '\u{2026}', '\u{2014}', '\u{2013}', '\u{0192}',
    '\u{2044}', '\u{2039}', '\u{203A}', '\u{2212}', '\u{2030}', '\u{201E}', '\u{201C}',
    '\u{201D}', '\u{2018}', '\u{2019}', '\u{201A}', '\u{2122}', '\u{FB01}', '\u{FB02}',
    '\u{0141}', '\u{0152}', '\u{0160}', '\u{0178}', '\u{017D}', '\u{0131}', '\u{0142}',
    '\u{0153}', '\u{0161}', '\u{017E}',
];
