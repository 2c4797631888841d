//! Shared fixtures for the integration tests.
//!
//! Fixture PDFs are generated with `lopdf` at test time:
//!
//! | field            | kind        | initial value |
//! |------------------|-------------|---------------|
//! | `first_name`     | text        | `Test`        |
//! | `last_name`      | text        | `Test`        |
//! | `football`       | checkbox    | `Off`         |
//! | `nascar`         | checkbox    | `Off`         |
//! | `newsletter`     | checkbox    | `Yes`         |
//! | `language`       | radio (3)   | `dart`        |
//! | `country`        | combo box   | `USA`         |
//! | `photo`          | push button |               |
//! | `signature`      | signature   |               |
//! | `address.street` | text        | `1 Main St`   |

#![allow(dead_code)]

use std::io::Cursor;
use std::path::PathBuf;

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use tempfile::TempDir;

/// Names of the sample form fields in document order.
pub const SAMPLE_FIELDS: [&str; 10] = [
    "first_name",
    "last_name",
    "football",
    "nascar",
    "newsletter",
    "language",
    "country",
    "photo",
    "signature",
    "address.street",
];

/// A fixture PDF written to its own temporary directory.
pub struct Fixture {
    pub dir: TempDir,
    pub path: PathBuf,
}

impl Fixture {
    /// Path of another file in the fixture directory.
    pub fn sibling(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Write `bytes` as `form.pdf` in a fresh temporary directory.
pub fn write_fixture(bytes: &[u8]) -> Fixture {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("form.pdf");
    std::fs::write(&path, bytes).unwrap();
    Fixture { dir, path }
}

/// The sample form on disk.
pub fn sample_form() -> Fixture {
    write_fixture(&sample_form_bytes())
}

pub fn sample_form_bytes() -> Vec<u8> {
    build_pdf(true, false)
}

/// Rewrite the fixture file after editing its object graph.
pub fn edit_fixture(fixture: &Fixture, edit: impl FnOnce(&mut Document)) {
    let mut doc = Document::load(&fixture.path).unwrap();
    edit(&mut doc);
    doc.save(&fixture.path).unwrap();
}

/// A valid PDF without an AcroForm.
pub fn formless_pdf_bytes() -> Vec<u8> {
    build_pdf(false, false)
}

/// The sample form with a standard security handler in the trailer.
pub fn encrypted_pdf_bytes() -> Vec<u8> {
    build_pdf(true, true)
}

/// A solid-color RGB PNG.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30]));
    let mut out = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut out), image::ImageOutputFormat::Png)
        .unwrap();
    out
}

/// A solid-color grayscale JPEG.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::GrayImage::from_pixel(width, height, image::Luma([90]));
    let mut out = Vec::new();
    image::DynamicImage::ImageLuma8(img)
        .write_to(&mut Cursor::new(&mut out), image::ImageOutputFormat::Jpeg(90))
        .unwrap();
    out
}

/// Dictionary of an object in a loaded graph.
pub fn dict<'a>(doc: &'a Document, id: ObjectId) -> &'a Dictionary {
    match doc.get_object(id).unwrap() {
        Object::Dictionary(dict) => dict,
        Object::Stream(stream) => &stream.dict,
        other => panic!("object {:?} is not a dictionary: {:?}", id, other),
    }
}

/// Name stored under `key`, if any.
pub fn name_entry(dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key).ok()? {
        Object::Name(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

/// Ids of the widget annotations on the first page.
pub fn page_annotation_ids(doc: &Document) -> Vec<ObjectId> {
    let page_id = *doc.get_pages().values().next().unwrap();
    match dict(doc, page_id).get(b"Annots") {
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_reference().ok())
            .collect(),
        _ => Vec::new(),
    }
}

fn rect(values: [f32; 4]) -> Object {
    Object::Array(values.iter().map(|v| Object::Real(*v)).collect())
}

fn form_xobject(width: f32, height: f32, content: &[u8]) -> Stream {
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => rect([0.0, 0.0, width, height]),
        },
        content.to_vec(),
    )
}

fn widget(page_id: ObjectId, area: [f32; 4]) -> Dictionary {
    dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "P" => page_id,
        "F" => 4,
        "Rect" => rect(area),
    }
}

fn state_appearances(doc: &mut Document, on_state: &str, size: f32) -> Dictionary {
    let on = doc.add_object(form_xobject(size, size, b"q 0 g 3 3 9 9 re f Q"));
    let off = doc.add_object(form_xobject(size, size, b""));
    dictionary! { on_state => on, "Off" => off }
}

fn text_field(doc: &mut Document, page_id: ObjectId, name: &str, value: Option<&str>, area: [f32; 4]) -> ObjectId {
    let mut field = widget(page_id, area);
    field.set("FT", "Tx");
    field.set("T", Object::string_literal(name));
    field.set("DA", Object::string_literal("/Helv 0 Tf 0 g"));
    if let Some(value) = value {
        field.set("V", Object::string_literal(value));
    }
    doc.add_object(field)
}

fn checkbox(doc: &mut Document, page_id: ObjectId, name: &str, checked: bool, area: [f32; 4]) -> ObjectId {
    let state = if checked { "Yes" } else { "Off" };
    let mut field = widget(page_id, area);
    field.set("FT", "Btn");
    field.set("T", Object::string_literal(name));
    field.set("V", state);
    field.set("AS", state);
    field.set("AP", dictionary! { "N" => state_appearances(doc, "Yes", 15.0) });
    doc.add_object(field)
}

fn build_pdf(with_form: bool, encrypted: bool) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let page_id = doc.new_object_id();

    let helv = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let content = doc.add_object(Stream::new(
        dictionary! {},
        b"BT /F1 18 Tf 72 740 Td (Sample form) Tj ET".to_vec(),
    ));

    let mut fields = Vec::new();
    let mut annots = Vec::new();
    if with_form {
        for (name, y) in [("first_name", 700.0), ("last_name", 670.0)] {
            let id = text_field(&mut doc, page_id, name, Some("Test"), [72.0, y, 272.0, y + 20.0]);
            fields.push(id);
            annots.push(id);
        }

        for (name, checked, x) in [("football", false, 72.0), ("nascar", false, 112.0), ("newsletter", true, 152.0)] {
            let id = checkbox(&mut doc, page_id, name, checked, [x, 620.0, x + 15.0, 635.0]);
            fields.push(id);
            annots.push(id);
        }

        let language_id = doc.new_object_id();
        let mut kids = Vec::new();
        for (option, x) in [("ruby", 72.0), ("dart", 112.0), ("rust", 152.0)] {
            let mut kid = widget(page_id, [x, 580.0, x + 15.0, 595.0]);
            kid.set("Parent", language_id);
            kid.set("AS", if option == "dart" { option } else { "Off" });
            kid.set("AP", dictionary! { "N" => state_appearances(&mut doc, option, 15.0) });
            let kid_id = doc.add_object(kid);
            kids.push(Object::Reference(kid_id));
            annots.push(kid_id);
        }
        doc.objects.insert(
            language_id,
            Object::Dictionary(dictionary! {
                "FT" => "Btn",
                "Ff" => 49152,
                "T" => Object::string_literal("language"),
                "V" => "dart",
                "Kids" => kids,
            }),
        );
        fields.push(language_id);

        let mut country = widget(page_id, [72.0, 540.0, 222.0, 560.0]);
        country.set("FT", "Ch");
        country.set("Ff", 131072);
        country.set("T", Object::string_literal("country"));
        country.set("DA", Object::string_literal("/Helv 10 Tf 0 0 1 rg"));
        country.set(
            "Opt",
            vec![
                Object::string_literal("USA"),
                Object::string_literal("Canada"),
                Object::string_literal("Mexico"),
            ],
        );
        country.set("V", Object::string_literal("USA"));
        country.set("I", vec![Object::Integer(0)]);
        let country_id = doc.add_object(country);
        fields.push(country_id);
        annots.push(country_id);

        let photo_ap = doc.add_object(form_xobject(104.0, 54.0, b"0.9 g 0 0 104 54 re f"));
        let mut photo = widget(page_id, [300.0, 500.0, 404.0, 554.0]);
        photo.set("FT", "Btn");
        photo.set("Ff", 65536);
        photo.set("T", Object::string_literal("photo"));
        photo.set("BS", dictionary! { "W" => 2, "S" => "S" });
        photo.set("AP", dictionary! { "N" => photo_ap });
        let photo_id = doc.add_object(photo);
        fields.push(photo_id);
        annots.push(photo_id);

        let mut signature = widget(page_id, [300.0, 420.0, 500.0, 460.0]);
        signature.set("FT", "Sig");
        signature.set("T", Object::string_literal("signature"));
        let signature_id = doc.add_object(signature);
        fields.push(signature_id);
        annots.push(signature_id);

        let address_id = doc.new_object_id();
        let street_id = text_field(&mut doc, page_id, "street", Some("1 Main St"), [72.0, 380.0, 272.0, 400.0]);
        if let Ok(Object::Dictionary(street)) = doc.get_object_mut(street_id) {
            street.set("Parent", address_id);
        }
        doc.objects.insert(
            address_id,
            Object::Dictionary(dictionary! {
                "T" => Object::string_literal("address"),
                "Kids" => vec![Object::Reference(street_id)],
            }),
        );
        fields.push(address_id);
        annots.push(street_id);
    }

    let mut page = dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Contents" => content,
        "Resources" => dictionary! { "Font" => dictionary! { "F1" => helv } },
    };
    if !annots.is_empty() {
        page.set("Annots", annots.into_iter().map(Object::Reference).collect::<Vec<_>>());
    }
    doc.objects.insert(page_id, Object::Dictionary(page));
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );

    let mut catalog = dictionary! { "Type" => "Catalog", "Pages" => pages_id };
    if with_form {
        catalog.set(
            "AcroForm",
            dictionary! {
                "Fields" => fields.into_iter().map(Object::Reference).collect::<Vec<_>>(),
                "DA" => Object::string_literal("/Helv 0 Tf 0 g"),
                "DR" => dictionary! { "Font" => dictionary! { "Helv" => helv } },
            },
        );
    }
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", catalog_id);

    if encrypted {
        let encrypt_id = doc.add_object(dictionary! {
            "Filter" => "Standard",
            "V" => 1,
            "R" => 2,
            "Length" => 40,
            "P" => -44,
            "O" => Object::string_literal(vec![0x41u8; 32]),
            "U" => Object::string_literal(vec![0x42u8; 32]),
        });
        doc.trailer.set("Encrypt", encrypt_id);
        doc.trailer.set(
            "ID",
            vec![
                Object::string_literal(vec![0x01u8; 16]),
                Object::string_literal(vec![0x01u8; 16]),
            ],
        );
    }

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}
