//! Integration tests for saving, flattening and the document lifecycle.

mod common;

use common::*;
use fillable_pdf::writer::write_atomic;
use fillable_pdf::{DocumentState, Error, FillablePdf, FlattenSummary, SaveOptions};
use lopdf::Object;
use std::fs;
use std::io::Write;

#[test]
fn test_fill_rename_remove_and_flatten() {
    let fixture = sample_form();
    let output = fixture.sibling("filled.pdf");
    let mut pdf = FillablePdf::open(&fixture.path).unwrap();

    pdf.set_fields([("first_name", "Richard"), ("football", "Yes")]).unwrap();
    pdf.set_field("language", "ruby").unwrap();
    assert_eq!(pdf.field("first_name").unwrap(), "Richard");
    assert_eq!(pdf.field("football").unwrap(), "Yes");
    assert_eq!(pdf.field("language").unwrap(), "ruby");

    pdf.rename_field("first_name", "given_name").unwrap();
    assert_eq!(pdf.field("given_name").unwrap(), "Richard");
    assert!(matches!(pdf.field("first_name"), Err(Error::UnknownField(_))));

    let count = pdf.num_fields().unwrap();
    pdf.remove_field("football").unwrap();
    assert_eq!(pdf.num_fields().unwrap(), count - 1);
    assert!(matches!(pdf.field("football"), Err(Error::UnknownField(_))));

    pdf.save_as(&output, true).unwrap();
    assert!(pdf.flatten_summary().is_some());
    pdf.close().unwrap();

    let reopened = FillablePdf::open(&output).unwrap();
    assert_eq!(reopened.num_fields().unwrap(), 0);
    assert!(!reopened.any_fields().unwrap());
    for name in SAMPLE_FIELDS {
        assert!(matches!(reopened.field(name), Err(Error::UnknownField(_))));
    }
}

#[test]
fn test_interactive_save_keeps_values() {
    let fixture = sample_form();
    let output = fixture.sibling("interactive.pdf");
    let mut pdf = FillablePdf::open(&fixture.path).unwrap();

    pdf.set_field("last_name", "Ёлкин").unwrap();
    pdf.set_field("newsletter", "Off").unwrap();
    pdf.rename_field("address.street", "address.road").unwrap();
    pdf.set_image_bytes("photo", &png_bytes(20, 10)).unwrap();
    pdf.save_as(&output, false).unwrap();

    let reopened = FillablePdf::open(&output).unwrap();
    assert_eq!(reopened.num_fields().unwrap(), SAMPLE_FIELDS.len());
    assert_eq!(reopened.field("last_name").unwrap(), "Ёлкин");
    assert_eq!(reopened.field("newsletter").unwrap(), "Off");
    assert_eq!(reopened.field("address.road").unwrap(), "1 Main St");
    assert!(matches!(reopened.field("address.street"), Err(Error::UnknownField(_))));

    // the source file is untouched
    let original = FillablePdf::open(&fixture.path).unwrap();
    assert_eq!(original.field("last_name").unwrap(), "Test");
}

#[test]
fn test_flatten_draws_appearances_into_page() {
    let fixture = sample_form();
    let output = fixture.sibling("flat.pdf");
    let mut pdf = FillablePdf::open(&fixture.path).unwrap();
    pdf.set_field("first_name", "Richard").unwrap();

    pdf.save_with_options(&output, SaveOptions::flattened().with_compression(false))
        .unwrap();

    let doc = lopdf::Document::load(&output).unwrap();
    let page_id = *doc.get_pages().values().next().unwrap();
    assert!(dict(&doc, page_id).get(b"Annots").is_err());

    let content = String::from_utf8_lossy(&doc.get_page_content(page_id).unwrap()).into_owned();
    assert!(content.starts_with("q\n"));
    assert!(content.contains("(Sample form) Tj"));
    assert!(content.contains("/Flat0 Do"));
    // original content is isolated from the overlay
    let original_at = content.find("(Sample form) Tj").unwrap();
    let overlay_at = content.find("/Flat0 Do").unwrap();
    assert!(original_at < overlay_at);
}

/// Content of the page XObject registered under `name`.
fn page_xobject_content(doc: &lopdf::Document, page_id: lopdf::ObjectId, name: &str) -> Vec<u8> {
    let resources = dict(doc, page_id).get(b"Resources").unwrap().as_dict().unwrap();
    let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
    let id = xobjects.get(name.as_bytes()).unwrap().as_reference().unwrap();
    doc.get_object(id).unwrap().as_stream().unwrap().content.clone()
}

#[test]
fn test_flatten_draws_states_and_skips_hidden_widgets() {
    let fixture = sample_form();
    let nascar_id = FillablePdf::open(&fixture.path).unwrap().field_info("nascar").unwrap().object_id();
    edit_fixture(&fixture, |doc| {
        // print + hidden
        doc.get_object_mut(nascar_id).unwrap().as_dict_mut().unwrap().set("F", 6);
    });
    let output = fixture.sibling("flat_states.pdf");
    let mut pdf = FillablePdf::open(&fixture.path).unwrap();
    pdf.set_field("first_name", "Richard").unwrap();
    pdf.set_field("newsletter", "Yes").unwrap();
    assert_eq!(pdf.flatten_summary(), None);

    pdf.save_with_options(&output, SaveOptions::flattened().with_compression(false))
        .unwrap();

    // drawn: first_name, football, newsletter, three radios, photo
    assert_eq!(
        pdf.flatten_summary(),
        Some(FlattenSummary {
            pages: 1,
            drawn: 7,
            removed: 12,
        })
    );

    let doc = lopdf::Document::load(&output).unwrap();
    let page_id = *doc.get_pages().values().next().unwrap();
    let content = String::from_utf8_lossy(&doc.get_page_content(page_id).unwrap()).into_owned();
    assert_eq!(content.matches(" Do").count(), 7);
    assert!(content.contains("/Flat6 Do"));
    assert!(!content.contains("/Flat7"));

    // checkboxes and radios draw the stream of their /AS state
    assert!(as_text(&page_xobject_content(&doc, page_id, "Flat0")).contains("(Richard) Tj"));
    assert!(page_xobject_content(&doc, page_id, "Flat1").is_empty());
    assert_eq!(page_xobject_content(&doc, page_id, "Flat2"), b"q 0 g 3 3 9 9 re f Q");
    assert!(page_xobject_content(&doc, page_id, "Flat3").is_empty());
    assert_eq!(page_xobject_content(&doc, page_id, "Flat4"), b"q 0 g 3 3 9 9 re f Q");
    assert!(page_xobject_content(&doc, page_id, "Flat5").is_empty());

    let catalog = doc.catalog().unwrap();
    let acroform_id = catalog.get(b"AcroForm").unwrap().as_reference().unwrap();
    let fields = dict(&doc, acroform_id).get(b"Fields").unwrap();
    assert_eq!(fields, &Object::Array(Vec::new()));
}

fn as_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[test]
fn test_save_in_place_replaces_original() {
    let fixture = sample_form();
    let mut pdf = FillablePdf::open(&fixture.path).unwrap();

    pdf.set_field("first_name", "Richard").unwrap();
    pdf.save(false).unwrap();

    let reopened = FillablePdf::open(&fixture.path).unwrap();
    assert_eq!(reopened.field("first_name").unwrap(), "Richard");
    // no temporary file is left behind
    let entries = fs::read_dir(fixture.dir.path()).unwrap().count();
    assert_eq!(entries, 1);
}

#[cfg(unix)]
#[test]
fn test_save_through_symlink_keeps_link() {
    let fixture = sample_form();
    let link = fixture.sibling("link.pdf");
    std::os::unix::fs::symlink(&fixture.path, &link).unwrap();
    let mut pdf = FillablePdf::open(&link).unwrap();

    pdf.set_field("first_name", "Richard").unwrap();
    pdf.save(false).unwrap();

    assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
    let reopened = FillablePdf::open(&fixture.path).unwrap();
    assert_eq!(reopened.field("first_name").unwrap(), "Richard");
    assert_eq!(fs::read_dir(fixture.dir.path()).unwrap().count(), 2);
}

#[test]
fn test_interrupted_write_keeps_original() {
    let fixture = sample_form();
    let original = fs::read(&fixture.path).unwrap();

    let result = write_atomic(&fixture.path, |file| {
        file.write_all(b"%PDF-1.7\n")?;
        Err(std::io::Error::new(std::io::ErrorKind::Interrupted, "power loss"))
    });

    assert!(matches!(result, Err(Error::Io { .. })));
    assert_eq!(fs::read(&fixture.path).unwrap(), original);
    assert!(FillablePdf::open(&fixture.path).is_ok());
}

#[test]
fn test_write_failure_names_path() {
    let fixture = sample_form();
    let target = fixture.sibling("missing_dir").join("out.pdf");
    let mut pdf = FillablePdf::open(&fixture.path).unwrap();

    match pdf.save_as(&target, false) {
        Err(Error::Io { path, .. }) => assert_eq!(path, target),
        other => panic!("expected Io error, got {:?}", other),
    }

    // the failure can be retried with another target
    let retry = fixture.sibling("out.pdf");
    pdf.save_as(&retry, false).unwrap();
    assert!(FillablePdf::open(&retry).is_ok());
}

#[test]
fn test_finalized_document_is_read_only() {
    let fixture = sample_form();
    let mut pdf = FillablePdf::open(&fixture.path).unwrap();
    pdf.set_field("first_name", "Richard").unwrap();

    let bytes = pdf.to_bytes(false).unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
    assert_eq!(pdf.state(), DocumentState::Finalized);

    assert!(matches!(pdf.set_field("first_name", "x"), Err(Error::AlreadyFinalized)));
    assert!(matches!(pdf.rename_field("first_name", "x"), Err(Error::AlreadyFinalized)));
    assert!(matches!(pdf.remove_field("first_name"), Err(Error::AlreadyFinalized)));
    assert!(matches!(
        pdf.set_image_bytes("photo", &png_bytes(2, 2)),
        Err(Error::AlreadyFinalized)
    ));
    assert!(matches!(pdf.to_bytes(true), Err(Error::AlreadyFinalized)));

    // reads still work, saves write the same bytes
    assert_eq!(pdf.field("first_name").unwrap(), "Richard");
    let output = fixture.sibling("again.pdf");
    pdf.save_as(&output, false).unwrap();
    assert_eq!(fs::read(&output).unwrap(), bytes);
}

#[test]
fn test_closed_document_rejects_everything() {
    let fixture = sample_form();
    let mut pdf = FillablePdf::open(&fixture.path).unwrap();
    assert_eq!(pdf.state(), DocumentState::Open);

    pdf.close().unwrap();

    assert_eq!(pdf.state(), DocumentState::Closed);
    assert!(matches!(pdf.num_fields(), Err(Error::DocumentClosed)));
    assert!(matches!(pdf.field("first_name"), Err(Error::DocumentClosed)));
    assert!(matches!(pdf.set_field("first_name", "x"), Err(Error::DocumentClosed)));
    assert!(matches!(pdf.save(false), Err(Error::DocumentClosed)));
    assert!(matches!(pdf.to_bytes(false), Err(Error::DocumentClosed)));
    assert!(matches!(pdf.close(), Err(Error::DocumentClosed)));
}
