//! Page composition using lopdf
//!
//! Each original page is wrapped in a Form XObject and drawn, translated,
//! onto a new larger page. Blank pages are plain page dictionaries with a
//! MediaBox and no content.

use std::path::Path;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use log::{debug, info};
use crate::error::{Error, Result};
use crate::layout::{process_document, MarginSpec, OutputPage, PageBox, PageSize, Placement};

/// Name under which the wrapped original page is registered in the new page's resources
const SOURCE_XOBJECT: &[u8] = b"SrcPage";

/// Add margins (and optionally blank pages) to a PDF file
///
/// The input file is only read. The output is written in one go after
/// every page has been built, so a failure leaves no partial output.
///
/// # Example
///
/// ```no_run
/// use pdf_margins::layout::MarginSpec;
/// use pdf_margins::pdf::add_margins;
/// use std::path::Path;
///
/// add_margins(
///     Path::new("report.pdf"),
///     Path::new("report_margins.pdf"),
///     &MarginSpec::absolute(150.0, 150.0, 0.0, 0.0),
///     true,
/// ).expect("Failed to add margins");
/// ```
pub fn add_margins(
    input_path: &Path,
    output_path: &Path,
    margins: &MarginSpec,
    insert_blank_pages: bool,
) -> Result<()> {
    if !input_path.exists() {
        return Err(Error::MissingInput(input_path.to_path_buf()));
    }

    let source = Document::load(input_path)?;
    if source.get_pages().is_empty() {
        return Err(Error::EmptyPdf(input_path.to_path_buf()));
    }

    let mut doc = compose_document(source, margins, insert_blank_pages)?;
    save_document(&mut doc, output_path)?;

    info!("Wrote {}", output_path.display());
    Ok(())
}

/// Build the output document from a loaded source document
///
/// The source is consumed: its objects are reused by the output, and
/// whatever the new page tree no longer references is pruned.
pub fn compose_document(
    source: Document,
    margins: &MarginSpec,
    insert_blank_pages: bool,
) -> Result<Document> {
    let mut doc = source;

    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    if page_ids.is_empty() {
        return Err(Error::General("Document has no pages".to_string()));
    }

    let boxes = page_ids
        .iter()
        .map(|&id| page_box(&doc, id))
        .collect::<Result<Vec<_>>>()?;

    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::with_capacity(page_ids.len() * 2);

    // Rotation of the most recent source page, shared with its blank page
    let mut rotate: Option<i64> = None;

    for output_page in process_document(boxes.iter().copied(), margins, insert_blank_pages) {
        let mut page_dict = match output_page? {
            OutputPage::Composited { source_index, placement } => {
                rotate = page_rotation(&doc, page_ids[source_index])?;
                debug!(
                    "Page {}: {:.2} x {:.2} -> {:.2} x {:.2}",
                    source_index + 1,
                    boxes[source_index].width,
                    boxes[source_index].height,
                    placement.canvas.width,
                    placement.canvas.height,
                );
                composited_page(
                    &mut doc,
                    page_ids[source_index],
                    &boxes[source_index],
                    &placement,
                    pages_id,
                )?
            }
            OutputPage::Blank { size } => blank_page(size, pages_id),
        };

        if let Some(degrees) = rotate {
            page_dict.set("Rotate", Object::Integer(degrees));
        }

        kids.push(Object::Reference(doc.add_object(page_dict)));
    }

    // Create Pages object
    let mut pages_object = Dictionary::new();
    pages_object.set("Type", Object::Name(b"Pages".to_vec()));
    pages_object.set("Count", Object::Integer(kids.len() as i64));
    pages_object.set("Kids", Object::Array(kids));
    doc.objects.insert(pages_id, Object::Dictionary(pages_object));

    // Create Catalog
    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(catalog);

    // Fresh trailer; only the Info dictionary survives from the source
    let info = doc.trailer.get(b"Info").ok().cloned();
    doc.trailer = Dictionary::new();
    doc.trailer.set("Root", Object::Reference(catalog_id));
    if let Some(info) = info {
        doc.trailer.set("Info", info);
    }

    // Old catalog, page tree and content streams are now unreachable
    let pruned = doc.prune_objects();
    debug!("Pruned {} unreferenced objects", pruned.len());

    doc.compress();
    Ok(doc)
}

/// Read the MediaBox of every page, in page order
pub fn read_page_boxes(doc: &Document) -> Result<Vec<PageBox>> {
    doc.get_pages()
        .into_values()
        .map(|id| page_box(doc, id))
        .collect()
}

/// Save a document to `output_path`, replacing any existing file in one step
pub fn save_document(doc: &mut Document, output_path: &Path) -> Result<()> {
    let dir = match output_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    doc.save_to(&mut temp)?;
    temp.persist(output_path).map_err(|e| Error::Io(e.error))?;

    Ok(())
}

/// Build a page that draws the original page at its placement offset
fn composited_page(
    doc: &mut Document,
    source_page_id: ObjectId,
    source_box: &PageBox,
    placement: &Placement,
    pages_id: ObjectId,
) -> Result<Dictionary> {
    let form_id = wrap_page_as_form(doc, source_page_id, source_box)?;

    let (tx, ty) = placement.offset;
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Integer(1),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(1),
                    number(tx),
                    number(ty),
                ],
            ),
            Operation::new("Do", vec![Object::Name(SOURCE_XOBJECT.to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode()?));

    let mut xobjects = Dictionary::new();
    xobjects.set(SOURCE_XOBJECT.to_vec(), Object::Reference(form_id));
    let mut resources = Dictionary::new();
    resources.set("XObject", Object::Dictionary(xobjects));

    let mut page = new_page_dict(placement.canvas, pages_id);
    page.set("Resources", Object::Dictionary(resources));
    page.set("Contents", Object::Reference(content_id));
    Ok(page)
}

fn blank_page(size: PageSize, pages_id: ObjectId) -> Dictionary {
    let mut page = new_page_dict(size, pages_id);
    page.set("Resources", Object::Dictionary(Dictionary::new()));
    page
}

fn new_page_dict(size: PageSize, pages_id: ObjectId) -> Dictionary {
    let mut page = Dictionary::new();
    page.set("Type", Object::Name(b"Page".to_vec()));
    page.set("Parent", Object::Reference(pages_id));
    page.set(
        "MediaBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            number(size.width),
            number(size.height),
        ]),
    );
    page
}

/// Move a page's content and resources into a Form XObject
///
/// The form's BBox is the page's MediaBox, so nothing outside the original
/// page area is drawn on the new canvas.
fn wrap_page_as_form(
    doc: &mut Document,
    page_id: ObjectId,
    source_box: &PageBox,
) -> Result<ObjectId> {
    let content = page_content(doc, page_id)?;
    let resources = inherited_attribute(doc, page_id, b"Resources")?
        .unwrap_or_else(|| Object::Dictionary(Dictionary::new()));

    let mut form_dict = Dictionary::new();
    form_dict.set("Type", Object::Name(b"XObject".to_vec()));
    form_dict.set("Subtype", Object::Name(b"Form".to_vec()));
    form_dict.set("FormType", Object::Integer(1));
    form_dict.set(
        "BBox",
        Object::Array(vec![
            number(source_box.x),
            number(source_box.y),
            number(source_box.x + source_box.width),
            number(source_box.y + source_box.height),
        ]),
    );
    form_dict.set("Resources", resources);

    Ok(doc.add_object(Stream::new(form_dict, content)))
}

/// Concatenate the decoded content streams of a page
///
/// `/Contents` may be a stream, an array of streams, or a reference to
/// either. Streams whose filter cannot be decoded are an error: the form
/// carries no `/Filter`, so raw encoded bytes would render as garbage.
fn page_content(doc: &Document, page_id: ObjectId) -> Result<Vec<u8>> {
    let page_dict = doc.get_object(page_id)?.as_dict()?;

    let mut streams = Vec::new();
    if let Ok(contents) = page_dict.get(b"Contents") {
        collect_content_streams(doc, contents, &mut streams, 0)?;
    }

    let mut combined = Vec::new();
    for stream in streams {
        combined.extend_from_slice(&decoded_stream(stream)?);
        combined.push(b'\n');
    }

    Ok(combined)
}

fn collect_content_streams<'a>(
    doc: &'a Document,
    contents: &'a Object,
    out: &mut Vec<&'a Stream>,
    depth: usize,
) -> Result<()> {
    if depth > 8 {
        return Err(Error::General("Contents references nest too deeply".to_string()));
    }

    match contents {
        Object::Reference(id) => {
            collect_content_streams(doc, doc.get_object(*id)?, out, depth + 1)?;
        }
        Object::Array(items) => {
            for item in items {
                collect_content_streams(doc, item, out, depth + 1)?;
            }
        }
        Object::Stream(stream) => out.push(stream),
        Object::Null => {}
        other => {
            return Err(Error::General(format!(
                "Unexpected object in page Contents: {:?}",
                other
            )))
        }
    }

    Ok(())
}

fn decoded_stream(stream: &Stream) -> Result<Vec<u8>> {
    if stream.dict.get(b"Filter").is_err() {
        return Ok(stream.content.clone());
    }

    stream
        .decompressed_content()
        .map_err(|e| Error::General(format!("Cannot decode page content stream: {}", e)))
}

/// Read a page's MediaBox, following the page tree for inherited values
fn page_box(doc: &Document, page_id: ObjectId) -> Result<PageBox> {
    let media_box = inherited_attribute(doc, page_id, b"MediaBox")?
        .ok_or_else(|| Error::General(format!("Page {:?} has no MediaBox", page_id)))?;

    let media_box = match media_box {
        Object::Reference(id) => doc.get_object(id)?.clone(),
        other => other,
    };

    let values: Vec<f64> = media_box
        .as_array()?
        .iter()
        .filter_map(|obj| as_f64(doc, obj))
        .collect();

    match values.as_slice() {
        [llx, lly, urx, ury] => Ok(PageBox::from_corners(*llx, *lly, *urx, *ury)),
        _ => Err(Error::General(format!("Page {:?} has a malformed MediaBox", page_id))),
    }
}

/// Page rotation in degrees, if the page (or an ancestor) sets a non-zero one
///
/// Margins are applied in unrotated page space; the viewer then rotates the
/// whole enlarged page, so landscape scans stay upright.
fn page_rotation(doc: &Document, page_id: ObjectId) -> Result<Option<i64>> {
    let degrees = match inherited_attribute(doc, page_id, b"Rotate")? {
        Some(Object::Integer(degrees)) => degrees,
        Some(Object::Reference(id)) => doc.get_object(id)?.as_i64()?,
        _ => return Ok(None),
    };

    match degrees.rem_euclid(360) {
        0 => Ok(None),
        normalized => Ok(Some(normalized)),
    }
}

/// Look up a page attribute, walking the `/Parent` chain
fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Result<Option<Object>> {
    let mut current = doc.get_object(page_id)?.as_dict()?;

    // Bounded walk; malformed files can contain Parent cycles
    for _ in 0..64 {
        if let Ok(value) = current.get(key) {
            return Ok(Some(value.clone()));
        }

        match current.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => {
                current = doc.get_object(*parent_id)?.as_dict()?;
            }
            _ => break,
        }
    }

    Ok(None)
}

fn as_f64(doc: &Document, obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        Object::Reference(id) => doc.get_object(*id).ok().and_then(|o| as_f64(doc, o)),
        _ => None,
    }
}

/// Whole numbers are written as integers, everything else as reals
fn number(value: f64) -> Object {
    if value.fract() == 0.0 && value.abs() < i32::MAX as f64 {
        Object::Integer(value as i64)
    } else {
        Object::Real(value as f32)
    }
}
