// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF composer — build a destination document by copying pages out of one or
// more source documents using the `lopdf` crate. Merge and split are both
// expressed as "append pages from a source into a fresh destination".

use std::collections::HashMap;

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::{InputFile, OutputArtifact};
use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use tracing::{debug, info, instrument, warn};

/// File name of the artifact produced by [`merge`].
pub const MERGED_NAME: &str = "merged-document.pdf";

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against cyclic /Parent chains in malformed files.
const MAX_TREE_DEPTH: usize = 64;

/// A decoded source PDF whose pages can be copied into a [`PdfComposer`].
pub struct PdfSource {
    /// The underlying lopdf document.
    document: Document,
    /// Name of the input the document came from (for diagnostics).
    name: String,
}

impl PdfSource {
    /// Decode a PDF from raw bytes already in memory.
    #[instrument(skip(data), fields(bytes_len = data.len()))]
    pub fn from_bytes(name: &str, data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| BlattwerkError::decode(name, err))?;
        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");
        Ok(Self {
            document,
            name: name.to_string(),
        })
    }

    /// Decode the bytes of an [`InputFile`].
    pub fn from_input(input: &InputFile) -> Result<Self> {
        Self::from_bytes(&input.name, &input.bytes)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Page object ids in reading order.
    pub fn page_ids(&self) -> Vec<ObjectId> {
        // `get_pages` is keyed by 1-based page number, so values come out in order.
        self.document.get_pages().into_values().collect()
    }

    /// Borrow the underlying document.
    pub fn document(&self) -> &Document {
        &self.document
    }
}

/// A destination document under construction.
///
/// Pages are appended strictly at the end, so the final page order is the
/// order of the `append_*` calls.
pub struct PdfComposer {
    document: Document,
    /// Object id of the root /Pages node.
    pages_id: ObjectId,
    /// Page references in append order, mirrored into /Kids.
    kids: Vec<ObjectId>,
}

impl Default for PdfComposer {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfComposer {
    /// Start an empty document with a catalog and a flat page tree.
    pub fn new() -> Self {
        let mut document = Document::with_version("1.7");
        let pages_id = document.new_object_id();
        document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => Vec::<Object>::new(),
                "Count" => 0,
            }),
        );
        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        document.trailer.set("Root", catalog_id);

        Self {
            document,
            pages_id,
            kids: Vec::new(),
        }
    }

    /// Number of pages appended so far.
    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Append every page of `source`, in the source's own order.
    #[instrument(skip_all, fields(source = source.name()))]
    pub fn append_document(&mut self, source: &PdfSource) -> Result<usize> {
        let page_ids = source.page_ids();
        self.append_pages(source, &page_ids)?;
        debug!(appended = page_ids.len(), total = self.kids.len(), "Source appended");
        Ok(page_ids.len())
    }

    /// Append a single page (1-indexed) of `source`.
    pub fn append_page(&mut self, source: &PdfSource, page_number: u32) -> Result<()> {
        let pages = source.document.get_pages();
        let page_id = *pages.get(&page_number).ok_or_else(|| {
            BlattwerkError::Compose(format!(
                "page {} out of range ({} has {} pages)",
                page_number,
                source.name,
                pages.len()
            ))
        })?;
        self.append_pages(source, &[page_id])
    }

    /// Copy the given pages of `source` and append them in slice order.
    ///
    /// Objects shared between the copied pages (fonts, images) are imported
    /// once. References to pages outside the slice become null.
    fn append_pages(&mut self, source: &PdfSource, page_ids: &[ObjectId]) -> Result<()> {
        let mut importer = Importer {
            source: &source.document,
            target: &mut self.document,
            imported: HashMap::new(),
        };

        // Reserve destination ids up front so intra-document links between
        // copied pages resolve to the copies.
        let reserved: Vec<ObjectId> = page_ids
            .iter()
            .map(|&page_id| {
                let new_id = importer.target.new_object_id();
                importer.imported.insert(page_id, Some(new_id));
                new_id
            })
            .collect();
        importer.skip_foreign_pages(page_ids);

        for (&page_id, &new_id) in page_ids.iter().zip(&reserved) {
            let page = importer.import_page(page_id, self.pages_id)?;
            importer.target.objects.insert(new_id, Object::Dictionary(page));
            self.kids.push(new_id);
        }

        self.sync_page_tree()
    }

    /// Rewrite /Kids and /Count of the root page node from `self.kids`.
    fn sync_page_tree(&mut self) -> Result<()> {
        let kids: Vec<Object> = self.kids.iter().map(|&id| Object::Reference(id)).collect();
        let pages = self
            .document
            .get_object_mut(self.pages_id)
            .and_then(Object::as_dict_mut)
            .map_err(|err| BlattwerkError::Compose(format!("page tree root missing: {err}")))?;
        pages.set("Kids", Object::Array(kids));
        pages.set("Count", Object::Integer(self.kids.len() as i64));
        Ok(())
    }

    /// Serialise the finished document.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        self.document.compress();
        let mut output = Vec::new();
        self.document
            .save_to(&mut output)
            .map_err(|err| BlattwerkError::Compose(format!("failed to serialise PDF: {err}")))?;
        debug!(pages = self.kids.len(), output_bytes = output.len(), "PDF serialised");
        Ok(output)
    }
}

/// Deep-copies objects from one document into another, remembering which
/// source ids have already been imported.
struct Importer<'a> {
    source: &'a Document,
    target: &'a mut Document,
    /// Source id -> target id, `None` for source pages left behind. An entry
    /// is inserted before the object is imported, which also terminates
    /// reference cycles.
    imported: HashMap<ObjectId, Option<ObjectId>>,
}

impl Importer<'_> {
    /// Mark every source page outside `keep` so references to it are nulled
    /// instead of dragging the whole page along.
    fn skip_foreign_pages(&mut self, keep: &[ObjectId]) {
        for page_id in self.source.get_pages().into_values() {
            if !keep.contains(&page_id) {
                self.imported.insert(page_id, None);
            }
        }
    }

    /// Build the destination page dictionary for `page_id`, pulling in
    /// inherited attributes and re-parenting it under `parent`.
    fn import_page(&mut self, page_id: ObjectId, parent: ObjectId) -> Result<Dictionary> {
        let source = self.source;
        let page = source
            .get_dictionary(page_id)
            .map_err(|err| BlattwerkError::Compose(format!("cannot read page object {page_id:?}: {err}")))?;

        let mut copy = Dictionary::new();
        for (key, value) in page.iter() {
            if key == b"Parent" {
                continue;
            }
            let imported = self.import_object(value);
            copy.set(key.clone(), imported);
        }

        for key in INHERITABLE_KEYS {
            if copy.has(key) {
                continue;
            }
            if let Some(value) = inherited_attribute(source, page, key) {
                let imported = self.import_object(value);
                copy.set(key.to_vec(), imported);
            }
        }

        copy.set("Parent", Object::Reference(parent));
        Ok(copy)
    }

    /// Deep-clone `object`, importing every object it references.
    fn import_object(&mut self, object: &Object) -> Object {
        match object {
            Object::Dictionary(dict) => Object::Dictionary(self.import_dictionary(dict)),
            Object::Array(items) => {
                Object::Array(items.iter().map(|item| self.import_object(item)).collect())
            }
            Object::Stream(stream) => {
                let mut copy = stream.clone();
                copy.dict = self.import_dictionary(&stream.dict);
                Object::Stream(copy)
            }
            Object::Reference(id) => match self.import_reference(*id) {
                Some(new_id) => Object::Reference(new_id),
                None => Object::Null,
            },
            // Boolean, Integer, Real, String, Name, Null.
            other => other.clone(),
        }
    }

    fn import_dictionary(&mut self, dict: &Dictionary) -> Dictionary {
        let mut copy = Dictionary::new();
        for (key, value) in dict.iter() {
            // /Parent back-references lead into the source page tree.
            if key == b"Parent" {
                continue;
            }
            let imported = self.import_object(value);
            copy.set(key.clone(), imported);
        }
        copy
    }

    /// Import the object behind a reference, returning its destination id.
    fn import_reference(&mut self, id: ObjectId) -> Option<ObjectId> {
        if let Some(&known) = self.imported.get(&id) {
            return known;
        }

        let new_id = self.target.new_object_id();
        self.imported.insert(id, Some(new_id));

        let imported = match self.source.get_object(id) {
            Ok(object) => self.import_object(object),
            Err(err) => {
                warn!(?id, %err, "Cannot resolve reference, using Null");
                Object::Null
            }
        };
        self.target.objects.insert(new_id, imported);
        Some(new_id)
    }
}

/// Look `key` up on the page, then on each ancestor page-tree node.
fn inherited_attribute<'a>(doc: &'a Document, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut node = page;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        let parent_id = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent_id).ok()?;
    }
    None
}

/// Merge `inputs` into one PDF, in input order.
///
/// Fewer than two inputs is an input-validation error. Any source that fails
/// to decode aborts the merge.
#[instrument(skip_all, fields(inputs = inputs.len()))]
pub fn merge(inputs: &[InputFile]) -> Result<OutputArtifact> {
    if inputs.len() < 2 {
        return Err(BlattwerkError::InputValidation(format!(
            "merging needs at least 2 PDFs, got {}",
            inputs.len()
        )));
    }

    let mut composer = PdfComposer::new();
    for input in inputs {
        let source = PdfSource::from_input(input)?;
        composer.append_document(&source)?;
    }

    info!(pages = composer.page_count(), "Merging PDFs");
    Ok(OutputArtifact::pdf(MERGED_NAME, composer.finish()?))
}

/// Name of the artifact holding page `index` (0-based) of a split.
pub fn split_page_name(index: usize) -> String {
    format!("page-{}.pdf", index + 1)
}

/// Extract one page (0-based `index`) of `source` into its own PDF artifact.
pub fn extract_page(source: &PdfSource, index: usize) -> Result<OutputArtifact> {
    let page_number = u32::try_from(index + 1)
        .map_err(|_| BlattwerkError::Compose(format!("page index {index} too large")))?;
    let mut composer = PdfComposer::new();
    composer.append_page(source, page_number)?;
    Ok(OutputArtifact::pdf(split_page_name(index), composer.finish()?))
}

/// Split `input` into one single-page PDF per page, in page order.
///
/// A document without pages yields no artifacts.
#[instrument(skip_all, fields(name = %input.name))]
pub fn split(input: &InputFile) -> Result<Vec<OutputArtifact>> {
    let source = PdfSource::from_input(input)?;
    let total = source.page_count();
    info!(total, "Splitting PDF");

    (0..total).map(|index| extract_page(&source, index)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{page_labels, pdf_with_pages};

    fn pdf_input(name: &str, pages: u32) -> InputFile {
        InputFile::from_named_bytes(name, pdf_with_pages(pages, name.trim_end_matches(".pdf")))
    }

    #[test]
    fn merge_concatenates_in_source_order() {
        let artifact = merge(&[pdf_input("doc1.pdf", 2), pdf_input("doc2.pdf", 3)]).unwrap();

        assert_eq!(artifact.name, MERGED_NAME);
        assert_eq!(artifact.mime_type, "application/pdf");
        assert_eq!(
            page_labels(&artifact.bytes),
            vec!["doc1-p1", "doc1-p2", "doc2-p1", "doc2-p2", "doc2-p3"]
        );
    }

    #[test]
    fn merged_pages_keep_inherited_attributes() {
        let artifact = merge(&[pdf_input("a.pdf", 1), pdf_input("b.pdf", 1)]).unwrap();
        let doc = Document::load_mem(&artifact.bytes).unwrap();
        for page_id in doc.get_pages().into_values() {
            let page = doc.get_dictionary(page_id).unwrap();
            assert!(page.has(b"MediaBox"));
            assert!(page.has(b"Resources"));
        }
    }

    #[test]
    fn merge_with_one_input_is_rejected() {
        let err = merge(&[pdf_input("only.pdf", 4)]).unwrap_err();
        assert!(matches!(err, BlattwerkError::InputValidation(_)));
    }

    #[test]
    fn merge_aborts_on_corrupt_source() {
        let broken = InputFile::from_named_bytes("broken.pdf", b"%PDF-1.7 garbage".to_vec());
        let err = merge(&[pdf_input("good.pdf", 1), broken]).unwrap_err();
        match err {
            BlattwerkError::Decode { name, .. } => assert_eq!(name, "broken.pdf"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn split_yields_one_artifact_per_page() {
        let artifacts = split(&pdf_input("five.pdf", 5)).unwrap();

        let names: Vec<&str> = artifacts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["page-1.pdf", "page-2.pdf", "page-3.pdf", "page-4.pdf", "page-5.pdf"]);
        for (index, artifact) in artifacts.iter().enumerate() {
            assert_eq!(page_labels(&artifact.bytes), vec![format!("five-p{}", index + 1)]);
        }
    }

    #[test]
    fn split_of_empty_document_yields_nothing() {
        let artifacts = split(&pdf_input("empty.pdf", 0)).unwrap();
        assert!(artifacts.is_empty());
    }

    #[test]
    fn split_of_zero_byte_input_is_a_decode_error() {
        let input = InputFile::from_named_bytes("zero.pdf", Vec::new());
        assert!(matches!(split(&input), Err(BlattwerkError::Decode { .. })));
    }

    #[test]
    fn merging_split_pages_restores_the_document() {
        let original = pdf_input("orig.pdf", 4);
        let pages = split(&original).unwrap();
        let inputs: Vec<InputFile> = pages
            .into_iter()
            .map(|artifact| InputFile::new(artifact.name, artifact.bytes, artifact.mime_type))
            .collect();

        let rebuilt = merge(&inputs).unwrap();
        assert_eq!(page_labels(&rebuilt.bytes), page_labels(&original.bytes));
    }

    #[test]
    fn shared_resources_are_imported_once() {
        let source = PdfSource::from_bytes("shared.pdf", &pdf_with_pages(3, "shared")).unwrap();
        let mut composer = PdfComposer::new();
        composer.append_document(&source).unwrap();

        let fonts = composer
            .document
            .objects
            .values()
            .filter(|object| {
                object
                    .as_dict()
                    .and_then(|dict| dict.get(b"Type"))
                    .and_then(Object::as_name)
                    .is_ok_and(|name| name == b"Font")
            })
            .count();
        assert_eq!(fonts, 1);
    }

    #[test]
    fn out_of_range_page_is_a_compose_error() {
        let source = PdfSource::from_bytes("two.pdf", &pdf_with_pages(2, "two")).unwrap();
        let mut composer = PdfComposer::new();
        assert!(matches!(
            composer.append_page(&source, 3),
            Err(BlattwerkError::Compose(_))
        ));
        assert_eq!(composer.page_count(), 0);
    }
}
