// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image PDF writer — one page per raster image using `printpdf` 0.8.
//
// Every page has the configured paper size and no margin. The image is scaled
// uniformly to the largest size that fits and centred (see `geometry`).

use blattwerk_core::PaperSize;
use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::{InputFile, OutputArtifact};
use printpdf::{
    ImageCompression, ImageOptimizationOptions, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions,
    PdfWarnMsg, Pt, RawImage, RawImageData, RawImageFormat, XObjectTransform,
};
use tracing::{debug, info, instrument};

use crate::geometry::{PageGeometry, PlacementRect, fit_to_page};
use crate::raster::converter::{decode_rgba, flatten_onto_white};

/// File name of the artifact produced by [`ImagePdfWriter::write`].
pub const IMAGES_PDF_NAME: &str = "images-to-pdf.pdf";

/// At 72 dpi one image pixel is one PDF point, so the placement scale is
/// simply `rect / pixels`.
const PLACEMENT_DPI: f32 = 72.0;

/// Builds a PDF with exactly one page per input image, in input order.
pub struct ImagePdfWriter {
    paper_size: PaperSize,
    /// JPEG quality of the embedded rasters, 0.0 to 1.0.
    image_quality: f32,
}

impl ImagePdfWriter {
    pub fn new(paper_size: PaperSize, image_quality: f32) -> Self {
        Self {
            paper_size,
            image_quality,
        }
    }

    /// A4 pages, images embedded at quality 0.95.
    pub fn a4() -> Self {
        Self::new(PaperSize::A4, 0.95)
    }

    pub fn paper_size(&self) -> PaperSize {
        self.paper_size
    }

    /// Page size in PDF points.
    fn page_geometry(&self) -> PageGeometry {
        let (width, height) = self.paper_size.dimensions_pt();
        PageGeometry::new(width, height)
    }

    /// Render `images` into a single PDF.
    ///
    /// An empty list is an input-validation error; any image that fails to
    /// decode fails the whole document.
    #[instrument(skip_all, fields(images = images.len(), paper = ?self.paper_size))]
    pub fn write(&self, images: &[InputFile]) -> Result<OutputArtifact> {
        if images.is_empty() {
            return Err(BlattwerkError::InputValidation(
                "building a PDF needs at least 1 image".into(),
            ));
        }

        let (w_mm, h_mm) = self.paper_size.dimensions_mm();
        let page = self.page_geometry();
        let mut doc = PdfDocument::new("Images");
        let mut pages = Vec::with_capacity(images.len());

        for input in images {
            let raw = self.embeddable_raster(input)?;
            let pixels = PageGeometry::new(raw.width as f32, raw.height as f32);
            let rect = fit_to_page(page, pixels)?;
            let xobject_id = doc.add_image(&raw);

            debug!(
                name = %input.name,
                x = rect.x,
                y = rect.y,
                width = rect.width,
                height = rect.height,
                "Image placed on page"
            );

            let ops = vec![Op::UseXobject {
                id: xobject_id,
                transform: placement_transform(rect, pixels),
            }];
            pages.push(PdfPage::new(Mm(w_mm as f32), Mm(h_mm as f32), ops));
        }

        doc.with_pages(pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&self.save_options(), &mut warnings);
        if !warnings.is_empty() {
            debug!(count = warnings.len(), "printpdf reported warnings");
        }

        info!(pages = images.len(), output_bytes = output.len(), "Image PDF created");
        Ok(OutputArtifact::pdf(IMAGES_PDF_NAME, output))
    }

    /// Every raster is stored as a DCT stream at the configured quality and
    /// full resolution. printpdf's defaults would downscale anything above
    /// 2 MB and pick the filter itself.
    fn save_options(&self) -> PdfSaveOptions {
        PdfSaveOptions {
            image_optimization: Some(ImageOptimizationOptions {
                quality: Some(self.image_quality.clamp(0.0, 1.0)),
                max_image_size: None,
                dither_greyscale: Some(false),
                convert_to_greyscale: Some(false),
                auto_optimize: Some(false),
                format: Some(ImageCompression::Jpeg),
            }),
            ..Default::default()
        }
    }

    /// Decode `input` and flatten any transparency onto white, giving the
    /// RGB8 raster printpdf encodes on save.
    fn embeddable_raster(&self, input: &InputFile) -> Result<RawImage> {
        let rgb = flatten_onto_white(&decode_rgba(&input.name, &input.bytes)?);

        Ok(RawImage {
            width: rgb.width() as usize,
            height: rgb.height() as usize,
            pixels: RawImageData::U8(rgb.into_raw()),
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        })
    }
}

fn placement_transform(rect: PlacementRect, pixels: PageGeometry) -> XObjectTransform {
    XObjectTransform {
        translate_x: Some(Pt(rect.x)),
        translate_y: Some(Pt(rect.y)),
        scale_x: Some(rect.width / pixels.width),
        scale_y: Some(rect.height / pixels.height),
        dpi: Some(PLACEMENT_DPI),
        rotate: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::png_bytes;
    use lopdf::Document;
    use lopdf::content::Content;

    fn png(name: &str, width: u32, height: u32) -> InputFile {
        InputFile::from_named_bytes(name, png_bytes(width, height))
    }

    /// Width, height and filters of the single image on each page, in page order.
    fn page_images(pdf: &[u8]) -> Vec<(i64, i64, Vec<String>)> {
        let doc = Document::load_mem(pdf).unwrap();
        doc.get_pages()
            .into_values()
            .map(|page_id| {
                let images = doc.get_page_images(page_id).unwrap();
                assert_eq!(images.len(), 1, "page {page_id:?}");
                let image = &images[0];
                (image.width, image.height, image.filters.clone().unwrap_or_default())
            })
            .collect()
    }

    /// Operands of the first `cm` operator on page `number`.
    fn placement_matrix(pdf: &[u8], number: u32) -> Vec<f32> {
        let doc = Document::load_mem(pdf).unwrap();
        let page_id = *doc.get_pages().get(&number).unwrap();
        let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
        content
            .operations
            .iter()
            .find(|op| op.operator == "cm")
            .unwrap()
            .operands
            .iter()
            .map(|operand| operand.as_float().unwrap())
            .collect()
    }

    #[test]
    fn one_page_per_image_in_order() {
        let images = vec![png("a.png", 40, 30), png("b.png", 10, 60), png("c.png", 20, 20)];
        let artifact = ImagePdfWriter::a4().write(&images).unwrap();

        assert_eq!(artifact.name, IMAGES_PDF_NAME);
        assert_eq!(artifact.mime_type, "application/pdf");
        let sizes: Vec<(i64, i64)> = page_images(&artifact.bytes)
            .into_iter()
            .map(|(width, height, _)| (width, height))
            .collect();
        assert_eq!(sizes, [(40, 30), (10, 60), (20, 20)]);
    }

    #[test]
    fn large_images_keep_full_resolution_as_jpeg() {
        let images = [png("photo.png", 2000, 1500)];
        let fine = ImagePdfWriter::new(PaperSize::A4, 0.95).write(&images).unwrap();
        let coarse = ImagePdfWriter::new(PaperSize::A4, 0.30).write(&images).unwrap();

        let embedded = page_images(&fine.bytes);
        assert_eq!(embedded.len(), 1);
        let (width, height, filters) = &embedded[0];
        assert_eq!((*width, *height), (2000, 1500));
        assert_eq!(filters, &["DCTDecode"]);
        assert!(coarse.len() < fine.len(), "{} vs {}", coarse.len(), fine.len());
    }

    #[test]
    fn drawn_rect_matches_page_fit() {
        let images = [png("wide.png", 160, 90), png("tall.png", 30, 100)];
        let artifact = ImagePdfWriter::a4().write(&images).unwrap();
        let (w_pt, h_pt) = PaperSize::A4.dimensions_pt();
        let page = PageGeometry::new(w_pt, h_pt);

        for (number, (w, h)) in [(1, (160.0, 90.0)), (2, (30.0, 100.0))] {
            let rect = fit_to_page(page, PageGeometry::new(w, h)).unwrap();
            let matrix = placement_matrix(&artifact.bytes, number);
            let expected = [rect.width, 0.0, 0.0, rect.height, rect.x, rect.y];
            assert_eq!(matrix.len(), 6);
            for (actual, expected) in matrix.iter().zip(expected) {
                assert!((actual - expected).abs() < 0.5, "page {number}: {matrix:?} vs {rect:?}");
            }
        }
    }

    #[test]
    fn pages_use_configured_paper_size() {
        let artifact = ImagePdfWriter::new(PaperSize::Letter, 0.9)
            .write(&[png("wide.png", 80, 20)])
            .unwrap();
        let doc = Document::load_mem(&artifact.bytes).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        let media_box = doc
            .get_dictionary(page_id)
            .unwrap()
            .get(b"MediaBox")
            .unwrap()
            .as_array()
            .unwrap()
            .clone();
        let width = media_box[2].as_float().unwrap();
        let height = media_box[3].as_float().unwrap();
        // 8.5 x 11 in, within the mm rounding of the paper table.
        assert!((width - 612.0).abs() < 2.0, "width {width}");
        assert!((height - 792.0).abs() < 2.0, "height {height}");
    }

    #[test]
    fn transform_scales_pixels_onto_rect() {
        let page = PageGeometry::new(595.28, 841.89);
        let pixels = PageGeometry::new(1600.0, 900.0);
        let rect = fit_to_page(page, pixels).unwrap();
        let transform = placement_transform(rect, pixels);

        let scale_x = transform.scale_x.unwrap();
        let scale_y = transform.scale_y.unwrap();
        assert!((scale_x * pixels.width - page.width).abs() < 1e-2);
        assert!((scale_x - scale_y).abs() < 1e-5);
        assert_eq!(transform.translate_x.unwrap().0, 0.0);
    }

    #[test]
    fn empty_list_is_rejected() {
        let err = ImagePdfWriter::a4().write(&[]).unwrap_err();
        assert!(matches!(err, BlattwerkError::InputValidation(_)));
    }

    #[test]
    fn undecodable_image_fails_the_document() {
        let images = vec![
            png("ok.png", 5, 5),
            InputFile::new("bad.jpg", b"nope".to_vec(), "image/jpeg"),
        ];
        match ImagePdfWriter::a4().write(&images).unwrap_err() {
            BlattwerkError::Decode { name, .. } => assert_eq!(name, "bad.jpg"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
