//! The consumer side of the parser: a sink for typed document events.

use crate::value::{CapStyle, Color, LineStyle, PageType, Point, StrokeTool};

/// Receives the events of one parsed document, in strict document order.
///
/// The [`XoppParser`] drives an implementation of this trait the same way
/// a SAX handler is driven: for every element, attribute-carrying `add_*`
/// events arrive before the element's text and children, and a
/// `finalize_*` event closes it. All methods have empty default bodies so
/// a builder only implements what it consumes.
///
/// Background selection happens between `add_page` and the page's first
/// layer: exactly one of [`set_bg_solid`], [`set_bg_pixmap`],
/// [`set_bg_pixmap_cloned`] or [`load_bg_pdf`] + [`set_bg_pdf`] is
/// invoked, optionally preceded by [`set_bg_name`].
///
/// [`XoppParser`]: crate::parser::XoppParser
/// [`set_bg_solid`]: Self::set_bg_solid
/// [`set_bg_pixmap`]: Self::set_bg_pixmap
/// [`set_bg_pixmap_cloned`]: Self::set_bg_pixmap_cloned
/// [`load_bg_pdf`]: Self::load_bg_pdf
/// [`set_bg_pdf`]: Self::set_bg_pdf
/// [`set_bg_name`]: Self::set_bg_name
#[allow(unused_variables)]
pub trait DocumentBuilder {
    /// A Xournal / Xournal++ document header.
    fn add_xournal(&mut self, creator: &str, fileversion: u32) {}

    /// A MrWriter document header.
    fn add_mrwriter(&mut self, creator: &str) {}

    /// A new page of the given size, in document units.
    fn add_page(&mut self, width: f64, height: f64) {}

    /// The stored name of the page's background, when present.
    fn set_bg_name(&mut self, name: &str) {}

    /// A solid-color ruled background.
    fn set_bg_solid(&mut self, page_type: PageType, color: Color) {}

    /// A pixmap background; `attach` selects a file stored next to the
    /// document instead of an absolute path.
    fn set_bg_pixmap(&mut self, attach: bool, path: &str) {}

    /// A pixmap background cloned from the given earlier page (0-based).
    fn set_bg_pixmap_cloned(&mut self, page_nr: usize) {}

    /// Loads the document's background PDF. Called at most once per
    /// document, for the first PDF background carrying a filename.
    fn load_bg_pdf(&mut self, attach: bool, path: &str) {}

    /// Selects a page (0-based) of the loaded background PDF.
    fn set_bg_pdf(&mut self, pageno: usize) {}

    /// A new layer on the current page.
    fn add_layer(&mut self, name: Option<&str>) {}

    /// Closes the current layer.
    fn finalize_layer(&mut self) {}

    /// A stroke and its attributes. `audio_fn` is empty when the stroke
    /// has no audio recording attached.
    #[allow(clippy::too_many_arguments)]
    fn add_stroke(
        &mut self,
        tool: StrokeTool,
        color: Color,
        width: f64,
        fill: i32,
        cap_style: CapStyle,
        line_style: Option<LineStyle>,
        audio_fn: &str,
        audio_ts: u64,
    ) {
    }

    /// The coordinates of the current stroke, with one pressure per
    /// segment when the stroke is pressure-sensitive (`pressures` is
    /// empty otherwise).
    fn set_stroke_points(&mut self, points: &[Point], pressures: &[f64]) {}

    /// Closes the current stroke.
    fn finalize_stroke(&mut self) {}

    /// A text box and its attributes.
    #[allow(clippy::too_many_arguments)]
    fn add_text(
        &mut self,
        font: &str,
        size: f64,
        x: f64,
        y: f64,
        color: Color,
        audio_fn: &str,
        audio_ts: u64,
    ) {
    }

    /// The contents of the current text box.
    fn set_text_contents(&mut self, text: &str) {}

    /// Closes the current text box.
    fn finalize_text(&mut self) {}

    /// An image and its bounding box.
    fn add_image(&mut self, left: f64, top: f64, right: f64, bottom: f64) {}

    /// The decoded payload of the current image.
    fn set_image_data(&mut self, data: Vec<u8>) {}

    /// The attachment path of the current image, when it is stored next
    /// to the document instead of inline.
    fn set_image_attachment(&mut self, path: &str) {}

    /// Closes the current image.
    fn finalize_image(&mut self) {}

    /// A rendered LaTeX image: bounding box plus its LaTeX source.
    fn add_tex_image(&mut self, left: f64, top: f64, right: f64, bottom: f64, tex: &str) {}

    /// The decoded payload of the current LaTeX image.
    fn set_tex_image_data(&mut self, data: Vec<u8>) {}

    /// The attachment path of the current LaTeX image.
    fn set_tex_image_attachment(&mut self, path: &str) {}

    /// Closes the current LaTeX image.
    fn finalize_tex_image(&mut self) {}

    /// A document-level audio attachment.
    fn add_audio_attachment(&mut self, path: &str) {}

    /// Closes the current page.
    fn finalize_page(&mut self) {}

    /// The root element was closed; the document is complete. Trailing
    /// content after this point is warned about and discarded.
    fn finalize_document(&mut self) {}

    /// Whether [`finalize_document`] has been seen. Embedders query this
    /// after `parse` returns to tell a cleanly closed document from one
    /// that merely stopped.
    ///
    /// [`finalize_document`]: Self::finalize_document
    fn is_parsing_complete(&self) -> bool {
        false
    }
}
