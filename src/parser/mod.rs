//! The document parser: drives a [`DocumentBuilder`] from the node
//! stream of a [`Reader`].
//!
//! The grammar is recognised with an explicit open-tag stack; the set of
//! tags accepted at any point is decided by the innermost open tag, and
//! a closing tag must match the kind it pops. Content problems (unknown
//! tags, unparseable attributes, stray text) are logged through the
//! [`log`] facade and parsing continues; structural problems are fatal.
//!
//! [`Reader`]: crate::reader::Reader
//! [`DocumentBuilder`]: crate::builder::DocumentBuilder

use std::io::Read;

use log::{debug, warn};

use crate::builder::DocumentBuilder;
use crate::errors::{IllFormedError, Result};
use crate::nodes::attributes::Attributes;
use crate::nodes::{Closing, Node, Opening, Text};
use crate::reader::Reader;
use crate::value::{
    decode_base64, parse_points, parse_width_list, BackgroundDomain, CapStyle, Color, LineStyle,
    PageType, PageTypeFormat, StrokeTool,
};

/// The closed set of tags the `.xopp` grammar knows about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagKind {
    /// `<xournal>`, the Xournal / Xournal++ root.
    Xournal,
    /// `<MrWriter>`, the MrWriter root.
    MrWriter,
    /// `<title>`, body ignored.
    Title,
    /// `<preview>`, body ignored.
    Preview,
    /// `<page>`.
    Page,
    /// `<audio>`, a document-level audio attachment.
    Audio,
    /// `<background>`.
    Background,
    /// `<layer>`.
    Layer,
    /// `<timestamp>`, audio attribution for the following element.
    Timestamp,
    /// `<stroke>`.
    Stroke,
    /// `<text>`.
    Text,
    /// `<image>`.
    Image,
    /// `<teximage>`, a rendered LaTeX snippet.
    TexImage,
    /// `<attachment>` inside an image or LaTeX image.
    Attachment,
    /// Anything else.
    Unknown,
}

impl TagKind {
    fn from_name(name: &str) -> Self {
        match name {
            "xournal" => Self::Xournal,
            "MrWriter" => Self::MrWriter,
            "title" => Self::Title,
            "preview" => Self::Preview,
            "page" => Self::Page,
            "audio" => Self::Audio,
            "background" => Self::Background,
            "layer" => Self::Layer,
            "timestamp" => Self::Timestamp,
            "stroke" => Self::Stroke,
            "text" => Self::Text,
            "image" => Self::Image,
            "teximage" => Self::TexImage,
            "attachment" => Self::Attachment,
            _ => Self::Unknown,
        }
    }

    /// The canonical tag name, for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Xournal => "xournal",
            Self::MrWriter => "MrWriter",
            Self::Title => "title",
            Self::Preview => "preview",
            Self::Page => "page",
            Self::Audio => "audio",
            Self::Background => "background",
            Self::Layer => "layer",
            Self::Timestamp => "timestamp",
            Self::Stroke => "stroke",
            Self::Text => "text",
            Self::Image => "image",
            Self::TexImage => "teximage",
            Self::Attachment => "attachment",
            Self::Unknown => "unknown",
        }
    }
}

/// The grammar level the next opening tag is matched against, derived
/// from the innermost open tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    /// Before the root element.
    Root,
    /// Inside the root: pages, title, preview, audio.
    Document,
    /// Inside a page: background and layers.
    Page,
    /// Inside a layer: timestamps, strokes, texts, images.
    Layer,
    /// Inside a stroke / text / image / teximage; the payload parent.
    Content(TagKind),
    /// Inside a tag whose children are of no interest.
    Ignored,
}

/// Parses one `.xopp` document from a [`Reader`], issuing typed events
/// to a [`DocumentBuilder`].
///
/// ```no_run
/// use xopp_parser::builder::DocumentBuilder;
/// use xopp_parser::parser::XoppParser;
/// use xopp_parser::reader::Reader;
///
/// struct Counter(usize);
/// impl DocumentBuilder for Counter {
///     fn add_page(&mut self, _width: f64, _height: f64) {
///         self.0 += 1;
///     }
/// }
///
/// let reader = Reader::from_file("notes.xml")?;
/// let mut counter = Counter(0);
/// XoppParser::new(reader, &mut counter).parse()?;
/// println!("{} pages", counter.0);
/// # Ok::<(), xopp_parser::errors::Error>(())
/// ```
pub struct XoppParser<'b, R, B> {
    reader: Reader<R>,
    state: ParserState<'b, B>,
}

/// One entry of the open-element stack. `live` records whether the
/// grammar accepted the element; inside a skipped subtree tags are
/// tracked only so that closing tags still have to balance, and a
/// recognised tag nested in one must not start emitting events again.
#[derive(Clone, Copy, Debug)]
struct OpenTag {
    kind: TagKind,
    live: bool,
}

/// Everything but the reader, so node borrows and event dispatch can
/// coexist.
struct ParserState<'b, B> {
    builder: &'b mut B,
    /// The open-element stack.
    hierarchy: Vec<OpenTag>,
    /// Set once the first PDF background with a filename has been
    /// loaded; later PDF backgrounds only select pages.
    pdf_loaded: bool,
    /// Audio filename buffered by a preceding `<timestamp>`.
    temp_filename: String,
    /// Audio timestamp buffered by a preceding `<timestamp>`.
    temp_timestamp: u64,
    /// Pressures from the stroke's `width` (or `pressures`) attribute,
    /// shipped together with the coordinates of its text payload.
    pressure_buffer: Vec<f64>,
    /// The root element has been closed.
    complete: bool,
    trailing_warned: bool,
}

impl<'b, R: Read, B: DocumentBuilder> XoppParser<'b, R, B> {
    /// Creates a parser for a single document.
    pub fn new(reader: Reader<R>, builder: &'b mut B) -> Self {
        Self {
            reader,
            state: ParserState {
                builder,
                hierarchy: Vec::new(),
                pdf_loaded: false,
                temp_filename: String::new(),
                temp_timestamp: 0,
                pressure_buffer: Vec::new(),
                complete: false,
                trailing_warned: false,
            },
        }
    }

    /// Runs the parse to the end of the stream.
    ///
    /// Returns `Ok(())` when the document was parsed; content-level
    /// problems have then been logged as warnings. Structural problems,
    /// mismatched or unmatched closing tags, a truncated document, junk
    /// outside the markup, abort with an error.
    pub fn parse(mut self) -> Result<()> {
        loop {
            match self.reader.read_node()? {
                Node::Opening(tag) => self.state.handle_opening(&tag)?,
                Node::Closing(tag) => self.state.handle_closing(&tag)?,
                Node::Text(text) => self.state.handle_text(&text),
                Node::End => return self.state.handle_end(),
            }
        }
    }
}

impl<'b, B: DocumentBuilder> ParserState<'b, B> {
    fn mode(&self) -> Mode {
        match self.hierarchy.last() {
            None => Mode::Root,
            // inside a skipped subtree everything stays skipped
            Some(top) if !top.live => Mode::Ignored,
            Some(top) => match top.kind {
                // a live Unknown is an unknown root, which is given the
                // benefit of the doubt and parsed as a document
                TagKind::Xournal | TagKind::MrWriter | TagKind::Unknown => Mode::Document,
                TagKind::Page => Mode::Page,
                TagKind::Layer => Mode::Layer,
                kind @ (TagKind::Stroke | TagKind::Text | TagKind::Image | TagKind::TexImage) => {
                    Mode::Content(kind)
                }
                _ => Mode::Ignored,
            },
        }
    }

    fn handle_opening(&mut self, tag: &Opening) -> Result<()> {
        if self.complete {
            self.warn_trailing();
            return Ok(());
        }
        let kind = TagKind::from_name(tag.name());
        match self.mode() {
            Mode::Root => self.open_root(kind, tag),
            Mode::Document => {
                self.open_in_document(kind, tag);
                Ok(())
            }
            Mode::Page => {
                self.open_in_page(kind, tag);
                Ok(())
            }
            Mode::Layer => {
                self.open_in_layer(kind, tag);
                Ok(())
            }
            Mode::Content(parent) => {
                self.open_in_content(parent, kind, tag);
                Ok(())
            }
            Mode::Ignored => {
                self.ignore_unless_empty(kind, tag);
                Ok(())
            }
        }
    }

    fn open_root(&mut self, kind: TagKind, tag: &Opening) -> Result<()> {
        if tag.is_empty() {
            // a document cannot consist of an empty root element
            return Err(IllFormedError::EmptyRootElement(tag.name().to_string()).into());
        }
        let attrs = tag.attributes();
        match kind {
            TagKind::Xournal => {
                let creator = attrs.get("creator").unwrap_or("Unknown");
                let fileversion = attrs.get_parsed::<u32>("fileversion").unwrap_or(1);
                if let Some(version) = attrs.get("version") {
                    debug!("document written by version {}", version);
                }
                self.builder.add_xournal(creator, fileversion);
                self.push(TagKind::Xournal);
            }
            TagKind::MrWriter => {
                let creator = attrs.get("creator").unwrap_or("MrWriter");
                self.builder.add_mrwriter(creator);
                self.push(TagKind::MrWriter);
            }
            _ => {
                warn!("unknown root element <{}>, parsing anyway", tag.name());
                self.push(TagKind::Unknown);
            }
        }
        Ok(())
    }

    fn open_in_document(&mut self, kind: TagKind, tag: &Opening) {
        let attrs = tag.attributes();
        match kind {
            TagKind::Title | TagKind::Preview => self.push_unless_empty(kind, tag),
            TagKind::Page => {
                let width = attrs.get_parsed_or("width", 0.0);
                let height = attrs.get_parsed_or("height", 0.0);
                self.builder.add_page(width, height);
                if tag.is_empty() {
                    // a page without layers is unusual but not worth a warning
                    self.builder.finalize_page();
                } else {
                    self.push(TagKind::Page);
                }
            }
            TagKind::Audio => {
                match attrs.get("fn") {
                    Some(filename) => self.builder.add_audio_attachment(filename),
                    None => warn!("<audio> attachment without a filename"),
                }
                self.push_unless_empty(TagKind::Audio, tag);
            }
            _ => {
                warn!("unknown element <{}> in document", tag.name());
                self.ignore_unless_empty(kind, tag);
            }
        }
    }

    fn open_in_page(&mut self, kind: TagKind, tag: &Opening) {
        match kind {
            TagKind::Background => {
                self.background(tag.attributes());
                self.push_unless_empty(TagKind::Background, tag);
            }
            TagKind::Layer => {
                self.builder.add_layer(tag.attributes().get("name"));
                if tag.is_empty() {
                    self.builder.finalize_layer();
                } else {
                    self.push(TagKind::Layer);
                }
            }
            _ => {
                warn!("unknown element <{}> in page", tag.name());
                self.ignore_unless_empty(kind, tag);
            }
        }
    }

    fn background(&mut self, attrs: &Attributes) {
        if let Some(name) = attrs.get("name") {
            self.builder.set_bg_name(name);
        }
        match attrs.get("type") {
            Some("solid") => {
                let color = attrs.get_color_or("color", Color::WHITE, true);
                let format = attrs.get_parsed_or("style", PageTypeFormat::Plain);
                let config = attrs.get("config").unwrap_or("").to_string();
                self.builder.set_bg_solid(PageType { format, config }, color);
            }
            Some("pixmap") => {
                let domain = attrs.get_parsed_or("domain", BackgroundDomain::Absolute);
                match domain {
                    BackgroundDomain::Clone => {
                        // for clones the filename attribute holds a page number
                        let page_nr = attrs.get_parsed_or::<usize>("filename", 0);
                        self.builder.set_bg_pixmap_cloned(page_nr);
                    }
                    _ => match attrs.get("filename") {
                        Some(path) => self
                            .builder
                            .set_bg_pixmap(domain == BackgroundDomain::Attach, path),
                        None => warn!("pixmap background without a filename"),
                    },
                }
            }
            Some("pdf") => {
                let mut domain = attrs.get_parsed_or("domain", BackgroundDomain::Absolute);
                if domain == BackgroundDomain::Clone {
                    // clone makes no sense for PDF pages
                    domain = BackgroundDomain::Absolute;
                }
                if !self.pdf_loaded {
                    match attrs.get("filename") {
                        Some(path) if !path.is_empty() => {
                            self.builder
                                .load_bg_pdf(domain == BackgroundDomain::Attach, path);
                            self.pdf_loaded = true;
                        }
                        _ => warn!("first pdf background carries no filename"),
                    }
                }
                // pageno is 1-based in the file
                let pageno = attrs.get_parsed_or::<usize>("pageno", 1);
                self.builder.set_bg_pdf(pageno.saturating_sub(1));
            }
            Some(other) => warn!("unknown background type {:?}", other),
            None => warn!("background without a type"),
        }
    }

    fn open_in_layer(&mut self, kind: TagKind, tag: &Opening) {
        let attrs = tag.attributes();
        match kind {
            TagKind::Timestamp => {
                self.temp_filename = attrs.get("fn").unwrap_or("").to_string();
                self.temp_timestamp = attrs.get_parsed::<u64>("ts").unwrap_or(0);
                self.push_unless_empty(TagKind::Timestamp, tag);
            }
            TagKind::Stroke => self.open_stroke(tag),
            TagKind::Text => {
                let (audio_fn, audio_ts) = self.audio_attribution(attrs);
                let font = match attrs.get("font") {
                    Some(font) => font,
                    None => {
                        warn!("text without a font, using default");
                        "Sans"
                    }
                };
                let size = attrs.get_parsed_or("size", 12.0);
                let x = attrs.get_parsed_or("x", 0.0);
                let y = attrs.get_parsed_or("y", 0.0);
                let color = attrs.get_color_or("color", Color::BLACK, false);
                self.builder
                    .add_text(font, size, x, y, color, &audio_fn, audio_ts);
                if tag.is_empty() {
                    warn!("empty text element");
                    self.builder.finalize_text();
                } else {
                    self.push(TagKind::Text);
                }
            }
            TagKind::Image => {
                let (left, top, right, bottom) = Self::bounding_box(attrs);
                self.builder.add_image(left, top, right, bottom);
                if tag.is_empty() {
                    warn!("empty image element");
                    self.builder.finalize_image();
                } else {
                    self.push(TagKind::Image);
                }
            }
            TagKind::TexImage => {
                let (left, top, right, bottom) = Self::bounding_box(attrs);
                // `texlength` was written by old versions; the payload
                // carries its own length
                let tex = attrs.get("text").unwrap_or("");
                self.builder.add_tex_image(left, top, right, bottom, tex);
                if tag.is_empty() {
                    warn!("empty teximage element");
                    self.builder.finalize_tex_image();
                } else {
                    self.push(TagKind::TexImage);
                }
            }
            _ => {
                warn!("unknown element <{}> in layer", tag.name());
                self.ignore_unless_empty(kind, tag);
            }
        }
    }

    fn open_stroke(&mut self, tag: &Opening) {
        let attrs = tag.attributes();
        let (audio_fn, audio_ts) = self.audio_attribution(attrs);
        let tool = attrs.get_parsed_or("tool", StrokeTool::Pen);
        let color = attrs.get_color_or("color", Color::BLACK, false);

        // the head of the width list is the nominal width, the tail the
        // pressure of each segment
        let width = match attrs.get("width").and_then(parse_width_list) {
            Some((width, pressures)) => {
                self.pressure_buffer = pressures;
                width
            }
            None => {
                warn!("stroke without a usable width, using default");
                self.pressure_buffer.clear();
                1.0
            }
        };
        if let Some(list) = attrs.get("pressures") {
            // MrWriter writes pressures as their own attribute
            self.pressure_buffer = list
                .split_ascii_whitespace()
                .map_while(|word| word.parse().ok())
                .collect();
        }

        let fill = attrs.get_parsed::<i32>("fill").unwrap_or(-1);
        let cap_style = attrs.get_parsed::<CapStyle>("capStyle").unwrap_or_default();
        let line_style = attrs.get_parsed::<LineStyle>("style");
        self.builder.add_stroke(
            tool, color, width, fill, cap_style, line_style, &audio_fn, audio_ts,
        );
        if tag.is_empty() {
            warn!("empty stroke element");
            self.pressure_buffer.clear();
            self.builder.finalize_stroke();
        } else {
            self.push(TagKind::Stroke);
        }
    }

    fn open_in_content(&mut self, parent: TagKind, kind: TagKind, tag: &Opening) {
        match kind {
            TagKind::Attachment
                if parent == TagKind::Image || parent == TagKind::TexImage =>
            {
                match tag.attributes().get("path") {
                    Some(path) if parent == TagKind::TexImage => {
                        self.builder.set_tex_image_attachment(path)
                    }
                    Some(path) => self.builder.set_image_attachment(path),
                    None => warn!("attachment without a path"),
                }
                self.push_unless_empty(TagKind::Attachment, tag);
            }
            _ => {
                warn!("unknown element <{}> in <{}>", tag.name(), parent.name());
                self.ignore_unless_empty(kind, tag);
            }
        }
    }

    /// An audio reference for a stroke or text element: its own `fn` /
    /// `ts` attributes when present, otherwise whatever a preceding
    /// `<timestamp>` buffered. The buffer is consumed either way.
    fn audio_attribution(&mut self, attrs: &Attributes) -> (String, u64) {
        let own = attrs.get("fn").unwrap_or("");
        if !own.is_empty() {
            if !self.temp_filename.is_empty() {
                warn!("dropping buffered audio timestamp; element has its own");
                self.temp_filename.clear();
                self.temp_timestamp = 0;
            }
            let ts = attrs.get_parsed::<u64>("ts").unwrap_or(0);
            (own.to_string(), ts)
        } else {
            let filename = std::mem::take(&mut self.temp_filename);
            let ts = std::mem::replace(&mut self.temp_timestamp, 0);
            (filename, ts)
        }
    }

    fn bounding_box(attrs: &Attributes) -> (f64, f64, f64, f64) {
        (
            attrs.get_parsed_or("left", 0.0),
            attrs.get_parsed_or("top", 0.0),
            attrs.get_parsed_or("right", 0.0),
            attrs.get_parsed_or("bottom", 0.0),
        )
    }

    fn push(&mut self, kind: TagKind) {
        self.hierarchy.push(OpenTag { kind, live: true });
    }

    fn push_unless_empty(&mut self, kind: TagKind, tag: &Opening) {
        if !tag.is_empty() {
            self.push(kind);
        }
    }

    /// Tracks a tag the grammar does not accept here. Its subtree emits
    /// no events, but closing tags still have to balance, so the entry
    /// keeps the element's real kind.
    fn ignore_unless_empty(&mut self, kind: TagKind, tag: &Opening) {
        if !tag.is_empty() {
            self.hierarchy.push(OpenTag { kind, live: false });
        }
    }

    fn handle_closing(&mut self, tag: &Closing) -> Result<()> {
        if self.complete {
            self.warn_trailing();
            return Ok(());
        }
        let kind = TagKind::from_name(tag.name());
        let top = match self.hierarchy.pop() {
            Some(top) => top,
            None => return Err(IllFormedError::UnmatchedEndTag(tag.name().to_string()).into()),
        };
        if top.kind != kind {
            return Err(IllFormedError::MismatchedEndTag {
                expected: top.kind.name().to_string(),
                found: tag.name().to_string(),
            }
            .into());
        }
        if top.live {
            match top.kind {
                TagKind::Page => self.builder.finalize_page(),
                TagKind::Layer => self.builder.finalize_layer(),
                TagKind::Stroke => {
                    self.pressure_buffer.clear();
                    self.builder.finalize_stroke();
                }
                TagKind::Text => self.builder.finalize_text(),
                TagKind::Image => self.builder.finalize_image(),
                TagKind::TexImage => self.builder.finalize_tex_image(),
                _ => (),
            }
        }
        if self.hierarchy.is_empty() {
            // the root closed; keep reading so trailing junk is surfaced
            self.builder.finalize_document();
            self.complete = true;
        }
        Ok(())
    }

    fn handle_text(&mut self, text: &Text) {
        if self.complete {
            self.warn_trailing();
            return;
        }
        let top = match self.hierarchy.last() {
            Some(top) => top,
            None => {
                warn!("stray text outside the document element");
                return;
            }
        };
        if !top.live {
            // inside a skipped subtree, already warned at its opening tag
            return;
        }
        match top.kind {
            TagKind::Stroke => {
                let points = parse_points(text.content());
                self.builder.set_stroke_points(&points, &self.pressure_buffer);
            }
            TagKind::Text => self.builder.set_text_contents(text.content()),
            TagKind::Image => match decode_base64(text.content()) {
                Ok(data) => self.builder.set_image_data(data),
                Err(e) => warn!("image payload is not valid base64: {}", e),
            },
            TagKind::TexImage => match decode_base64(text.content()) {
                Ok(data) => self.builder.set_tex_image_data(data),
                Err(e) => warn!("teximage payload is not valid base64: {}", e),
            },
            // title and preview bodies are deliberately skipped
            TagKind::Title
            | TagKind::Preview
            | TagKind::Unknown
            | TagKind::Timestamp
            | TagKind::Audio
            | TagKind::Background
            | TagKind::Attachment => (),
            kind => warn!("stray text in <{}>", kind.name()),
        }
    }

    fn handle_end(&mut self) -> Result<()> {
        if let Some(top) = self.hierarchy.last() {
            return Err(IllFormedError::UnclosedDocument(top.kind.name().to_string()).into());
        }
        if !self.complete {
            return Err(IllFormedError::MissingRootElement.into());
        }
        Ok(())
    }

    fn warn_trailing(&mut self) {
        if !self.trailing_warned {
            warn!("content after the document element, ignoring the rest");
            self.trailing_warned = true;
        }
    }
}
