//! Contains the pull-style XML tokeniser, [`Reader`].

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::str::from_utf8;

use memchr::{memchr, memchr2};

use crate::errors::{Result, SyntaxError};
use crate::escape::{parse_character_reference, resolve_predefined_entity};
use crate::nodes::attributes::{Attribute, Attributes};
use crate::nodes::{Closing, Node, Opening, Text};

/// Size of the buffer a fresh reader allocates. The buffer doubles
/// whenever a single node outgrows it.
const INITIAL_BUFFER_SIZE: usize = 1024;

/// A function to check whether the byte is a whitespace (blank, new line,
/// carriage return or tab).
#[inline]
pub(crate) const fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\r' | b'\n' | b'\t')
}

/// The tokeniser's accepted name class. Deliberately narrower than the
/// XML spec; `.xopp` tag and attribute names never leave ASCII.
#[inline]
const fn is_name_byte(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b':' | b'_' | b'-')
}

/// A byte range inside the reader's buffer.
///
/// Spans are offsets, not pointers: when [`refill`] moves the buffered
/// bytes left, every recorded span is rebased by the same delta and
/// nothing can dangle. Slices are materialised from spans only at the
/// moment `read_node` returns.
///
/// [`refill`]: Reader::refill
#[derive(Clone, Copy, Debug, Default)]
struct Span {
    start: usize,
    end: usize,
}

/// The offsets of the node currently being tokenised. This is the
/// outstanding-slice registry: everything in here survives buffer moves
/// via [`shift`](Self::shift).
#[derive(Debug, Default)]
struct NodeSpans {
    /// Result of the most recent name or content scan.
    scratch: Span,
    /// The element name.
    name: Span,
    /// The name of the attribute whose value is being scanned.
    attr_name: Span,
    /// Start of the value or text content being scanned.
    value_start: usize,
    /// Completed `(name, value)` attribute pairs.
    attrs: Vec<(Span, Span)>,
}

impl NodeSpans {
    fn clear(&mut self) {
        self.scratch = Span::default();
        self.name = Span::default();
        self.attr_name = Span::default();
        self.value_start = 0;
        self.attrs.clear();
    }

    /// Rebases every recorded offset after the buffer content moved
    /// `delta` bytes towards the origin. Spans of an already-returned
    /// node may underflow; they are dead and saturate harmlessly.
    fn shift(&mut self, delta: usize) {
        let shift_span = |s: &mut Span| {
            s.start = s.start.saturating_sub(delta);
            s.end = s.end.saturating_sub(delta);
        };
        shift_span(&mut self.scratch);
        shift_span(&mut self.name);
        shift_span(&mut self.attr_name);
        self.value_start = self.value_start.saturating_sub(delta);
        for (name, value) in &mut self.attrs {
            shift_span(name);
            shift_span(value);
        }
    }
}

/// A streaming XML tokeniser for `.xopp` documents.
///
/// The reader owns a single growable byte buffer which it refills from
/// the wrapped byte source. [`read_node`] hands out [`Node`]s whose
/// string slices point straight into that buffer; the borrow ends at the
/// next `read_node` call, after which the buffer may shift, grow or be
/// overwritten. Character references (`&amp;`, `&#x4e2d;`, …) are
/// expanded *in place* while the content is scanned, so the returned
/// slices never need a second unescaping pass and nothing is copied out.
///
/// Whitespace-only text between elements is discarded. Comments, CDATA
/// sections, processing instructions and the XML prolog are skipped.
///
/// The wrapped source is dropped (closed) with the reader.
///
/// ```
/// use xopp_parser::nodes::Node;
/// use xopp_parser::reader::Reader;
///
/// let mut reader = Reader::from_str(r#"<page width="100"><layer/></page>"#);
/// match reader.read_node().unwrap() {
///     Node::Opening(tag) => {
///         assert_eq!(tag.name(), "page");
///         assert_eq!(tag.attributes().get("width"), Some("100"));
///     }
///     _ => panic!("expected an opening tag"),
/// }
/// ```
///
/// [`read_node`]: Self::read_node
pub struct Reader<R> {
    source: R,
    /// The buffer. Valid bytes live in `[0, data_end)`; `len()` is the
    /// allocated capacity.
    buf: Vec<u8>,
    /// Start of the bytes still referenced by the node being built.
    /// Everything before it may be discarded by the next refill.
    data_start: usize,
    /// The read cursor.
    pos: usize,
    /// One past the last valid byte.
    data_end: usize,
    /// Cleared once the source reports EOF.
    has_more_data: bool,
    /// Whether the previous significant node was a non-empty opening
    /// tag, i.e. whether bare text is element content rather than junk.
    last_was_opening: bool,
    /// How many bytes the committed part of the current content scan
    /// lags behind `pos`, accumulated by in-place reference expansion.
    reading_offset: usize,
    /// Cursor position where the deferred left-shift of pending bytes
    /// begins; bytes in `[first_offset, pos)` have not been moved yet.
    first_offset: usize,
    spans: NodeSpans,
}

impl<'a> Reader<&'a [u8]> {
    /// Creates a reader over an in-memory document.
    pub fn from_str(s: &'a str) -> Self {
        Self::from_reader(s.as_bytes())
    }
}

impl Reader<BufReader<File>> {
    /// Creates a reader over an (already decompressed) file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::from_reader(BufReader::new(File::open(path)?)))
    }
}

impl<R: Read> Reader<R> {
    /// Creates a reader over any byte source. The source is read in
    /// buffer-sized chunks and dropped together with the reader.
    pub fn from_reader(source: R) -> Self {
        Self {
            source,
            buf: vec![0; INITIAL_BUFFER_SIZE],
            data_start: 0,
            pos: 0,
            data_end: 0,
            has_more_data: true,
            last_was_opening: false,
            reading_offset: 0,
            first_offset: 0,
            spans: NodeSpans::default(),
        }
    }

    /// Consumes the reader, returning the wrapped byte source.
    pub fn into_inner(self) -> R {
        self.source
    }

    /// Returns the next significant node.
    ///
    /// The slices inside the returned node stay valid until `read_node`
    /// is called again. Returns [`Node::End`] on a clean EOF between
    /// nodes; EOF in the middle of a token is a [`SyntaxError`].
    pub fn read_node(&mut self) -> Result<Node<'_>> {
        self.spans.clear();
        self.reading_offset = 0;
        loop {
            self.skip_insignificant()?;
            let b = match self.peek()? {
                Some(b) => b,
                None => return Ok(Node::End),
            };
            if b != b'<' {
                if self.last_was_opening {
                    return self.read_text();
                }
                return Err(SyntaxError::UnexpectedByte(b).into());
            }
            self.advance();
            match self.peek()? {
                Some(b'/') => {
                    self.advance();
                    return self.read_closing();
                }
                Some(b'?') => self.discard_until_gt(SyntaxError::UnclosedTag)?,
                Some(b'!') => {
                    self.advance();
                    self.discard_bang()?;
                }
                Some(b) if is_name_byte(b) => return self.read_opening(),
                Some(b) => return Err(SyntaxError::UnexpectedByte(b).into()),
                None => return Err(SyntaxError::UnexpectedEof("tag").into()),
            }
        }
    }

    /// `pos` is on the first byte of the name; `<` has been consumed.
    fn read_opening(&mut self) -> Result<Node<'_>> {
        self.scan_name()?;
        self.spans.name = self.spans.scratch;
        let mut empty = false;
        loop {
            self.skip_in_tag("element tag")?;
            match self.require("element tag")? {
                b'>' => {
                    self.advance();
                    break;
                }
                b'/' => {
                    self.advance();
                    if self.require("element tag")? != b'>' {
                        return Err(SyntaxError::UnclosedTag.into());
                    }
                    self.advance();
                    empty = true;
                    break;
                }
                b if is_name_byte(b) => self.read_attribute()?,
                b => return Err(SyntaxError::UnexpectedByte(b).into()),
            }
        }
        if !empty {
            // after an empty element the enclosing content mode persists
            self.last_was_opening = true;
        }

        let name = self.str_at(self.spans.name)?;
        let mut pairs = Vec::with_capacity(self.spans.attrs.len());
        for &(name, value) in &self.spans.attrs {
            pairs.push(Attribute {
                name: self.str_at(name)?,
                value: self.str_at(value)?,
            });
        }
        Ok(Node::Opening(Opening::new(
            name,
            empty,
            Attributes::new(pairs),
        )))
    }

    /// One `name="value"` pair; `pos` is on the first byte of the name.
    fn read_attribute(&mut self) -> Result<()> {
        self.scan_name()?;
        self.spans.attr_name = self.spans.scratch;
        self.skip_in_tag("attribute")?;
        if self.require("attribute")? != b'=' {
            return Err(SyntaxError::MissingEquals.into());
        }
        self.advance();
        self.skip_in_tag("attribute")?;
        let quote = self.require("attribute value")?;
        if quote != b'"' && quote != b'\'' {
            return Err(SyntaxError::UnquotedValue.into());
        }
        self.advance();
        self.scan_content(quote, "attribute value")?;
        self.advance(); // closing quote
        self.spans.attrs.push((self.spans.attr_name, self.spans.scratch));
        Ok(())
    }

    /// `</` has been consumed.
    fn read_closing(&mut self) -> Result<Node<'_>> {
        self.scan_name()?;
        if self.spans.scratch.start == self.spans.scratch.end {
            return match self.peek()? {
                Some(b) => Err(SyntaxError::UnexpectedByte(b).into()),
                None => Err(SyntaxError::UnexpectedEof("closing tag").into()),
            };
        }
        if self.require("closing tag")? != b'>' {
            return Err(SyntaxError::UnclosedTag.into());
        }
        self.advance();
        self.last_was_opening = false;
        let name = self.str_at(self.spans.scratch)?;
        Ok(Node::Closing(Closing::new(name)))
    }

    /// Element content up to the next `<`, which is left unconsumed.
    fn read_text(&mut self) -> Result<Node<'_>> {
        self.scan_content(b'<', "text")?;
        let content = self.str_at(self.spans.scratch)?;
        Ok(Node::Text(Text::new(content)))
    }

    /// Skips a comment, CDATA section or other `<!…>` construct; the
    /// leading `<!` has been consumed. Does not touch `last_was_opening`,
    /// so a comment inside element content does not eat the text that
    /// follows it.
    fn discard_bang(&mut self) -> Result<()> {
        match self.peek()? {
            Some(b'-') => {
                self.advance();
                if self.require("comment")? != b'-' {
                    return Err(SyntaxError::UnclosedComment.into());
                }
                self.advance();
                self.discard_until(b"-->", SyntaxError::UnclosedComment)
            }
            // simplified CDATA: everything through the next `]>`
            Some(b'[') => self.discard_until(b"]>", SyntaxError::UnclosedCData),
            Some(_) => self.discard_until_gt(SyntaxError::UnclosedTag),
            None => Err(SyntaxError::UnexpectedEof("markup declaration").into()),
        }
    }

    /// Discards everything up to and including the next `>`.
    fn discard_until_gt(&mut self, on_eof: SyntaxError) -> Result<()> {
        loop {
            self.data_start = self.pos;
            match memchr(b'>', &self.buf[self.pos..self.data_end]) {
                Some(i) => {
                    self.pos += i + 1;
                    return Ok(());
                }
                None => {
                    self.pos = self.data_end;
                    self.data_start = self.pos;
                    if !self.refill()? {
                        return Err(on_eof.into());
                    }
                }
            }
        }
    }

    /// Discards everything up to and including the terminator sequence.
    fn discard_until(&mut self, terminator: &[u8], on_eof: SyntaxError) -> Result<()> {
        loop {
            self.data_start = self.pos;
            match memchr(terminator[0], &self.buf[self.pos..self.data_end]) {
                Some(i) => {
                    self.pos += i;
                    if self.data_end - self.pos < terminator.len() {
                        // terminator may straddle the refill boundary
                        if !self.refill()? {
                            return Err(on_eof.into());
                        }
                        continue;
                    }
                    if &self.buf[self.pos..self.pos + terminator.len()] == terminator {
                        self.pos += terminator.len();
                        return Ok(());
                    }
                    self.pos += 1;
                }
                None => {
                    self.pos = self.data_end;
                    self.data_start = self.pos;
                    if !self.refill()? {
                        return Err(on_eof.into());
                    }
                }
            }
        }
    }

    /// Scans content into `spans.scratch` until the unconsumed `stop`
    /// byte, expanding character references in place as they appear.
    ///
    /// Expansion is deferred compaction: a resolved reference writes its
    /// replacement at `pos - reading_offset` and widens the gap; bytes
    /// scanned after it stay put until the gap has to close: at the next
    /// reference, or once the terminator is reached. Unresolvable
    /// references are kept verbatim.
    fn scan_content(&mut self, stop: u8, what: &'static str) -> Result<()> {
        debug_assert_eq!(self.reading_offset, 0);
        self.spans.value_start = self.pos;
        self.first_offset = self.pos;
        loop {
            match memchr2(stop, b'&', &self.buf[self.pos..self.data_end]) {
                Some(i) => {
                    self.pos += i;
                    if self.buf[self.pos] == stop {
                        self.compact();
                        self.spans.scratch = Span {
                            start: self.spans.value_start,
                            end: self.pos - self.reading_offset,
                        };
                        self.reading_offset = 0;
                        return Ok(());
                    }
                    self.expand_reference()?;
                }
                None => {
                    self.pos = self.data_end;
                    if !self.refill()? {
                        return Err(SyntaxError::UnexpectedEof(what).into());
                    }
                }
            }
        }
    }

    /// Collapses the pending gap: moves `[first_offset, pos)` left by
    /// `reading_offset` so the committed content is contiguous again.
    fn compact(&mut self) {
        if self.reading_offset > 0 && self.first_offset < self.pos {
            self.buf.copy_within(
                self.first_offset..self.pos,
                self.first_offset - self.reading_offset,
            );
        }
        self.first_offset = self.pos;
    }

    /// `pos` is on a `&`. Reads through the closing `;` and replaces the
    /// reference in place, or leaves it verbatim when it resolves to
    /// nothing. `first_offset` doubles as the stable position of the `&`
    /// across refills.
    fn expand_reference(&mut self) -> Result<()> {
        self.compact();
        self.advance();
        loop {
            match self.peek()? {
                None => return Err(SyntaxError::UnexpectedEof("character reference").into()),
                Some(b';') => break,
                // a reference cannot span these; keep the prefix verbatim
                Some(b'<') | Some(b'&') => return Ok(()),
                Some(_) => self.advance(),
            }
        }
        let amp = self.first_offset;
        let semi = self.pos;
        let target = amp - self.reading_offset;

        let replacement: Option<([u8; 4], usize)> = {
            let entity = &self.buf[amp + 1..semi];
            if let Some(b) = resolve_predefined_entity(entity) {
                Some(([b, 0, 0, 0], 1))
            } else if let Some(payload) = entity.strip_prefix(b"#") {
                parse_character_reference(payload).map(|ch| {
                    let mut utf8 = [0u8; 4];
                    let len = ch.encode_utf8(&mut utf8).len();
                    (utf8, len)
                })
            } else {
                None
            }
        };

        self.pos = semi + 1;
        match replacement {
            Some((bytes, len)) => {
                // the replacement is never longer than the reference, so
                // this writes over bytes that were already consumed
                self.buf[target..target + len].copy_from_slice(&bytes[..len]);
                self.reading_offset += (semi - amp + 1) - len;
                self.first_offset = self.pos;
            }
            // verbatim: the pending region keeps the whole `&…;`
            None => {}
        }
        Ok(())
    }

    /// Scans a (possibly empty) run of name-class bytes into
    /// `spans.scratch`.
    fn scan_name(&mut self) -> Result<()> {
        self.spans.scratch = Span {
            start: self.pos,
            end: self.pos,
        };
        while let Some(b) = self.peek()? {
            if !is_name_byte(b) {
                break;
            }
            self.advance();
        }
        self.spans.scratch.end = self.pos;
        Ok(())
    }

    /// Skips whitespace between nodes. The skipped bytes carry no
    /// outstanding spans and are released to the next refill.
    fn skip_insignificant(&mut self) -> Result<()> {
        loop {
            while self.pos < self.data_end && is_whitespace(self.buf[self.pos]) {
                self.pos += 1;
            }
            self.data_start = self.pos;
            if self.pos < self.data_end || !self.refill()? {
                return Ok(());
            }
        }
    }

    /// Skips whitespace inside a tag, where earlier spans of the node
    /// must be kept. EOF here is always mid-token.
    fn skip_in_tag(&mut self, what: &'static str) -> Result<()> {
        loop {
            match self.peek()? {
                Some(b) if is_whitespace(b) => self.advance(),
                Some(_) => return Ok(()),
                None => return Err(SyntaxError::UnexpectedEof(what).into()),
            }
        }
    }

    /// Like [`peek`](Self::peek), but EOF is a syntax error.
    fn require(&mut self, what: &'static str) -> Result<u8> {
        self.peek()?
            .ok_or_else(|| SyntaxError::UnexpectedEof(what).into())
    }

    fn peek(&mut self) -> Result<Option<u8>> {
        while self.pos == self.data_end {
            if !self.refill()? {
                return Ok(None);
            }
        }
        Ok(Some(self.buf[self.pos]))
    }

    #[inline]
    fn advance(&mut self) {
        self.pos += 1;
    }

    /// Reads more bytes from the source, making room first: when nothing
    /// is outstanding the window rewinds to the origin; otherwise the
    /// kept bytes are moved to the origin and every outstanding offset is
    /// rebased; a full buffer with nothing to move doubles. Returns
    /// `false` once the source is exhausted.
    fn refill(&mut self) -> Result<bool> {
        if !self.has_more_data {
            return Ok(false);
        }
        if self.data_start == self.data_end {
            self.data_start = 0;
            self.pos = 0;
            self.data_end = 0;
            self.first_offset = 0;
        } else if self.data_start > 0 {
            let delta = self.data_start;
            self.buf.copy_within(self.data_start..self.data_end, 0);
            self.data_start = 0;
            self.pos -= delta;
            self.data_end -= delta;
            self.first_offset = self.first_offset.saturating_sub(delta);
            self.spans.shift(delta);
        } else if self.data_end == self.buf.len() {
            let grown = self.buf.len() * 2;
            self.buf.resize(grown, 0);
        }
        loop {
            match self.source.read(&mut self.buf[self.data_end..]) {
                Ok(0) => {
                    self.has_more_data = false;
                    return Ok(false);
                }
                Ok(n) => {
                    self.data_end += n;
                    return Ok(true);
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn str_at(&self, span: Span) -> Result<&str> {
        Ok(from_utf8(&self.buf[span.start..span.end])?)
    }
}
