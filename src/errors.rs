//! Error management module

use std::fmt;
use std::io;
use std::str::Utf8Error;

/// An error returned when the XML stream cannot be tokenised further.
///
/// These correspond to the grammar of the hand-rolled tokeniser: anything
/// the [`Reader`] cannot recover from by skipping content. Content-level
/// problems (unknown tags, unparseable attribute values) are *not* errors;
/// they are logged and parsing continues.
///
/// [`Reader`]: crate::reader::Reader
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyntaxError {
    /// A byte that cannot start a node appeared where a node was expected.
    UnexpectedByte(u8),
    /// The stream ended in the middle of a token. The payload names the
    /// construct that was being read.
    UnexpectedEof(&'static str),
    /// A comment was not closed with `-->`.
    UnclosedComment,
    /// A CDATA section was not closed (terminator `]>`, see the crate docs
    /// on the simplified CDATA handling).
    UnclosedCData,
    /// An element tag was not closed with `>`.
    UnclosedTag,
    /// An attribute name was not followed by `=`.
    MissingEquals,
    /// An attribute value did not start with `"` or `'`.
    UnquotedValue,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::UnexpectedByte(b) => {
                write!(f, "unexpected byte {:?} outside of a node", *b as char)
            }
            Self::UnexpectedEof(what) => write!(f, "unexpected EOF while reading {}", what),
            Self::UnclosedComment => f.write_str("comment not closed: `-->` not found"),
            Self::UnclosedCData => f.write_str("CDATA section not closed: `]>` not found"),
            Self::UnclosedTag => f.write_str("tag not closed: `>` not found"),
            Self::MissingEquals => f.write_str("attribute name must be followed by `=`"),
            Self::UnquotedValue => f.write_str("attribute value must start with a quote"),
        }
    }
}

/// An error returned when the XML is tokenisable but structurally invalid
/// as a document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IllFormedError {
    /// A closing tag did not match the tag that is currently open.
    /// `expected` is the open tag, `found` the closing one.
    MismatchedEndTag {
        /// Name of the currently opened tag
        expected: String,
        /// Name of the closing tag that was found instead
        found: String,
    },
    /// A closing tag appeared while no tag was open.
    UnmatchedEndTag(String),
    /// The root element was self-closing (`<xournal/>`); a document cannot
    /// be empty.
    EmptyRootElement(String),
    /// The stream ended while elements were still open. The payload is the
    /// innermost open tag.
    UnclosedDocument(String),
    /// The stream contained no root element at all.
    MissingRootElement,
}

impl fmt::Display for IllFormedError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::MismatchedEndTag { expected, found } => {
                write!(f, "expected `</{}>`, but `</{}>` was found", expected, found)
            }
            Self::UnmatchedEndTag(name) => {
                write!(f, "close tag `</{}>` does not match any open tag", name)
            }
            Self::EmptyRootElement(name) => {
                write!(f, "root element `<{}/>` is empty", name)
            }
            Self::UnclosedDocument(name) => {
                write!(f, "document ended while `<{}>` was still open", name)
            }
            Self::MissingRootElement => f.write_str("document contains no root element"),
        }
    }
}

/// The error type used by this crate.
#[derive(Debug)]
pub enum Error {
    /// An error from the underlying byte source.
    Io(io::Error),
    /// The XML could not be tokenised.
    Syntax(SyntaxError),
    /// The XML was tokenised but is not a well-formed document.
    IllFormed(IllFormedError),
    /// A slice handed out by the reader was not valid UTF-8.
    Utf8(Utf8Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::Syntax(e) => write!(f, "syntax error: {}", e),
            Self::IllFormed(e) => write!(f, "ill-formed document: {}", e),
            Self::Utf8(e) => write!(f, "UTF-8 error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Utf8(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    #[inline]
    fn from(error: io::Error) -> Self {
        Self::Io(error)
    }
}

impl From<SyntaxError> for Error {
    #[inline]
    fn from(error: SyntaxError) -> Self {
        Self::Syntax(error)
    }
}

impl From<IllFormedError> for Error {
    #[inline]
    fn from(error: IllFormedError) -> Self {
        Self::IllFormed(error)
    }
}

impl From<Utf8Error> for Error {
    #[inline]
    fn from(error: Utf8Error) -> Self {
        Self::Utf8(error)
    }
}

/// A specialized `Result` type where the error is hard-wired to [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
