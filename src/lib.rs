//! Streaming reader for Xournal++ `.xopp` notebook XML.
//!
//! ## Description
//!
//! - [`Reader`]: a low level pull tokeniser. It owns a single growable
//!   buffer, refills it from any [`std::io::Read`] source, expands XML
//!   character references *in place* and hands out [`Node`]s whose
//!   string slices borrow the buffer directly; nothing is copied out,
//!   no DOM is built. A slice stays valid until the next
//!   [`read_node`] call.
//! - [`XoppParser`]: recognises the `.xopp` tag grammar on top of the
//!   node stream and drives a [`DocumentBuilder`] with typed events
//!   (add-page, add-stroke, set-points, …) in document order.
//!
//! Decompression is the caller's business: hand the reader an already
//! decompressed stream (e.g. a `GzDecoder`).
//!
//! ## Example
//!
//! ```rust
//! use xopp_parser::builder::DocumentBuilder;
//! use xopp_parser::parser::XoppParser;
//! use xopp_parser::reader::Reader;
//! use xopp_parser::value::Point;
//!
//! #[derive(Default)]
//! struct Stats {
//!     pages: usize,
//!     points: usize,
//! }
//!
//! impl DocumentBuilder for Stats {
//!     fn add_page(&mut self, _width: f64, _height: f64) {
//!         self.pages += 1;
//!     }
//!     fn set_stroke_points(&mut self, points: &[Point], _pressures: &[f64]) {
//!         self.points += points.len();
//!     }
//! }
//!
//! fn main() {
//!     let xml = r##"<xournal creator="demo" fileversion="4">
//!         <page width="612" height="792">
//!             <background type="solid" color="#ffffffff" style="plain"/>
//!             <layer>
//!                 <stroke tool="pen" color="#000000ff" width="1.41">10 20 30 40</stroke>
//!             </layer>
//!         </page>
//!     </xournal>"##;
//!
//!     let mut stats = Stats::default();
//!     XoppParser::new(Reader::from_str(xml), &mut stats).parse().unwrap();
//!     assert_eq!(stats.pages, 1);
//!     assert_eq!(stats.points, 2);
//! }
//! ```
//!
//! ## Malformed input
//!
//! Structural damage (mismatched closing tags, truncation, bytes where
//! no node can start) aborts the parse with an [`Error`]. Everything
//! else (unknown tags, unparseable attribute values, stray text) is
//! logged as a warning through the [`log`] facade and parsing continues,
//! so a half-broken notebook still loads as far as it can.
//!
//! [`read_node`]: reader::Reader::read_node
//! [`Reader`]: reader::Reader
//! [`XoppParser`]: parser::XoppParser
//! [`DocumentBuilder`]: builder::DocumentBuilder
//! [`Node`]: nodes::Node
//! [`Error`]: errors::Error
#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod builder;
pub mod errors;
pub mod escape;
pub mod nodes;
pub mod parser;
pub mod reader;
pub mod value;

// reexports
pub use crate::builder::DocumentBuilder;
pub use crate::errors::{Error, Result};
pub use crate::nodes::Node;
pub use crate::parser::XoppParser;
pub use crate::reader::Reader;
