//! Xopp attributes module
//!
//! Provides an ordered view over the `name="value"` pairs of an opening
//! tag, plus the typed extraction helpers the document parser is built
//! on. Extraction never fails hard: a missing or unparseable value is
//! logged and replaced by the caller's default, because a half-broken
//! `.xopp` file should still load as far as it can.

use std::fmt;
use std::slice::Iter;
use std::str::FromStr;

use log::warn;

use crate::value::{parse_color, Color};

/// One `name="value"` pair of an opening tag.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Attribute<'a> {
    /// The attribute name.
    pub name: &'a str,
    /// The attribute value, character references already expanded.
    pub value: &'a str,
}

impl<'a> fmt::Debug for Attribute<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}={:?}", self.name, self.value)
    }
}

/// The attributes of an [`Opening`] node, in document order.
///
/// [`Opening`]: crate::nodes::Opening
#[derive(Clone, Default, PartialEq)]
pub struct Attributes<'a> {
    pairs: Vec<Attribute<'a>>,
}

impl<'a> Attributes<'a> {
    #[inline]
    pub(crate) fn new(pairs: Vec<Attribute<'a>>) -> Self {
        Self { pairs }
    }

    /// Number of attributes on the tag.
    #[inline]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns `true` if the tag carries no attributes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Iterates the pairs in document order.
    #[inline]
    pub fn iter(&self) -> Iter<'_, Attribute<'a>> {
        self.pairs.iter()
    }

    /// Linear search for `name`; returns the raw value.
    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.pairs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value)
    }

    /// Optional typed extraction: absent attributes are simply `None`, a
    /// value that does not parse is logged and also `None`.
    pub fn get_parsed<T: FromStr>(&self, name: &str) -> Option<T> {
        let value = self.get(name)?;
        match value.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("attribute {}={:?} has an unparseable value", name, value);
                None
            }
        }
    }

    /// Mandatory typed extraction: a missing or unparseable value is
    /// logged and replaced by `default`.
    pub fn get_parsed_or<T: FromStr>(&self, name: &str, default: T) -> T {
        match self.get(name) {
            Some(value) => match value.parse() {
                Ok(v) => v,
                Err(_) => {
                    warn!(
                        "attribute {}={:?} has an unparseable value, using default",
                        name, value
                    );
                    default
                }
            },
            None => {
                warn!("attribute {} is missing, using default", name);
                default
            }
        }
    }

    /// Mandatory color extraction. `background` additionally enables the
    /// background-specific color name translations.
    pub fn get_color_or(&self, name: &str, default: Color, background: bool) -> Color {
        match self.get(name) {
            Some(value) => match parse_color(value, background) {
                Some(c) => c,
                None => {
                    warn!("attribute {}={:?} is not a color, using default", name, value);
                    default
                }
            },
            None => {
                warn!("attribute {} is missing, using default", name);
                default
            }
        }
    }
}

impl<'a> fmt::Debug for Attributes<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.pairs.iter()).finish()
    }
}

impl<'a, 'b> IntoIterator for &'b Attributes<'a> {
    type Item = &'b Attribute<'a>;
    type IntoIter = Iter<'b, Attribute<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn attrs<'a>(pairs: &[(&'a str, &'a str)]) -> Attributes<'a> {
        Attributes::new(
            pairs
                .iter()
                .map(|&(name, value)| Attribute { name, value })
                .collect(),
        )
    }

    #[test]
    fn lookup_is_linear_and_ordered() {
        let a = attrs(&[("tool", "pen"), ("color", "#ff0000ff"), ("tool", "eraser")]);
        assert_eq!(a.get("tool"), Some("pen"));
        assert_eq!(a.get("width"), None);
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn typed_extraction() {
        let a = attrs(&[("width", "1.5"), ("fill", "255"), ("bad", "x1")]);
        assert_eq!(a.get_parsed::<f64>("width"), Some(1.5));
        assert_eq!(a.get_parsed::<i32>("fill"), Some(255));
        assert_eq!(a.get_parsed::<i32>("bad"), None);
        assert_eq!(a.get_parsed::<i32>("absent"), None);
        assert_eq!(a.get_parsed_or::<i32>("bad", -1), -1);
        assert_eq!(a.get_parsed_or::<i32>("fill", -1), 255);
    }

    #[test]
    fn doubles_parse_with_dot_separator() {
        // locale-independent: always the C locale's dot
        let a = attrs(&[("x", "12.75"), ("y", "-0.5")]);
        assert_eq!(a.get_parsed::<f64>("x"), Some(12.75));
        assert_eq!(a.get_parsed::<f64>("y"), Some(-0.5));
    }
}
