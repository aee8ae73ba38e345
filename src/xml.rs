// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Shared machinery of the XML interchange format.

use std::collections::HashMap;
use std::io;
use std::str::from_utf8;

use quick_xml::events::{BytesStart, Event};

use crate::Error;

/// Parser is a trait for objects which can parse XML.
///
/// This trait only exists to fix the mismatch of
/// [quick_xml::Reader::read_event] when working on buffered data
/// and [quick_xml::Reader::read_event_into] when working on IO.
pub(crate) trait Parser {
    fn read_event<'a>(&'a mut self) -> quick_xml::Result<Event<'a>>;
}

/// IoParser implements [Parser] over an [std::io::BufRead].
pub(crate) struct IoParser<R: io::BufRead>(quick_xml::Reader<R>, Vec<u8>);

impl<R: io::BufRead> IoParser<R> {
    #[inline]
    pub(crate) fn new(reader: R) -> Self {
        Self(quick_xml::Reader::from_reader(reader), Vec::default())
    }
}

impl<R: io::BufRead> Parser for IoParser<R> {
    #[inline]
    fn read_event<'a>(&'a mut self) -> quick_xml::Result<Event<'a>> {
        self.1.clear();
        self.0.read_event_into(&mut self.1)
    }
}

/// BufParser implements [Parser] over a slice of bytes (`&[u8]`).
pub(crate) struct BufParser<'a>(quick_xml::Reader<&'a [u8]>);

impl<'a> BufParser<'a> {
    #[inline]
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self(quick_xml::Reader::from_reader(data))
    }
}

impl<'a> Parser for BufParser<'a> {
    #[inline]
    fn read_event<'b>(&'b mut self) -> quick_xml::Result<Event<'b>> {
        self.0.read_event()
    }
}

/// Owned name and unescaped attributes of an XML start (or empty) tag.
#[derive(Debug, Clone, Default)]
pub(crate) struct Element {
    pub(crate) name: String,
    attributes: HashMap<String, String>,
}

impl Element {
    pub(crate) fn parse(start: &BytesStart<'_>) -> Result<Self, Error> {
        let name = from_utf8(start.local_name().as_ref())?.to_string();
        let mut attributes = HashMap::default();
        for attr in start.attributes() {
            let attr = attr?;
            let key = from_utf8(attr.key.local_name().as_ref())?.to_string();
            let raw = from_utf8(&attr.value)?;
            let value = quick_xml::escape::unescape(raw)?.into_owned();
            attributes.insert(key, value);
        }
        Ok(Self { name, attributes })
    }

    fn invalid(&self, key: &str, value: &str) -> Error {
        Error::Parse {
            element: self.name.clone(),
            attribute: key.to_string(),
            value: value.to_string(),
        }
    }

    /// Returns the value of an attribute, or an empty string if it's missing.
    pub(crate) fn str(&self, key: &str) -> &str {
        self.attributes.get(key).map(|s| s.as_str()).unwrap_or_default()
    }

    /// Parses an attribute with a custom function. Missing attributes give `default`.
    pub(crate) fn parse_with<T, F: FnOnce(&str) -> Option<T>>(
        &self,
        key: &str,
        default: T,
        f: F,
    ) -> Result<T, Error> {
        match self.attributes.get(key) {
            None => Ok(default),
            Some(v) => f(v.trim()).ok_or_else(|| self.invalid(key, v)),
        }
    }

    pub(crate) fn f64(&self, key: &str, default: f64) -> Result<f64, Error> {
        self.parse_with(key, default, |v| v.parse().ok())
    }

    pub(crate) fn i32(&self, key: &str, default: i32) -> Result<i32, Error> {
        self.parse_with(key, default, |v| v.parse().ok())
    }

    pub(crate) fn bool(&self, key: &str, default: bool) -> Result<bool, Error> {
        self.parse_with(key, default, |v| match v {
            "yes" | "true" | "1" => Some(true),
            "no" | "false" | "0" => Some(false),
            _ => None,
        })
    }

    /// Parses a hexadecimal number, with or without the `0x` prefix.
    pub(crate) fn hex_u32(&self, key: &str, default: u32) -> Result<u32, Error> {
        self.parse_with(key, default, |v| {
            let digits = v
                .strip_prefix("0x")
                .or_else(|| v.strip_prefix("0X"))
                .unwrap_or(v);
            u32::from_str_radix(digits, 16).ok()
        })
    }
}

/// Creates a start tag with the given attributes.
pub(crate) fn start<'a>(name: &'a str, attributes: &[(&str, String)]) -> BytesStart<'a> {
    let mut e = BytesStart::new(name);
    for (key, value) in attributes {
        e.push_attribute((*key, value.as_str()));
    }
    return e;
}

#[inline]
pub(crate) fn yes_no(b: bool) -> String {
    (if b { "yes" } else { "no" }).to_string()
}

#[inline]
pub(crate) fn hex(v: u32) -> String {
    format!("0x{:08x}", v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_element(data: &[u8]) -> Element {
        let mut p = BufParser::new(data);
        loop {
            match p.read_event().unwrap() {
                Event::Start(s) | Event::Empty(s) => return Element::parse(&s).unwrap(),
                Event::Eof => panic!("no element"),
                _ => {}
            }
        }
    }

    #[test]
    fn attributes() {
        let e = first_element(
            br#"<Road type="primary" speed="70.5" n="-3" toll="yes" access="0x00800000" name="A &amp; B"/>"#,
        );
        assert_eq!(e.name, "Road");
        assert_eq!(e.str("type"), "primary");
        assert_eq!(e.str("missing"), "");
        assert_eq!(e.f64("speed", 0.0).unwrap(), 70.5);
        assert_eq!(e.f64("missing", 4.0).unwrap(), 4.0);
        assert_eq!(e.i32("n", 0).unwrap(), -3);
        assert!(e.bool("toll", false).unwrap());
        assert_eq!(e.hex_u32("access", 0).unwrap(), 0x0080_0000);
        assert_eq!(e.str("name"), "A & B");
    }

    #[test]
    fn invalid_attribute() {
        let e = first_element(br#"<Segment distance="far"/>"#);
        match e.f64("distance", 0.0) {
            Err(Error::Parse {
                element,
                attribute,
                value,
            }) => {
                assert_eq!(element, "Segment");
                assert_eq!(attribute, "distance");
                assert_eq!(value, "far");
            }
            other => panic!("expected a parse error, got {:?}", other),
        }
    }

    #[test]
    fn io_parser() {
        let data: &[u8] = br#"<a><b x="1"/></a>"#;
        let mut p = IoParser::new(io::BufReader::new(data));
        let mut names = Vec::new();
        loop {
            match p.read_event().unwrap() {
                Event::Start(s) | Event::Empty(s) => names.push(Element::parse(&s).unwrap().name),
                Event::Eof => break,
                _ => {}
            }
        }
        assert_eq!(names, vec!["a", "b"]);
    }
}
