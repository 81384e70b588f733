//! Editable view over the text elements (`<*:t>`) of one XML part.
//!
//! The part is kept as its original event stream. Only the text of `t` elements can change, and
//! serialization writes every other event back as it was read.

use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

use crate::scanner::TextNodes;

#[derive(Debug, Error)]
pub enum XmlPartError {
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("xml attribute error: {0}")]
    XmlAttr(#[from] AttrError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("text element <{0}> is never closed")]
    UnclosedText(String),
}

#[derive(Debug)]
struct TextElement {
    /// Index of the element's `Start` (or `Empty`) event.
    start: usize,
    /// Index of the matching `End` event; equal to `start` for `<t/>`.
    end: usize,
    original: String,
    text: String,
}

#[derive(Debug)]
pub struct XmlTextPart {
    events: Vec<Event<'static>>,
    elements: Vec<TextElement>,
    preserve_space: bool,
}

impl XmlTextPart {
    pub fn parse(bytes: &[u8]) -> Result<Self, XmlPartError> {
        let mut reader = Reader::from_reader(bytes);
        let mut events = Vec::new();
        let mut elements = Vec::new();
        // Open `t` element: (event index, qualified name, collected text).
        let mut current: Option<(usize, Vec<u8>, String)> = None;

        loop {
            let event = reader.read_event()?;
            let idx = events.len();
            match &event {
                Event::Eof => break,
                Event::Start(e) if current.is_none() && local_name(e.name().as_ref()) == b"t" => {
                    current = Some((idx, e.name().as_ref().to_vec(), String::new()));
                }
                Event::Empty(e) if current.is_none() && local_name(e.name().as_ref()) == b"t" => {
                    elements.push(TextElement {
                        start: idx,
                        end: idx,
                        original: String::new(),
                        text: String::new(),
                    });
                }
                Event::Text(e) => {
                    if let Some((_, _, text)) = current.as_mut() {
                        text.push_str(&e.unescape()?);
                    }
                }
                Event::CData(e) => {
                    if let Some((_, _, text)) = current.as_mut() {
                        text.push_str(&String::from_utf8_lossy(e));
                    }
                }
                Event::End(e) => {
                    let closes_current = current
                        .as_ref()
                        .is_some_and(|(_, name, _)| name.as_slice() == e.name().as_ref());
                    if closes_current {
                        if let Some((start, _, text)) = current.take() {
                            elements.push(TextElement {
                                start,
                                end: idx,
                                original: text.clone(),
                                text,
                            });
                        }
                    }
                }
                _ => {}
            }
            events.push(event.into_owned());
        }

        if let Some((_, name, _)) = current {
            return Err(XmlPartError::UnclosedText(
                String::from_utf8_lossy(&name).into_owned(),
            ));
        }

        Ok(Self {
            events,
            elements,
            preserve_space: false,
        })
    }

    /// Add `xml:space="preserve"` to rewritten text elements whose text starts or ends with
    /// whitespace, which Word otherwise collapses. Enabled only for WordprocessingML parts, where
    /// the main namespace may be bound to any prefix.
    #[must_use]
    pub fn with_space_preserve(mut self, enabled: bool) -> Self {
        self.preserve_space = enabled;
        self
    }

    pub fn is_modified(&self) -> bool {
        self.elements.iter().any(|el| el.text != el.original)
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().map(|el| el.text.as_str())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, XmlPartError> {
        let mut writer = Writer::new(Vec::new());
        let mut elements = self.elements.iter().peekable();
        let mut idx = 0;

        while idx < self.events.len() {
            let el = match elements.peek() {
                Some(el) if el.start == idx => elements.next(),
                _ => None,
            };
            match el {
                Some(el) if el.text != el.original => {
                    self.write_element(&mut writer, el)?;
                    idx = el.end + 1;
                }
                _ => {
                    writer.write_event(self.events[idx].borrow())?;
                    idx += 1;
                }
            }
        }

        Ok(writer.into_inner())
    }

    fn write_element(
        &self,
        writer: &mut Writer<Vec<u8>>,
        el: &TextElement,
    ) -> Result<(), XmlPartError> {
        let start = match &self.events[el.start] {
            Event::Start(e) | Event::Empty(e) => e.borrow(),
            _ => return Ok(()),
        };
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();

        let start = if self.preserve_space && needs_space_preserve(&el.text) {
            with_preserve_attribute(&start)?
        } else {
            start
        };

        if el.text.is_empty() {
            if el.start == el.end {
                writer.write_event(Event::Empty(start))?;
            } else {
                writer.write_event(Event::Start(start))?;
                writer.write_event(Event::End(BytesEnd::new(name)))?;
            }
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        writer.write_event(Event::Text(BytesText::new(&el.text)))?;
        writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }
}

impl TextNodes for XmlTextPart {
    fn len(&self) -> usize {
        self.elements.len()
    }

    fn text(&self, index: usize) -> Option<&str> {
        self.elements.get(index).map(|el| el.text.as_str())
    }

    fn set_text(&mut self, index: usize, text: String) {
        if let Some(el) = self.elements.get_mut(index) {
            el.text = text;
        }
    }
}

fn with_preserve_attribute<'a>(start: &BytesStart<'a>) -> Result<BytesStart<'a>, XmlPartError> {
    if start.try_get_attribute("xml:space")?.is_some() {
        return Ok(start.clone());
    }
    let mut out = start.clone();
    out.push_attribute(("xml:space", "preserve"));
    Ok(out)
}

fn needs_space_preserve(s: &str) -> bool {
    s.starts_with(char::is_whitespace) || s.ends_with(char::is_whitespace)
}

fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().rposition(|b| *b == b':') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}
