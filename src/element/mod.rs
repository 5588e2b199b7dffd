//! Minimal owned XML element tree.
//!
//! Pipeline config files and run snapshots are small, so every reader works on
//! a fully materialized [`Element`] tree. Reading and writing go through
//! `xml-rs`; whitespace-only text is dropped and text is trimmed, so a tree
//! written with [`Element::to_xml_string`] reads back equal. Text that must
//! survive unchanged goes through [`Element::verbatim_element`] and is
//! stored as CDATA.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use thiserror::Error;
use tracing::warn;
use xml::reader::{EventReader, ParserConfig, XmlEvent};
use xml::writer::{EmitterConfig, EventWriter, XmlEvent as WriterEvent};

#[derive(Error, Debug)]
pub enum XmlError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML read error: {0}")]
    Read(#[from] xml::reader::Error),

    #[error("XML write error: {0}")]
    Write(#[from] xml::writer::Error),

    #[error("Document has no root element")]
    Empty,

    #[error("Expected <{expected}> element, found <{found}>")]
    UnexpectedElement { expected: String, found: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    /// Text is kept as-is and written as CDATA
    pub verbatim: bool,
    pub children: Vec<Element>,
}

impl Element {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// `<name>text</name>`; empty text produces an empty element
    #[must_use]
    pub fn text_element(name: impl Into<String>, text: impl ToString) -> Self {
        Self::new(name).with_text(text.to_string())
    }

    /// `<name><![CDATA[text]]></name>`, keeping surrounding whitespace
    #[must_use]
    pub fn verbatim_element(name: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let mut element = Self::new(name);
        if !text.is_empty() {
            element.text = Some(text);
            element.verbatim = true;
        }
        element
    }

    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.set_attr(name, value);
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.text = if text.trim().is_empty() {
            None
        } else {
            Some(text.trim().to_string())
        };
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl ToString) {
        let name = name.into();
        let value = value.to_string();
        match self.attributes.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Element text, or `""` when there is none
    #[must_use]
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// Case-insensitive tag comparison
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Lowercased tag name, for dispatching on child tags
    #[must_use]
    pub fn tag(&self) -> String {
        self.name.to_ascii_lowercase()
    }

    /// First direct child with an exact tag name
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Follow a `/`-separated path of child tags from this element
    #[must_use]
    pub fn find(&self, path: &str) -> Option<&Element> {
        path.split('/')
            .filter(|p| !p.is_empty())
            .try_fold(self, |node, name| node.child(name))
    }

    /// Text of the element at `path`, if it exists and has text
    #[must_use]
    pub fn find_text(&self, path: &str) -> Option<&str> {
        self.find(path).and_then(|e| e.text.as_deref())
    }

    /// The `version` attribute, if present and numeric
    #[must_use]
    pub fn version(&self) -> Option<u32> {
        self.attr("version").and_then(|v| v.trim().parse().ok())
    }

    /// Fail unless this element has the given tag (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns `XmlError::UnexpectedElement` on a tag mismatch.
    pub fn expect_tag(&self, name: &str) -> Result<(), XmlError> {
        if self.is(name) {
            Ok(())
        } else {
            Err(XmlError::UnexpectedElement {
                expected: name.to_string(),
                found: self.name.clone(),
            })
        }
    }

    /// Log a warning when the document was written by a newer schema
    pub fn warn_if_newer(&self, supported: u32) {
        if let Some(version) = self.version() {
            if version > supported {
                warn!(
                    element = %self.name,
                    version,
                    supported,
                    "XML element written by a newer version, reading best-effort"
                );
            }
        }
    }

    /// Parse a document from any reader.
    ///
    /// # Errors
    ///
    /// Returns `XmlError::Read` for malformed XML and `XmlError::Empty` if
    /// there is no root element.
    pub fn parse_reader<R: Read>(reader: R) -> Result<Element, XmlError> {
        let config = ParserConfig::new()
            .trim_whitespace(true)
            .ignore_comments(true);
        let parser = EventReader::new_with_config(reader, config);

        let mut stack: Vec<Element> = Vec::new();
        let mut root = None;

        for event in parser {
            match event? {
                XmlEvent::StartElement {
                    name, attributes, ..
                } => {
                    stack.push(Element {
                        name: name.local_name,
                        attributes: attributes
                            .into_iter()
                            .map(|a| (a.name.local_name, a.value))
                            .collect(),
                        ..Element::default()
                    });
                }
                XmlEvent::EndElement { .. } => {
                    if let Some(done) = stack.pop() {
                        match stack.last_mut() {
                            Some(parent) => parent.children.push(done),
                            None => root = Some(done),
                        }
                    }
                }
                XmlEvent::Characters(text) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.get_or_insert_with(String::new).push_str(&text);
                    }
                }
                XmlEvent::CData(text) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.get_or_insert_with(String::new).push_str(&text);
                        current.verbatim = true;
                    }
                }
                _ => {}
            }
        }

        root.ok_or(XmlError::Empty)
    }

    /// Parse a document held in memory.
    ///
    /// # Errors
    ///
    /// See [`Element::parse_reader`].
    pub fn parse_str(text: &str) -> Result<Element, XmlError> {
        Self::parse_reader(text.as_bytes())
    }

    /// Parse a document from disk.
    ///
    /// # Errors
    ///
    /// Returns `XmlError::Io` if the file cannot be opened, otherwise see
    /// [`Element::parse_reader`].
    pub fn parse_file(path: &Path) -> Result<Element, XmlError> {
        let file = File::open(path)?;
        Self::parse_reader(BufReader::new(file))
    }

    /// Write this tree as an indented document.
    ///
    /// # Errors
    ///
    /// Returns `XmlError::Write` if the sink fails.
    pub fn write<W: Write>(&self, sink: W) -> Result<(), XmlError> {
        let mut writer = EmitterConfig::new()
            .perform_indent(true)
            .create_writer(sink);
        self.emit(&mut writer)?;
        Ok(())
    }

    fn emit<W: Write>(&self, writer: &mut EventWriter<W>) -> Result<(), xml::writer::Error> {
        let mut start = WriterEvent::start_element(self.name.as_str());
        for (name, value) in &self.attributes {
            start = start.attr(name.as_str(), value.as_str());
        }
        writer.write(start)?;
        match &self.text {
            Some(text) if self.verbatim => writer.write(WriterEvent::cdata(text))?,
            Some(text) => writer.write(WriterEvent::characters(text))?,
            None => {}
        }
        for child in &self.children {
            child.emit(writer)?;
        }
        writer.write(WriterEvent::end_element())
    }

    /// Serialize to an indented document string.
    ///
    /// # Errors
    ///
    /// See [`Element::write`].
    pub fn to_xml_string(&self) -> Result<String, XmlError> {
        let mut buffer = Vec::new();
        self.write(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Write an indented document to disk.
    ///
    /// # Errors
    ///
    /// Returns `XmlError::Io` if the file cannot be created.
    pub fn write_file(&self, path: &Path) -> Result<(), XmlError> {
        let file = File::create(path)?;
        let mut sink = BufWriter::new(file);
        self.write(&mut sink)?;
        sink.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"<?xml version="1.0"?>
<RunParameters>
  <ChipWideRunParameters>
    <ANALYSIS>default</ANALYSIS>
    <EXPT_DIR>/home/diane/gec/080416_HWI-EAS229_0024_207BTAAXX/Data/C1-33_Firecrest1.8.28_19-04-2008_diane/Bustard1.8.28_19-04-2008_diane</EXPT_DIR>
  </ChipWideRunParameters>
  <!-- comment -->
  <LaneSpecificRunParameters>
    <ANALYSIS>
      <s_1>eland</s_1>
      <s_2>sequence</s_2>
    </ANALYSIS>
  </LaneSpecificRunParameters>
  <Software Name="CASAVA" Version="CASAVA-1.7.0"/>
</RunParameters>
"#;

    #[test]
    fn test_parse_tree() {
        let root = Element::parse_str(CONFIG).unwrap();
        assert_eq!(root.name, "RunParameters");
        assert_eq!(root.children.len(), 3);
        assert_eq!(
            root.find_text("ChipWideRunParameters/ANALYSIS"),
            Some("default")
        );
        let analysis = root.find("LaneSpecificRunParameters/ANALYSIS").unwrap();
        assert_eq!(analysis.children.len(), 2);
        assert_eq!(analysis.children[1].text(), "sequence");
        assert_eq!(
            root.find("Software").and_then(|s| s.attr("Version")),
            Some("CASAVA-1.7.0")
        );
        assert!(root.find("Missing/Path").is_none());
    }

    #[test]
    fn test_round_trip() {
        let root = Element::parse_str(CONFIG).unwrap();
        let text = root.to_xml_string().unwrap();
        let again = Element::parse_str(&text).unwrap();
        assert_eq!(root, again);
    }

    #[test]
    fn test_builder_and_escaping() {
        let e = Element::new("Lane")
            .with_attr("lane", 3)
            .with_attr("sample", "a<b&c")
            .with_child(Element::text_element("Reads", 12))
            .with_child(Element::text_element("Empty", ""));
        let again = Element::parse_str(&e.to_xml_string().unwrap()).unwrap();
        assert_eq!(e, again);
        assert_eq!(again.attr("sample"), Some("a<b&c"));
        assert_eq!(again.find_text("Reads"), Some("12"));
        assert_eq!(again.find("Empty").map(Element::text), Some(""));
    }

    #[test]
    fn test_verbatim_text_keeps_whitespace() {
        let body = "# header\n 1 0\n0 1\n";
        let e = Element::new("Stage").with_child(Element::verbatim_element("matrix", body));
        let text = e.to_xml_string().unwrap();
        assert!(text.contains("<![CDATA["));

        let again = Element::parse_str(&text).unwrap();
        assert_eq!(again, e);
        assert_eq!(again.find_text("matrix"), Some(body));
        assert!(Element::verbatim_element("matrix", "").text.is_none());
    }

    #[test]
    fn test_set_attr_replaces() {
        let mut e = Element::new("x").with_attr("version", 1);
        e.set_attr("version", 2);
        assert_eq!(e.attributes.len(), 1);
        assert_eq!(e.version(), Some(2));
    }

    #[test]
    fn test_expect_tag_is_case_insensitive() {
        let e = Element::new("ElandCollection");
        assert!(e.expect_tag("elandcollection").is_ok());
        assert!(matches!(
            e.expect_tag("Summary"),
            Err(XmlError::UnexpectedElement { .. })
        ));
    }

    #[test]
    fn test_empty_document_is_error() {
        assert!(Element::parse_str("").is_err());
        assert!(Element::parse_str("<a><b></a>").is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.xml");
        let e = Element::new("Doc").with_child(Element::text_element("Value", "1.5"));
        e.write_file(&path).unwrap();
        assert_eq!(Element::parse_file(&path).unwrap(), e);
    }
}
