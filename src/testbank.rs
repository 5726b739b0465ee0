/**
 * Parser that reads a test-bank XML document into a simple tree of nodes.
 *
 * The parser is driven by the events of a streaming XML reader and keeps a stack of
 * open nodes, so that every tag can be checked against the node that encloses it. Any
 * document that nests its tags wrongly is rejected here, before the quiz module ever
 * sees it.
 *
 * Author:  Ian Fisher (iafisher@protonmail.com)
 * Version: October 2019
 */
use std::fmt;
use std::fs;
use std::path::Path;

use log::{debug, trace};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::common::{Location, QuizError, Result};


pub const CATEGORY_TYPES: [&str; 3] = ["matching", "multiple_choice", "true_or_false"];


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    TestBank, Chapter, Section, Category, Fact, Question, Answer,
}


/// A single element of a test bank.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// The `name` attribute of a test bank, chapter or section, or the `type` attribute
    /// of a category or fact.
    pub attr: Option<String>,
    /// Character data directly inside the element, exactly as it appeared.
    pub text: String,
    pub children: Vec<Node>,
    /// Where the element's start tag is.
    pub location: Location,
}


impl NodeKind {
    fn from_tag(tag: &str) -> Option<NodeKind> {
        match tag {
            "testbank" => Some(NodeKind::TestBank),
            "chapter" => Some(NodeKind::Chapter),
            "section" => Some(NodeKind::Section),
            "category" => Some(NodeKind::Category),
            "fact" => Some(NodeKind::Fact),
            "question" => Some(NodeKind::Question),
            "answer" => Some(NodeKind::Answer),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            NodeKind::TestBank => "testbank",
            NodeKind::Chapter => "chapter",
            NodeKind::Section => "section",
            NodeKind::Category => "category",
            NodeKind::Fact => "fact",
            NodeKind::Question => "question",
            NodeKind::Answer => "answer",
        }
    }

    /// The name of the attribute that the node keeps in `attr`, if any.
    pub fn attr_name(self) -> Option<&'static str> {
        match self {
            NodeKind::TestBank | NodeKind::Chapter | NodeKind::Section => Some("name"),
            NodeKind::Category | NodeKind::Fact => Some("type"),
            NodeKind::Question | NodeKind::Answer => None,
        }
    }

    /// The kind of node that must directly enclose this one. `None` means the node
    /// must be the root of the document.
    fn parent(self) -> Option<NodeKind> {
        match self {
            NodeKind::TestBank => None,
            NodeKind::Chapter => Some(NodeKind::TestBank),
            NodeKind::Section => Some(NodeKind::Chapter),
            NodeKind::Category => Some(NodeKind::Section),
            NodeKind::Fact => Some(NodeKind::Category),
            NodeKind::Question | NodeKind::Answer => Some(NodeKind::Fact),
        }
    }
}


impl Node {
    pub fn new(kind: NodeKind, attr: Option<&str>) -> Self {
        Node {
            kind,
            attr: attr.map(String::from),
            text: String::new(),
            children: Vec::new(),
            location: Location::default(),
        }
    }

    /// Build a question or answer node with the given text.
    pub fn leaf(kind: NodeKind, text: &str) -> Self {
        let mut node = Node::new(kind, None);
        node.text.push_str(text);
        node
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn attr_or_empty(&self) -> &str {
        self.attr.as_ref().map(|a| a.as_str()).unwrap_or("")
    }

    fn write_indented(&self, f: &mut fmt::Formatter, depth: usize) -> fmt::Result {
        let indent = "    ".repeat(depth);
        write!(f, "{}<{}", indent, self.kind.tag())?;
        if let (Some(name), Some(attr)) = (self.kind.attr_name(), self.attr.as_ref()) {
            write!(f, " {}=\"{}\"", name, attr)?;
        }
        write!(f, ">")?;

        if self.kind.attr_name().is_none() {
            return write!(f, "{}</{}>", self.text, self.kind.tag());
        }

        for child in self.children.iter() {
            writeln!(f)?;
            child.write_indented(f, depth + 1)?;
        }
        write!(f, "\n{}</{}>", indent, self.kind.tag())
    }
}


impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.write_indented(f, 0)
    }
}


pub fn parse_file(path: &Path) -> Result<Node> {
    let source = fs::read_to_string(path).map_err(QuizError::Io)?;
    debug!("Parsing test bank at {}", path.display());
    parse_str(&source)
}


/// Parse a test-bank document and return its root node.
pub fn parse_str(source: &str) -> Result<Node> {
    let mut reader = Reader::from_str(source);
    reader.trim_text(false);

    let mut builder = BankBuilder::new(source);
    loop {
        let position = reader.buffer_position();
        let event = reader.read_event().map_err(|e| QuizError::Document {
            location: locate(source, reader.buffer_position()),
            message: format!("malformed document: {}", e),
        })?;

        match event {
            Event::Start(ref e) => {
                builder.start_element(e, tag_start(source, reader.buffer_position()))?;
            },
            Event::Empty(ref e) => {
                let position = tag_start(source, reader.buffer_position());
                builder.start_element(e, position)?;
                builder.end_element(position)?;
            },
            Event::End(_) => {
                builder.end_element(tag_start(source, reader.buffer_position()))?;
            },
            Event::Text(ref e) => {
                let text = e.unescape().map_err(|e| QuizError::Document {
                    location: locate(source, position),
                    message: format!("malformed text: {}", e),
                })?;
                builder.characters(&text, position)?;
            },
            Event::CData(ref e) => {
                builder.characters(&String::from_utf8_lossy(e), position)?;
            },
            Event::Eof => {
                return builder.finish(position);
            },
            _ => {},
        }
    }
}


struct BankBuilder<'a> {
    source: &'a str,
    context: Vec<Node>,
    root: Option<Node>,
}


impl<'a> BankBuilder<'a> {
    fn new(source: &'a str) -> Self {
        BankBuilder { source, context: Vec::new(), root: None }
    }

    fn error(&self, position: usize, message: String) -> QuizError {
        QuizError::Document { location: locate(self.source, position), message }
    }

    fn start_element(&mut self, e: &BytesStart, position: usize) -> Result<()> {
        let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let kind = NodeKind::from_tag(&tag)
            .ok_or_else(|| self.error(position, format!("unrecognized tag '{}'", tag)))?;

        let enclosing = self.context.last().map(|n| n.kind);
        match kind.parent() {
            None => {
                if enclosing.is_some() || self.root.is_some() {
                    return Err(self.error(position, format!("{} should be the root", tag)));
                }
            },
            Some(parent) => {
                if enclosing != Some(parent) {
                    return Err(self.error(
                        position,
                        format!("{} should be in context of {}", tag, parent.tag()),
                    ));
                }
            },
        }

        let attr = match kind {
            NodeKind::Fact => {
                // Only multiple-choice facts must be labelled; true-or-false facts are
                // never grouped by label.
                match self.context.last().and_then(|c| c.attr.as_ref()).map(|a| a.as_str()) {
                    Some("multiple_choice") => Some(self.required_attr(e, "type", position)?),
                    Some("matching") => self.optional_attr(e, "type", position)?,
                    _ => None,
                }
            },
            NodeKind::Category => {
                let value = self.required_attr(e, "type", position)?;
                if !CATEGORY_TYPES.contains(&value.as_str()) {
                    return Err(self.error(
                        position, format!("type of category not recognized: '{}'", value)
                    ));
                }
                Some(value)
            },
            _ => match kind.attr_name() {
                Some(name) => Some(self.required_attr(e, name, position)?),
                None => None,
            },
        };

        trace!("<{}> {:?}", tag, attr);
        let mut node = Node::new(kind, None);
        node.attr = attr;
        node.location = locate(self.source, position);
        self.context.push(node);
        Ok(())
    }

    fn end_element(&mut self, position: usize) -> Result<()> {
        let node = self.context.pop()
            .ok_or_else(|| self.error(position, String::from("unexpected end tag")))?;
        if let Some(parent) = self.context.last_mut() {
            parent.children.push(node);
        } else {
            self.root = Some(node);
        }
        Ok(())
    }

    fn characters(&mut self, text: &str, position: usize) -> Result<()> {
        if let Some(node) = self.context.last_mut() {
            node.text.push_str(text);
            Ok(())
        } else if text.trim().is_empty() {
            Ok(())
        } else {
            Err(self.error(position, String::from("text outside of testbank")))
        }
    }

    fn finish(mut self, position: usize) -> Result<Node> {
        if let Some(node) = self.context.last() {
            return Err(self.error(
                position, format!("unexpected end of document inside {}", node.kind.tag())
            ));
        }
        self.root.take()
            .ok_or_else(|| self.error(position, String::from("document has no testbank")))
    }

    fn optional_attr(&self, e: &BytesStart, name: &str, position: usize) -> Result<Option<String>> {
        let attr = e.try_get_attribute(name)
            .map_err(|err| self.error(position, format!("malformed attribute: {}", err)))?;
        match attr {
            Some(attr) => {
                let value = attr.unescape_value()
                    .map_err(|err| self.error(position, format!("malformed attribute: {}", err)))?;
                Ok(Some(value.into_owned()))
            },
            None => Ok(None),
        }
    }

    fn required_attr(&self, e: &BytesStart, name: &str, position: usize) -> Result<String> {
        let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        self.optional_attr(e, name, position)?
            .ok_or_else(|| self.error(position, format!("{} is missing '{}' attribute", tag, name)))
    }
}


/// The offset of the `<` that opens the tag ending just before `end`.
fn tag_start(source: &str, end: usize) -> usize {
    source[..end.min(source.len())].rfind('<').unwrap_or(0)
}


/// Convert a byte offset into `source` to a line and column.
fn locate(source: &str, position: usize) -> Location {
    let end = position.min(source.len());
    let mut location = Location { line: 1, column: 1 };
    for byte in source.as_bytes()[..end].iter() {
        if *byte == b'\n' {
            location.line += 1;
            location.column = 1;
        } else {
            location.column += 1;
        }
    }
    location
}
