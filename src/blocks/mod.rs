use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::de::Error as DeError;
use serde::ser::Error as SerError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

pub mod editor;
pub mod field_edit;
pub mod inline;
pub mod renderer;

pub const DEFAULT_CODE_LANGUAGE: &str = "plaintext";

/// Identifier of a block inside a post. Unique within the post and stable across edits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub String);

impl Display for BlockId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockType {
    Heading,
    Paragraph,
    Code,
    Image,
    Video,
    Note,
    List,
    Separator,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnknownBlockType(pub String);

impl Display for UnknownBlockType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "unknown block type '{}'", self.0)
    }
}

impl BlockType {
    pub const ALL: [BlockType; 8] = [
        BlockType::Heading,
        BlockType::Paragraph,
        BlockType::Code,
        BlockType::Image,
        BlockType::Video,
        BlockType::Note,
        BlockType::List,
        BlockType::Separator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Heading => "heading",
            BlockType::Paragraph => "paragraph",
            BlockType::Code => "code",
            BlockType::Image => "image",
            BlockType::Video => "video",
            BlockType::Note => "note",
            BlockType::List => "list",
            BlockType::Separator => "separator",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BlockType::Heading => "Heading",
            BlockType::Paragraph => "Paragraph",
            BlockType::Code => "Code",
            BlockType::Image => "Image",
            BlockType::Video => "Video",
            BlockType::Note => "Note",
            BlockType::List => "List",
            BlockType::Separator => "Separator",
        }
    }

    /// Payload of a freshly created block of this type.
    pub fn default_kind(&self) -> BlockKind {
        match self {
            BlockType::Heading => BlockKind::Heading(Heading::default()),
            BlockType::Paragraph => BlockKind::Paragraph(Paragraph::default()),
            BlockType::Code => BlockKind::Code(Code::default()),
            BlockType::Image => BlockKind::Image(Media::default()),
            BlockType::Video => BlockKind::Video(Media::default()),
            BlockType::Note => BlockKind::Note(Note::default()),
            BlockType::List => BlockKind::List(List::default()),
            BlockType::Separator => BlockKind::Separator,
        }
    }
}

impl FromStr for BlockType {
    type Err = UnknownBlockType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlockType::ALL
            .iter()
            .find(|t| t.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownBlockType(s.to_string()))
    }
}

impl Display for BlockType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum HeadingLevel {
    #[default]
    H2,
    H3,
}

impl TryFrom<u8> for HeadingLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(HeadingLevel::H2),
            3 => Ok(HeadingLevel::H3),
            x => Err(format!("heading level must be 2 or 3, got {}", x)),
        }
    }
}

impl From<HeadingLevel> for u8 {
    fn from(value: HeadingLevel) -> Self {
        match value {
            HeadingLevel::H2 => 2,
            HeadingLevel::H3 => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteVariant {
    #[default]
    Info,
    Warning,
    Tip,
}

impl NoteVariant {
    pub const ALL: [NoteVariant; 3] = [NoteVariant::Info, NoteVariant::Warning, NoteVariant::Tip];

    pub fn as_str(&self) -> &'static str {
        match self {
            NoteVariant::Info => "info",
            NoteVariant::Warning => "warning",
            NoteVariant::Tip => "tip",
        }
    }
}

impl FromStr for NoteVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NoteVariant::ALL
            .iter()
            .find(|v| v.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown note variant '{}'", s))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Heading {
    pub text: String,
    pub level: HeadingLevel,
    /// Only rendered for level 2 headings.
    pub underline: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Paragraph {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Code {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub language: String,
    pub show_line_numbers: bool,
}

impl Default for Code {
    fn default() -> Self {
        Code {
            code: String::new(),
            title: None,
            language: DEFAULT_CODE_LANGUAGE.to_string(),
            show_line_numbers: false,
        }
    }
}

/// Payload shared by image and video blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Media {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Note {
    pub text: String,
    pub variant: NoteVariant,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct List {
    pub items: Vec<String>,
}

/// A block whose `type` this version does not know. Its fields are kept so that
/// saving the post again does not drop them.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownBlock {
    pub type_name: String,
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BlockKind {
    Heading(Heading),
    Paragraph(Paragraph),
    Code(Code),
    Image(Media),
    Video(Media),
    Note(Note),
    List(List),
    Separator,
    #[serde(skip)]
    Unknown(UnknownBlock),
}

impl BlockKind {
    pub fn block_type(&self) -> Option<BlockType> {
        match self {
            BlockKind::Heading(_) => Some(BlockType::Heading),
            BlockKind::Paragraph(_) => Some(BlockType::Paragraph),
            BlockKind::Code(_) => Some(BlockType::Code),
            BlockKind::Image(_) => Some(BlockType::Image),
            BlockKind::Video(_) => Some(BlockType::Video),
            BlockKind::Note(_) => Some(BlockType::Note),
            BlockKind::List(_) => Some(BlockType::List),
            BlockKind::Separator => Some(BlockType::Separator),
            BlockKind::Unknown(_) => None,
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            BlockKind::Unknown(unknown) => unknown.type_name.as_str(),
            known => known.block_type().map(|t| t.as_str()).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContentBlock {
    pub id: BlockId,
    pub kind: BlockKind,
}

impl ContentBlock {
    pub fn new(id: BlockId, kind: BlockKind) -> Self {
        ContentBlock { id, kind }
    }

    pub fn block_type(&self) -> Option<BlockType> {
        self.kind.block_type()
    }

    pub fn type_name(&self) -> &str {
        self.kind.type_name()
    }
}

// On the wire a block is a flat object: {"id": .., "type": .., <payload fields>}.
impl Serialize for ContentBlock {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut fields = match &self.kind {
            BlockKind::Unknown(unknown) => {
                let mut fields = unknown.fields.clone();
                fields.insert("type".to_string(), Value::String(unknown.type_name.clone()));
                fields
            }
            kind => match serde_json::to_value(kind).map_err(S::Error::custom)? {
                Value::Object(fields) => fields,
                _ => return Err(S::Error::custom("block payload is not an object")),
            },
        };
        fields.insert("id".to_string(), Value::String(self.id.0.clone()));
        fields.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ContentBlock {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut fields = Map::<String, Value>::deserialize(deserializer)?;

        // Older documents used numeric timestamps as ids
        let id = match fields.remove("id") {
            Some(Value::String(id)) => BlockId(id),
            Some(Value::Number(id)) => BlockId(id.to_string()),
            _ => return Err(D::Error::missing_field("id")),
        };

        let type_name = match fields.get("type") {
            Some(Value::String(type_name)) => type_name.clone(),
            _ => return Err(D::Error::missing_field("type")),
        };

        let kind = if type_name.parse::<BlockType>().is_ok() {
            BlockKind::deserialize(Value::Object(fields)).map_err(D::Error::custom)?
        } else {
            fields.remove("type");
            BlockKind::Unknown(UnknownBlock { type_name, fields })
        };

        Ok(ContentBlock { id, kind })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_serialize_flat_object() {
        let block = ContentBlock::new(
            BlockId("1700000000000".to_string()),
            BlockKind::Code(Code {
                code: "fn main() {}".to_string(),
                title: Some("main.rs".to_string()),
                language: "rust".to_string(),
                show_line_numbers: true,
            }),
        );
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value, json!({
            "id": "1700000000000",
            "type": "code",
            "code": "fn main() {}",
            "title": "main.rs",
            "language": "rust",
            "showLineNumbers": true,
        }));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let block: ContentBlock = serde_json::from_value(json!({"id": "a", "type": "code"})).unwrap();
        assert_eq!(block.kind, BlockKind::Code(Code::default()));

        let block: ContentBlock = serde_json::from_value(json!({"id": "b", "type": "heading", "text": "Intro", "level": 3})).unwrap();
        assert_eq!(block.kind, BlockKind::Heading(Heading {
            text: "Intro".to_string(),
            level: HeadingLevel::H3,
            underline: false,
        }));

        let block: ContentBlock = serde_json::from_value(json!({"id": "c", "type": "separator"})).unwrap();
        assert_eq!(block.kind, BlockKind::Separator);
    }

    #[test]
    fn test_numeric_id() {
        let block: ContentBlock = serde_json::from_value(json!({"id": 1712345678901u64, "type": "paragraph", "text": "hi"})).unwrap();
        assert_eq!(block.id, BlockId("1712345678901".to_string()));
    }

    #[test]
    fn test_invalid_heading_level() {
        let res = serde_json::from_value::<ContentBlock>(json!({"id": "h", "type": "heading", "text": "x", "level": 1}));
        assert!(res.is_err());
    }

    #[test]
    fn test_unknown_type_keeps_fields() {
        let raw = json!({"id": "q", "type": "quote", "text": "To be", "author": "W."});
        let block: ContentBlock = serde_json::from_value(raw.clone()).unwrap();
        match &block.kind {
            BlockKind::Unknown(unknown) => {
                assert_eq!(unknown.type_name, "quote");
                assert_eq!(unknown.fields.get("author"), Some(&json!("W.")));
            }
            other => panic!("expected unknown block, got {:?}", other),
        }
        assert_eq!(block.type_name(), "quote");
        assert_eq!(block.block_type(), None);
        assert_eq!(serde_json::to_value(&block).unwrap(), raw);
    }

    #[test]
    fn test_missing_id_or_type() {
        assert!(serde_json::from_value::<ContentBlock>(json!({"type": "paragraph"})).is_err());
        assert!(serde_json::from_value::<ContentBlock>(json!({"id": "x"})).is_err());
    }

    #[test]
    fn test_block_type_literals() {
        for block_type in BlockType::ALL {
            assert_eq!(block_type.as_str().parse::<BlockType>(), Ok(block_type));
            assert_eq!(block_type.default_kind().block_type(), Some(block_type));
        }
        assert_eq!("quote".parse::<BlockType>(), Err(UnknownBlockType("quote".to_string())));
    }
}
