use serde::ser::{Serialize, SerializeMap, Serializer};

/// Maximum length of a single text content field accepted by the API.
pub const MAX_TEXT_LENGTH: usize = 2000;

/// Maximum number of child blocks accepted by a single create/append call.
pub const MAX_CHILDREN_PER_REQUEST: usize = 100;

/// Color applied to struck-through runs.
pub const STRIKETHROUGH_COLOR: &str = "gray";

/// Inline styling flags of a rich text run
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct Annotations {
    pub bold: bool,
    pub italic: bool,
    pub code: bool,
    pub strikethrough: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Link {
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct TextContent {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
}

/// One contiguous span of text with uniform styling.
///
/// Runs built from inline Markdown always carry annotations; runs built for
/// code blocks and table cells are plain and serialize without them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RichText {
    pub text: TextContent,
    pub annotations: Option<Annotations>,
    pub href: Option<String>,
}

impl RichText {
    /// A bare run without annotations.
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            text: TextContent {
                content: content.into(),
                link: None,
            },
            annotations: None,
            href: None,
        }
    }

    /// An empty run with every annotation explicitly off.
    pub fn styled() -> Self {
        Self {
            annotations: Some(Annotations::default()),
            ..Self::default()
        }
    }

    pub fn content(&self) -> &str {
        &self.text.content
    }

    pub fn annotations_mut(&mut self) -> &mut Annotations {
        self.annotations.get_or_insert_with(Annotations::default)
    }
}

impl Serialize for RichText {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", "text")?;
        map.serialize_entry("text", &self.text)?;
        if let Some(annotations) = &self.annotations {
            map.serialize_entry("annotations", annotations)?;
        }
        if let Some(href) = &self.href {
            map.serialize_entry("href", href)?;
        }
        map.end()
    }
}

/// Payload shared by every text-bearing block (paragraphs, headings, quotes, list items)
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct TextBlock {
    pub rich_text: Vec<RichText>,
    /// Never serialized when empty; the API rejects `children: []`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Block>,
}

impl TextBlock {
    pub fn new(rich_text: Vec<RichText>, children: Vec<Block>) -> Self {
        Self {
            rich_text,
            children,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CodeBlock {
    pub rich_text: Vec<RichText>,
    pub language: String,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct Table {
    pub table_width: usize,
    pub has_column_header: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Block>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct TableRow {
    pub cells: Vec<Vec<RichText>>,
}

/// An image hosted outside the workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub url: String,
}

/// Blocks in the shape the document API consumes
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph(TextBlock),
    Heading { level: u8, body: TextBlock },
    Quote(TextBlock),
    BulletedListItem(TextBlock),
    NumberedListItem(TextBlock),
    ToDo { body: TextBlock, checked: bool },
    Code(CodeBlock),
    Divider,
    Table(Table),
    TableRow(TableRow),
    Image(Image),
}

impl Block {
    /// Empty paragraph used to space out non-prose blocks.
    pub fn spacer() -> Self {
        Block::Paragraph(TextBlock::default())
    }

    /// The `type` tag of this block, also used as its payload key.
    pub fn block_type(&self) -> &'static str {
        match self {
            Block::Paragraph(_) => "paragraph",
            Block::Heading { level: 1, .. } => "heading_1",
            Block::Heading { level: 2, .. } => "heading_2",
            Block::Heading { .. } => "heading_3",
            Block::Quote(_) => "quote",
            Block::BulletedListItem(_) => "bulleted_list_item",
            Block::NumberedListItem(_) => "numbered_list_item",
            Block::ToDo { .. } => "to_do",
            Block::Code(_) => "code",
            Block::Divider => "divider",
            Block::Table(_) => "table",
            Block::TableRow(_) => "table_row",
            Block::Image(_) => "image",
        }
    }

    /// Text payload for blocks that carry one.
    pub fn text_block(&self) -> Option<&TextBlock> {
        match self {
            Block::Paragraph(body)
            | Block::Heading { body, .. }
            | Block::Quote(body)
            | Block::BulletedListItem(body)
            | Block::NumberedListItem(body)
            | Block::ToDo { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn text_block_mut(&mut self) -> Option<&mut TextBlock> {
        match self {
            Block::Paragraph(body)
            | Block::Heading { body, .. }
            | Block::Quote(body)
            | Block::BulletedListItem(body)
            | Block::NumberedListItem(body)
            | Block::ToDo { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Nested child blocks, empty for leaf block types.
    pub fn children(&self) -> &[Block] {
        match self {
            Block::Table(table) => &table.children,
            _ => self
                .text_block()
                .map(|body| body.children.as_slice())
                .unwrap_or_default(),
        }
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[derive(serde::Serialize)]
struct ToDoPayload<'a> {
    #[serde(flatten)]
    body: &'a TextBlock,
    checked: bool,
}

#[derive(serde::Serialize)]
struct ExternalFile<'a> {
    url: &'a str,
}

#[derive(serde::Serialize)]
struct ImagePayload<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    external: ExternalFile<'a>,
}

#[derive(serde::Serialize)]
struct EmptyPayload {}

impl Serialize for Block {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let block_type = self.block_type();
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("object", "block")?;
        map.serialize_entry("type", block_type)?;
        match self {
            Block::Paragraph(body)
            | Block::Heading { body, .. }
            | Block::Quote(body)
            | Block::BulletedListItem(body)
            | Block::NumberedListItem(body) => map.serialize_entry(block_type, body)?,
            Block::ToDo { body, checked } => map.serialize_entry(
                block_type,
                &ToDoPayload {
                    body,
                    checked: *checked,
                },
            )?,
            Block::Code(code) => map.serialize_entry(block_type, code)?,
            Block::Divider => map.serialize_entry(block_type, &EmptyPayload {})?,
            Block::Table(table) => map.serialize_entry(block_type, table)?,
            Block::TableRow(row) => map.serialize_entry(block_type, row)?,
            Block::Image(image) => map.serialize_entry(
                block_type,
                &ImagePayload {
                    kind: "external",
                    external: ExternalFile { url: &image.url },
                },
            )?,
        }
        map.end()
    }
}
