//! Content blocks placed on template pages

use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of block kinds a page can hold
///
/// Renderers dispatch on the kind; the editor itself never looks inside
/// [`Block::content`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockKind {
    Header,
    Hero,
    Text,
    Image,
    Products,
    ProductDetail,
    Categories,
    Features,
    Testimonials,
    Gallery,
    Newsletter,
    Contact,
    Cart,
    Checkout,
    Footer,
}

impl BlockKind {
    /// Stable slug used in generated block ids and serialized data
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Header => "header",
            BlockKind::Hero => "hero",
            BlockKind::Text => "text",
            BlockKind::Image => "image",
            BlockKind::Products => "products",
            BlockKind::ProductDetail => "product-detail",
            BlockKind::Categories => "categories",
            BlockKind::Features => "features",
            BlockKind::Testimonials => "testimonials",
            BlockKind::Gallery => "gallery",
            BlockKind::Newsletter => "newsletter",
            BlockKind::Contact => "contact",
            BlockKind::Cart => "cart",
            BlockKind::Checkout => "checkout",
            BlockKind::Footer => "footer",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-block presentation overrides
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockStyles {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<String>,
}

/// A block as stored on a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Unique within its page
    pub id: String,

    #[serde(rename = "type")]
    pub kind: BlockKind,

    /// Kind-specific payload, opaque to the editor
    #[serde(default)]
    pub content: serde_json::Value,

    #[serde(default)]
    pub styles: BlockStyles,

    /// 1-based position on the page
    pub order: u32,
}

/// A block that has not been placed on a page yet
///
/// The mutation engine assigns `order`, and an id when none is given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "type")]
    pub kind: BlockKind,

    #[serde(default)]
    pub content: serde_json::Value,

    #[serde(default)]
    pub styles: BlockStyles,
}

impl NewBlock {
    pub fn new(kind: BlockKind) -> Self {
        Self {
            id: None,
            kind,
            content: serde_json::Value::Null,
            styles: BlockStyles::default(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_content(mut self, content: serde_json::Value) -> Self {
        self.content = content;
        self
    }

    pub fn with_styles(mut self, styles: BlockStyles) -> Self {
        self.styles = styles;
        self
    }

    /// Place the block with a resolved id and order
    pub(crate) fn place(self, id: String, order: u32) -> Block {
        Block {
            id,
            kind: self.kind,
            content: self.content,
            styles: self.styles,
            order,
        }
    }
}

impl From<Block> for NewBlock {
    fn from(block: Block) -> Self {
        Self {
            id: Some(block.id),
            kind: block.kind,
            content: block.content,
            styles: block.styles,
        }
    }
}
