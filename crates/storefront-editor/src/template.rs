//! Multi-page storefront templates

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::block::Block;
use crate::error::{EditorError, Result};
use crate::macros::string_id;

string_id!(
    /// Identifier of the storefront a template belongs to
    StoreId
);
string_id!(
    /// Unique identifier for a template
    TemplateId
);
string_id!(
    /// Identifier assigned by the persistence service to a saved record
    RecordId
);

/// Well-known page names
pub mod pages {
    pub const HOME: &str = "home";
    pub const PRODUCT: &str = "product";
    pub const CATEGORY: &str = "category";
    pub const CONTACT: &str = "contact";
    pub const CART: &str = "cart";
    pub const CHECKOUT: &str = "checkout";
}

/// Template-wide theme
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateStyles {
    pub primary_color: String,
    pub secondary_color: String,
    pub font_family: String,
}

impl Default for TemplateStyles {
    fn default() -> Self {
        Self {
            primary_color: "#111827".to_string(),
            secondary_color: "#f59e0b".to_string(),
            font_family: "Inter, sans-serif".to_string(),
        }
    }
}

/// A storefront template: global styles plus an ordered block list per page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,

    /// Human-readable name
    pub name: String,

    pub category: String,

    pub description: String,

    /// Preview image URL
    pub thumbnail: String,

    pub styles: TemplateStyles,

    /// Page name to blocks, each list ordered by `Block::order`
    pub pages: BTreeMap<String, Vec<Block>>,
}

impl Template {
    /// Create an empty template with no pages
    pub fn new(id: impl Into<TemplateId>, name: impl Into<String>) -> Self {
        Template {
            id: id.into(),
            name: name.into(),
            category: String::new(),
            description: String::new(),
            thumbnail: String::new(),
            styles: TemplateStyles::default(),
            pages: BTreeMap::new(),
        }
    }

    /// Create a new template builder
    pub fn builder(id: impl Into<TemplateId>) -> TemplateBuilder {
        TemplateBuilder::new(id.into())
    }

    /// Blocks of a page, if the page exists
    pub fn page(&self, name: &str) -> Option<&[Block]> {
        self.pages.get(name).map(Vec::as_slice)
    }

    pub fn has_page(&self, name: &str) -> bool {
        self.pages.contains_key(name)
    }

    /// Find a block by id on a page
    pub fn block(&self, page: &str, block_id: &str) -> Option<&Block> {
        self.pages
            .get(page)
            .and_then(|blocks| blocks.iter().find(|b| b.id == block_id))
    }

    pub fn block_count(&self) -> usize {
        self.pages.values().map(Vec::len).sum()
    }

    /// Check the page/order invariants on every page
    ///
    /// Orders must be exactly 1..N in array order and ids unique per page.
    pub fn validate(&self) -> Result<()> {
        for (name, blocks) in &self.pages {
            validate_page(name, blocks)?;
        }
        Ok(())
    }
}

fn validate_page(name: &str, blocks: &[Block]) -> Result<()> {
    let mut seen = HashSet::with_capacity(blocks.len());
    for (index, block) in blocks.iter().enumerate() {
        let expected = index as u32 + 1;
        if block.order != expected {
            return Err(EditorError::invariant(format!(
                "page '{}': block '{}' has order {} at position {}",
                name, block.id, block.order, expected
            )));
        }
        if !seen.insert(block.id.as_str()) {
            return Err(EditorError::invariant(format!(
                "page '{}': duplicate block id '{}'",
                name, block.id
            )));
        }
    }
    Ok(())
}

/// Builder for creating templates with a fluent API
#[derive(Debug)]
pub struct TemplateBuilder {
    template: Template,
}

impl TemplateBuilder {
    pub fn new(id: TemplateId) -> Self {
        TemplateBuilder {
            template: Template::new(id, ""),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.template.name = name.into();
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.template.category = category.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.template.description = description.into();
        self
    }

    pub fn thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.template.thumbnail = thumbnail.into();
        self
    }

    pub fn styles(mut self, styles: TemplateStyles) -> Self {
        self.template.styles = styles;
        self
    }

    /// Add a page; block orders are renumbered to match the given sequence
    pub fn page(mut self, name: impl Into<String>, blocks: Vec<Block>) -> Self {
        let blocks = blocks
            .into_iter()
            .enumerate()
            .map(|(index, mut block)| {
                block.order = index as u32 + 1;
                block
            })
            .collect();
        self.template.pages.insert(name.into(), blocks);
        self
    }

    /// Build the template, rejecting duplicate block ids
    pub fn build(self) -> Result<Template> {
        if self.template.name.is_empty() {
            return Err(EditorError::invariant("template name is required"));
        }
        self.template.validate()?;
        Ok(self.template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockKind, BlockStyles};

    fn block(id: &str, order: u32) -> Block {
        Block {
            id: id.to_string(),
            kind: BlockKind::Text,
            content: serde_json::Value::Null,
            styles: BlockStyles::default(),
            order,
        }
    }

    #[test]
    fn test_builder_renumbers_pages() {
        let template = Template::builder("t1")
            .name("Shop")
            .page(pages::HOME, vec![block("a", 7), block("b", 3)])
            .build()
            .unwrap();

        let home = template.page(pages::HOME).unwrap();
        assert_eq!(home[0].order, 1);
        assert_eq!(home[1].order, 2);
        assert_eq!(template.block_count(), 2);
    }

    #[test]
    fn test_builder_rejects_duplicate_ids() {
        let result = Template::builder("t1")
            .name("Shop")
            .page(pages::HOME, vec![block("a", 1), block("a", 2)])
            .build();
        assert!(matches!(result, Err(EditorError::InvariantViolation(_))));
    }

    #[test]
    fn test_validate_detects_gap_in_order() {
        let mut template = Template::new("t1", "Shop");
        template
            .pages
            .insert(pages::HOME.to_string(), vec![block("a", 1), block("b", 3)]);
        assert!(template.validate().is_err());
    }

    #[test]
    fn test_template_serializes_camel_case_styles() {
        let template = Template::new("t1", "Shop");
        let value = serde_json::to_value(&template).unwrap();
        assert!(value["styles"].get("primaryColor").is_some());
        assert!(value["styles"].get("fontFamily").is_some());
    }
}
