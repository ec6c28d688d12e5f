//! # Block Mutations
//!
//! Pure operations on a [`Template`]: each takes the current template and
//! returns the next one without touching the input.
//!
//! Every operation returns a [`Cow`]. `Cow::Borrowed` means the mutation was a
//! no-op and the caller can keep the template it already has, which keeps
//! no-op edits out of the undo history.
//!
//! ## Semantics
//!
//! - After any operation the blocks of the touched page have orders `1..=N`
//!   matching their array position, and ids stay unique within the page.
//! - Updates, deletes, duplicates and reorders that reference an unknown block
//!   id are no-ops, not errors: the UI can hold stale ids during rapid edits.
//! - Reorder places the dragged block immediately before the target, in both
//!   drag directions.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use time::OffsetDateTime;
use tracing::warn;

use crate::block::{Block, NewBlock};
use crate::template::{Template, TemplateStyles};

/// A user-initiated edit, as sent by the UI layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Mutation {
    /// Append a block to the end of a page
    AddBlock { page: String, block: NewBlock },

    /// Replace a block in place, keeping its position
    UpdateBlock { page: String, block: Block },

    /// Remove a block from a page
    DeleteBlock { page: String, block_id: String },

    /// Move `dragged_id` right before `target_id`
    ReorderBlock {
        page: String,
        dragged_id: String,
        target_id: String,
    },

    /// Insert a copy of a block right after it
    DuplicateBlock { page: String, block_id: String },

    /// Create a page if it does not exist yet
    EnsurePage { page: String },

    /// Replace the template-wide theme
    SetStyles { styles: TemplateStyles },
}

impl Mutation {
    /// Compute the template that results from applying this mutation
    pub fn apply<'a>(&self, template: &'a Template) -> Cow<'a, Template> {
        match self {
            Mutation::AddBlock { page, block } => add_block(template, page, block.clone()),
            Mutation::UpdateBlock { page, block } => update_block(template, page, block.clone()),
            Mutation::DeleteBlock { page, block_id } => delete_block(template, page, block_id),
            Mutation::ReorderBlock {
                page,
                dragged_id,
                target_id,
            } => reorder_block(template, page, dragged_id, target_id),
            Mutation::DuplicateBlock { page, block_id } => {
                duplicate_block(template, page, block_id)
            }
            Mutation::EnsurePage { page } => ensure_page(template, page),
            Mutation::SetStyles { styles } => set_styles(template, styles),
        }
    }

    /// The page this mutation touches, if any
    pub fn page(&self) -> Option<&str> {
        match self {
            Mutation::AddBlock { page, .. }
            | Mutation::UpdateBlock { page, .. }
            | Mutation::DeleteBlock { page, .. }
            | Mutation::ReorderBlock { page, .. }
            | Mutation::DuplicateBlock { page, .. }
            | Mutation::EnsurePage { page } => Some(page),
            Mutation::SetStyles { .. } => None,
        }
    }

    /// Debug name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::AddBlock { .. } => "add-block",
            Mutation::UpdateBlock { .. } => "update-block",
            Mutation::DeleteBlock { .. } => "delete-block",
            Mutation::ReorderBlock { .. } => "reorder-block",
            Mutation::DuplicateBlock { .. } => "duplicate-block",
            Mutation::EnsurePage { .. } => "ensure-page",
            Mutation::SetStyles { .. } => "set-styles",
        }
    }
}

/// Append a block to `page`, creating the page if needed
///
/// The block gets `order = len + 1`. A missing id, or one already used on the
/// page, is replaced with a generated `{kind}-{nanos}` id.
pub fn add_block<'a>(template: &'a Template, page: &str, block: NewBlock) -> Cow<'a, Template> {
    let mut next = template.clone();
    let blocks = next.pages.entry(page.to_string()).or_default();

    let id = match block.id.clone() {
        Some(id) if !id.is_empty() && !blocks.iter().any(|b| b.id == id) => id,
        Some(id) if !id.is_empty() => {
            warn!(page, block_id = %id, "Block id already used on page, generating a new one");
            generate_block_id(&block, blocks)
        }
        _ => generate_block_id(&block, blocks),
    };

    let order = blocks.len() as u32 + 1;
    blocks.push(block.place(id, order));
    Cow::Owned(next)
}

/// Replace the block with the same id, keeping its order
pub fn update_block<'a>(template: &'a Template, page: &str, mut block: Block) -> Cow<'a, Template> {
    let Some(index) = position(template, page, &block.id) else {
        return Cow::Borrowed(template);
    };

    let mut next = template.clone();
    if let Some(blocks) = next.pages.get_mut(page) {
        block.order = blocks[index].order;
        blocks[index] = block;
    }
    Cow::Owned(next)
}

/// Remove a block and renumber the rest of the page
pub fn delete_block<'a>(template: &'a Template, page: &str, block_id: &str) -> Cow<'a, Template> {
    let Some(index) = position(template, page, block_id) else {
        return Cow::Borrowed(template);
    };

    let mut next = template.clone();
    if let Some(blocks) = next.pages.get_mut(page) {
        blocks.remove(index);
        renumber(blocks);
    }
    Cow::Owned(next)
}

/// Move `dragged_id` to the slot immediately before `target_id`
///
/// The target index is resolved after the dragged block has been taken out,
/// so the dragged block always ends up directly in front of the target
/// whichever direction it travels.
pub fn reorder_block<'a>(
    template: &'a Template,
    page: &str,
    dragged_id: &str,
    target_id: &str,
) -> Cow<'a, Template> {
    if dragged_id == target_id {
        return Cow::Borrowed(template);
    }
    let (Some(from), Some(to)) = (
        position(template, page, dragged_id),
        position(template, page, target_id),
    ) else {
        return Cow::Borrowed(template);
    };
    if from + 1 == to {
        // already right before the target
        return Cow::Borrowed(template);
    }

    let mut next = template.clone();
    if let Some(blocks) = next.pages.get_mut(page) {
        let dragged = blocks.remove(from);
        let insert_at = if from < to { to - 1 } else { to };
        blocks.insert(insert_at, dragged);
        renumber(blocks);
    }
    Cow::Owned(next)
}

/// Insert a copy of a block directly after its source, with a fresh id
pub fn duplicate_block<'a>(template: &'a Template, page: &str, block_id: &str) -> Cow<'a, Template> {
    let Some(index) = position(template, page, block_id) else {
        return Cow::Borrowed(template);
    };

    let mut next = template.clone();
    if let Some(blocks) = next.pages.get_mut(page) {
        let source = NewBlock::from(blocks[index].clone());
        let id = generate_block_id(&source, blocks);
        blocks.insert(index + 1, source.place(id, 0));
        renumber(blocks);
    }
    Cow::Owned(next)
}

/// Add `page` as an empty page if it is missing
pub fn ensure_page<'a>(template: &'a Template, page: &str) -> Cow<'a, Template> {
    if template.has_page(page) {
        return Cow::Borrowed(template);
    }
    let mut next = template.clone();
    next.pages.insert(page.to_string(), Vec::new());
    Cow::Owned(next)
}

/// Replace the template-wide styles
pub fn set_styles<'a>(template: &'a Template, styles: &TemplateStyles) -> Cow<'a, Template> {
    if &template.styles == styles {
        return Cow::Borrowed(template);
    }
    let mut next = template.clone();
    next.styles = styles.clone();
    Cow::Owned(next)
}

fn position(template: &Template, page: &str, block_id: &str) -> Option<usize> {
    template
        .page(page)?
        .iter()
        .position(|block| block.id == block_id)
}

fn renumber(blocks: &mut [Block]) {
    for (index, block) in blocks.iter_mut().enumerate() {
        block.order = index as u32 + 1;
    }
}

/// `{kind}-{unix nanos}`, with a `-N` suffix if that is already taken
fn generate_block_id(block: &NewBlock, existing: &[Block]) -> String {
    let base = format!(
        "{}-{}",
        block.kind,
        OffsetDateTime::now_utc().unix_timestamp_nanos()
    );
    let taken = |candidate: &str| existing.iter().any(|b| b.id == candidate);

    if !taken(&base) {
        return base;
    }
    let mut suffix = 2;
    loop {
        let candidate = format!("{}-{}", base, suffix);
        if !taken(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}
