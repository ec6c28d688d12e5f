//! Built-in starting templates
//!
//! A session with no persisted record starts from one of these. They are
//! never cached or saved until the user edits and saves them.

use serde_json::json;

use crate::block::{Block, BlockKind, BlockStyles};
use crate::template::{Template, TemplateStyles, pages};

/// Ids of the built-in catalog
pub const BUILTIN_TEMPLATE_IDS: [&str; 3] = ["modern", "minimal", "boutique"];

/// The built-in template for `template_id`, or a blank four-page template
pub fn fallback_template(template_id: &str) -> Template {
    builtin_template(template_id).unwrap_or_else(|| blank_template(template_id))
}

/// Look up a template from the built-in catalog
pub fn builtin_template(template_id: &str) -> Option<Template> {
    match template_id {
        "modern" => Some(modern()),
        "minimal" => Some(minimal()),
        "boutique" => Some(boutique()),
        _ => None,
    }
}

/// Template with empty `home`, `product`, `category` and `contact` pages
pub fn blank_template(template_id: &str) -> Template {
    let mut template = Template::new(template_id, "Untitled store");
    template.category = "general".to_string();
    for page in [pages::HOME, pages::PRODUCT, pages::CATEGORY, pages::CONTACT] {
        template.pages.insert(page.to_string(), Vec::new());
    }
    template
}

fn block(id: &str, kind: BlockKind, order: u32, content: serde_json::Value) -> Block {
    Block {
        id: id.to_string(),
        kind,
        content,
        styles: BlockStyles::default(),
        order,
    }
}

fn modern() -> Template {
    let mut template = blank_template("modern");
    template.name = "Modern".to_string();
    template.category = "fashion".to_string();
    template.description = "Bold hero, product grid and social proof".to_string();
    template.thumbnail = "/thumbnails/modern.png".to_string();
    template.styles = TemplateStyles {
        primary_color: "#0f172a".to_string(),
        secondary_color: "#6366f1".to_string(),
        font_family: "Inter, sans-serif".to_string(),
    };
    template.pages.insert(
        pages::HOME.to_string(),
        vec![
            block("header-1", BlockKind::Header, 1, json!({ "logo": "", "links": ["Shop", "About"] })),
            block("hero-1", BlockKind::Hero, 2, json!({ "title": "New season", "cta": "Shop now" })),
            block("products-1", BlockKind::Products, 3, json!({ "title": "Best sellers", "limit": 8 })),
            block("testimonials-1", BlockKind::Testimonials, 4, json!({ "items": [] })),
            block("footer-1", BlockKind::Footer, 5, json!({ "copyright": "" })),
        ],
    );
    template.pages.insert(
        pages::PRODUCT.to_string(),
        vec![block("product-detail-1", BlockKind::ProductDetail, 1, json!({ "showReviews": true }))],
    );
    template
}

fn minimal() -> Template {
    let mut template = blank_template("minimal");
    template.name = "Minimal".to_string();
    template.category = "general".to_string();
    template.description = "Clean layout with lots of white space".to_string();
    template.thumbnail = "/thumbnails/minimal.png".to_string();
    template.styles = TemplateStyles {
        primary_color: "#111111".to_string(),
        secondary_color: "#e5e5e5".to_string(),
        font_family: "Helvetica, Arial, sans-serif".to_string(),
    };
    template.pages.insert(
        pages::HOME.to_string(),
        vec![
            block("hero-1", BlockKind::Hero, 1, json!({ "title": "Less, but better" })),
            block("products-1", BlockKind::Products, 2, json!({ "limit": 4 })),
        ],
    );
    template
}

fn boutique() -> Template {
    let mut template = blank_template("boutique");
    template.name = "Boutique".to_string();
    template.category = "jewelry".to_string();
    template.description = "Curated collections with cart and checkout pages".to_string();
    template.thumbnail = "/thumbnails/boutique.png".to_string();
    template.styles = TemplateStyles {
        primary_color: "#3f2a1d".to_string(),
        secondary_color: "#d4af37".to_string(),
        font_family: "Georgia, serif".to_string(),
    };
    template.pages.insert(
        pages::HOME.to_string(),
        vec![
            block("hero-1", BlockKind::Hero, 1, json!({ "title": "Handmade pieces" })),
            block("categories-1", BlockKind::Categories, 2, json!({ "layout": "grid" })),
            block("newsletter-1", BlockKind::Newsletter, 3, json!({ "title": "Stay in touch" })),
        ],
    );
    template.pages.insert(
        pages::CART.to_string(),
        vec![block("cart-1", BlockKind::Cart, 1, json!({}))],
    );
    template.pages.insert(
        pages::CHECKOUT.to_string(),
        vec![block("checkout-1", BlockKind::Checkout, 1, json!({ "guestCheckout": true }))],
    );
    template
}
