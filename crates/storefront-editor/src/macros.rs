//! Macros for ergonomic block and identifier definition

/// Declare a string-backed identifier newtype
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub String);

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

pub(crate) use string_id;

/// Build a [`NewBlock`](crate::NewBlock) with JSON content
///
/// # Examples
///
/// ```rust
/// use storefront_editor::{new_block, BlockKind};
///
/// let hero = new_block!(Hero);
/// assert_eq!(hero.kind, BlockKind::Hero);
///
/// let banner = new_block!(Hero, { "title": "Spring sale", "cta": "Shop now" });
/// assert_eq!(banner.content["title"], "Spring sale");
/// ```
#[macro_export]
macro_rules! new_block {
    ($kind:ident) => {
        $crate::NewBlock::new($crate::BlockKind::$kind)
    };

    ($kind:ident, $($content:tt)+) => {
        $crate::NewBlock::new($crate::BlockKind::$kind)
            .with_content($crate::serde_json::json!($($content)+))
    };
}
