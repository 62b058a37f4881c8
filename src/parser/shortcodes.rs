//! Emoji alias resolution for the `emoji` extension.

use crate::nodes::NodeEmoji;
use crate::parser::Options;

impl NodeEmoji {
    /// Resolves an alias against the caller's alias → image URL map, then
    /// against the built-in shortcode table ("gemoji" names).
    pub fn resolve(alias: &str, options: &Options) -> Option<NodeEmoji> {
        if let Some(url) = options.extension.emoji_aliases.get(alias) {
            return Some(NodeEmoji {
                alias: alias.to_string(),
                unicode: None,
                img_url: Some(url.clone()),
            });
        }

        let emoji = emojis::get_by_shortcode(alias)?;
        Some(NodeEmoji {
            alias: alias.to_string(),
            unicode: Some(emoji.to_string()),
            img_url: None,
        })
    }
}
