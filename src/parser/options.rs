//! Configuration. Plain records with `Default`; no global state. Emoji
//! alias tables are owned by the options and therefore by whoever owns the
//! parse.

use rustc_hash::FxHashMap;

/// Umbrella options struct.
#[derive(Default, Debug, Clone)]
pub struct Options {
    /// Enable GFM extensions.
    pub extension: ExtensionOptions,

    /// Configure parse-time options.
    pub parse: ParseOptions,

    /// Configure render-time options.
    pub render: RenderOptions,
}

/// Options to select extensions.
#[derive(Default, Debug, Clone)]
pub struct ExtensionOptions {
    /// Enables the GFM table extension.
    ///
    /// ```
    /// # use roundmark::{markdown_to_markdown, Options};
    /// let mut options = Options::default();
    /// options.extension.table = true;
    /// assert_eq!(markdown_to_markdown("|a|b|\n|:-|-:|\n|1|2|\n", &options),
    ///            "| a | b |\n| :-- | --: |\n| 1 | 2 |\n");
    /// ```
    pub table: bool,

    /// Enables `~~strikethrough~~` from the GFM spec. Only double-tilde
    /// runs delimit; a single `~` stays literal.
    pub strikethrough: bool,

    /// Enables `[ ]` / `[x]` task-list markers at list-item start.
    pub tasklist: bool,

    /// Recognizes bare URLs, `www.` domains and email addresses as links,
    /// per the GFM autolink extension.
    pub autolink: bool,

    /// Recognizes `:alias:` emoji.
    ///
    /// An alias resolves through [`ExtensionOptions::emoji_aliases`] first
    /// (producing an image-backed emoji), then through the built-in
    /// shortcode table (producing a Unicode emoji). Unresolved aliases
    /// stay literal text.
    pub emoji: bool,

    /// Alias → image URL overrides for the `emoji` extension.
    pub emoji_aliases: FxHashMap<String, String>,

    /// Generates a unique anchor slug from each heading's text, stored as
    /// an `id` attribute on the heading node and visible in the JSON
    /// serialization.
    pub heading_anchor: bool,
}

/// Options for parser functions.
#[derive(Default, Debug, Clone)]
pub struct ParseOptions {
    /// When set, occurrences of this byte sequence in inline text are
    /// preserved as zero-width caret nodes and re-emitted verbatim by the
    /// renderer, so WYSIWYG editors can round-trip a cursor position. The
    /// sequence itself is opaque to the engine.
    pub caret_marker: Option<String>,

    /// The default info string for fenced code blocks without one.
    pub default_info_string: Option<String>,
}

/// Options for the Markdown renderer.
#[derive(Default, Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Renders soft breaks as hard breaks.
    ///
    /// ```
    /// # use roundmark::{markdown_to_markdown, Options};
    /// let mut options = Options::default();
    /// assert_eq!(markdown_to_markdown("a\nb\n", &options), "a\nb\n");
    /// options.render.hardbreaks = true;
    /// assert_eq!(markdown_to_markdown("a\nb\n", &options), "a\\\nb\n");
    /// ```
    pub hardbreaks: bool,

    /// The bullet marker used for unordered list items.
    pub list_style: ListStyleType,
}

/// The bullet character for rendered unordered lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListStyleType {
    /// The `-` character.
    #[default]
    Dash = 45,
    /// The `+` character.
    Plus = 43,
    /// The `*` character.
    Star = 42,
}
