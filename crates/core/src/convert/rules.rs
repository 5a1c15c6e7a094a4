//! Tag table of the Markdown converter.
//!
//! Layout produced by rules is written with private-use placeholders instead
//! of literal whitespace, so the final pass can collapse source whitespace
//! without touching it.

/// Line break placeholder.
pub const BRK: char = '\u{E000}';
/// Tab placeholder.
pub const TAB: char = '\u{E001}';
/// Non-collapsible space placeholder.
pub const SPACE: char = '\u{E002}';

const NL: &str = "\u{E000}";
const NL2: &str = "\u{E000}\u{E000}";

/// How an element's converted children are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// `prefix + trimmed children + suffix`, or nothing when the children
    /// are blank.
    Wrap { prefix: &'static str, suffix: &'static str },
    /// Element and content are dropped.
    Suppress,
    /// Children unchanged.
    PassThrough,
    Heading(usize),
    Blockquote,
    UnorderedList,
    OrderedList,
    ListItem,
    Link,
    Image,
    LineBreak,
    HorizontalRule,
    Preformatted,
    Code,
    Table,
    TableHead,
    TableBody,
    TableRow,
    TableCell,
}

const fn wrap(prefix: &'static str, suffix: &'static str) -> Rule {
    Rule::Wrap { prefix, suffix }
}

/// Looks up the rule for a lowercase tag name. Unknown tags pass through.
pub fn rule_for(tag: &str) -> Rule {
    match tag {
        "script" | "style" | "noscript" | "iframe" | "head" | "title" | "template" | "svg" => Rule::Suppress,

        "p" => wrap(NL2, NL2),
        "div" | "section" | "article" | "header" | "footer" | "main" | "figure" | "figcaption" => wrap(NL, NL),
        "h1" => Rule::Heading(1),
        "h2" => Rule::Heading(2),
        "h3" => Rule::Heading(3),
        "h4" => Rule::Heading(4),
        "h5" => Rule::Heading(5),
        "h6" => Rule::Heading(6),
        "blockquote" => Rule::Blockquote,
        "ul" => Rule::UnorderedList,
        "ol" => Rule::OrderedList,
        "li" => Rule::ListItem,
        "hr" => Rule::HorizontalRule,
        "br" => Rule::LineBreak,
        "pre" => Rule::Preformatted,

        "span" => wrap(" ", " "),
        "strong" | "b" => wrap(" **", "** "),
        "em" | "i" | "cite" => wrap(" _", "_ "),
        "del" | "strike" => wrap("~", "~"),
        "s" => wrap("~~", "~~"),
        "code" => Rule::Code,
        "a" => Rule::Link,
        "img" => Rule::Image,

        "table" => Rule::Table,
        "thead" => Rule::TableHead,
        "tbody" => Rule::TableBody,
        "tr" => Rule::TableRow,
        "th" | "td" => Rule::TableCell,

        _ => Rule::PassThrough,
    }
}

/// Lazy-loading attributes tried, in order, when `src` is not absolute.
pub const LAZY_IMAGE_ATTRIBUTES: [&str; 4] = ["data-original", "data_original", "data-src", "srcset"];

/// Path fragments an image URL must contain to be rendered.
pub const SAFE_IMAGE_EXTENSIONS: [&str; 4] = [".webp", ".jpg", ".jpeg", ".png"];

/// Link targets that render as bare text.
pub const BARE_LINK_PREFIXES: [&str; 3] = ["javascript", "#", "/"];

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("script", Rule::Suppress)]
    #[case("iframe", Rule::Suppress)]
    #[case("h3", Rule::Heading(3))]
    #[case("b", Rule::Wrap { prefix: " **", suffix: "** " })]
    #[case("cite", Rule::Wrap { prefix: " _", suffix: "_ " })]
    #[case("td", Rule::TableCell)]
    #[case("caption", Rule::PassThrough)]
    #[case("u", Rule::PassThrough)]
    #[case("custom-element", Rule::PassThrough)]
    fn test_rule_for(#[case] tag: &str, #[case] expected: Rule) {
        assert_eq!(rule_for(tag), expected);
    }
}
