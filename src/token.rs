use std::collections::BTreeMap;
use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use tracing::debug;

/// Kinds of tokens in the flat document stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Block containers
    ParagraphOpen,
    ParagraphClose,
    HeadingOpen,
    HeadingClose,
    BlockquoteOpen,
    BlockquoteClose,
    BulletListOpen,
    BulletListClose,
    OrderedListOpen,
    OrderedListClose,
    ListItemOpen,
    ListItemClose,
    TableOpen,
    TableClose,
    TheadOpen,
    TheadClose,
    TrOpen,
    TrClose,
    ThOpen,
    ThClose,
    TdOpen,
    TdClose,

    // Self-contained blocks
    Fence,
    CodeBlock,
    HtmlBlock,
    Hr,
    Inline,

    // Inline children
    Text,
    CodeInline,
    HtmlInline,
    Softbreak,
    Hardbreak,
    Image,
    StrongOpen,
    StrongClose,
    EmOpen,
    EmClose,
    StrikethroughOpen,
    StrikethroughClose,
    LinkOpen,
    LinkClose,
}

impl TokenKind {
    /// Conventional snake_case name, used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::ParagraphOpen => "paragraph_open",
            TokenKind::ParagraphClose => "paragraph_close",
            TokenKind::HeadingOpen => "heading_open",
            TokenKind::HeadingClose => "heading_close",
            TokenKind::BlockquoteOpen => "blockquote_open",
            TokenKind::BlockquoteClose => "blockquote_close",
            TokenKind::BulletListOpen => "bullet_list_open",
            TokenKind::BulletListClose => "bullet_list_close",
            TokenKind::OrderedListOpen => "ordered_list_open",
            TokenKind::OrderedListClose => "ordered_list_close",
            TokenKind::ListItemOpen => "list_item_open",
            TokenKind::ListItemClose => "list_item_close",
            TokenKind::TableOpen => "table_open",
            TokenKind::TableClose => "table_close",
            TokenKind::TheadOpen => "thead_open",
            TokenKind::TheadClose => "thead_close",
            TokenKind::TrOpen => "tr_open",
            TokenKind::TrClose => "tr_close",
            TokenKind::ThOpen => "th_open",
            TokenKind::ThClose => "th_close",
            TokenKind::TdOpen => "td_open",
            TokenKind::TdClose => "td_close",
            TokenKind::Fence => "fence",
            TokenKind::CodeBlock => "code_block",
            TokenKind::HtmlBlock => "html_block",
            TokenKind::Hr => "hr",
            TokenKind::Inline => "inline",
            TokenKind::Text => "text",
            TokenKind::CodeInline => "code_inline",
            TokenKind::HtmlInline => "html_inline",
            TokenKind::Softbreak => "softbreak",
            TokenKind::Hardbreak => "hardbreak",
            TokenKind::Image => "image",
            TokenKind::StrongOpen => "strong_open",
            TokenKind::StrongClose => "strong_close",
            TokenKind::EmOpen => "em_open",
            TokenKind::EmClose => "em_close",
            TokenKind::StrikethroughOpen => "s_open",
            TokenKind::StrikethroughClose => "s_close",
            TokenKind::LinkOpen => "link_open",
            TokenKind::LinkClose => "link_close",
        }
    }
}

/// A parsed Markdown element.
///
/// `nesting` is +1 for an opening token, -1 for a closing one and 0 for
/// self-contained tokens. `level` is the block depth (or, for inline
/// children, the inline span depth) at which the token occurs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub tag: &'static str,
    pub nesting: i8,
    pub level: usize,
    pub attrs: BTreeMap<&'static str, String>,
    /// Info string of a fenced code block.
    pub info: String,
    pub content: String,
    /// Only populated on `Inline` tokens.
    pub children: Vec<Token>,
}

impl Token {
    pub fn new(kind: TokenKind, tag: &'static str, nesting: i8, level: usize) -> Self {
        Self {
            kind,
            tag,
            nesting,
            level,
            attrs: BTreeMap::new(),
            info: String::new(),
            content: String::new(),
            children: Vec::new(),
        }
    }

    /// A plain text token.
    pub fn text(content: impl Into<String>, level: usize) -> Self {
        Self {
            content: content.into(),
            ..Self::new(TokenKind::Text, "", 0, level)
        }
    }

    pub fn with_attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attrs.insert(name, value.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn is_open(&self) -> bool {
        self.nesting > 0
    }

    pub fn is_close(&self) -> bool {
        self.nesting < 0
    }
}

/// Parse Markdown into a flat token stream.
///
/// Tables and strikethrough are enabled; task lists are not, so checkbox
/// prefixes on list items stay in the item text.
pub fn tokenize(markdown: &str) -> Vec<Token> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(markdown, options);
    let mut state = TokenState::new(markdown);

    for (event, range) in parser.into_offset_iter() {
        process_event(event, range, &mut state);
    }

    state.flush_inline();
    state.tokens
}

struct TokenState<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    depth: usize,

    // Inline run being collected for the current leaf block
    inline: Option<InlineBuilder>,

    // Code and HTML blocks are buffered until their end event
    code: Option<CodeBuffer>,
    html: Option<String>,

    // Alt text of an image is collected into a single token
    image: Option<ImageBuffer>,

    in_table_head: bool,
}

struct InlineBuilder {
    level: usize,
    depth: usize,
    span: Option<Range<usize>>,
    children: Vec<Token>,
}

struct CodeBuffer {
    kind: TokenKind,
    info: String,
    content: String,
}

struct ImageBuffer {
    src: String,
    title: String,
    alt: String,
    start: usize,
}

impl<'a> TokenState<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            tokens: Vec::new(),
            depth: 0,
            inline: None,
            code: None,
            html: None,
            image: None,
            in_table_head: false,
        }
    }

    fn open_block(&mut self, kind: TokenKind, tag: &'static str) {
        self.flush_inline();
        self.tokens.push(Token::new(kind, tag, 1, self.depth));
        self.depth += 1;
    }

    fn close_block(&mut self, kind: TokenKind, tag: &'static str) {
        self.flush_inline();
        self.depth = self.depth.saturating_sub(1);
        self.tokens.push(Token::new(kind, tag, -1, self.depth));
    }

    fn leaf_block(&mut self, token: Token) {
        self.flush_inline();
        self.tokens.push(token);
    }

    /// Start an inline run eagerly, so blocks like empty table cells still
    /// produce an (empty) inline token.
    fn begin_inline(&mut self) {
        self.inline = Some(InlineBuilder {
            level: self.depth,
            depth: 0,
            span: None,
            children: Vec::new(),
        });
    }

    fn push_inline(&mut self, mut token: Token, range: Range<usize>) {
        if self.inline.is_none() {
            self.begin_inline();
        }
        let Some(builder) = self.inline.as_mut() else {
            return;
        };

        builder.span = Some(match builder.span.take() {
            Some(span) => span.start.min(range.start)..span.end.max(range.end),
            None => range,
        });

        if token.is_close() {
            builder.depth = builder.depth.saturating_sub(1);
        }
        token.level = builder.depth;
        if token.is_open() {
            builder.depth += 1;
        }

        // Adjacent text pieces form one token
        if token.kind == TokenKind::Text {
            if let Some(last) = builder.children.last_mut() {
                if last.kind == TokenKind::Text {
                    last.content.push_str(&token.content);
                    return;
                }
            }
        }
        builder.children.push(token);
    }

    fn flush_inline(&mut self) {
        if let Some(builder) = self.inline.take() {
            let content = builder
                .span
                .and_then(|span| self.source.get(span))
                .unwrap_or_default();
            let mut token = Token::new(TokenKind::Inline, "", 0, builder.level).with_content(content);
            token.children = builder.children;
            self.tokens.push(token);
        }
    }
}

fn process_event(event: Event, range: Range<usize>, state: &mut TokenState) {
    // Image alt text
    if let Some(image) = state.image.as_mut() {
        match event {
            Event::Text(text) | Event::Code(text) => image.alt.push_str(&text),
            Event::End(TagEnd::Image) => {
                if let Some(image) = state.image.take() {
                    let token = Token::new(TokenKind::Image, "img", 0, 0)
                        .with_attr("src", image.src)
                        .with_attr("title", image.title)
                        .with_content(image.alt);
                    state.push_inline(token, image.start..range.end);
                }
            }
            _ => {}
        }
        return;
    }

    // Code block body
    if let Some(code) = state.code.as_mut() {
        match event {
            Event::Text(text) => code.content.push_str(&text),
            Event::End(TagEnd::CodeBlock) => {
                if let Some(code) = state.code.take() {
                    let mut token =
                        Token::new(code.kind, "code", 0, state.depth).with_content(code.content);
                    token.info = code.info;
                    state.leaf_block(token);
                }
            }
            _ => {}
        }
        return;
    }

    // Raw HTML block body
    if let Some(html) = state.html.as_mut() {
        match event {
            Event::Html(text) | Event::Text(text) => html.push_str(&text),
            Event::End(TagEnd::HtmlBlock) => {
                if let Some(html) = state.html.take() {
                    let token = Token::new(TokenKind::HtmlBlock, "", 0, state.depth).with_content(html);
                    state.leaf_block(token);
                }
            }
            _ => {}
        }
        return;
    }

    match event {
        // Leaf blocks holding inline content
        Event::Start(Tag::Paragraph) => {
            state.open_block(TokenKind::ParagraphOpen, "p");
            state.begin_inline();
        }
        Event::End(TagEnd::Paragraph) => state.close_block(TokenKind::ParagraphClose, "p"),
        Event::Start(Tag::Heading { level, .. }) => {
            state.open_block(TokenKind::HeadingOpen, heading_tag(level));
            state.begin_inline();
        }
        Event::End(TagEnd::Heading(level)) => {
            state.close_block(TokenKind::HeadingClose, heading_tag(level))
        }

        // Containers
        Event::Start(Tag::BlockQuote(_)) => {
            state.open_block(TokenKind::BlockquoteOpen, "blockquote")
        }
        Event::End(TagEnd::BlockQuote(_)) => {
            state.close_block(TokenKind::BlockquoteClose, "blockquote")
        }
        Event::Start(Tag::List(Some(_))) => state.open_block(TokenKind::OrderedListOpen, "ol"),
        Event::Start(Tag::List(None)) => state.open_block(TokenKind::BulletListOpen, "ul"),
        Event::End(TagEnd::List(true)) => state.close_block(TokenKind::OrderedListClose, "ol"),
        Event::End(TagEnd::List(false)) => state.close_block(TokenKind::BulletListClose, "ul"),
        Event::Start(Tag::Item) => state.open_block(TokenKind::ListItemOpen, "li"),
        Event::End(TagEnd::Item) => state.close_block(TokenKind::ListItemClose, "li"),

        // Tables
        Event::Start(Tag::Table(_)) => state.open_block(TokenKind::TableOpen, "table"),
        Event::End(TagEnd::Table) => state.close_block(TokenKind::TableClose, "table"),
        Event::Start(Tag::TableHead) => {
            state.in_table_head = true;
            state.open_block(TokenKind::TheadOpen, "thead");
            state.open_block(TokenKind::TrOpen, "tr");
        }
        Event::End(TagEnd::TableHead) => {
            state.close_block(TokenKind::TrClose, "tr");
            state.close_block(TokenKind::TheadClose, "thead");
            state.in_table_head = false;
        }
        Event::Start(Tag::TableRow) => state.open_block(TokenKind::TrOpen, "tr"),
        Event::End(TagEnd::TableRow) => state.close_block(TokenKind::TrClose, "tr"),
        Event::Start(Tag::TableCell) => {
            if state.in_table_head {
                state.open_block(TokenKind::ThOpen, "th");
            } else {
                state.open_block(TokenKind::TdOpen, "td");
            }
            state.begin_inline();
        }
        Event::End(TagEnd::TableCell) => {
            if state.in_table_head {
                state.close_block(TokenKind::ThClose, "th");
            } else {
                state.close_block(TokenKind::TdClose, "td");
            }
        }

        // Self-contained blocks
        Event::Start(Tag::CodeBlock(kind)) => {
            state.flush_inline();
            state.code = Some(match kind {
                CodeBlockKind::Fenced(info) => CodeBuffer {
                    kind: TokenKind::Fence,
                    info: info.into_string(),
                    content: String::new(),
                },
                CodeBlockKind::Indented => CodeBuffer {
                    kind: TokenKind::CodeBlock,
                    info: String::new(),
                    content: String::new(),
                },
            });
        }
        Event::Start(Tag::HtmlBlock) => {
            state.flush_inline();
            state.html = Some(String::new());
        }
        Event::Rule => state.leaf_block(Token::new(TokenKind::Hr, "hr", 0, state.depth)),

        // Inline spans
        Event::Start(Tag::Strong) => {
            state.push_inline(Token::new(TokenKind::StrongOpen, "strong", 1, 0), range)
        }
        Event::End(TagEnd::Strong) => {
            state.push_inline(Token::new(TokenKind::StrongClose, "strong", -1, 0), range)
        }
        Event::Start(Tag::Emphasis) => {
            state.push_inline(Token::new(TokenKind::EmOpen, "em", 1, 0), range)
        }
        Event::End(TagEnd::Emphasis) => {
            state.push_inline(Token::new(TokenKind::EmClose, "em", -1, 0), range)
        }
        Event::Start(Tag::Strikethrough) => {
            state.push_inline(Token::new(TokenKind::StrikethroughOpen, "s", 1, 0), range)
        }
        Event::End(TagEnd::Strikethrough) => {
            state.push_inline(Token::new(TokenKind::StrikethroughClose, "s", -1, 0), range)
        }
        Event::Start(Tag::Link { dest_url, .. }) => {
            let token = Token::new(TokenKind::LinkOpen, "a", 1, 0).with_attr("href", dest_url.into_string());
            state.push_inline(token, range);
        }
        Event::End(TagEnd::Link) => {
            state.push_inline(Token::new(TokenKind::LinkClose, "a", -1, 0), range)
        }
        Event::Start(Tag::Image {
            dest_url, title, ..
        }) => {
            state.image = Some(ImageBuffer {
                src: dest_url.into_string(),
                title: title.into_string(),
                alt: String::new(),
                start: range.start,
            });
        }

        // Inline leaves
        Event::Text(text) => state.push_inline(Token::text(text.into_string(), 0), range),
        Event::Code(code) => {
            let token = Token::new(TokenKind::CodeInline, "code", 0, 0).with_content(code.into_string());
            state.push_inline(token, range);
        }
        Event::InlineHtml(html) | Event::Html(html) => {
            let token = Token::new(TokenKind::HtmlInline, "", 0, 0).with_content(html.into_string());
            state.push_inline(token, range);
        }
        Event::SoftBreak => state.push_inline(Token::new(TokenKind::Softbreak, "br", 0, 0), range),
        Event::HardBreak => state.push_inline(Token::new(TokenKind::Hardbreak, "br", 0, 0), range),

        other => debug!(event = ?other, "ignoring markdown event"),
    }
}

fn heading_tag(level: HeadingLevel) -> &'static str {
    match level {
        HeadingLevel::H1 => "h1",
        HeadingLevel::H2 => "h2",
        HeadingLevel::H3 => "h3",
        HeadingLevel::H4 => "h4",
        HeadingLevel::H5 => "h5",
        HeadingLevel::H6 => "h6",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|token| token.kind).collect()
    }

    #[test]
    fn heading_wraps_a_single_inline_token() {
        let tokens = tokenize("# Title\n");

        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::HeadingOpen, TokenKind::Inline, TokenKind::HeadingClose]
        );
        assert_eq!(tokens[0].tag, "h1");
        assert_eq!(tokens[1].content, "Title");
        assert_eq!(tokens[1].children, vec![Token::text("Title", 0)]);
    }

    #[test]
    fn list_item_levels_follow_nesting() {
        let tokens = tokenize("- a\n  - b\n    - c\n");
        let levels: Vec<usize> = tokens
            .iter()
            .filter(|token| token.kind == TokenKind::ListItemOpen)
            .map(|token| token.level)
            .collect();

        assert_eq!(levels, vec![1, 3, 5]);
        assert_eq!(tokens.iter().map(|t| i32::from(t.nesting)).sum::<i32>(), 0);
    }

    #[test]
    fn checkbox_prefix_stays_in_one_text_token() {
        let tokens = tokenize("- [x] Done\n");
        let inline = tokens
            .iter()
            .find(|token| token.kind == TokenKind::Inline)
            .unwrap();

        assert_eq!(inline.children.len(), 1);
        assert_eq!(inline.children[0].content, "[x] Done");
    }

    #[test]
    fn fence_carries_info_and_body() {
        let tokens = tokenize("```rust\nfn main() {}\n```\n");

        assert_eq!(kinds(&tokens), vec![TokenKind::Fence]);
        assert_eq!(tokens[0].info, "rust");
        assert_eq!(tokens[0].content, "fn main() {}\n");
    }

    #[test]
    fn image_collects_alt_text() {
        let tokens = tokenize("![a *cat*](https://example.com/cat.png)\n");
        let image = &tokens[1].children[0];

        assert_eq!(image.kind, TokenKind::Image);
        assert_eq!(image.attr("src"), Some("https://example.com/cat.png"));
        assert_eq!(image.content, "a cat");
    }

    #[test]
    fn inline_spans_nest() {
        let tokens = tokenize("**bold _both_**\n");
        let children = &tokens[1].children;

        assert_eq!(
            kinds(children),
            vec![
                TokenKind::StrongOpen,
                TokenKind::Text,
                TokenKind::EmOpen,
                TokenKind::Text,
                TokenKind::EmClose,
                TokenKind::StrongClose,
            ]
        );
        assert_eq!(children[2].level, 1);
        assert_eq!(children[3].level, 2);
    }

    #[test]
    fn table_head_gets_its_own_row() {
        let tokens = tokenize("| A | B |\n|---|---|\n| 1 | 2 |\n");

        assert_eq!(tokens.first().map(|t| t.kind), Some(TokenKind::TableOpen));
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::TableClose));
        assert_eq!(tokens.iter().filter(|t| t.kind == TokenKind::TrClose).count(), 2);
        assert_eq!(tokens.iter().filter(|t| t.kind == TokenKind::ThOpen).count(), 2);
        let cells: Vec<&str> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Inline)
            .map(|t| t.content.as_str())
            .collect();
        assert_eq!(cells, vec!["A", "B", "1", "2"]);
    }

    #[test]
    fn html_block_is_buffered() {
        let tokens = tokenize("<div>\nhello\n</div>\n");

        assert_eq!(kinds(&tokens), vec![TokenKind::HtmlBlock]);
        assert!(tokens[0].content.starts_with("<div>"));
    }
}
