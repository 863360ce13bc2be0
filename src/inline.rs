//! Inline tokens to rich text runs.
//!
//! Styling is tracked with a single open span: when spans nest, the inner
//! span's annotations land on the same run as the outer one and the run is
//! emitted at the first close. `**a _b_ c**` therefore yields one bold+italic
//! run `"a b"` followed by a plain run `" c"`.

use tracing::warn;

use crate::block::{Block, Image, Link, RichText, STRIKETHROUGH_COLOR};
use crate::links::{decode_target, is_valid_url};
use crate::token::{Token, TokenKind};

/// Replace links with unusable targets and images with non-http sources by
/// their literal Markdown text.
///
/// An invalid link span collapses to one text token `[text](href)` built from
/// the text and code it encloses; markup inside the span is dropped.
pub fn fold_invalid_targets(children: &[Token]) -> Vec<Token> {
    let mut folded = Vec::with_capacity(children.len());
    // (decoded href, enclosed text) of the invalid link being folded
    let mut pending: Option<(String, String)> = None;

    for child in children {
        match child.kind {
            TokenKind::LinkOpen if pending.is_none() => {
                let href = child.attr("href").unwrap_or_default();
                if is_valid_url(href) {
                    folded.push(child.clone());
                } else {
                    pending = Some((decode_target(href).into_owned(), String::new()));
                }
            }
            TokenKind::LinkClose if pending.is_some() => {
                if let Some((href, text)) = pending.take() {
                    folded.push(Token::text(format!("[{text}]({href})"), child.level));
                }
            }
            _ if pending.is_some() => {
                if let (Some((_, text)), TokenKind::Text | TokenKind::CodeInline) =
                    (pending.as_mut(), child.kind)
                {
                    text.push_str(&child.content);
                }
            }
            TokenKind::Image if !child.attr("src").unwrap_or_default().starts_with("http") => {
                let src = decode_target(child.attr("src").unwrap_or_default());
                folded.push(Token::text(
                    format!("![{}]({src})", child.content),
                    child.level,
                ));
            }
            _ => folded.push(child.clone()),
        }
    }

    folded
}

/// Turn an inline token's children into rich text runs plus the blocks that
/// cannot live inline (images).
pub fn process_inline(token: &Token) -> (Vec<RichText>, Vec<Block>) {
    let children = fold_invalid_targets(&token.children);

    let mut rich_texts: Vec<RichText> = Vec::new();
    let mut block_children = Vec::new();
    let mut open_span: Option<RichText> = None;

    for child in &children {
        if child.kind == TokenKind::Image {
            block_children.push(Block::Image(Image {
                url: child.attr("src").unwrap_or_default().to_string(),
            }));
            continue;
        }

        let in_span = open_span.is_some();
        let mut run = open_span.take().unwrap_or_else(RichText::styled);

        match child.kind {
            TokenKind::Text | TokenKind::HtmlInline => run.text.content.push_str(&child.content),
            TokenKind::StrikethroughOpen => {
                let annotations = run.annotations_mut();
                annotations.strikethrough = true;
                annotations.color = Some(STRIKETHROUGH_COLOR.to_string());
            }
            TokenKind::StrongOpen => run.annotations_mut().bold = true,
            TokenKind::EmOpen => run.annotations_mut().italic = true,
            TokenKind::CodeInline => {
                run.text.content.push_str(&child.content);
                run.annotations_mut().code = true;
            }
            TokenKind::LinkOpen => {
                let url = child.attr("href").unwrap_or_default().to_string();
                run.text.link = Some(Link { url: url.clone() });
                run.href = Some(url);
            }
            TokenKind::Hardbreak | TokenKind::Softbreak => {
                if let Some(last) = rich_texts.last_mut() {
                    last.text.content.push('\n');
                }
            }
            _ if !child.is_close() => {
                warn!(kind = child.kind.name(), content = %child.content, "unhandled inline token");
            }
            _ => {}
        }

        if child.is_open() {
            open_span = Some(run);
        } else if child.is_close() {
            if in_span {
                rich_texts.push(run);
            }
        } else if in_span {
            open_span = Some(run);
        } else {
            rich_texts.push(run);
        }
    }

    (rich_texts, block_children)
}
