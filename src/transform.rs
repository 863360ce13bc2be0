use tracing::{debug, warn};

use crate::block::Block;
use crate::error::Error;
use crate::handler;
use crate::token::{Token, TokenKind, tokenize};

/// A contiguous run of tokens forming one top-level construct.
pub type BlockUnit<'a> = &'a [Token];

/// Convert Markdown text into blocks.
///
/// Every block other than a paragraph or heading is followed by an empty
/// paragraph.
pub fn transform(markdown: &str) -> Vec<Block> {
    // `[x]::y` would otherwise be read as a link reference definition
    let markdown = markdown.replace("]::", "]:: ");
    let tokens = tokenize(&markdown);

    let mut blocks = Vec::new();
    for unit in group_units(&tokens) {
        let Some(first) = unit.first() else {
            continue;
        };
        debug!(kind = first.kind.name(), tokens = unit.len(), "dispatching block unit");

        let produced = match first.kind {
            TokenKind::HeadingOpen => handler::heading(unit),
            TokenKind::ParagraphOpen => handler::paragraph(unit),
            TokenKind::Fence | TokenKind::CodeBlock => handler::fence(unit),
            TokenKind::BlockquoteOpen => handler::blockquote(unit),
            TokenKind::BulletListOpen => handler::bullet_list(unit),
            TokenKind::OrderedListOpen => handler::ordered_list(unit),
            TokenKind::Hr => handler::divider(unit),
            TokenKind::TableOpen => handler::table(unit),
            TokenKind::HtmlBlock => handler::html_block(unit),
            other => {
                warn!(kind = other.name(), "unhandled block token");
                Vec::new()
            }
        };

        if produced.is_empty() {
            continue;
        }
        blocks.extend(produced);
        if !matches!(first.kind, TokenKind::ParagraphOpen | TokenKind::HeadingOpen) {
            blocks.push(Block::spacer());
        }
    }

    blocks
}

/// Like [`transform`], for raw file contents.
pub fn transform_bytes(bytes: &[u8]) -> Result<Vec<Block>, Error> {
    let markdown = std::str::from_utf8(bytes).map_err(|source| Error::InvalidInput {
        reason: format!("markdown is not valid UTF-8: {source}"),
    })?;
    Ok(transform(markdown))
}

/// Split a token stream into balanced block units.
///
/// A unit that starts with an opening token ends at the close that brings the
/// depth back to zero; any other token is a unit by itself. Trailing tokens
/// of an unbalanced unit are dropped.
pub fn group_units(tokens: &[Token]) -> Vec<BlockUnit<'_>> {
    let mut units = Vec::new();
    let mut start = 0;
    let mut depth: i32 = 0;

    for (index, token) in tokens.iter().enumerate() {
        depth += i32::from(token.nesting);
        let first = &tokens[start];
        if !first.is_open() || (depth == 0 && token.is_close() && first.tag == token.tag) {
            units.push(&tokens[start..=index]);
            start = index + 1;
        }
    }

    units
}
