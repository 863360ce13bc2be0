//! One handler per block-level construct. Each consumes a block unit and
//! returns the blocks it produces.

use crate::block::{Block, CodeBlock, MAX_TEXT_LENGTH, RichText, Table, TableRow, TextBlock};
use crate::inline::process_inline;
use crate::language::resolve_language;
use crate::list::{ListKind, list_items, reclassify_todo};
use crate::token::{Token, TokenKind};

fn text_blocks(unit: &[Token], make: impl Fn(TextBlock) -> Block) -> Vec<Block> {
    unit.iter()
        .filter(|token| token.kind == TokenKind::Inline)
        .map(|token| {
            let (rich_text, children) = process_inline(token);
            make(TextBlock::new(rich_text, children))
        })
        .collect()
}

/// Headings deeper than three collapse to `heading_3`.
pub fn heading(unit: &[Token]) -> Vec<Block> {
    let level = unit
        .first()
        .and_then(|token| token.tag.strip_prefix('h'))
        .and_then(|digits| digits.parse::<u8>().ok())
        .unwrap_or(1)
        .clamp(1, 3);

    text_blocks(unit, |body| Block::Heading { level, body })
}

pub fn paragraph(unit: &[Token]) -> Vec<Block> {
    text_blocks(unit, Block::Paragraph)
}

pub fn blockquote(unit: &[Token]) -> Vec<Block> {
    text_blocks(unit, Block::Quote)
}

/// Fenced and indented code. Bodies longer than [`MAX_TEXT_LENGTH`] are split
/// across several runs.
pub fn fence(unit: &[Token]) -> Vec<Block> {
    unit.iter()
        .map(|token| {
            Block::Code(CodeBlock {
                rich_text: split_text(token.content.trim()),
                language: resolve_language(&token.info).to_string(),
            })
        })
        .collect()
}

/// Raw HTML is kept verbatim as an `html` code block.
pub fn html_block(unit: &[Token]) -> Vec<Block> {
    unit.iter()
        .map(|token| {
            Block::Code(CodeBlock {
                rich_text: vec![RichText::plain(token.content.trim())],
                language: "html".to_string(),
            })
        })
        .collect()
}

pub fn divider(unit: &[Token]) -> Vec<Block> {
    unit.iter().map(|_| Block::Divider).collect()
}

/// Bulleted items whose text starts with a checkbox become to-do items.
pub fn bullet_list(unit: &[Token]) -> Vec<Block> {
    list_items(unit, ListKind::Bulleted)
        .into_iter()
        .map(reclassify_todo)
        .collect()
}

pub fn ordered_list(unit: &[Token]) -> Vec<Block> {
    list_items(unit, ListKind::Numbered)
}

/// Tables keep their rows in order; the first row fixes `table_width`.
///
/// Cells hold their raw source text as a single run, with escaped pipes
/// unescaped.
pub fn table(unit: &[Token]) -> Vec<Block> {
    let mut table = Table::default();
    let mut current_row: Option<TableRow> = None;
    let mut width_fixed = false;

    for token in unit {
        match token.kind {
            TokenKind::TheadOpen => table.has_column_header = true,
            TokenKind::ThOpen | TokenKind::TdOpen => {
                current_row.get_or_insert_with(TableRow::default);
            }
            TokenKind::Inline => {
                if let Some(row) = current_row.as_mut() {
                    row.cells.push(vec![RichText::plain(token.content.replace("\\|", "|"))]);
                }
            }
            TokenKind::TrClose => {
                if let Some(row) = current_row.take() {
                    if !width_fixed {
                        table.table_width = row.cells.len();
                        width_fixed = true;
                    }
                    table.children.push(Block::TableRow(row));
                }
            }
            _ => {}
        }
    }

    vec![Block::Table(table)]
}

/// Split text into plain runs of at most [`MAX_TEXT_LENGTH`] characters.
pub fn split_text(text: &str) -> Vec<RichText> {
    if text.chars().count() <= MAX_TEXT_LENGTH {
        return vec![RichText::plain(text)];
    }

    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(MAX_TEXT_LENGTH)
        .map(|chunk| RichText::plain(chunk.iter().collect::<String>()))
        .collect()
}
