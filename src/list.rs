use crate::block::{Block, TextBlock};
use crate::inline::process_inline;
use crate::token::{Token, TokenKind};

const UNCHECKED_PREFIXES: [&str; 2] = ["[] ", "[ ] "];
const CHECKED_PREFIXES: [&str; 4] = ["[x] ", "[X] ", "[ x ] ", "[ X ] "];

/// Which list item block a list produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Bulleted,
    Numbered,
}

impl ListKind {
    pub fn item(self, body: TextBlock) -> Block {
        match self {
            ListKind::Bulleted => Block::BulletedListItem(body),
            ListKind::Numbered => Block::NumberedListItem(body),
        }
    }
}

/// Build the nested list items of one list unit.
///
/// Every inline token becomes an item of `kind`, tagged with the level of the
/// list item that encloses it; items of nested lists take the outer list's
/// kind.
pub fn list_items(unit: &[Token], kind: ListKind) -> Vec<Block> {
    let mut items = Vec::new();
    let mut level = 0;

    for token in unit {
        match token.kind {
            TokenKind::ListItemOpen => level = token.level,
            TokenKind::Inline => {
                let (rich_text, children) = process_inline(token);
                items.push((level, kind.item(TextBlock::new(rich_text, children))));
            }
            _ => {}
        }
    }

    nest_items(items)
}

/// Rebuild the item tree from `(level, item)` pairs in document order.
///
/// An item becomes a child of the closest preceding item with a smaller
/// level, or a root when there is none. Levels never end up in the output.
pub fn nest_items(items: Vec<(usize, Block)>) -> Vec<Block> {
    let mut roots = Vec::new();
    let mut stack: Vec<(usize, Block)> = Vec::new();

    for (level, item) in items {
        while stack.last().is_some_and(|(top, _)| *top >= level) {
            if let Some((_, done)) = stack.pop() {
                attach(&mut stack, &mut roots, done);
            }
        }
        stack.push((level, item));
    }

    while let Some((_, done)) = stack.pop() {
        attach(&mut stack, &mut roots, done);
    }

    roots
}

fn attach(stack: &mut [(usize, Block)], roots: &mut Vec<Block>, item: Block) {
    match stack.last_mut().and_then(|(_, parent)| parent.text_block_mut()) {
        Some(parent) => parent.children.push(item),
        None => roots.push(item),
    }
}

/// Turn bulleted items starting with a checkbox prefix into to-do items,
/// recursing into children either way.
///
/// Every prefix is tried in order and the last match decides the state.
pub fn reclassify_todo(block: Block) -> Block {
    match block {
        Block::BulletedListItem(mut body) => {
            body.children = body.children.into_iter().map(reclassify_todo).collect();

            let Some((prefix, checked)) = body.rich_text.first().and_then(|run| checkbox(run.content()))
            else {
                return Block::BulletedListItem(body);
            };
            if let Some(first) = body.rich_text.first_mut() {
                first.text.content.replace_range(..prefix.len(), "");
            }
            Block::ToDo { body, checked }
        }
        other => other,
    }
}

fn checkbox(content: &str) -> Option<(&'static str, bool)> {
    let prefixes = UNCHECKED_PREFIXES
        .iter()
        .map(|prefix| (*prefix, false))
        .chain(CHECKED_PREFIXES.iter().map(|prefix| (*prefix, true)));

    let mut matched = None;
    for (prefix, checked) in prefixes {
        if content.starts_with(prefix) {
            matched = Some((prefix, checked));
        }
    }
    matched
}
