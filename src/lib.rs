mod block;
mod config;
mod error;
mod handler;
mod inline;
mod language;
mod links;
mod list;
mod token;
mod transform;
pub mod upload;

pub use block::{
    Annotations, Block, CodeBlock, Image, Link, MAX_CHILDREN_PER_REQUEST, MAX_TEXT_LENGTH,
    RichText, Table, TableRow, TextBlock, TextContent,
};
pub use config::{Config, UploadOptions};
pub use error::Error;
pub use inline::{fold_invalid_targets, process_inline};
pub use language::{FALLBACK_LANGUAGE, resolve_language};
pub use links::is_valid_url;
pub use list::{ListKind, nest_items, reclassify_todo};
pub use token::{Token, TokenKind, tokenize};
pub use transform::{BlockUnit, group_units, transform_bytes};

/// Convert markdown text into API blocks.
pub fn markdown_to_blocks(markdown: &str) -> Vec<Block> {
    transform::transform(markdown)
}

/// Convert markdown text into the JSON array of blocks sent to the API.
pub fn markdown_to_json(markdown: &str) -> serde_json::Value {
    serde_json::to_value(markdown_to_blocks(markdown)).unwrap_or_default()
}

/// Convert raw file contents into request-sized batches of blocks.
pub fn bytes_to_batches(bytes: &[u8], batch_size: usize) -> Result<Vec<Vec<Block>>, Error> {
    let blocks = transform_bytes(bytes)?;
    Ok(upload::batches(&blocks, batch_size)
        .map(<[Block]>::to_vec)
        .collect())
}
