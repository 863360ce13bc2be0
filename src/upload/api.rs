use crate::block::Block;
use crate::error::Error;

/// The remote page API the uploader drives.
///
/// Implementations own transport, authentication and retries.
pub trait PageApi {
    /// Create a page titled `title` under `parent_id`, returning the new page id.
    fn create_page(&mut self, parent_id: &str, title: &str, children: &[Block])
    -> Result<String, Error>;

    /// Append `children` to the end of an existing block or page.
    fn append_children(&mut self, block_id: &str, children: &[Block]) -> Result<(), Error>;
}

/// A recorded call against [`MemoryApi`]
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    CreatePage {
        parent_id: String,
        title: String,
        page_id: String,
        children: usize,
    },
    AppendChildren {
        block_id: String,
        children: usize,
    },
}

/// In-process [`PageApi`] that hands out sequential ids and records calls.
///
/// Pages whose title is listed in `fail_titles` are rejected.
#[derive(Debug, Default)]
pub struct MemoryApi {
    pub calls: Vec<ApiCall>,
    pub fail_titles: Vec<String>,
    next_id: usize,
}

impl MemoryApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(titles: &[&str]) -> Self {
        Self {
            fail_titles: titles.iter().map(|title| title.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn created_titles(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                ApiCall::CreatePage { title, .. } => Some(title.as_str()),
                ApiCall::AppendChildren { .. } => None,
            })
            .collect()
    }
}

impl PageApi for MemoryApi {
    fn create_page(
        &mut self,
        parent_id: &str,
        title: &str,
        children: &[Block],
    ) -> Result<String, Error> {
        if self.fail_titles.iter().any(|failing| failing == title) {
            return Err(Error::api(format!("rejected page {title}")));
        }

        self.next_id += 1;
        let page_id = format!("page-{}", self.next_id);
        self.calls.push(ApiCall::CreatePage {
            parent_id: parent_id.to_string(),
            title: title.to_string(),
            page_id: page_id.clone(),
            children: children.len(),
        });
        Ok(page_id)
    }

    fn append_children(&mut self, block_id: &str, children: &[Block]) -> Result<(), Error> {
        self.calls.push(ApiCall::AppendChildren {
            block_id: block_id.to_string(),
            children: children.len(),
        });
        Ok(())
    }
}
