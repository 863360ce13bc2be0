//! Uploading a folder tree of Markdown files as nested pages.
//!
//! Every folder becomes a page and every `.md` file a page holding its
//! transformed blocks. Each entry's progress is recorded in an [`UploadLog`]
//! keyed by [`item_hash`], so a rerun skips what already succeeded.

pub mod api;
pub mod log;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::block::Block;
use crate::config::UploadOptions;
use crate::error::Error;
use crate::transform::transform_bytes;

pub use api::{ApiCall, MemoryApi, PageApi};
pub use log::{
    ErrorEntry, JsonFileLog, LogEntry, LogRecord, MemoryLog, UploadLog, UploadStatus, item_hash,
};

/// Counts of what a run did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadSummary {
    pub uploaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub struct Uploader<A: PageApi, L: UploadLog> {
    api: A,
    log: L,
    options: UploadOptions,
}

/// Split blocks into request-sized batches, preserving order.
pub fn batches(blocks: &[Block], batch_size: usize) -> std::slice::Chunks<'_, Block> {
    blocks.chunks(batch_size.max(1))
}

/// True when `dir` holds no Markdown file at any depth.
pub fn is_empty_folder(dir: &Path) -> Result<bool, Error> {
    for entry in sorted_entries(dir)? {
        if entry.is_dir() {
            if !is_empty_folder(&entry)? {
                return Ok(false);
            }
        } else if is_markdown(&entry) {
            return Ok(false);
        }
    }
    Ok(true)
}

fn is_markdown(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "md")
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut entries = fs::read_dir(dir)
        .map_err(|source| Error::io(dir, source))?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| Error::io(dir, source))?;
    entries.sort();
    Ok(entries)
}

fn log_entry(
    path: &Path,
    parent_id: &str,
    page_id: Option<String>,
    title: &str,
    status: UploadStatus,
) -> LogEntry {
    LogEntry {
        path: path.to_string_lossy().into_owned(),
        parent_page_id: parent_id.to_string(),
        page_id,
        title: title.to_string(),
        timestamp: log::timestamp(),
        status,
    }
}

fn title_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl<A: PageApi, L: UploadLog> Uploader<A, L> {
    pub fn new(api: A, log: L, options: UploadOptions) -> Self {
        Self { api, log, options }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    pub fn into_parts(self) -> (A, L) {
        (self.api, self.log)
    }

    /// Upload the contents of `dir` under the page `parent_id`.
    ///
    /// Fails only on local I/O or log persistence errors, or with
    /// [`Error::Halted`] when `halt_on_error` is set and an entry failed.
    pub fn upload_folder(&mut self, dir: &Path, parent_id: &str) -> Result<UploadSummary, Error> {
        let mut summary = UploadSummary::default();
        if !self.skip_empty_folder(dir, &mut summary)? {
            self.upload_folder_into(dir, parent_id, &mut summary)?;
        }
        Ok(summary)
    }

    /// Re-drive the folders containing every entry whose latest status is `failed`.
    pub fn retry_failed(&mut self) -> Result<UploadSummary, Error> {
        let mut summary = UploadSummary::default();
        for entry in self.log.failed() {
            let path = PathBuf::from(&entry.path);
            if !path.exists() {
                warn!(path = %path.display(), "failed entry no longer exists");
                continue;
            }
            info!(path = %path.display(), "retrying upload");
            let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
            if !self.skip_empty_folder(&dir, &mut summary)? {
                self.upload_folder_into(&dir, &entry.parent_page_id, &mut summary)?;
            }
        }
        Ok(summary)
    }

    /// True (and counted as skipped) when `dir` holds no Markdown and empty
    /// folders are not uploaded.
    fn skip_empty_folder(&self, dir: &Path, summary: &mut UploadSummary) -> Result<bool, Error> {
        if self.options.add_empty_folders || !is_empty_folder(dir)? {
            return Ok(false);
        }
        info!(path = %dir.display(), "skipping empty folder");
        summary.skipped += 1;
        Ok(true)
    }

    /// Walk `dir`, whose own emptiness has already been checked by the caller.
    fn upload_folder_into(
        &mut self,
        dir: &Path,
        parent_id: &str,
        summary: &mut UploadSummary,
    ) -> Result<(), Error> {
        for path in sorted_entries(dir)? {
            let path_str = path.to_string_lossy().into_owned();
            let hash = item_hash(&path_str, parent_id);

            let uploaded = self
                .log
                .get(&hash)
                .filter(|record| record.latest_status == Some(UploadStatus::Success))
                .map(|record| record.latest().and_then(|entry| entry.page_id.clone()));
            if let Some(page_id) = uploaded {
                summary.skipped += 1;
                if path.is_dir() {
                    info!(path = %path.display(), "folder already uploaded");
                    if let Some(page_id) = page_id {
                        self.upload_folder_into(&path, &page_id, summary)?;
                    }
                } else {
                    info!(path = %path.display(), "file already uploaded");
                }
                continue;
            }

            if path.is_dir() {
                if self.skip_empty_folder(&path, summary)? {
                    continue;
                }
                if let Some(page_id) = self.upload_entry(&path, &hash, parent_id, summary)? {
                    self.upload_folder_into(&path, &page_id, summary)?;
                }
            } else if is_markdown(&path) {
                self.upload_entry(&path, &hash, parent_id, summary)?;
            }
        }

        Ok(())
    }

    /// Upload one folder or file as a page, recording its progress.
    ///
    /// Returns the new page id, or `None` when the entry was skipped or failed
    /// without halting the run.
    fn upload_entry(
        &mut self,
        path: &Path,
        hash: &str,
        parent_id: &str,
        summary: &mut UploadSummary,
    ) -> Result<Option<String>, Error> {
        let title = title_of(path);
        let is_dir = path.is_dir();

        let transformed = if is_dir {
            None
        } else {
            match fs::read(path) {
                Ok(bytes) => {
                    if !self.options.add_empty_pages && bytes.iter().all(u8::is_ascii_whitespace) {
                        info!(path = %path.display(), "skipping empty file");
                        summary.skipped += 1;
                        return Ok(None);
                    }
                    Some(transform_bytes(&bytes))
                }
                Err(source) => Some(Err(Error::io(path, source))),
            }
        };

        self.log.record(
            hash,
            log_entry(path, parent_id, None, &title, UploadStatus::InProgress),
        )?;

        let mut sent: Option<Vec<Block>> = None;
        let outcome = match transformed {
            None => self.api.create_page(parent_id, &title, &[]),
            Some(Ok(blocks)) => {
                let result = self.create_document(parent_id, &title, &blocks);
                sent = Some(blocks);
                result
            }
            Some(Err(err)) => Err(err),
        };

        match outcome {
            Ok(page_id) => {
                self.log.record(
                    hash,
                    log_entry(
                        path,
                        parent_id,
                        Some(page_id.clone()),
                        &title,
                        UploadStatus::Success,
                    ),
                )?;
                info!(path = %path.display(), page_id = %page_id, "uploaded");
                summary.uploaded += 1;
                Ok(Some(page_id))
            }
            Err(err) => {
                error!(path = %path.display(), error = %err, "upload failed");
                summary.failed += 1;
                self.log.record(
                    hash,
                    log_entry(path, parent_id, None, &title, UploadStatus::Failed),
                )?;
                let notion_objects = sent
                    .as_ref()
                    .and_then(|blocks| serde_json::to_value(blocks).ok());
                self.log.record_error(
                    hash,
                    ErrorEntry {
                        path: path.to_string_lossy().into_owned(),
                        parent_page_id: parent_id.to_string(),
                        title,
                        error: err.to_string(),
                        timestamp: log::timestamp(),
                        notion_objects,
                    },
                )?;
                self.quarantine(path);

                if self.options.halt_on_error {
                    return Err(Error::Halted {
                        path: path.to_path_buf(),
                    });
                }
                Ok(None)
            }
        }
    }

    /// Small documents go out with the create call; larger ones are appended
    /// in order after creating an empty page.
    fn create_document(
        &mut self,
        parent_id: &str,
        title: &str,
        blocks: &[Block],
    ) -> Result<String, Error> {
        let batch_size = self.options.effective_batch_size();
        if blocks.len() <= batch_size {
            return self.api.create_page(parent_id, title, blocks);
        }

        let page_id = self.api.create_page(parent_id, title, &[])?;
        for batch in batches(blocks, batch_size) {
            self.api.append_children(&page_id, batch)?;
        }
        Ok(page_id)
    }

    /// Copy a failed file aside for inspection. Folders are not copied.
    fn quarantine(&self, path: &Path) {
        let Some(dir) = &self.options.quarantine_dir else {
            return;
        };
        if path.is_dir() {
            warn!(path = %path.display(), "not copying failed folder");
            return;
        }

        let result = fs::create_dir_all(dir).and_then(|_| {
            let target = dir.join(path.file_name().unwrap_or_default());
            fs::copy(path, target)
        });
        if let Err(err) = result {
            warn!(path = %path.display(), error = %err, "could not copy failed file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write(dir: &Path, relative: &str, content: &str) {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn batches_keep_order_and_limit() {
        let blocks: Vec<Block> = (0..250).map(|_| Block::Divider).collect();
        let sizes: Vec<usize> = batches(&blocks, 100).map(<[Block]>::len).collect();

        assert_eq!(sizes, vec![100, 100, 50]);
    }

    #[test]
    fn empty_folder_detection_looks_deep() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a/b/notes.txt", "x");
        assert!(is_empty_folder(dir.path()).unwrap());

        write(dir.path(), "a/b/c/page.md", "# hi");
        assert!(!is_empty_folder(dir.path()).unwrap());
    }

    #[test]
    fn uploads_folders_as_pages_and_files_with_blocks() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "guide/intro.md", "# Intro\n\nHello\n");
        write(dir.path(), "readme.md", "text\n");
        write(dir.path(), "image.png", "binary");

        let mut uploader = Uploader::new(MemoryApi::new(), MemoryLog::new(), UploadOptions::default());
        let summary = uploader.upload_folder(dir.path(), "root").unwrap();

        assert_eq!(summary, UploadSummary { uploaded: 3, skipped: 0, failed: 0 });
        let (api, _) = uploader.into_parts();
        assert_eq!(
            api.calls,
            vec![
                ApiCall::CreatePage {
                    parent_id: "root".to_string(),
                    title: "guide".to_string(),
                    page_id: "page-1".to_string(),
                    children: 0,
                },
                ApiCall::CreatePage {
                    parent_id: "page-1".to_string(),
                    title: "intro.md".to_string(),
                    page_id: "page-2".to_string(),
                    children: 2,
                },
                ApiCall::CreatePage {
                    parent_id: "root".to_string(),
                    title: "readme.md".to_string(),
                    page_id: "page-3".to_string(),
                    children: 1,
                },
            ]
        );
    }

    #[test]
    fn large_documents_are_appended_in_batches() {
        let dir = TempDir::new().unwrap();
        let body: String = (0..230).map(|i| format!("paragraph {i}\n\n")).collect();
        write(dir.path(), "long.md", &body);

        let mut uploader = Uploader::new(MemoryApi::new(), MemoryLog::new(), UploadOptions::default());
        uploader.upload_folder(dir.path(), "root").unwrap();

        let (api, _) = uploader.into_parts();
        let appended: Vec<usize> = api
            .calls
            .iter()
            .filter_map(|call| match call {
                ApiCall::AppendChildren { block_id, children } => {
                    assert_eq!(block_id, "page-1");
                    Some(*children)
                }
                ApiCall::CreatePage { children, .. } => {
                    assert_eq!(*children, 0);
                    None
                }
            })
            .collect();
        assert_eq!(appended, vec![100, 100, 30]);
    }

    #[test]
    fn second_run_skips_successful_entries() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "notes/a.md", "a\n");
        write(dir.path(), "b.md", "b\n");

        let mut uploader = Uploader::new(MemoryApi::new(), MemoryLog::new(), UploadOptions::default());
        uploader.upload_folder(dir.path(), "root").unwrap();
        let (_, log) = uploader.into_parts();

        let mut rerun = Uploader::new(MemoryApi::new(), log, UploadOptions::default());
        let summary = rerun.upload_folder(dir.path(), "root").unwrap();

        assert_eq!(summary, UploadSummary { uploaded: 0, skipped: 3, failed: 0 });
        assert!(rerun.api().calls.is_empty());
    }

    #[test]
    fn new_file_in_uploaded_folder_goes_under_logged_page() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "notes/a.md", "a\n");

        let mut uploader = Uploader::new(MemoryApi::new(), MemoryLog::new(), UploadOptions::default());
        uploader.upload_folder(dir.path(), "root").unwrap();
        let (_, log) = uploader.into_parts();

        write(dir.path(), "notes/b.md", "b\n");
        let mut rerun = Uploader::new(MemoryApi::new(), log, UploadOptions::default());
        rerun.upload_folder(dir.path(), "root").unwrap();

        assert_eq!(
            rerun.api().calls,
            vec![ApiCall::CreatePage {
                parent_id: "page-1".to_string(),
                title: "b.md".to_string(),
                page_id: "page-1".to_string(),
                children: 1,
            }]
        );
    }

    #[test]
    fn empty_entries_are_skipped_when_configured() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "blank.md", "  \n\n");
        write(dir.path(), "assets/logo.svg", "<svg/>");
        write(dir.path(), "page.md", "content\n");

        let options = UploadOptions {
            add_empty_pages: false,
            add_empty_folders: false,
            ..UploadOptions::default()
        };
        let mut uploader = Uploader::new(MemoryApi::new(), MemoryLog::new(), options);
        let summary = uploader.upload_folder(dir.path(), "root").unwrap();

        assert_eq!(summary, UploadSummary { uploaded: 1, skipped: 2, failed: 0 });
        assert_eq!(uploader.api().created_titles(), vec!["page.md"]);
    }

    #[test]
    fn failures_are_logged_and_run_continues() {
        let dir = TempDir::new().unwrap();
        let quarantine = dir.path().join("quarantine");
        let docs = dir.path().join("docs");
        write(&docs, "a.md", "# a\n");
        write(&docs, "b.md", "b\n");

        let options = UploadOptions {
            quarantine_dir: Some(quarantine.clone()),
            ..UploadOptions::default()
        };
        let mut uploader = Uploader::new(MemoryApi::failing_on(&["a.md"]), MemoryLog::new(), options);
        let summary = uploader.upload_folder(&docs, "root").unwrap();

        assert_eq!(summary, UploadSummary { uploaded: 1, skipped: 0, failed: 1 });
        assert!(quarantine.join("a.md").exists());

        let (_, log) = uploader.into_parts();
        let failed = log.failed();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].title, "a.md");

        let hash = item_hash(&docs.join("a.md").to_string_lossy(), "root");
        let history: Vec<UploadStatus> = log.records[&hash].logs.iter().map(|e| e.status).collect();
        assert_eq!(history, vec![UploadStatus::InProgress, UploadStatus::Failed]);
        let error = &log.errors[&hash].logs[0];
        assert!(error.error.contains("rejected page a.md"));
        assert_eq!(
            error.notion_objects.as_ref().unwrap()[0]["type"],
            "heading_1"
        );
    }

    #[test]
    fn halt_on_error_stops_the_run() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.md", "a\n");
        write(dir.path(), "b.md", "b\n");

        let options = UploadOptions {
            halt_on_error: true,
            ..UploadOptions::default()
        };
        let mut uploader = Uploader::new(MemoryApi::failing_on(&["a.md"]), MemoryLog::new(), options);
        let err = uploader.upload_folder(dir.path(), "root").unwrap_err();

        assert!(matches!(err, Error::Halted { .. }));
        assert!(uploader.api().calls.is_empty());
    }

    #[test]
    fn retry_redrives_only_failed_entries() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.md", "a\n");
        write(dir.path(), "b.md", "b\n");

        let mut uploader = Uploader::new(MemoryApi::failing_on(&["a.md"]), MemoryLog::new(), UploadOptions::default());
        uploader.upload_folder(dir.path(), "root").unwrap();
        let (_, log) = uploader.into_parts();

        let mut retry = Uploader::new(MemoryApi::new(), log, UploadOptions::default());
        let summary = retry.retry_failed().unwrap();

        assert_eq!(summary, UploadSummary { uploaded: 1, skipped: 1, failed: 0 });
        assert_eq!(retry.api().created_titles(), vec!["a.md"]);
        assert!(retry.log().failed().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_file_fails_alone_and_siblings_continue() {
        let dir = TempDir::new().unwrap();
        std::os::unix::fs::symlink(dir.path().join("missing.md"), dir.path().join("a.md")).unwrap();
        write(dir.path(), "b.md", "b\n");

        let mut uploader = Uploader::new(MemoryApi::new(), MemoryLog::new(), UploadOptions::default());
        let summary = uploader.upload_folder(dir.path(), "root").unwrap();

        assert_eq!(summary, UploadSummary { uploaded: 1, skipped: 0, failed: 1 });
        assert_eq!(uploader.api().created_titles(), vec!["b.md"]);

        let (_, log) = uploader.into_parts();
        let hash = item_hash(&dir.path().join("a.md").to_string_lossy(), "root");
        let history: Vec<UploadStatus> = log.records[&hash].logs.iter().map(|e| e.status).collect();
        assert_eq!(history, vec![UploadStatus::InProgress, UploadStatus::Failed]);
        let error = &log.errors[&hash].logs[0];
        assert!(error.error.contains("I/O error"));
        assert!(error.notion_objects.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_file_halts_when_configured() {
        let dir = TempDir::new().unwrap();
        std::os::unix::fs::symlink(dir.path().join("missing.md"), dir.path().join("a.md")).unwrap();
        write(dir.path(), "b.md", "b\n");

        let options = UploadOptions {
            halt_on_error: true,
            ..UploadOptions::default()
        };
        let mut uploader = Uploader::new(MemoryApi::new(), MemoryLog::new(), options);
        let err = uploader.upload_folder(dir.path(), "root").unwrap_err();

        assert!(matches!(err, Error::Halted { .. }));
        assert!(uploader.api().calls.is_empty());
        assert_eq!(uploader.log().failed().len(), 1);
    }

    #[test]
    fn nested_empty_folder_is_skipped_once() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "assets/icons/logo.svg", "<svg/>");
        write(dir.path(), "page.md", "content\n");

        let options = UploadOptions {
            add_empty_folders: false,
            ..UploadOptions::default()
        };
        let mut uploader = Uploader::new(MemoryApi::new(), MemoryLog::new(), options.clone());
        let summary = uploader.upload_folder(dir.path(), "root").unwrap();
        assert_eq!(summary, UploadSummary { uploaded: 1, skipped: 1, failed: 0 });
        assert_eq!(uploader.api().created_titles(), vec!["page.md"]);

        let mut empty_root = Uploader::new(MemoryApi::new(), MemoryLog::new(), options);
        let summary = empty_root
            .upload_folder(&dir.path().join("assets"), "root")
            .unwrap();
        assert_eq!(summary, UploadSummary { uploaded: 0, skipped: 1, failed: 0 });
        assert!(empty_root.api().calls.is_empty());
    }

    #[test]
    fn invalid_utf8_file_is_recorded_as_failure() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bad.md"), [0xff, 0xfe, 0x00]).unwrap();

        let mut uploader = Uploader::new(MemoryApi::new(), MemoryLog::new(), UploadOptions::default());
        let summary = uploader.upload_folder(dir.path(), "root").unwrap();

        assert_eq!(summary.failed, 1);
        assert!(uploader.api().calls.is_empty());
        let (_, log) = uploader.into_parts();
        let error = log.errors.values().next().unwrap();
        assert!(error.logs[0].error.contains("UTF-8"));
        assert!(error.logs[0].notion_objects.is_none());
    }
}
