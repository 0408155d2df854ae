/*!
 * File Operations
 * Reads, writes, transfers and deletion run under a held scope
 */

use super::folder::{unique_name, validate_name};
use super::item::StorageItem;
use super::options::{ItemProperties, NameCollisionOption};
use crate::broker::SandboxBroker;
use crate::core::{AccessMode, BrokerError, BrokerResult, ItemKind};
use crate::monitoring::span_operation;
use crate::vfs::{FileType, VfsError};
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transfer {
    Copy,
    Move,
}

fn decode_text(bytes: Vec<u8>, path: &Path) -> Result<String, VfsError> {
    String::from_utf8(bytes)
        .map_err(|e| VfsError::InvalidData(format!("{} is not UTF-8: {}", path.display(), e)))
}

/// Lines each followed by a newline
fn join_lines<S: AsRef<str>>(lines: &[S]) -> String {
    let mut text = String::new();
    for line in lines {
        text.push_str(line.as_ref());
        text.push('\n');
    }
    text
}

impl SandboxBroker {
    pub async fn read_bytes(&self, file: &mut StorageItem) -> BrokerResult<Option<Vec<u8>>> {
        self.with_scope(file, AccessMode::Read, "read_bytes", |fs, path| fs.read(path))
            .await
    }

    pub async fn read_text(&self, file: &mut StorageItem) -> BrokerResult<Option<String>> {
        self.with_scope(file, AccessMode::Read, "read_text", |fs, path| {
            decode_text(fs.read(path)?, path)
        })
        .await
    }

    pub async fn read_lines(&self, file: &mut StorageItem) -> BrokerResult<Option<Vec<String>>> {
        let text = self.read_text(file).await?;
        Ok(text.map(|text| text.lines().map(str::to_string).collect()))
    }

    /// Replace the file's contents, creating it when missing
    ///
    /// `Ok(false)` when a silent policy swallowed a failure.
    pub async fn write_bytes(&self, file: &mut StorageItem, data: &[u8]) -> BrokerResult<bool> {
        self.with_scope(file, AccessMode::Write, "write_bytes", |fs, path| fs.write(path, data))
            .await
            .map(|written| written.is_some())
    }

    pub async fn write_text(&self, file: &mut StorageItem, text: &str) -> BrokerResult<bool> {
        self.write_bytes(file, text.as_bytes()).await
    }

    pub async fn write_lines<S: AsRef<str>>(
        &self,
        file: &mut StorageItem,
        lines: &[S],
    ) -> BrokerResult<bool> {
        self.write_bytes(file, join_lines(lines).as_bytes()).await
    }

    pub async fn append_text(&self, file: &mut StorageItem, text: &str) -> BrokerResult<bool> {
        self.with_scope(file, AccessMode::Write, "append_text", |fs, path| {
            fs.append(path, text.as_bytes())
        })
        .await
        .map(|written| written.is_some())
    }

    pub async fn append_lines<S: AsRef<str>>(
        &self,
        file: &mut StorageItem,
        lines: &[S],
    ) -> BrokerResult<bool> {
        self.append_text(file, &join_lines(lines)).await
    }

    /// Permanently delete a file, or a folder with everything in it
    ///
    /// The bookmark persisted for the path, if any, goes with it.
    pub async fn delete(&self, item: &mut StorageItem) -> BrokerResult<bool> {
        let kind = item.kind();
        let deleted = self
            .with_scope(item, AccessMode::Delete, "delete", |fs, path| match kind {
                ItemKind::File => fs.delete(path),
                ItemKind::Folder => fs.remove_dir_all(path),
            })
            .await?;

        if deleted.is_none() {
            return Ok(false);
        }
        if let Err(e) = self.resolver().forget(item.path()) {
            warn!(path = %item.path().display(), error = %e, "bookmark of deleted item not removed");
        }
        Ok(true)
    }

    /// Size and timestamps of a file or folder
    pub async fn properties(&self, item: &mut StorageItem) -> BrokerResult<Option<ItemProperties>> {
        let file_type = item.file_type();
        let metadata = self
            .with_scope(item, AccessMode::Scope, "properties", |fs, path| fs.metadata(path))
            .await?;

        Ok(metadata.map(|metadata| ItemProperties {
            size: metadata.size,
            created: metadata.created,
            modified: metadata.modified,
            file_type,
        }))
    }

    /// Copy `file` into `destination` as `name`
    ///
    /// Fails with `AlreadyExists` when the name is taken. The copy gets no
    /// bookmark of its own.
    pub async fn copy_to(
        &self,
        file: &mut StorageItem,
        destination: &mut StorageItem,
        name: &str,
    ) -> BrokerResult<Option<StorageItem>> {
        self.transfer(file, destination, name, NameCollisionOption::FailIfExists, Transfer::Copy)
            .await
    }

    /// Move `item` into `destination` as `name`
    ///
    /// On success `item` points at its new location and a persisted bookmark
    /// for the old path is re-keyed to the new one.
    pub async fn move_to(
        &self,
        item: &mut StorageItem,
        destination: &mut StorageItem,
        name: &str,
    ) -> BrokerResult<bool> {
        self.transfer(item, destination, name, NameCollisionOption::FailIfExists, Transfer::Move)
            .await
            .map(|moved| moved.is_some())
    }

    /// Rename `item` within its folder
    pub async fn rename(
        &self,
        item: &mut StorageItem,
        name: &str,
        option: NameCollisionOption,
    ) -> BrokerResult<bool> {
        validate_name(name)?;
        if item.name() == name {
            return Ok(true);
        }
        let Some(mut parent) = item.parent() else {
            return Err(BrokerError::InvalidPath(format!(
                "{} has no containing folder",
                item.path().display()
            )));
        };
        self.transfer(item, &mut parent, name, option, Transfer::Move)
            .await
            .map(|moved| moved.is_some())
    }

    /// Destination scope first, then the source inside it
    ///
    /// Both scopes are released before a failure is settled.
    async fn transfer(
        &self,
        source: &mut StorageItem,
        destination: &mut StorageItem,
        name: &str,
        collision: NameCollisionOption,
        kind: Transfer,
    ) -> BrokerResult<Option<StorageItem>> {
        validate_name(name)?;
        if !destination.is_folder() {
            return Err(BrokerError::InvalidPath(format!(
                "{} is not a folder",
                destination.path().display()
            )));
        }
        if kind == Transfer::Copy && !source.is_file() {
            return Err(BrokerError::InvalidPath(format!(
                "only files can be copied, {} is a folder",
                source.path().display()
            )));
        }

        let operation = match kind {
            Transfer::Copy => "copy",
            Transfer::Move => "move",
        };
        let span = span_operation(operation, source.path());

        let Some(dest_scope) = self.acquire_scope(destination, AccessMode::Write).await? else {
            span.denied();
            return Ok(None);
        };

        let fs = self.filesystem().clone();
        let mut target = destination.handle().join(name);
        if let Some(existing) = fs.file_type(target.path()) {
            match collision {
                NameCollisionOption::FailIfExists => {
                    return Err(BrokerError::AlreadyExists {
                        path: target.path().to_path_buf(),
                    })
                }
                NameCollisionOption::ReplaceExisting => {
                    let removed = match existing {
                        FileType::Directory => fs.remove_dir_all(target.path()),
                        _ => fs.delete(target.path()),
                    };
                    if let Err(e) = removed {
                        drop(dest_scope);
                        span.failed(&e);
                        return self.settle_failure(source, e);
                    }
                    debug!(path = %target, "replaced existing item");
                }
                NameCollisionOption::GenerateUniqueName => {
                    let unique = unique_name(fs.as_ref(), destination.path(), name)?;
                    target = destination.handle().join(&unique);
                }
            }
        }

        let mode = match kind {
            Transfer::Copy => AccessMode::Read,
            Transfer::Move => AccessMode::Delete,
        };
        let Some(source_scope) = self.acquire_nested(source, mode, &dest_scope).await? else {
            span.denied();
            return Ok(None);
        };

        let result = {
            let _entered = span.enter();
            match kind {
                Transfer::Copy => fs.copy(source.path(), target.path()),
                Transfer::Move => fs.rename(source.path(), target.path()),
            }
        };

        if result.is_ok() && kind == Transfer::Move {
            if let Err(e) = self.resolver().relocate(source.path(), &target) {
                warn!(from = %source.path().display(), to = %target, error = %e, "bookmark not re-keyed after move");
            }
        }
        drop(source_scope);
        drop(dest_scope);

        match result {
            Ok(()) => {
                span.succeeded();
                let moved = match kind {
                    Transfer::Copy => StorageItem::file(target.path()).with_policy(source.policy()),
                    Transfer::Move => {
                        source.relocate(target);
                        source.clone()
                    }
                };
                Ok(Some(moved))
            }
            Err(e) => {
                span.failed(&e);
                self.settle_failure(source, e)
            }
        }
    }
}
