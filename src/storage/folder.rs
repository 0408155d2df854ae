/*!
 * Folder Operations
 * Listing, lookup and creation of children
 */

use super::item::StorageItem;
use super::options::CreationCollisionOption;
use super::pattern::NamePattern;
use crate::broker::SandboxBroker;
use crate::core::limits::MAX_UNIQUE_NAME_ATTEMPTS;
use crate::core::{AccessMode, BrokerError, BrokerResult, ItemKind};
use crate::vfs::{FileSystem, FileType};
use std::path::Path;

/// Reject names that are empty, contain a separator, or walk the tree
pub(crate) fn validate_name(name: &str) -> BrokerResult<()> {
    if name.trim().is_empty() || name.contains('/') || name == "." || name == ".." {
        return Err(BrokerError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// First free `stem (n).ext` in `folder`
///
/// The extension is everything from the last dot; a leading dot does not
/// start one.
pub(crate) fn unique_name(fs: &dyn FileSystem, folder: &Path, name: &str) -> BrokerResult<String> {
    let (stem, extension) = match name.rfind('.') {
        Some(dot) if dot > 0 => name.split_at(dot),
        _ => (name, ""),
    };

    (1..MAX_UNIQUE_NAME_ATTEMPTS)
        .map(|n| format!("{} ({}){}", stem, n, extension))
        .find(|candidate| !fs.exists(&folder.join(candidate)))
        .ok_or_else(|| BrokerError::AlreadyExists {
            path: folder.join(name),
        })
}

fn kind_of(file_type: FileType) -> ItemKind {
    match file_type {
        FileType::Directory => ItemKind::Folder,
        _ => ItemKind::File,
    }
}

fn require_folder(folder: &StorageItem) -> BrokerResult<()> {
    if folder.is_folder() {
        Ok(())
    } else {
        Err(BrokerError::InvalidPath(format!(
            "{} is not a folder",
            folder.path().display()
        )))
    }
}

impl SandboxBroker {
    /// Children of `folder` whose names match `pattern`
    ///
    /// `pattern` takes `*` and `?` wildcards; `None` lists everything.
    pub async fn items(
        &self,
        folder: &mut StorageItem,
        pattern: Option<&str>,
    ) -> BrokerResult<Option<Vec<StorageItem>>> {
        require_folder(folder)?;
        let pattern = NamePattern::from_option(pattern)?;
        let entries = self
            .with_scope(folder, AccessMode::Read, "list", |fs, path| fs.list_dir(path))
            .await?;

        Ok(entries.map(|entries| {
            entries
                .iter()
                .filter(|entry| pattern.matches(&entry.name))
                .map(|entry| folder.child(&entry.name, kind_of(entry.file_type)))
                .collect()
        }))
    }

    pub async fn files(
        &self,
        folder: &mut StorageItem,
        pattern: Option<&str>,
    ) -> BrokerResult<Option<Vec<StorageItem>>> {
        let items = self.items(folder, pattern).await?;
        Ok(items.map(|items| items.into_iter().filter(StorageItem::is_file).collect()))
    }

    pub async fn folders(
        &self,
        folder: &mut StorageItem,
        pattern: Option<&str>,
    ) -> BrokerResult<Option<Vec<StorageItem>>> {
        let items = self.items(folder, pattern).await?;
        Ok(items.map(|items| items.into_iter().filter(StorageItem::is_folder).collect()))
    }

    /// Child named `name`, read under the folder's scope
    pub async fn get_item(
        &self,
        folder: &mut StorageItem,
        name: &str,
    ) -> BrokerResult<Option<StorageItem>> {
        require_folder(folder)?;
        validate_name(name)?;
        let found = self
            .with_scope(folder, AccessMode::Read, "get_item", |fs, path| {
                Ok(fs.file_type(&path.join(name)))
            })
            .await?;

        Ok(found
            .flatten()
            .map(|file_type| folder.child(name, kind_of(file_type))))
    }

    pub async fn get_file(
        &self,
        folder: &mut StorageItem,
        name: &str,
    ) -> BrokerResult<Option<StorageItem>> {
        Ok(self.get_item(folder, name).await?.filter(StorageItem::is_file))
    }

    pub async fn get_folder(
        &self,
        folder: &mut StorageItem,
        name: &str,
    ) -> BrokerResult<Option<StorageItem>> {
        Ok(self.get_item(folder, name).await?.filter(StorageItem::is_folder))
    }

    /// Existence checks need no scope
    pub fn item_exists(&self, folder: &StorageItem, name: &str) -> bool {
        self.filesystem().exists(&folder.path().join(name))
    }

    pub fn file_exists(&self, folder: &StorageItem, name: &str) -> bool {
        matches!(
            self.filesystem().file_type(&folder.path().join(name)),
            Some(file_type) if file_type != FileType::Directory
        )
    }

    pub fn folder_exists(&self, folder: &StorageItem, name: &str) -> bool {
        self.filesystem().file_type(&folder.path().join(name)) == Some(FileType::Directory)
    }

    pub async fn create_file(
        &self,
        folder: &mut StorageItem,
        name: &str,
        option: CreationCollisionOption,
    ) -> BrokerResult<Option<StorageItem>> {
        self.create_child(folder, name, ItemKind::File, option).await
    }

    pub async fn create_folder(
        &self,
        folder: &mut StorageItem,
        name: &str,
        option: CreationCollisionOption,
    ) -> BrokerResult<Option<StorageItem>> {
        self.create_child(folder, name, ItemKind::Folder, option).await
    }

    pub async fn get_or_create_file(
        &self,
        folder: &mut StorageItem,
        name: &str,
    ) -> BrokerResult<Option<StorageItem>> {
        self.create_file(folder, name, CreationCollisionOption::OpenIfExists)
            .await
    }

    pub async fn get_or_create_folder(
        &self,
        folder: &mut StorageItem,
        name: &str,
    ) -> BrokerResult<Option<StorageItem>> {
        self.create_folder(folder, name, CreationCollisionOption::OpenIfExists)
            .await
    }

    /// Permanently delete `folder` and its contents
    pub async fn delete_folder(&self, folder: &mut StorageItem) -> BrokerResult<bool> {
        require_folder(folder)?;
        self.delete(folder).await
    }

    async fn create_child(
        &self,
        folder: &mut StorageItem,
        name: &str,
        kind: ItemKind,
        option: CreationCollisionOption,
    ) -> BrokerResult<Option<StorageItem>> {
        require_folder(folder)?;
        validate_name(name)?;

        let mut name = name.to_string();
        let mut replace = None;
        if let Some(existing) = self.filesystem().file_type(&folder.path().join(&name)) {
            let existing_kind = kind_of(existing);
            match option {
                CreationCollisionOption::OpenIfExists if existing_kind == kind => {
                    return Ok(Some(folder.child(&name, kind)));
                }
                CreationCollisionOption::ReplaceExisting => replace = Some(existing_kind),
                CreationCollisionOption::GenerateUniqueName => {
                    name = unique_name(self.filesystem().as_ref(), folder.path(), &name)?;
                }
                _ => {
                    return Err(BrokerError::AlreadyExists {
                        path: folder.path().join(&name),
                    })
                }
            }
        }

        let child_name = name.clone();
        let created = self
            .with_scope(folder, AccessMode::Write, "create", move |fs, path| {
                let target = path.join(&child_name);
                match replace {
                    Some(ItemKind::Folder) => fs.remove_dir_all(&target)?,
                    Some(ItemKind::File) => fs.delete(&target)?,
                    None => {}
                }
                match kind {
                    ItemKind::File => fs.create(&target),
                    ItemKind::Folder => fs.create_dir(&target),
                }
            })
            .await?;

        Ok(created.map(|()| folder.child(&name, kind)))
    }
}
