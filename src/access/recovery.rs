/*!
 * Access Recovery
 * Asks the user to grant access through the native picker
 */

use crate::bookmarks::paths::paths_match;
use crate::bookmarks::BookmarkResolver;
use crate::core::limits::RECOVERY_PROMPT_PREFIX;
use crate::core::{BrokerError, BrokerResult, ItemKind};
use crate::monitoring::{metric_names, MetricsCollector};
use crate::platform::{NativePicker, PickerRequest, UiContext};
use crate::storage::StorageItem;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Picker-driven recovery of a denied item
///
/// The picker runs on the UI context while the caller is suspended. A
/// selection counts only when it is the denied item itself.
pub struct RecoveryFlow {
    picker: Arc<dyn NativePicker>,
    ui: UiContext,
    resolver: Arc<BookmarkResolver>,
    metrics: Arc<MetricsCollector>,
}

impl RecoveryFlow {
    pub fn new(
        picker: Arc<dyn NativePicker>,
        ui: UiContext,
        resolver: Arc<BookmarkResolver>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            picker,
            ui,
            resolver,
            metrics,
        }
    }

    /// Picker request shown for `item`
    ///
    /// File pickers open in the containing folder with the file preselected;
    /// folder pickers open on the folder itself.
    pub fn picker_request(item: &StorageItem) -> PickerRequest {
        let prompt = format!("{} {}", RECOVERY_PROMPT_PREFIX, item.name());
        match item.kind() {
            ItemKind::File => PickerRequest {
                kind: ItemKind::File,
                starting_path: item
                    .handle()
                    .parent()
                    .map(|p| p.path().to_path_buf())
                    .unwrap_or_else(|| item.path().to_path_buf()),
                suggested_name: Some(item.name()),
                prompt,
            },
            ItemKind::Folder => PickerRequest {
                kind: ItemKind::Folder,
                starting_path: item.path().to_path_buf(),
                suggested_name: None,
                prompt,
            },
        }
    }

    /// Run the picker and, on a matching selection, bookmark it and update `item`
    pub async fn request_access(&self, item: &mut StorageItem) -> BrokerResult<()> {
        self.metrics.record(metric_names::RECOVERY_ATTEMPTED);
        let request = Self::picker_request(item);
        info!(path = %item.path().display(), kind = %item.kind(), "requesting access from user");

        let picker = self.picker.clone();
        let selection = match self.ui.run(move || picker.pick(&request)).await {
            Ok(selection) => selection,
            Err(e) => {
                error!(path = %item.path().display(), error = %e, "picker could not be shown");
                return Err(self.declined(item));
            }
        };

        let Some(selected) = selection else {
            info!(path = %item.path().display(), "picker cancelled");
            return Err(self.declined(item));
        };

        if !paths_match(&selected, item.path()) {
            warn!(
                path = %item.path().display(),
                selected = %selected.display(),
                "picker selection does not match the requested item"
            );
            return Err(self.declined(item));
        }

        let Some(bookmark) = self.resolver.get_or_create_bookmark(&selected) else {
            warn!(path = %selected.display(), "selected item could not be bookmarked");
            return Err(self.declined(item));
        };

        item.adopt(bookmark);
        self.metrics.record(metric_names::RECOVERY_SUCCEEDED);
        info!(path = %item.path().display(), "access granted by user");
        Ok(())
    }

    fn declined(&self, item: &StorageItem) -> BrokerError {
        self.metrics.record(metric_names::RECOVERY_DECLINED);
        BrokerError::RecoveryDeclined {
            path: item.path().to_path_buf(),
        }
    }
}
