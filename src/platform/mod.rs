/*!
 * Platform Integration
 * Token API, preference storage, picker and UI context
 */

pub mod preferences;
pub mod simulated;
pub mod traits;
pub mod ui;

pub use preferences::{FilePreferences, MemoryPreferences};
pub use simulated::{ScopeCall, SimulatedPicker, SimulatedPlatform};
pub use traits::{NativePicker, PickerRequest, PreferenceStore, SecurityScopeApi};
pub use ui::UiContext;

#[cfg(test)]
pub use traits::MockSecurityScopeApi;
