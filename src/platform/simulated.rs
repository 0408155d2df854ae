/*!
 * Simulated Platform
 * Deterministic in-process token API, sandbox and picker
 *
 * Tokens are self-describing, so they keep resolving across process
 * restarts as long as the resource still exists. Staleness, relocation,
 * revocation and enable failures can be injected for testing.
 */

use super::traits::{NativePicker, PickerRequest, SecurityScopeApi};
use crate::bookmarks::paths;
use crate::core::limits::SIMULATED_TOKEN_MAGIC;
use crate::core::{BookmarkToken, ResolvedToken, ResourceHandle, TokenError};
use crate::vfs::{FileSystem, ScopeOracle};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct TokenPayload {
    id: u128,
    path: String,
    generation: u64,
}

impl TokenPayload {
    fn encode(&self) -> Option<BookmarkToken> {
        let body = bincode::serialize(self).ok()?;
        let mut bytes = Vec::with_capacity(SIMULATED_TOKEN_MAGIC.len() + body.len());
        bytes.extend_from_slice(SIMULATED_TOKEN_MAGIC);
        bytes.extend_from_slice(&body);
        Some(BookmarkToken::from(bytes))
    }

    fn decode(token: &BookmarkToken) -> Result<Self, TokenError> {
        let body = token
            .as_bytes()
            .strip_prefix(SIMULATED_TOKEN_MAGIC.as_slice())
            .ok_or_else(|| TokenError::Undecodable("unrecognized token format".into()))?;
        bincode::deserialize(body).map_err(|e| TokenError::Undecodable(e.to_string()))
    }
}

/// Scope call recorded by the simulated platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeCall {
    Enable(PathBuf),
    Disable(PathBuf),
}

#[derive(Debug, Default)]
struct SimState {
    granted: HashSet<PathBuf>,
    denied_enable: HashSet<PathBuf>,
    generations: HashMap<PathBuf, u64>,
    relocations: HashMap<PathBuf, PathBuf>,
    revoked: HashSet<u128>,
    active: HashMap<PathBuf, usize>,
    calls: Vec<ScopeCall>,
}

impl SimState {
    fn covered_by_active(&self, path: &Path) -> bool {
        self.active.keys().any(|root| path.starts_with(root))
    }
}

/// In-process implementation of the token API
#[derive(Default)]
pub struct SimulatedPlatform {
    state: Mutex<SimState>,
    filesystem: Option<Arc<dyn FileSystem>>,
}

impl SimulatedPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report tokens for vanished resources as undecodable
    ///
    /// `filesystem` must be the unrestricted view, not a sandboxed one.
    pub fn with_filesystem(filesystem: Arc<dyn FileSystem>) -> Self {
        Self {
            state: Mutex::new(SimState::default()),
            filesystem: Some(filesystem),
        }
    }

    /// The user selected `path` in a picker
    ///
    /// Grants minting and enabling rights and lifts any injected enable failure.
    pub fn grant(&self, path: impl AsRef<Path>) {
        let path = paths::normalize(path.as_ref());
        let mut state = self.state.lock();
        state.denied_enable.remove(&path);
        state.granted.insert(path);
    }

    /// Withdraw a grant; live tokens still re-grant on resolution
    pub fn revoke_grant(&self, path: impl AsRef<Path>) {
        self.state.lock().granted.remove(&paths::normalize(path.as_ref()));
    }

    pub fn is_granted(&self, path: impl AsRef<Path>) -> bool {
        self.state
            .lock()
            .granted
            .contains(&paths::normalize(path.as_ref()))
    }

    /// Make every `enable_scope` on `path` fail until it is granted again
    pub fn deny_enable(&self, path: impl AsRef<Path>) {
        self.state
            .lock()
            .denied_enable
            .insert(paths::normalize(path.as_ref()));
    }

    /// Tokens minted for `path` so far resolve as stale
    pub fn mark_stale(&self, path: impl AsRef<Path>) {
        let path = paths::normalize(path.as_ref());
        *self.state.lock().generations.entry(path).or_insert(0) += 1;
    }

    /// The resource at `from` now lives at `to`; old tokens resolve stale to `to`
    pub fn relocate(&self, from: impl AsRef<Path>, to: impl AsRef<Path>) {
        let from = paths::normalize(from.as_ref());
        let to = paths::normalize(to.as_ref());
        self.state.lock().relocations.insert(from, to);
    }

    /// Make `token` permanently undecodable
    pub fn revoke_token(&self, token: &BookmarkToken) {
        if let Ok(payload) = TokenPayload::decode(token) {
            self.state.lock().revoked.insert(payload.id);
        }
    }

    /// Path a token was minted for, without resolving it
    pub fn token_path(&self, token: &BookmarkToken) -> Option<PathBuf> {
        TokenPayload::decode(token)
            .ok()
            .map(|payload| paths::path_from_key(&payload.path))
    }

    /// Outstanding enables on exactly `path`
    pub fn active_scopes(&self, path: impl AsRef<Path>) -> usize {
        self.state
            .lock()
            .active
            .get(&paths::normalize(path.as_ref()))
            .copied()
            .unwrap_or(0)
    }

    /// Outstanding enables across all paths
    pub fn total_active_scopes(&self) -> usize {
        self.state.lock().active.values().sum()
    }

    pub fn calls(&self) -> Vec<ScopeCall> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    fn resource_exists(&self, path: &Path) -> bool {
        self.filesystem
            .as_ref()
            .map(|fs| fs.exists(path))
            .unwrap_or(true)
    }
}

impl SecurityScopeApi for SimulatedPlatform {
    fn mint_token(&self, handle: &ResourceHandle) -> Option<BookmarkToken> {
        let path = handle.path().to_path_buf();
        let generation = {
            let state = self.state.lock();
            if !state.granted.contains(&path) && !state.covered_by_active(&path) {
                trace!(path = %path.display(), "mint refused: no grant");
                return None;
            }
            state.generations.get(&path).copied().unwrap_or(0)
        };

        TokenPayload {
            id: Uuid::new_v4().as_u128(),
            path: handle.key(),
            generation,
        }
        .encode()
    }

    fn resolve_token(&self, token: &BookmarkToken) -> Result<ResolvedToken, TokenError> {
        let payload = TokenPayload::decode(token)?;
        let original = paths::path_from_key(&payload.path);

        let relocated = {
            let state = self.state.lock();
            if state.revoked.contains(&payload.id) {
                return Err(TokenError::Undecodable("token revoked".into()));
            }
            state.relocations.get(&original).cloned()
        };

        let (path, is_stale) = match relocated {
            Some(target) => (target, true),
            None => {
                if !self.resource_exists(&original) {
                    return Err(TokenError::Undecodable(format!(
                        "{} no longer exists",
                        original.display()
                    )));
                }
                let current = self
                    .state
                    .lock()
                    .generations
                    .get(&original)
                    .copied()
                    .unwrap_or(0);
                (original, payload.generation < current)
            }
        };

        self.state.lock().granted.insert(path.clone());
        let handle = ResourceHandle::new(&path);
        Ok(if is_stale {
            ResolvedToken::stale(handle)
        } else {
            ResolvedToken::fresh(handle)
        })
    }

    fn enable_scope(&self, handle: &ResourceHandle) -> bool {
        let path = handle.path().to_path_buf();
        let mut state = self.state.lock();
        state.calls.push(ScopeCall::Enable(path.clone()));

        let permitted = state.granted.contains(&path) || state.covered_by_active(&path);
        if state.denied_enable.contains(&path) || !permitted {
            debug!(path = %path.display(), "simulated enable refused");
            return false;
        }
        *state.active.entry(path).or_insert(0) += 1;
        true
    }

    fn disable_scope(&self, handle: &ResourceHandle) {
        let path = handle.path().to_path_buf();
        let mut state = self.state.lock();
        state.calls.push(ScopeCall::Disable(path.clone()));

        if let Some(count) = state.active.get_mut(&path) {
            *count -= 1;
            if *count == 0 {
                state.active.remove(&path);
            }
        }
    }
}

impl ScopeOracle for SimulatedPlatform {
    fn is_accessible(&self, path: &Path) -> bool {
        self.state
            .lock()
            .covered_by_active(&paths::normalize(path))
    }
}

/// Scripted picker for tests and demos
///
/// Answers come from a queue; an empty queue behaves like a cancelled
/// dialog. Selections are granted on the simulated platform.
pub struct SimulatedPicker {
    platform: Arc<SimulatedPlatform>,
    responses: Mutex<VecDeque<Option<PathBuf>>>,
    requests: Mutex<Vec<PickerRequest>>,
    threads: Mutex<Vec<Option<String>>>,
}

impl SimulatedPicker {
    pub fn new(platform: Arc<SimulatedPlatform>) -> Self {
        Self {
            platform,
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            threads: Mutex::new(Vec::new()),
        }
    }

    /// Queue a selection of `path`
    pub fn select(&self, path: impl Into<PathBuf>) {
        self.responses.lock().push_back(Some(path.into()));
    }

    /// Queue a cancelled dialog
    pub fn cancel(&self) {
        self.responses.lock().push_back(None);
    }

    pub fn requests(&self) -> Vec<PickerRequest> {
        self.requests.lock().clone()
    }

    /// Names of the threads each pick ran on
    pub fn threads(&self) -> Vec<Option<String>> {
        self.threads.lock().clone()
    }
}

impl NativePicker for SimulatedPicker {
    fn pick(&self, request: &PickerRequest) -> Option<PathBuf> {
        self.requests.lock().push(request.clone());
        self.threads
            .lock()
            .push(std::thread::current().name().map(str::to_string));

        let selection = self.responses.lock().pop_front().flatten();
        if let Some(path) = &selection {
            self.platform.grant(path);
        }
        selection
    }
}
