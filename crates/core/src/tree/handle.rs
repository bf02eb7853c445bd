//! Type handles: lazily resolved references to discovered types.

use classdex_api::{ShapeProvider, SharedShape};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionState {
    Unresolved,
    Resolving,
    Resolved,
    Failed,
}

impl ResolutionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ResolutionState::Resolving,
            2 => ResolutionState::Resolved,
            3 => ResolutionState::Failed,
            _ => ResolutionState::Unresolved,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ResolutionState::Unresolved => 0,
            ResolutionState::Resolving => 1,
            ResolutionState::Resolved => 2,
            ResolutionState::Failed => 3,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ResolutionState::Resolved | ResolutionState::Failed)
    }
}

/// Reference to one discovered type.
///
/// Created by the scan with only a name. The first caller that asks for the
/// shape performs the resolution; concurrent callers block on this handle
/// only and then share the same outcome.
pub struct TypeHandle {
    fqn: String,
    /// Byte offset of the simple name inside `fqn`
    name_start: usize,
    state: AtomicU8,
    outcome: OnceLock<Option<SharedShape>>,
}

impl TypeHandle {
    pub fn new(fqn: impl Into<String>) -> Self {
        let fqn = fqn.into();
        let name_start = fqn.rfind('.').map(|idx| idx + 1).unwrap_or(0);
        Self {
            fqn,
            name_start,
            state: AtomicU8::new(ResolutionState::Unresolved.as_u8()),
            outcome: OnceLock::new(),
        }
    }

    /// Fully-qualified name, e.g. `java.lang.String`
    pub fn fqn(&self) -> &str {
        &self.fqn
    }

    pub fn simple_name(&self) -> &str {
        &self.fqn[self.name_start..]
    }

    /// Dotted package name; empty for the unnamed package
    pub fn package(&self) -> &str {
        self.fqn[..self.name_start].trim_end_matches('.')
    }

    pub fn state(&self) -> ResolutionState {
        ResolutionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Shape attached by a previous resolution, without resolving
    pub fn shape(&self) -> Option<SharedShape> {
        self.outcome.get().cloned().flatten()
    }

    /// Resolve the shape of this type, at most once per handle.
    ///
    /// Returns `None` when resolution failed; the failure is permanent.
    pub fn resolve(&self, provider: &dyn ShapeProvider) -> Option<SharedShape> {
        self.outcome
            .get_or_init(|| {
                self.set_state(ResolutionState::Resolving);
                let result = panic::catch_unwind(AssertUnwindSafe(|| provider.resolve(&self.fqn)));
                match result {
                    Ok(Ok(shape)) => {
                        self.set_state(ResolutionState::Resolved);
                        Some(shape)
                    }
                    Ok(Err(e)) => {
                        debug!("Failed to resolve {}: {}", self.fqn, e);
                        self.set_state(ResolutionState::Failed);
                        None
                    }
                    Err(_) => {
                        debug!("Shape provider panicked while resolving {}", self.fqn);
                        self.set_state(ResolutionState::Failed);
                        None
                    }
                }
            })
            .clone()
    }

    fn set_state(&self, state: ResolutionState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }
}

impl PartialEq for TypeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.fqn == other.fqn
    }
}

impl Eq for TypeHandle {}

impl Hash for TypeHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fqn.hash(state);
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeHandle")
            .field("fqn", &self.fqn)
            .field("state", &self.state())
            .finish()
    }
}

impl fmt::Display for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fqn)
    }
}
