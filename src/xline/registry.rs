//! Ordered registry of X-line managers.

use super::{GlineManager, NlineManager, QlineManager, XLineKind, XLineManager};
use crate::error::{XLineError, XLineResult};

/// The registered X-line managers, in enforcement order.
///
/// Registration order is priority order: connect-time checks walk managers
/// front to back, so the most violent category must be registered first.
#[derive(Default)]
pub struct XLineRegistry {
    managers: Vec<Box<dyn XLineManager>>,
}

impl XLineRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// G-lines, then Q-lines, then N-lines. Most violent to least violent.
    pub fn standard() -> Self {
        Self {
            managers: vec![
                Box::new(GlineManager::new()),
                Box::new(QlineManager::new()),
                Box::new(NlineManager::new()),
            ],
        }
    }

    /// Append a manager at the lowest priority.
    pub fn register(&mut self, manager: Box<dyn XLineManager>) -> XLineResult<()> {
        let kind = manager.kind();
        if self.get(kind).is_some() {
            return Err(XLineError::DuplicateManager(kind));
        }
        tracing::debug!(manager = kind.manager_name(), "Registered X-line manager");
        self.managers.push(manager);
        Ok(())
    }

    /// Remove a manager, keeping the relative order of the rest.
    pub fn unregister(&mut self, kind: XLineKind) -> Option<Box<dyn XLineManager>> {
        let index = self.managers.iter().position(|m| m.kind() == kind)?;
        tracing::debug!(manager = kind.manager_name(), "Unregistered X-line manager");
        Some(self.managers.remove(index))
    }

    pub fn get(&self, kind: XLineKind) -> Option<&dyn XLineManager> {
        self.managers
            .iter()
            .find(|m| m.kind() == kind)
            .map(|m| m.as_ref())
    }

    pub fn get_mut(&mut self, kind: XLineKind) -> Option<&mut (dyn XLineManager + 'static)> {
        self.managers
            .iter_mut()
            .find(|m| m.kind() == kind)
            .map(|m| m.as_mut())
    }

    /// Managers in priority order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn XLineManager> + '_ {
        self.managers.iter().map(|m| m.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn XLineManager>> + '_ {
        self.managers.iter_mut()
    }

    /// Registered kinds in priority order.
    pub fn kinds(&self) -> Vec<XLineKind> {
        self.managers.iter().map(|m| m.kind()).collect()
    }

    pub fn len(&self) -> usize {
        self.managers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }
}
