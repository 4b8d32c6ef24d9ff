/// Runs a closure on drop unless disarmed first.
pub struct ScopeGuard<F: FnOnce()>(Option<F>);

impl<F: FnOnce()> ScopeGuard<F> {
    pub fn new(f: F) -> Self {
        Self(Some(f))
    }

    /// Keep the closure from running
    pub fn disarm(mut self) {
        self.0 = None;
    }
}

impl<F: FnOnce()> Drop for ScopeGuard<F> {
    fn drop(&mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }
}

/// Deletes a staged upload unless it was handed over to storage
pub fn discard_upload_on_drop(path: std::path::PathBuf) -> ScopeGuard<impl FnOnce()> {
    ScopeGuard::new(move || {
        if let Err(e) = std::fs::remove_file(&path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to discard upload {}: {}", path.display(), e);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn runs_on_drop_unless_disarmed() {
        let ran = Cell::new(0);
        {
            let _guard = ScopeGuard::new(|| ran.set(ran.get() + 1));
        }
        assert_eq!(ran.get(), 1);

        let guard = ScopeGuard::new(|| ran.set(ran.get() + 1));
        guard.disarm();
        assert_eq!(ran.get(), 1);
    }
}
