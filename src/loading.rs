//! Loading flag that cannot outlive the operation that raised it.

use tokio::sync::watch;

/// Raises a store's loading flag and lowers it again on drop.
///
/// Operations that finish normally clear the flag together with their
/// result, so the drop only publishes a change when the future was
/// abandoned part way, e.g. by a caller-side timeout.
pub(crate) struct LoadingGuard<'a, T> {
  state: &'a watch::Sender<T>,
  flag: fn(&mut T) -> &mut bool,
}

impl<'a, T> LoadingGuard<'a, T> {
  /// Set the flag and apply `prepare` in the same state update.
  pub(crate) fn start(
    state: &'a watch::Sender<T>,
    flag: fn(&mut T) -> &mut bool,
    prepare: impl FnOnce(&mut T),
  ) -> Self {
    state.send_modify(|s| {
      *flag(s) = true;
      prepare(s);
    });
    Self { state, flag }
  }
}

impl<T> Drop for LoadingGuard<'_, T> {
  fn drop(&mut self) {
    let flag = self.flag;
    self
      .state
      .send_if_modified(|s| std::mem::replace(flag(s), false));
  }
}
