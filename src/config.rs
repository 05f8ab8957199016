/// Options fixed when a pool is initialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolConfig {
  /// Zero a block's payload when it is released.
  pub scrub_on_release: bool,
}

impl PoolConfig {
  pub fn new() -> Self {
    Self::default()
  }

  /// Enables or disables zeroing on release.
  pub fn with_scrub_on_release(
    mut self,
    enabled: bool,
  ) -> Self {
    self.scrub_on_release = enabled;
    self
  }
}
