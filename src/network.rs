//! Network reachability signal consumed by the fetch engine.

use color_eyre::Result;
use std::sync::atomic::{AtomicBool, Ordering};

/// Reports whether the network is currently usable.
pub trait Reachability: Send + Sync {
  fn is_connected(&self) -> Result<bool>;
}

/// Reachability flag flipped by the application (e.g. from a platform connectivity callback).
#[derive(Debug)]
pub struct ManualReachability {
  connected: AtomicBool,
}

impl ManualReachability {
  pub fn new(connected: bool) -> Self {
    Self {
      connected: AtomicBool::new(connected),
    }
  }

  pub fn set_connected(&self, connected: bool) {
    self.connected.store(connected, Ordering::SeqCst);
  }
}

impl Default for ManualReachability {
  fn default() -> Self {
    Self::new(true)
  }
}

impl Reachability for ManualReachability {
  fn is_connected(&self) -> Result<bool> {
    Ok(self.connected.load(Ordering::SeqCst))
  }
}

impl<F> Reachability for F
where
  F: Fn() -> bool + Send + Sync,
{
  fn is_connected(&self) -> Result<bool> {
    Ok(self())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_manual_reachability_toggles() {
    let net = ManualReachability::default();
    assert!(net.is_connected().unwrap());

    net.set_connected(false);
    assert!(!net.is_connected().unwrap());
  }

  #[test]
  fn test_closure_is_reachability() {
    let offline = || false;
    assert!(!offline.is_connected().unwrap());
  }
}
