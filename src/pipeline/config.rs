//! Runtime configuration for a mounted root.

/// Default cap on back-to-back cycles caused by one trigger.
pub const DEFAULT_MAX_CYCLES_PER_TRIGGER: usize = 64;

/// Settings of one mounted root.
///
/// ```ignore
/// let config = RuntimeConfig::default()
///     .with_max_cycles_per_trigger(8)
///     .with_strict_hooks(false);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// How many cycles one trigger may run before the runtime gives up with
    /// [`Error::RenderLoop`](crate::Error::RenderLoop). Updates queued during
    /// a cycle each cost one more cycle.
    pub max_cycles_per_trigger: usize,
    /// Fail the cycle on a hook-order violation. When off, the violation is
    /// logged and the component's hook state is reset.
    pub strict_hooks: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_cycles_per_trigger: DEFAULT_MAX_CYCLES_PER_TRIGGER,
            strict_hooks: true,
        }
    }
}

impl RuntimeConfig {
    pub fn with_max_cycles_per_trigger(mut self, limit: usize) -> Self {
        self.max_cycles_per_trigger = limit.max(1);
        self
    }

    pub fn with_strict_hooks(mut self, strict: bool) -> Self {
        self.strict_hooks = strict;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.max_cycles_per_trigger, DEFAULT_MAX_CYCLES_PER_TRIGGER);
        assert!(config.strict_hooks);
    }

    #[test]
    fn test_cycle_limit_is_at_least_one() {
        assert_eq!(RuntimeConfig::default().with_max_cycles_per_trigger(0).max_cycles_per_trigger, 1);
    }
}
