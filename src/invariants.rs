use std::collections::HashSet;
use std::sync::Mutex;
use lazy_static::lazy_static;
use log::{error, info};

/// The rules the harness and the module promise to uphold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Invariant {
    /// A resolved handle never points at an embedded child control.
    ResolvedHandleIsTopLevel,
    /// "All windows" operations never touch windows of another process.
    ExclusionStaysInProcess,
    /// The toggle control is only enabled while a module is bound.
    ToggleRequiresModule,
    /// The visibility state only moves after the foreign call returned successfully.
    StateFollowsSuccessfulCall,
}

impl Invariant {
    pub fn description(self) -> &'static str {
        match self {
            Invariant::ResolvedHandleIsTopLevel => "Resolved window handle must be top-level",
            Invariant::ExclusionStaysInProcess => "Capture exclusion must only touch windows of this process",
            Invariant::ToggleRequiresModule => "Toggle must be disabled without a loaded module",
            Invariant::StateFollowsSuccessfulCall => "Visibility state must only change after a successful call",
        }
    }

    fn component(self) -> &'static str {
        match self {
            Invariant::ResolvedHandleIsTopLevel => "Handle",
            Invariant::ExclusionStaysInProcess => "Affinity",
            Invariant::ToggleRequiresModule | Invariant::StateFollowsSuccessfulCall => "Harness",
        }
    }
}

lazy_static! {
    /// Invariants that have been asserted and held at least once in this process.
    static ref CHECKED_INVARIANTS: Mutex<HashSet<Invariant>> = Mutex::new(HashSet::new());
}

/// Asserts that `invariant` holds.
///
/// A violation is logged, and panics in debug/test builds. A successful check is recorded
/// so that [`contract_test`] can prove the check actually ran.
pub fn assert_invariant(condition: bool, invariant: Invariant) {
    if !condition {
        let msg = format!(
            "CRITICAL INVARIANT VIOLATION [{}]: {}",
            invariant.component(),
            invariant.description()
        );
        error!("{}", msg);

        if cfg!(debug_assertions) || cfg!(test) {
            panic!("{}", msg);
        }
    } else if let Ok(mut set) = CHECKED_INVARIANTS.lock() {
        set.insert(invariant);
    }
}

/// Verifies that every invariant in `required` was asserted (and held) at some point.
///
/// # Panics
/// If any of them was never checked.
pub fn contract_test(context: &str, required: &[Invariant]) {
    let checked = CHECKED_INVARIANTS.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let missing: Vec<&str> = required
        .iter()
        .filter(|inv| !checked.contains(inv))
        .map(|inv| inv.description())
        .collect();

    if !missing.is_empty() {
        panic!(
            "Contract Test Failed for '{}'. The following invariants were NOT checked:\n{:#?}",
            context, missing
        );
    }
    info!("Contract Test Passed: {}", context);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_held_invariant_is_recorded() {
        assert_invariant(true, Invariant::StateFollowsSuccessfulCall);
        contract_test("recording", &[Invariant::StateFollowsSuccessfulCall]);
    }

    #[test]
    #[should_panic(expected = "CRITICAL INVARIANT VIOLATION [Harness]")]
    fn test_violation_panics_under_test() {
        assert_invariant(false, Invariant::ToggleRequiresModule);
    }
}
