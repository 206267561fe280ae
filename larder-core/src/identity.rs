/*!
Identifier sources for new aggregates.

Identifiers are drawn at random from the signed 64-bit space. With the
cardinalities this store sees (at most a few thousand workspaces) the chance
of a collision is on the order of 1e-13, so no central sequence is kept.
*/

use rand::Rng;

/// Source of identifiers for newly persisted aggregates
///
/// Implementations must never return 0, which marks an unassigned aggregate.
#[cfg_attr(test, mockall::automock)]
pub trait IdentityAssigner {
    fn assign(&self) -> i64;
}

/// Uniformly random non-zero identifiers
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdentity;

impl RandomIdentity {
    pub fn new() -> Self {
        Self
    }
}

impl IdentityAssigner for RandomIdentity {
    fn assign(&self) -> i64 {
        let mut rng = rand::thread_rng();
        loop {
            let id: i64 = rng.gen();
            if id != 0 {
                return id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_random_identity_is_non_zero_and_distinct() {
        let assigner = RandomIdentity::new();
        let ids: HashSet<i64> = (0..1000).map(|_| assigner.assign()).collect();
        assert_eq!(ids.len(), 1000);
        assert!(!ids.contains(&0));
    }

    #[test]
    fn test_mock_assigner() {
        let mut mock = MockIdentityAssigner::new();
        mock.expect_assign().times(1).return_const(42i64);
        assert_eq!(mock.assign(), 42);
    }
}
