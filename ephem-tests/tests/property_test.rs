/// Property tests for the view counter

use ephem_api::NewPaste;
use ephem_test_utils::{t0_plus_millis, TestPastes};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Grants never exceed the quota, and remaining views only go down
    #[test]
    fn prop_grants_bounded_by_quota(max_views in 1i64..20, attempts in 0usize..40) {
        let t = TestPastes::in_memory();
        let record = t.create(NewPaste::new("p").max_views(max_views)).unwrap();

        let mut granted = 0u64;
        let mut last_remaining = u64::MAX;
        for i in 0..attempts {
            let outcome = t.pastes.consume_at(record.id.as_str(), t0_plus_millis(i as i64)).unwrap();
            if let Some(c) = outcome.granted() {
                granted += 1;
                let remaining = c.remaining_views().unwrap();
                prop_assert!(remaining < last_remaining);
                last_remaining = remaining;
            }
        }

        prop_assert_eq!(granted, (attempts as u64).min(max_views as u64));
        prop_assert_eq!(t.pastes.stats().unwrap().total_views, granted);
    }

    /// A paste is granted exactly when the attempt precedes its deadline
    #[test]
    fn prop_expiry_boundary(ttl in 1i64..100_000, offset_ms in 0i64..200_000_000) {
        let t = TestPastes::in_memory();
        let record = t.create(NewPaste::new("p").ttl_seconds(ttl)).unwrap();

        let granted = t
            .pastes
            .consume_at(record.id.as_str(), t0_plus_millis(offset_ms))
            .unwrap()
            .is_granted();
        prop_assert_eq!(granted, offset_ms < ttl * 1000);
    }
}
