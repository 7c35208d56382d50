//! Property-based tests for hardware scoring
//! **Score monotonicity and tier banding**

use proptest::prelude::*;
use tierguard_hardware::{calculate_score, recommend_tier, GpuType, ScreenResolution, Tier};

fn gpu_type() -> impl Strategy<Value = GpuType> {
    prop_oneof![
        Just(GpuType::Integrated),
        Just(GpuType::Dedicated),
        Just(GpuType::Unknown),
    ]
}

fn resolution() -> impl Strategy<Value = ScreenResolution> {
    (640u32..8000, 480u32..5000).prop_map(|(w, h)| ScreenResolution::new(w, h))
}

proptest! {
    #[test]
    fn prop_score_in_range(ram in 0u64..256, cores in 0usize..128, gpu in gpu_type(), res in resolution()) {
        prop_assert!(calculate_score(ram, cores, gpu, res) <= 100);
    }

    #[test]
    fn prop_more_ram_never_lowers_score(
        ram in 0u64..128, extra in 0u64..128, cores in 0usize..64, gpu in gpu_type(), res in resolution()
    ) {
        prop_assert!(calculate_score(ram + extra, cores, gpu, res) >= calculate_score(ram, cores, gpu, res));
    }

    #[test]
    fn prop_more_cores_never_lowers_score(
        ram in 0u64..128, cores in 0usize..64, extra in 0usize..64, gpu in gpu_type(), res in resolution()
    ) {
        prop_assert!(calculate_score(ram, cores + extra, gpu, res) >= calculate_score(ram, cores, gpu, res));
    }

    #[test]
    fn prop_gpu_ordering(ram in 0u64..128, cores in 0usize..64, res in resolution()) {
        let dedicated = calculate_score(ram, cores, GpuType::Dedicated, res);
        let unknown = calculate_score(ram, cores, GpuType::Unknown, res);
        let integrated = calculate_score(ram, cores, GpuType::Integrated, res);
        prop_assert!(dedicated > unknown);
        prop_assert!(unknown > integrated);
    }

    #[test]
    fn prop_higher_resolution_never_raises_score(
        ram in 0u64..128, cores in 0usize..64, gpu in gpu_type(),
        w in 640u32..4000, h in 480u32..2500, dw in 0u32..4000, dh in 0u32..2500
    ) {
        let small = calculate_score(ram, cores, gpu, ScreenResolution::new(w, h));
        let large = calculate_score(ram, cores, gpu, ScreenResolution::new(w + dw, h + dh));
        prop_assert!(large <= small);
    }

    #[test]
    fn prop_tier_is_monotonic(a in 0u8..=100, b in 0u8..=100) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(recommend_tier(low) <= recommend_tier(high));
    }
}

#[test]
fn test_exact_tier_boundaries() {
    assert_eq!(recommend_tier(39), Tier::LowEnd);
    assert_eq!(recommend_tier(40), Tier::Balanced);
    assert_eq!(recommend_tier(69), Tier::Balanced);
    assert_eq!(recommend_tier(70), Tier::HighEnd);
}
