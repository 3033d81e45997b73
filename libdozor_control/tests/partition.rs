use std::collections::BTreeSet;

use libdozor_control::batch::partition;
use libdozor_control::params::RunParameters;
use proptest::prelude::*;

/// Sparse image numbers with runs, as a real collection with gaps would have
fn image_numbers() -> impl Strategy<Value = BTreeSet<u32>> {
    prop::collection::btree_set(1u32..400, 0..120)
}

proptest! {
    #[test]
    fn partition_is_exact(numbers in image_numbers(), batch_size in 1usize..40, overlap: bool) {
        let batches = partition(numbers.iter().copied(), batch_size, overlap);
        let mut seen: Vec<u32> = batches.iter().flat_map(|b| b.images().to_vec()).collect();
        let total = seen.len();
        seen.sort_unstable();
        seen.dedup();
        prop_assert_eq!(total, numbers.len());
        prop_assert_eq!(seen, numbers.into_iter().collect::<Vec<u32>>());
    }

    #[test]
    fn batches_are_contiguous_and_capped(numbers in image_numbers(), batch_size in 1usize..40) {
        let batches = partition(numbers.iter().copied(), batch_size, false);
        for batch in &batches {
            prop_assert!(!batch.is_empty());
            prop_assert!(batch.len() <= batch_size);
            for pair in batch.images().windows(2) {
                prop_assert_eq!(pair[1], pair[0] + 1);
            }
        }
        // Batches come out in ascending image order
        for pair in batches.windows(2) {
            prop_assert!(pair[0].last() < pair[1].first());
        }
    }

    #[test]
    fn overlap_gives_singletons(numbers in image_numbers(), batch_size in 1usize..40) {
        let batches = partition(numbers.iter().copied(), batch_size, true);
        prop_assert_eq!(batches.len(), numbers.len());
        for (batch, number) in batches.iter().zip(&numbers) {
            prop_assert_eq!(batch.images(), &[*number][..]);
        }
    }

    #[test]
    fn starting_angle_round_trips(
        first in 1u32..100_000,
        oscillation in 0.001f64..5.0,
        start in -360.0f64..360.0,
    ) {
        let params = RunParameters {
            detector_type: libdozor_control::detector::DetectorType::Eiger4M,
            beamline: None,
            exposure_time: 0.01,
            spot_size: 3,
            spot_level: None,
            detector_distance: 200.0,
            wavelength: 0.97,
            fraction_polarization: None,
            orgx: 1000.0,
            orgy: 1000.0,
            oscillation_range: oscillation,
            image_step: None,
            starting_angle: start,
            first_image_number: first,
            number_images: 1,
            name_template_image: String::from("/data/x_????.cbf"),
            wedge_number: None,
            overlap: 0.0,
            radiation_damage: false,
            on_cluster: false,
        };
        let recovered = params.overall_starting_angle()
            + (first as f64 - 1.0) * oscillation;
        prop_assert!((recovered - start).abs() < 1e-6);
        let mid = params.image_angle(first);
        prop_assert!((mid - start - oscillation / 2.0).abs() < 1e-9);
    }
}
