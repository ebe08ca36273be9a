#[cfg(test)]
mod tests {
    use crate::cluster::{
        ClusterError, EuclideanDistance, GridClustering, Point, ProgressSink, uniform_edges,
    };
    use quickcheck::quickcheck;

    /// Records every progress value reported by the engine
    #[derive(Default)]
    struct Recorder {
        total: Option<usize>,
        values: Vec<usize>,
        finished: bool,
    }

    impl ProgressSink for Recorder {
        fn start(&mut self, total: usize) {
            self.total = Some(total);
        }
        fn set(&mut self, done: usize) {
            self.values.push(done);
        }
        fn finish(&mut self) {
            self.finished = true;
        }
    }

    fn sorted_points(engine: &GridClustering<EuclideanDistance>) -> Vec<Vec<usize>> {
        let mut clusters: Vec<Vec<usize>> = engine
            .results()
            .values()
            .map(|c| {
                let mut pts = c.points().to_vec();
                pts.sort();
                pts
            })
            .collect();
        clusters.sort();
        clusters
    }

    #[test]
    fn test_points_out_of_reach_stay_apart() {
        let xs = [0.5, 5.5];
        let ys = [0.5, 0.5];
        let mut engine = GridClustering::new(
            EuclideanDistance,
            &xs,
            &ys,
            uniform_edges(0.0, 10.0, 1.0).unwrap(),
            vec![0.0, 1.0],
        )
        .unwrap();
        assert_eq!(engine.active_len(), 0);

        engine.cluster().unwrap();
        assert_eq!(sorted_points(&engine), vec![vec![0], vec![1]]);
    }

    #[test]
    fn test_simple_pair_merges() {
        let mut engine = GridClustering::with_properties(
            EuclideanDistance,
            &[2.0, 3.0],
            &[5.0, 5.0],
            &[7, 7],
            &[1, 2],
            vec![0.0, 10.0],
            vec![0.0, 10.0],
        )
        .unwrap();
        assert_eq!(engine.active_len(), 2);

        engine.cluster().unwrap();
        let results = engine.results();
        assert_eq!(results.len(), 1);

        let cluster = &results[&0];
        assert_eq!(cluster.points(), &[0, 1]);
        assert_eq!(cluster.centroid(), &Point([2.5, 5.0]));
        assert_eq!(cluster.bounding_box().min(), Point([2.0, 5.0]));
        assert_eq!(cluster.bounding_box().max(), Point([3.0, 5.0]));
        assert_eq!(cluster.property_a(), Some(7));
        assert_eq!(engine.active_len(), 0);
    }

    #[test]
    fn test_veto_blocks_merge() {
        let mut engine = GridClustering::with_properties(
            EuclideanDistance,
            &[2.0, 3.0],
            &[5.0, 5.0],
            &[1, 2],
            &[1, 2],
            vec![0.0, 10.0],
            vec![0.0, 10.0],
        )
        .unwrap();
        engine.cluster().unwrap();
        assert_eq!(sorted_points(&engine), vec![vec![0], vec![1]]);
    }

    #[test]
    fn test_shared_property_b_blocks_merge() {
        let mut engine = GridClustering::with_properties(
            EuclideanDistance,
            &[2.0, 3.0, 9.0],
            &[5.0, 5.0, 5.0],
            &[1, 1, 1],
            &[4, 4, 5],
            vec![0.0, 10.0],
            vec![0.0, 10.0],
        )
        .unwrap();
        engine.cluster().unwrap();
        // 0 and 1 both carry B = 4, so 1 pairs with the farther point 2
        assert_eq!(sorted_points(&engine), vec![vec![0], vec![1, 2]]);
    }

    #[test]
    fn test_chain_merge() {
        let mut engine = GridClustering::new(
            EuclideanDistance,
            &[0.0, 1.0, 2.0],
            &[0.0, 0.0, 0.0],
            vec![0.0, 3.0],
            vec![0.0, 1.0],
        )
        .unwrap();
        engine.cluster().unwrap();

        let results = engine.results();
        assert_eq!(results.len(), 1);
        let cluster = results.values().next().unwrap();
        assert!((cluster.centroid().x() - 1.0).abs() < 1e-12);
        let mut pts = cluster.points().to_vec();
        pts.sort();
        assert_eq!(pts, vec![0, 1, 2]);
    }

    #[test]
    fn test_remove_small_clusters_y() {
        let mut engine = GridClustering::new(
            EuclideanDistance,
            &[0.0, 0.0, 10.0, 10.0],
            &[0.0, 0.5, 0.0, 1.5],
            uniform_edges(0.0, 10.0, 1.0).unwrap(),
            vec![0.0, 2.0],
        )
        .unwrap();
        engine.cluster().unwrap();
        assert_eq!(engine.final_len(), 2);

        engine.remove_small_clusters_y(1.0);
        let results = engine.results();
        assert_eq!(results.keys().copied().collect::<Vec<_>>(), vec![2]);
        assert_eq!(results[&2].bounding_box().height(), 1.5);

        engine.remove_small_clusters_y(1.0);
        assert_eq!(engine.final_len(), 1);
    }

    #[test]
    fn test_remove_small_clusters_y_nan_threshold_keeps_all() {
        let mut engine = GridClustering::new(
            EuclideanDistance,
            &[0.0, 0.0, 10.0],
            &[0.0, 0.5, 0.0],
            uniform_edges(0.0, 10.0, 1.0).unwrap(),
            vec![0.0, 2.0],
        )
        .unwrap();
        engine.cluster().unwrap();
        assert_eq!(engine.final_len(), 2);

        // no height is strictly below NaN
        engine.remove_small_clusters_y(f64::NAN);
        assert_eq!(sorted_points(&engine), vec![vec![0, 1], vec![2]]);
    }

    #[test]
    fn test_extend_clusters_y() {
        let mut engine = GridClustering::new(
            EuclideanDistance,
            &[1.0, 2.0, 1.5, 2.5, 8.0],
            &[0.2, 0.4, 8.2, 8.4, 15.0],
            vec![0.0, 10.0],
            uniform_edges(0.0, 20.0, 1.0).unwrap(),
        )
        .unwrap();
        engine.cluster().unwrap();
        assert_eq!(sorted_points(&engine), vec![vec![0, 1], vec![2, 3], vec![4]]);

        engine.extend_clusters_y().unwrap();
        let results = engine.results();
        assert_eq!(results.keys().copied().collect::<Vec<_>>(), vec![2, 4]);
        assert_eq!(sorted_points(&engine), vec![vec![0, 1, 2, 3], vec![4]]);

        let merged = &results[&2];
        assert_eq!(merged.bounding_box().min(), Point([1.0, 0.2]));
        assert_eq!(merged.bounding_box().max(), Point([2.5, 8.4]));
        assert!((merged.centroid().y() - 4.3).abs() < 1e-12);
    }

    #[test]
    fn test_extend_clusters_y_single_sweep() {
        // A overlaps B, B does not overlap C, A + B would overlap C
        let mut engine = GridClustering::new(
            EuclideanDistance,
            &[0.0, 1.0, 0.5, 1.5, 0.0, 0.2],
            &[0.0, 0.0, 6.0, 6.0, 12.0, 12.0],
            vec![0.0, 10.0],
            uniform_edges(0.0, 20.0, 1.0).unwrap(),
        )
        .unwrap();
        engine.cluster().unwrap();
        assert_eq!(engine.final_len(), 3);

        engine.extend_clusters_y().unwrap();
        assert_eq!(sorted_points(&engine), vec![vec![0, 1, 2, 3], vec![4, 5]]);
    }

    #[test]
    fn test_extend_clusters_y_per_x_bin() {
        // 0, 1, 2 share the second x bin, 3 sits alone in the first
        let mut engine = GridClustering::new(
            EuclideanDistance,
            &[1.0, 1.0, 1.0, 0.25],
            &[0.0, 10.0, 18.0, 5.0],
            vec![0.0, 0.5, 10.0],
            uniform_edges(0.0, 20.0, 1.0).unwrap(),
        )
        .unwrap();
        engine.cluster().unwrap();
        assert_eq!(engine.final_len(), 4);

        engine.extend_clusters_y().unwrap();
        assert_eq!(sorted_points(&engine), vec![vec![0, 1, 2], vec![3]]);
    }

    #[test]
    fn test_empty_input() {
        let mut engine =
            GridClustering::new(EuclideanDistance, &[], &[], vec![0.0, 1.0], vec![0.0, 1.0])
                .unwrap();
        engine.cluster().unwrap();
        engine.extend_clusters_y().unwrap();
        assert!(engine.results().is_empty());
        assert_eq!(engine.active_len(), 0);
    }

    #[test]
    fn test_configuration_errors() {
        let outside = GridClustering::new(
            EuclideanDistance,
            &[0.5, 2.0],
            &[0.5, 0.5],
            vec![0.0, 1.0],
            vec![0.0, 1.0],
        );
        assert_eq!(
            outside.err(),
            Some(ClusterError::OutsideGrid { x: 2.0, y: 0.5 })
        );

        let mismatch = GridClustering::new(
            EuclideanDistance,
            &[0.5, 0.6],
            &[0.5],
            vec![0.0, 1.0],
            vec![0.0, 1.0],
        );
        assert_eq!(
            mismatch.err(),
            Some(ClusterError::LengthMismatch {
                name: "data_y",
                expected: 2,
                actual: 1
            })
        );

        let non_finite = GridClustering::new(
            EuclideanDistance,
            &[f64::NAN],
            &[0.5],
            vec![0.0, 1.0],
            vec![0.0, 1.0],
        );
        assert!(matches!(
            non_finite.err(),
            Some(ClusterError::NonFinitePoint { index: 0, .. })
        ));

        let bad_grid = GridClustering::new(EuclideanDistance, &[0.5], &[0.5], vec![0.0], vec![0.0, 1.0]);
        assert!(matches!(bad_grid.err(), Some(ClusterError::TooFewEdges { .. })));
    }

    #[test]
    fn test_custom_metric_and_progress() {
        let manhattan = |a: &Point, b: &Point| (a.x() - b.x()).abs() + (a.y() - b.y()).abs();
        let xs = [0.0, 0.3, 0.9, 5.0, 5.2];
        let ys = [0.0, 0.1, 0.0, 5.0, 5.1];
        let mut engine = GridClustering::new(
            manhattan,
            &xs,
            &ys,
            uniform_edges(0.0, 6.0, 1.0).unwrap(),
            uniform_edges(0.0, 6.0, 1.0).unwrap(),
        )
        .unwrap();

        let mut recorder = Recorder::default();
        engine.cluster_with_progress(&mut recorder).unwrap();
        assert_eq!(recorder.total, Some(5));
        assert!(recorder.finished);
        assert!(recorder.values.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(recorder.values.last(), Some(&5));
        // one value per merge plus the final one
        assert_eq!(recorder.values.len(), xs.len() - engine.final_len() + 1);
        assert_eq!(engine.final_len(), 2);
    }

    /// Coordinates on a 1/8 lattice inside [0, 32)
    fn coordinates(points: &[(u8, u8)]) -> (Vec<f64>, Vec<f64>) {
        points
            .iter()
            .map(|&(x, y)| (x as f64 / 8.0, y as f64 / 8.0))
            .unzip()
    }

    fn lattice_edges() -> Vec<f64> {
        uniform_edges(0.0, 32.0, 2.0).unwrap()
    }

    #[test]
    fn test_partition_invariant() {
        fn prop(points: Vec<(u8, u8)>, extend: bool) -> bool {
            let (xs, ys) = coordinates(&points);
            let mut engine =
                GridClustering::new(EuclideanDistance, &xs, &ys, lattice_edges(), lattice_edges())
                    .unwrap();
            engine.cluster().unwrap();
            if extend {
                engine.extend_clusters_y().unwrap();
            }

            let mut all: Vec<usize> = engine
                .results()
                .values()
                .flat_map(|c| c.points().to_vec())
                .collect();
            all.sort();
            all == (0..points.len()).collect::<Vec<_>>()
        }
        quickcheck(prop as fn(Vec<(u8, u8)>, bool) -> bool);
    }

    #[test]
    fn test_property_a_never_mixed() {
        fn prop(points: Vec<(u8, u8, u8)>) -> bool {
            let pairs: Vec<(u8, u8)> = points.iter().map(|&(x, y, _)| (x, y)).collect();
            let (xs, ys) = coordinates(&pairs);
            let props_a: Vec<i32> = points.iter().map(|&(_, _, a)| (a % 3) as i32).collect();
            let props_b = vec![-1; points.len()];

            let mut engine = GridClustering::with_properties(
                EuclideanDistance,
                &xs,
                &ys,
                &props_a,
                &props_b,
                lattice_edges(),
                lattice_edges(),
            )
            .unwrap();
            engine.cluster().unwrap();

            engine.results().values().all(|c| {
                c.points()
                    .iter()
                    .all(|&i| Some(props_a[i]) == c.property_a())
            })
        }
        quickcheck(prop as fn(Vec<(u8, u8, u8)>) -> bool);
    }

    #[test]
    fn test_bounding_boxes_cover_members() {
        fn prop(points: Vec<(u8, u8)>) -> bool {
            let (xs, ys) = coordinates(&points);
            let mut engine =
                GridClustering::new(EuclideanDistance, &xs, &ys, lattice_edges(), lattice_edges())
                    .unwrap();
            engine.cluster().unwrap();
            engine.extend_clusters_y().unwrap();

            engine.results().values().all(|c| {
                let bbox = c.bounding_box();
                bbox.contains(c.centroid())
                    && c.points().iter().all(|&i| bbox.contains(&Point([xs[i], ys[i]])))
            })
        }
        quickcheck(prop as fn(Vec<(u8, u8)>) -> bool);
    }

    #[test]
    fn test_filter_is_idempotent() {
        fn prop(points: Vec<(u8, u8)>, threshold: u8) -> bool {
            let (xs, ys) = coordinates(&points);
            let threshold = threshold as f64 / 16.0;
            let mut engine =
                GridClustering::new(EuclideanDistance, &xs, &ys, lattice_edges(), lattice_edges())
                    .unwrap();
            engine.cluster().unwrap();

            engine.remove_small_clusters_y(threshold);
            let once = engine.results();
            engine.remove_small_clusters_y(threshold);
            once == engine.results()
                && once.values().all(|c| c.bounding_box().height() >= threshold)
        }
        quickcheck(prop as fn(Vec<(u8, u8)>, u8) -> bool);
    }
}
