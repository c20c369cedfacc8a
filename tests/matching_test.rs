use biotrack_rs::tracker::matching::total_match_factor;
use biotrack_rs::tracker::{Cluster, GreedyAlgorithm, MatchAlgorithm, OptimalAlgorithm, Scoring, Track};
use biotrack_rs::{BlobDescriptor, TrackClusterMatch};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn cluster(label: u32, x: f64, y: f64, area: f64) -> Cluster {
    Cluster::from_blob(&BlobDescriptor::new(label, x, y, area))
}

/// A track seen once at `(x, y)`.
fn track(label: u32, x: f64, y: f64, area: f64) -> Track {
    let mut seed = cluster(0, x, y, area);
    seed.assign(label, area);
    let mut track = Track::new(label, 50);
    track.update(&seed, f64::INFINITY, 1000.0, false);
    track.unassign();
    track
}

fn scenario(rng: &mut StdRng) -> (Vec<Cluster>, Vec<Track>) {
    let nclusters = rng.gen_range(2..7);
    let ntracks = rng.gen_range(2..7);
    let clusters = (0..nclusters)
        .map(|i| {
            cluster(
                i + 1,
                rng.gen_range(0.0..40.0),
                rng.gen_range(0.0..40.0),
                rng.gen_range(20.0..30.0),
            )
        })
        .collect();
    let tracks = (0..ntracks)
        .map(|i| {
            track(
                i,
                rng.gen_range(0.0..40.0),
                rng.gen_range(0.0..40.0),
                rng.gen_range(20.0..30.0),
            )
        })
        .collect();
    (clusters, tracks)
}

fn check_solution(matches: &[TrackClusterMatch], clusters: &[Cluster], tracks: &[Track]) {
    let mut seen = vec![false; tracks.len()];
    for m in matches {
        assert!(!seen[m.track_index], "track {} matched twice", m.track_label);
        seen[m.track_index] = true;
        assert!(m.assigned);
        assert_eq!(tracks[m.track_index].cluster_index, Some(m.cluster_index));
        assert!(clusters[m.cluster_index].assigned_tracks().contains(&m.track_label));
    }
    for cluster in clusters {
        // with these areas no cluster can host two tracks
        assert!(cluster.assigned_tracks().len() <= 1);
    }
    let matched = tracks.iter().filter(|t| t.assigned).count();
    assert_eq!(matched, matches.len());
}

#[test]
fn test_optimal_never_worse_than_greedy() {
    let mut rng = StdRng::seed_from_u64(7);
    let scoring = Scoring::new(10.0, false);

    for _ in 0..200 {
        let (mut clusters, mut tracks) = scenario(&mut rng);

        let greedy = GreedyAlgorithm::default().solve(&mut clusters, &mut tracks, &scoring);
        check_solution(&greedy, &clusters, &tracks);

        let optimal = OptimalAlgorithm::default().solve(&mut clusters, &mut tracks, &scoring);
        check_solution(&optimal, &clusters, &tracks);

        let (g, o) = (total_match_factor(&greedy), total_match_factor(&optimal));
        assert!(o >= g - 1e-9, "optimal {o} < greedy {g}");
    }
}

fn mixed_scenario(rng: &mut StdRng) -> (Vec<Cluster>, Vec<Track>) {
    let nclusters = rng.gen_range(1..5);
    let ntracks = rng.gen_range(2..8);
    let clusters = (0..nclusters)
        .map(|i| {
            cluster(
                i + 1,
                rng.gen_range(0.0..10.0),
                rng.gen_range(0.0..10.0),
                rng.gen_range(10.0..120.0),
            )
        })
        .collect();
    let tracks = (0..ntracks)
        .map(|i| {
            track(
                i,
                rng.gen_range(0.0..10.0),
                rng.gen_range(0.0..10.0),
                rng.gen_range(5.0..100.0),
            )
        })
        .collect();
    (clusters, tracks)
}

fn check_merges(matches: &[TrackClusterMatch], clusters: &[Cluster], tracks: &[Track]) {
    let mut seen = vec![false; tracks.len()];
    for m in matches {
        assert!(!seen[m.track_index], "track {} matched twice", m.track_label);
        seen[m.track_index] = true;
    }
    for cluster in clusters {
        let hosted = cluster.assigned_tracks().len();
        assert!(hosted <= 5);
        if hosted > 1 {
            assert!(cluster.assigned_area() * 0.75 < cluster.area);
        }
    }
}

#[test]
fn test_optimal_never_worse_than_greedy_with_merges() {
    let mut rng = StdRng::seed_from_u64(23);
    // every pair is within range
    let scoring = Scoring::new(50.0, false);

    for _ in 0..300 {
        let (mut clusters, mut tracks) = mixed_scenario(&mut rng);

        let greedy = GreedyAlgorithm::default().solve(&mut clusters, &mut tracks, &scoring);
        check_merges(&greedy, &clusters, &tracks);

        let optimal = OptimalAlgorithm::default().solve(&mut clusters, &mut tracks, &scoring);
        check_merges(&optimal, &clusters, &tracks);
        assert_eq!(tracks.iter().filter(|t| t.assigned).count(), optimal.len());

        let (g, o) = (total_match_factor(&greedy), total_match_factor(&optimal));
        assert!(o >= g - 1e-9, "optimal {o} < greedy {g}");
    }
}

#[test]
fn test_merge_respects_assignability() {
    let mut rng = StdRng::seed_from_u64(11);
    let scoring = Scoring::new(15.0, false);

    for _ in 0..100 {
        // one large cluster surrounded by small tracks
        let mut clusters = vec![cluster(1, 20.0, 20.0, rng.gen_range(40.0..160.0))];
        let mut tracks: Vec<Track> = (0..rng.gen_range(2..8))
            .map(|i| {
                track(
                    i,
                    20.0 + rng.gen_range(-4.0..4.0),
                    20.0 + rng.gen_range(-4.0..4.0),
                    rng.gen_range(15.0..30.0),
                )
            })
            .collect();

        let mut greedy = GreedyAlgorithm::default();
        let mut optimal = OptimalAlgorithm::default();
        let solvers: [&mut dyn MatchAlgorithm; 2] = [&mut greedy, &mut optimal];
        for solver in solvers {
            let matches = solver.solve(&mut clusters, &mut tracks, &scoring);
            let host = &clusters[0];
            // the first track always fits, later ones must leave room
            assert!(!matches.is_empty());
            assert_eq!(host.assigned_tracks().len(), matches.len());
            assert!(host.assigned_tracks().len() <= 5);
            if host.assigned_tracks().len() > 1 {
                assert!(host.assigned_area() * 0.75 < host.area);
            }
            let mut labels: Vec<u32> = matches.iter().map(|m| m.track_label).collect();
            labels.sort_unstable();
            labels.dedup();
            assert_eq!(labels.len(), matches.len());
        }
    }
}
