use biotrack_rs::output::csv::{CsvLayout, CsvReport, TrackColumns, track_rows};
use biotrack_rs::{
    Algorithm, BlobBuilder, BlobDescriptor, BlobSource, BlobTracker, FrameSize, TrackState,
    TrackerConfig, TrackerPipeline,
};

const FRAME: FrameSize = FrameSize {
    width: 100,
    height: 100,
};

fn fixed_config() -> TrackerConfig {
    TrackerConfig {
        min_area: Some(10.0),
        max_area: Some(40.0),
        max_move: Some(5.0),
        ..Default::default()
    }
}

fn blob(label: u32, x: f64, y: f64) -> BlobDescriptor {
    BlobDescriptor::new(label, x, y, 20.0)
}

#[test]
fn test_basic_tracking() {
    let mut tracker = BlobTracker::new(fixed_config()).unwrap();

    // Frames 1-2: two organisms are picked up but not reported yet
    assert!(tracker.update(&[blob(1, 20.0, 20.0), blob(2, 70.0, 70.0)], FRAME).is_empty());
    assert_eq!(tracker.tracks().len(), 2);
    assert!(tracker.update(&[blob(1, 21.0, 20.0), blob(2, 70.0, 71.0)], FRAME).is_empty());

    // Frame 3: min_active matched frames reached
    let active = tracker.update(&[blob(1, 22.0, 20.0), blob(2, 70.0, 72.0)], FRAME);
    assert_eq!(active.len(), 2);
    let left = active.iter().find(|t| t.x < 50.0).unwrap().label;
    let right = active.iter().find(|t| t.x > 50.0).unwrap().label;
    assert_ne!(left, right);

    // Frames 4-6: the right organism disappears, the left keeps its label
    for step in 0..3 {
        let x = 23.0 + step as f64;
        let active = tracker.update(&[blob(1, x, 20.0)], FRAME);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].label, left);
        let missing = tracker.track(right).unwrap();
        assert_eq!(missing.inactive_count, step + 1);
        assert_eq!(tracker.track_state(missing), TrackState::Inactive);
    }

    // Frame 7: one miss too many, the track is gone
    tracker.update(&[blob(1, 26.0, 20.0)], FRAME);
    assert!(tracker.track(right).is_none());

    // Frame 8: the organism comes back as a new identity
    tracker.update(&[blob(1, 27.0, 20.0), blob(2, 70.0, 72.0)], FRAME);
    let labels: Vec<u32> = tracker.tracks().iter().map(|t| t.label).collect();
    assert!(labels.contains(&left));
    assert!(labels.iter().all(|&l| l != right));
    assert_eq!(tracker.tracks().len(), 2);
}

#[test]
fn test_oversized_blob_drops_frame() {
    for algorithm in [Algorithm::Greedy, Algorithm::Optimal] {
        let mut tracker = BlobTracker::new(TrackerConfig {
            algorithm,
            ..fixed_config()
        })
        .unwrap();
        let organisms = [blob(1, 20.0, 20.0), blob(2, 60.0, 60.0)];
        for _ in 0..3 {
            tracker.update(&organisms, FRAME);
        }
        assert_eq!(tracker.active_tracks().len(), 2);

        // a blob over a tenth of the frame marks the whole frame as corrupted
        let mut corrupted = organisms.to_vec();
        corrupted.push(BlobDescriptor::new(3, 50.0, 50.0, 1500.0));
        assert!(tracker.update(&corrupted, FRAME).is_empty());
        assert!(tracker.clusters().is_empty());
        assert!(tracker.tracks().iter().all(|t| t.inactive_count == 1));

        // the next clean frame picks both tracks up again
        let active = tracker.update(&organisms, FRAME);
        assert_eq!(active.len(), 2, "{algorithm:?}");
        assert!(tracker.tracks().iter().all(|t| t.inactive_count == 0));
    }
}

/// 50 background specks and 50 organisms laid out on a grid.
fn calibration_frame() -> Vec<BlobDescriptor> {
    let noise = (0..50).map(|i| 3.0 + (i % 4) as f64);
    let objects = (0..50).map(|i| 40.0 + (i % 21) as f64);
    noise
        .chain(objects)
        .enumerate()
        .map(|(i, area)| {
            let (col, row) = (i % 10, i / 10);
            BlobDescriptor::new(
                i as u32 + 1,
                50.0 + 80.0 * col as f64,
                50.0 + 80.0 * row as f64,
                area,
            )
        })
        .collect()
}

#[test]
fn test_calibration_restarts_tracking() {
    let mut tracker = BlobTracker::new(TrackerConfig::default()).unwrap();
    let frame = FrameSize::new(1000, 1000);
    let blobs = calibration_frame();

    // Frames 1-9: everything above the pixel floor is tracked provisionally
    for _ in 0..9 {
        tracker.update(&blobs, frame);
        assert!(!tracker.calibrator().is_area_finalized());
    }
    assert_eq!(tracker.tracks().len(), 100);

    // Frame 10: the area range is final and tracking starts over
    assert!(tracker.update(&blobs, frame).is_empty());
    assert!(tracker.calibrator().is_area_finalized());
    assert!(!tracker.calibrator().is_move_finalized());
    assert!(tracker.tracks().is_empty());
    let area = tracker.calibrator().area().unwrap();
    assert!(area.min > 6.0 && area.min < 40.0, "{area:?}");

    // Frame 11: specks are filtered out, oversized organisms do not spawn
    tracker.update(&blobs, frame);
    assert_eq!(tracker.clusters().len(), 50);
    let spawned = blobs
        .iter()
        .filter(|b| b.area >= area.min && b.area < area.max)
        .count();
    assert_eq!(tracker.tracks().len(), spawned);
    assert!(tracker.tracks().iter().all(|t| t.label >= 100));
}

fn drive(tracker: &mut BlobTracker, xs: &[f64], frame: FrameSize) {
    for &x in xs {
        tracker.update(&[blob(1, x, 50.0)], frame);
    }
}

#[test]
fn test_path_graph_replay() {
    let mut tracker = BlobTracker::new(TrackerConfig {
        max_move: Some(20.0),
        path_distance: 6.0,
        ..fixed_config()
    })
    .unwrap();
    let frame = FrameSize::new(200, 200);
    let out: Vec<f64> = (0..11).map(|i| 20.0 + 4.0 * i as f64).collect();
    let round_trip: Vec<f64> = out.iter().chain(out.iter().rev().skip(1)).copied().collect();

    drive(&mut tracker, &round_trip, frame);
    drive(&mut tracker, &round_trip[1..], frame);

    let nodes = tracker.paths().nodes().len();
    let links: Vec<(u32, u32)> = tracker.paths().links().iter().map(|l| (l.from, l.to)).collect();
    assert!(nodes > 1);
    assert!(tracker.paths().links().iter().all(|l| l.forward == 2 && l.reverse == 2));

    // the same route again only adds usage
    drive(&mut tracker, &round_trip[1..], frame);
    let paths = tracker.paths();
    assert_eq!(paths.nodes().len(), nodes);
    let replayed: Vec<(u32, u32)> = paths.links().iter().map(|l| (l.from, l.to)).collect();
    assert_eq!(replayed, links);
    assert!(paths.links().iter().all(|l| l.forward == 3 && l.reverse == 3));
    assert_eq!(tracker.tracks().len(), 1);
}

#[test]
fn test_csv_by_label() {
    let mut tracker = BlobTracker::new(TrackerConfig {
        fps: 10.0,
        pixel_size: 0.5,
        ..fixed_config()
    })
    .unwrap();
    let mut report = CsvReport::new(Vec::new(), CsvLayout::ByLabel).unwrap();
    for step in 0..4 {
        let offset = 2.0 * step as f64;
        tracker.update(&[blob(1, 20.0 + offset, 20.0), blob(2, 70.0, 70.0 - offset)], FRAME);
        report.write_all(track_rows(&tracker, TrackColumns::default())).unwrap();
    }

    let out = String::from_utf8(report.finish().unwrap().remove(0)).unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 9);
    assert!(lines[0].starts_with("frame,time,label,x,y,v,a"));

    let rows: Vec<Vec<&str>> = lines[1..].iter().map(|l| l.split(',').collect()).collect();
    let labels: Vec<&str> = rows.iter().map(|r| r[2]).collect();
    assert_eq!(labels, ["0", "0", "0", "0", "1", "1", "1", "1"]);
    let frames: Vec<&str> = rows.iter().map(|r| r[0]).collect();
    assert_eq!(frames, ["1", "2", "3", "4", "1", "2", "3", "4"]);

    // 2 pixels per frame, half a unit per pixel, 10 frames per second
    let v: f64 = rows[3][5].parse().unwrap();
    assert!((v - 10.0).abs() < 1e-9);
    let x: f64 = rows[3][3].parse().unwrap();
    assert!((x - 13.0).abs() < 1e-9);
}

/// Treats every nonzero mask byte as part of a single organism.
struct SingleBlobSource;

impl BlobSource for SingleBlobSource {
    type Error = biotrack_rs::Error;

    fn blobs(&mut self, mask: &[u8], frame: FrameSize) -> Result<Vec<BlobDescriptor>, Self::Error> {
        let width = frame.width as usize;
        let pixels: Vec<(i32, i32)> = mask
            .iter()
            .enumerate()
            .filter(|(_, v)| **v != 0)
            .map(|(i, _)| ((i % width) as i32, (i / width) as i32))
            .collect();
        if pixels.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![BlobBuilder::new().label(1).pixels(pixels).build()?])
    }
}

fn square_mask(width: usize, height: usize, x0: usize, y0: usize, side: usize) -> Vec<u8> {
    let mut mask = vec![0u8; width * height];
    for y in y0..y0 + side {
        for x in x0..x0 + side {
            mask[y * width + x] = 255;
        }
    }
    mask
}

#[test]
fn test_pipeline_from_masks() {
    let mut pipeline = TrackerPipeline::new(SingleBlobSource, fixed_config()).unwrap();

    let mut active = Vec::new();
    for step in 0..4 {
        let mask = square_mask(64, 48, 10 + 2 * step, 20, 5);
        active.push(pipeline.process_frame(&mask, 64, 48).unwrap().len());
    }
    assert_eq!(active, [0, 0, 1, 1]);

    let track = &pipeline.tracker().tracks()[0];
    assert_eq!(track.area, 25.0);
    assert!((track.x - 18.0).abs() < 1e-9);
    assert!((track.y - 22.0).abs() < 1e-9);
    assert!((track.total_dist - 6.0).abs() < 1e-9);
}
