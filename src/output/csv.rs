//! CSV export of clusters, tracks, path nodes and per-frame tracking figures.

use std::collections::BTreeMap;
use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::tracker::{BlobTracker, Cluster, PathNode, Track, TrackerConfig};

/// Row ordering and file layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CsvLayout {
    /// Rows in the order they are written
    #[default]
    ByTime,
    /// Rows grouped by label, then by frame; written on finish
    ByLabel,
    /// One output per label
    Split,
}

/// A CSV record belonging to one labelled object in one frame.
pub trait CsvRow: Serialize {
    fn label(&self) -> u32;
    fn frame(&self) -> u64;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterRow {
    pub frame: u64,
    pub time: f64,
    pub label: u32,
    pub track_labels: String,
    pub area: f64,
    pub rad: f64,
    pub angle: f64,
    pub x: f64,
    pub y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contour: Option<String>,
}

impl ClusterRow {
    pub fn new(frame: u64, time: f64, cluster: &Cluster, with_contour: bool) -> Self {
        Self {
            frame,
            time,
            label: cluster.label,
            track_labels: cluster.labels_string(),
            area: cluster.area,
            rad: cluster.radius,
            angle: cluster.angle,
            x: cluster.x,
            y: cluster.y,
            contour: with_contour.then(|| format_contour(cluster.contour.as_deref())),
        }
    }
}

impl CsvRow for ClusterRow {
    fn label(&self) -> u32 {
        self.label
    }

    fn frame(&self) -> u64 {
        self.frame
    }
}

/// Optional track columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackColumns {
    /// Smoothed area and axis lengths
    pub means: bool,
    /// Contour of the matched cluster
    pub contour: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackRow {
    pub frame: u64,
    pub time: f64,
    pub label: u32,
    pub x: f64,
    pub y: f64,
    pub v: f64,
    pub a: f64,
    pub dist_tot: f64,
    pub dist_origin: f64,
    pub angle: f64,
    pub v_angle: f64,
    pub a_angle: f64,
    pub area: f64,
    pub rad: f64,
    pub length_major: f64,
    pub length_minor: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_area: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_length_major: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_length_minor: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contour: Option<String>,
}

impl TrackRow {
    /// Build a row in physical units: distances scale with `pixel_size`, areas
    /// with its square, and rates are per second when the frame rate is known.
    pub fn new(
        frame: u64,
        track: &Track,
        cluster: Option<&Cluster>,
        config: &TrackerConfig,
        columns: TrackColumns,
    ) -> Self {
        let px = config.pixel_size;
        let rate = if config.fps > 0.0 { config.fps } else { 1.0 };
        let motion = track.motion_summary(config.motion_window());
        let mean = |v: f64| columns.means.then_some(v);
        Self {
            frame,
            time: config.frame_time(frame),
            label: track.label,
            x: track.x * px,
            y: track.y * px,
            v: motion.velocity * px * rate,
            a: motion.acceleration * px * rate * rate,
            dist_tot: track.total_dist * px,
            dist_origin: track.distance_from_origin() * px,
            angle: track.orientation,
            v_angle: motion.angular_velocity * rate,
            a_angle: motion.angular_acceleration * rate * rate,
            area: track.area * px * px,
            rad: track.radius * px,
            length_major: track.length_major * px,
            length_minor: track.length_minor * px,
            mean_area: mean(track.mean_area * px * px),
            mean_length_major: mean(track.mean_length_major * px),
            mean_length_minor: mean(track.mean_length_minor * px),
            contour: columns
                .contour
                .then(|| format_contour(cluster.and_then(|c| c.contour.as_deref()))),
        }
    }
}

impl CsvRow for TrackRow {
    fn label(&self) -> u32 {
        self.label
    }

    fn frame(&self) -> u64 {
        self.frame
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathNodeRow {
    pub frame: u64,
    pub time: f64,
    pub label: u32,
    pub age: u32,
    pub usage: u32,
    pub last_use: u32,
    pub x: f64,
    pub y: f64,
}

impl PathNodeRow {
    pub fn new(frame: u64, time: f64, node: &PathNode) -> Self {
        Self {
            frame,
            time,
            label: node.label,
            age: node.age,
            usage: node.usage_count,
            last_use: node.last_use,
            x: node.x,
            y: node.y,
        }
    }
}

impl CsvRow for PathNodeRow {
    fn label(&self) -> u32 {
        self.label
    }

    fn frame(&self) -> u64 {
        self.frame
    }
}

/// Per-frame tracking figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackInfoRow {
    pub frame: u64,
    pub clusters: usize,
    pub tracks: usize,
    pub active_tracks: usize,
    pub match_rate: f64,
    pub distance: f64,
    pub lifetime: f64,
}

impl TrackInfoRow {
    pub fn new(tracker: &BlobTracker) -> Self {
        let stats = tracker.stats();
        Self {
            frame: tracker.frame_index(),
            clusters: tracker.clusters().len(),
            tracks: tracker.tracks().len(),
            active_tracks: stats.active_tracks,
            match_rate: stats.track_matching.average(),
            distance: stats.track_distance.average(),
            lifetime: stats.track_lifetime.average(),
        }
    }
}

fn format_contour(contour: Option<&[(i32, i32)]>) -> String {
    contour
        .unwrap_or_default()
        .iter()
        .map(|(x, y)| format!("{x} {y}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rows for the current clusters.
pub fn cluster_rows(tracker: &BlobTracker, with_contour: bool) -> Vec<ClusterRow> {
    let frame = tracker.frame_index();
    let time = tracker.config().frame_time(frame);
    tracker
        .clusters()
        .iter()
        .map(|cluster| ClusterRow::new(frame, time, cluster, with_contour))
        .collect()
}

/// Rows for the current tracks.
pub fn track_rows(tracker: &BlobTracker, columns: TrackColumns) -> Vec<TrackRow> {
    let frame = tracker.frame_index();
    tracker
        .tracks()
        .iter()
        .map(|track| {
            let cluster = track.cluster_index.and_then(|ci| tracker.clusters().get(ci));
            TrackRow::new(frame, track, cluster, tracker.config(), columns)
        })
        .collect()
}

/// Rows for the current path nodes.
pub fn path_node_rows(tracker: &BlobTracker) -> Vec<PathNodeRow> {
    let frame = tracker.frame_index();
    let time = tracker.config().frame_time(frame);
    tracker
        .paths()
        .nodes()
        .iter()
        .map(|node| PathNodeRow::new(frame, time, node))
        .collect()
}

type WriterFactory<W> = Box<dyn FnMut(u32) -> Result<W>>;

enum Sink<W: Write> {
    Single(csv::Writer<W>),
    Split {
        open: WriterFactory<W>,
        writers: BTreeMap<u32, csv::Writer<W>>,
    },
}

/// CSV output of one row type in a chosen layout.
pub struct CsvReport<W: Write, R: CsvRow> {
    layout: CsvLayout,
    sink: Sink<W>,
    pending: Vec<R>,
}

impl<W: Write, R: CsvRow> CsvReport<W, R> {
    /// Single output, [`CsvLayout::ByTime`] or [`CsvLayout::ByLabel`].
    pub fn new(writer: W, layout: CsvLayout) -> Result<Self> {
        if layout == CsvLayout::Split {
            return Err(Error::InvalidConfig(
                "split layout needs one writer per label, use CsvReport::split".into(),
            ));
        }
        Ok(Self {
            layout,
            sink: Sink::Single(csv::Writer::from_writer(writer)),
            pending: Vec::new(),
        })
    }

    /// One output per label, opened on the label's first row.
    pub fn split(open: impl FnMut(u32) -> Result<W> + 'static) -> Self {
        Self {
            layout: CsvLayout::Split,
            sink: Sink::Split {
                open: Box::new(open),
                writers: BTreeMap::new(),
            },
            pending: Vec::new(),
        }
    }

    pub fn layout(&self) -> CsvLayout {
        self.layout
    }

    pub fn write(&mut self, row: R) -> Result<()> {
        if self.layout == CsvLayout::ByLabel {
            self.pending.push(row);
            return Ok(());
        }
        self.emit(&row)
    }

    pub fn write_all(&mut self, rows: impl IntoIterator<Item = R>) -> Result<()> {
        for row in rows {
            self.write(row)?;
        }
        Ok(())
    }

    fn emit(&mut self, row: &R) -> Result<()> {
        match &mut self.sink {
            Sink::Single(writer) => writer.serialize(row)?,
            Sink::Split { open, writers } => {
                let label = row.label();
                let writer = match writers.entry(label) {
                    std::collections::btree_map::Entry::Occupied(entry) => entry.into_mut(),
                    std::collections::btree_map::Entry::Vacant(entry) => {
                        log::debug!("opening csv output for label {label}");
                        entry.insert(csv::Writer::from_writer(open(label)?))
                    }
                };
                writer.serialize(row)?;
            }
        }
        Ok(())
    }

    /// Write any grouped rows, flush, and hand back the outputs; split outputs
    /// come in label order.
    pub fn finish(mut self) -> Result<Vec<W>> {
        let mut pending = std::mem::take(&mut self.pending);
        pending.sort_by_key(|row| (row.label(), row.frame()));
        for row in &pending {
            self.emit(row)?;
        }
        let writers = match self.sink {
            Sink::Single(writer) => vec![writer],
            Sink::Split { writers, .. } => writers.into_values().collect(),
        };
        writers
            .into_iter()
            .map(|writer| writer.into_inner().map_err(|err| Error::Io(err.into_error())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::{BlobDescriptor, FrameSize};

    fn tracker() -> BlobTracker {
        BlobTracker::new(TrackerConfig {
            min_area: Some(10.0),
            max_area: Some(40.0),
            max_move: Some(8.0),
            fps: 10.0,
            ..Default::default()
        })
        .unwrap()
    }

    fn text(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_cluster_rows_by_time() {
        let mut tracker = tracker();
        tracker.update(
            &[
                BlobDescriptor::new(1, 10.0, 10.0, 20.0),
                BlobDescriptor::new(2, 50.0, 50.0, 25.0),
            ],
            FrameSize::new(100, 100),
        );
        let mut report = CsvReport::new(Vec::new(), CsvLayout::ByTime).unwrap();
        report.write_all(cluster_rows(&tracker, false)).unwrap();
        let out = text(report.finish().unwrap().remove(0));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "frame,time,label,track_labels,area,rad,angle,x,y");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("1,0.1,1,0,20.0,"));
    }

    #[test]
    fn test_track_columns() {
        let mut tracker = tracker();
        for step in 0..3 {
            let x = 10.0 + 2.0 * step as f64;
            tracker.update(&[BlobDescriptor::new(1, x, 10.0, 20.0)], FrameSize::new(100, 100));
        }
        let rows = track_rows(&tracker, TrackColumns::default());
        assert_eq!(rows.len(), 1);
        // 2 pixels per frame at 10 frames per second
        assert!((rows[0].v - 20.0).abs() < 1e-9);
        assert!((rows[0].dist_tot - 4.0).abs() < 1e-9);
        assert!(rows[0].mean_area.is_none());

        let mut report = CsvReport::new(Vec::new(), CsvLayout::ByTime).unwrap();
        report
            .write_all(track_rows(&tracker, TrackColumns { means: true, contour: false }))
            .unwrap();
        let out = text(report.finish().unwrap().remove(0));
        assert!(out.lines().next().unwrap().ends_with(
            "length_minor,mean_area,mean_length_major,mean_length_minor"
        ));
    }

    #[test]
    fn test_by_label_groups_rows() {
        let row = |frame, label| PathNodeRow {
            frame,
            time: 0.0,
            label,
            age: 1,
            usage: 1,
            last_use: 1,
            x: 0.0,
            y: 0.0,
        };
        let mut report = CsvReport::new(Vec::new(), CsvLayout::ByLabel).unwrap();
        report
            .write_all([row(1, 2), row(1, 1), row(2, 2), row(2, 1)])
            .unwrap();
        let out = text(report.finish().unwrap().remove(0));
        let keys: Vec<(String, String)> = out
            .lines()
            .skip(1)
            .map(|line| {
                let fields: Vec<&str> = line.split(',').collect();
                (fields[0].to_string(), fields[2].to_string())
            })
            .collect();
        let expected = [("1", "1"), ("2", "1"), ("1", "2"), ("2", "2")];
        assert_eq!(
            keys,
            expected.map(|(f, l)| (f.to_string(), l.to_string())).to_vec()
        );
    }

    #[test]
    fn test_split_layout() {
        let mut report: CsvReport<Vec<u8>, PathNodeRow> = CsvReport::split(|_| Ok(Vec::new()));
        for label in [3, 1, 3] {
            report
                .write(PathNodeRow {
                    frame: 1,
                    time: 0.0,
                    label,
                    age: 1,
                    usage: 1,
                    last_use: 1,
                    x: 0.0,
                    y: 0.0,
                })
                .unwrap();
        }
        let outputs = report.finish().unwrap();
        assert_eq!(outputs.len(), 2);
        assert_eq!(text(outputs[0].clone()).lines().count(), 2);
        assert_eq!(text(outputs[1].clone()).lines().count(), 3);
    }

    #[test]
    fn test_split_needs_factory() {
        assert!(CsvReport::<Vec<u8>, PathNodeRow>::new(Vec::new(), CsvLayout::Split).is_err());
    }

    #[test]
    fn test_track_info_row() {
        let mut tracker = tracker();
        tracker.update(&[BlobDescriptor::new(1, 10.0, 10.0, 20.0)], FrameSize::new(100, 100));
        let row = TrackInfoRow::new(&tracker);
        assert_eq!((row.frame, row.clusters, row.tracks), (1, 1, 1));
    }
}
