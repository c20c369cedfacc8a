//! Tracking results in forms other programs consume: CSV records, draw data
//! and text dumps.

pub mod csv;
pub mod debug;
pub mod draw;
pub mod palette;

pub use self::csv::{
    ClusterRow, CsvLayout, CsvReport, CsvRow, PathNodeRow, TrackColumns, TrackInfoRow, TrackRow,
};
pub use draw::{ClusterDraw, PathDraw, PathDrawMode, PathLinkDraw, PathNodeDraw, TrackDraw};
pub use palette::{Palette, Rgb};
