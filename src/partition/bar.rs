use crossterm::event::{MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::{Position, Rect};
use tracing::debug;

use crate::osprober::OsProberIndex;

use super::format_size;

/// Filesystem tag marking unusable/free space.
pub const FS_FREE: &str = "free";
/// Filesystem tag marking a synthetic placeholder segment.
pub const FS_AUTO: &str = "auto";

/// Cells reserved to the right of a segment label.
pub const LABEL_MARGIN: u16 = 40;
/// Cells between a label's color swatch and its text.
pub const SWATCH_OFFSET: u16 = 18;

/// How close (in cells) a press must land to the resize handle.
const HANDLE_GRAB_DISTANCE: i32 = 3;

/// One displayed segment of a disk, in on-disk offset order inside its
/// owning bar.
#[derive(Debug, Clone)]
pub struct Partition {
    pub path: String,
    pub size: u64,
    pub fs: String,
    pub name: String,
}

impl Partition {
    /// Without an explicit name, the display name comes from the
    /// os-prober index, falling back to the device path with its
    /// `/dev/` prefix stripped. Swap is never probed: os-prober only
    /// reports "swap" for it, and the filesystem is shown anyway.
    pub fn new(path: &str, size: u64, fs: &str, name: Option<&str>, index: &OsProberIndex) -> Self {
        let name = match name {
            Some(name) => name.to_string(),
            None => {
                let probed = if fs == "linux-swap" {
                    None
                } else {
                    index.lookup(path)
                };
                probed
                    .map(str::to_string)
                    .unwrap_or_else(|| path.trim_start_matches("/dev/").to_string())
            }
        };
        Self {
            path: path.to_string(),
            size,
            fs: fs.to_string(),
            name: format!("{name} ({fs})"),
        }
    }
}

/// The single partition currently eligible for interactive resize.
///
/// The drag protocol is a three-state machine: `Idle` (no
/// `ResizeState`), `Ready` (state set, not dragging), `Dragging`.
#[derive(Debug, Clone)]
pub struct ResizeState {
    pub index: usize,
    pub minsize: u64,
    pub maxsize: u64,
    pub prefsize: u64,
    dragging: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BarEvent {
    PartitionResized { path: String, size: u64 },
}

/// Proportional horizontal chart of one disk's partitions.
///
/// Invariant: the partition sizes always sum to `disk_size`; it is
/// re-checked after every mutation, and a violation is a bug in the
/// byte accounting, not a recoverable condition.
#[derive(Debug, Clone, Default)]
pub struct PartitionsBar {
    partitions: Vec<Partition>,
    disk_size: u64,
    resize: Option<ResizeState>,
    osindex: OsProberIndex,
}

impl PartitionsBar {
    pub fn new(osindex: OsProberIndex) -> Self {
        Self {
            osindex,
            ..Self::default()
        }
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    pub fn disk_size(&self) -> u64 {
        self.disk_size
    }

    pub fn resize_target(&self) -> Option<&ResizeState> {
        self.resize.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.resize.as_ref().is_some_and(|state| state.dragging)
    }

    pub fn add_partition(&mut self, path: &str, size: u64, fs: &str) {
        let name = (fs == FS_FREE).then_some("free space");
        let partition = Partition::new(path, size, fs, name, &self.osindex);
        self.partitions.push(partition);
        self.disk_size += size;
    }

    pub fn add_named_partition(&mut self, path: &str, size: u64, fs: &str, name: &str) {
        let partition = Partition::new(path, size, fs, Some(name), &self.osindex);
        self.partitions.push(partition);
        self.disk_size += size;
    }

    /// Mark the partition at `path` as the bar's resize target, shrink
    /// it to `prefsize`, and hand the freed delta to its follower: an
    /// existing free-space follower absorbs it, anything else gets a
    /// synthetic `auto` partition named `label` inserted in between.
    ///
    /// An unknown `path` leaves the bar untouched. `prefsize` is
    /// clamped into `[minsize, maxsize]` and capped at the current
    /// size.
    pub fn set_resize_partition(
        &mut self,
        path: &str,
        minsize: u64,
        maxsize: u64,
        prefsize: u64,
        label: &str,
    ) {
        let Some(index) = self.partitions.iter().position(|p| p.path == path) else {
            debug!("resize target {path} not present in bar");
            return;
        };

        let current = self.partitions[index].size;
        let prefsize = prefsize.min(maxsize).max(minsize).min(current);
        let delta = current - prefsize;
        self.partitions[index].size = prefsize;

        let follower_is_free = self
            .partitions
            .get(index + 1)
            .is_some_and(|p| p.fs == FS_FREE);
        if follower_is_free {
            self.partitions[index + 1].size += delta;
        } else {
            let filler = Partition::new("", delta, FS_AUTO, Some(label), &self.osindex);
            self.partitions.insert(index + 1, filler);
        }

        self.resize = Some(ResizeState {
            index,
            minsize,
            maxsize,
            prefsize,
            dragging: false,
        });
        self.assert_sum();
    }

    /// Segment cell widths for the given total width, using
    /// error-diffusion rounding: the fractional remainder of each
    /// segment is carried into the next, so the widths always sum to
    /// `width - 1` regardless of per-segment truncation.
    pub fn segment_widths(&self, width: u16) -> Vec<u16> {
        let effective = f64::from(width.saturating_sub(1));
        if self.disk_size == 0 {
            return vec![0; self.partitions.len()];
        }
        let mut widths = Vec::with_capacity(self.partitions.len());
        let mut remainder = 0.0_f64;
        for partition in &self.partitions {
            remainder += effective * partition.size as f64 / self.disk_size as f64;
            let cells = remainder.round().max(0.0);
            remainder -= cells;
            widths.push(cells as u16);
        }
        widths
    }

    /// x offsets of the per-segment labels, accumulating left to right;
    /// each label reserves its text width plus the fixed margin and the
    /// swatch offset.
    pub fn label_positions(&self) -> Vec<u16> {
        let mut positions = Vec::with_capacity(self.partitions.len());
        let mut x: u16 = 0;
        for partition in &self.partitions {
            positions.push(x);
            let text_width = partition
                .name
                .chars()
                .count()
                .max(format_size(partition.size).chars().count()) as u16;
            x = x.saturating_add(text_width + LABEL_MARGIN + SWATCH_OFFSET);
        }
        positions
    }

    /// x of the resize handle: the left edge of the segment following
    /// the resize partition.
    pub fn handle_x(&self, width: u16) -> Option<u16> {
        let resize = self.resize.as_ref()?;
        let widths = self.segment_widths(width);
        Some(widths.iter().take(resize.index + 1).sum())
    }

    /// Route a pointer event hitting `area` (the rect the bar was
    /// rendered into) through the resize state machine. Only emits an
    /// event while dragging.
    pub fn handle_mouse(&mut self, event: MouseEvent, area: Rect) -> Option<BarEvent> {
        self.resize.as_ref()?;
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if !area.contains(Position::new(event.column, event.row)) {
                    return None;
                }
                let handle = self.handle_x(area.width)?;
                let handle_col = i32::from(area.x) + i32::from(handle);
                if (i32::from(event.column) - handle_col).abs() < HANDLE_GRAB_DISTANCE {
                    if let Some(state) = self.resize.as_mut() {
                        state.dragging = true;
                    }
                }
                None
            }
            MouseEventKind::Drag(MouseButton::Left) if self.is_dragging() => {
                self.drag_to(event.column, area)
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if let Some(state) = self.resize.as_mut() {
                    state.dragging = false;
                }
                None
            }
            _ => None,
        }
    }

    fn drag_to(&mut self, column: u16, area: Rect) -> Option<BarEvent> {
        let (index, minsize, maxsize, prefsize) = {
            let state = self.resize.as_ref()?;
            (state.index, state.minsize, state.maxsize, state.prefsize)
        };
        if area.width < 2 || self.disk_size == 0 || prefsize == 0 {
            return None;
        }

        let bytes_per_cell = self.disk_size as f64 / f64::from(area.width - 1);
        let preceding: u64 = self.partitions[..index].iter().map(|p| p.size).sum();

        // pointer position in bytes within the resize partition
        let local = f64::from(column.saturating_sub(area.x));
        let target = local * bytes_per_cell - preceding as f64;
        let clamped = target.clamp(minsize as f64, maxsize as f64);

        // resize proportionally to the preferred size rather than
        // linearly to the raw pointer offset
        let scale = clamped / prefsize as f64;
        let new_size = (prefsize as f64 * scale).round() as u64;

        let old_size = self.partitions[index].size;
        self.partitions[index].size = new_size;
        let follower = &mut self.partitions[index + 1];
        let adjusted = follower.size as i128 - (new_size as i128 - old_size as i128);
        assert!(adjusted >= 0, "resize delta exceeded the following partition");
        follower.size = adjusted as u64;

        self.assert_sum();

        Some(BarEvent::PartitionResized {
            path: self.partitions[index].path.clone(),
            size: new_size,
        })
    }

    fn assert_sum(&self) {
        let total: u64 = self.partitions.iter().map(|p| p.size).sum();
        assert_eq!(
            total, self.disk_size,
            "partition sizes must cover the disk exactly"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn bar() -> PartitionsBar {
        PartitionsBar::new(OsProberIndex::new())
    }

    fn mouse(kind: MouseEventKind, column: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row: 0,
            modifiers: KeyModifiers::empty(),
        }
    }

    fn press(bar: &mut PartitionsBar, column: u16, area: Rect) {
        let _ = bar.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), column), area);
    }

    fn drag(bar: &mut PartitionsBar, column: u16, area: Rect) -> Option<BarEvent> {
        bar.handle_mouse(mouse(MouseEventKind::Drag(MouseButton::Left), column), area)
    }

    #[test]
    fn display_names_fall_back_to_the_device_path() {
        let mut index = OsProberIndex::new();
        index.insert("/dev/sdc1", "Windows 10");

        let probed = Partition::new("/dev/sdc1", 1000, "ntfs", None, &index);
        assert_eq!(probed.name, "Windows 10 (ntfs)");

        let unprobed = Partition::new("/dev/sdb2", 1000, "ext4", None, &index);
        assert_eq!(unprobed.name, "sdb2 (ext4)");

        let explicit = Partition::new("", 1000, "auto", Some("Meridian"), &index);
        assert_eq!(explicit.name, "Meridian (auto)");
    }

    #[test]
    fn swap_skips_the_os_prober() {
        let mut index = OsProberIndex::new();
        index.insert("/dev/sda5", "not an os");
        let part = Partition::new("/dev/sda5", 1000, "linux-swap", None, &index);
        assert_eq!(part.name, "sda5 (linux-swap)");
    }

    #[test]
    fn add_partition_accumulates_disk_size() {
        let mut bar = bar();
        bar.add_partition("/dev/sdb1", 57_511_125_504, "ext4");
        bar.add_partition("/dev/sdb5", 2_500_452_864, "linux-swap");
        assert_eq!(bar.disk_size(), 60_011_578_368);
        assert_eq!(bar.partitions().len(), 2);
    }

    #[test]
    fn segment_widths_sum_to_the_effective_width() {
        let cases: Vec<Vec<u64>> = vec![
            vec![57_511_125_504, 2_500_452_864],
            vec![5_000, 20_000, 30_000, 50_000],
            vec![1, 1, 1, 10_000_000_000],
            vec![4_005_679_104, 53_505_446_400, 2_500_452_864],
            vec![7; 13],
        ];
        for sizes in cases {
            let mut bar = bar();
            for (i, size) in sizes.iter().enumerate() {
                bar.add_partition(&format!("/dev/sdz{i}"), *size, "ext4");
            }
            for width in [10u16, 80, 101, 500] {
                let widths = bar.segment_widths(width);
                let total: u16 = widths.iter().sum();
                assert_eq!(total, width - 1, "sizes {sizes:?} at width {width}");
            }
        }
    }

    #[test]
    fn resize_with_free_follower_absorbs_the_delta() {
        let mut bar = bar();
        bar.add_partition("/dev/sda1", 1000, "ext4");
        bar.add_partition("/dev/sda2", 2000, "free");
        bar.set_resize_partition("/dev/sda1", 100, 1000, 600, "Meridian");

        assert_eq!(bar.partitions().len(), 2);
        assert_eq!(bar.partitions()[0].size, 600);
        assert_eq!(bar.partitions()[1].size, 2400);
        assert_eq!(bar.disk_size(), 3000);
    }

    #[test]
    fn resize_with_used_follower_inserts_a_synthetic_partition() {
        let mut bar = bar();
        bar.add_partition("/dev/sda1", 1000, "ext4");
        bar.add_partition("/dev/sda2", 2000, "ntfs");
        bar.set_resize_partition("/dev/sda1", 100, 1000, 600, "Meridian");

        assert_eq!(bar.partitions().len(), 3);
        assert_eq!(bar.partitions()[0].size, 600);
        assert_eq!(bar.partitions()[1].size, 400);
        assert_eq!(bar.partitions()[1].fs, FS_AUTO);
        assert_eq!(bar.partitions()[1].name, "Meridian (auto)");
        assert_eq!(bar.partitions()[2].size, 2000);
        assert_eq!(bar.disk_size(), 3000);
    }

    #[test]
    fn resize_at_the_tail_inserts_a_synthetic_partition() {
        let mut bar = bar();
        bar.add_partition("/dev/sda1", 1000, "ext4");
        bar.set_resize_partition("/dev/sda1", 100, 1000, 250, "Meridian");
        assert_eq!(bar.partitions().len(), 2);
        assert_eq!(bar.partitions()[1].size, 750);
    }

    #[test]
    fn unknown_resize_target_is_a_no_op() {
        let mut bar = bar();
        bar.add_partition("/dev/sda1", 1000, "ext4");
        bar.set_resize_partition("/dev/sdb9", 100, 900, 500, "Meridian");
        assert!(bar.resize_target().is_none());
        assert_eq!(bar.partitions().len(), 1);
        assert_eq!(bar.partitions()[0].size, 1000);
    }

    #[test]
    fn prefsize_is_clamped_into_the_resize_range() {
        let mut bar = bar();
        bar.add_partition("/dev/sda1", 1000, "ext4");
        bar.add_partition("/dev/sda2", 500, "free");
        // below minsize: starts at minsize, not under it
        bar.set_resize_partition("/dev/sda1", 400, 900, 100, "Meridian");
        assert_eq!(bar.partitions()[0].size, 400);
        assert_eq!(bar.partitions()[1].size, 1100);
    }

    #[test]
    fn drag_moves_bytes_between_target_and_follower() {
        let mut bar = bar();
        bar.add_partition("/dev/sda1", 6_000, "ext4");
        bar.add_partition("/dev/sda2", 4_000, "free");
        bar.set_resize_partition("/dev/sda1", 1_000, 6_000, 3_000, "Meridian");

        // width 101 -> effective width 100 -> 100 bytes per cell
        let area = Rect::new(0, 0, 101, 3);
        let handle = bar.handle_x(area.width).expect("handle");
        assert_eq!(handle, 30);

        press(&mut bar, 30, area);
        assert!(bar.is_dragging());

        let event = drag(&mut bar, 45, area).expect("resize event");
        assert_eq!(
            event,
            BarEvent::PartitionResized {
                path: "/dev/sda1".to_string(),
                size: 4_500,
            }
        );
        assert_eq!(bar.partitions()[1].size, 5_500);
        assert_eq!(
            bar.partitions().iter().map(|p| p.size).sum::<u64>(),
            bar.disk_size()
        );
    }

    #[test]
    fn drag_clamps_to_the_resize_bounds() {
        let mut bar = bar();
        bar.add_partition("/dev/sda1", 6_000, "ext4");
        bar.add_partition("/dev/sda2", 4_000, "free");
        bar.set_resize_partition("/dev/sda1", 1_000, 6_000, 3_000, "Meridian");

        let area = Rect::new(0, 0, 101, 3);
        press(&mut bar, 30, area);

        let event = drag(&mut bar, 0, area).expect("clamped to min");
        assert_eq!(
            event,
            BarEvent::PartitionResized {
                path: "/dev/sda1".to_string(),
                size: 1_000,
            }
        );
        assert_eq!(bar.partitions()[1].size, 9_000);

        let event = drag(&mut bar, 100, area).expect("clamped to max");
        assert_eq!(
            event,
            BarEvent::PartitionResized {
                path: "/dev/sda1".to_string(),
                size: 6_000,
            }
        );
        assert_eq!(bar.partitions()[1].size, 4_000);
    }

    #[test]
    fn sum_invariant_holds_across_a_drag_sequence() {
        let mut bar = bar();
        bar.add_partition("/dev/sdb1", 57_511_125_504, "ext4");
        bar.add_partition("/dev/sdb5", 2_500_452_864, "linux-swap");
        bar.set_resize_partition(
            "/dev/sdb1",
            230_989_824,
            55_143_440_896,
            52_143_440_896,
            "Meridian",
        );

        let area = Rect::new(0, 0, 501, 3);
        let handle = bar.handle_x(area.width).expect("handle");
        press(&mut bar, handle, area);
        for column in [handle + 10, handle - 40, 3, 499, handle] {
            let _ = drag(&mut bar, column, area);
            assert_eq!(
                bar.partitions().iter().map(|p| p.size).sum::<u64>(),
                bar.disk_size()
            );
        }
    }

    #[test]
    fn press_away_from_the_handle_does_not_start_a_drag() {
        let mut bar = bar();
        bar.add_partition("/dev/sda1", 6_000, "ext4");
        bar.add_partition("/dev/sda2", 4_000, "free");
        bar.set_resize_partition("/dev/sda1", 1_000, 6_000, 3_000, "Meridian");

        let area = Rect::new(0, 0, 101, 3);
        press(&mut bar, 50, area);
        assert!(!bar.is_dragging());
        assert!(drag(&mut bar, 60, area).is_none());
    }

    #[test]
    fn release_ends_the_drag_unconditionally() {
        let mut bar = bar();
        bar.add_partition("/dev/sda1", 6_000, "ext4");
        bar.add_partition("/dev/sda2", 4_000, "free");
        bar.set_resize_partition("/dev/sda1", 1_000, 6_000, 3_000, "Meridian");

        let area = Rect::new(0, 0, 101, 3);
        press(&mut bar, 30, area);
        assert!(bar.is_dragging());
        let _ = bar.handle_mouse(mouse(MouseEventKind::Up(MouseButton::Left), 90), area);
        assert!(!bar.is_dragging());
    }
}
