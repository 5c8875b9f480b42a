use crossterm::event::{KeyCode, KeyEvent, MouseEvent};
use ratatui::layout::Rect;
use tracing::warn;

use crate::backend::{
    CacheEntry, CreateRequest, DeviceCache, KNOWN_FILESYSTEMS, MethodChoice, PartAction,
    PartitionEdits, PartitionKind, PartitionOps, PartitionPlace, StepGate,
};
use crate::input::InputBuffer;
use crate::osprober::OsProberIndex;

use super::bar::{BarEvent, PartitionsBar};
use super::tree::PartitionTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogField {
    Size,
    Kind,
    Place,
    Method,
    Mountpoint,
    Format,
}

pub struct CreateDialog {
    pub devpart: String,
    pub size_mb: InputBuffer,
    pub max_size_mb: u64,
    pub kind: PartitionKind,
    pub show_kind: bool,
    pub place: PartitionPlace,
    pub methods: Vec<MethodChoice>,
    pub method_index: usize,
    pub mountpoints: Vec<String>,
    pub mount_index: usize,
    pub mount_enabled: bool,
    pub focus: DialogField,
}

pub struct EditDialog {
    pub devpart: String,
    pub show_size: bool,
    pub size_mb: InputBuffer,
    pub min_size_mb: u64,
    pub max_size_mb: u64,
    current_size_mb: Option<u64>,
    pub methods: Vec<MethodChoice>,
    pub method_index: usize,
    current_method: Option<String>,
    pub show_format: bool,
    pub format: bool,
    pub format_enabled: bool,
    current_format: bool,
    pub mountpoints: Vec<String>,
    pub mount_index: usize,
    pub mount_enabled: bool,
    current_mountpoint: Option<String>,
    pub focus: DialogField,
}

pub enum PartDialog {
    Create(CreateDialog),
    Edit(EditDialog),
}

/// The manual-partitioning page: the tree view over the backend cache,
/// one partition bar per disk (only the selected disk's bar is
/// visible), per-selection action enablement, and the create/edit
/// dialogs. Every mutating request goes through the step gate.
pub struct ManualPartPage {
    tree: PartitionTree,
    bars: Vec<PartitionsBar>,
    active_bar: Option<usize>,
    selected: usize,
    actions: Vec<PartAction>,
    undo_enabled: bool,
    dialog: Option<PartDialog>,
    bar_area: Option<Rect>,
    osindex: OsProberIndex,
}

impl ManualPartPage {
    pub fn new(osindex: OsProberIndex) -> Self {
        Self {
            tree: PartitionTree::new(),
            bars: Vec::new(),
            active_bar: None,
            selected: 0,
            actions: Vec::new(),
            undo_enabled: false,
            dialog: None,
            bar_area: None,
            osindex,
        }
    }

    /// Rebuild the tree and the bar arena from the backend cache, in
    /// cache order: a bar per disk, partitions appended to the current
    /// disk's bar. The first disk's bar becomes visible.
    pub fn update(&mut self, cache: &DeviceCache) {
        self.tree.clear();
        self.bars.clear();
        self.active_bar = None;
        self.dialog = None;
        self.selected = 0;
        self.actions.clear();
        self.undo_enabled = false;

        let mut current_bar: Option<usize> = None;
        for key in &cache.order {
            if let Some(disk) = cache.disks.get(key) {
                self.bars.push(PartitionsBar::new(self.osindex.clone()));
                current_bar = Some(self.bars.len() - 1);
                if self.active_bar.is_none() {
                    self.active_bar = current_bar;
                }
                self.tree
                    .append(key.clone(), CacheEntry::Disk(disk.clone()), current_bar);
            } else if let Some(part) = cache.partitions.get(key) {
                self.tree
                    .append(key.clone(), CacheEntry::Partition(part.clone()), current_bar);
                if let Some(bar) = current_bar.and_then(|idx| self.bars.get_mut(idx)) {
                    bar.add_partition(&part.parted.path, part.parted.size, &part.parted.fs);
                }
            } else {
                warn!("cache order references unknown key {key}");
            }
        }
    }

    pub fn tree(&self) -> &PartitionTree {
        &self.tree
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn active_bar(&self) -> Option<&PartitionsBar> {
        self.active_bar.and_then(|idx| self.bars.get(idx))
    }

    pub fn dialog(&self) -> Option<&PartDialog> {
        self.dialog.as_ref()
    }

    pub fn action_enabled(&self, action: PartAction) -> bool {
        self.actions.contains(&action)
    }

    pub fn undo_enabled(&self) -> bool {
        self.undo_enabled
    }

    pub fn set_bar_area(&mut self, area: Rect) {
        self.bar_area = Some(area);
    }

    /// Recompute bar visibility and action enablement for the current
    /// selection.
    pub fn refresh_selection(&mut self, ops: &dyn PartitionOps) {
        self.actions.clear();
        self.undo_enabled = false;
        let Some(row) = self.tree.row(self.selected) else {
            self.active_bar = None;
            return;
        };
        self.active_bar = row.bar;
        self.actions = ops.available_actions(&row.key, &row.entry);
        self.undo_enabled = true;
    }

    pub fn select(&mut self, index: usize, ops: &dyn PartitionOps) {
        if index < self.tree.len() {
            self.selected = index;
            self.refresh_selection(ops);
        }
    }

    pub fn handle_key(
        &mut self,
        key: KeyEvent,
        ops: &mut dyn PartitionOps,
        gate: &mut dyn StepGate,
    ) {
        if self.dialog.is_some() {
            self.handle_dialog_key(key, ops, gate);
            return;
        }

        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                if self.selected + 1 < self.tree.len() {
                    self.selected += 1;
                    self.refresh_selection(ops);
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                if self.selected > 0 {
                    self.selected -= 1;
                    self.refresh_selection(ops);
                }
            }
            KeyCode::Char('n') => {
                if self.action_enabled(PartAction::New) {
                    self.open_create(ops, gate);
                }
            }
            KeyCode::Char('e') => {
                if self.action_enabled(PartAction::Edit) {
                    self.open_edit(ops, gate);
                }
            }
            KeyCode::Char('d') => {
                if self.action_enabled(PartAction::Delete) {
                    self.request_delete(ops, gate);
                }
            }
            KeyCode::Char('t') => {
                if self.action_enabled(PartAction::NewLabel) {
                    self.request_new_label(ops, gate);
                }
            }
            KeyCode::Char('u') => {
                if self.undo_enabled {
                    self.request_undo(ops, gate);
                }
            }
            KeyCode::Char('f') => {
                self.tree.toggle_format(self.selected, ops, gate);
            }
            KeyCode::Enter => self.activate_selected(ops, gate),
            _ => {}
        }
    }

    /// Forward pointer events to the visible bar.
    pub fn handle_mouse(&mut self, event: MouseEvent) -> Option<BarEvent> {
        let area = self.bar_area?;
        let bar = self.active_bar.and_then(|idx| self.bars.get_mut(idx))?;
        bar.handle_mouse(event, area)
    }

    /// Row activation: an empty disk offers a fresh partition table,
    /// free space with `can_new` opens the create dialog.
    fn activate_selected(&mut self, ops: &mut dyn PartitionOps, gate: &mut dyn StepGate) {
        if !gate.allowed_change_step() {
            return;
        }
        let Some(row) = self.tree.row(self.selected) else {
            return;
        };
        match &row.entry {
            CacheEntry::Disk(disk) => {
                let dev = disk.dev.clone();
                let key = row.key.clone();
                let has_partitions = self.tree.rows().iter().any(|other| {
                    other
                        .partition()
                        .is_some_and(|part| part.dev == dev && part.id.is_some())
                });
                // don't offer to blow away a populated disk on a stray
                // activation
                if !has_partitions {
                    gate.allow_change_step(false);
                    ops.create_label(&key);
                }
            }
            CacheEntry::Partition(part) => {
                if part.parted.fs == "free" && part.can_new {
                    self.open_create(ops, gate);
                }
            }
        }
    }

    fn request_delete(&mut self, ops: &mut dyn PartitionOps, gate: &mut dyn StepGate) {
        if !gate.allowed_change_step() {
            return;
        }
        let Some(row) = self.tree.row(self.selected) else {
            return;
        };
        gate.allow_change_step(false);
        ops.delete_partition(&row.key.clone());
    }

    fn request_new_label(&mut self, ops: &mut dyn PartitionOps, gate: &mut dyn StepGate) {
        if !gate.allowed_change_step() {
            return;
        }
        let Some(row) = self.tree.row(self.selected) else {
            return;
        };
        gate.allow_change_step(false);
        ops.create_label(&row.key.clone());
    }

    fn request_undo(&mut self, ops: &mut dyn PartitionOps, gate: &mut dyn StepGate) {
        if !gate.allowed_change_step() {
            return;
        }
        gate.allow_change_step(false);
        ops.undo();
    }

    fn open_create(&mut self, ops: &dyn PartitionOps, gate: &dyn StepGate) {
        if !gate.allowed_change_step() {
            return;
        }
        let Some(row) = self.tree.row(self.selected) else {
            return;
        };
        let Some(part) = row.partition() else {
            return;
        };

        let show_kind = part.parted.kind == "pri/log";
        let kind = if show_kind {
            // default to logical once the disk already holds a primary
            let dev = &part.dev;
            let has_primary = self.tree.rows().iter().any(|other| {
                other.partition().is_some_and(|p| {
                    p.dev == *dev && p.id.is_some() && p.parted.kind == "primary"
                })
            });
            if has_primary {
                PartitionKind::Logical
            } else {
                PartitionKind::Primary
            }
        } else if part.parted.kind == "logical" {
            PartitionKind::Logical
        } else {
            PartitionKind::Primary
        };

        let max_size_mb = part.parted.size / 1_000_000;
        let mut size_mb = InputBuffer::new();
        size_mb.set(&max_size_mb.to_string());

        let methods = ops.use_as_choices(&row.key);
        let mountpoints: Vec<String> = ops
            .default_mountpoint_choices(None)
            .into_iter()
            .map(|choice| choice.mountpoint)
            .collect();
        let mount_enabled = methods
            .first()
            .is_some_and(|m| KNOWN_FILESYSTEMS.contains(&m.method.as_str()));

        self.dialog = Some(PartDialog::Create(CreateDialog {
            devpart: row.key.clone(),
            size_mb,
            max_size_mb,
            kind,
            show_kind,
            place: PartitionPlace::Beginning,
            methods,
            method_index: 0,
            mountpoints,
            mount_index: 0,
            mount_enabled,
            focus: DialogField::Size,
        }));
    }

    fn open_edit(&mut self, ops: &dyn PartitionOps, gate: &dyn StepGate) {
        if !gate.allowed_change_step() {
            return;
        }
        let Some(row) = self.tree.row(self.selected) else {
            return;
        };
        let Some(part) = row.partition() else {
            return;
        };

        let cur_size_mb = part.parted.size / 1_000_000;
        let show_size =
            part.can_resize && part.resize_min_size.is_some() && part.resize_max_size.is_some();
        // bad things happen if the current size is out of bounds
        let min_size_mb = part
            .resize_min_size
            .map(|min| (min / 1_000_000).min(cur_size_mb))
            .unwrap_or(cur_size_mb);
        let max_size_mb = part
            .resize_max_size
            .map(|max| (max / 1_000_000).max(cur_size_mb))
            .unwrap_or(cur_size_mb);
        let mut size_mb = InputBuffer::new();
        size_mb.set(&cur_size_mb.to_string());

        let methods = part.method_choices.clone();
        let current_method = ops.current_method(part);
        let method_index = current_method
            .as_deref()
            .and_then(|method| methods.iter().position(|m| m.method == method))
            .unwrap_or(0);

        let show_format = part.id.is_some();
        let format_enabled = part.method.is_some() && part.can_activate_format;
        let current_format = part.method.as_deref() == Some("format");

        let mut mountpoints: Vec<String> = part
            .mountpoint_choices
            .iter()
            .map(|choice| choice.mountpoint.clone())
            .collect();
        let current_mountpoint = ops.current_mountpoint(part);
        let mount_index = match &current_mountpoint {
            Some(mountpoint) => match mountpoints.iter().position(|m| m == mountpoint) {
                Some(index) => index,
                None => {
                    mountpoints.push(mountpoint.clone());
                    mountpoints.len() - 1
                }
            },
            None => 0,
        };
        let mount_enabled = methods
            .get(method_index)
            .is_some_and(|m| KNOWN_FILESYSTEMS.contains(&m.method.as_str()));

        self.dialog = Some(PartDialog::Edit(EditDialog {
            devpart: row.key.clone(),
            show_size,
            size_mb,
            min_size_mb,
            max_size_mb,
            current_size_mb: show_size.then_some(cur_size_mb),
            methods,
            method_index,
            current_method,
            show_format,
            format: current_format,
            format_enabled,
            current_format,
            mountpoints,
            mount_index,
            mount_enabled,
            current_mountpoint,
            focus: if show_size {
                DialogField::Size
            } else {
                DialogField::Method
            },
        }));
    }

    fn handle_dialog_key(
        &mut self,
        key: KeyEvent,
        ops: &mut dyn PartitionOps,
        gate: &mut dyn StepGate,
    ) {
        match key.code {
            KeyCode::Esc => {
                self.dialog = None;
            }
            KeyCode::Enter => self.submit_dialog(ops, gate),
            KeyCode::Tab => self.cycle_dialog_focus(1),
            KeyCode::BackTab => self.cycle_dialog_focus(-1),
            KeyCode::Left | KeyCode::Right => {
                let forward = key.code == KeyCode::Right;
                self.cycle_dialog_value(forward, ops);
            }
            KeyCode::Char(' ') => self.toggle_dialog_format(),
            KeyCode::Char(c) if c.is_ascii_digit() => {
                if let Some(buffer) = self.dialog_size_buffer() {
                    buffer.insert(c);
                }
            }
            KeyCode::Backspace => {
                if let Some(buffer) = self.dialog_size_buffer() {
                    buffer.delete_back();
                }
            }
            _ => {}
        }
    }

    fn dialog_fields(&self) -> Vec<DialogField> {
        match &self.dialog {
            Some(PartDialog::Create(dialog)) => {
                let mut fields = vec![DialogField::Size];
                if dialog.show_kind {
                    fields.push(DialogField::Kind);
                }
                fields.push(DialogField::Place);
                fields.push(DialogField::Method);
                if dialog.mount_enabled {
                    fields.push(DialogField::Mountpoint);
                }
                fields
            }
            Some(PartDialog::Edit(dialog)) => {
                let mut fields = Vec::new();
                if dialog.show_size {
                    fields.push(DialogField::Size);
                }
                fields.push(DialogField::Method);
                if dialog.show_format && dialog.format_enabled {
                    fields.push(DialogField::Format);
                }
                if dialog.mount_enabled {
                    fields.push(DialogField::Mountpoint);
                }
                fields
            }
            None => Vec::new(),
        }
    }

    fn cycle_dialog_focus(&mut self, step: i32) {
        let fields = self.dialog_fields();
        if fields.is_empty() {
            return;
        }
        let focus = match &self.dialog {
            Some(PartDialog::Create(dialog)) => dialog.focus,
            Some(PartDialog::Edit(dialog)) => dialog.focus,
            None => return,
        };
        let position = fields.iter().position(|f| *f == focus).unwrap_or(0);
        let next = (position as i32 + step).rem_euclid(fields.len() as i32) as usize;
        match &mut self.dialog {
            Some(PartDialog::Create(dialog)) => dialog.focus = fields[next],
            Some(PartDialog::Edit(dialog)) => dialog.focus = fields[next],
            None => {}
        }
    }

    fn cycle_dialog_value(&mut self, forward: bool, ops: &dyn PartitionOps) {
        match &mut self.dialog {
            Some(PartDialog::Create(dialog)) => match dialog.focus {
                DialogField::Size => {
                    if forward {
                        dialog.size_mb.move_right();
                    } else {
                        dialog.size_mb.move_left();
                    }
                }
                DialogField::Kind => {
                    dialog.kind = match dialog.kind {
                        PartitionKind::Primary => PartitionKind::Logical,
                        PartitionKind::Logical => PartitionKind::Primary,
                    };
                }
                DialogField::Place => {
                    dialog.place = match dialog.place {
                        PartitionPlace::Beginning => PartitionPlace::End,
                        PartitionPlace::End => PartitionPlace::Beginning,
                    };
                }
                DialogField::Method => {
                    dialog.method_index =
                        step_index(dialog.method_index, dialog.methods.len(), forward);
                    if let Some(choice) = dialog.methods.get(dialog.method_index) {
                        let method = choice.method.clone();
                        if KNOWN_FILESYSTEMS.contains(&method.as_str()) {
                            dialog.mount_enabled = true;
                            dialog.mountpoints = ops
                                .default_mountpoint_choices(Some(&method))
                                .into_iter()
                                .map(|choice| choice.mountpoint)
                                .collect();
                        } else {
                            dialog.mount_enabled = false;
                        }
                        dialog.mount_index = 0;
                    }
                }
                DialogField::Mountpoint => {
                    dialog.mount_index =
                        step_index(dialog.mount_index, dialog.mountpoints.len(), forward);
                }
                DialogField::Format => {}
            },
            Some(PartDialog::Edit(dialog)) => match dialog.focus {
                DialogField::Size => {
                    if forward {
                        dialog.size_mb.move_right();
                    } else {
                        dialog.size_mb.move_left();
                    }
                }
                DialogField::Method => {
                    dialog.method_index =
                        step_index(dialog.method_index, dialog.methods.len(), forward);
                    if let Some(choice) = dialog.methods.get(dialog.method_index) {
                        let method = choice.method.clone();
                        if KNOWN_FILESYSTEMS.contains(&method.as_str()) {
                            dialog.mount_enabled = true;
                            dialog.format_enabled = true;
                            dialog.mountpoints = ops
                                .default_mountpoint_choices(Some(&method))
                                .into_iter()
                                .map(|choice| choice.mountpoint)
                                .collect();
                        } else {
                            dialog.mount_enabled = false;
                            dialog.format_enabled = false;
                        }
                        dialog.mount_index = 0;
                    }
                }
                DialogField::Mountpoint => {
                    dialog.mount_index =
                        step_index(dialog.mount_index, dialog.mountpoints.len(), forward);
                }
                DialogField::Format => dialog.format = !dialog.format,
                DialogField::Kind | DialogField::Place => {}
            },
            None => {}
        }
    }

    fn toggle_dialog_format(&mut self) {
        if let Some(PartDialog::Edit(dialog)) = &mut self.dialog {
            if dialog.focus == DialogField::Format && dialog.format_enabled {
                dialog.format = !dialog.format;
            }
        }
    }

    fn dialog_size_buffer(&mut self) -> Option<&mut InputBuffer> {
        match &mut self.dialog {
            Some(PartDialog::Create(dialog)) if dialog.focus == DialogField::Size => {
                Some(&mut dialog.size_mb)
            }
            Some(PartDialog::Edit(dialog)) if dialog.focus == DialogField::Size => {
                Some(&mut dialog.size_mb)
            }
            _ => None,
        }
    }

    fn submit_dialog(&mut self, ops: &mut dyn PartitionOps, gate: &mut dyn StepGate) {
        if !gate.allowed_change_step() {
            return;
        }
        let Some(dialog) = self.dialog.take() else {
            return;
        };
        match dialog {
            PartDialog::Create(dialog) => {
                let size_mb = clamp_size(dialog.size_mb.content(), 1, dialog.max_size_mb);
                let Some(method) = dialog.methods.get(dialog.method_index) else {
                    return;
                };
                let mountpoint = if dialog.mount_enabled {
                    dialog
                        .mountpoints
                        .get(dialog.mount_index)
                        .cloned()
                        .unwrap_or_default()
                } else {
                    String::new()
                };
                gate.allow_change_step(false);
                ops.create_partition(
                    &dialog.devpart,
                    CreateRequest {
                        size_mb: size_mb.to_string(),
                        kind: dialog.kind,
                        place: dialog.place,
                        method: method.method.clone(),
                        mountpoint,
                    },
                );
            }
            PartDialog::Edit(dialog) => {
                let mut edits = PartitionEdits::default();
                if dialog.show_size {
                    let size_mb =
                        clamp_size(dialog.size_mb.content(), dialog.min_size_mb, dialog.max_size_mb);
                    if dialog.current_size_mb != Some(size_mb) {
                        edits.size_mb = Some(size_mb.to_string());
                    }
                }
                if let Some(method) = dialog.methods.get(dialog.method_index) {
                    if dialog.current_method.as_deref() != Some(method.method.as_str()) {
                        edits.method = Some(method.method.clone());
                    }
                }
                if dialog.show_format && dialog.format != dialog.current_format {
                    edits.format = Some(dialog.format);
                }
                if dialog.mount_enabled {
                    let mountpoint = dialog.mountpoints.get(dialog.mount_index).cloned();
                    if mountpoint != dialog.current_mountpoint {
                        edits.mountpoint = mountpoint;
                    }
                }
                if edits.is_empty() {
                    return;
                }
                gate.allow_change_step(false);
                ops.edit_partition(&dialog.devpart, edits);
            }
        }
    }
}

fn step_index(index: usize, len: usize, forward: bool) -> usize {
    if len == 0 {
        return 0;
    }
    if forward {
        (index + 1) % len
    } else {
        (index + len - 1) % len
    }
}

fn clamp_size(text: &str, min_mb: u64, max_mb: u64) -> u64 {
    text.parse::<u64>().unwrap_or(min_mb).clamp(min_mb, max_mb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::{DemoGate, MockBackend};
    use crate::config::LayoutConfig;
    use crossterm::event::{KeyEvent, KeyModifiers};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::empty())
    }

    fn setup() -> (ManualPartPage, MockBackend, DemoGate) {
        let backend = MockBackend::new(LayoutConfig::sample().to_cache());
        let mut page = ManualPartPage::new(OsProberIndex::new());
        page.update(backend.cache());
        page.refresh_selection(&backend);
        (page, backend, DemoGate::new())
    }

    fn row_index(page: &ManualPartPage, path: &str) -> usize {
        page.tree()
            .rows()
            .iter()
            .position(|row| {
                row.partition()
                    .is_some_and(|part| part.parted.path == path)
            })
            .expect("row for path")
    }

    #[test]
    fn update_builds_a_bar_per_disk() {
        let (page, backend, _) = setup();
        let disks = backend.cache().disks.len();
        assert_eq!(page.tree().len(), backend.cache().order.len());
        assert!(page.active_bar().is_some());

        let mut bars = 0;
        for row in page.tree().rows() {
            if matches!(row.entry, CacheEntry::Disk(_)) {
                bars += 1;
            }
        }
        assert_eq!(bars, disks);
    }

    #[test]
    fn partitions_inherit_the_current_disks_bar() {
        let (page, _, _) = setup();
        let mut current = None;
        for row in page.tree().rows() {
            match &row.entry {
                CacheEntry::Disk(_) => current = row.bar,
                CacheEntry::Partition(_) => assert_eq!(row.bar, current),
            }
        }
    }

    #[test]
    fn selection_drives_action_enablement() {
        let (mut page, backend, _) = setup();

        let free = row_index(&page, "/dev/sdb1");
        page.select(free, &backend);
        assert!(page.action_enabled(PartAction::New));
        assert!(!page.action_enabled(PartAction::Delete));

        let used = row_index(&page, "/dev/sda1");
        page.select(used, &backend);
        assert!(page.action_enabled(PartAction::Edit));
        assert!(page.action_enabled(PartAction::Delete));
        assert!(page.undo_enabled());

        page.select(0, &backend);
        assert!(page.action_enabled(PartAction::NewLabel));
    }

    #[test]
    fn delete_is_refused_while_the_gate_is_closed() {
        let (mut page, mut backend, mut gate) = setup();
        let used = row_index(&page, "/dev/sda1");
        page.select(used, &backend);

        gate.allow_change_step(false);
        page.handle_key(key(KeyCode::Char('d')), &mut backend, &mut gate);
        assert!(!backend.take_dirty());

        gate.allow_change_step(true);
        page.handle_key(key(KeyCode::Char('d')), &mut backend, &mut gate);
        assert!(backend.take_dirty());
        assert!(!gate.allowed_change_step());
    }

    #[test]
    fn edit_dialog_reflects_the_partition_bounds() {
        let (mut page, mut backend, mut gate) = setup();
        let used = row_index(&page, "/dev/sda1");
        page.select(used, &backend);
        page.handle_key(key(KeyCode::Char('e')), &mut backend, &mut gate);

        let Some(PartDialog::Edit(dialog)) = page.dialog() else {
            panic!("edit dialog should be open");
        };
        assert!(dialog.show_size);
        assert_eq!(dialog.min_size_mb, 2_758);
        assert_eq!(dialog.max_size_mb, 8_167);
        assert_eq!(dialog.size_mb.content(), "8167");
        assert!(!dialog.methods.is_empty());
    }

    #[test]
    fn unchanged_edit_submits_nothing() {
        let (mut page, mut backend, mut gate) = setup();
        // sda5 already has a method, so the dialog opens with every
        // field at its current value
        let used = row_index(&page, "/dev/sda5");
        page.select(used, &backend);
        page.handle_key(key(KeyCode::Char('e')), &mut backend, &mut gate);
        page.handle_key(key(KeyCode::Enter), &mut backend, &mut gate);

        assert!(page.dialog().is_none());
        assert!(!backend.take_dirty());
        assert!(gate.allowed_change_step());
    }

    #[test]
    fn edited_size_submits_a_single_request() {
        let (mut page, mut backend, mut gate) = setup();
        let used = row_index(&page, "/dev/sda1");
        page.select(used, &backend);
        page.handle_key(key(KeyCode::Char('e')), &mut backend, &mut gate);

        // 8167 -> 4000
        for _ in 0..4 {
            page.handle_key(key(KeyCode::Backspace), &mut backend, &mut gate);
        }
        for c in "4000".chars() {
            page.handle_key(key(KeyCode::Char(c)), &mut backend, &mut gate);
        }
        page.handle_key(key(KeyCode::Enter), &mut backend, &mut gate);

        assert!(backend.take_dirty());
        assert!(!gate.allowed_change_step());
    }

    #[test]
    fn create_dialog_opens_on_free_space() {
        let (mut page, mut backend, mut gate) = setup();
        let free = row_index(&page, "/dev/sdb1");
        page.select(free, &backend);
        page.handle_key(key(KeyCode::Char('n')), &mut backend, &mut gate);

        let Some(PartDialog::Create(dialog)) = page.dialog() else {
            panic!("create dialog should be open");
        };
        assert_eq!(dialog.max_size_mb, 5_074);
        assert_eq!(dialog.size_mb.content(), "5074");
        assert!(!dialog.methods.is_empty());
    }

    #[test]
    fn mouse_events_reach_the_active_bar() {
        let (mut page, _, _) = setup();
        page.set_bar_area(Rect::new(0, 0, 101, 3));
        // no resize partition on manual bars: events are absorbed
        let event = MouseEvent {
            kind: crossterm::event::MouseEventKind::Down(crossterm::event::MouseButton::Left),
            column: 10,
            row: 0,
            modifiers: KeyModifiers::empty(),
        };
        assert!(page.handle_mouse(event).is_none());
    }
}
