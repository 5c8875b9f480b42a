use std::collections::HashMap;

use crossterm::event::{KeyCode, KeyEvent, MouseEvent};
use ratatui::layout::Rect;

use crate::backend::StepGate;
use crate::input::InputBuffer;
use crate::osprober::OsProberIndex;

use super::bar::{BarEvent, PartitionsBar};

/// Human-readable labels of the whole-disk strategies offered by the
/// backend, in the host's language.
#[derive(Debug, Clone)]
pub struct ChoiceLabels {
    pub resize: String,
    pub use_device: String,
    pub lvm: String,
    pub crypto: String,
    pub manual: String,
}

/// What can be resized on one disk.
#[derive(Debug, Clone)]
pub struct ResizeOption {
    /// Backend identifier of the resize target, returned verbatim in
    /// the resolved choice.
    pub option_id: String,
    pub min_size: u64,
    pub max_size: u64,
    pub pref_size: u64,
    /// Device path of the partition to shrink.
    pub path: String,
}

/// Per-choice extra data supplied by the backend.
#[derive(Debug, Clone, Default)]
pub struct AutoPartOptions {
    /// Resize candidates in disk order, keyed by short disk name
    /// (`sda`).
    pub resize: Vec<(String, ResizeOption)>,
    pub use_device_label: String,
    /// (display text, device path) per installable disk, in display
    /// order.
    pub use_device_disks: Vec<(String, String)>,
    /// A bitlocker marker suppresses the resize choice entirely.
    pub bitlocker: bool,
}

/// One partition of a disk's current layout, as the host reports it.
#[derive(Debug, Clone)]
pub struct LayoutPart {
    pub path: String,
    pub size: u64,
    pub fs: String,
}

/// Current layouts keyed by short disk name (`sda`).
pub type DiskLayouts = HashMap<String, Vec<LayoutPart>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoChoiceKind {
    Resize,
    UseDevice,
    Lvm,
    Crypto,
    Manual,
}

/// Before/after preview bars for one disk a choice applies to.
#[derive(Debug, Clone)]
pub struct DiskOption {
    pub text: String,
    pub path: String,
    pub before: PartitionsBar,
    pub after: PartitionsBar,
}

#[derive(Debug, Clone)]
struct ChoiceEntry {
    kind: AutoChoiceKind,
    label: String,
    disks: Vec<DiskOption>,
}

/// The structured result of the user's final choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoPartChoice {
    pub label: String,
    pub detail: Option<String>,
    pub method: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoFocus {
    Choices,
    Disks,
    Passphrase(usize),
}

/// The autopartitioning page: an exclusive choice list in fixed order
/// (resize, use-entire-disk, LVM, encrypted LVM, manual), a disk
/// selector per choice, before/after partition bars, and the crypto
/// passphrase pair gating forward navigation.
pub struct AutoPartPage {
    choices: Vec<ChoiceEntry>,
    selected: usize,
    disk_index: usize,
    resize_size: Option<u64>,
    options: AutoPartOptions,
    pub focus: AutoFocus,
    pub passphrase: InputBuffer,
    pub passphrase_confirm: InputBuffer,
    pub passphrase_mismatch: bool,
    after_bar_area: Option<Rect>,
}

impl AutoPartPage {
    pub fn new() -> Self {
        Self {
            choices: Vec::new(),
            selected: 0,
            disk_index: 0,
            resize_size: None,
            options: AutoPartOptions::default(),
            focus: AutoFocus::Choices,
            passphrase: InputBuffer::masked(),
            passphrase_confirm: InputBuffer::masked(),
            passphrase_mismatch: false,
            after_bar_area: None,
        }
    }

    /// Rebuild the choice set from the backend's offerings. The first
    /// choice becomes active.
    pub fn setup_choices(
        &mut self,
        options: AutoPartOptions,
        layouts: &DiskLayouts,
        labels: &ChoiceLabels,
        release_name: &str,
        osindex: &OsProberIndex,
        gate: &mut dyn StepGate,
    ) {
        self.choices.clear();
        self.selected = 0;
        self.disk_index = 0;
        self.resize_size = None;
        self.passphrase.clear();
        self.passphrase_confirm.clear();
        self.passphrase_mismatch = false;
        self.after_bar_area = None;

        if !options.resize.is_empty() && !options.bitlocker {
            let mut disks = Vec::new();
            for (disk_id, resize) in &options.resize {
                for (text, path) in &options.use_device_disks {
                    if short_disk_name(path) != disk_id.as_str() {
                        continue;
                    }
                    let Some(layout) = layouts.get(disk_id) else {
                        continue;
                    };
                    let mut before = PartitionsBar::new(osindex.clone());
                    let mut after = PartitionsBar::new(osindex.clone());
                    for part in layout {
                        before.add_partition(&part.path, part.size, &part.fs);
                        after.add_partition(&part.path, part.size, &part.fs);
                    }
                    after.set_resize_partition(
                        &resize.path,
                        resize.min_size,
                        resize.max_size,
                        resize.pref_size,
                        release_name,
                    );
                    self.resize_size = Some(resize.pref_size);
                    disks.push(DiskOption {
                        text: text.clone(),
                        path: path.clone(),
                        before,
                        after,
                    });
                }
            }
            self.choices.push(ChoiceEntry {
                kind: AutoChoiceKind::Resize,
                label: labels.resize.clone(),
                disks,
            });
        }

        // Use entire disk: the after preview is one synthetic segment
        // covering the whole device.
        let mut disks = Vec::new();
        for (text, path) in &options.use_device_disks {
            let Some(layout) = layouts.get(short_disk_name(path)) else {
                continue;
            };
            let mut before = PartitionsBar::new(osindex.clone());
            for part in layout {
                before.add_partition(&part.path, part.size, &part.fs);
            }
            let mut after = PartitionsBar::new(osindex.clone());
            let size = before.disk_size().max(1);
            after.add_named_partition("", size, "auto", release_name);
            disks.push(DiskOption {
                text: text.clone(),
                path: path.clone(),
                before,
                after,
            });
        }
        self.choices.push(ChoiceEntry {
            kind: AutoChoiceKind::UseDevice,
            label: labels.use_device.clone(),
            disks: disks.clone(),
        });

        // LVM and crypto reuse the use-entire-disk previews.
        self.choices.push(ChoiceEntry {
            kind: AutoChoiceKind::Lvm,
            label: labels.lvm.clone(),
            disks: disks.clone(),
        });
        self.choices.push(ChoiceEntry {
            kind: AutoChoiceKind::Crypto,
            label: labels.crypto.clone(),
            disks,
        });

        self.choices.push(ChoiceEntry {
            kind: AutoChoiceKind::Manual,
            label: labels.manual.clone(),
            disks: Vec::new(),
        });

        self.options = options;
        self.on_choice_changed(gate);
    }

    pub fn choice_labels(&self) -> impl Iterator<Item = (&str, AutoChoiceKind)> {
        self.choices
            .iter()
            .map(|entry| (entry.label.as_str(), entry.kind))
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn disk_index(&self) -> usize {
        self.disk_index
    }

    pub fn selected_kind(&self) -> Option<AutoChoiceKind> {
        self.choices.get(self.selected).map(|entry| entry.kind)
    }

    pub fn current_disks(&self) -> &[DiskOption] {
        self.choices
            .get(self.selected)
            .map(|entry| entry.disks.as_slice())
            .unwrap_or_default()
    }

    pub fn current_disk(&self) -> Option<&DiskOption> {
        self.current_disks().get(self.disk_index)
    }

    pub fn resize_size(&self) -> Option<u64> {
        self.resize_size
    }

    pub fn set_after_bar_area(&mut self, area: Rect) {
        self.after_bar_area = Some(area);
    }

    pub fn select_choice(&mut self, index: usize, gate: &mut dyn StepGate) {
        if index < self.choices.len() && index != self.selected {
            self.selected = index;
            self.on_choice_changed(gate);
        }
    }

    pub fn select_disk(&mut self, index: usize) {
        if index < self.current_disks().len() {
            self.disk_index = index;
        }
    }

    /// Resolve the active choice. No active choice is a programming
    /// error, as is a resize choice without a remembered size.
    pub fn get_choice(&self) -> AutoPartChoice {
        let Some(entry) = self.choices.get(self.selected) else {
            panic!("no active autopartitioning choice");
        };
        let disk_text = self
            .current_disk()
            .map(|disk| disk.text.clone())
            .unwrap_or_default();
        match entry.kind {
            AutoChoiceKind::Resize => {
                let Some(size) = self.resize_size else {
                    panic!("resize choice active without a remembered size");
                };
                let disk_id = self
                    .current_disk()
                    .map(|disk| short_disk_name(&disk.path).to_string())
                    .unwrap_or_default();
                let option_id = self
                    .options
                    .resize
                    .iter()
                    .find(|(id, _)| *id == disk_id)
                    .map(|(_, resize)| resize.option_id.clone())
                    .unwrap_or_default();
                AutoPartChoice {
                    label: option_id,
                    detail: Some(format!("{size} B")),
                    method: "resize_use_free",
                }
            }
            AutoChoiceKind::UseDevice => AutoPartChoice {
                label: self.options.use_device_label.clone(),
                detail: Some(disk_text),
                method: "use_device",
            },
            AutoChoiceKind::Lvm => AutoPartChoice {
                label: entry.label.clone(),
                detail: Some(disk_text),
                method: "use_lvm",
            },
            AutoChoiceKind::Crypto => AutoPartChoice {
                label: entry.label.clone(),
                detail: Some(disk_text),
                method: "use_crypto",
            },
            AutoChoiceKind::Manual => AutoPartChoice {
                label: entry.label.clone(),
                detail: None,
                method: "manual",
            },
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent, gate: &mut dyn StepGate) -> Option<AutoPartChoice> {
        // Passphrase fields swallow character input before any
        // navigation binding sees it.
        if let AutoFocus::Passphrase(field) = self.focus {
            match key.code {
                KeyCode::Tab => self.cycle_focus(),
                KeyCode::Esc => self.focus = AutoFocus::Choices,
                KeyCode::Enter => return Some(self.get_choice()),
                KeyCode::Backspace => {
                    self.passphrase_field(field).delete_back();
                    self.verify_passphrase(gate);
                }
                KeyCode::Char(c) => {
                    self.passphrase_field(field).insert(c);
                    self.verify_passphrase(gate);
                }
                _ => {}
            }
            return None;
        }

        match key.code {
            KeyCode::Tab => self.cycle_focus(),
            KeyCode::Char('j') | KeyCode::Down => {
                if self.focus == AutoFocus::Choices && self.selected + 1 < self.choices.len() {
                    self.selected += 1;
                    self.on_choice_changed(gate);
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                if self.focus == AutoFocus::Choices && self.selected > 0 {
                    self.selected -= 1;
                    self.on_choice_changed(gate);
                }
            }
            KeyCode::Char('h') | KeyCode::Left => {
                if self.focus == AutoFocus::Disks && self.disk_index > 0 {
                    self.disk_index -= 1;
                }
            }
            KeyCode::Char('l') | KeyCode::Right => {
                if self.focus == AutoFocus::Disks
                    && self.disk_index + 1 < self.current_disks().len()
                {
                    self.disk_index += 1;
                }
            }
            KeyCode::Enter => return Some(self.get_choice()),
            _ => {}
        }
        None
    }

    /// Forward pointer events to the visible after-bar; a resize of the
    /// preview updates the remembered size.
    pub fn handle_mouse(&mut self, event: MouseEvent) -> Option<BarEvent> {
        let area = self.after_bar_area?;
        let disk_index = self.disk_index;
        let entry = self.choices.get_mut(self.selected)?;
        let disk = entry.disks.get_mut(disk_index)?;
        let bar_event = disk.after.handle_mouse(event, area)?;
        let BarEvent::PartitionResized { size, .. } = &bar_event;
        self.resize_size = Some(*size);
        Some(bar_event)
    }

    /// Passphrase pair validation: forward navigation is allowed only
    /// while both fields are non-empty and equal; a mismatch is
    /// surfaced immediately, not on submit.
    pub fn verify_passphrase(&mut self, gate: &mut dyn StepGate) {
        let matches = self.passphrase.content() == self.passphrase_confirm.content();
        self.passphrase_mismatch = !matches;
        let complete = matches && !self.passphrase.is_empty();
        gate.allow_go_forward(complete);
    }

    fn on_choice_changed(&mut self, gate: &mut dyn StepGate) {
        self.disk_index = 0;
        if self.selected_kind() == Some(AutoChoiceKind::Crypto) {
            self.verify_passphrase(gate);
        } else {
            self.passphrase_mismatch = false;
            gate.allow_go_forward(true);
        }
    }

    fn cycle_focus(&mut self) {
        let has_disks = !self.current_disks().is_empty();
        let has_passphrase = self.selected_kind() == Some(AutoChoiceKind::Crypto);
        self.focus = match self.focus {
            AutoFocus::Choices if has_disks => AutoFocus::Disks,
            AutoFocus::Choices if has_passphrase => AutoFocus::Passphrase(0),
            AutoFocus::Choices => AutoFocus::Choices,
            AutoFocus::Disks if has_passphrase => AutoFocus::Passphrase(0),
            AutoFocus::Disks => AutoFocus::Choices,
            AutoFocus::Passphrase(0) => AutoFocus::Passphrase(1),
            AutoFocus::Passphrase(_) => AutoFocus::Choices,
        };
    }

    fn passphrase_field(&mut self, field: usize) -> &mut InputBuffer {
        if field == 0 {
            &mut self.passphrase
        } else {
            &mut self.passphrase_confirm
        }
    }
}

impl Default for AutoPartPage {
    fn default() -> Self {
        Self::new()
    }
}

fn short_disk_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::DemoGate;

    fn labels() -> ChoiceLabels {
        ChoiceLabels {
            resize: "Install alongside the existing system".to_string(),
            use_device: "Erase disk and install Meridian".to_string(),
            lvm: "Use LVM with the new installation".to_string(),
            crypto: "Encrypt the new installation for security".to_string(),
            manual: "Something else".to_string(),
        }
    }

    fn layouts() -> DiskLayouts {
        let mut layouts = DiskLayouts::new();
        layouts.insert(
            "sda".to_string(),
            vec![
                LayoutPart {
                    path: "/dev/sda1".to_string(),
                    size: 8_167_670_784,
                    fs: "ext3".to_string(),
                },
                LayoutPart {
                    path: "/dev/sda5".to_string(),
                    size: 419_457_024,
                    fs: "ext3".to_string(),
                },
            ],
        );
        layouts.insert(
            "sdb".to_string(),
            vec![
                LayoutPart {
                    path: "/dev/sdb1".to_string(),
                    size: 57_511_125_504,
                    fs: "ntfs".to_string(),
                },
                LayoutPart {
                    path: "/dev/sdb5".to_string(),
                    size: 2_500_452_864,
                    fs: "linux-swap".to_string(),
                },
            ],
        );
        layouts
    }

    fn options() -> AutoPartOptions {
        AutoPartOptions {
            resize: vec![(
                "sdb".to_string(),
                ResizeOption {
                    option_id: "32256-60011610623__resize".to_string(),
                    min_size: 230_989_824,
                    max_size: 55_143_440_896,
                    pref_size: 52_000_000_000,
                    path: "/dev/sdb1".to_string(),
                },
            )],
            use_device_label: "Erase disk and install Meridian".to_string(),
            use_device_disks: vec![
                ("VBOX HARDDISK (sda) - 8.6 GB".to_string(), "/dev/sda".to_string()),
                ("VBOX HARDDISK (sdb) - 60.0 GB".to_string(), "/dev/sdb".to_string()),
            ],
            bitlocker: false,
        }
    }

    fn page() -> (AutoPartPage, DemoGate) {
        let mut page = AutoPartPage::new();
        let mut gate = DemoGate::new();
        page.setup_choices(
            options(),
            &layouts(),
            &labels(),
            "Meridian",
            &OsProberIndex::new(),
            &mut gate,
        );
        (page, gate)
    }

    #[test]
    fn choices_build_in_fixed_order() {
        let (page, _) = page();
        let kinds: Vec<AutoChoiceKind> = page.choice_labels().map(|(_, kind)| kind).collect();
        assert_eq!(
            kinds,
            vec![
                AutoChoiceKind::Resize,
                AutoChoiceKind::UseDevice,
                AutoChoiceKind::Lvm,
                AutoChoiceKind::Crypto,
                AutoChoiceKind::Manual,
            ]
        );
        // resize applies only to sdb; the others list every disk
        assert_eq!(page.current_disks().len(), 1);
    }

    #[test]
    fn bitlocker_suppresses_the_resize_choice() {
        let mut page = AutoPartPage::new();
        let mut gate = DemoGate::new();
        let mut options = options();
        options.bitlocker = true;
        page.setup_choices(
            options,
            &layouts(),
            &labels(),
            "Meridian",
            &OsProberIndex::new(),
            &mut gate,
        );
        assert_eq!(page.selected_kind(), Some(AutoChoiceKind::UseDevice));
    }

    #[test]
    fn resize_choice_resolves_with_the_remembered_size() {
        let (page, _) = page();
        assert_eq!(page.resize_size(), Some(52_000_000_000));
        let choice = page.get_choice();
        assert_eq!(
            choice,
            AutoPartChoice {
                label: "32256-60011610623__resize".to_string(),
                detail: Some("52000000000 B".to_string()),
                method: "resize_use_free",
            }
        );
    }

    #[test]
    fn use_device_resolves_to_the_selected_disk_text() {
        let (mut page, mut gate) = page();
        page.select_choice(1, &mut gate);
        page.select_disk(1);
        let choice = page.get_choice();
        assert_eq!(choice.label, "Erase disk and install Meridian");
        assert_eq!(choice.detail.as_deref(), Some("VBOX HARDDISK (sdb) - 60.0 GB"));
        assert_eq!(choice.method, "use_device");

        page.select_choice(2, &mut gate);
        assert_eq!(page.get_choice().method, "use_lvm");
        page.select_choice(3, &mut gate);
        assert_eq!(page.get_choice().method, "use_crypto");
        page.select_choice(4, &mut gate);
        let manual = page.get_choice();
        assert_eq!(manual.method, "manual");
        assert_eq!(manual.detail, None);
    }

    #[test]
    fn resize_preview_bars_reflect_the_shrink() {
        let (page, _) = page();
        let disk = page.current_disk().expect("resize disk");
        assert_eq!(disk.before.partitions().len(), 2);
        // preview: shrunk ntfs partition + synthetic install target + swap
        assert_eq!(disk.after.partitions().len(), 3);
        assert_eq!(disk.after.partitions()[0].size, 52_000_000_000);
        assert_eq!(disk.after.partitions()[1].name, "Meridian (auto)");
        assert_eq!(disk.after.disk_size(), disk.before.disk_size());
    }

    #[test]
    fn preview_resize_events_update_the_remembered_size() {
        use crossterm::event::{KeyModifiers, MouseButton, MouseEventKind};

        let (mut page, _gate) = page();
        let area = Rect::new(0, 0, 501, 3);
        page.set_after_bar_area(area);

        let handle = page
            .current_disk()
            .expect("disk")
            .after
            .handle_x(area.width)
            .expect("handle");
        let press = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: handle,
            row: 0,
            modifiers: KeyModifiers::empty(),
        };
        let _ = page.handle_mouse(press);
        let drag = MouseEvent {
            kind: MouseEventKind::Drag(MouseButton::Left),
            column: handle.saturating_sub(20),
            row: 0,
            modifiers: KeyModifiers::empty(),
        };
        let event = page.handle_mouse(drag).expect("resize event");
        let BarEvent::PartitionResized { size, .. } = event;
        assert_eq!(page.resize_size(), Some(size));
        assert_ne!(size, 52_000_000_000);
    }

    #[test]
    fn passphrase_gating_tracks_both_fields() {
        let (mut page, mut gate) = page();
        page.select_choice(3, &mut gate); // crypto
        assert!(!gate.forward_allowed());

        page.focus = AutoFocus::Passphrase(0);
        for c in "secret".chars() {
            page.passphrase.insert(c);
        }
        page.verify_passphrase(&mut gate);
        assert!(page.passphrase_mismatch);
        assert!(!gate.forward_allowed());

        for c in "secret".chars() {
            page.passphrase_confirm.insert(c);
        }
        page.verify_passphrase(&mut gate);
        assert!(!page.passphrase_mismatch);
        assert!(gate.forward_allowed());

        page.passphrase_confirm.delete_back();
        page.verify_passphrase(&mut gate);
        assert!(page.passphrase_mismatch);
        assert!(!gate.forward_allowed());

        // leaving crypto re-enables forward navigation
        page.select_choice(4, &mut gate);
        assert!(gate.forward_allowed());
    }

    #[test]
    #[should_panic(expected = "no active autopartitioning choice")]
    fn get_choice_without_choices_is_a_programming_error() {
        let page = AutoPartPage::new();
        let _ = page.get_choice();
    }
}
