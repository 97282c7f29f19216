#![no_main]

use arbitrary::Arbitrary;
use devdeck_layout::{
    LayoutStore, MAX_SPLIT_RATIO, MIN_SPLIT_RATIO, NodeId, Orientation, PanelId, PanelPatch,
    PanelType, Placement, ScopeKey,
};
use libfuzzer_sys::fuzz_target;

const TEMPLATES: [&str; 7] = ["single", "split-h", "split-v", "grid-2x2", "sidebar", "three-column", "ide"];

#[derive(Debug, Arbitrary)]
enum Op {
    ApplyTemplate(u8),
    Focus(u8),
    SetRatio(u8, f64),
    ChangeType(u8, u8),
    SetPath(u8),
    SetRunning(u8, bool),
    Split { target: u8, vertical: bool, incoming_first: bool, panel_type: u8 },
    Close(u8),
    ResetLayout,
}

/// Map a byte onto an id the scope has probably allocated.
fn raw_id(byte: u8) -> u64 {
    u64::from(byte) + 1
}

fuzz_target!(|ops: Vec<Op>| {
    let mut store = LayoutStore::new();
    let scope = ScopeKey::project("fuzz");

    for op in ops.iter().take(256) {
        let state = match *op {
            Op::ApplyTemplate(i) => store.apply_template(&scope, TEMPLATES[usize::from(i) % TEMPLATES.len()]),
            Op::Focus(id) => store.focus(&scope, PanelId::new(raw_id(id)).unwrap()),
            Op::SetRatio(id, ratio) => store.set_split_ratio(&scope, NodeId::new(raw_id(id)).unwrap(), ratio),
            Op::ChangeType(id, ty) => store.change_panel_type(
                &scope,
                PanelId::new(raw_id(id)).unwrap(),
                PanelType::ALL[usize::from(ty) % PanelType::ALL.len()],
            ),
            Op::SetPath(id) => store.update_panel(&scope, PanelId::new(raw_id(id)).unwrap(), &PanelPatch::new().path("/f")),
            Op::SetRunning(id, running) => store.set_process_running(&scope, PanelId::new(raw_id(id)).unwrap(), running),
            Op::Split { target, vertical, incoming_first, panel_type } => store.split_panel(
                &scope,
                PanelId::new(raw_id(target)).unwrap(),
                if vertical { Orientation::Vertical } else { Orientation::Horizontal },
                PanelType::ALL[usize::from(panel_type) % PanelType::ALL.len()],
                if incoming_first { Placement::IncomingFirst } else { Placement::ExistingFirst },
            ),
            Op::Close(id) => store.close_panel(&scope, PanelId::new(raw_id(id)).unwrap()),
            Op::ResetLayout => store.reset_layout(&scope),
        };

        let report = state.invariant_report();
        assert!(report.is_clean(), "op {op:?} broke invariants: {:?}", report.issues);
        assert!(!state.panels().is_empty());
        assert!(state.panels().iter().filter(|p| p.is_focused).count() <= 1);
        state.layout().walk(&mut |node| {
            if let Some(ratio) = node.split_ratio() {
                assert!((MIN_SPLIT_RATIO..=MAX_SPLIT_RATIO).contains(&ratio.get()));
            }
        });
    }
});
