//! Integration Tests
//!
//! End-to-end coverage of the render loop: a reactive computation owns a
//! render function that produces a virtual tree, and reconciliation keeps
//! an in-memory host tree in sync as observable state changes.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use trellis_core::reactive::{
    BatchScheduler, Computation, ObservableCell, Scheduler, WatchOptions,
};
use trellis_core::vdom::{element, Backend, MemoryBackend, MemoryNode, OpStats, Patcher, VNode};
use trellis_core::Error;

/// A minimal "component": a list of labels rendered as <ul><li>...</li></ul>,
/// re-rendered by a computation whenever the backing cell is notified.
struct ListApp {
    patcher: Rc<Patcher<MemoryBackend>>,
    items: Rc<RefCell<Vec<String>>>,
    cell: ObservableCell,
    current: Rc<RefCell<Option<VNode<MemoryNode>>>>,
    renders: Rc<Cell<usize>>,
    effect: Computation<()>,
}

impl ListApp {
    fn new(initial: &[&str], options: WatchOptions) -> Self {
        let patcher = Rc::new(Patcher::new(MemoryBackend::new(), Vec::new()));
        let items = Rc::new(RefCell::new(
            initial.iter().map(|label| (*label).to_owned()).collect::<Vec<_>>(),
        ));
        let cell = ObservableCell::new();
        let current: Rc<RefCell<Option<VNode<MemoryNode>>>> = Rc::new(RefCell::new(None));
        let renders = Rc::new(Cell::new(0));

        let render = {
            let patcher = Rc::clone(&patcher);
            let items = Rc::clone(&items);
            let cell = cell.clone();
            let current = Rc::clone(&current);
            let renders = Rc::clone(&renders);
            move || {
                renders.set(renders.get() + 1);
                cell.register_read();
                let tree = element("ul")
                    .children(items.borrow().iter().map(|label| {
                        element("li")
                            .key(label.as_str())
                            .text_child(label.as_str())
                            .build()
                    }))
                    .build();
                let previous = current.borrow_mut().take();
                patcher.patch(previous.as_ref(), Some(&tree), false);
                *current.borrow_mut() = Some(tree);
                Ok(())
            }
        };
        let effect = Computation::new(render, None, options).unwrap();
        Self {
            patcher,
            items,
            cell,
            current,
            renders,
            effect,
        }
    }

    fn markup(&self) -> String {
        self.current
            .borrow()
            .as_ref()
            .and_then(|tree| tree.host())
            .map(|host| host.to_markup())
            .unwrap_or_default()
    }

    fn set_items(&self, labels: &[&str]) {
        *self.items.borrow_mut() = labels.iter().map(|label| (*label).to_owned()).collect();
        self.cell.notify();
    }

    fn stats(&self) -> OpStats {
        self.patcher.backend().stats()
    }
}

fn sync_options() -> WatchOptions {
    WatchOptions {
        sync: true,
        ..WatchOptions::default()
    }
}

#[test]
fn render_computation_keeps_host_tree_in_sync() {
    let app = ListApp::new(&["a", "b"], sync_options());
    assert_eq!(app.markup(), "<ul><li>a</li><li>b</li></ul>");
    assert_eq!(app.renders.get(), 1);

    app.set_items(&["a", "b", "c"]);
    assert_eq!(app.markup(), "<ul><li>a</li><li>b</li><li>c</li></ul>");
    assert_eq!(app.renders.get(), 2);
}

#[test]
fn keyed_state_reorder_moves_host_nodes_without_recreating() {
    let app = ListApp::new(&["a", "b", "c", "d"], sync_options());
    app.patcher.backend().reset_stats();

    app.set_items(&["d", "a", "b", "c"]);
    let stats = app.stats();
    assert_eq!(stats.creates, 0, "reorder must reuse every host node");
    assert_eq!(stats.moves, 1, "shifting one key needs exactly one move");
    assert_eq!(app.markup(), "<ul><li>d</li><li>a</li><li>b</li><li>c</li></ul>");
}

#[test]
fn identical_rerender_touches_nothing() {
    let app = ListApp::new(&["a", "b"], sync_options());
    app.patcher.backend().reset_stats();

    // Same state, fresh tree description: the diff must be a no-op.
    app.cell.notify();
    assert_eq!(app.renders.get(), 2);
    assert_eq!(app.stats(), OpStats::default());
}

#[test]
fn batched_scheduler_coalesces_notifications() {
    let scheduler = BatchScheduler::new();
    let batched: Rc<dyn Scheduler> = scheduler.clone();
    let app = ListApp::new(
        &["a"],
        WatchOptions {
            scheduler: Some(batched),
            ..WatchOptions::default()
        },
    );
    assert_eq!(app.renders.get(), 1);

    app.set_items(&["a", "b"]);
    app.set_items(&["a", "b", "c"]);
    assert_eq!(app.renders.get(), 1, "re-render waits for the flush");
    assert_eq!(app.markup(), "<ul><li>a</li></ul>");
    assert_eq!(scheduler.pending(), 1, "duplicate enqueues coalesce");

    scheduler.flush();
    assert_eq!(app.renders.get(), 2, "one render covers both changes");
    assert_eq!(app.markup(), "<ul><li>a</li><li>b</li><li>c</li></ul>");
}

#[test]
fn teardown_stops_rendering() {
    let app = ListApp::new(&["a"], sync_options());
    assert_eq!(app.cell.subscriber_count(), 1);

    app.effect.teardown();
    assert_eq!(app.cell.subscriber_count(), 0);

    app.set_items(&["a", "b"]);
    assert_eq!(app.renders.get(), 1);
    assert_eq!(app.markup(), "<ul><li>a</li></ul>");
}

#[test]
fn branch_switch_prunes_stale_dependencies() {
    let patcher = Rc::new(Patcher::new(MemoryBackend::new(), Vec::new()));
    let show_detail = Rc::new(Cell::new(true));
    let toggle_cell = ObservableCell::new();
    let detail = Rc::new(RefCell::new("details".to_owned()));
    let detail_cell = ObservableCell::new();
    let current: Rc<RefCell<Option<VNode<MemoryNode>>>> = Rc::new(RefCell::new(None));
    let renders = Rc::new(Cell::new(0));

    let render = {
        let patcher = Rc::clone(&patcher);
        let show_detail = Rc::clone(&show_detail);
        let toggle_cell = toggle_cell.clone();
        let detail = Rc::clone(&detail);
        let detail_cell = detail_cell.clone();
        let current = Rc::clone(&current);
        let renders = Rc::clone(&renders);
        move || {
            renders.set(renders.get() + 1);
            toggle_cell.register_read();
            let body = if show_detail.get() {
                detail_cell.register_read();
                element("p").text_child(detail.borrow().as_str()).build()
            } else {
                element("p").text_child("summary").build()
            };
            let tree = element("div").child(body).build();
            let previous = current.borrow_mut().take();
            patcher.patch(previous.as_ref(), Some(&tree), false);
            *current.borrow_mut() = Some(tree);
            Ok::<(), Error>(())
        }
    };
    let effect = Computation::new(render, None, sync_options()).unwrap();
    assert_eq!(detail_cell.subscriber_count(), 1);

    // Switch to the branch that never reads the detail cell.
    show_detail.set(false);
    toggle_cell.notify();
    assert_eq!(renders.get(), 2);
    assert_eq!(
        detail_cell.subscriber_count(),
        0,
        "untouched branch must unsubscribe"
    );

    // Notifying the pruned cell no longer re-renders.
    *detail.borrow_mut() = "changed".to_owned();
    detail_cell.notify();
    assert_eq!(renders.get(), 2);

    drop(effect);
}

#[test]
fn failed_render_pass_recovers_on_the_next_notification() {
    let patcher = Rc::new(Patcher::new(MemoryBackend::new(), Vec::new()));
    let fail = Rc::new(Cell::new(false));
    let label = Rc::new(RefCell::new("ok".to_owned()));
    let cell = ObservableCell::new();
    let current: Rc<RefCell<Option<VNode<MemoryNode>>>> = Rc::new(RefCell::new(None));

    let render = {
        let patcher = Rc::clone(&patcher);
        let fail = Rc::clone(&fail);
        let label = Rc::clone(&label);
        let cell = cell.clone();
        let current = Rc::clone(&current);
        move || {
            cell.register_read();
            if fail.get() {
                return Err(Error::msg("render exploded"));
            }
            let tree = element("p").text_child(label.borrow().as_str()).build();
            let previous = current.borrow_mut().take();
            patcher.patch(previous.as_ref(), Some(&tree), false);
            *current.borrow_mut() = Some(tree);
            Ok(())
        }
    };
    let effect: Computation<()> = Computation::new(
        render,
        None,
        WatchOptions {
            sync: true,
            user: true,
            ..WatchOptions::default()
        },
    )
    .unwrap();

    let markup = || {
        current
            .borrow()
            .as_ref()
            .and_then(|tree| tree.host())
            .map(|host| host.to_markup())
            .unwrap_or_default()
    };
    assert_eq!(markup(), "<p>ok</p>");

    // A failing pass is reported, leaves the tree alone, and keeps the
    // subscription alive.
    fail.set(true);
    *label.borrow_mut() = "never rendered".to_owned();
    cell.notify();
    assert_eq!(markup(), "<p>ok</p>");
    assert_eq!(cell.subscriber_count(), 1);

    fail.set(false);
    *label.borrow_mut() = "recovered".to_owned();
    cell.notify();
    assert_eq!(markup(), "<p>recovered</p>");

    drop(effect);
}

#[test]
fn hydrated_tree_becomes_reactively_updatable() {
    let backend = MemoryBackend::new();
    let root = backend.create_element("div");
    let paragraph = backend.create_element("p");
    let text = backend.create_text("server");
    backend.append_child(&paragraph, &text);
    backend.append_child(&root, &paragraph);
    let patcher = Rc::new(Patcher::new(backend, Vec::new()));

    let label = Rc::new(RefCell::new("server".to_owned()));
    let cell = ObservableCell::new();
    let current: Rc<RefCell<Option<VNode<MemoryNode>>>> = Rc::new(RefCell::new(None));

    // Adopt the pre-rendered content first.
    let adopted = element("div")
        .child(element("p").text_child(label.borrow().as_str()).build())
        .build();
    let host = patcher.mount(&root, &adopted, true).unwrap();
    assert_eq!(host, root, "matching markup must be adopted, not replaced");
    *current.borrow_mut() = Some(adopted);
    patcher.backend().reset_stats();

    let render = {
        let patcher = Rc::clone(&patcher);
        let label = Rc::clone(&label);
        let cell = cell.clone();
        let current = Rc::clone(&current);
        move || {
            cell.register_read();
            let tree = element("div")
                .child(element("p").text_child(label.borrow().as_str()).build())
                .build();
            let previous = current.borrow_mut().take();
            patcher.patch(previous.as_ref(), Some(&tree), false);
            *current.borrow_mut() = Some(tree);
            Ok::<(), Error>(())
        }
    };
    let effect = Computation::new(render, None, sync_options()).unwrap();

    // The eager first pass diffed an identical description: no mutations.
    assert_eq!(patcher.backend().stats(), OpStats::default());

    *label.borrow_mut() = "client".to_owned();
    cell.notify();
    let stats = patcher.backend().stats();
    assert_eq!(stats.creates, 0, "update must reuse the adopted nodes");
    assert_eq!(stats.text_sets, 1);
    assert_eq!(root.to_markup(), "<div><p>client</p></div>");

    drop(effect);
}

#[test]
fn deep_watch_fires_for_nested_cell_changes() {
    let nested = ObservableCell::new();
    let cells = Rc::new(RefCell::new(vec![nested.clone()]));
    let fired = Rc::new(Cell::new(0));

    let getter = {
        let cells = Rc::clone(&cells);
        move || Ok(cells.borrow().clone())
    };
    let callback: trellis_core::reactive::ChangeCallback<Vec<ObservableCell>> = {
        let fired = Rc::clone(&fired);
        Box::new(move |_new, _old| {
            fired.set(fired.get() + 1);
            Ok(())
        })
    };
    let watch = Computation::new(
        getter,
        Some(callback),
        WatchOptions {
            deep: true,
            sync: true,
            ..WatchOptions::default()
        },
    )
    .unwrap();

    assert_eq!(nested.subscriber_count(), 1, "traversal subscribes nested cells");

    nested.notify();
    assert_eq!(fired.get(), 1);

    watch.teardown();
    nested.notify();
    assert_eq!(fired.get(), 1);
}
