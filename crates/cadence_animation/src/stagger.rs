//! Staggered list reveals
//!
//! Every item of a list gets its own reveal timer, offset by its index, so
//! the list appears one item after another.

use crate::context::AnimationContext;
use crate::error::{check_duration, Result};
use crate::scheduler::{Generation, Scheduled, WorkSlot};
use cadence_core::{Host, Signal};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Timing of a staggered reveal
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StaggerOptions {
    /// Gap between consecutive items
    pub stagger_delay_ms: f64,
    /// Wait before the first item
    pub initial_delay_ms: f64,
}

impl Default for StaggerOptions {
    fn default() -> Self {
        Self {
            stagger_delay_ms: 50.0,
            initial_delay_ms: 0.0,
        }
    }
}

impl StaggerOptions {
    pub fn new(stagger_delay_ms: f64) -> Self {
        Self {
            stagger_delay_ms,
            ..Default::default()
        }
    }

    pub fn initial_delay(mut self, initial_delay_ms: f64) -> Self {
        self.initial_delay_ms = initial_delay_ms;
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_duration("stagger delay", self.stagger_delay_ms)?;
        check_duration("initial delay", self.initial_delay_ms)?;
        Ok(())
    }

    /// Reveal offset of the item at `index`
    pub fn delay_for(&self, index: usize) -> f64 {
        self.initial_delay_ms + index as f64 * self.stagger_delay_ms
    }
}

/// One list entry and its reveal state
#[derive(Clone, Debug, PartialEq)]
pub struct StaggerItem<T> {
    pub item: T,
    pub is_visible: bool,
    pub delay_ms: f64,
}

struct StaggerState<T> {
    items: Vec<T>,
    generation: Generation,
    /// One pending reveal per unrevealed item
    reveals: Vec<WorkSlot>,
    revealed_count: usize,
    disposed: bool,
}

struct StaggerInner<T: Clone + PartialEq + 'static> {
    host: Host,
    options: StaggerOptions,
    entries: Signal<Vec<StaggerItem<T>>>,
    state: RefCell<StaggerState<T>>,
}

/// A list revealed item by item
pub struct StaggerSequence<T: Clone + PartialEq + 'static> {
    inner: Rc<StaggerInner<T>>,
}

impl<T: Clone + PartialEq + 'static> StaggerSequence<T> {
    pub fn new(ctx: &AnimationContext, items: Vec<T>, options: StaggerOptions) -> Result<Self> {
        options.validate()?;

        let sequence = Self {
            inner: Rc::new(StaggerInner {
                host: ctx.host().clone(),
                options,
                entries: Signal::new(Vec::new()),
                state: RefCell::new(StaggerState {
                    items: Vec::new(),
                    generation: Generation::default(),
                    reveals: Vec::new(),
                    revealed_count: 0,
                    disposed: false,
                }),
            }),
        };
        sequence.restart(items);
        Ok(sequence)
    }

    /// Replace the list
    ///
    /// An equal list keeps its progress. Anything else cancels every pending
    /// reveal and starts again from the first item.
    pub fn set_items(&self, items: Vec<T>) {
        {
            let state = self.inner.state.borrow();
            if state.disposed || state.items == items {
                return;
            }
        }
        self.restart(items);
    }

    /// The reactive container entries are published through
    pub fn signal(&self) -> Signal<Vec<StaggerItem<T>>> {
        self.inner.entries.clone()
    }

    pub fn entries(&self) -> Vec<StaggerItem<T>> {
        self.inner.entries.get()
    }

    pub fn is_visible(&self, index: usize) -> bool {
        self.inner
            .entries
            .with(|entries| entries.get(index).is_some_and(|entry| entry.is_visible))
    }

    pub fn len(&self) -> usize {
        self.inner.state.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn revealed_count(&self) -> usize {
        self.inner.state.borrow().revealed_count
    }

    pub fn is_fully_revealed(&self) -> bool {
        let state = self.inner.state.borrow();
        state.revealed_count == state.items.len()
    }

    pub fn options(&self) -> StaggerOptions {
        self.inner.options
    }

    /// Cancel every pending reveal; later lists are ignored
    pub fn dispose(&self) {
        let mut state = self.inner.state.borrow_mut();
        if state.disposed {
            return;
        }
        cancel_reveals(&self.inner.host, &mut state);
        state.generation.advance();
        state.disposed = true;
    }

    fn restart(&self, items: Vec<T>) {
        let inner = &self.inner;
        let options = inner.options;
        let headless = inner.host.timers().is_none();

        let (generation, entries) = {
            let mut state = inner.state.borrow_mut();
            cancel_reveals(&inner.host, &mut state);
            let generation = state.generation.advance();

            let entries: Vec<StaggerItem<T>> = items
                .iter()
                .enumerate()
                .map(|(index, item)| StaggerItem {
                    item: item.clone(),
                    is_visible: headless,
                    delay_ms: options.delay_for(index),
                })
                .collect();

            state.revealed_count = if headless { items.len() } else { 0 };
            state.reveals = items.iter().map(|_| WorkSlot::new()).collect();
            state.items = items;
            (generation, entries)
        };

        tracing::debug!(
            "StaggerSequence: revealing {} items every {}ms",
            entries.len(),
            options.stagger_delay_ms
        );
        let delays: Vec<f64> = entries.iter().map(|entry| entry.delay_ms).collect();
        inner.entries.set(entries);

        if !headless {
            for (index, delay_ms) in delays.into_iter().enumerate() {
                schedule_reveal(inner, generation, index, delay_ms);
            }
        }
    }
}

impl<T: Clone + PartialEq + 'static> Drop for StaggerSequence<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<T: Clone + PartialEq + fmt::Debug + 'static> fmt::Debug for StaggerSequence<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaggerSequence")
            .field("entries", &self.inner.entries.get())
            .field("revealed_count", &self.revealed_count())
            .finish()
    }
}

fn cancel_reveals<T>(host: &Host, state: &mut StaggerState<T>) {
    for slot in &mut state.reveals {
        slot.cancel(host);
    }
}

fn schedule_reveal<T: Clone + PartialEq + 'static>(
    inner: &Rc<StaggerInner<T>>,
    generation: Generation,
    index: usize,
    delay_ms: f64,
) {
    let Some(timers) = inner.host.timers() else {
        return;
    };

    let weak: Weak<StaggerInner<T>> = Rc::downgrade(inner);
    let id = timers.set_timeout(
        delay_ms,
        Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                reveal(&inner, generation, index);
            }
        }),
    );

    let mut state = inner.state.borrow_mut();
    let current = state.generation == generation;
    match state.reveals.get_mut(index) {
        Some(slot) if current => slot.replace(&inner.host, Scheduled::Timer(id)),
        _ => Scheduled::Timer(id).cancel(&inner.host),
    }
}

fn reveal<T: Clone + PartialEq + 'static>(
    inner: &Rc<StaggerInner<T>>,
    generation: Generation,
    index: usize,
) {
    {
        let mut state = inner.state.borrow_mut();
        if state.generation != generation {
            return;
        }
        let Some(slot) = state.reveals.get_mut(index) else {
            return;
        };
        slot.clear();
        state.revealed_count += 1;
        tracing::trace!("StaggerSequence: revealed item {}", index);
    }

    inner.entries.update(|entries| {
        if let Some(entry) = entries.get_mut(index) {
            entry.is_visible = true;
        }
    });
}
