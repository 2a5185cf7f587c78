// SPDX-License-Identifier: GPL-3.0-only

//! Single-threaded task scheduler
//!
//! Selects between user commands, the preview interval and the blink
//! interval. One task runs to completion before the next one is chosen, so a
//! command never overlaps a tick and ticks never re-enter. Intervals are
//! only polled while armed; a disarmed timer simply never fires.

use super::state::{AppModel, Message};
use crate::constants::timing;
use futures::{Stream, StreamExt};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::debug;

/// A unit of work picked by the event loop
#[derive(Debug, Clone, PartialEq)]
pub enum Task<I> {
    PreviewTick,
    BlinkTick,
    Input(I),
}

pub struct EventLoop {
    preview: Interval,
    blink: Interval,
    blink_armed: bool,
}

impl EventLoop {
    /// Must be called inside a tokio runtime
    pub fn new() -> Self {
        Self::with_periods(timing::PREVIEW_TICK, timing::BLINK_TICK)
    }

    pub fn with_periods(preview: Duration, blink: Duration) -> Self {
        let mut preview = tokio::time::interval(preview);
        preview.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut blink = tokio::time::interval(blink);
        blink.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            preview,
            blink,
            blink_armed: false,
        }
    }

    /// Wait for the next task; `None` once the input stream has ended
    pub async fn next<S>(
        &mut self,
        inputs: &mut S,
        preview_armed: bool,
        blink_armed: bool,
    ) -> Option<Task<S::Item>>
    where
        S: Stream + Unpin,
    {
        // The first blink comes one period after recording starts
        if blink_armed && !self.blink_armed {
            self.blink.reset();
        }
        self.blink_armed = blink_armed;

        tokio::select! {
            biased;
            input = inputs.next() => input.map(Task::Input),
            _ = self.preview.tick(), if preview_armed => Some(Task::PreviewTick),
            _ = self.blink.tick(), if blink_armed => Some(Task::BlinkTick),
        }
    }

    /// Drive `model` until it quits or `inputs` ends
    ///
    /// `redraw` runs before every wait and between a command and its
    /// follow-up, so overlays such as the capture notice become visible
    /// before the blocking part runs.
    pub async fn run<S, F, E>(
        &mut self,
        model: &mut AppModel,
        mut inputs: S,
        mut redraw: F,
    ) -> Result<(), E>
    where
        S: Stream<Item = Message> + Unpin,
        F: FnMut(&AppModel) -> Result<(), E>,
    {
        loop {
            redraw(model)?;
            let armed = (model.preview_armed(), model.blink_armed());
            let Some(task) = self.next(&mut inputs, armed.0, armed.1).await else {
                debug!("Input stream ended");
                break;
            };

            match task {
                Task::PreviewTick => model.preview_tick(),
                Task::BlinkTick => model.blink_tick(),
                Task::Input(message) => {
                    let mut pending = model.update(message);
                    while let Some(follow_up) = pending.take() {
                        redraw(model)?;
                        pending = model.update(follow_up);
                    }
                }
            }

            if model.should_quit() {
                break;
            }
        }
        Ok(())
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}
