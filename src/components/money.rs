//! Money counter.
//!
//! The value is written into the first child of the money container, coloured
//! by sign. Changes after the first render count up (or down) towards the new
//! value through computed keyframes; the last step always writes the exact
//! new value. A change that lands mid-count drops the rest of the running
//! count and starts the new one from the value on screen.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::animate::{AnimatableController, Animation};
use crate::components::{Component, mount_slots};
use crate::element::{apply_update, apply_update_to, update};
use crate::error::Result;
use crate::render::{RenderOutput, RenderRegistry, StateAccessor, StateChange};
use crate::stage::Stage;
use crate::state::SharedGameState;

/// One count animation, from `from` to `to` in `steps` writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoneyCount {
    pub from: i64,
    pub to: i64,
    pub steps: u32,
}

impl MoneyCount {
    pub fn new(from: i64, to: i64, max_keyframes: u32) -> Self {
        let distance = from.abs_diff(to);
        let steps = distance.min(u64::from(max_keyframes.max(1))) as u32;
        Self {
            from,
            to,
            steps: steps.max(1),
        }
    }

    /// Value shown at step `k` of `1..=steps`.
    pub fn value_at(&self, k: u32) -> i64 {
        if k >= self.steps {
            return self.to;
        }
        let diff = i128::from(self.to) - i128::from(self.from);
        let partial = diff * i128::from(k) / i128::from(self.steps);
        (i128::from(self.from) + partial) as i64
    }
}

fn count_animation() -> Animation<MoneyCount> {
    Animation::stateful(|count: &MoneyCount, t| {
        for k in 1..=count.steps {
            let text = count.value_at(k).to_string();
            let offset = f64::from(k) / f64::from(count.steps);
            t.add_computed_keyframe(offset, move |doc, node| {
                apply_update_to(doc, &update().text(text.as_str()), node)
            })?;
        }
        Ok(())
    })
}

/// Controller of the count currently on screen, if any.
type LastCount = Rc<RefCell<Option<AnimatableController>>>;

fn shown_value(stage: &Stage, display: &str) -> Result<Option<i64>> {
    let node = stage.document.query_selector(display)?;
    Ok(node.and_then(|node| stage.document.text_content(node).trim().parse().ok()))
}

fn render_money(
    change: StateChange<'_, i64>,
    stage: &mut Stage,
    animation: &Animation<MoneyCount>,
    last: &LastCount,
) -> Result<RenderOutput> {
    let config = stage.config.money.clone();
    let money = *change.new_state;
    let display = format!("{} > :first-child", config.selector);
    let color = if money < 0 {
        &config.negative_color
    } else {
        &config.positive_color
    };
    apply_update(&mut stage.document, &update().style("color", color.as_str()), display.as_str())?;

    let Some(&old) = change.old_state else {
        apply_update(&mut stage.document, &update().text(money.to_string()), display.as_str())?;
        return Ok(RenderOutput::Nothing);
    };

    let interrupted = last
        .borrow_mut()
        .take()
        .is_some_and(|previous| previous.skip_computed() > 0);
    let from = if interrupted {
        let shown = shown_value(stage, &display)?.unwrap_or(old);
        debug!(shown, to = money, "money count interrupted");
        shown
    } else {
        old
    };

    let count = MoneyCount::new(from, money, config.max_keyframes);
    let controller = stage.animations.create_animatable(
        display,
        config.count_duration_ms,
        animation,
        Some(&count),
    )?;
    *last.borrow_mut() = Some(controller.clone());
    Ok(controller.into())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MoneyComponent;

impl Component for MoneyComponent {
    fn name(&self) -> &'static str {
        "money"
    }

    fn setup(&self, stage: &mut Stage) -> Result<()> {
        let selector = stage.config.money.selector.clone();
        mount_slots(stage, &selector, 2)?;
        Ok(())
    }

    fn load_renderables(&self, registry: &mut RenderRegistry, state: &SharedGameState) {
        let state = SharedGameState::clone(state);
        let animation = count_animation();
        let last = LastCount::default();
        registry.create_renderable(
            "money",
            StateAccessor::getter(move || state.borrow().player.money),
            move |change, stage| render_money(change, stage, &animation, &last),
        );
    }
}
