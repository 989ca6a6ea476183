//! Browser side: DOM stage, CSS animator, timers and the page wiring exported
//! to JS.
//!
//! Each running effect is an [`EmitterHandle`] owning its emitter plus the
//! interval closures that drive it. The handles for the page live in the
//! thread-local `PAGE` slot until `stop_effects()` (or a restart) drops them,
//! which cancels timers, unhooks listeners and removes every live node.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use log::{debug, info, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, EventTarget, HtmlElement, MouseEvent, window};

use crate::config::PageConfig;
use crate::emitter::motion::{css_num, keyframes_css};
use crate::emitter::{Animator, Appearance, Clock, Emitter, EmitterPolicy, InstanceId, Point, SplitMix64, Stage, Tween};
use crate::error::EffectsError;

pub(crate) fn performance_now() -> f64 {
    window().and_then(|w| w.performance()).map(|p| p.now()).unwrap_or(0.0)
}

/// `performance.now()`; monotonic within the page session.
#[derive(Clone, Copy, Debug, Default)]
pub struct PerformanceClock;

impl Clock for PerformanceClock {
    fn now(&self) -> f64 {
        performance_now()
    }
}

// --- Stage -------------------------------------------------------------------

/// Container element that instances are appended to.
pub struct DomStage {
    document: Document,
    container: Element,
}

impl DomStage {
    pub fn new(document: Document, container: Element) -> Self {
        Self { document, container }
    }

    /// Pins the container over the whole viewport without catching the mouse.
    pub fn make_overlay(&self, z_index: u32) {
        let style = format!(
            "position: fixed; top: 0; left: 0; width: 100vw; height: 100vh; z-index: {z_index}; \
             pointer-events: none; overflow: hidden; background: transparent;"
        );
        self.container.set_attribute("style", &style).ok();
    }
}

fn attach_err(err: JsValue) -> EffectsError {
    EffectsError::Attach(format!("{err:?}"))
}

impl Stage for DomStage {
    type Node = HtmlElement;

    fn attach(&self, appearance: &Appearance) -> Result<HtmlElement, EffectsError> {
        let node: HtmlElement = self
            .document
            .create_element("div")
            .map_err(attach_err)?
            .dyn_into()
            .map_err(|_| EffectsError::Attach("created node is not an HtmlElement".into()))?;
        node.set_attribute("style", &appearance.to_style()).map_err(attach_err)?;
        self.container.append_child(&node).map_err(attach_err)?;
        Ok(node)
    }

    fn detach(&self, node: &HtmlElement) {
        node.remove();
    }

    fn viewport(&self) -> (f64, f64) {
        let dim = |v: Result<JsValue, JsValue>| v.ok().and_then(|v| v.as_f64());
        match window() {
            Some(w) => (dim(w.inner_width()).unwrap_or(1280.0), dim(w.inner_height()).unwrap_or(720.0)),
            None => (1280.0, 720.0),
        }
    }
}

// --- Animator ----------------------------------------------------------------

/// Plays tweens with CSS: transitions for two-keyframe tweens, generated
/// `@keyframes` rules otherwise. Completion comes from a timeout.
pub struct CssAnimator {
    document: Document,
    next_rule: Cell<u64>,
}

impl CssAnimator {
    pub fn new(document: Document) -> Self {
        Self { document, next_rule: Cell::new(0) }
    }

    fn transition(&self, node: &HtmlElement, tween: &Tween) {
        let style = node.style();
        let d = css_num(tween.duration_ms);
        let easing = tween.easing.css();
        let to = tween.end_frame();
        // Reading layout flushes the birth frame so the transition has a start.
        let _ = node.offset_height();
        style
            .set_property("transition", &format!("transform {d}ms {easing}, opacity {d}ms {easing}"))
            .ok();
        style.set_property("transform", &to.transform_css()).ok();
        style.set_property("opacity", &to.opacity_css()).ok();
    }

    fn keyframes(&self, node: &HtmlElement, tween: &Tween) {
        let n = self.next_rule.get();
        self.next_rule.set(n + 1);
        let name = format!("sfx-{n}");
        // The rule lives inside the node, so detaching the node drops it too.
        match self.document.create_element("style") {
            Ok(rule) => {
                rule.set_text_content(Some(&keyframes_css(&name, &tween.keyframes)));
                node.append_child(&rule).ok();
            }
            Err(err) => warn!("could not create keyframes rule: {err:?}"),
        }
        let iterations = if tween.looping { "infinite" } else { "1" };
        let animation = format!(
            "{name} {}ms {} {}ms {iterations} both",
            css_num(tween.duration_ms),
            tween.easing.css(),
            css_num(tween.delay_ms)
        );
        node.style().set_property("animation", &animation).ok();
    }
}

impl Animator<HtmlElement> for CssAnimator {
    fn run(&self, node: &HtmlElement, tween: Tween, on_complete: Box<dyn FnOnce()>) {
        if tween.keyframes.len() <= 2 && !tween.looping {
            self.transition(node, &tween);
        } else {
            self.keyframes(node, &tween);
        }
        if tween.looping {
            return;
        }
        let Some(win) = window() else { return };
        let callback = Closure::once_into_js(move || on_complete());
        let delay = (tween.duration_ms + tween.delay_ms.max(0.0)).ceil() as i32;
        if let Err(err) = win.set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), delay) {
            // The sweep will pick the instance up.
            warn!("completion timer not scheduled: {err:?}");
        }
    }
}

// --- Timers & listeners ------------------------------------------------------

/// `setInterval` or `setTimeout` registration, cleared on drop.
struct Timer {
    id: i32,
    repeating: bool,
    _callback: Closure<dyn FnMut()>,
}

impl Timer {
    fn every(period_ms: f64, f: impl FnMut() + 'static) -> Option<Self> {
        Self::schedule(true, period_ms.round().max(1.0), f)
    }

    fn after(delay_ms: f64, f: impl FnMut() + 'static) -> Option<Self> {
        Self::schedule(false, delay_ms.round().max(0.0), f)
    }

    fn schedule(repeating: bool, ms: f64, f: impl FnMut() + 'static) -> Option<Self> {
        let win = window()?;
        let callback = Closure::wrap(Box::new(f) as Box<dyn FnMut()>);
        let handler = callback.as_ref().unchecked_ref();
        let scheduled = if repeating {
            win.set_interval_with_callback_and_timeout_and_arguments_0(handler, ms as i32)
        } else {
            win.set_timeout_with_callback_and_timeout_and_arguments_0(handler, ms as i32)
        };
        match scheduled {
            Ok(id) => Some(Self { id, repeating, _callback: callback }),
            Err(err) => {
                warn!("timer not scheduled: {err:?}");
                None
            }
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if let Some(w) = window() {
            if self.repeating {
                w.clear_interval_with_handle(self.id);
            } else {
                w.clear_timeout_with_handle(self.id);
            }
        }
    }
}

/// Mouse event listener, removed on drop.
struct Listener {
    target: EventTarget,
    kind: &'static str,
    callback: Closure<dyn FnMut(MouseEvent)>,
}

impl Listener {
    fn mouse(target: &EventTarget, kind: &'static str, f: impl FnMut(MouseEvent) + 'static) -> Result<Self, JsValue> {
        let callback = Closure::wrap(Box::new(f) as Box<dyn FnMut(MouseEvent)>);
        target.add_event_listener_with_callback(kind, callback.as_ref().unchecked_ref())?;
        Ok(Self { target: target.clone(), kind, callback })
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.target
            .remove_event_listener_with_callback(self.kind, self.callback.as_ref().unchecked_ref())
            .ok();
    }
}

// --- Handle ------------------------------------------------------------------

pub type DomEmitter = Emitter<DomStage, CssAnimator, PerformanceClock, SplitMix64>;

/// A running emitter with its spawn, sweep and start-up wave timers.
///
/// Dropping the handle is the same as calling [`EmitterHandle::stop`].
pub struct EmitterHandle {
    emitter: Rc<RefCell<DomEmitter>>,
    timers: Vec<Timer>,
}

impl EmitterHandle {
    /// Mounts `policy` on the first element matching `selector`.
    ///
    /// A missing element is logged and yields `None`; the rest of the page is
    /// unaffected.
    pub fn start(document: &Document, selector: &str, policy: EmitterPolicy) -> Option<Self> {
        Self::start_with(document, selector, policy, |_| {})
    }

    fn start_with(
        document: &Document,
        selector: &str,
        policy: EmitterPolicy,
        prepare: impl FnOnce(&DomStage),
    ) -> Option<Self> {
        // A missing mount is reported once, by `Emitter::start`.
        let mount = match document.query_selector(selector) {
            Ok(Some(el)) => Some(DomStage::new(document.clone(), el)),
            Ok(None) => {
                debug!("no element matches `{selector}`");
                None
            }
            Err(err) => {
                debug!("invalid selector `{selector}`: {err:?}");
                None
            }
        };
        if let Some(stage) = &mount {
            prepare(stage);
        }
        let seed = performance_now().to_bits() ^ 0x5DEE_CE66_D1CE_4E5B;
        let emitter = Emitter::start(
            policy,
            mount,
            CssAnimator::new(document.clone()),
            PerformanceClock,
            SplitMix64::from_entropy_or(seed),
        )?;
        let (spawn_period, sweep_period, looping) = {
            let p = emitter.policy();
            (p.spawn.timer_ms, p.sweep_interval_ms, p.looping)
        };
        let follow_ups: Vec<f64> = emitter.policy().spawn.follow_up_delays().collect();
        let emitter = Rc::new(RefCell::new(emitter));

        let mut timers = Vec::new();
        for delay in follow_ups {
            let weak = Rc::downgrade(&emitter);
            timers.extend(Timer::after(delay, move || {
                if let Some(cell) = weak.upgrade() {
                    if let Ok(mut e) = cell.try_borrow_mut() {
                        e.burst(1, None);
                    }
                }
            }));
        }
        if let Some(period) = spawn_period {
            let weak = Rc::downgrade(&emitter);
            timers.extend(Timer::every(period, move || {
                if let Some(cell) = weak.upgrade() {
                    if let Ok(mut e) = cell.try_borrow_mut() {
                        e.spawn_one(None);
                    }
                }
            }));
        }
        if !looping {
            let weak = Rc::downgrade(&emitter);
            timers.extend(Timer::every(sweep_period, move || {
                if let Some(cell) = weak.upgrade() {
                    if let Ok(e) = cell.try_borrow() {
                        e.sweep();
                    }
                }
            }));
        }
        Some(Self { emitter, timers })
    }

    pub fn spawn(&self, origin: Option<Point>) -> Option<InstanceId> {
        self.emitter.try_borrow_mut().ok()?.spawn_one(origin)
    }

    pub fn burst(&self, count: usize, origin: Option<Point>) -> usize {
        self.emitter.try_borrow_mut().map(|mut e| e.burst(count, origin)).unwrap_or(0)
    }

    pub fn live_count(&self) -> usize {
        self.emitter.try_borrow().map(|e| e.live_count()).unwrap_or(0)
    }

    fn downgrade(&self) -> Weak<RefCell<DomEmitter>> {
        Rc::downgrade(&self.emitter)
    }

    /// Cancels every timer and removes every live instance. Idempotent.
    pub fn stop(&mut self) {
        self.timers.clear();
        if let Ok(e) = self.emitter.try_borrow() {
            e.stop();
        }
    }
}

impl Drop for EmitterHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

// --- Page wiring -------------------------------------------------------------

const CONFETTI_LAYER: u32 = 9_999;
const SPARKLE_LAYER: u32 = 10_000;

struct PageEffects {
    // Listeners go first so they are unhooked before their emitters stop.
    _listeners: Vec<Listener>,
    stars: Option<EmitterHandle>,
    particles: Option<EmitterHandle>,
    confetti: Option<EmitterHandle>,
    sparkles: Option<EmitterHandle>,
    click_burst: Option<EmitterHandle>,
    celebration: Option<EmitterHandle>,
}

impl PageEffects {
    fn handles(&self) -> impl Iterator<Item = &EmitterHandle> {
        [&self.stars, &self.particles, &self.confetti, &self.sparkles, &self.click_burst, &self.celebration]
            .into_iter()
            .flatten()
    }
}

thread_local! {
    static PAGE: RefCell<Option<PageEffects>> = RefCell::new(None);
}

fn client_point(evt: &MouseEvent) -> Point {
    Point::new(f64::from(evt.client_x()), f64::from(evt.client_y()))
}

fn overlay(z_index: u32) -> impl FnOnce(&DomStage) {
    move |stage: &DomStage| stage.make_overlay(z_index)
}

fn start_page(doc: &Document, config: PageConfig) -> Result<PageEffects, JsValue> {
    let sel = &config.selectors;

    let stars = config.stars.and_then(|p| EmitterHandle::start(doc, &sel.stars, p));
    let particles = config.particles.and_then(|p| EmitterHandle::start(doc, &sel.particles, p));
    let confetti = config
        .confetti
        .and_then(|p| EmitterHandle::start_with(doc, &sel.confetti, p, overlay(CONFETTI_LAYER)));
    let sparkles = config
        .sparkles
        .and_then(|p| EmitterHandle::start_with(doc, &sel.sparkles, p, overlay(SPARKLE_LAYER)));
    let click_burst = config
        .click_burst
        .and_then(|p| EmitterHandle::start_with(doc, &sel.sparkles, p, overlay(SPARKLE_LAYER)));
    let celebration = config
        .celebration
        .and_then(|p| EmitterHandle::start_with(doc, &sel.confetti, p, overlay(CONFETTI_LAYER)));

    let mut listeners = Vec::new();
    if let Some(handle) = &sparkles {
        let weak = handle.downgrade();
        listeners.push(Listener::mouse(doc, "mousemove", move |evt: MouseEvent| {
            if let Some(cell) = weak.upgrade() {
                if let Ok(mut e) = cell.try_borrow_mut() {
                    e.spawn_one(Some(client_point(&evt)));
                }
            }
        })?);
    }
    if let Some(handle) = &click_burst {
        match doc.query_selector(&sel.click_area)? {
            Some(area) => {
                let weak = handle.downgrade();
                listeners.push(Listener::mouse(&area, "click", move |evt: MouseEvent| {
                    if let Some(cell) = weak.upgrade() {
                        if let Ok(mut e) = cell.try_borrow_mut() {
                            let cap = e.policy().cap;
                            e.burst(cap, Some(client_point(&evt)));
                        }
                    }
                })?);
            }
            None => warn!("no element matches `{}`; click confetti disabled", sel.click_area),
        }
    }

    Ok(PageEffects { _listeners: listeners, stars, particles, confetti, sparkles, click_burst, celebration })
}

fn install(config: PageConfig) -> Result<(), JsValue> {
    let win = window().ok_or_else(|| JsValue::from_str("no window"))?;
    let doc = win.document().ok_or_else(|| JsValue::from_str("no document"))?;
    // Tear down a previous run before mounting again.
    stop_effects();
    let page = start_page(&doc, config)?;
    let running = page.handles().count();
    PAGE.with(|slot| *slot.borrow_mut() = Some(page));
    info!("effects started: {running} emitter(s) running");
    Ok(())
}

/// Starts every page effect with the stock configuration.
#[wasm_bindgen]
pub fn start_effects() -> Result<(), JsValue> {
    install(PageConfig::default())
}

/// Starts the page effects from a JSON [`PageConfig`].
#[cfg(feature = "serde_json")]
#[wasm_bindgen]
pub fn start_effects_with_config(json: &str) -> Result<(), JsValue> {
    let config = PageConfig::from_json(json).map_err(|e| JsValue::from_str(&e.to_string()))?;
    install(config)
}

/// Stops all effects: timers cancelled, listeners removed, nodes detached.
#[wasm_bindgen]
pub fn stop_effects() {
    // Take the page out first so dropping it runs without the slot borrowed.
    let page = PAGE.with(|slot| slot.borrow_mut().take());
    if page.is_some() {
        drop(page);
        info!("effects stopped");
    }
}

/// Fires the celebration burst. Returns how many pieces were thrown.
#[wasm_bindgen]
pub fn celebrate() -> u32 {
    PAGE.with(|slot| {
        let slot = slot.borrow();
        let Some(handle) = slot.as_ref().and_then(|p| p.celebration.as_ref()) else {
            return 0;
        };
        let count = handle.emitter.try_borrow().map(|e| e.policy().cap).unwrap_or(0);
        handle.burst(count, None) as u32
    })
}

/// Total live instances across every running effect.
#[wasm_bindgen]
pub fn live_particles() -> u32 {
    PAGE.with(|slot| slot.borrow().as_ref().map(|p| p.handles().map(EmitterHandle::live_count).sum::<usize>()).unwrap_or(0) as u32)
}
