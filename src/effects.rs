//! Decorative page effects: button ripples, floating hearts, title hover.
//!
//! Nothing here persists state or talks to the music controller. The style
//! and placement math is kept in plain helpers fed with pre-drawn rolls so it
//! stays host-testable; the DOM wiring below maps them onto elements.

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, HtmlElement, MouseEvent};

/// Heart glyphs the floating decoration draws from.
pub const HEART_GLYPHS: [&str; 7] = ["❤️", "💖", "💗", "💕", "💞", "💓", "💝"];

/// Viewport width (CSS px) below which fewer hearts are spawned.
pub const NARROW_VIEWPORT_PX: f64 = 768.0;

/// Ripple element lifetime; matches the injected animation duration.
pub const RIPPLE_LIFETIME_MS: i32 = 600;

// --- Cosmetic randomness -----------------------------------------------------

/// Small linear-congruential roller (not crypto secure). Seeded once from the
/// page clock so rolls drawn inside one loop still differ.
pub struct Lcg {
    state: u32,
}

impl Lcg {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    pub fn from_clock() -> Self {
        let now = web_sys::window()
            .and_then(|w| w.performance())
            .map(|p| p.now())
            .unwrap_or(0.0);
        Self::new(now as u32 ^ 0x9e37_79b9)
    }

    /// Next roll in [0, 1).
    pub fn roll(&mut self) -> f64 {
        self.state = self
            .state
            .wrapping_mul(1_664_525)
            .wrapping_add(1_013_904_223);
        f64::from(self.state >> 8) / f64::from(1u32 << 24)
    }
}

// --- Style & placement helpers ------------------------------------------------

pub fn heart_count(viewport_width: f64) -> usize {
    if viewport_width < NARROW_VIEWPORT_PX { 5 } else { 10 }
}

pub fn heart_glyph(roll: f64) -> &'static str {
    let idx = ((roll * HEART_GLYPHS.len() as f64) as usize).min(HEART_GLYPHS.len() - 1);
    HEART_GLYPHS[idx]
}

/// Inline style values for one floating heart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeartStyle {
    pub left_pct: f64,
    pub delay_s: f64,
    pub font_px: f64,
}

pub fn heart_style(left_roll: f64, delay_roll: f64, size_roll: f64) -> HeartStyle {
    HeartStyle {
        left_pct: left_roll * 100.0,
        delay_s: delay_roll * 5.0,
        font_px: size_roll * 15.0 + 10.0,
    }
}

/// Placement of a ripple inside a button: a square of the button's larger
/// dimension, centered on the click point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RippleGeometry {
    pub size: f64,
    pub x: f64,
    pub y: f64,
}

pub fn ripple_geometry(
    rect_left: f64,
    rect_top: f64,
    rect_width: f64,
    rect_height: f64,
    client_x: f64,
    client_y: f64,
) -> RippleGeometry {
    let size = rect_width.max(rect_height);
    RippleGeometry {
        size,
        x: client_x - rect_left - size / 2.0,
        y: client_y - rect_top - size / 2.0,
    }
}

// --- DOM wiring ---------------------------------------------------------------

/// Install every decorative effect once at page load. Individual missing
/// elements are tolerated; only DOM faults bubble up.
pub fn install(document: &Document) -> Result<(), JsValue> {
    inject_ripple_keyframes(document)?;
    install_button_ripples(document)?;
    install_title_hover(document)?;
    spawn_hearts(document)?;
    Ok(())
}

fn inject_ripple_keyframes(document: &Document) -> Result<(), JsValue> {
    let style = document.create_element("style")?;
    style.set_text_content(Some(
        "@keyframes ripple-animation { to { transform: scale(4); opacity: 0; } }",
    ));
    if let Some(head) = document.head() {
        head.append_child(&style)?;
    }
    Ok(())
}

fn install_button_ripples(document: &Document) -> Result<(), JsValue> {
    let buttons = document.query_selector_all("button")?;
    for i in 0..buttons.length() {
        let Some(button) = buttons
            .item(i)
            .and_then(|n| n.dyn_into::<HtmlElement>().ok())
        else {
            continue;
        };
        let handler = {
            let button = button.clone();
            let document = document.clone();
            Closure::wrap(Box::new(move |event: MouseEvent| {
                let _ = spawn_ripple(&document, &button, &event);
            }) as Box<dyn FnMut(MouseEvent)>)
        };
        button.add_event_listener_with_callback("click", handler.as_ref().unchecked_ref())?;
        // Page-lifetime listener; intentionally leaked.
        handler.forget();
    }
    Ok(())
}

fn spawn_ripple(
    document: &Document,
    button: &HtmlElement,
    event: &MouseEvent,
) -> Result<(), JsValue> {
    let rect = button.get_bounding_client_rect();
    let geom = ripple_geometry(
        rect.left(),
        rect.top(),
        rect.width(),
        rect.height(),
        f64::from(event.client_x()),
        f64::from(event.client_y()),
    );
    let ripple = document.create_element("span")?.dyn_into::<HtmlElement>()?;
    ripple.style().set_css_text(&format!(
        "position: absolute; border-radius: 50%; background: rgba(255, 255, 255, 0.7); \
         transform: scale(0); animation: ripple-animation 0.6s linear; \
         width: {size}px; height: {size}px; top: {y}px; left: {x}px; pointer-events: none;",
        size = geom.size,
        x = geom.x,
        y = geom.y,
    ));
    button.append_child(&ripple)?;

    // Drop the element once its animation has run out.
    let remove = Closure::once_into_js(move || {
        ripple.remove();
    });
    if let Some(win) = web_sys::window() {
        let _ = win.set_timeout_with_callback_and_timeout_and_arguments_0(
            remove.unchecked_ref(),
            RIPPLE_LIFETIME_MS,
        );
    }
    Ok(())
}

fn install_title_hover(document: &Document) -> Result<(), JsValue> {
    let Some(title) = document
        .query_selector("h1")?
        .and_then(|el| el.dyn_into::<HtmlElement>().ok())
    else {
        return Ok(());
    };

    let enter = {
        let title = title.clone();
        Closure::wrap(Box::new(move || {
            let style = title.style();
            let _ = style.set_property("transform", "scale(1.05)");
            let _ = style.set_property("transition", "transform 0.3s");
        }) as Box<dyn FnMut()>)
    };
    title.add_event_listener_with_callback("mouseenter", enter.as_ref().unchecked_ref())?;
    enter.forget();

    let leave = {
        let title = title.clone();
        Closure::wrap(Box::new(move || {
            let _ = title.style().set_property("transform", "scale(1)");
        }) as Box<dyn FnMut()>)
    };
    title.add_event_listener_with_callback("mouseleave", leave.as_ref().unchecked_ref())?;
    leave.forget();

    Ok(())
}

fn spawn_hearts(document: &Document) -> Result<(), JsValue> {
    let Some(container) = document.query_selector(".floating-hearts")? else {
        return Ok(());
    };
    let width = web_sys::window()
        .and_then(|w| w.inner_width().ok())
        .and_then(|v| v.as_f64())
        .unwrap_or(NARROW_VIEWPORT_PX);

    let mut lcg = Lcg::from_clock();
    for _ in 0..heart_count(width) {
        let heart = document.create_element("div")?.dyn_into::<HtmlElement>()?;
        heart.class_list().add_1("heart")?;
        heart.set_inner_html(heart_glyph(lcg.roll()));
        let style = heart_style(lcg.roll(), lcg.roll(), lcg.roll());
        let css = heart.style();
        let _ = css.set_property("left", &format!("{}%", style.left_pct));
        let _ = css.set_property("animation-delay", &format!("{}s", style.delay_s));
        let _ = css.set_property("font-size", &format!("{}px", style.font_px));
        container.append_child(&heart)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heart_count_threshold() {
        assert_eq!(heart_count(767.9), 5);
        assert_eq!(heart_count(768.0), 10);
        assert_eq!(heart_count(1920.0), 10);
    }

    #[test]
    fn test_heart_glyph_bounds() {
        assert_eq!(heart_glyph(0.0), HEART_GLYPHS[0]);
        assert_eq!(heart_glyph(0.999), HEART_GLYPHS[6]);
        // A roll of exactly 1.0 must not index past the end.
        assert_eq!(heart_glyph(1.0), HEART_GLYPHS[6]);
    }

    #[test]
    fn test_ripple_centered_on_click() {
        // 200x50 button at (100, 400), click in its middle.
        let g = ripple_geometry(100.0, 400.0, 200.0, 50.0, 200.0, 425.0);
        assert_eq!(g.size, 200.0);
        assert_eq!(g.x, 0.0);
        assert_eq!(g.y, -75.0);
    }

    #[test]
    fn test_lcg_rolls_are_reproducible_and_in_range() {
        let mut a = Lcg::new(7);
        let mut b = Lcg::new(7);
        for _ in 0..100 {
            let r = a.roll();
            assert_eq!(r, b.roll());
            assert!((0.0..1.0).contains(&r));
        }
    }
}
