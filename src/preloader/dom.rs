//! DOM overlay
//!
//! Builds the preloader markup, drives it from [`PreloaderView`] calls and
//! paints the particle backdrop on a 2D canvas. A missing element only
//! disables the part of the overlay that needs it.

use std::f64::consts::TAU;

use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, Document, Element, HtmlCanvasElement, HtmlElement};

use super::particles::ParticleField;
use super::view::PreloaderView;
use crate::consts::COMPLETE_EVENT;
use crate::settings::Settings;

pub const OVERLAY_ID: &str = "cinematic-preloader";
pub const START_OVERLAY_ID: &str = "start-overlay";

const EXIT_ANIMATION: &str = "preloaderExit 1.5s cubic-bezier(0.77, 0, 0.175, 1) forwards";
const LINK_RGB: &str = "0, 180, 216";

const START_STYLE: &str = "position: fixed; top: 0; left: 0; width: 100%; height: 100%; \
    background: rgba(0, 0, 0, 0.95); z-index: 100000; display: flex; \
    align-items: center; justify-content: center; cursor: pointer;";

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn overlay_markup(settings: &Settings) -> String {
    format!(
        r#"
        <div class="preloader-bg">
            <div class="grid-overlay"></div>
            <div class="scanlines"></div>
        </div>
        <div class="preloader-content">
            <div class="logo-container">
                <canvas id="logo-particles"></canvas>
                <div class="logo-reveal">
                    <img src="{logo}" alt="{title}" class="preloader-logo">
                    <div class="logo-glitch"></div>
                </div>
            </div>
            <div class="company-name">
                <span class="company-text">{title}</span>
                <div class="company-subtitle">{subtitle}</div>
            </div>
            <div class="progress-container">
                <div class="progress-bar-outer">
                    <div class="progress-bar-inner" id="progressBar"></div>
                    <div class="progress-glow"></div>
                </div>
                <div class="progress-details">
                    <span class="progress-text" id="progressText"></span>
                    <span class="progress-percent" id="progressPercent">0%</span>
                </div>
                <div class="loading-stages" id="loadingStages"></div>
            </div>
            <div class="holographic-overlay"></div>
        </div>
        <div class="corner-decoration top-left"></div>
        <div class="corner-decoration top-right"></div>
        <div class="corner-decoration bottom-left"></div>
        <div class="corner-decoration bottom-right"></div>
        "#,
        logo = escape(&settings.logo_path),
        title = escape(&settings.title),
        subtitle = escape(&settings.subtitle),
    )
}

struct Backdrop {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

/// Browser view over `document`
pub struct DomView {
    document: Document,
    root: Option<HtmlElement>,
    start: Option<HtmlElement>,
    label: Option<Element>,
    percent: Option<Element>,
    bar: Option<HtmlElement>,
    stages: Option<Element>,
    backdrop: Option<Backdrop>,
}

impl DomView {
    pub fn new() -> Option<Self> {
        let document = web_sys::window()?.document()?;
        Some(Self {
            document,
            root: None,
            start: None,
            label: None,
            percent: None,
            bar: None,
            stages: None,
            backdrop: None,
        })
    }

    fn body(&self) -> Option<HtmlElement> {
        let body = self.document.body();
        if body.is_none() {
            log::warn!("Document has no body");
        }
        body
    }

    fn create(&self, tag: &str) -> Option<HtmlElement> {
        self.document
            .create_element(tag)
            .ok()
            .and_then(|el| el.dyn_into::<HtmlElement>().ok())
    }

    fn find(&self, id: &str) -> Option<Element> {
        let el = self.document.get_element_by_id(id);
        if el.is_none() {
            log::warn!("Element #{} not found", id);
        }
        el
    }

    fn find_backdrop(&self) -> Option<Backdrop> {
        let canvas = self
            .find("logo-particles")?
            .dyn_into::<HtmlCanvasElement>()
            .ok()?;
        let ctx = canvas
            .get_context("2d")
            .ok()
            .flatten()?
            .dyn_into::<CanvasRenderingContext2d>()
            .ok()?;

        if let Some(parent) = canvas
            .parent_element()
            .and_then(|p| p.dyn_into::<HtmlElement>().ok())
        {
            canvas.set_width(parent.offset_width().max(0) as u32);
            canvas.set_height(parent.offset_height().max(0) as u32);
        }
        Some(Backdrop { canvas, ctx })
    }

    fn draw(ctx: &CanvasRenderingContext2d, field: &ParticleField, link_distance: f32) {
        for p in field.particles() {
            let (x, y) = (p.pos.x as f64, p.pos.y as f64);
            let size = p.size as f64;

            ctx.begin_path();
            let _ = ctx.arc(x, y, size, 0.0, TAU);
            ctx.set_fill_style_str(&p.css_color(1.0));
            ctx.set_global_alpha(p.alpha as f64);
            ctx.fill();

            ctx.begin_path();
            let _ = ctx.arc(x, y, size * 3.0, 0.0, TAU);
            if let Ok(glow) = ctx.create_radial_gradient(x, y, 0.0, x, y, size * 3.0) {
                let _ = glow.add_color_stop(0.0, &p.css_color(p.alpha));
                let _ = glow.add_color_stop(0.5, &p.css_color(p.alpha * 0.3));
                let _ = glow.add_color_stop(1.0, "transparent");
                ctx.set_fill_style_canvas_gradient(&glow);
                ctx.fill();
            }
        }

        let particles = field.particles();
        ctx.set_line_width(1.0);
        for link in field.links(link_distance) {
            let (a, b) = (&particles[link.a], &particles[link.b]);
            ctx.set_global_alpha(a.alpha as f64);
            ctx.begin_path();
            ctx.move_to(a.pos.x as f64, a.pos.y as f64);
            ctx.line_to(b.pos.x as f64, b.pos.y as f64);
            ctx.set_stroke_style_str(&format!("rgba({}, {:.3})", LINK_RGB, link.opacity));
            ctx.stroke();
        }

        ctx.set_global_alpha(1.0);
    }
}

impl PreloaderView for DomView {
    fn mount_overlay(&mut self, settings: &Settings) {
        let (Some(body), Some(root)) = (self.body(), self.create("div")) else {
            log::warn!("Could not create preloader overlay");
            return;
        };
        root.set_id(OVERLAY_ID);
        root.set_inner_html(&overlay_markup(settings));
        if body.append_child(&root).is_err() {
            log::warn!("Could not attach preloader overlay");
            return;
        }
        self.root = Some(root);

        self.label = self.find("progressText");
        self.percent = self.find("progressPercent");
        self.bar = self
            .find("progressBar")
            .and_then(|el| el.dyn_into::<HtmlElement>().ok());
        self.stages = self.find("loadingStages");
        self.backdrop = self.find_backdrop();
    }

    fn show_start_prompt(&mut self, title: &str) {
        let (Some(body), Some(overlay)) = (self.body(), self.create("div")) else {
            return;
        };
        overlay.set_id(START_OVERLAY_ID);
        overlay.set_inner_html(&format!(
            r#"<div class="start-content">
                <div class="start-icon"><i class="fas fa-play-circle"></i></div>
                <h2>{}</h2>
                <p>Click to begin</p>
            </div>"#,
            escape(title)
        ));
        overlay.style().set_css_text(START_STYLE);
        if body.append_child(&overlay).is_ok() {
            self.start = Some(overlay);
        }
    }

    fn hide_start_prompt(&mut self) {
        if let Some(overlay) = &self.start {
            let style = overlay.style();
            let _ = style.set_property("transition", "opacity 0.5s");
            let _ = style.set_property("opacity", "0");
            let _ = style.set_property("pointer-events", "none");
        }
    }

    fn set_label(&mut self, label: &str) {
        if let Some(el) = &self.label {
            el.set_text_content(Some(label));
            // Restart the label flash animation
            let classes = el.class_list();
            let _ = classes.remove_1("stage-change");
            let _ = el.client_width();
            let _ = classes.add_1("stage-change");
        }
    }

    fn push_stage_indicator(&mut self, label: &str) {
        let Some(stages) = &self.stages else { return };
        let (Some(line), Some(check)) = (self.create("div"), self.create("span")) else {
            return;
        };
        line.set_class_name("stage-indicator");
        check.set_class_name("stage-check");
        check.set_text_content(Some("\u{2713}"));
        let _ = line.append_child(&check);
        let _ = line.append_with_str_1(&format!(" {}", label));
        let _ = stages.append_child(&line);
        stages.set_scroll_top(stages.scroll_height());
    }

    fn set_progress(&mut self, percent: f32) {
        if let Some(bar) = &self.bar {
            let _ = bar.style().set_property("width", &format!("{}%", percent));
        }
        if let Some(el) = &self.percent {
            el.set_text_content(Some(&format!("{}%", percent.floor() as u32)));
        }
    }

    fn begin_fade(&mut self) {
        if let Some(root) = &self.root {
            let _ = root.class_list().add_1("complete");
        }
    }

    fn begin_exit(&mut self) {
        if let Some(root) = &self.root {
            let _ = root.style().set_property("animation", EXIT_ANIMATION);
        }
    }

    fn remove_overlay(&mut self) {
        if let Some(root) = self.root.take() {
            root.remove();
        }
        if let Some(start) = self.start.take() {
            start.remove();
        }
        self.label = None;
        self.percent = None;
        self.bar = None;
        self.stages = None;
        self.backdrop = None;
    }

    fn set_scroll_locked(&mut self, locked: bool) {
        let Some(body) = self.body() else { return };
        let style = body.style();
        let _ = if locked {
            style.set_property("overflow", "hidden")
        } else {
            style.remove_property("overflow").map(|_| ())
        };
    }

    fn emit_complete(&mut self) {
        match web_sys::Event::new(COMPLETE_EVENT) {
            Ok(event) => {
                let _ = self.document.dispatch_event(&event);
            }
            Err(e) => log::warn!(
                "Could not create {} event: {}",
                COMPLETE_EVENT,
                crate::error::js_reason(&e)
            ),
        }
    }

    fn canvas_size(&self) -> Option<(f32, f32)> {
        self.backdrop
            .as_ref()
            .map(|b| (b.canvas.width() as f32, b.canvas.height() as f32))
    }

    fn draw_particles(&mut self, field: &ParticleField, link_distance: f32) {
        let Some(backdrop) = &self.backdrop else { return };
        let (w, h) = (backdrop.canvas.width() as f64, backdrop.canvas.height() as f64);
        backdrop.ctx.clear_rect(0.0, 0.0, w, h);
        Self::draw(&backdrop.ctx, field, link_distance);
    }
}
