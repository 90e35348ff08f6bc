//! Frame rasterization: arcs with tiny-skia, title text with usvg/resvg

use std::f32::consts::{FRAC_PI_2, TAU};

use image::{Rgba, RgbaImage};
use resvg::tiny_skia::{self, Color, LineCap, Paint, PathBuilder, Pixmap, Stroke, Transform};
use resvg::usvg;
use tracing::{debug, warn};

use crate::arcs::ArcStroke;
use crate::color::Hsb;
use crate::config::TitleConfig;
use crate::error::{Error, Result};
use crate::visualizer::Frame;

/// Rasterizer holding the font database used for the title.
pub struct Renderer {
    options: usvg::Options<'static>,
    font_family: String,
    title: TitleConfig,
}

impl Renderer {
    pub fn new(title: &TitleConfig) -> Result<Self> {
        let mut options = usvg::Options::default();
        let font_family = match &title.font {
            Some(path) => {
                let db = options.fontdb_mut();
                db.load_font_file(path)
                    .map_err(|e| Error::Render(format!("failed to load font {}: {}", path.display(), e)))?;
                let family = db
                    .faces()
                    .find_map(|face| face.families.first().map(|(name, _)| name.clone()))
                    .ok_or_else(|| Error::Render(format!("no usable face in {}", path.display())))?;
                debug!(family = %family, "loaded title font");
                family
            }
            None => {
                let db = options.fontdb_mut();
                db.load_system_fonts();
                if db.len() == 0 {
                    warn!("no system fonts found; the title will not be drawn");
                }
                "sans-serif".to_string()
            }
        };
        options.font_family = font_family.clone();

        Ok(Self {
            options,
            font_family,
            title: title.clone(),
        })
    }

    /// Draw one frame: background, arc strokes, then the rotated title.
    pub fn render(&self, frame: &Frame) -> Result<RgbaImage> {
        let mut pixmap = Pixmap::new(frame.width, frame.height).ok_or_else(|| {
            Error::Render(format!("invalid canvas size {}x{}", frame.width, frame.height))
        })?;
        let [r, g, b, a] = frame.background;
        pixmap.fill(Color::from_rgba8(r, g, b, a));

        let cx = frame.width as f32 / 2.0;
        let cy = frame.height as f32 / 2.0;
        for arc in &frame.arcs {
            draw_arc(&mut pixmap, cx, cy, arc);
        }

        if !frame.title.text.is_empty() {
            let svg = self.title_svg(frame);
            let tree = usvg::Tree::from_str(&svg, &self.options)
                .map_err(|e| Error::Render(format!("title markup: {}", e)))?;
            resvg::render(&tree, Transform::identity(), &mut pixmap.as_mut());
        }

        Ok(to_image(&pixmap))
    }

    fn title_svg(&self, frame: &Frame) -> String {
        let (w, h) = (frame.width, frame.height);
        let (cx, cy) = (w as f32 / 2.0, h as f32 / 2.0);
        let fill = svg_color(Hsb::gray(self.title.fill_brightness));
        let stroke = svg_color(Hsb::gray(self.title.stroke_brightness));
        format!(
            concat!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
                r#"<text x="{cx}" y="{cy}" transform="rotate({deg} {cx} {cy})" "#,
                r#"font-family="{family}" font-size="{size}" text-anchor="middle" dominant-baseline="central" "#,
                r#"fill="{fill}" stroke="{stroke}" stroke-width="{sw}">{text}</text></svg>"#,
            ),
            w = w,
            h = h,
            cx = cx,
            cy = cy,
            deg = frame.title.angle.to_degrees(),
            family = escape_xml(&self.font_family),
            size = self.title.size,
            fill = fill,
            stroke = stroke,
            sw = self.title.stroke_weight,
            text = escape_xml(&frame.title.text),
        )
    }
}

fn draw_arc(pixmap: &mut Pixmap, cx: f32, cy: f32, arc: &ArcStroke) {
    if arc.width <= 0.0 {
        return;
    }
    let Some(path) = arc_path(cx, cy, arc.diameter / 2.0, arc.start, arc.end) else {
        return;
    };

    let [r, g, b, a] = arc.color;
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = true;

    let stroke = Stroke {
        width: arc.width,
        line_cap: LineCap::Round,
        ..Stroke::default()
    };
    pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
}

/// Circular arc from `start` to `end` as cubic segments of at most a quarter turn.
/// A sweep of a full turn or more is a whole circle; an empty sweep is `None`.
fn arc_path(cx: f32, cy: f32, radius: f32, start: f32, end: f32) -> Option<tiny_skia::Path> {
    let sweep = end - start;
    if !(sweep > 0.0) || !(radius > 0.0) {
        return None;
    }

    let mut pb = PathBuilder::new();
    if sweep >= TAU {
        pb.push_circle(cx, cy, radius);
        return pb.finish();
    }

    let segments = (sweep / FRAC_PI_2).ceil().max(1.0) as usize;
    let step = sweep / segments as f32;
    let k = 4.0 / 3.0 * (step / 4.0).tan();

    let mut a0 = start;
    pb.move_to(cx + radius * a0.cos(), cy + radius * a0.sin());
    for _ in 0..segments {
        let a1 = a0 + step;
        let (s0, c0) = a0.sin_cos();
        let (s1, c1) = a1.sin_cos();
        pb.cubic_to(
            cx + radius * (c0 - k * s0),
            cy + radius * (s0 + k * c0),
            cx + radius * (c1 + k * s1),
            cy + radius * (s1 - k * c1),
            cx + radius * c1,
            cy + radius * s1,
        );
        a0 = a1;
    }
    pb.finish()
}

fn to_image(pixmap: &Pixmap) -> RgbaImage {
    let mut img = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in img.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    img
}

fn svg_color(color: Hsb) -> String {
    let [r, g, b, _] = color.to_rgba8();
    format!("rgb({},{},{})", r, g, b)
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
