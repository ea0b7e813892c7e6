// src/chart.rs
//! Pie chart rendering for the results page, emitted as an SVG data URI.

use std::f64::consts::{FRAC_PI_2, PI};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

const WIDTH: u32 = 640;
const HEIGHT: u32 = 400;
const CENTER: (f64, f64) = (200.0, 200.0);
const RADIUS: f64 = 170.0;
const PLOT_BACKGROUND: &str = "#2b2b2b";
const FOREGROUND: &str = "white";

pub const DATA_URI_PREFIX: &str = "data:image/svg+xml;base64,";

#[derive(Debug, Clone, Copy)]
pub struct Slice<'a> {
    pub label: &'a str,
    pub value: i64,
    pub color: &'a str,
}

pub fn pie_data_uri(slices: &[Slice<'_>]) -> String {
    format!("{DATA_URI_PREFIX}{}", STANDARD.encode(render_svg(slices)))
}

pub fn render_svg(slices: &[Slice<'_>]) -> String {
    let total: i64 = slices.iter().map(|s| s.value.max(0)).sum();
    let (cx, cy) = CENTER;

    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" style="background:transparent">"#
    ));
    svg.push_str(&format!(
        r#"<rect x="0" y="0" width="{WIDTH}" height="{HEIGHT}" rx="8" fill="{PLOT_BACKGROUND}"/>"#
    ));

    if total > 0 {
        let mut angle = -FRAC_PI_2;
        for slice in slices.iter().filter(|s| s.value > 0) {
            let sweep = 2.0 * PI * slice.value as f64 / total as f64;
            let title = escape(slice.label);
            if slice.value == total {
                svg.push_str(&format!(
                    r#"<circle cx="{cx}" cy="{cy}" r="{RADIUS}" fill="{}"><title>{title}: {}</title></circle>"#,
                    slice.color, slice.value
                ));
            } else {
                let (x0, y0) = point_at(angle);
                let (x1, y1) = point_at(angle + sweep);
                let large_arc = u8::from(sweep > PI);
                svg.push_str(&format!(
                    r#"<path d="M{cx:.2},{cy:.2} L{x0:.2},{y0:.2} A{RADIUS:.2},{RADIUS:.2} 0 {large_arc} 1 {x1:.2},{y1:.2} Z" fill="{}" stroke="{PLOT_BACKGROUND}" stroke-width="1"><title>{title}: {}</title></path>"#,
                    slice.color, slice.value
                ));
            }
            angle += sweep;
        }
    }

    for (row, slice) in slices.iter().enumerate() {
        let y = 40 + row as u32 * 28;
        svg.push_str(&format!(
            r#"<rect x="420" y="{y}" width="16" height="16" fill="{}"/><text x="444" y="{}" fill="{FOREGROUND}" font-family="sans-serif" font-size="14">{} ({})</text>"#,
            slice.color,
            y + 13,
            escape(slice.label),
            slice.value
        ));
    }

    svg.push_str("</svg>");
    svg
}

fn point_at(angle: f64) -> (f64, f64) {
    (CENTER.0 + RADIUS * angle.cos(), CENTER.1 + RADIUS * angle.sin())
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
