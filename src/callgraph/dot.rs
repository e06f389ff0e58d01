//! Graphviz DOT output for call graphs.
//!
//! Node and edge colors come from a [`Theme`]; the default
//! [`Theme::temperature`] maps weight 0 to dark blue and weight 1 to
//! saturated red.

use super::builder::CallGraph;
use crate::profile::schema::FunctionKey;
use std::collections::HashMap;
use std::fmt::Write;

/// Color theme mapping weights to colors, font sizes and pen widths
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    /// Background color (HSL)
    pub bgcolor: (f64, f64, f64),
    /// Color of weight 0 (HSL)
    pub mincolor: (f64, f64, f64),
    /// Color of weight 1 (HSL)
    pub maxcolor: (f64, f64, f64),
    pub fontname: String,
    pub minfontsize: f64,
    pub maxfontsize: f64,
    pub minpenwidth: f64,
    pub maxpenwidth: f64,
    pub gamma: f64,
}

impl Default for Theme {
    fn default() -> Self {
        Self::temperature()
    }
}

impl Theme {
    /// Blue (cold) to red (hot) color scale
    pub fn temperature() -> Self {
        Self {
            bgcolor: (0.0, 0.0, 1.0),
            mincolor: (2.0 / 3.0, 0.80, 0.25),
            maxcolor: (0.0, 1.0, 0.5),
            fontname: "Arial".to_string(),
            minfontsize: 10.0,
            maxfontsize: 10.0,
            minpenwidth: 0.5,
            maxpenwidth: 4.0,
            gamma: 1.0,
        }
    }

    pub fn graph_bgcolor(&self) -> String {
        let (h, s, l) = self.bgcolor;
        rgb_to_hex(self.hsl_to_rgb(h, s, l))
    }

    pub fn node_bgcolor(&self, weight: f64) -> String {
        self.color(weight)
    }

    /// Filled nodes use the background color for text
    pub fn node_fgcolor(&self, _weight: f64) -> String {
        self.graph_bgcolor()
    }

    pub fn edge_color(&self, weight: f64) -> String {
        self.color(weight)
    }

    pub fn fontsize(&self, weight: f64) -> f64 {
        (weight * weight * self.maxfontsize).max(self.minfontsize)
    }

    pub fn edge_penwidth(&self, weight: f64) -> f64 {
        (weight * self.maxpenwidth).max(self.minpenwidth)
    }

    pub fn edge_arrowsize(&self, weight: f64) -> f64 {
        0.5 * self.edge_penwidth(weight).sqrt()
    }

    /// Interpolate between min and max color, as `#rrggbb`
    pub fn color(&self, weight: f64) -> String {
        let weight = weight.clamp(0.0, 1.0);
        let (hmin, smin, lmin) = self.mincolor;
        let (hmax, smax, lmax) = self.maxcolor;

        let h = hmin + weight * (hmax - hmin);
        let s = smin + weight * (smax - smin);
        let l = lmin + weight * (lmax - lmin);

        rgb_to_hex(self.hsl_to_rgb(h, s, l))
    }

    fn hsl_to_rgb(&self, h: f64, s: f64, l: f64) -> (f64, f64, f64) {
        let h = h.rem_euclid(1.0);
        let s = s.clamp(0.0, 1.0);
        let l = l.clamp(0.0, 1.0);

        let m2 = if l <= 0.5 { l * (s + 1.0) } else { l + s - l * s };
        let m1 = l * 2.0 - m2;

        let r = hue_to_rgb(m1, m2, h + 1.0 / 3.0);
        let g = hue_to_rgb(m1, m2, h);
        let b = hue_to_rgb(m1, m2, h - 1.0 / 3.0);

        (r.powf(self.gamma), g.powf(self.gamma), b.powf(self.gamma))
    }
}

fn hue_to_rgb(m1: f64, m2: f64, mut h: f64) -> f64 {
    if h < 0.0 {
        h += 1.0;
    } else if h > 1.0 {
        h -= 1.0;
    }
    if h * 6.0 < 1.0 {
        m1 + (m2 - m1) * h * 6.0
    } else if h * 2.0 < 1.0 {
        m2
    } else if h * 3.0 < 2.0 {
        m1 + (m2 - m1) * (2.0 / 3.0 - h) * 6.0
    } else {
        m1
    }
}

fn channel_to_u8(value: f64) -> u8 {
    if value <= 0.0 {
        0
    } else if value >= 1.0 {
        255
    } else {
        (255.0 * value + 0.5) as u8
    }
}

fn rgb_to_hex((r, g, b): (f64, f64, f64)) -> String {
    format!(
        "#{:02x}{:02x}{:02x}",
        channel_to_u8(r),
        channel_to_u8(g),
        channel_to_u8(b)
    )
}

/// Quote a string for use as a DOT attribute value
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Serialize a call graph as a DOT `digraph`
pub fn write_dot(graph: &CallGraph, theme: &Theme) -> String {
    let mut out = String::new();
    let fontname = quote(&theme.fontname);

    out.push_str("digraph {\n");
    let _ = writeln!(out, "\tgraph [fontname={}, nodesep=0.125, ranksep=0.25];", fontname);
    let _ = writeln!(
        out,
        "\tnode [fontcolor=white, fontname={}, height=0, shape=box, style=filled, width=0];",
        fontname
    );
    let _ = writeln!(out, "\tedge [fontname={}];", fontname);

    let mut ids: HashMap<&FunctionKey, usize> = HashMap::new();
    for (id, node) in graph.nodes().enumerate() {
        ids.insert(&node.key, id + 1);

        let label = format!(
            "{}\n{:.2}%\n({:.2}%)\n{}\u{d7}",
            node.label,
            node.weight * 100.0,
            node.self_weight * 100.0,
            node.calls
        );
        let _ = writeln!(
            out,
            "\t{} [color={}, fontcolor={}, fontsize=\"{:.2}\", label={}, tooltip={}];",
            id + 1,
            quote(&theme.node_bgcolor(node.weight)),
            quote(&theme.node_fgcolor(node.weight)),
            theme.fontsize(node.weight),
            quote(&label),
            quote(&node.key.file),
        );
    }

    for edge in graph.edges() {
        let (Some(caller), Some(callee)) = (ids.get(&edge.caller), ids.get(&edge.callee)) else {
            continue;
        };
        let label = format!("{:.2}%\n{}\u{d7}", edge.weight * 100.0, edge.calls);
        let penwidth = theme.edge_penwidth(edge.weight);
        let _ = writeln!(
            out,
            "\t{} -> {} [arrowsize=\"{:.2}\", color={}, fontcolor={}, fontsize=\"{:.2}\", label={}, labeldistance=\"{:.2}\", penwidth=\"{:.2}\"];",
            caller,
            callee,
            theme.edge_arrowsize(edge.weight),
            quote(&theme.edge_color(edge.weight)),
            quote(&theme.edge_color(edge.weight)),
            theme.fontsize(edge.weight),
            quote(&label),
            penwidth * 2.0,
            penwidth,
        );
    }

    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::schema::ProfileData;

    #[test]
    fn test_temperature_endpoints() {
        let theme = Theme::temperature();
        assert_eq!(theme.color(1.0), "#ff0000");
        assert_eq!(theme.color(0.0), "#0d0d73");
        // out of range weights are clamped
        assert_eq!(theme.color(7.0), "#ff0000");
        assert_eq!(theme.color(-1.0), "#0d0d73");
    }

    #[test]
    fn test_hotter_is_redder() {
        let theme = Theme::temperature();
        let red = |hex: String| u8::from_str_radix(&hex[1..3], 16).unwrap();
        assert!(red(theme.color(0.9)) > red(theme.color(0.1)));
    }

    #[test]
    fn test_background_is_white() {
        assert_eq!(Theme::temperature().graph_bgcolor(), "#ffffff");
    }

    #[test]
    fn test_penwidth_bounds() {
        let theme = Theme::temperature();
        assert_eq!(theme.edge_penwidth(0.0), 0.5);
        assert_eq!(theme.edge_penwidth(1.0), 4.0);
        assert_eq!(theme.fontsize(1.0), 10.0);
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("a\"b\\c\nd"), "\"a\\\"b\\\\c\\nd\"");
    }

    #[test]
    fn test_empty_graph_is_valid_dot() {
        let graph = CallGraph::from_data(&ProfileData::new());
        let dot = write_dot(&graph, &Theme::default());
        assert!(dot.starts_with("digraph {\n"));
        assert!(dot.ends_with("}\n"));
        assert!(!dot.contains("->"));
    }
}
