#![forbid(unsafe_code)]

//! Built-in color themes.
//!
//! Themes are compiled in; there is no theme file format. Each theme names a
//! handful of plain colors and builds its gradients once at construction.

use std::collections::HashMap;

use crate::color::{Rgb, parse_or_default};
use crate::gradient::Gradient;

/// Names of the gradients every theme provides.
pub const GRADIENT_NAMES: [&str; 9] = [
    "temp",
    "cpu",
    "free",
    "cached",
    "available",
    "used",
    "download",
    "upload",
    "process",
];

/// Names accepted by [`Theme::by_name`].
pub const THEME_NAMES: [&str; 2] = ["default", "mono"];

struct ThemeSpec {
    main_fg: &'static str,
    title: &'static str,
    hi_fg: &'static str,
    inactive_fg: &'static str,
    graph_text: &'static str,
    meter_bg: &'static str,
    div_line: &'static str,
    cpu_box: &'static str,
    mem_box: &'static str,
    /// (name, start, mid, end); empty strings mean "absent".
    gradients: [(&'static str, &'static str, &'static str, &'static str); 9],
}

const DEFAULT_SPEC: ThemeSpec = ThemeSpec {
    main_fg: "#cc",
    title: "#ee",
    hi_fg: "#969696",
    inactive_fg: "#40",
    graph_text: "#60",
    meter_bg: "#40",
    div_line: "#30",
    cpu_box: "#3d7b46",
    mem_box: "#8a882e",
    gradients: [
        ("temp", "#4897d4", "#5474e8", "#ff40b6"),
        ("cpu", "#50f095", "#f2e266", "#fa1e1e"),
        ("free", "#223014", "#b5e685", "#dcff85"),
        ("cached", "#0b1a29", "#74e6fc", "#26c5ff"),
        ("available", "#292107", "#ffd77a", "#ffb814"),
        ("used", "#3b1f1c", "#d9626d", "#ff4769"),
        ("download", "#231a63", "#4f43a3", "#b0a9de"),
        ("upload", "#510554", "#7d4180", "#dcafde"),
        ("process", "#80d0a3", "#dcd179", "#d45454"),
    ],
};

const MONO_SPEC: ThemeSpec = ThemeSpec {
    main_fg: "#cc",
    title: "#ff",
    hi_fg: "#ff",
    inactive_fg: "#40",
    graph_text: "#80",
    meter_bg: "#30",
    div_line: "#50",
    cpu_box: "#90",
    mem_box: "#90",
    gradients: [
        ("temp", "#50", "", "#ff"),
        ("cpu", "#60", "", "#ff"),
        ("free", "#40", "", "#e0"),
        ("cached", "#40", "", "#e0"),
        ("available", "#40", "", "#e0"),
        ("used", "#40", "", "#ff"),
        ("download", "#50", "", "#e0"),
        ("upload", "#50", "", "#e0"),
        ("process", "#90", "", "#ff"),
    ],
};

#[derive(Debug, Clone)]
pub struct Theme {
    pub name: &'static str,
    pub main_fg: Option<Rgb>,
    pub title: Option<Rgb>,
    pub hi_fg: Option<Rgb>,
    pub inactive_fg: Option<Rgb>,
    pub graph_text: Option<Rgb>,
    pub meter_bg: Option<Rgb>,
    pub div_line: Option<Rgb>,
    pub cpu_box: Option<Rgb>,
    pub mem_box: Option<Rgb>,
    gradients: HashMap<&'static str, Gradient>,
}

impl Default for Theme {
    fn default() -> Self {
        Self::build("default", &DEFAULT_SPEC)
    }
}

impl Theme {
    /// Look up a built-in theme; `None` for unknown names.
    #[must_use]
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "default" => Some(Self::default()),
            "mono" => Some(Self::build("mono", &MONO_SPEC)),
            _ => None,
        }
    }

    /// Like [`by_name`](Self::by_name) but falls back to the default theme.
    #[must_use]
    pub fn by_name_or_default(name: &str) -> Self {
        Self::by_name(name).unwrap_or_else(|| {
            tracing::warn!(theme = name, "unknown theme, using default");
            Self::default()
        })
    }

    fn build(name: &'static str, spec: &ThemeSpec) -> Self {
        let optional = |s: &str| if s.is_empty() { None } else { parse_or_default(s) };
        let gradients = spec
            .gradients
            .iter()
            .map(|&(gname, start, mid, end)| {
                let start = optional(start).unwrap_or(Rgb::gray(0xcc));
                (gname, Gradient::new(start, optional(mid), optional(end)))
            })
            .collect();
        Self {
            name,
            main_fg: optional(spec.main_fg),
            title: optional(spec.title),
            hi_fg: optional(spec.hi_fg),
            inactive_fg: optional(spec.inactive_fg),
            graph_text: optional(spec.graph_text),
            meter_bg: optional(spec.meter_bg),
            div_line: optional(spec.div_line),
            cpu_box: optional(spec.cpu_box),
            mem_box: optional(spec.mem_box),
            gradients,
        }
    }

    /// Gradient by name; unknown names get a flat gradient in `main_fg`.
    #[must_use]
    pub fn gradient(&self, name: &str) -> Gradient {
        self.gradients.get(name).cloned().unwrap_or_else(|| {
            tracing::warn!(gradient = name, "unknown gradient");
            Gradient::flat(self.main_fg.unwrap_or(Rgb::gray(0xcc)))
        })
    }
}
