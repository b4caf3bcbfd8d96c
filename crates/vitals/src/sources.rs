#![forbid(unsafe_code)]

//! Host metric sources backed by Linux procfs, plus the clock.
//!
//! Each source keeps its own history so widgets can be rebuilt at a new size
//! after [`DataSource::place`] without losing what was already shown. Paths
//! are configurable; a missing file reports [`SourceError::Unavailable`].

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, TimeZone};
use tracing::warn;
use unicode_width::UnicodeWidthStr;
use vitals_core::Flag;
use vitals_render::boxes::truncate_to_width;
use vitals_render::color::fg_or_default;
use vitals_render::glyphs::H_LINE;
use vitals_render::{Graph, GraphOptions, Meter, Theme, ansi};
use vitals_runtime::{Area, DataSource, RenderContext, SourceError};

/// Samples kept per source; enough for two per column on wide terminals.
pub const MAX_HISTORY: usize = 1000;

pub const CPU_BUFFER: &str = "cpu";
pub const MEM_BUFFER: &str = "mem";
pub const LOAD_BUFFER: &str = "load";
pub const CLOCK_BUFFER: &str = "clock";

/// "CPU " before the meter and " 100%" after it.
const CPU_LABEL_COLS: u16 = 9;
/// Label before each memory meter and percent plus size after it.
const MEM_LABEL_COLS: u16 = 7;
const MEM_VALUE_COLS: u16 = 15;

fn read_proc(path: &Path) -> Result<String, SourceError> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => SourceError::Unavailable(path.display().to_string()),
        _ => SourceError::Io(e),
    })
}

fn push_history(history: &mut VecDeque<i64>, value: i64) {
    if history.len() == MAX_HISTORY {
        history.pop_front();
    }
    history.push_back(value);
}

fn percent_of(part: u64, whole: u64) -> i64 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 * 100.0 / whole as f64).round_ties_even() as i64).clamp(0, 100)
}

/// Pad or cut `text` to exactly `width` columns.
fn fit(text: &str, width: u16) -> String {
    let width = usize::from(width);
    let text = truncate_to_width(text, width);
    format!("{text:<width$}")
}

// ── CPU ──────────────────────────────────────────────────────────────────

/// Aggregate jiffies from the `cpu` line of `/proc/stat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuTimes {
    pub total: u64,
    /// idle plus iowait.
    pub idle: u64,
}

impl CpuTimes {
    #[must_use]
    pub fn parse(stat: &str) -> Option<Self> {
        let line = stat.lines().find(|l| l.starts_with("cpu "))?;
        let fields: Vec<u64> = line
            .split_whitespace()
            .skip(1)
            .take(8)
            .map(|f| f.parse().ok())
            .collect::<Option<_>>()?;
        if fields.len() < 4 {
            return None;
        }
        Some(Self {
            total: fields.iter().sum(),
            idle: fields[3] + fields.get(4).copied().unwrap_or(0),
        })
    }

    /// Busy percentage between `prev` and `self`.
    #[must_use]
    pub fn usage_since(self, prev: Self) -> i64 {
        let total = self.total.saturating_sub(prev.total);
        let idle = self.idle.saturating_sub(prev.idle).min(total);
        percent_of(total - idle, total)
    }
}

/// Total CPU usage: a graph over a meter.
#[derive(Debug)]
pub struct CpuSource {
    stat_path: PathBuf,
    theme: Theme,
    area: Area,
    prev: Option<CpuTimes>,
    usage: i64,
    history: VecDeque<i64>,
    fresh: Option<i64>,
    graph: Option<Graph>,
    meter: Option<Meter>,
}

impl CpuSource {
    #[must_use]
    pub fn new(theme: &Theme) -> Self {
        Self {
            stat_path: PathBuf::from("/proc/stat"),
            theme: theme.clone(),
            area: Area::default(),
            prev: None,
            usage: 0,
            history: VecDeque::new(),
            fresh: None,
            graph: None,
            meter: None,
        }
    }

    #[must_use]
    pub fn with_stat_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.stat_path = path.into();
        self
    }

    #[must_use]
    pub fn usage(&self) -> i64 {
        self.usage
    }
}

impl DataSource for CpuSource {
    fn name(&self) -> &str {
        "cpu"
    }

    fn buffers(&self) -> &[&'static str] {
        &[CPU_BUFFER]
    }

    fn sample(&mut self, interrupt: &Flag) -> Result<(), SourceError> {
        let text = read_proc(&self.stat_path)?;
        let times = CpuTimes::parse(&text).ok_or_else(|| {
            SourceError::Unavailable(format!("{}: no cpu line", self.stat_path.display()))
        })?;
        if interrupt.get() {
            return Err(SourceError::Interrupted);
        }
        let usage = self.prev.map_or(0, |prev| times.usage_since(prev));
        self.prev = Some(times);
        self.usage = usage;
        push_history(&mut self.history, usage);
        self.fresh = Some(usage);
        Ok(())
    }

    fn render(&mut self, ctx: &RenderContext<'_>) -> io::Result<()> {
        let area = self.area;
        if area.width <= CPU_LABEL_COLS || area.height < 2 {
            return Ok(());
        }
        let graph_height = area.height - 1;
        let fresh = self.fresh.take();
        match &mut self.graph {
            Some(graph) => {
                if let Some(value) = fresh {
                    graph.push(Some(value));
                }
            }
            None => {
                let data: Vec<i64> = self.history.iter().copied().collect();
                self.graph = Some(Graph::new(
                    area.width,
                    graph_height,
                    self.theme.gradient("cpu").escapes(),
                    &data,
                    GraphOptions::default(),
                ));
            }
        }
        let theme = &self.theme;
        let meter = self.meter.get_or_insert_with(|| {
            Meter::new(area.width - CPU_LABEL_COLS, theme.gradient("cpu"), theme.meter_bg, false)
        });

        let mut out = ansi::cursor_to(area.y, area.x);
        if let Some(graph) = &self.graph {
            out.push_str(graph.render());
        }
        ansi::push_cursor_to(&mut out, area.y + graph_height, area.x);
        out.push_str(&fg_or_default(theme.main_fg));
        out.push_str("CPU ");
        out.push_str(meter.render(self.usage));
        let _ = write!(out, "{} {:>3}%{}", fg_or_default(theme.main_fg), self.usage, ansi::FG_DEFAULT);
        ctx.write(CPU_BUFFER, &out)
    }

    fn place(&mut self, area: Area) {
        if area != self.area {
            self.area = area;
            self.graph = None;
            self.meter = None;
            self.fresh = None;
        }
    }
}

// ── Memory ───────────────────────────────────────────────────────────────

/// The `/proc/meminfo` fields the dashboard shows, in KiB.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemInfo {
    pub total_kib: u64,
    pub available_kib: u64,
    pub cached_kib: u64,
}

impl MemInfo {
    /// Parse `/proc/meminfo`. Kernels without `MemAvailable` get free plus
    /// buffers plus cached.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let (mut total, mut available, mut free, mut buffers, mut cached) = (None, None, 0, 0, 0);
        for line in text.lines() {
            let Some((key, rest)) = line.split_once(':') else {
                continue;
            };
            let Some(value) = rest.split_whitespace().next().and_then(|v| v.parse::<u64>().ok())
            else {
                continue;
            };
            match key {
                "MemTotal" => total = Some(value),
                "MemAvailable" => available = Some(value),
                "MemFree" => free = value,
                "Buffers" => buffers = value,
                "Cached" => cached = value,
                _ => {}
            }
        }
        let total = total.filter(|&t| t > 0)?;
        Some(Self {
            total_kib: total,
            available_kib: available.unwrap_or(free + buffers + cached).min(total),
            cached_kib: cached.min(total),
        })
    }

    #[must_use]
    pub fn used_kib(&self) -> u64 {
        self.total_kib.saturating_sub(self.available_kib)
    }
}

/// `15.6 GiB` style size from KiB.
#[must_use]
pub fn human_kib(kib: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    let mut value = kib as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{kib} {}", UNITS[0])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

/// Memory used, available and cached as one meter row each.
#[derive(Debug)]
pub struct MemSource {
    meminfo_path: PathBuf,
    theme: Theme,
    area: Area,
    info: MemInfo,
    meters: Vec<Meter>,
    /// Last text written to the live buffer.
    shown: Option<String>,
}

const MEM_ROWS: [(&str, &str); 3] = [("Used", "used"), ("Avail", "available"), ("Cached", "cached")];

impl MemSource {
    #[must_use]
    pub fn new(theme: &Theme) -> Self {
        Self {
            meminfo_path: PathBuf::from("/proc/meminfo"),
            theme: theme.clone(),
            area: Area::default(),
            info: MemInfo::default(),
            meters: Vec::new(),
            shown: None,
        }
    }

    #[must_use]
    pub fn with_meminfo_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.meminfo_path = path.into();
        self
    }

    #[must_use]
    pub fn info(&self) -> MemInfo {
        self.info
    }
}

impl DataSource for MemSource {
    fn name(&self) -> &str {
        "mem"
    }

    fn buffers(&self) -> &[&'static str] {
        &[MEM_BUFFER]
    }

    fn sample(&mut self, interrupt: &Flag) -> Result<(), SourceError> {
        let text = read_proc(&self.meminfo_path)?;
        let info = MemInfo::parse(&text).ok_or_else(|| {
            SourceError::Unavailable(format!("{}: no MemTotal", self.meminfo_path.display()))
        })?;
        if interrupt.get() {
            return Err(SourceError::Interrupted);
        }
        self.info = info;
        Ok(())
    }

    fn render(&mut self, ctx: &RenderContext<'_>) -> io::Result<()> {
        let area = self.area;
        let fixed = MEM_LABEL_COLS + MEM_VALUE_COLS;
        if area.width <= fixed || area.height == 0 {
            return Ok(());
        }
        if self.meters.is_empty() {
            self.meters = MEM_ROWS
                .iter()
                .map(|(_, gradient)| {
                    Meter::new(area.width - fixed, self.theme.gradient(gradient), self.theme.meter_bg, false)
                })
                .collect();
        }
        let info = self.info;
        let values = [info.used_kib(), info.available_kib, info.cached_kib];
        let main = fg_or_default(self.theme.main_fg);
        let mut out = String::new();
        let rows = MEM_ROWS.iter().zip(values).zip(&mut self.meters);
        for (row, (((label, _), kib), meter)) in (0..area.height).zip(rows) {
            let percent = percent_of(kib, info.total_kib);
            ansi::push_cursor_to(&mut out, area.y + row, area.x);
            out.push_str(&main);
            out.push_str(&fit(label, MEM_LABEL_COLS));
            out.push_str(meter.render(percent));
            out.push_str(&main);
            out.push_str(&fit(&format!(" {percent:>3}% {:>9}", human_kib(kib)), MEM_VALUE_COLS));
        }
        out.push_str(ansi::FG_DEFAULT);
        if !ctx.redraw && !ctx.modal && self.shown.as_deref() == Some(out.as_str()) {
            return Ok(());
        }
        ctx.write(MEM_BUFFER, &out)?;
        self.shown = (!ctx.modal).then_some(out);
        Ok(())
    }

    fn place(&mut self, area: Area) {
        self.shown = None;
        if area != self.area {
            self.area = area;
            self.meters.clear();
        }
    }
}

// ── Load average ─────────────────────────────────────────────────────────

/// Load averages over a single-row graph scaled to the core count.
#[derive(Debug)]
pub struct LoadSource {
    loadavg_path: PathBuf,
    cores: u32,
    theme: Theme,
    area: Area,
    load: [f64; 3],
    history: VecDeque<i64>,
    fresh: Option<i64>,
    graph: Option<Graph>,
}

/// Parse the first three fields of `/proc/loadavg`.
#[must_use]
pub fn parse_loadavg(text: &str) -> Option<[f64; 3]> {
    let mut fields = text.split_whitespace().map(|f| f.parse::<f64>().ok());
    Some([fields.next()??, fields.next()??, fields.next()??])
}

impl LoadSource {
    #[must_use]
    pub fn new(theme: &Theme, cores: u32) -> Self {
        Self {
            loadavg_path: PathBuf::from("/proc/loadavg"),
            cores: cores.max(1),
            theme: theme.clone(),
            area: Area::default(),
            load: [0.0; 3],
            history: VecDeque::new(),
            fresh: None,
            graph: None,
        }
    }

    #[must_use]
    pub fn with_loadavg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.loadavg_path = path.into();
        self
    }

    #[must_use]
    pub fn load(&self) -> [f64; 3] {
        self.load
    }
}

impl DataSource for LoadSource {
    fn name(&self) -> &str {
        "load"
    }

    fn buffers(&self) -> &[&'static str] {
        &[LOAD_BUFFER]
    }

    fn sample(&mut self, interrupt: &Flag) -> Result<(), SourceError> {
        let text = read_proc(&self.loadavg_path)?;
        let load = parse_loadavg(&text).ok_or_else(|| {
            SourceError::Unavailable(format!("{}: malformed", self.loadavg_path.display()))
        })?;
        if interrupt.get() {
            return Err(SourceError::Interrupted);
        }
        self.load = load;
        let value = (load[0] * 100.0).round_ties_even() as i64;
        push_history(&mut self.history, value);
        self.fresh = Some(value);
        Ok(())
    }

    fn render(&mut self, ctx: &RenderContext<'_>) -> io::Result<()> {
        let area = self.area;
        if area.width < 2 || area.height < 2 {
            return Ok(());
        }
        let fresh = self.fresh.take();
        match &mut self.graph {
            Some(graph) => {
                if let Some(value) = fresh {
                    graph.push(Some(value));
                }
            }
            None => {
                let data: Vec<i64> = self.history.iter().copied().collect();
                let max = i64::from(self.cores) * 100;
                self.graph = Some(Graph::new(
                    area.width,
                    1,
                    self.theme.gradient("process").escapes(),
                    &data,
                    GraphOptions::default().with_max(max, 0),
                ));
            }
        }
        let [one, five, fifteen] = self.load;
        let mut out = ansi::cursor_to(area.y, area.x);
        out.push_str(&fg_or_default(self.theme.main_fg));
        out.push_str(&fit(
            &format!("{one:.2} {five:.2} {fifteen:.2} ({} cores)", self.cores),
            area.width,
        ));
        ansi::push_cursor_to(&mut out, area.y + 1, area.x);
        if let Some(graph) = &self.graph {
            out.push_str(graph.render());
        }
        out.push_str(ansi::FG_DEFAULT);
        ctx.write(LOAD_BUFFER, &out)
    }

    fn place(&mut self, area: Area) {
        if area != self.area {
            self.area = area;
            self.graph = None;
            self.fresh = None;
        }
    }
}

// ── Clock ────────────────────────────────────────────────────────────────

/// Format `time` with a strftime pattern; `None` if the pattern is invalid.
#[must_use]
pub fn format_clock<Tz: TimeZone>(format: &str, time: &DateTime<Tz>) -> Option<String>
where
    Tz::Offset: std::fmt::Display,
{
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return None;
    }
    let mut out = String::new();
    write!(out, "{}", time.format(format)).ok()?;
    Some(out)
}

/// Wall clock centered on a strip of box border. Redrawn from the idle tick
/// whenever the formatted text changes.
#[derive(Debug)]
pub struct Clock {
    format: String,
    theme: Theme,
    area: Area,
    shown: Option<String>,
}

impl Clock {
    /// An invalid `format` logs a warning and hides the clock.
    #[must_use]
    pub fn new(theme: &Theme, format: &str) -> Self {
        let format = if format_clock(format, &Local::now()).is_some() {
            format.to_string()
        } else {
            warn!(format, "invalid clock format, clock disabled");
            String::new()
        };
        Self {
            format,
            theme: theme.clone(),
            area: Area::default(),
            shown: None,
        }
    }

    fn text(&self) -> String {
        if self.format.is_empty() {
            return String::new();
        }
        format_clock(&self.format, &Local::now()).unwrap_or_default()
    }

    fn frame(&self, text: &str) -> String {
        let area = self.area;
        let mut out = fg_or_default(self.theme.cpu_box);
        ansi::push_cursor_to(&mut out, area.y, area.x);
        out.push_str(&H_LINE.repeat(usize::from(area.width)));
        let text = truncate_to_width(text, usize::from(area.width.saturating_sub(2)));
        if !text.is_empty() {
            let len = u16::try_from(text.width()).unwrap_or(u16::MAX);
            ansi::push_cursor_to(&mut out, area.y, area.x + area.width.saturating_sub(len) / 2);
            out.push_str(&fg_or_default(self.theme.title));
            out.push_str(ansi::BOLD);
            out.push_str(text);
            out.push_str(ansi::UNBOLD);
        }
        out.push_str(ansi::FG_DEFAULT);
        out
    }
}

impl DataSource for Clock {
    fn name(&self) -> &str {
        "clock"
    }

    fn buffers(&self) -> &[&'static str] {
        &[CLOCK_BUFFER]
    }

    fn sample(&mut self, _interrupt: &Flag) -> Result<(), SourceError> {
        Ok(())
    }

    fn render(&mut self, ctx: &RenderContext<'_>) -> io::Result<()> {
        if self.area.is_empty() {
            return Ok(());
        }
        let text = self.text();
        ctx.write(CLOCK_BUFFER, &self.frame(&text))?;
        self.shown = Some(text);
        Ok(())
    }

    fn place(&mut self, area: Area) {
        self.area = area;
        self.shown = None;
    }

    fn idle_tick(&mut self, ctx: &RenderContext<'_>) -> io::Result<bool> {
        if self.area.is_empty() || self.format.is_empty() {
            return Ok(false);
        }
        let text = self.text();
        if self.shown.as_deref() == Some(text.as_str()) {
            return Ok(false);
        }
        ctx.write(CLOCK_BUFFER, &self.frame(&text))?;
        self.shown = Some(text);
        Ok(true)
    }
}
