#![forbid(unsafe_code)]

//! The dashboard: pane layout, the interval indicator, the help overlay and
//! key bindings.
//!
//! ```text
//! ┌─┤cpu├──────────── 12:34:56 ──────────────────────┐
//! │ graph                                            │
//! │ CPU ■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■■   42%  │
//! └───────────────────────────────────┤- 2000ms +├───┘
//! ┌─┤mem├───────────────────┐┌─┤load├────────────────┐
//! │ Used   ■■■■■■■  50% …   ││ 0.52 0.58 0.59        │
//! └─────────────────────────┘└───────────────────────┘
//! ```

use std::io;

use tracing::{debug, info};
use vitals_core::{InputEvent, Key, MouseAction};
use vitals_render::color::fg_or_default;
use vitals_render::glyphs::{TITLE_LEFT, TITLE_RIGHT};
use vitals_render::{BoxFrame, Theme, WriteOptions, ansi};
use vitals_runtime::{Area, Config, Dashboard, Flow, TickContext};

use crate::sources::{CLOCK_BUFFER, CPU_BUFFER, LOAD_BUFFER, MEM_BUFFER};

pub const MIN_COLS: u16 = 80;
pub const MIN_ROWS: u16 = 24;

/// Box chrome sits behind everything a source writes.
pub const CHROME_Z: i32 = 900;
pub const CHROME_BUFFER: &str = "chrome";
pub const INTERVAL_BUFFER: &str = "interval";

const CLOCK_COLS: u16 = 20;
/// `┤- NNNNNNNNms +├`
const INDICATOR_COLS: u16 = 16;
const HELP_COLS: u16 = 44;

const HELP_LINES: [(&str, &str); 6] = [
    ("+ / -", "Change the sample interval"),
    ("h, F1", "Toggle this help"),
    ("Esc", "Close this help"),
    ("Ctrl+Z", "Suspend to the shell"),
    ("q, Ctrl+C", "Quit"),
    ("mouse", "Click + or - on the cpu box"),
];

/// Boxes and inner areas for one terminal size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panes {
    pub cpu_box: BoxFrame,
    pub mem_box: BoxFrame,
    pub load_box: BoxFrame,
    pub cpu: Area,
    pub mem: Area,
    pub load: Area,
    pub clock: Area,
    /// Top-left cell of the interval indicator as (column, row).
    pub indicator: (u16, u16),
}

fn inner(frame: &BoxFrame) -> Area {
    let (x, y, width, height) = frame.inner();
    Area::new(x, y, width, height)
}

impl Panes {
    /// Split a terminal of at least [`MIN_COLS`] x [`MIN_ROWS`].
    #[must_use]
    pub fn new(cols: u16, rows: u16, theme: &Theme) -> Self {
        let cpu_height = ((u32::from(rows) * 45 / 100) as u16).max(8);
        let lower_y = cpu_height + 1;
        let lower_height = rows - cpu_height;
        let mem_width = cols / 2;

        let cpu_box = BoxFrame::new(1, 1, cols, cpu_height)
            .with_title("cpu")
            .with_colors(theme.cpu_box, theme.title);
        let mem_box = BoxFrame::new(1, lower_y, mem_width, lower_height)
            .with_title("mem")
            .with_colors(theme.mem_box, theme.title);
        let load_box = BoxFrame::new(mem_width + 1, lower_y, cols - mem_width, lower_height)
            .with_title("load")
            .with_colors(theme.div_line, theme.title);

        Self {
            cpu: inner(&cpu_box),
            mem: inner(&mem_box),
            load: inner(&load_box),
            clock: Area::new((cols - CLOCK_COLS) / 2 + 1, 1, CLOCK_COLS, 1),
            indicator: (cols - INDICATOR_COLS, cpu_height),
            cpu_box,
            mem_box,
            load_box,
        }
    }

    /// Area for the source writing buffer `name`.
    #[must_use]
    pub fn area_for(&self, name: &str) -> Option<Area> {
        match name {
            CPU_BUFFER => Some(self.cpu),
            MEM_BUFFER => Some(self.mem),
            LOAD_BUFFER => Some(self.load),
            CLOCK_BUFFER => Some(self.clock),
            _ => None,
        }
    }

    #[must_use]
    pub fn chrome(&self) -> String {
        let mut out = self.cpu_box.render();
        out.push_str(&self.mem_box.render());
        out.push_str(&self.load_box.render());
        out
    }
}

#[derive(Debug)]
pub struct App {
    config: Config,
    theme: Theme,
    panes: Option<Panes>,
    help: bool,
}

impl App {
    #[must_use]
    pub fn new(config: Config) -> Self {
        let theme = Theme::by_name_or_default(&config.theme);
        Self {
            config,
            theme,
            panes: None,
            help: false,
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    #[must_use]
    pub fn panes(&self) -> Option<&Panes> {
        self.panes.as_ref()
    }

    #[must_use]
    pub fn help_open(&self) -> bool {
        self.help
    }

    #[must_use]
    pub fn too_small(&self) -> bool {
        self.panes.is_none()
    }

    fn step_interval(&mut self, steps: i64, cx: &mut TickContext<'_>) -> io::Result<()> {
        let update_ms = self.config.adjust_update_ms(steps);
        cx.timer.set_interval(update_ms);
        debug!(update_ms, "interval changed");
        self.draw_interval(cx)
    }

    fn draw_interval(&self, cx: &mut TickContext<'_>) -> io::Result<()> {
        let Some(panes) = &self.panes else {
            return Ok(());
        };
        let (col, row) = panes.indicator;
        let value = format!("{}ms", self.config.update_ms);
        let hi = fg_or_default(self.theme.hi_fg);
        let mut out = fg_or_default(self.theme.cpu_box);
        ansi::push_cursor_to(&mut out, row, col);
        out.push_str(TITLE_LEFT);
        out.push_str(&hi);
        out.push_str(ansi::BOLD);
        out.push('-');
        out.push_str(ansi::UNBOLD);
        out.push_str(&fg_or_default(self.theme.title));
        out.push_str(&format!(" {value:>10} "));
        out.push_str(&hi);
        out.push_str(ansi::BOLD);
        out.push('+');
        out.push_str(ansi::UNBOLD);
        out.push_str(&fg_or_default(self.theme.cpu_box));
        out.push_str(TITLE_RIGHT);
        out.push_str(ansi::FG_DEFAULT);

        cx.hit_map.remove(Key::Char('-'));
        cx.hit_map.remove(Key::Char('+'));
        cx.hit_map.add_span(Key::Char('-'), col + 1, row, 1);
        cx.hit_map.add_span(Key::Char('+'), col + INDICATOR_COLS - 2, row, 1);
        cx.compositor
            .write(INTERVAL_BUFFER, &out, WriteOptions::new().now().save_only(self.help))
    }

    fn help_box(&self, (cols, rows): (u16, u16)) -> String {
        let height = HELP_LINES.len() as u16 + 4;
        let x = (cols.saturating_sub(HELP_COLS)) / 2 + 1;
        let y = (rows.saturating_sub(height)) / 2 + 1;
        let frame = BoxFrame::new(x, y, HELP_COLS, height)
            .with_title("help")
            .with_bottom_title("esc to close")
            .with_colors(self.theme.div_line, self.theme.title);
        let mut out = frame.render();
        let key_fg = fg_or_default(self.theme.hi_fg);
        let text_fg = fg_or_default(self.theme.main_fg);
        for (i, (keys, what)) in HELP_LINES.iter().enumerate() {
            ansi::push_cursor_to(&mut out, y + 2 + i as u16, x + 2);
            out.push_str(&key_fg);
            out.push_str(&format!("{keys:<12}"));
            out.push_str(&text_fg);
            out.push_str(what);
        }
        out.push_str(ansi::FG_DEFAULT);
        out
    }

    fn open_help(&mut self, cx: &mut TickContext<'_>) -> io::Result<()> {
        if self.panes.is_none() {
            return Ok(());
        }
        self.help = true;
        cx.modal.set();
        let mut frame = cx.compositor.snapshot();
        frame.push_str(&self.help_box(cx.size));
        cx.compositor.write_now(&frame)
    }

    fn close_help(&mut self, cx: &mut TickContext<'_>) -> io::Result<()> {
        self.help = false;
        cx.modal.clear();
        cx.compositor.redraw_snapshot()?;
        cx.finish();
        Ok(())
    }
}

fn too_small_text((cols, rows): (u16, u16)) -> String {
    let lines = [
        "Terminal size too small:".to_string(),
        format!("Width = {cols} Height = {rows}"),
        String::new(),
        "Needed for current config:".to_string(),
        format!("Width = {MIN_COLS} Height = {MIN_ROWS}"),
    ];
    let text_cols = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) as u16;
    let width = (text_cols + 4).min(cols.max(2));
    let height = (lines.len() as u16 + 2).min(rows.max(2));
    let x = cols.saturating_sub(width) / 2 + 1;
    let y = rows.saturating_sub(height) / 2 + 1;
    let mut out = BoxFrame::new(x, y, width, height).render();
    for (i, line) in lines.iter().enumerate() {
        let len = line.chars().count() as u16;
        let col = cols.saturating_sub(len) / 2 + 1;
        ansi::push_cursor_to(&mut out, y + 1 + i as u16, col);
        out.push_str(line);
    }
    out
}

impl Dashboard for App {
    fn layout(&mut self, cx: &mut TickContext<'_>) -> io::Result<()> {
        let (cols, rows) = cx.size;
        if cols < MIN_COLS || rows < MIN_ROWS {
            info!(cols, rows, "terminal too small");
            self.panes = None;
            if self.help {
                self.help = false;
                cx.modal.clear();
            }
            cx.collector.place(|_| Some(Area::default()));
            return cx.compositor.write_now(&too_small_text(cx.size));
        }

        let panes = Panes::new(cols, rows, &self.theme);
        cx.collector.place(|name| panes.area_for(name));
        cx.compositor.write(
            CHROME_BUFFER,
            &panes.chrome(),
            WriteOptions::new().z(CHROME_Z).save_only(self.help),
        )?;
        self.panes = Some(panes);
        self.draw_interval(cx)?;
        if self.help {
            cx.compositor.write_now(&self.help_box(cx.size))
        } else {
            cx.compositor.flush_all()
        }
    }

    fn handle_event(&mut self, event: InputEvent, cx: &mut TickContext<'_>) -> io::Result<Flow> {
        if self.help {
            match event {
                InputEvent::Key(Key::Escape | Key::Char('h') | Key::F(1))
                | InputEvent::Mouse {
                    action: MouseAction::Click,
                    ..
                } => self.close_help(cx)?,
                InputEvent::Key(Key::Char('q') | Key::Ctrl('c')) => return Ok(Flow::Quit),
                InputEvent::Key(Key::Ctrl('z')) => return Ok(Flow::Suspend),
                _ => {}
            }
            return Ok(Flow::Continue);
        }
        match event.as_key() {
            Some(Key::Char('q') | Key::Ctrl('c')) => return Ok(Flow::Quit),
            Some(Key::Ctrl('z')) => return Ok(Flow::Suspend),
            Some(Key::Char('+')) => self.step_interval(1, cx)?,
            Some(Key::Char('-')) => self.step_interval(-1, cx)?,
            Some(Key::Char('h') | Key::F(1)) => self.open_help(cx)?,
            _ => {}
        }
        Ok(Flow::Continue)
    }

    fn should_collect(&self) -> bool {
        self.panes.is_some() && (!self.help || self.config.background_update)
    }
}
