//! Progress rendering for observed tasks.

use std::io::IsTerminal;

use indicatif::{ProgressBar, ProgressStyle};

use super::ObserveConfig;

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap()
}

/// Where observed status text goes. Implementations only produce side
/// effects; nothing here feeds back into observation control flow.
pub trait ProgressSink {
    /// Render a new status line.
    fn update(&mut self, line: &str);

    /// Stop any animation, leaving the last rendered line visible.
    fn finish(&mut self);
}

enum Render {
    /// Animated spinner whose caption is the latest line.
    Spinner(ProgressBar),
    /// Append each line to stdout — for piped/non-TTY output.
    Plain,
    /// Nothing until the caller reports the final status itself.
    Silent,
}

/// Terminal sink: spinner on a TTY, plain lines otherwise, nothing when
/// quiet.
pub struct TermSink {
    render: Render,
}

impl TermSink {
    pub fn new(cfg: &ObserveConfig) -> Self {
        let render = if cfg.quiet {
            Render::Silent
        } else if cfg.spinner && std::io::stderr().is_terminal() {
            let bar = ProgressBar::new_spinner();
            bar.set_style(spinner_style());
            bar.enable_steady_tick(cfg.tick);
            Render::Spinner(bar)
        } else {
            Render::Plain
        };
        TermSink { render }
    }
}

impl ProgressSink for TermSink {
    fn update(&mut self, line: &str) {
        match &self.render {
            Render::Spinner(bar) => bar.set_message(line.to_string()),
            Render::Plain => println!("{line}"),
            Render::Silent => {}
        }
    }

    fn finish(&mut self) {
        if let Render::Spinner(bar) = &self.render {
            bar.finish();
        }
    }
}
