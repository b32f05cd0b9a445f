// src/view/render.rs

//! Pure formatting of a registry snapshot.

use std::sync::LazyLock;
use std::time::Duration;

use crossterm::style::Stylize;
use regex::Regex;

use crate::registry::{Project, Registry, Status};

use super::ViewState;

/// Braille dot spinner.
pub const SPINNER_FRAMES: [&str; 8] = ["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];

// CSI sequences (colours, cursor moves) and OSC sequences (titles, links).
static ANSI_ESCAPE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)|\x1b[@-Z\\-_]").ok()
});

/// Remove terminal escape sequences from a line of command output.
pub fn strip_ansi(line: &str) -> String {
    match ANSI_ESCAPE.as_ref() {
        Some(re) => re.replace_all(line, "").into_owned(),
        None => line.to_string(),
    }
}

/// `850ms`, `12.3s`, `4m05s`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let ms = elapsed.as_millis();
    if ms < 1_000 {
        format!("{ms}ms")
    } else if ms < 60_000 {
        format!("{:.1}s", elapsed.as_secs_f64())
    } else {
        let secs = elapsed.as_secs();
        format!("{}m{:02}s", secs / 60, secs % 60)
    }
}

fn project_marker(project: &Project, frame: usize) -> String {
    if project.any_failed() {
        return "x".red().to_string();
    }
    if project.all_finished() {
        return "✓".green().to_string();
    }
    if project.all_terminal() {
        return "-".yellow().to_string();
    }
    SPINNER_FRAMES[frame % SPINNER_FRAMES.len()]
        .magenta()
        .to_string()
}

/// Format the whole run as text.
///
/// `done` switches to the final report: units of failed projects are always
/// listed, help is hidden and the timer becomes "Finished in". `max_lines`
/// bounds the live output shown per unit (`0` shows every retained line).
pub fn render_run(
    registry: &Registry,
    state: &ViewState,
    done: bool,
    elapsed: Duration,
    frame: usize,
    max_lines: usize,
) -> String {
    let mut lines = Vec::new();

    lines.push(format!(
        "{}  {}",
        " QK Command Runner ".bold().on_dark_magenta(),
        concat!("v", env!("CARGO_PKG_VERSION")).cyan()
    ));
    lines.push(String::new());

    for project in registry.projects() {
        let name = if project.all_finished() {
            project.name().dark_grey().crossed_out().to_string()
        } else {
            project.name().cyan().to_string()
        };
        lines.push(format!("{} {}", project_marker(project, frame), name));

        // Only fully successful projects collapse; stopped and failed ones
        // keep their unit lines.
        let show_units = !project.all_finished() && (state.show_scripts || done);
        if !show_units && !state.show_stdout {
            continue;
        }

        let mut summary_line = String::new();
        for (j, unit) in project.units().iter().enumerate() {
            if show_units {
                if j > 0 {
                    summary_line.push_str(&" • ".dark_grey().to_string());
                }
                summary_line.push_str("   ");
                summary_line.push_str(&unit.render(true));
            }

            if state.show_stdout && !unit.output().is_empty() {
                if !summary_line.is_empty() {
                    lines.push(std::mem::take(&mut summary_line));
                }
                for line in unit.output().tail(max_lines) {
                    lines.push(format!("     {}", strip_ansi(line)));
                }
            }
        }
        if !summary_line.is_empty() {
            lines.push(summary_line);
        }
    }

    lines.push(String::new());
    if done {
        lines.push(format!("Finished in {}", format_elapsed(elapsed)));
    } else {
        if state.show_timer {
            lines.push(format!("Elapsed: {}", format_elapsed(elapsed)));
        }
        lines.push(help_line(state).dark_grey().to_string());
    }

    lines.join("\n")
}

fn help_line(state: &ViewState) -> String {
    if state.show_help {
        [
            "s toggle scripts",
            "t toggle timer",
            "d toggle stdout",
            "? toggle help",
            "q quit",
        ]
        .join(" • ")
    } else {
        "? toggle help • q quit".to_string()
    }
}

/// One-line description of a unit, for the plain presenter and logs.
pub fn describe_unit(
    project: &Project,
    command_line: &str,
    status: Status,
    detail: Option<&str>,
) -> String {
    let name = project.name();
    match detail {
        Some(detail) => format!("[{name}] {command_line} {status} ({detail})"),
        None => format!("[{name}] {command_line} {status}"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::registry::{RenderFn, UnitId};

    fn render() -> RenderFn {
        Arc::new(|status, show| {
            if show {
                format!("yarn {status}")
            } else {
                "yarn".to_string()
            }
        })
    }

    fn registry() -> Registry {
        let mut reg = Registry::new(
            vec![Project::new("api", "/w/api"), Project::new("web", "/w/web")],
            10,
        );
        reg.add_command(render(), "yarn", &[]);
        reg
    }

    fn plain(text: &str) -> String {
        strip_ansi(text)
    }

    #[test]
    fn strips_colour_and_cursor_sequences() {
        assert_eq!(strip_ansi("\x1b[31mred\x1b[0m plain"), "red plain");
        assert_eq!(strip_ansi("\x1b[2K\x1b[1Gdone"), "done");
        assert_eq!(strip_ansi("\x1b]0;title\x07text"), "text");
        assert_eq!(strip_ansi("no escapes"), "no escapes");
    }

    #[test]
    fn formats_elapsed_at_three_scales() {
        assert_eq!(format_elapsed(Duration::from_millis(850)), "850ms");
        assert_eq!(format_elapsed(Duration::from_millis(12_340)), "12.3s");
        assert_eq!(format_elapsed(Duration::from_secs(245)), "4m05s");
    }

    #[test]
    fn running_view_lists_projects_units_and_timer() {
        let reg = registry();
        let text = plain(&render_run(
            &reg,
            &ViewState::default(),
            false,
            Duration::from_millis(500),
            0,
            10,
        ));

        assert!(text.contains("api"));
        assert!(text.contains("web"));
        assert!(text.contains("yarn pending"));
        assert!(text.contains("Elapsed: 500ms"));
        assert!(text.contains("q quit"));
        assert!(!text.contains("Finished in"));
    }

    #[test]
    fn final_view_marks_projects_and_hides_help() {
        let mut reg = registry();
        reg.unit_mut(UnitId::new(0, 0)).unwrap().advance(Status::Finished, None);
        reg.unit_mut(UnitId::new(1, 0))
            .unwrap()
            .advance(Status::Failed, Some("exit code 1".into()));

        let text = plain(&render_run(
            &reg,
            &ViewState::default(),
            true,
            Duration::from_secs(2),
            0,
            0,
        ));

        assert!(text.contains("✓ api"));
        assert!(text.contains("x web"));
        // Finished projects collapse; failed ones keep their unit line.
        assert!(!text.contains("yarn finished"));
        assert!(text.contains("yarn failed"));
        assert!(text.contains("Finished in 2.0s"));
        assert!(!text.contains("q quit"));
    }

    #[test]
    fn final_view_keeps_stopped_units() {
        let mut reg = registry();
        reg.unit_mut(UnitId::new(0, 0)).unwrap().advance(Status::Finished, None);
        reg.unit_mut(UnitId::new(1, 0)).unwrap().advance(Status::Exited, None);

        let state = ViewState {
            show_scripts: false,
            ..ViewState::default()
        };
        let text = plain(&render_run(&reg, &state, true, Duration::from_secs(1), 0, 0));

        assert!(text.contains("- web"));
        assert!(text.contains("yarn exited"));
        assert!(!text.contains("yarn finished"));
    }

    #[test]
    fn stdout_view_shows_tail_of_output_without_escapes() {
        let mut reg = registry();
        let unit = reg.unit_mut(UnitId::new(0, 0)).unwrap();
        for i in 0..5 {
            unit.push_output(format!("\x1b[32mline {i}\x1b[0m"));
        }

        let state = ViewState {
            show_stdout: true,
            ..ViewState::default()
        };
        let text = render_run(&reg, &state, false, Duration::ZERO, 0, 2);

        assert!(text.contains("     line 3"));
        assert!(text.contains("     line 4"));
        assert!(!text.contains("line 2"));
    }
}
