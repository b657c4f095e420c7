//! Turning a [`Screen`] into something a human reads: a terminal report or an HTML dashboard.
use std::fmt::{self, Write};

use chrono::{DateTime, Utc};

use crate::theme::Theme;
use crate::view::{
    format_time, ActiveTrain, CompletedTrain, CurrentTrainView, RecordView, Screen, Section,
};

const NO_RECENT_TRAIN: &str = "No recent Hype Train";
const API_LIMITATION: &str = "The Twitch API only returns ongoing or very recent Hype Trains. \
                              The full history is not available through this API.";
const NO_CURRENT_TRAIN: &str = "No Hype Train in progress";
const LOGIN_HINT: &str = "Not logged in. Run `hype-train login` to connect your Twitch account.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordKind {
    Personal,
    Shared,
}

/// Headline and date line of a record.
fn record_lines(kind: RecordKind, record: &RecordView) -> (String, String) {
    match (record, kind) {
        (RecordView::Unavailable, RecordKind::Personal) => {
            ("No data available".to_string(), String::new())
        }
        (RecordView::Unavailable, RecordKind::Shared) => (
            "No data available".to_string(),
            "The API only provides data for active or recent Hype Trains".to_string(),
        ),
        (RecordView::Missing, RecordKind::Personal) => {
            ("No personal record".to_string(), String::new())
        }
        (RecordView::Missing, RecordKind::Shared) => ("No shared record".to_string(), String::new()),
        (
            RecordView::Achieved {
                level,
                total,
                achieved_at,
            },
            _,
        ) => (
            format!("Level {} - {} points", level, total),
            match achieved_at {
                Some(at) => format!("Reached on: {}", format_date(*at)),
                None => "Date unknown".to_string(),
            },
        ),
    }
}

pub fn format_date(at: DateTime<Utc>) -> String {
    at.format("%d/%m/%Y %H:%M:%S UTC").to_string()
}

/// Plain text rendering of the visible sections.
pub struct TextReport<'a>(pub &'a Screen);

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let screen = self.0;
        for section in screen.visible_sections() {
            match section {
                Section::Login => writeln!(f, "{}", LOGIN_HINT)?,
                Section::Loading => writeln!(f, "Loading...")?,
                Section::Error => {
                    writeln!(f, "{}", screen.error().unwrap_or("Unknown error"))?;
                }
                Section::User => {
                    if let Some(user) = screen.user() {
                        writeln!(f, "Logged in as {} ({})", user.display_name, user.login)?;
                    }
                }
                Section::CurrentTrain => {
                    writeln!(f, "\n-- Current Hype Train --")?;
                    match screen.current_train() {
                        Some(CurrentTrainView::NoRecentTrain) => {
                            writeln!(f, "{}", NO_RECENT_TRAIN)?;
                            writeln!(f, "{}", API_LIMITATION)?;
                        }
                        Some(CurrentTrainView::NoCurrentTrain) | None => {
                            writeln!(f, "{}", NO_CURRENT_TRAIN)?
                        }
                        Some(CurrentTrainView::Active(active)) => write_active_text(f, active)?,
                        Some(CurrentTrainView::Completed(done)) => write_completed_text(f, done)?,
                    }
                }
                Section::Records => {
                    writeln!(f, "\n-- Records --")?;
                    if let Some(records) = screen.records() {
                        for (label, kind, record) in [
                            ("All-time high", RecordKind::Personal, &records.all_time_high),
                            (
                                "Shared all-time high",
                                RecordKind::Shared,
                                &records.shared_all_time_high,
                            ),
                        ]
                        .iter()
                        {
                            let (headline, date) = record_lines(*kind, record);
                            writeln!(f, "{}: {}", label, headline)?;
                            if !date.is_empty() {
                                writeln!(f, "  {}", date)?;
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn write_active_text(f: &mut fmt::Formatter<'_>, active: &ActiveTrain) -> fmt::Result {
    writeln!(
        f,
        "[IN PROGRESS] {} remaining",
        format_time(active.seconds_remaining)
    )?;
    writeln!(
        f,
        "Level: {}  Progress: {}/{}  Total: {} points",
        active.level, active.progress, active.goal, active.total
    )?;
    const WIDTH: usize = 20;
    let filled = ((active.percentage / 100.0) * WIDTH as f64).round() as usize;
    writeln!(
        f,
        "[{}{}] {:.1}% complete",
        "#".repeat(filled),
        "-".repeat(WIDTH - filled.min(WIDTH)),
        active.percentage
    )?;
    if !active.contributors.is_empty() {
        writeln!(f, "Top contributors:")?;
        for c in &active.contributors {
            writeln!(f, "  - {}: {} {}", c.user_name, c.total, c.unit())?;
        }
    }
    Ok(())
}

fn write_completed_text(f: &mut fmt::Formatter<'_>, done: &CompletedTrain) -> fmt::Result {
    match done.started_at {
        Some(at) => writeln!(f, "[FINISHED] {}", format_date(at))?,
        None => writeln!(f, "[FINISHED]")?,
    }
    writeln!(f, "Level reached: {}  Total points: {}", done.level, done.total)
}

/// Escape text for use in HTML element content and attribute values.
pub fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Standalone HTML dashboard, the same sections as the text report.
pub struct HtmlPage<'a> {
    pub screen: &'a Screen,
    pub theme: Theme,
}

impl HtmlPage<'_> {
    fn class(&self, section: Section) -> &'static str {
        if self.screen.is_visible(section) {
            "section"
        } else {
            "section hidden"
        }
    }

    fn current_train_html(&self) -> Result<String, fmt::Error> {
        let mut out = String::new();
        match self.screen.current_train() {
            Some(CurrentTrainView::NoRecentTrain) => write!(
                out,
                r#"<div class="info-box"><p class="text-muted">ℹ️ {}</p><p class="text-small">{}</p></div>"#,
                NO_RECENT_TRAIN, API_LIMITATION
            )?,
            Some(CurrentTrainView::NoCurrentTrain) | None => {
                write!(out, r#"<p class="text-muted">{}</p>"#, NO_CURRENT_TRAIN)?
            }
            Some(CurrentTrainView::Active(active)) => {
                let mut contributors = String::new();
                if !active.contributors.is_empty() {
                    contributors.push_str(r#"<div class="contributors"><h4>🌟 Top contributors</h4><ul>"#);
                    for c in &active.contributors {
                        write!(
                            contributors,
                            "<li><strong>{}</strong>: {} {}</li>",
                            escape_html(&c.user_name),
                            c.total,
                            c.unit()
                        )?;
                    }
                    contributors.push_str("</ul></div>");
                }
                write!(
                    out,
                    r#"<div class="current-train active">
<div class="train-header"><span class="badge badge-success">IN PROGRESS</span><span class="train-time">⏱️ {remaining} remaining</span></div>
<div class="train-stats">
<div class="stat"><span class="stat-label">Level</span><span class="stat-value">{level}</span></div>
<div class="stat"><span class="stat-label">Progress</span><span class="stat-value">{progress}/{goal}</span></div>
<div class="stat"><span class="stat-label">Total</span><span class="stat-value">{total} points</span></div>
</div>
<div class="progress-bar"><div class="progress-fill" style="width: {percentage}%"></div></div>
<p class="progress-text">{percentage:.1}% complete</p>
{contributors}
</div>"#,
                    remaining = format_time(active.seconds_remaining),
                    level = active.level,
                    progress = active.progress,
                    goal = active.goal,
                    total = active.total,
                    percentage = active.percentage,
                    contributors = contributors,
                )?
            }
            Some(CurrentTrainView::Completed(done)) => write!(
                out,
                r#"<div class="current-train completed">
<div class="train-header"><span class="badge badge-secondary">FINISHED</span><span class="train-time">{started}</span></div>
<div class="train-stats">
<div class="stat"><span class="stat-label">Level reached</span><span class="stat-value">{level}</span></div>
<div class="stat"><span class="stat-label">Total points</span><span class="stat-value">{total}</span></div>
</div>
</div>"#,
                started = done.started_at.map(format_date).unwrap_or_default(),
                level = done.level,
                total = done.total,
            )?,
        }
        Ok(out)
    }
}

impl fmt::Display for HtmlPage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let screen = self.screen;
        let (avatar, name, login) = screen
            .user()
            .map(|u| {
                (
                    escape_html(&u.avatar_url),
                    escape_html(&u.display_name),
                    escape_html(&u.login),
                )
            })
            .unwrap_or_default();
        let records = screen.records();
        let record = |kind: RecordKind| {
            let view = match (records, kind) {
                (Some(r), RecordKind::Personal) => &r.all_time_high,
                (Some(r), RecordKind::Shared) => &r.shared_all_time_high,
                (None, _) => &RecordView::Missing,
            };
            let (headline, date) = record_lines(kind, view);
            (escape_html(&headline), escape_html(&date))
        };
        let (ath, ath_date) = record(RecordKind::Personal);
        let (shared, shared_date) = record(RecordKind::Shared);

        write!(
            f,
            r#"<!DOCTYPE html>
<html lang="en" data-theme="{theme}">
<head>
<meta charset="utf-8">
<title>Hype Train</title>
<style>{style}</style>
</head>
<body>
<header><h1>🚂 Hype Train</h1><span class="theme-icon">{icon}</span></header>
<main>
<section id="login-section" class="{login_class}"><p>{login_hint}</p></section>
<section id="loading-section" class="{loading_class}"><p>Loading...</p></section>
<section id="error-section" class="{error_class}"><p id="error-message">{error}</p></section>
<section id="user-section" class="{user_class}">
<img id="user-avatar" src="{avatar}" alt="">
<div><p id="user-name">{name}</p><p id="user-login">{login}</p></div>
</section>
<section id="current-train-section" class="{train_class}">
<h2>Current Hype Train</h2>
<div id="current-train-content">{train}</div>
</section>
<section id="records-section" class="{records_class}">
<h2>Records</h2>
<div class="record"><h3>All-time high</h3><p id="all-time-high">{ath}</p><p id="all-time-high-date">{ath_date}</p></div>
<div class="record"><h3>Shared all-time high</h3><p id="shared-all-time-high">{shared}</p><p id="shared-all-time-high-date">{shared_date}</p></div>
</section>
</main>
</body>
</html>
"#,
            theme = self.theme,
            style = STYLE,
            icon = self.theme.icon(),
            login_class = self.class(Section::Login),
            login_hint = escape_html(LOGIN_HINT),
            loading_class = self.class(Section::Loading),
            error_class = self.class(Section::Error),
            error = escape_html(screen.error().unwrap_or_default()),
            user_class = self.class(Section::User),
            avatar = avatar,
            name = name,
            login = login,
            train_class = self.class(Section::CurrentTrain),
            train = self.current_train_html()?,
            records_class = self.class(Section::Records),
            ath = ath,
            ath_date = ath_date,
            shared = shared,
            shared_date = shared_date,
        )
    }
}

const STYLE: &str = r#"
:root[data-theme="dark"] { --bg: #0e0e10; --fg: #efeff1; --card: #18181b; --accent: #9147ff; }
:root[data-theme="light"] { --bg: #f7f7f8; --fg: #0e0e10; --card: #ffffff; --accent: #772ce8; }
body { background: var(--bg); color: var(--fg); font-family: sans-serif; max-width: 48rem; margin: auto; }
.section { background: var(--card); border-radius: 8px; padding: 1rem; margin: 1rem 0; }
.hidden { display: none; }
.badge { border-radius: 4px; padding: 0 .5rem; margin-right: 1rem; }
.badge-success { background: #00c853; } .badge-secondary { background: #777; }
.train-stats { display: flex; gap: 2rem; }
.stat { display: flex; flex-direction: column; }
.progress-bar { background: #444; border-radius: 4px; height: .75rem; }
.progress-fill { background: var(--accent); border-radius: 4px; height: 100%; }
.text-muted { opacity: .7; } .text-small { font-size: .85rem; }
#user-avatar { width: 64px; border-radius: 50%; }
"#;
