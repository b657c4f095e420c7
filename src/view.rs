//! What the dashboard shows, independent of how it is rendered.
use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::model::{ContributionKind, HypeTrain, HypeTrainRecord, HypeTrainStatus, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    Login,
    User,
    CurrentTrain,
    Records,
    Error,
    Loading,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserCard {
    pub avatar_url: String,
    pub display_name: String,
    /// `@login`
    pub login: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContributorLine {
    pub user_name: String,
    pub total: u64,
    pub kind: ContributionKind,
}

impl ContributorLine {
    /// Unit shown after the total, twitch only distinguishes bits from the rest.
    pub fn unit(&self) -> &'static str {
        match self.kind {
            ContributionKind::Bits => "bits",
            _ => "subs",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveTrain {
    pub level: u32,
    pub progress: u64,
    pub goal: u64,
    pub total: u64,
    pub seconds_remaining: i64,
    pub percentage: f64,
    pub contributors: Vec<ContributorLine>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletedTrain {
    pub level: u32,
    pub total: u64,
    pub started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CurrentTrainView {
    /// Twitch returned nothing at all for the channel.
    NoRecentTrain,
    /// Twitch returned records but no train.
    NoCurrentTrain,
    Active(ActiveTrain),
    Completed(CompletedTrain),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordView {
    /// Twitch returned nothing at all for the channel.
    Unavailable,
    /// The channel never reached a record of this kind.
    Missing,
    Achieved {
        level: u32,
        total: u64,
        achieved_at: Option<DateTime<Utc>>,
    },
}

impl RecordView {
    fn from_record(record: Option<&HypeTrainRecord>) -> RecordView {
        match record {
            Some(record) => RecordView::Achieved {
                level: record.level,
                total: record.total,
                achieved_at: record.achieved_at,
            },
            None => RecordView::Missing,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordsView {
    pub all_time_high: RecordView,
    pub shared_all_time_high: RecordView,
}

/// Visible sections and their content.
#[derive(Debug, Clone, Default)]
pub struct Screen {
    visible: BTreeSet<Section>,
    user: Option<UserCard>,
    current_train: Option<CurrentTrainView>,
    records: Option<RecordsView>,
    error: Option<String>,
}

impl Screen {
    pub fn new() -> Screen {
        Default::default()
    }

    pub fn is_visible(&self, section: Section) -> bool {
        self.visible.contains(&section)
    }

    pub fn visible_sections(&self) -> impl Iterator<Item = Section> + '_ {
        self.visible.iter().copied()
    }

    pub fn user(&self) -> Option<&UserCard> {
        self.user.as_ref()
    }

    pub fn current_train(&self) -> Option<&CurrentTrainView> {
        self.current_train.as_ref()
    }

    pub fn records(&self) -> Option<&RecordsView> {
        self.records.as_ref()
    }

    /// Message of the error section while it is visible.
    pub fn error(&self) -> Option<&str> {
        self.error
            .as_deref()
            .filter(|_| self.is_visible(Section::Error))
    }

    pub fn show_login_section(&mut self) {
        self.hide_all();
        self.visible.insert(Section::Login);
    }

    pub fn show_authenticated_sections(&mut self) {
        self.hide_all();
        self.visible.insert(Section::User);
        self.visible.insert(Section::CurrentTrain);
        self.visible.insert(Section::Records);
    }

    pub fn show_loading(&mut self) {
        self.visible.insert(Section::Loading);
    }

    pub fn hide_loading(&mut self) {
        self.visible.remove(&Section::Loading);
    }

    /// Shows the error section on top of whatever is visible.
    pub fn show_error(&mut self, message: impl Into<String>) {
        self.visible.insert(Section::Error);
        self.error = Some(message.into());
    }

    /// Hides sections, content is kept.
    pub fn hide_all(&mut self) {
        self.visible.clear();
    }

    pub fn display_user_info(&mut self, user: &User) {
        self.user = Some(UserCard {
            avatar_url: user.profile_image_url.clone(),
            display_name: user.display_name.clone(),
            login: format!("@{}", user.login),
        });
    }

    /// Fill the train and records sections from a status answer.
    ///
    /// Only the first element is used, twitch returns one per broadcaster.
    pub fn display_hype_train_data(&mut self, statuses: &[HypeTrainStatus], now: DateTime<Utc>) {
        let status = match statuses.first() {
            Some(status) => status,
            None => {
                self.current_train = Some(CurrentTrainView::NoRecentTrain);
                self.records = Some(RecordsView {
                    all_time_high: RecordView::Unavailable,
                    shared_all_time_high: RecordView::Unavailable,
                });
                return;
            }
        };

        self.current_train = Some(match &status.current {
            Some(train) if train.is_active(now) => CurrentTrainView::Active(active_train(train, now)),
            Some(train) => CurrentTrainView::Completed(CompletedTrain {
                level: train.level,
                total: train.total,
                started_at: train.started_at,
            }),
            None => CurrentTrainView::NoCurrentTrain,
        });
        self.records = Some(RecordsView {
            all_time_high: RecordView::from_record(status.all_time_high.as_ref()),
            shared_all_time_high: RecordView::from_record(status.shared_all_time_high.as_ref()),
        });
    }
}

fn active_train(train: &HypeTrain, now: DateTime<Utc>) -> ActiveTrain {
    ActiveTrain {
        level: train.level,
        progress: train.progress,
        goal: train.goal,
        total: train.total,
        seconds_remaining: train
            .expires_at
            .map_or(0, |expires_at| time_remaining(expires_at, now)),
        percentage: progress_percentage(train.progress, train.goal),
        contributors: train
            .top_contributions
            .iter()
            .map(|c| ContributorLine {
                user_name: c.user_name.clone(),
                total: c.total,
                kind: c.kind,
            })
            .collect(),
    }
}

/// Whole seconds left until `expires_at`, rounded down. Negative once expired.
pub fn time_remaining(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (expires_at - now).num_milliseconds();
    millis.div_euclid(1000)
}

/// `"{minutes}m {seconds}s"`, negative durations show as zero.
pub fn format_time(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{}m {}s", seconds / 60, seconds % 60)
}

/// Share of the level goal reached, capped at 100.
///
/// A goal of zero counts as reached as soon as there is any progress.
pub fn progress_percentage(progress: u64, goal: u64) -> f64 {
    if goal == 0 {
        return if progress > 0 { 100.0 } else { 0.0 };
    }
    (progress as f64 / goal as f64 * 100.0).min(100.0)
}
