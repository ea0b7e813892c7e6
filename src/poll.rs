// src/poll.rs
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use serde::Serialize;

use crate::chart::{self, Slice};
use crate::error::FieldErrors;
use crate::models::{NewPoll, Poll, PollPayload, PollWithChoices};

pub const UID_LENGTH: usize = 10;

/// Number of polls shown on the home page.
pub const POPULAR_LIMIT: i64 = 10;

pub const PALETTE: [&str; 8] = [
    "#f75f5f", "#4fef44", "#44efe5", "#c844ef", "#ef4488", "#e8f562", "#f5b762", "#6286f5",
];

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";
const TOO_FEW_CHOICES: &str = "At least two choices are required.";

pub fn generate_uid() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(UID_LENGTH)
        .map(char::from)
        .collect()
}

pub fn color_for_rank(rank: usize) -> &'static str {
    PALETTE[rank % PALETTE.len()]
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Validates the home page form: `text` plus `choice_1..choice_N`, ordered by N.
/// Fields sharing an index (`choice_1`, `choice_01`) keep the order they were posted in.
/// Blank choice fields are skipped; at least two must remain.
pub fn validate_form(fields: &[(String, String)]) -> Result<NewPoll, FieldErrors> {
    let mut errors = FieldErrors::default();

    let text = non_blank(
        fields
            .iter()
            .find(|(key, _)| key == "text")
            .map(|(_, value)| value.as_str()),
    );
    if text.is_none() {
        errors.add("text", REQUIRED);
    }

    let mut numbered: Vec<(u32, &str)> = fields
        .iter()
        .filter_map(|(key, value)| {
            let n = key.strip_prefix("choice_")?.parse().ok()?;
            Some((n, value.as_str()))
        })
        .collect();
    numbered.sort_by_key(|(n, _)| *n);

    let choices: Vec<String> = numbered
        .into_iter()
        .filter_map(|(_, value)| non_blank(Some(value)))
        .collect();
    if choices.len() < 2 {
        errors.add("choices", TOO_FEW_CHOICES);
    }

    match text {
        Some(text) if errors.is_empty() => Ok(NewPoll { text, choices }),
        _ => Err(errors),
    }
}

/// Validates a JSON API payload. Every submitted choice must carry non-blank text.
pub fn validate_payload(payload: PollPayload) -> Result<NewPoll, FieldErrors> {
    let mut errors = FieldErrors::default();

    let text = match payload.text.as_deref() {
        None => {
            errors.add("text", REQUIRED);
            None
        }
        Some(raw) => {
            let text = non_blank(Some(raw));
            if text.is_none() {
                errors.add("text", BLANK);
            }
            text
        }
    };

    let mut choices = Vec::new();
    match payload.choices {
        None => errors.add("choices", REQUIRED),
        Some(submitted) => {
            for (index, choice) in submitted.iter().enumerate() {
                match non_blank(choice.text.as_deref()) {
                    Some(text) => choices.push(text),
                    None => errors.add(format!("choices[{index}].text"), BLANK),
                }
            }
            if submitted.len() < 2 {
                errors.add("choices", TOO_FEW_CHOICES);
            }
        }
    }

    match text {
        Some(text) if errors.is_empty() => Ok(NewPoll { text, choices }),
        _ => Err(errors),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedChoice {
    pub id: i64,
    pub text: String,
    pub votes: i64,
    pub color: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct PollResults {
    pub poll: Poll,
    pub total_votes: i64,
    pub choices: Vec<RankedChoice>,
    pub chart: String,
}

/// Ranks choices by votes descending, keeping creation order among ties, and colors them by rank.
pub fn rank_choices(poll: &PollWithChoices) -> Vec<RankedChoice> {
    let mut choices = poll.choices.clone();
    choices.sort_by(|a, b| b.votes.cmp(&a.votes));

    choices
        .into_iter()
        .enumerate()
        .map(|(rank, choice)| RankedChoice {
            id: choice.id,
            text: choice.text,
            votes: choice.votes,
            color: color_for_rank(rank),
        })
        .collect()
}

pub fn tally(poll: PollWithChoices) -> PollResults {
    let total_votes: i64 = poll.choices.iter().map(|choice| choice.votes).sum();
    let choices = rank_choices(&poll);

    let chart = {
        let slices: Vec<Slice<'_>> = choices
            .iter()
            .map(|choice| Slice {
                label: &choice.text,
                value: choice.votes,
                color: choice.color,
            })
            .collect();
        chart::pie_data_uri(&slices)
    };

    PollResults {
        poll: poll.poll,
        total_votes,
        choices,
        chart,
    }
}
