//! Deterministic text pools for names, topics, messages and files.
//!
//! All output comes from fixed pools driven by the caller's RNG, so the
//! same stream state always yields the same strings.

use rand::seq::SliceRandom;
use rand::Rng;

const FIRST_NAMES: &[&str] = &[
    "Alex", "Bailey", "Casey", "Dana", "Elliot", "Frankie", "Gray", "Harper", "Indra", "Jordan",
    "Kai", "Lee", "Morgan", "Noor", "Oakley", "Parker", "Quinn", "Riley", "Sam", "Tatum", "Uma",
    "Val", "Wren", "Xiomara", "Yuri", "Zion",
];

const LAST_NAMES: &[&str] = &[
    "Adler", "Barros", "Chen", "Diaz", "Ekwueme", "Fischer", "Garcia", "Hassan", "Ivanov",
    "Jensen", "Kowalski", "Lindqvist", "Moreau", "Nakamura", "Okafor", "Petrov", "Quispe",
    "Rossi", "Sato", "Tanaka", "Umeh", "Vargas", "Weber", "Xu", "Yamada", "Zhang",
];

const TITLES: &[&str] = &[
    "Software Engineer",
    "Senior Software Engineer",
    "Staff Engineer",
    "Engineering Manager",
    "Product Manager",
    "Designer",
    "Data Scientist",
    "Site Reliability Engineer",
    "QA Engineer",
    "Technical Writer",
    "Support Engineer",
    "Sales Engineer",
    "Recruiter",
    "Account Executive",
];

const CHANNEL_PREFIXES: &[&str] = &[
    "team", "proj", "help", "announce", "random", "eng", "design", "ops", "sales", "support",
    "social", "guild",
];

const CHANNEL_SUBJECTS: &[&str] = &[
    "alpha", "beta", "gamma", "delta", "platform", "mobile", "web", "infra", "data", "growth",
    "billing", "search", "onboarding", "releases", "incidents", "coffee", "music", "books",
    "gaming", "running",
];

const TOPICS: &[&str] = &[
    "Coordination and planning",
    "Questions welcome",
    "Daily standup notes",
    "Release coordination",
    "Incident follow-ups",
    "Design critiques",
    "Weekly metrics review",
    "Watercooler chat",
    "On-call handoffs",
    "Customer feedback triage",
];

const MESSAGE_WORDS: &[&str] = &[
    "the", "a", "we", "should", "can", "will", "deploy", "review", "merge", "ticket", "branch",
    "build", "test", "release", "meeting", "tomorrow", "today", "update", "status", "blocked",
    "fixed", "broken", "ready", "done", "pending", "question", "idea", "draft", "doc", "spec",
    "metrics", "dashboard", "alert", "customer", "feedback", "rollout", "flag", "config", "queue",
    "latency", "error", "retry", "cache", "database", "migration", "schema", "api", "endpoint",
    "thanks", "please", "looking", "shipped",
];

const FILE_STEMS: &[&str] = &[
    "report", "notes", "summary", "roadmap", "diagram", "screenshot", "invoice", "deck",
    "minutes", "draft", "checklist", "export", "benchmark", "postmortem",
];

const FILE_TYPES: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("txt", "text/plain"),
    ("csv", "text/csv"),
    ("md", "text/markdown"),
    ("zip", "application/zip"),
    ("xlsx", "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
];

/// Pick a display name as (first, last).
pub fn person_name<R: Rng>(rng: &mut R) -> (&'static str, &'static str) {
    let first = FIRST_NAMES.choose(rng).copied().unwrap_or("Alex");
    let last = LAST_NAMES.choose(rng).copied().unwrap_or("Chen");
    (first, last)
}

/// Unique address for the user at `index`, derived from the name.
pub fn email(first: &str, last: &str, index: u64) -> String {
    format!(
        "{}.{}.{index}@example.com",
        first.to_ascii_lowercase(),
        last.to_ascii_lowercase()
    )
}

pub fn job_title<R: Rng>(rng: &mut R) -> &'static str {
    TITLES.choose(rng).copied().unwrap_or("Software Engineer")
}

/// Base name for a named channel; not guaranteed unique on its own.
pub fn channel_name<R: Rng>(rng: &mut R) -> String {
    let prefix = CHANNEL_PREFIXES.choose(rng).copied().unwrap_or("team");
    let subject = CHANNEL_SUBJECTS.choose(rng).copied().unwrap_or("alpha");
    format!("{prefix}-{subject}")
}

pub fn channel_topic<R: Rng>(rng: &mut R) -> &'static str {
    TOPICS.choose(rng).copied().unwrap_or("Coordination and planning")
}

/// Short message body of 4 to 14 pool words, sentence-cased.
pub fn sentence<R: Rng>(rng: &mut R) -> String {
    let words = rng.gen_range(4..=14);
    let mut out = String::new();
    for i in 0..words {
        let word = MESSAGE_WORDS.choose(rng).copied().unwrap_or("update");
        if i == 0 {
            let mut chars = word.chars();
            if let Some(head) = chars.next() {
                out.push(head.to_ascii_uppercase());
                out.push_str(chars.as_str());
            }
        } else {
            out.push(' ');
            out.push_str(word);
        }
    }
    out.push('.');
    out
}

/// File name with extension plus the matching mimetype.
pub fn file_name<R: Rng>(rng: &mut R) -> (String, &'static str) {
    let stem = FILE_STEMS.choose(rng).copied().unwrap_or("notes");
    let suffix = rng.gen_range(1..=9999);
    let (ext, mimetype) = FILE_TYPES
        .choose(rng)
        .copied()
        .unwrap_or(("txt", "text/plain"));
    (format!("{stem}-{suffix}.{ext}"), mimetype)
}
