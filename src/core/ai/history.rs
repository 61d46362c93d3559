// =============================================================================
// CHAT HISTORY WINDOW
// =============================================================================
//
// Conversational flows receive the previous conversation as text, one
// `role: content` entry per message. A message spanning several lines carries
// its continuation lines indented. Long conversations would blow the prompt
// size, so before rendering we keep only what fits a token budget:
// 1. The most recent messages are always kept
// 2. Older messages are added newest-first while they fit
// 3. The result is returned in chronological order
//
// Trimming always works on whole messages.

/// Estimates the number of tokens in a text string.
///
/// Uses a simple heuristic: ~4 characters per token on average.
pub fn estimate_tokens(text: &str) -> usize {
    // Round up to be conservative
    (text.len() + 3) / 4
}

/// Configuration for history trimming.
#[derive(Debug, Clone)]
pub struct HistoryWindow {
    /// Maximum token budget for the history block
    pub max_tokens: usize,
    /// Number of most recent messages kept regardless of budget
    pub always_keep_recent: usize,
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self {
            max_tokens: 2000,
            always_keep_recent: 2,
        }
    }
}

impl HistoryWindow {
    pub fn new(max_tokens: usize) -> Self {
        Self {
            max_tokens,
            ..Default::default()
        }
    }

    /// Trims `history` to the budget. Blank lines are dropped.
    pub fn select(&self, history: &str) -> String {
        let messages = split_messages(history);

        if messages.is_empty() {
            return String::new();
        }

        let split_point = messages.len().saturating_sub(self.always_keep_recent);
        let (older, must_keep) = messages.split_at(split_point);

        let mut used_tokens: usize = must_keep.iter().map(|m| estimate_tokens(m)).sum();

        // Walk older messages newest-first; stop at the first one that no longer
        // fits so the kept history stays contiguous.
        let mut first_kept = older.len();
        for (idx, message) in older.iter().enumerate().rev() {
            let message_tokens = estimate_tokens(message);
            if used_tokens + message_tokens > self.max_tokens {
                break;
            }
            used_tokens += message_tokens;
            first_kept = idx;
        }

        let kept_older = older.len() - first_kept;
        if kept_older < older.len() {
            tracing::debug!(
                dropped = first_kept,
                kept = kept_older + must_keep.len(),
                "Trimmed chat history to token budget"
            );
        }

        older[first_kept..]
            .iter()
            .chain(must_keep.iter())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Groups history text into messages. A line starting with whitespace
/// continues the message above it.
fn split_messages(history: &str) -> Vec<String> {
    let mut messages: Vec<String> = Vec::new();

    for line in history.lines().map(str::trim_end) {
        if line.trim().is_empty() {
            continue;
        }
        let continues = line.starts_with(char::is_whitespace);
        match messages.last_mut() {
            Some(current) if continues => {
                current.push('\n');
                current.push_str(line);
            }
            _ => messages.push(line.to_string()),
        }
    }

    messages
}

/// Formats one message as a history entry. Continuation lines are indented so
/// the entry stays whole when the history is trimmed.
pub fn history_entry(message: &str) -> String {
    let mut lines = message.trim_start().lines();
    let mut entry = lines.next().unwrap_or_default().to_string();
    for line in lines {
        entry.push_str("\n  ");
        entry.push_str(line);
    }
    entry
}

// =============================================================================
// TESTS
// =============================================================================
