//! Turn parser: classifies one raw model response.
//!
//! The scanner looks for three keywords. `Thought:` and `Answer:` match
//! case-insensitively; `Action:` is case-sensitive and must be followed by an
//! identifier and an opening parenthesis. The action payload is greedy: it
//! runs to the last `)` in the response (or to the end when there is none),
//! so an `Answer:` written after an action never terminates the task.

const THOUGHT: &str = "thought:";
const ANSWER: &str = "answer:";
const ACTION: &str = "Action:";

/// A tool invocation requested by the model. `raw_args` is unvalidated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionCall {
    pub name: String,
    pub raw_args: String,
}

/// What the loop should do with a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnKind {
    /// Final answer; ends the task.
    Answer(String),
    /// Tool call.
    Action(ActionCall),
    /// Both were present. The action is taken and the answer dropped.
    AnswerWithAction { answer: String, action: ActionCall },
    /// Neither keyword was usable.
    Malformed,
}

/// A parsed response plus its optional thought, which is display-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub thought: Option<String>,
    pub kind: TurnKind,
}

impl Turn {
    /// The action to dispatch, if any. Takes precedence over an answer.
    pub fn action(&self) -> Option<&ActionCall> {
        match &self.kind {
            TurnKind::Action(call) | TurnKind::AnswerWithAction { action: call, .. } => Some(call),
            _ => None,
        }
    }
}

/// Parses a raw model response into a [`Turn`].
pub fn parse(response: &str) -> Turn {
    // ASCII lowering keeps byte offsets identical to `response`.
    let lowered = response.to_ascii_lowercase();

    let thought = lowered
        .find(THOUGHT)
        .and_then(|at| thought_text(&response[at + THOUGHT.len()..]));
    let answer = lowered
        .find(ANSWER)
        .map(|at| response[at + ANSWER.len()..].trim().to_string());
    let action = find_action(response);

    let kind = match (action, answer) {
        (Some(action), Some(answer)) => TurnKind::AnswerWithAction { answer, action },
        (Some(action), None) => TurnKind::Action(action),
        (None, Some(answer)) => TurnKind::Answer(answer),
        (None, None) => TurnKind::Malformed,
    };

    Turn { thought, kind }
}

/// Thought text runs until the next `Action:` or `Answer:`. The answer
/// keyword is matched case-insensitively here too, so a thought never
/// swallows the answer the turn resolves to.
fn thought_text(rest: &str) -> Option<String> {
    let lowered = rest.to_ascii_lowercase();
    let end = [rest.find(ACTION), lowered.find(ANSWER)]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(rest.len());
    let text = rest[..end].trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Finds the first `Action:` that is followed by `name(`.
fn find_action(response: &str) -> Option<ActionCall> {
    response
        .match_indices(ACTION)
        .find_map(|(at, _)| action_at(&response[at + ACTION.len()..]))
}

fn action_at(rest: &str) -> Option<ActionCall> {
    let rest = rest.trim_start();
    let name_len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    if name_len == 0 {
        return None;
    }
    let (name, after_name) = rest.split_at(name_len);
    let payload = after_name.trim_start().strip_prefix('(')?;
    let payload = match payload.rfind(')') {
        Some(close) => &payload[..close],
        None => payload,
    };

    Some(ActionCall {
        name: name.to_string(),
        raw_args: payload.trim().to_string(),
    })
}
