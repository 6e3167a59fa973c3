//! JsonStateMachine (C5): a character-by-character pushdown automaton
//! tracking JSON phase, nesting, and the current-key buffer (spec §4.3).
//!
//! Internally this keeps one stack of open containers rather than the
//! "context stack of saved parent phases, implicit outermost container"
//! description in spec §3/§4.3 literally — both a value's completion (string,
//! number, literal, or a nested container's close) and an open container's
//! close need to know the *type* of the container they are returning control
//! to, and a single `Vec<ContainerKind>` gives that directly by peeking (for
//! value completion) or popping (for container close). `depth` is always
//! `containers.len()`, and every documented invariant in spec §4.3 holds
//! under this representation — it is a simplification, not a behavior
//! change, and is recorded as such in DESIGN.md.

/// The kind of container a value is nested directly inside, used to decide
/// which phase a just-completed value returns control to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Object,
    Array,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectPhase {
    ExpectKeyOrEnd,
    ExpectKeyFirstQuote,
    ExpectColon,
    ExpectValue,
    ExpectCommaOrEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayPhase {
    ExpectValue,
    ExpectCommaOrEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringKind {
    Key,
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberPhase {
    Integer,
    Decimal,
    Exponent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    True,
    False,
    Null,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonPhase {
    Root,
    InObject(ObjectPhase),
    InArray(ArrayPhase),
    InString { kind: StringKind, escaped: bool },
    InNumber(NumberPhase),
    /// `partial` is the literal matched so far, e.g. `"t"`, `"tr"`, `"tru"`.
    InLiteral { kind: LiteralKind, partial: String },
    Done,
    Error,
}

/// The JSON character-level pushdown automaton (spec §4.3, §3).
#[derive(Debug, Clone)]
pub struct JsonStateMachine {
    phase: JsonPhase,
    depth: u32,
    containers: Vec<ContainerKind>,
    current_key: String,
}

const LITERALS: &[(&str, LiteralKind)] = &[
    ("true", LiteralKind::True),
    ("false", LiteralKind::False),
    ("null", LiteralKind::Null),
];

impl Default for JsonStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonStateMachine {
    pub fn new() -> Self {
        Self {
            phase: JsonPhase::Root,
            depth: 0,
            containers: Vec::new(),
            current_key: String::new(),
        }
    }

    pub fn phase(&self) -> &JsonPhase {
        &self.phase
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn current_key(&self) -> &str {
        &self.current_key
    }

    pub fn is_done(&self) -> bool {
        matches!(self.phase, JsonPhase::Done)
    }

    pub fn is_error(&self) -> bool {
        matches!(self.phase, JsonPhase::Error)
    }

    /// Feed one character, mutating phase/depth/containers/current_key.
    pub fn feed(&mut self, ch: char) {
        match &self.phase {
            JsonPhase::Done | JsonPhase::Error => {}
            JsonPhase::Root => self.feed_root(ch),
            JsonPhase::InObject(op) => self.feed_in_object(*op, ch),
            JsonPhase::InArray(ap) => self.feed_in_array(*ap, ch),
            JsonPhase::InString { kind, escaped } => self.feed_in_string(*kind, *escaped, ch),
            JsonPhase::InNumber(np) => self.feed_in_number(*np, ch),
            JsonPhase::InLiteral { kind, partial } => {
                let kind = *kind;
                let partial = partial.clone();
                self.feed_in_literal(kind, partial, ch)
            }
        }
        if matches!(self.phase, JsonPhase::Error) {
            tracing::debug!(?ch, "json state machine entered Error phase");
        } else {
            tracing::trace!(?ch, phase = ?self.phase, depth = self.depth, "json state machine fed a character");
        }
    }

    pub fn feed_str(&mut self, text: &str) {
        for ch in text.chars() {
            self.feed(ch);
        }
    }

    fn push_container(&mut self, kind: ContainerKind) {
        self.containers.push(kind);
        self.depth += 1;
    }

    /// "Value start" rules shared by Root and every `ExpectValue` phase. Only
    /// `{`/`[` open a new container frame — every other value kind (string,
    /// number, literal) completes within the enclosing frame already on the
    /// stack, so pushing here must stay conditional on which value actually
    /// starts, not on whether one is enclosing.
    fn start_value(&mut self, ch: char) {
        match ch {
            '{' => {
                self.push_container(ContainerKind::Object);
                self.phase = JsonPhase::InObject(ObjectPhase::ExpectKeyOrEnd);
            }
            '[' => {
                self.push_container(ContainerKind::Array);
                self.phase = JsonPhase::InArray(ArrayPhase::ExpectValue);
            }
            '"' => {
                self.current_key.clear();
                self.phase = JsonPhase::InString {
                    kind: StringKind::Value,
                    escaped: false,
                };
            }
            '-' => self.phase = JsonPhase::InNumber(NumberPhase::Integer),
            d if d.is_ascii_digit() => self.phase = JsonPhase::InNumber(NumberPhase::Integer),
            't' => {
                self.phase = JsonPhase::InLiteral {
                    kind: LiteralKind::True,
                    partial: "t".to_string(),
                }
            }
            'f' => {
                self.phase = JsonPhase::InLiteral {
                    kind: LiteralKind::False,
                    partial: "f".to_string(),
                }
            }
            'n' => {
                self.phase = JsonPhase::InLiteral {
                    kind: LiteralKind::Null,
                    partial: "n".to_string(),
                }
            }
            _ => self.phase = JsonPhase::Error,
        }
    }

    fn feed_root(&mut self, ch: char) {
        if ch.is_whitespace() {
            return;
        }
        self.start_value(ch);
    }

    fn feed_in_object(&mut self, op: ObjectPhase, ch: char) {
        match op {
            ObjectPhase::ExpectKeyOrEnd => {
                if ch == '}' {
                    self.close();
                } else if ch == '"' {
                    self.current_key.clear();
                    self.phase = JsonPhase::InString {
                        kind: StringKind::Key,
                        escaped: false,
                    };
                } else if ch.is_whitespace() {
                } else {
                    self.phase = JsonPhase::Error;
                }
            }
            ObjectPhase::ExpectKeyFirstQuote => {
                if ch == '"' {
                    self.current_key.clear();
                    self.phase = JsonPhase::InString {
                        kind: StringKind::Key,
                        escaped: false,
                    };
                } else if ch.is_whitespace() {
                } else {
                    self.phase = JsonPhase::Error;
                }
            }
            ObjectPhase::ExpectColon => {
                if ch == ':' {
                    self.phase = JsonPhase::InObject(ObjectPhase::ExpectValue);
                } else if ch.is_whitespace() {
                } else {
                    self.phase = JsonPhase::Error;
                }
            }
            ObjectPhase::ExpectValue => {
                if ch.is_whitespace() {
                    return;
                }
                self.start_value(ch);
            }
            ObjectPhase::ExpectCommaOrEnd => {
                if ch == ',' {
                    self.phase = JsonPhase::InObject(ObjectPhase::ExpectKeyFirstQuote);
                } else if ch == '}' {
                    self.close();
                } else if ch.is_whitespace() {
                } else {
                    self.phase = JsonPhase::Error;
                }
            }
        }
    }

    fn feed_in_array(&mut self, ap: ArrayPhase, ch: char) {
        match ap {
            ArrayPhase::ExpectValue => {
                if ch.is_whitespace() {
                    return;
                }
                if ch == ']' {
                    // An empty array is the one place ExpectValue accepts a
                    // close directly.
                    self.close();
                } else {
                    self.start_value(ch);
                }
            }
            ArrayPhase::ExpectCommaOrEnd => {
                if ch == ',' {
                    self.phase = JsonPhase::InArray(ArrayPhase::ExpectValue);
                } else if ch == ']' {
                    self.close();
                } else if ch.is_whitespace() {
                } else {
                    self.phase = JsonPhase::Error;
                }
            }
        }
    }

    fn feed_in_string(&mut self, kind: StringKind, escaped: bool, ch: char) {
        if escaped {
            self.current_key_push_if_key(kind, ch);
            self.phase = JsonPhase::InString {
                kind,
                escaped: false,
            };
            return;
        }
        if ch == '\\' {
            self.phase = JsonPhase::InString {
                kind,
                escaped: true,
            };
            return;
        }
        if ch == '"' {
            match kind {
                StringKind::Key => self.phase = JsonPhase::InObject(ObjectPhase::ExpectColon),
                StringKind::Value => self.complete_value(),
            }
            return;
        }
        self.current_key_push_if_key(kind, ch);
        self.phase = JsonPhase::InString {
            kind,
            escaped: false,
        };
    }

    fn current_key_push_if_key(&mut self, kind: StringKind, ch: char) {
        if kind == StringKind::Key {
            self.current_key.push(ch);
        }
    }

    fn feed_in_number(&mut self, np: NumberPhase, ch: char) {
        match ch {
            d if d.is_ascii_digit() => {} // same phase, more digits
            '.' if np == NumberPhase::Integer => {
                self.phase = JsonPhase::InNumber(NumberPhase::Decimal);
            }
            'e' | 'E' if np != NumberPhase::Exponent => {
                self.phase = JsonPhase::InNumber(NumberPhase::Exponent);
            }
            '+' | '-' if np == NumberPhase::Exponent => {}
            ',' | '}' | ']' => {
                self.complete_value();
                self.feed(ch);
            }
            ws if ws.is_whitespace() => {
                self.complete_value();
            }
            _ => self.phase = JsonPhase::Error,
        }
    }

    fn feed_in_literal(&mut self, kind: LiteralKind, mut partial: String, ch: char) {
        let full = LITERALS
            .iter()
            .find(|(_, k)| *k == kind)
            .map(|(s, _)| *s)
            .unwrap();

        match ch {
            ',' | '}' | ']' => {
                if partial == full {
                    self.complete_value();
                    self.feed(ch);
                } else {
                    self.phase = JsonPhase::Error;
                }
            }
            ws if ws.is_whitespace() => {
                if partial == full {
                    self.complete_value();
                } else {
                    self.phase = JsonPhase::Error;
                }
            }
            _ => {
                let next_len = partial.len() + ch.len_utf8();
                if next_len <= full.len() && full.as_bytes()[partial.len()] as char == ch {
                    partial.push(ch);
                    if partial == full {
                        self.complete_value();
                    } else {
                        self.phase = JsonPhase::InLiteral { kind, partial };
                    }
                } else {
                    self.phase = JsonPhase::Error;
                }
            }
        }
    }

    /// A value (string-value, number, or literal) has just finished. Decide
    /// the next phase by peeking (not popping) the top of the container
    /// stack (spec §4.3 "InString{Value}: ... derive next phase by peeking").
    fn complete_value(&mut self) {
        match self.containers.last() {
            Some(ContainerKind::Object) => self.phase = JsonPhase::InObject(ObjectPhase::ExpectCommaOrEnd),
            Some(ContainerKind::Array) => self.phase = JsonPhase::InArray(ArrayPhase::ExpectCommaOrEnd),
            None => self.phase = JsonPhase::Done,
        }
    }

    /// A `}`/`]` has just been consumed: pop the closed container and land on
    /// `Done` or the new top's `ExpectCommaOrEnd` (spec §4.3 "Close rules").
    fn close(&mut self) {
        self.containers.pop();
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            self.phase = JsonPhase::Done;
        } else {
            self.complete_value();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str) -> JsonStateMachine {
        let mut m = JsonStateMachine::new();
        m.feed_str(text);
        m
    }

    #[test]
    fn simple_object_reaches_done() {
        let m = run(r#"{"name":"a","age":1}"#);
        assert!(m.is_done());
        assert_eq!(m.depth(), 0);
    }

    #[test]
    fn nested_object_reaches_done() {
        let m = run(r#"{"contact":{"email":"a@b","phone":"1"}}"#);
        assert!(m.is_done());
    }

    #[test]
    fn array_of_objects_reaches_done() {
        let m = run(r#"{"items":[{"id":1,"name":"x"},{"id":2,"name":"y"}]}"#);
        assert!(m.is_done());
    }

    #[test]
    fn bare_literal_reaches_done() {
        let m = run("true");
        assert!(m.is_done());
    }

    #[test]
    fn bare_number_reaches_done_on_eof_via_explicit_terminator() {
        let mut m = JsonStateMachine::new();
        m.feed_str("42");
        m.feed(' ');
        assert!(m.is_done());
    }

    #[test]
    fn malformed_input_enters_error_not_panic() {
        let m = run("{not json");
        assert!(m.is_error() || matches!(m.phase(), JsonPhase::InString { .. }));
    }

    #[test]
    fn unbalanced_close_never_goes_negative() {
        let m = run("}}}");
        assert_eq!(m.depth(), 0);
    }

    #[test]
    fn current_key_tracks_the_open_key() {
        let mut m = JsonStateMachine::new();
        m.feed_str(r#"{"na"#);
        assert_eq!(m.current_key(), "na");
    }

    #[test]
    fn escaped_quote_does_not_close_the_key_string() {
        let mut m = JsonStateMachine::new();
        m.feed_str(r#"{"a\"b":1}"#);
        assert!(m.is_done());
    }
}
