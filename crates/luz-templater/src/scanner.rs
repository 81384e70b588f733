//! Single forward pass that finds `{{…}}` tokens in a sequence of text elements.
//!
//! Office editors split a paragraph into runs wherever formatting (or spell checking, or an
//! undo boundary) changes, so a token typed as `{{enter_time - 10}}` routinely ends up spread over
//! several `w:t` elements. The scanner reconstructs such tokens: the element holding the opener
//! keeps the text before `{{`, elements wholly inside the token are blanked, and the rendered
//! value lands at the start of the element holding the closer.

use luz_expr::{Evaluator, ExprError, ParseError, Span};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Ordered, editable text elements of one document part.
pub trait TextNodes {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Text of element `index`; `None` when the element carries no text at all.
    fn text(&self, index: usize) -> Option<&str>;

    fn set_text(&mut self, index: usize, text: String);
}

impl TextNodes for Vec<String> {
    fn len(&self) -> usize {
        <[String]>::len(self)
    }

    fn text(&self, index: usize) -> Option<&str> {
        self.get(index).map(String::as_str)
    }

    fn set_text(&mut self, index: usize, text: String) {
        if let Some(slot) = self.get_mut(index) {
            *slot = text;
        }
    }
}

impl TextNodes for Vec<Option<String>> {
    fn len(&self) -> usize {
        <[Option<String>]>::len(self)
    }

    fn text(&self, index: usize) -> Option<&str> {
        self.get(index).and_then(|t| t.as_deref())
    }

    fn set_text(&mut self, index: usize, text: String) {
        if let Some(slot) = self.get_mut(index) {
            *slot = Some(text);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Tokens evaluated.
    pub tokens: usize,
    /// Tokens whose delimiters were in different elements.
    pub cross_element_tokens: usize,
}

/// An element that ended while a token was open; committed once the token resolves.
struct Held {
    index: usize,
    output: String,
}

struct OpenToken {
    /// Element holding the opener.
    element: usize,
    /// Byte offset of `{{` in that element's original text.
    source_start: usize,
    /// Byte offset of `{{` in the output of the element that holds the opener.
    start: usize,
    body: String,
}

/// Replace every token in `nodes` with its evaluated value.
///
/// Tokens are evaluated in document order, so an assignment is visible to every later token.
/// A `{{` seen while a token is already open abandons the earlier one: its text is kept verbatim
/// and scanning restarts at the new opener.
pub fn scan<N>(nodes: &mut N, evaluator: &mut Evaluator<'_>) -> Result<ScanStats, ExprError>
where
    N: TextNodes + ?Sized,
{
    let mut stats = ScanStats::default();
    let mut held: Vec<Held> = Vec::new();
    let mut open: Option<OpenToken> = None;

    for index in 0..nodes.len() {
        let text = nodes.text(index).unwrap_or_default().to_string();
        let mut output = String::with_capacity(text.len());
        let mut rest = text.as_str();

        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix(OPEN) {
                if open.is_some() {
                    for h in held.drain(..) {
                        nodes.set_text(h.index, h.output);
                    }
                }
                open = Some(OpenToken {
                    element: index,
                    source_start: text.len() - rest.len(),
                    start: output.len(),
                    body: String::new(),
                });
                output.push_str(OPEN);
                rest = after;
                continue;
            }

            if let (Some(after), Some(token)) = (rest.strip_prefix(CLOSE), open.as_ref()) {
                let rendered = evaluator.evaluate(&token.body)?.to_string();
                let start = token.start;
                open = None;
                stats.tokens += 1;

                if held.is_empty() {
                    output.truncate(start);
                } else {
                    stats.cross_element_tokens += 1;
                    let mut pending = held.drain(..);
                    if let Some(first) = pending.next() {
                        let mut kept = first.output;
                        kept.truncate(start);
                        nodes.set_text(first.index, kept);
                    }
                    for h in pending {
                        nodes.set_text(h.index, String::new());
                    }
                    output.clear();
                }
                output.push_str(&rendered);
                rest = after;
                continue;
            }

            let mut chars = rest.chars();
            if let Some(ch) = chars.next() {
                output.push(ch);
                if let Some(token) = open.as_mut() {
                    token.body.push(ch);
                }
            }
            rest = chars.as_str();
        }

        if open.is_some() {
            held.push(Held { index, output });
        } else {
            nodes.set_text(index, output);
        }
    }

    // The span is relative to the text of the element named in the message.
    if let Some(token) = open {
        return Err(ExprError::Syntax(ParseError::new(
            format!("unterminated `{OPEN}` token in text element {}", token.element),
            Span::new(token.source_start, token.source_start + OPEN.len()),
        )));
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use luz_expr::{Diagnostic, NameTable, TimeOfDay};
    use pretty_assertions::assert_eq;

    fn names() -> NameTable {
        let mut names = NameTable::new();
        names.set("a", 5);
        names.set("enter_time", TimeOfDay::new(19, 30).unwrap());
        names
    }

    fn run(parts: &[&str]) -> (Vec<String>, ScanStats) {
        let mut nodes: Vec<String> = parts.iter().map(|s| s.to_string()).collect();
        let mut names = names();
        let mut evaluator = Evaluator::new(&mut names);
        let stats = scan(&mut nodes, &mut evaluator).unwrap();
        (nodes, stats)
    }

    #[test]
    fn single_element_tokens_are_spliced() {
        let (out, stats) = run(&["Candles at {{enter_time}} sharp", "{{a*2}} and {{a}}"]);
        assert_eq!(out, vec!["Candles at 19:30 sharp", "10 and 5"]);
        assert_eq!(stats, ScanStats { tokens: 3, cross_element_tokens: 0 });
    }

    #[test]
    fn tokens_split_across_elements_are_reassembled() {
        let (out, stats) = run(&["prefix {{a", "+1}}suffix"]);
        assert_eq!(out, vec!["prefix ", "6suffix"]);
        assert_eq!(stats.cross_element_tokens, 1);

        let (out, _) = run(&["x {{", "enter_time", " - ", "10", "}} y"]);
        assert_eq!(out, vec!["x ", "", "", "", "19:20 y"]);
    }

    #[test]
    fn opener_offset_accounts_for_earlier_replacements() {
        let (out, _) = run(&["{{a}} then {{a", "}}!"]);
        assert_eq!(out, vec!["5 then ", "5!"]);
    }

    #[test]
    fn text_without_tokens_is_unchanged() {
        let (out, stats) = run(&["plain", "", "a }} stray", "{ single }"]);
        assert_eq!(out, vec!["plain", "", "a }} stray", "{ single }"]);
        assert_eq!(stats, ScanStats::default());
    }

    #[test]
    fn second_opener_restarts_the_token() {
        let (out, stats) = run(&["keep {{ abandoned {{a}}"]);
        assert_eq!(out, vec!["keep {{ abandoned 5"]);
        assert_eq!(stats.tokens, 1);

        let (out, _) = run(&["one {{ lost", " two {{a", "}}"]);
        assert_eq!(out, vec!["one {{ lost", " two ", "5"]);
    }

    #[test]
    fn assignments_flow_forward() {
        let (out, _) = run(&["{{x = a + 1}}", "{{x * 2}}"]);
        assert_eq!(out, vec!["6", "12"]);
    }

    #[test]
    fn absent_text_is_treated_as_empty() {
        let mut nodes: Vec<Option<String>> = vec![
            Some("{{a".to_string()),
            None,
            Some("}} ok".to_string()),
        ];
        let mut names = names();
        let mut evaluator = Evaluator::new(&mut names);
        scan(&mut nodes, &mut evaluator).unwrap();
        assert_eq!(
            nodes,
            vec![Some(String::new()), Some(String::new()), Some("5 ok".to_string())]
        );
    }

    #[test]
    fn unterminated_token_is_a_syntax_error() {
        let mut nodes = vec!["fine {{a}}".to_string(), "broken {{a + ".to_string()];
        let mut names = names();
        let mut evaluator = Evaluator::new(&mut names);
        let err = scan(&mut nodes, &mut evaluator).unwrap_err();
        match err {
            ExprError::Syntax(parse) => {
                assert_eq!(parse.message, "unterminated `{{` token in text element 1");
                assert_eq!(parse.span, Span::new(7, 9));
            }
            other => panic!("expected a syntax error, got {other}"),
        }
    }

    #[test]
    fn unterminated_token_points_at_its_opener_element() {
        let mut nodes = vec!["{{a".to_string(), " + 1".to_string(), " tail".to_string()];
        let mut names = names();
        let mut evaluator = Evaluator::new(&mut names);
        let err = scan(&mut nodes, &mut evaluator).unwrap_err();
        assert_eq!(
            err.to_string(),
            "syntax error: unterminated `{{` token in text element 0 (at 0..2)"
        );
    }

    #[test]
    fn undefined_names_render_zero_and_are_reported() {
        let mut nodes = vec!["{{missing}}".to_string()];
        let mut names = NameTable::new();
        let mut evaluator = Evaluator::new(&mut names);
        scan(&mut nodes, &mut evaluator).unwrap();
        assert_eq!(nodes, vec!["0".to_string()]);
        assert_eq!(
            evaluator.into_diagnostics(),
            vec![Diagnostic::UndefinedName {
                name: "missing".to_string()
            }]
        );
    }
}
