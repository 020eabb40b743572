//! Prompt construction and defensive parsing of generated replies.
//!
//! Replies are untrusted text. Parsing either yields a [`SynthesisPatch`] or
//! an error; it never panics and never touches a card.

use card_core::{CardEntity, CardPatch};
use serde_json::Value;

use crate::error::{SynthError, SynthResult};

/// Keys the reply is asked to provide.
pub const RESPONSE_KEYS: [&str; 3] = ["name", "tag", "description"];

/// Build the prompt for a free-text project idea.
#[must_use]
pub fn render_prompt(idea: &str) -> String {
    format!(
        "Based on the following idea, generate content for a project card. Idea: \"{idea}\". \
         Provide a response in JSON format with three keys: \"name\" (a creative project name, max 5 words), \
         \"tag\" (a short, relevant tag, max 2 words), and \"description\" (a concise, one-sentence description)."
    )
}

/// Remove a surrounding Markdown code fence, with or without a language tag.
///
/// Text that is not fenced, or whose fence is empty, is returned trimmed.
#[must_use]
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    else {
        return trimmed;
    };

    // Optional language tag directly after the opening fence.
    let body = inner.trim_start_matches(|c: char| c.is_alphanumeric() || c == '_');
    let body = body.trim();
    if body.is_empty() {
        trimmed
    } else {
        body
    }
}

/// Fields extracted from a reply. `None` means the reply did not provide a
/// usable value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynthesisPatch {
    /// Generated project name.
    pub name: Option<String>,
    /// Generated tag.
    pub tag: Option<String>,
    /// Generated description.
    pub description: Option<String>,
}

impl SynthesisPatch {
    /// Whether no field is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.tag.is_none() && self.description.is_none()
    }

    /// As a card patch.
    #[must_use]
    pub fn to_card_patch(&self) -> CardPatch {
        CardPatch {
            name: self.name.clone(),
            tag: self.tag.clone(),
            description: self.description.clone(),
            ..CardPatch::default()
        }
    }

    /// Merge the present fields into `card`, keeping its current values
    /// elsewhere. Returns the names of the fields that changed.
    pub fn apply_to(&self, card: &mut CardEntity) -> Vec<&'static str> {
        let applied: Vec<&'static str> = [
            ("name", self.name.is_some()),
            ("tag", self.tag.is_some()),
            ("description", self.description.is_some()),
        ]
        .into_iter()
        .filter_map(|(key, present)| present.then_some(key))
        .collect();

        card.patch(self.to_card_patch());
        applied
    }
}

/// Parse a raw reply into a patch.
///
/// Missing keys and `null` values are absent fields, as are blank strings.
/// Non-blank strings are kept exactly as generated.
///
/// # Errors
///
/// Returns [`SynthError::Parse`] if the reply is not JSON, is not an object,
/// has a non-string value for one of the keys, or provides none of them.
pub fn parse_response(raw: &str) -> SynthResult<SynthesisPatch> {
    let json = strip_code_fence(raw);
    let value: Value = serde_json::from_str(json)?;
    let Value::Object(object) = value else {
        return Err(SynthError::Parse(format!(
            "expected a JSON object, got {}",
            kind_of(&value)
        )));
    };

    let mut fields = [None, None, None];
    let mut seen = 0;
    for (slot, key) in fields.iter_mut().zip(RESPONSE_KEYS) {
        match object.get(key) {
            None | Some(Value::Null) => {}
            Some(Value::String(s)) => {
                seen += 1;
                if !s.trim().is_empty() {
                    *slot = Some(s.clone());
                }
            }
            Some(other) => {
                return Err(SynthError::Parse(format!(
                    "\"{key}\" must be a string, got {}",
                    kind_of(other)
                )));
            }
        }
    }

    if seen == 0 {
        return Err(SynthError::Parse(
            "reply has none of \"name\", \"tag\", \"description\"".to_string(),
        ));
    }

    let [name, tag, description] = fields;
    Ok(SynthesisPatch {
        name,
        tag,
        description,
    })
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_idea() {
        let prompt = render_prompt("dog walking marketplace");
        assert!(prompt.contains("Idea: \"dog walking marketplace\"."));
        assert!(prompt.contains("\"name\""));
        assert!(prompt.contains("\"tag\""));
        assert!(prompt.contains("\"description\""));
    }

    #[test]
    fn test_strip_fence_variants() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  ```{\"a\":1}```  "), "{\"a\":1}");
        assert_eq!(strip_code_fence("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json\n```"), "```json\n```");
        assert_eq!(strip_code_fence("``` only opening"), "``` only opening");
    }

    #[test]
    fn test_parse_fenced_reply() {
        let raw = "```json\n{\"name\":\"PawPath\",\"tag\":\"MVP\",\"description\":\"Connects dog walkers with owners.\"}\n```";
        let patch = parse_response(raw).expect("parse");
        assert_eq!(patch.name.as_deref(), Some("PawPath"));
        assert_eq!(patch.tag.as_deref(), Some("MVP"));
        assert_eq!(
            patch.description.as_deref(),
            Some("Connects dog walkers with owners.")
        );
    }

    #[test]
    fn test_parse_tolerates_missing_and_blank_keys() {
        let patch = parse_response(r#"{"name":"Solo","tag":"   ","description":null}"#)
            .expect("parse");
        assert_eq!(patch.name.as_deref(), Some("Solo"));
        assert_eq!(patch.tag, None);
        assert_eq!(patch.description, None);
    }

    #[test]
    fn test_parse_keeps_padded_values_verbatim() {
        let patch = parse_response(r#"{"name":" PawPath ","tag":"MVP\n"}"#).expect("parse");
        assert_eq!(patch.name.as_deref(), Some(" PawPath "));
        assert_eq!(patch.tag.as_deref(), Some("MVP\n"));
    }

    #[test]
    fn test_parse_failures() {
        assert!(parse_response("not json").is_err_and(|e| e.is_parse()));
        assert!(parse_response("[1,2,3]").is_err_and(|e| e.is_parse()));
        assert!(parse_response("\"just a string\"").is_err_and(|e| e.is_parse()));
        assert!(parse_response(r#"{"title":"wrong keys"}"#).is_err_and(|e| e.is_parse()));
        assert!(parse_response(r#"{"name":42}"#).is_err_and(|e| e.is_parse()));
        assert!(parse_response("").is_err_and(|e| e.is_parse()));
    }

    #[test]
    fn test_apply_keeps_absent_fields() {
        let mut card = CardEntity::create();
        let before = card.clone();
        let patch = SynthesisPatch {
            name: Some("New Name".into()),
            tag: None,
            description: Some("New description.".into()),
        };

        let applied = patch.apply_to(&mut card);
        assert_eq!(applied, vec!["name", "description"]);
        assert_eq!(card.name, "New Name");
        assert_eq!(card.tag, before.tag);
        assert_eq!(card.description, "New description.");
        assert_eq!(card.id, before.id);
        assert_eq!(card.links, before.links);
    }
}
