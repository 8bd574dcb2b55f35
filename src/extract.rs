//! Best-effort post-processing of generated text.
//! Nothing here fails: no match means an empty result.

use std::sync::OnceLock;
use regex::Regex;
use log::{debug, error, trace};

use crate::request::Mission;

pub const MAX_ITEMS: usize = 3;
pub const MAX_ITEM_CHARS: usize = 80;

/// Compile one of the extraction patterns, logging a bad pattern instead
/// of dropping it silently
pub fn compile_pattern(name: &str, pattern: &str) -> Option<Regex>
{   match Regex::new(pattern)
    {   Ok(re) => Some(re)
      , Err(e) => {
          error!("Extraction pattern {} does not compile: {}", name, e);
          None
        }
    }
}

fn json_span_re() -> Option<&'static Regex>
{   static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| compile_pattern("json span", r"(?s)\{.*\}")).as_ref()
}

fn enumerated_re() -> Option<&'static Regex>
{   static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
      compile_pattern(
        "enumerated item",
        r"(?m)^[ \t]*(?:\d{1,2}[.)．）]|[A-Ca-c][.)）]|[-*•・])[ \t]+(\S.*?)[ \t]*$"
      )
    }).as_ref()
}

/// Outermost `{ ... }` span, tolerating code fences and prose around it
pub fn json_object_span(text: &str) -> Option<&str>
{   json_span_re()?.find(text).map(|m| m.as_str())
}

pub fn collapse_whitespace(text: &str) -> String
{   text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Up to three items from numbered, lettered or bulleted lines
pub fn enumerated_items(text: &str) -> Vec<String>
{   let Some(re) = enumerated_re()
    else
    {   return vec![];
    };
    let items: Vec<String> = re
      .captures_iter(text)
      .filter_map(|caps| caps.get(1))
      .map(|m| {
        m.as_str().trim().chars().take(MAX_ITEM_CHARS).collect::<String>()
      })
      .filter(|item| !item.is_empty())
      .take(MAX_ITEMS)
      .collect();
    trace!("Extracted {} enumerated items", items.len());
    items
}

/// Read a mission summary out of a reply.
///
/// The JSON span is parsed if present (else the whole reply). Fields that
/// are missing or of the wrong shape become empty; a missing statement
/// falls back to the reply with its whitespace collapsed.
pub fn parse_mission(raw: &str) -> Mission
{   let candidate = json_object_span(raw).unwrap_or(raw);
    let parsed: Option<serde_json::Value>
      = serde_json::from_str(candidate).ok();
    if parsed.is_none()
    {   debug!("Mission reply did not contain parseable JSON");
    }

    let values = parsed.as_ref()
      .map(|v| string_list(v.get("values")))
      .unwrap_or_default();
    let passions = parsed.as_ref()
      .map(|v| string_list(v.get("passions")))
      .unwrap_or_default();
    let statement = parsed.as_ref()
      .and_then(|v| v.get("statement"))
      .and_then(|s| s.as_str())
      .map(|s| s.to_string())
      .unwrap_or_else(|| collapse_whitespace(raw));

    Mission
    {   values
      , passions
      , statement
    }
}

fn string_list(value: Option<&serde_json::Value>) -> Vec<String>
{   match value.and_then(|v| v.as_array())
    {   Some(items) => items
          .iter()
          .map(|item| match item.as_str()
          {   Some(s) => s.to_string()
            , None => item.to_string()
          })
          .collect()
      , None => vec![]
    }
}
