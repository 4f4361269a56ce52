//! Prompt templates with named placeholders.
//!
//! Templates use `{name}` placeholders; `{{` and `}}` produce literal braces.

#![allow(clippy::literal_string_with_formatting_args)]

use thiserror::Error;

use super::language::LanguageInfo;

/// Academic translator prompt used by the `general` skill.
pub const DEFAULT_PROMPT: &str = "You are a professional academic translator, tasked with translating from {source_language} to {target_language}.\n\
\n\
Basic Requirements:\n\
1. Format Requirement: Ignore input formatting. Output in Markdown format (directly, not in a code block).\n\
2. Retain Proper Nouns and Terminology, marking them with ``.\n\
\n\
Extended Requirements:\n\
1. Formula Formatting: Ignore input formula formatting, tags, and numbering. Output formulas and mathematical symbols using LaTeX format, enclosed in double dollar signs ($$…$$), for example, $$r_t > 1$$.\n\
2. Use Standard Characters: Replace uncommon characters in input formulas (resulting from PDF copying or OCR scanning) with standard characters and LaTeX code.\n\
\n\
Input:\n\
\n\
{selected_text}\n\
\n\
Please output the result only:\n";

/// Line-by-line code explanation prompt used by the `code` skill.
pub const CODE_PROMPT: &str = "Explain the following code line by line, answering in {target_language}. Here is the code:\n{selected_text}";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromptError {
    #[error("Unknown placeholder '{{{0}}}' in prompt template")]
    UnknownPlaceholder(String),
    #[error("Unbalanced brace at byte {0} in prompt template")]
    UnbalancedBrace(usize),
}

/// Values substituted into a prompt template.
#[derive(Debug, Clone, Copy)]
pub struct PromptVars<'a> {
    pub text: &'a str,
    pub source_language: LanguageInfo,
    pub target_language: LanguageInfo,
}

impl PromptVars<'_> {
    fn lookup(&self, name: &str) -> Option<&str> {
        match name {
            "text" | "selected_text" => Some(self.text),
            "source_language" => Some(self.source_language.native),
            "source_language_en" => Some(self.source_language.code),
            "target_language" => Some(self.target_language.native),
            "target_language_en" => Some(self.target_language.code),
            _ => None,
        }
    }
}

/// Substitutes every placeholder in `template`.
///
/// # Errors
///
/// Fails on a placeholder name not known to [`PromptVars`] or on a brace
/// that is neither doubled nor part of a placeholder.
pub fn format_prompt(template: &str, vars: &PromptVars<'_>) -> Result<String, PromptError> {
    let mut out = String::with_capacity(template.len() + vars.text.len());
    let mut rest = template;
    let mut offset = 0;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") {
            out.push('{');
            rest = &tail[2..];
            offset += pos + 2;
            continue;
        }
        if tail.starts_with("}}") {
            out.push('}');
            rest = &tail[2..];
            offset += pos + 2;
            continue;
        }
        if tail.starts_with('}') {
            return Err(PromptError::UnbalancedBrace(offset + pos));
        }

        let close = tail[1..]
            .find(['{', '}'])
            .filter(|&i| tail[1 + i..].starts_with('}'))
            .ok_or(PromptError::UnbalancedBrace(offset + pos))?;
        let name = &tail[1..=close];
        let value = vars
            .lookup(name)
            .ok_or_else(|| PromptError::UnknownPlaceholder(name.to_string()))?;
        out.push_str(value);

        rest = &tail[close + 2..];
        offset += pos + close + 2;
    }

    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::translation::language::{CHINESE, ENGLISH};

    fn vars(text: &str) -> PromptVars<'_> {
        PromptVars {
            text,
            source_language: ENGLISH,
            target_language: CHINESE,
        }
    }

    #[test]
    fn test_substitutes_all_placeholders() {
        let template = "{text}|{selected_text}|{source_language}|{source_language_en}|{target_language}|{target_language_en}";
        let prompt = format_prompt(template, &vars("hi")).unwrap();
        assert_eq!(prompt, "hi|hi|English|English|中文|Chinese");
    }

    #[test]
    fn test_escaped_braces() {
        let prompt = format_prompt("{{json}} {text} }}", &vars("x")).unwrap();
        assert_eq!(prompt, "{json} x }");
    }

    #[test]
    fn test_placeholder_value_is_not_reinterpreted() {
        let prompt = format_prompt("<{text}>", &vars("{target_language}")).unwrap();
        assert_eq!(prompt, "<{target_language}>");
    }

    #[test]
    fn test_unknown_placeholder() {
        let err = format_prompt("Translate {txt}", &vars("x")).unwrap_err();
        assert_eq!(err, PromptError::UnknownPlaceholder("txt".to_string()));
        assert_eq!(
            err.to_string(),
            "Unknown placeholder '{txt}' in prompt template"
        );
    }

    #[test]
    fn test_unbalanced_braces() {
        assert_eq!(
            format_prompt("oops {text", &vars("x")).unwrap_err(),
            PromptError::UnbalancedBrace(5)
        );
        assert_eq!(
            format_prompt("a } b", &vars("x")).unwrap_err(),
            PromptError::UnbalancedBrace(2)
        );
        assert_eq!(
            format_prompt("{a{b}", &vars("x")).unwrap_err(),
            PromptError::UnbalancedBrace(0)
        );
    }

    #[test]
    fn test_builtin_prompts_format() {
        let general = format_prompt(DEFAULT_PROMPT, &vars("hello")).unwrap();
        assert!(general.contains("from English to 中文"));
        assert!(general.contains("\nhello\n"));

        let code = format_prompt(CODE_PROMPT, &vars("fn main() {}")).unwrap();
        assert!(code.ends_with("fn main() {}"));
    }

    #[test]
    fn test_template_without_placeholders() {
        assert_eq!(format_prompt("plain", &vars("x")).unwrap(), "plain");
    }
}
