//! Multi-document manifest templates.
//!
//! A template file holds several YAML documents. The file is split on the raw
//! text first and each document is then rendered on its own, so a value
//! substituted into one document can never open or close another one.

use minijinja::{Environment, UndefinedBehavior};
use thiserror::Error;

use crate::values::AddonConfiguration;

/// A newline followed by three dashes starts a new document.
pub const DOCUMENT_SEPARATOR: &str = "\n---";

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("template is not valid utf-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("document {index}: {source}")]
    Render {
        index: usize,
        #[source]
        source: minijinja::Error,
    },
}

/// Splits raw template text into candidate documents, in source order.
/// Three dashes opening the text separate too, from an empty first document.
pub fn split_documents(raw: &str) -> impl Iterator<Item = &str> {
    let raw = raw.strip_prefix(&DOCUMENT_SEPARATOR[1..]).unwrap_or(raw);
    raw.split(DOCUMENT_SEPARATOR)
}

pub struct TemplateRenderer {
    env: Environment<'static>,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer {
    pub fn new() -> Self {
        let mut env = Environment::new();
        // options missing from the configuration render as empty
        env.set_undefined_behavior(UndefinedBehavior::Lenient);
        env.set_keep_trailing_newline(true);
        Self { env }
    }

    /// Renders every document of a template file with the configuration.
    /// Documents that render to nothing but whitespace are dropped.
    pub fn render(
        &self,
        raw: &[u8],
        config: &AddonConfiguration,
    ) -> Result<Vec<String>, TemplateError> {
        let text = std::str::from_utf8(raw)?;
        let ctx = config.template_context();
        let mut documents = Vec::new();
        for (index, candidate) in split_documents(text).enumerate() {
            let rendered = self
                .env
                .render_str(candidate, ctx.clone())
                .map_err(|source| TemplateError::Render { index, source })?;
            if rendered.trim().is_empty() {
                continue;
            }
            documents.push(rendered);
        }
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(raw: &str, config: &AddonConfiguration) -> Vec<String> {
        TemplateRenderer::new().render(raw.as_bytes(), config).unwrap()
    }

    #[test]
    fn split_keeps_source_order() {
        let docs: Vec<&str> = split_documents("a: 1\n---\nb: 2\n---\nc: 3").collect();
        assert_eq!(docs, ["a: 1", "\nb: 2", "\nc: 3"]);
    }

    #[test]
    fn split_treats_leading_dashes_as_separator() {
        let docs: Vec<&str> =
            split_documents("---\n{% if x %}a: 1{% endif %}\n---\nb: 2").collect();
        assert_eq!(docs, ["\n{% if x %}a: 1{% endif %}", "\nb: 2"]);

        let raw = "---\n{% if OLMImage %}kind: A{% endif %}\n---\nkind: B\n";
        assert_eq!(render(raw, &AddonConfiguration::default()), ["\nkind: B\n"]);
    }

    #[test]
    fn split_requires_preceding_newline() {
        let docs: Vec<&str> = split_documents("a: x---y\nb: 2").collect();
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn drops_empty_and_whitespace_documents() {
        let docs = render(
            "---\nkind: A\n---\n\n---\n   \n---\nkind: B\n---\n",
            &AddonConfiguration::default(),
        );
        assert_eq!(docs.len(), 2);
        assert!(docs[0].contains("kind: A"));
        assert!(docs[1].contains("kind: B"));
    }

    #[test]
    fn substitutes_configuration() {
        let config = AddonConfiguration::default().with_olm_image("quay.io/olm:v1");
        let docs = render("kind: A\nimage: {{ OLMImage }}\n", &config);
        assert_eq!(docs, ["kind: A\nimage: quay.io/olm:v1\n"]);
    }

    #[test]
    fn absent_options_render_empty() {
        let docs = render("kind: A\nimage: '{{ OLMImage }}'\n", &AddonConfiguration::default());
        assert_eq!(docs, ["kind: A\nimage: ''\n"]);
    }

    #[test]
    fn guarded_document_disappears_without_option() {
        let raw = "kind: A\n---\n{% if OLMImage %}kind: B\nimage: {{ OLMImage }}{% endif %}\n";
        assert_eq!(render(raw, &AddonConfiguration::default()).len(), 1);
        let config = AddonConfiguration::default().with_olm_image("olm:dev");
        assert_eq!(render(raw, &config).len(), 2);
    }

    #[test]
    fn values_cannot_introduce_documents() {
        let config = AddonConfiguration::default().with_olm_image("x\n---\nkind: Injected");
        let docs = render("kind: A\nimage: {{ OLMImage }}\n", &config);
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn documents_render_independently() {
        // an unclosed block in one document is an error for that document
        let err = TemplateRenderer::new()
            .render(
                b"kind: A\n---\n{% if OLMImage %}kind: B\n",
                &AddonConfiguration::default(),
            )
            .unwrap_err();
        assert!(matches!(err, TemplateError::Render { index: 1, .. }));
    }

    #[test]
    fn rejects_invalid_utf8() {
        let err = TemplateRenderer::new()
            .render(&[0xff, 0xfe], &AddonConfiguration::default())
            .unwrap_err();
        assert!(matches!(err, TemplateError::Utf8(_)));
    }
}
