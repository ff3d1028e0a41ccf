//! Copy-from-index component.

use std::sync::Arc;

use refcache_xml::{Document, Variables};

use crate::config::CopyCommandConfig;
use crate::context::BuildContext;
use crate::copy::{CopyFromIndexCommand, CopyOutcome};
use crate::diagnostic::DiagnosticSink;
use crate::error::IndexError;

/// Name of the variable holding the current topic's key.
pub const KEY_VARIABLE: &str = "key";

/// Runs a list of copy commands against each topic.
///
/// For every topic the component binds `$key` to the topic key on top of
/// the static variables, then applies its commands in order.
pub struct CopyFromIndexComponent {
    commands: Vec<CopyFromIndexCommand>,
    variables: Variables,
    sink: Arc<dyn DiagnosticSink>,
}

impl CopyFromIndexComponent {
    /// Builds the commands against the indexes in `context`.
    pub fn new(
        context: &BuildContext,
        commands: &[CopyCommandConfig],
        variables: Variables,
    ) -> Result<Self, IndexError> {
        let commands = commands
            .iter()
            .map(|config| {
                let index = context.index(&config.index).ok_or_else(|| {
                    IndexError::config(format!(
                        "Copy command refers to unknown index '{}'",
                        config.index
                    ))
                })?;
                CopyFromIndexCommand::new(index, config)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            commands,
            variables,
            sink: context.shared_sink(),
        })
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Applies every command to `document` for the topic `key`.
    pub fn apply(&self, document: &mut Document, key: &str) -> Result<Vec<CopyOutcome>, IndexError> {
        let mut vars = self.variables.clone();
        vars.set(KEY_VARIABLE, key);

        self.commands
            .iter()
            .map(|command| command.apply(document, &vars, self.sink.as_ref()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DataSource, IndexConfig};
    use crate::diagnostic::DiagnosticCollector;
    use crate::index::CancellationToken;
    use crate::registry::IndexRegistry;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_apply_runs_commands_in_order() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("comments.xml"),
            r#"<doc><member name="T:A"><summary>s</summary><remarks>r</remarks></member></doc>"#,
        )
        .unwrap();

        let config = IndexConfig::new("comments", "//member", "@name");
        let index = IndexRegistry::default()
            .create(&config, Variables::new())
            .unwrap();
        let sink = Arc::new(DiagnosticCollector::new());
        index
            .add_documents(
                &DataSource::new(dir.path(), "*.xml"),
                sink.as_ref(),
                &CancellationToken::new(),
            )
            .unwrap();
        let mut context = BuildContext::new(sink);
        context.register_index(index).unwrap();

        let commands = vec![
            CopyCommandConfig::new("comments", "member/remarks", "/topic"),
            CopyCommandConfig::new("comments", "member/summary", "/topic"),
        ];
        let component = CopyFromIndexComponent::new(&context, &commands, Variables::new()).unwrap();
        let mut document = Document::with_root_element("topic");

        let outcomes = component.apply(&mut document, "T:A").unwrap();

        assert_eq!(outcomes.len(), 2);
        assert_eq!(
            document.to_xml(),
            "<topic><remarks>r</remarks><summary>s</summary></topic>"
        );
    }

    #[test]
    fn test_static_variables_are_visible() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("comments.xml"),
            r#"<doc><member name="en:T:A"><summary>s</summary></member></doc>"#,
        )
        .unwrap();

        let config = IndexConfig::new("comments", "//member", "@name");
        let index = IndexRegistry::default()
            .create(&config, Variables::new())
            .unwrap();
        let sink = Arc::new(DiagnosticCollector::new());
        index
            .add_documents(
                &DataSource::new(dir.path(), "*.xml"),
                sink.as_ref(),
                &CancellationToken::new(),
            )
            .unwrap();
        let mut context = BuildContext::new(sink);
        context.register_index(index).unwrap();

        let mut command = CopyCommandConfig::new("comments", "member/summary", "/topic");
        command.key = "concat($lang, ':', $key)".to_string();
        let component = CopyFromIndexComponent::new(
            &context,
            &[command],
            Variables::new().with("lang", "en"),
        )
        .unwrap();
        let mut document = Document::with_root_element("topic");

        let outcomes = component.apply(&mut document, "T:A").unwrap();
        assert_eq!(outcomes, vec![CopyOutcome::Copied { nodes: 1, attributes: 0 }]);
    }

    #[test]
    fn test_unknown_index() {
        let context = BuildContext::new(Arc::new(DiagnosticCollector::new()));
        let commands = vec![CopyCommandConfig::new("missing", "*", "/")];

        let result = CopyFromIndexComponent::new(&context, &commands, Variables::new());
        assert!(result.is_err());
    }
}
