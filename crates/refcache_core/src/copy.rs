//! Copy-from-index command.

use std::sync::Arc;

use refcache_xml::{Document, NodeId, Variables, XNode, XPath};
use serde::Serialize;
use tracing::debug;

use crate::config::CopyCommandConfig;
use crate::diagnostic::{Diagnostic, DiagnosticKind, DiagnosticSink, MessageLevel};
use crate::eii;
use crate::error::IndexError;
use crate::index::IndexedCache;

/// What a single [`CopyFromIndexCommand::apply`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "outcome")]
pub enum CopyOutcome {
    /// Nodes were appended or attributes written.
    Copied { nodes: usize, attributes: usize },
    MissingEntry,
    MissingTarget,
    MissingSource,
}

/// Looks up a key computed from the target document and merges the
/// selected part of the found fragment into it.
pub struct CopyFromIndexCommand {
    index: Arc<dyn IndexedCache>,
    key: XPath,
    source: XPath,
    target: XPath,
    attribute: bool,
    ignore_case: bool,
    missing_entry: MessageLevel,
    missing_source: MessageLevel,
    missing_target: MessageLevel,
}

impl CopyFromIndexCommand {
    pub fn new(index: Arc<dyn IndexedCache>, config: &CopyCommandConfig) -> Result<Self, IndexError> {
        if index.name() != config.index {
            return Err(IndexError::config(format!(
                "Copy command for index '{}' was given index '{}'",
                config.index,
                index.name()
            )));
        }

        Ok(Self {
            index,
            key: XPath::compile(&config.key)?,
            source: XPath::compile(&config.source)?,
            target: XPath::compile(&config.target)?,
            attribute: config.attribute,
            ignore_case: config.ignore_case,
            missing_entry: config.missing_entry,
            missing_source: config.missing_source,
            missing_target: config.missing_target,
        })
    }

    pub fn index_name(&self) -> &str {
        self.index.name()
    }

    /// Runs the command against `target`.
    ///
    /// Nothing in `target` changes unless an entry, a target node and at
    /// least one source node were all found.
    pub fn apply(
        &self,
        target: &mut Document,
        vars: &Variables,
        sink: &dyn DiagnosticSink,
    ) -> Result<CopyOutcome, IndexError> {
        let key = self.key.evaluate_string(target, target.root(), vars)?;

        let Some(fragment) = self.find(&key, sink)? else {
            self.report(
                sink,
                self.missing_entry,
                DiagnosticKind::MissingEntry,
                &key,
                format!("Entry for '{}' not found in index '{}'", key, self.index_name()),
            )?;
            return Ok(CopyOutcome::MissingEntry);
        };

        let insertion = self
            .target
            .select_first(target, target.root(), vars)?
            .and_then(|node| match node {
                XNode::Node(id) if target.is_element(id) => Some(id),
                _ => None,
            });
        let Some(insertion) = insertion else {
            self.report(
                sink,
                self.missing_target,
                DiagnosticKind::MissingTarget,
                &key,
                format!(
                    "Target node '{}' not found for entry '{}'",
                    self.target.as_str(),
                    key
                ),
            )?;
            return Ok(CopyOutcome::MissingTarget);
        };

        let selected = self.source.select(&fragment, fragment.root(), vars)?;
        if selected.is_empty() {
            self.report(
                sink,
                self.missing_source,
                DiagnosticKind::MissingSource,
                &key,
                format!(
                    "Source node '{}' not found in entry '{}' of index '{}'",
                    self.source.as_str(),
                    key,
                    self.index_name()
                ),
            )?;
            return Ok(CopyOutcome::MissingSource);
        }

        let (nodes, attributes) = self.merge(target, insertion, &fragment, &selected);
        debug!(
            "Copied {} nodes and {} attributes for '{}' from index '{}'",
            nodes,
            attributes,
            key,
            self.index_name()
        );
        Ok(CopyOutcome::Copied { nodes, attributes })
    }

    /// Looks `key` up, retrying lowercased and then with a repaired
    /// explicit interface implementation key.
    fn find(&self, key: &str, sink: &dyn DiagnosticSink) -> Result<Option<Document>, IndexError> {
        if let Some(fragment) = self.index.lookup(key, sink)? {
            return Ok(Some(fragment));
        }

        if self.ignore_case {
            let lowered = key.to_lowercase();
            if lowered != key
                && let Some(fragment) = self.index.lookup(&lowered, sink)?
            {
                return Ok(Some(fragment));
            }
        }

        match eii::repair_key(key) {
            Some(repaired) => {
                debug!("Retrying '{}' as '{}'", key, repaired);
                self.index.lookup(&repaired, sink)
            }
            None => Ok(None),
        }
    }

    fn merge(
        &self,
        target: &mut Document,
        insertion: NodeId,
        fragment: &Document,
        selected: &[XNode],
    ) -> (usize, usize) {
        let mut nodes = 0;
        let mut attributes = 0;

        for &node in selected {
            match node {
                XNode::Node(id) if self.attribute && !fragment.attributes(id).is_empty() => {
                    let prefix = fragment.local_name(id).unwrap_or_default();
                    for attr in fragment.attributes(id) {
                        let name = format!("{}_{}", prefix, attr.local_name());
                        if !target.has_attribute(insertion, &name) {
                            target.set_attribute(insertion, name, attr.value.clone());
                            attributes += 1;
                        }
                    }
                }
                XNode::Node(id) => {
                    target.import(insertion, fragment, id);
                    nodes += 1;
                }
                XNode::Attribute(owner, index) => {
                    let attr = &fragment.attributes(owner)[index];
                    if !target.has_attribute(insertion, &attr.name) {
                        target.set_attribute(insertion, attr.name.clone(), attr.value.clone());
                        attributes += 1;
                    }
                }
            }
        }

        (nodes, attributes)
    }

    fn report(
        &self,
        sink: &dyn DiagnosticSink,
        level: MessageLevel,
        kind: DiagnosticKind,
        key: &str,
        message: String,
    ) -> Result<(), IndexError> {
        if let Some(severity) = level.severity() {
            sink.report(Diagnostic::new(kind, severity, message).with_key(key))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DataSource, IndexConfig};
    use crate::diagnostic::{DiagnosticCollector, Severity};
    use crate::index::{CancellationToken, InMemoryIndexedCache};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    const COMMENTS: &str = r#"<doc><members>
<member name="T:N.Widget"><summary>A widget.</summary><remarks>Round.</remarks></member>
<member name="t:n.lower"><summary>lower</summary></member>
<member name="M:N.Map`2.System#Collections#Generic#IDictionary{TKey@TValue}#Add(`0,`1)"><summary>add</summary></member>
<member name="T:N.Styled"><style color="red" size="2" /></member>
</members></doc>"#;

    fn index() -> (TempDir, Arc<dyn IndexedCache>) {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("comments.xml"), COMMENTS).unwrap();
        let index = InMemoryIndexedCache::new(
            &IndexConfig::new("comments", "/doc/members/member", "@name"),
            Variables::new(),
        )
        .unwrap();
        index
            .add_documents(
                &DataSource::new(dir.path(), "*.xml"),
                &DiagnosticCollector::new(),
                &CancellationToken::new(),
            )
            .unwrap();
        (dir, Arc::new(index))
    }

    fn topic() -> Document {
        Document::parse("<document><comments /></document>").unwrap()
    }

    fn command(index: &Arc<dyn IndexedCache>, config: CopyCommandConfig) -> CopyFromIndexCommand {
        CopyFromIndexCommand::new(Arc::clone(index), &config).unwrap()
    }

    fn copy_config(source: &str) -> CopyCommandConfig {
        CopyCommandConfig::new("comments", source, "/document/comments")
    }

    #[test]
    fn test_appends_selected_nodes() {
        let (_dir, index) = index();
        let command = command(&index, copy_config("member/*"));
        let mut target = topic();
        let vars = Variables::new().with("key", "T:N.Widget");

        let outcome = command.apply(&mut target, &vars, &DiagnosticCollector::new()).unwrap();

        assert_eq!(outcome, CopyOutcome::Copied { nodes: 2, attributes: 0 });
        assert_eq!(
            target.to_xml(),
            "<document><comments><summary>A widget.</summary><remarks>Round.</remarks></comments></document>"
        );
    }

    #[test]
    fn test_attribute_mode_prefixes_with_local_name() {
        let (_dir, index) = index();
        let mut config = copy_config("member/style");
        config.attribute = true;
        let command = command(&index, config);
        let mut target = topic();
        let vars = Variables::new().with("key", "T:N.Styled");

        let outcome = command.apply(&mut target, &vars, &DiagnosticCollector::new()).unwrap();

        assert_eq!(outcome, CopyOutcome::Copied { nodes: 0, attributes: 2 });
        assert_eq!(
            target.to_xml(),
            r#"<document><comments style_color="red" style_size="2" /></document>"#
        );
    }

    #[test]
    fn test_attribute_mode_appends_nodes_without_attributes() {
        let (_dir, index) = index();
        let mut config = copy_config("member/summary");
        config.attribute = true;
        let command = command(&index, config);
        let mut target = topic();
        let vars = Variables::new().with("key", "T:N.Widget");

        let outcome = command.apply(&mut target, &vars, &DiagnosticCollector::new()).unwrap();

        assert_eq!(outcome, CopyOutcome::Copied { nodes: 1, attributes: 0 });
    }

    #[test]
    fn test_key_expression_reads_target_document() {
        let (_dir, index) = index();
        let mut config = copy_config("member/summary");
        config.key = "/document/@id".to_string();
        let command = command(&index, config);
        let mut target =
            Document::parse(r#"<document id="T:N.Widget"><comments /></document>"#).unwrap();

        let outcome = command
            .apply(&mut target, &Variables::new(), &DiagnosticCollector::new())
            .unwrap();
        assert_eq!(outcome, CopyOutcome::Copied { nodes: 1, attributes: 0 });
    }

    #[rstest]
    #[case(false, CopyOutcome::MissingEntry)]
    #[case(true, CopyOutcome::Copied { nodes: 1, attributes: 0 })]
    fn test_ignore_case_retries_lowercased(#[case] ignore_case: bool, #[case] expected: CopyOutcome) {
        let (_dir, index) = index();
        let mut config = copy_config("member/summary");
        config.ignore_case = ignore_case;
        let command = command(&index, config);
        let mut target = topic();
        let vars = Variables::new().with("key", "T:N.Lower");

        let outcome = command.apply(&mut target, &vars, &DiagnosticCollector::new()).unwrap();
        assert_eq!(outcome, expected);
    }

    #[test]
    fn test_repairs_broken_eii_key() {
        let (_dir, index) = index();
        let command = command(&index, copy_config("member/summary"));
        let mut target = topic();
        let vars = Variables::new().with(
            "key",
            "M:N.Map`2.System#Collections#Generic#IDictionary{K,V}#Add(`0,`1)",
        );

        let outcome = command.apply(&mut target, &vars, &DiagnosticCollector::new()).unwrap();
        assert_eq!(outcome, CopyOutcome::Copied { nodes: 1, attributes: 0 });
    }

    #[rstest]
    #[case(MessageLevel::Ignore, None)]
    #[case(MessageLevel::Info, Some(Severity::Info))]
    #[case(MessageLevel::Warn, Some(Severity::Warning))]
    #[case(MessageLevel::Error, Some(Severity::Error))]
    fn test_missing_entry_level(#[case] level: MessageLevel, #[case] expected: Option<Severity>) {
        let (_dir, index) = index();
        let mut config = copy_config("member/summary");
        config.missing_entry = level;
        let command = command(&index, config);
        let mut target = topic();
        let before = target.to_xml();
        let sink = DiagnosticCollector::new();
        let vars = Variables::new().with("key", "T:N.Nothing");

        let outcome = command.apply(&mut target, &vars, &sink).unwrap();

        assert_eq!(outcome, CopyOutcome::MissingEntry);
        assert_eq!(target.to_xml(), before);
        let severities: Vec<Severity> = sink.diagnostics().iter().map(|d| d.severity).collect();
        assert_eq!(severities, expected.into_iter().collect::<Vec<_>>());
    }

    #[test]
    fn test_missing_target() {
        let (_dir, index) = index();
        let mut config = CopyCommandConfig::new("comments", "member/summary", "/document/nowhere");
        config.missing_target = MessageLevel::Warn;
        let command = command(&index, config);
        let mut target = topic();
        let sink = DiagnosticCollector::new();
        let vars = Variables::new().with("key", "T:N.Widget");

        let outcome = command.apply(&mut target, &vars, &sink).unwrap();

        assert_eq!(outcome, CopyOutcome::MissingTarget);
        assert_eq!(sink.count_kind(DiagnosticKind::MissingTarget), 1);
        assert_eq!(sink.count(Severity::Warning), 1);
    }

    #[test]
    fn test_missing_source_is_silent_by_default() {
        let (_dir, index) = index();
        let command = command(&index, copy_config("member/example"));
        let mut target = topic();
        let before = target.to_xml();
        let sink = DiagnosticCollector::new();
        let vars = Variables::new().with("key", "T:N.Widget");

        let outcome = command.apply(&mut target, &vars, &sink).unwrap();

        assert_eq!(outcome, CopyOutcome::MissingSource);
        assert_eq!(target.to_xml(), before);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_escalated_missing_entry_propagates() {
        let (_dir, index) = index();
        let mut config = copy_config("member/summary");
        config.missing_entry = MessageLevel::Error;
        let command = command(&index, config);
        let mut target = topic();
        let vars = Variables::new().with("key", "T:N.Nothing");

        let result = command.apply(&mut target, &vars, &DiagnosticCollector::escalating());
        assert!(matches!(result, Err(IndexError::Escalated(_))));
    }

    #[test]
    fn test_index_name_mismatch() {
        let (_dir, index) = index();
        let config = CopyCommandConfig::new("other", "*", "/");
        assert!(CopyFromIndexCommand::new(index, &config).is_err());
    }

    #[test]
    fn test_undefined_key_variable_is_error() {
        let (_dir, index) = index();
        let command = command(&index, copy_config("member/summary"));
        let mut target = topic();

        let result = command.apply(&mut target, &Variables::new(), &DiagnosticCollector::new());
        assert!(matches!(result, Err(IndexError::XPath(_))));
    }
}
