//! Structured writer for Terraform configuration.
//!
//! Configuration is assembled as a tree of blocks and attributes and then
//! serialized in one place. The `*_if_set` builders drop empty values, so an
//! unset option never produces a line in the output.

use std::fmt::Write as _;

const INDENT: &str = "  ";

/// Attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    String(String),
    Bool(bool),
    Number(i64),
    List(Vec<Value>),
    /// Multi-line literal written as a heredoc.
    Heredoc(String),
    /// Raw expression, e.g. `module.controllers.kubeconfig`.
    Expression(String),
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    Attribute { key: String, value: Value },
    Block(Block),
    Comment(String),
    Blank,
}

/// Ordered list of attributes and blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Body {
    items: Vec<Item>,
}

impl Body {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items
            .iter()
            .all(|item| matches!(item, Item::Blank))
    }

    /// Always emit `key = value`.
    pub fn attr(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.items.push(Item::Attribute {
            key: key.to_string(),
            value: value.into(),
        });
        self
    }

    /// Emit a raw expression.
    pub fn expr(&mut self, key: &str, expression: &str) -> &mut Self {
        self.attr(key, Value::Expression(expression.to_string()))
    }

    /// Emit a string unless it is empty.
    pub fn string_if_set(&mut self, key: &str, value: &str) -> &mut Self {
        if !value.is_empty() {
            self.attr(key, value);
        }
        self
    }

    /// Emit a number unless it is zero.
    pub fn number_if_set(&mut self, key: &str, value: i64) -> &mut Self {
        if value != 0 {
            self.attr(key, value);
        }
        self
    }

    /// Always emit a list of strings.
    pub fn list(&mut self, key: &str, values: &[String]) -> &mut Self {
        let items = values.iter().cloned().map(Value::String).collect();
        self.attr(key, Value::List(items))
    }

    /// Emit a list of strings unless it is empty.
    pub fn list_if_set(&mut self, key: &str, values: &[String]) -> &mut Self {
        if !values.is_empty() {
            self.list(key, values);
        }
        self
    }

    /// Emit a list of heredoc literals unless it is empty.
    pub fn heredocs_if_set(&mut self, key: &str, values: &[String]) -> &mut Self {
        if !values.is_empty() {
            let items = values.iter().cloned().map(Value::Heredoc).collect();
            self.attr(key, Value::List(items));
        }
        self
    }

    pub fn block(&mut self, block: Block) -> &mut Self {
        self.items.push(Item::Block(block));
        self
    }

    pub fn comment(&mut self, text: &str) -> &mut Self {
        self.items.push(Item::Comment(text.to_string()));
        self
    }

    /// Separate groups of attributes. Repeated and trailing blanks collapse.
    pub fn blank(&mut self) -> &mut Self {
        self.items.push(Item::Blank);
        self
    }

    /// Serialize as a top-level document.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.write(&mut out, 0);
        out
    }

    /// Serialize with every line indented by `level` steps.
    #[must_use]
    pub fn render_indented(&self, level: usize) -> String {
        let mut out = String::new();
        self.write(&mut out, level);
        out
    }

    fn write(&self, out: &mut String, level: usize) {
        let mut wrote_any = false;
        let mut pending_blank = false;
        let mut after_comment = false;

        for item in &self.items {
            match item {
                Item::Blank => {
                    pending_blank = wrote_any;
                    continue;
                }
                // A comment stays attached to the block that follows it.
                Item::Block(_) if wrote_any && !after_comment => pending_blank = true,
                _ => {}
            }

            if pending_blank {
                out.push('\n');
                pending_blank = false;
            }
            wrote_any = true;
            after_comment = matches!(item, Item::Comment(_));

            let pad = INDENT.repeat(level);
            match item {
                Item::Attribute { key, value } => {
                    let _ = write!(out, "{pad}{key} = ");
                    write_value(out, value, level);
                    out.push('\n');
                }
                Item::Block(block) => block.write(out, level),
                Item::Comment(text) => {
                    let _ = writeln!(out, "{pad}# {text}");
                }
                Item::Blank => {}
            }
        }
    }
}

/// A block such as `module "controllers" { ... }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    ident: String,
    labels: Vec<String>,
    body: Body,
}

impl Block {
    #[must_use]
    pub fn new(ident: &str) -> Self {
        Self {
            ident: ident.to_string(),
            labels: Vec::new(),
            body: Body::new(),
        }
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    pub fn body(&mut self) -> &mut Body {
        &mut self.body
    }

    fn write(&self, out: &mut String, level: usize) {
        let pad = INDENT.repeat(level);
        out.push_str(&pad);
        out.push_str(&self.ident);
        for label in &self.labels {
            out.push(' ');
            write_string(out, label);
        }

        if self.body.is_empty() {
            out.push_str(" {}\n");
            return;
        }

        out.push_str(" {\n");
        self.body.write(out, level + 1);
        let _ = writeln!(out, "{pad}}}");
    }
}

fn write_value(out: &mut String, value: &Value, level: usize) {
    match value {
        Value::String(s) => write_string(out, s),
        Value::Bool(b) => {
            let _ = write!(out, "{b}");
        }
        Value::Number(n) => {
            let _ = write!(out, "{n}");
        }
        Value::Expression(e) => out.push_str(e),
        Value::Heredoc(text) => write_heredoc(out, text),
        Value::List(items) if items.is_empty() => out.push_str("[]"),
        Value::List(items) => {
            let inner = INDENT.repeat(level + 1);
            out.push_str("[\n");
            for item in items {
                out.push_str(&inner);
                write_value(out, item, level + 1);
                if matches!(item, Value::Heredoc(_)) {
                    out.push_str(&inner);
                }
                out.push_str(",\n");
            }
            out.push_str(&INDENT.repeat(level));
            out.push(']');
        }
    }
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '$' | '%' if chars.peek() == Some(&'{') => {
                out.push(c);
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

/// Double `${` and `%{` so terraform keeps them literal.
fn write_template_literal(out: &mut String, s: &str) {
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if matches!(c, '$' | '%') && chars.peek() == Some(&'{') {
            out.push(c);
        }
        out.push(c);
    }
}

/// Heredoc body ends with a newline followed by the delimiter, which must not
/// appear as a line of the content.
fn write_heredoc(out: &mut String, text: &str) {
    let mut delimiter = "EOF".to_string();
    let mut n = 0;
    while text.lines().any(|line| line.trim() == delimiter) {
        n += 1;
        delimiter = format!("EOF{n}");
    }

    let _ = writeln!(out, "<<{delimiter}");
    write_template_literal(out, text.trim_end_matches('\n'));
    out.push('\n');
    out.push_str(&delimiter);
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_rendering() {
        let mut module = Block::new("module").label("controllers");
        module
            .body()
            .attr("source", "../modules/tinkerbell")
            .blank()
            .attr("enable_aggregation", true)
            .number_if_set("network_mtu", 1480)
            .list("ip_addresses", &["10.0.0.1".to_string(), "10.0.0.2".to_string()]);

        let mut doc = Body::new();
        doc.block(module);

        assert_eq!(
            doc.render(),
            r#"module "controllers" {
  source = "../modules/tinkerbell"

  enable_aggregation = true
  network_mtu = 1480
  ip_addresses = [
    "10.0.0.1",
    "10.0.0.2",
  ]
}
"#
        );
    }

    #[test]
    fn test_empty_optional_values_are_omitted() {
        let mut body = Body::new();
        body.string_if_set("os_channel", "")
            .number_if_set("network_mtu", 0)
            .list_if_set("labels", &[])
            .heredocs_if_set("clc_snippets", &[])
            .blank();

        assert!(body.is_empty());
        assert_eq!(body.render(), "");
    }

    #[test]
    fn test_blank_lines_collapse() {
        let mut body = Body::new();
        body.blank()
            .attr("a", "1")
            .blank()
            .blank()
            .string_if_set("b", "")
            .blank()
            .attr("c", "3")
            .blank();

        assert_eq!(body.render(), "a = \"1\"\n\nc = \"3\"\n");
    }

    #[test]
    fn test_blocks_are_separated() {
        let mut body = Body::new();
        body.block(Block::new("provider").label("ct"));
        body.block(Block::new("provider").label("tls"));

        assert_eq!(body.render(), "provider \"ct\" {}\n\nprovider \"tls\" {}\n");
    }

    #[test]
    fn test_comment_attaches_to_next_block() {
        let mut body = Body::new();
        body.block(Block::new("provider").label("ct"))
            .blank()
            .comment("Marker.")
            .block(Block::new("output").label("initialized"));

        assert_eq!(
            body.render(),
            "provider \"ct\" {}\n\n# Marker.\noutput \"initialized\" {}\n"
        );
    }

    #[test]
    fn test_string_escaping() {
        let mut body = Body::new();
        body.attr("v", "say \"hi\" \\ ${x} %{y} $z\nnext");
        assert_eq!(
            body.render(),
            "v = \"say \\\"hi\\\" \\\\ $${x} %%{y} $z\\nnext\"\n"
        );
    }

    #[test]
    fn test_heredoc_list() {
        let mut body = Body::new();
        body.heredocs_if_set("clc_snippets", &["storage:\n  files: []\n".to_string()]);

        assert_eq!(
            body.render(),
            "clc_snippets = [\n  <<EOF\nstorage:\n  files: []\nEOF\n  ,\n]\n"
        );
    }

    #[test]
    fn test_heredoc_keeps_interpolation_literal() {
        let mut body = Body::new();
        body.heredocs_if_set(
            "clc_snippets",
            &["run: echo ${HOME} %{if x}\ncost: $5 and 100%\n".to_string()],
        );

        assert_eq!(
            body.render(),
            "clc_snippets = [\n  <<EOF\nrun: echo $${HOME} %%{if x}\ncost: $5 and 100%\nEOF\n  ,\n]\n"
        );
    }

    #[test]
    fn test_heredoc_delimiter_avoids_content() {
        let mut out = String::new();
        write_heredoc(&mut out, "line\nEOF\n");
        assert_eq!(out, "<<EOF1\nline\nEOF\nEOF1\n");
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let build = || {
            let mut block = Block::new("backend").label("s3");
            block.body().attr("bucket", "b").string_if_set("key", "k");
            let mut body = Body::new();
            body.block(block);
            body.render()
        };
        assert_eq!(build(), build());
    }
}
