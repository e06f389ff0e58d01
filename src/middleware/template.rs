//! HTML page of the statistics viewer.
//!
//! Every value that reaches the page goes through [`Escaped`], so a slot can
//! only be filled with text that has already been HTML-escaped.

use crate::aggregator::SortKey;
use std::fmt::{self, Write};

/// Escape text for use in HTML element content and quoted attributes
pub fn escape_html(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            '\'' => output.push_str("&#x27;"),
            _ => output.push(ch),
        }
    }
    output
}

/// HTML-escaped text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Escaped(String);

impl Escaped {
    pub fn text(raw: &str) -> Self {
        Self(escape_html(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Escaped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Slots of the viewer page
#[derive(Debug, Clone)]
pub struct ViewerPage {
    pub prefix: Escaped,
    pub request_id: Escaped,
    pub request_path_prefix: Escaped,
    pub node_thres: Escaped,
    pub edge_thres: Escaped,
    pub tree_query: Escaped,
    pub sort: SortKey,
    pub stats_dump: Escaped,
}

impl ViewerPage {
    pub fn render(&self) -> String {
        let mut options = String::new();
        for key in SortKey::ALL {
            let selected = if key == self.sort { " selected=\"selected\"" } else { "" };
            // Writing to a String cannot fail
            let _ = writeln!(
                options,
                "                <option value=\"{}\"{}>{}</option>",
                key.as_str(),
                selected,
                key.description()
            );
        }

        format!(
            r#"<!doctype html>
<html>
  <head>
    <meta charset="UTF-8">
    <title>Request Profiler</title>
  </head>
  <body>
    <div style="float: right; border: 1px solid #444; margin: 8px; padding: 4px">
      <a href="{prefix}/tree.png?{tree_query}"><img src="{prefix}/tree.png?{tree_query}" style="width: 300px"></a>
    </div>
    <form method="GET" action="{prefix}/">
      <table>
        <tbody>
          <tr>
            <td>Request ID:</td>
            <td><input type="text" name="request_id" value="{request_id}" placeholder=""></td>
          </tr>
          <tr>
            <td>Request path prefix:</td>
            <td><input type="text" name="request_path_prefix" value="{request_path_prefix}" placeholder="/"></td>
          </tr>
          <tr>
            <td>Sort order:</td>
            <td>
              <select name="sort">
{options}              </select>
            </td>
          </tr>
          <tr>
            <td>Node threshold (%):</td>
            <td><input type="text" name="node_thres" value="{node_thres}"></td>
          </tr>
          <tr>
            <td>Edge threshold (%):</td>
            <td><input type="text" name="edge_thres" value="{edge_thres}"></td>
          </tr>
        </tbody>
      </table>
      <input type="submit" value="Refresh">
    </form>
    <pre>{stats_dump}</pre>
  </body>
</html>
"#,
            prefix = self.prefix,
            tree_query = self.tree_query,
            request_id = self.request_id,
            request_path_prefix = self.request_path_prefix,
            options = options,
            node_thres = self.node_thres,
            edge_thres = self.edge_thres,
            stats_dump = self.stats_dump,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> ViewerPage {
        ViewerPage {
            prefix: Escaped::text("/__profile__"),
            request_id: Escaped::default(),
            request_path_prefix: Escaped::default(),
            node_thres: Escaped::text("0.5"),
            edge_thres: Escaped::text("0.1"),
            tree_query: Escaped::text("request_path_prefix=&node_thres=0.5&edge_thres=0.1"),
            sort: SortKey::InternalTime,
            stats_dump: Escaped::text("dump"),
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<script>alert("x & 'y'")</script>"#),
            "&lt;script&gt;alert(&quot;x &amp; &#x27;y&#x27;&quot;)&lt;/script&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_selected_sort_option() {
        let html = page().render();
        assert!(html.contains(r#"<option value="tottime" selected="selected">internal time</option>"#));
        assert!(html.contains(r#"<option value="cumtime">cumulative time</option>"#));
        assert_eq!(html.matches("selected=\"selected\"").count(), 1);
    }

    #[test]
    fn test_tree_link_is_attribute_escaped() {
        let html = page().render();
        assert!(html.contains(
            r#"<img src="/__profile__/tree.png?request_path_prefix=&amp;node_thres=0.5&amp;edge_thres=0.1""#
        ));
        assert!(html.contains(r#"<form method="GET" action="/__profile__/">"#));
    }

    #[test]
    fn test_hostile_values_stay_inert() {
        let mut page = page();
        page.request_path_prefix = Escaped::text(r#""><script>x()</script>"#);
        page.stats_dump = Escaped::text("<b>bold</b>");
        let html = page.render();

        assert!(!html.contains("<script>"));
        assert!(!html.contains("<b>"));
        assert!(html.contains("&lt;b&gt;bold&lt;/b&gt;"));
    }
}
