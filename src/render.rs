use crate::level::DocumentSummary;
use crate::store::{DocId, DocumentStore, TOP_LEVEL};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Where the navigator is being rendered. Affects link construction only;
/// the level computation is identical in both modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    /// Dedicated navigator screen.
    Standalone,
    /// Injected into the default document list screen.
    Embedded,
}

impl ViewMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "standalone" => Some(ViewMode::Standalone),
            "embedded" => Some(ViewMode::Embedded),
            _ => None,
        }
    }
}

/// Builds every URL the navigator emits. One instance per view request.
#[derive(Debug, Clone)]
pub struct LinkBuilder {
    base_url: String,
    mode: ViewMode,
}

impl LinkBuilder {
    pub fn new(base_url: impl Into<String>, mode: ViewMode) -> Self {
        LinkBuilder {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            mode,
        }
    }

    /// Level view with `parent` as the selected parent. Drilling in through
    /// this link replaces the whole current level and implicitly resets
    /// pagination to page 1.
    pub fn level_url(&self, parent: DocId) -> String {
        match self.mode {
            ViewMode::Standalone => format!("{}/navigator?parent={}", self.base_url, parent),
            ViewMode::Embedded => {
                format!("{}/documents?navigator=1&parent={}", self.base_url, parent)
            }
        }
    }

    pub fn page_url(&self, parent: DocId, page: usize) -> String {
        format!("{}&paged={}", self.level_url(parent), page)
    }

    pub fn edit_url(&self, id: DocId) -> String {
        format!("{}/documents/{}/edit", self.base_url, id)
    }

    pub fn view_url(&self, id: DocId) -> String {
        format!("{}/documents/{}", self.base_url, id)
    }

    pub fn delete_url(&self, id: DocId) -> String {
        format!("{}/documents/{}/delete", self.base_url, id)
    }
}

/// Renderable description of one tree node. Pure data; carries everything the
/// client needs so rendering never consults the store again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDescriptor {
    pub id: DocId,
    pub title: String,
    pub status: String,
    pub status_label: String,
    /// Toggle affordance is shown iff this is true.
    pub has_children: bool,
    pub child_count: usize,
    pub child_count_label: Option<String>,
    pub edit_url: String,
    pub view_url: String,
    pub show_as_parent_url: String,
    pub delete_url: String,
}

/// Pure transform from a level item to its renderable descriptor.
pub fn render_node(summary: &DocumentSummary, links: &LinkBuilder) -> NodeDescriptor {
    let child_count_label = summary.has_children.then(|| {
        if summary.child_count == 1 {
            "1 child".to_string()
        } else {
            format!("{} children", summary.child_count)
        }
    });
    NodeDescriptor {
        id: summary.id,
        title: summary.title.clone(),
        status: summary.status.as_str().to_string(),
        status_label: summary.status.label().to_string(),
        has_children: summary.has_children,
        child_count: summary.child_count,
        child_count_label,
        edit_url: links.edit_url(summary.id),
        view_url: links.view_url(summary.id),
        show_as_parent_url: links.level_url(summary.id),
        delete_url: links.delete_url(summary.id),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Crumb {
    pub id: DocId,
    pub title: String,
    pub url: String,
}

/// Breadcrumb trail from the forest root down to `parent` inclusive,
/// recomputed on every request. `parent = 0` yields the single "Top level"
/// crumb.
pub fn breadcrumbs(store: &dyn DocumentStore, links: &LinkBuilder, parent: DocId) -> Vec<Crumb> {
    if parent == TOP_LEVEL {
        return vec![Crumb {
            id: TOP_LEVEL,
            title: "Top level".to_string(),
            url: links.level_url(TOP_LEVEL),
        }];
    }
    let mut chain = store.ancestors_of(parent);
    chain.push(parent);
    chain
        .into_iter()
        .filter_map(|id| store.get(id))
        .map(|doc| Crumb {
            url: links.level_url(doc.id),
            id: doc.id,
            title: doc.title,
        })
        .collect()
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub const EMPTY_CHILDREN_HTML: &str = "<li class=\"pn-empty\">No child pages</li>";

fn write_node(out: &mut String, node: &NodeDescriptor) {
    let _ = write!(out, "<li class=\"pn-item\" data-id=\"{}\">", node.id);
    out.push_str("<div class=\"pn-row\">");
    if node.has_children {
        let _ = write!(
            out,
            "<button type=\"button\" class=\"pn-toggle\" aria-expanded=\"false\" \
             aria-controls=\"pn-children-{}\">+</button>",
            node.id
        );
    } else {
        out.push_str("<span class=\"pn-spacer\"></span>");
    }
    let _ = write!(
        out,
        "<span class=\"pn-title\"><a href=\"{}\">{}</a></span>",
        escape(&node.edit_url),
        escape(&node.title)
    );
    out.push_str("<span class=\"pn-meta\">");
    let _ = write!(
        out,
        "<span class=\"pn-status pn-status-{}\">{}</span>",
        escape(&node.status),
        escape(&node.status_label)
    );
    let _ = write!(
        out,
        " · <a href=\"{}\">View</a> · <a href=\"{}\">Show as parent</a> \
         · <a href=\"{}\" class=\"pn-delete\">Delete</a>",
        escape(&node.view_url),
        escape(&node.show_as_parent_url),
        escape(&node.delete_url)
    );
    out.push_str("</span>");
    if let Some(label) = &node.child_count_label {
        let _ = write!(out, "<span class=\"pn-count\">{}</span>", escape(label));
    }
    out.push_str("</div>");
    if node.has_children {
        let _ = write!(
            out,
            "<ul class=\"pn-level pn-children\" id=\"pn-children-{}\" \
             data-loaded=\"0\" data-parent=\"{}\"></ul>",
            node.id, node.id
        );
    }
    out.push_str("</li>");
}

/// HTML fragment for the child-fetch response: one `<li>` per node, or the
/// explicit empty marker when the level has no children.
pub fn children_fragment(nodes: &[NodeDescriptor]) -> String {
    if nodes.is_empty() {
        return EMPTY_CHILDREN_HTML.to_string();
    }
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, node);
    }
    out
}
