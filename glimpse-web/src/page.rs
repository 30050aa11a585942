//! The static host page and its mount-point containers.
//!
//! A [`Mount`] is detached from the page by the container's `id`, filled by
//! exactly one job, and attached back, which splices its fragments into the
//! container. Prepended fragments land right after the start tag, appended
//! ones right before the end tag, so existing children stay in between.
use regex::Regex;
use std::sync::LazyLock;

static START_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"<([A-Za-z][A-Za-z0-9-]*)(?:\s[^>]*?)?\sid\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>/]+))[^>]*>"#,
    )
    .expect("start tag pattern")
});

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// New children collected for one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    id: String,
    front: Vec<String>,
    back: Vec<String>,
}

impl Mount {
    /// A mount not tied to any page, for rendering fragments standalone.
    pub fn detached(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            front: Vec::new(),
            back: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Add `html` after everything rendered so far.
    pub fn append(&mut self, html: String) {
        self.back.push(html);
    }

    /// Add `html` before everything, including the container's existing children.
    pub fn prepend(&mut self, html: String) {
        self.front.insert(0, html);
    }

    /// New children in display order (existing children sit between front and back).
    pub fn fragments(&self) -> Vec<&str> {
        self.front
            .iter()
            .chain(self.back.iter())
            .map(String::as_str)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.front.len() + self.back.len()
    }

    pub fn is_empty(&self) -> bool {
        self.front.is_empty() && self.back.is_empty()
    }
}

/// Byte offsets of a container's inner content: `(after start tag, before end tag)`.
fn locate(html: &str, id: &str) -> Option<(usize, usize)> {
    let caps = START_TAG.captures_iter(html).find(|caps| {
        caps.get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .is_some_and(|m| m.as_str() == id)
    })?;
    let whole = caps.get(0)?;
    let tag = caps.get(1)?.as_str().to_ascii_lowercase();
    if VOID_ELEMENTS.contains(&tag.as_str()) || whole.as_str().ends_with("/>") {
        return None;
    }

    let inner_start = whole.end();
    let tags = Regex::new(&format!(r"(?i)<(/?){}[\s/>]", regex::escape(&tag))).ok()?;
    let mut depth = 1usize;
    for m in tags.captures_iter(&html[inner_start..]) {
        let closing = m.get(1).is_some_and(|c| !c.as_str().is_empty());
        if closing {
            depth -= 1;
            if depth == 0 {
                let end = inner_start + m.get(0)?.start();
                return Some((inner_start, end));
            }
        } else {
            depth += 1;
        }
    }
    None
}

/// The page being enriched.
#[derive(Debug, Clone)]
pub struct HostPage {
    html: String,
}

impl HostPage {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    pub fn has_mount(&self, id: &str) -> bool {
        locate(&self.html, id).is_some()
    }

    /// Detach the container with `id`; `None` when the page has no such
    /// container (or it cannot hold children).
    pub fn detach(&self, id: &str) -> Option<Mount> {
        locate(&self.html, id).map(|_| Mount::detached(id))
    }

    /// Splice a filled mount back into the page. Returns false when the
    /// container is gone.
    pub fn attach(&mut self, mount: Mount) -> bool {
        self.attach_all(vec![mount]).first().copied().unwrap_or(false)
    }

    /// Splice several filled mounts back, reporting per mount (in input order)
    /// whether its container was found.
    ///
    /// All containers are located before anything is inserted, and blocks go
    /// in from the end of the page backwards, so inserted markup is never
    /// scanned for container tags.
    pub fn attach_all(&mut self, mounts: Vec<Mount>) -> Vec<bool> {
        let spans: Vec<Option<(usize, usize)>> =
            mounts.iter().map(|mount| locate(&self.html, &mount.id)).collect();

        // (offset, rank, block); rank 0 = appended block, 1 = prepended block
        let mut splices: Vec<(usize, u8, String)> = Vec::new();
        for (mount, span) in mounts.iter().zip(&spans) {
            let Some((inner_start, inner_end)) = *span else {
                continue;
            };
            if !mount.back.is_empty() {
                splices.push((inner_end, 0, format!("\n{}\n", mount.back.join("\n"))));
            }
            if !mount.front.is_empty() {
                splices.push((inner_start, 1, format!("\n{}", mount.front.join("\n"))));
            }
        }
        // At a shared offset the appended block goes in first so the
        // prepended one ends up ahead of it.
        splices.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        for (at, _, block) in splices {
            self.html.insert_str(at, &block);
        }

        spans.iter().map(Option::is_some).collect()
    }

    pub fn as_str(&self) -> &str {
        &self.html
    }

    pub fn into_html(self) -> String {
        self.html
    }
}
