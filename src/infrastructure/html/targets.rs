use crate::utils::{PackError, Result};
use html5ever::LocalName;
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Element names the HTML parser knows about. Custom targets must use one of them.
static KNOWN_TAGS: Lazy<HashSet<&'static str>> = Lazy::new(|| TAG_NAMES.iter().copied().collect());

const TAG_NAMES: &[&str] = &[
    "a", "abbr", "acronym", "address", "applet", "area", "article", "aside", "audio", "b",
    "base", "basefont", "bdi", "bdo", "bgsound", "big", "blink", "blockquote", "body", "br",
    "button", "canvas", "caption", "center", "cite", "code", "col", "colgroup", "command",
    "data", "datalist", "dd", "del", "details", "dfn", "dialog", "dir", "div", "dl", "dt",
    "em", "embed", "fieldset", "figcaption", "figure", "font", "footer", "form", "frame",
    "frameset", "h1", "h2", "h3", "h4", "h5", "h6", "head", "header", "hgroup", "hr", "html",
    "i", "iframe", "image", "img", "input", "ins", "isindex", "kbd", "keygen", "label",
    "legend", "li", "link", "listing", "main", "map", "mark", "marquee", "math", "menu",
    "menuitem", "meta", "meter", "nav", "nobr", "noembed", "noframes", "noscript", "object",
    "ol", "optgroup", "option", "output", "p", "param", "picture", "plaintext", "pre",
    "progress", "q", "rb", "rp", "rt", "rtc", "ruby", "s", "samp", "script", "search",
    "section", "select", "slot", "small", "source", "span", "strike", "strong", "style", "sub",
    "summary", "sup", "svg", "table", "tbody", "td", "template", "textarea", "tfoot", "th",
    "thead", "time", "title", "tr", "track", "tt", "u", "ul", "var", "video", "wbr", "xmp",
];

/// Which attribute of which element carries an asset reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetMap {
    targets: HashMap<LocalName, LocalName>,
}

impl TargetMap {
    /// `script src`, `link href` and `img src`
    pub fn new() -> Self {
        let targets = [("script", "src"), ("link", "href"), ("img", "src")]
            .into_iter()
            .map(|(tag, attr)| (LocalName::from(tag), LocalName::from(attr)))
            .collect();
        Self { targets }
    }

    /// Also treat `a href` as an asset reference
    pub fn with_anchors(mut self) -> Self {
        self.targets.insert(LocalName::from("a"), LocalName::from("href"));
        self
    }

    /// Build a map from configured tag → attribute pairs.
    ///
    /// Tag names are case-insensitive and must name a known HTML element.
    pub fn from_config(config: &BTreeMap<String, String>) -> Result<Self> {
        let mut targets = HashMap::with_capacity(config.len());
        for (tag, attribute) in config {
            let tag = tag.to_ascii_lowercase();
            if !KNOWN_TAGS.contains(tag.as_str()) {
                return Err(PackError::InvalidTag(tag));
            }
            if attribute.is_empty() {
                return Err(PackError::config(format!("no attribute configured for <{}>", tag)));
            }
            targets.insert(LocalName::from(tag), LocalName::from(attribute.to_ascii_lowercase()));
        }
        Ok(Self { targets })
    }

    /// Attribute holding the reference for elements named `tag`
    pub fn attribute_for(&self, tag: &LocalName) -> Option<&LocalName> {
        self.targets.get(tag)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl Default for TargetMap {
    fn default() -> Self {
        Self::new()
    }
}
