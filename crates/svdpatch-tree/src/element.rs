use indexmap::IndexMap;

/// One node of a mutable, order-preserving SVD element tree.
///
/// Leaf elements (`name`, `description`, `bitOffset`, ...) carry `text` and no
/// children; container elements (`register`, `field`, `peripheral`, ...) carry
/// children and ordinarily no meaningful text of their own. Interior XML
/// comments are dropped at parse time; nothing in the patch language
/// addresses them and the schema normaliser strips them anyway.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub tag: String,
    pub attributes: IndexMap<String, String>,
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Element {
            tag: tag.into(),
            attributes: IndexMap::new(),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn with_text(tag: impl Into<String>, text: impl Into<String>) -> Self {
        let mut el = Self::new(tag);
        el.text = Some(text.into());
        el
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn remove_attr(&mut self, key: &str) -> Option<String> {
        self.attributes.shift_remove(key)
    }

    /// First direct child with the given tag.
    pub fn child(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.tag == tag)
    }

    pub fn child_mut(&mut self, tag: &str) -> Option<&mut Element> {
        self.children.iter_mut().find(|c| c.tag == tag)
    }

    /// All direct children with the given tag, in document order.
    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    pub fn children_named_mut<'a>(
        &'a mut self,
        tag: &'a str,
    ) -> impl Iterator<Item = &'a mut Element> + 'a {
        self.children.iter_mut().filter(move |c| c.tag == tag)
    }

    /// Text of the first direct child with the given tag, mirroring
    /// `Element.findtext`.
    pub fn find_text(&self, tag: &str) -> Option<&str> {
        self.child(tag).and_then(|c| c.text.as_deref())
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
    }

    /// Set the text of the first direct child with `tag`, creating the child
    /// if it doesn't already exist (mirrors the common
    /// `tag = ET.SubElement(parent, key); tag.text = value` idiom).
    pub fn set_child_text(&mut self, tag: &str, value: impl Into<String>) {
        if let Some(child) = self.child_mut(tag) {
            child.set_text(value);
        } else {
            self.children.push(Element::with_text(tag, value));
        }
    }

    pub fn append(&mut self, child: Element) -> &mut Element {
        self.children.push(child);
        self.children.last_mut().expect("just pushed")
    }

    /// Find the first direct child with `tag`, or append and return a new
    /// empty one.
    pub fn ensure_child(&mut self, tag: &str) -> &mut Element {
        if self.child(tag).is_none() {
            self.children.push(Element::new(tag));
        }
        self.child_mut(tag).expect("just ensured")
    }

    /// Remove and return the first direct child with the given tag.
    pub fn remove_child(&mut self, tag: &str) -> Option<Element> {
        let idx = self.children.iter().position(|c| c.tag == tag)?;
        Some(self.children.remove(idx))
    }

    /// Remove and return all direct children with the given tag, preserving
    /// their relative order.
    pub fn remove_children(&mut self, tag: &str) -> Vec<Element> {
        let mut removed = Vec::new();
        let mut i = 0;
        while i < self.children.len() {
            if self.children[i].tag == tag {
                removed.push(self.children.remove(i));
            } else {
                i += 1;
            }
        }
        removed
    }

    /// Remove and return every direct child for which `predicate` is true.
    pub fn remove_matching<F: FnMut(&Element) -> bool>(&mut self, mut predicate: F) -> Vec<Element> {
        let mut removed = Vec::new();
        let mut i = 0;
        while i < self.children.len() {
            if predicate(&self.children[i]) {
                removed.push(self.children.remove(i));
            } else {
                i += 1;
            }
        }
        removed
    }

    /// Depth-first pre-order search for every descendant (including `self`)
    /// with the given tag, mirroring `Element.iter(tag)`.
    pub fn iter_tag<'a>(&'a self, tag: &str) -> Vec<&'a Element> {
        let mut out = Vec::new();
        self.walk_tag(tag, &mut out);
        out
    }

    fn walk_tag<'a>(&'a self, tag: &str, out: &mut Vec<&'a Element>) {
        if self.tag == tag {
            out.push(self);
        }
        for child in &self.children {
            child.walk_tag(tag, out);
        }
    }

    /// Call `f` on every descendant (including `self`) with the given tag,
    /// depth-first pre-order, with mutable access.
    pub fn for_each_tag_mut<F: FnMut(&mut Element)>(&mut self, tag: &str, f: &mut F) {
        if self.tag == tag {
            f(self);
        }
        for child in &mut self.children {
            child.for_each_tag_mut(tag, f);
        }
    }

    /// Structural copy, used for peripheral/register `_derive` and `_copy`.
    pub fn deep_clone(&self) -> Element {
        self.clone()
    }
}
