//! In-memory page rendered from a test model.
//!
//! A [`FixtureSite`] renders HTML for the current URL and reacts to clicks and fills by
//! mutating its own state; the page re-renders after every interaction. Element handles
//! survive re-renders that leave the markup unchanged and go stale otherwise, the same
//! way detached DOM nodes do in a real browser.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::Mutex;
use scraper::{ElementRef as HtmlElement, Html, Selector};

use crate::error::{AdapterError, AdapterErrorKind};
use crate::page::{collapse_whitespace, CookieInfo, ElementRef, Page};

/// A scripted website backing a [`FixturePage`].
pub trait FixtureSite: Send + 'static {
    fn render(&self, url: &str) -> String;

    /// Handle a click; returning a URL navigates there.
    fn on_click(&mut self, _url: &str, _target: &FixtureTarget) -> Option<String> {
        None
    }

    fn on_fill(&mut self, _url: &str, _target: &FixtureTarget, _value: &str) {}

    fn on_navigate(&mut self, _url: &str) {}

    /// Refuse an interaction before it reaches the site, as a flaky renderer would.
    fn interaction_fault(&mut self, _target: &FixtureTarget) -> Option<AdapterError> {
        None
    }

    fn cookies(&self) -> Vec<CookieInfo> {
        Vec::new()
    }

    fn local_storage_keys(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Snapshot of the element an interaction landed on.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FixtureTarget {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub text: String,
    /// Attributes of enclosing elements, nearest first.
    pub ancestors: Vec<BTreeMap<String, String>>,
}

impl FixtureTarget {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// The attribute on this element or its nearest ancestor carrying it.
    pub fn closest_attr(&self, name: &str) -> Option<&str> {
        self.attr(name).or_else(|| {
            self.ancestors
                .iter()
                .find_map(|attrs| attrs.get(name).map(String::as_str))
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Interaction {
    Click(FixtureTarget),
    Fill { target: FixtureTarget, value: String },
}

impl Interaction {
    pub fn target(&self) -> &FixtureTarget {
        match self {
            Interaction::Click(target) => target,
            Interaction::Fill { target, .. } => target,
        }
    }
}

struct FixtureState<S> {
    site: S,
    url: String,
    html: String,
    generation: u64,
    handles: HashMap<u64, (u64, usize)>,
    next_handle: u64,
    interactions: Vec<Interaction>,
}

impl<S: FixtureSite> FixtureState<S> {
    fn rerender(&mut self) {
        let html = self.site.render(&self.url);
        if html != self.html {
            self.html = html;
            self.generation += 1;
            self.handles.clear();
        }
    }

    fn allocate(&mut self, indices: Vec<usize>) -> Vec<ElementRef> {
        indices
            .into_iter()
            .map(|index| {
                let id = self.next_handle;
                self.next_handle += 1;
                self.handles.insert(id, (self.generation, index));
                ElementRef(id)
            })
            .collect()
    }

    fn resolve(&self, element: ElementRef) -> Result<usize, AdapterError> {
        match self.handles.get(&element.0) {
            Some((generation, index)) if *generation == self.generation => Ok(*index),
            _ => Err(AdapterError::new(AdapterErrorKind::StaleElement)
                .with_hint(format!("element handle {} is detached", element.0))
                .retriable(true)),
        }
    }
}

/// [`Page`] over a [`FixtureSite`].
pub struct FixturePage<S> {
    state: Mutex<FixtureState<S>>,
}

impl<S: FixtureSite> FixturePage<S> {
    pub fn new(site: S, url: impl Into<String>) -> Self {
        let url = url.into();
        let html = site.render(&url);
        Self {
            state: Mutex::new(FixtureState {
                site,
                url,
                html,
                generation: 0,
                handles: HashMap::new(),
                next_handle: 1,
                interactions: Vec::new(),
            }),
        }
    }

    /// Inspect or mutate the site; the page re-renders afterwards.
    pub fn with_site<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let mut state = self.state.lock();
        let out = f(&mut state.site);
        state.rerender();
        out
    }

    pub fn html(&self) -> String {
        self.state.lock().html.clone()
    }

    pub fn interactions(&self) -> Vec<Interaction> {
        self.state.lock().interactions.clone()
    }

    pub fn interaction_count(&self) -> usize {
        self.state.lock().interactions.len()
    }

    pub fn clear_interactions(&self) {
        self.state.lock().interactions.clear();
    }

    fn with_element<R>(
        &self,
        element: ElementRef,
        f: impl FnOnce(HtmlElement<'_>) -> R,
    ) -> Result<R, AdapterError> {
        let state = self.state.lock();
        let index = state.resolve(element)?;
        let document = Html::parse_document(&state.html);
        let node = element_at(&document, index)?;
        Ok(f(node))
    }

    fn interact(
        &self,
        element: ElementRef,
        apply: impl FnOnce(&mut S, &str, &FixtureTarget) -> (Option<String>, Interaction),
    ) -> Result<(), AdapterError> {
        let mut state = self.state.lock();
        let index = state.resolve(element)?;
        let target = {
            let document = Html::parse_document(&state.html);
            let node = element_at(&document, index)?;
            if !visible(node) {
                return Err(AdapterError::new(AdapterErrorKind::Internal)
                    .with_hint("element is not visible"));
            }
            describe(node)
        };
        if let Some(fault) = state.site.interaction_fault(&target) {
            return Err(fault);
        }
        let url = state.url.clone();
        let (navigate_to, record) = apply(&mut state.site, &url, &target);
        state.interactions.push(record);
        if let Some(next) = navigate_to {
            state.site.on_navigate(&next);
            state.url = next;
        }
        state.rerender();
        Ok(())
    }
}

fn parse_selector(selector: &str) -> Result<Selector, AdapterError> {
    Selector::parse(selector).map_err(|err| {
        AdapterError::new(AdapterErrorKind::InvalidSelector).with_hint(format!("{selector}: {err:?}"))
    })
}

fn all_elements(document: &Html) -> Vec<HtmlElement<'_>> {
    document
        .root_element()
        .descendants()
        .filter_map(HtmlElement::wrap)
        .collect()
}

fn element_at(document: &Html, index: usize) -> Result<HtmlElement<'_>, AdapterError> {
    all_elements(document).get(index).copied().ok_or_else(|| {
        AdapterError::new(AdapterErrorKind::StaleElement).with_hint("element index out of range")
    })
}

fn index_of(document: &Html, node: HtmlElement<'_>) -> Option<usize> {
    all_elements(document)
        .iter()
        .position(|candidate| candidate.id() == node.id())
}

fn attributes_of(node: HtmlElement<'_>) -> BTreeMap<String, String> {
    node.value()
        .attrs()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

fn text_of(node: HtmlElement<'_>) -> String {
    collapse_whitespace(&node.text().collect::<Vec<_>>().join(" "))
}

fn hidden(node: HtmlElement<'_>) -> bool {
    let element = node.value();
    if element.attr("hidden").is_some() {
        return true;
    }
    element
        .attr("style")
        .map(|style| style.replace(' ', "").contains("display:none"))
        .unwrap_or(false)
}

fn visible(node: HtmlElement<'_>) -> bool {
    !hidden(node) && !node.ancestors().filter_map(HtmlElement::wrap).any(hidden)
}

fn describe(node: HtmlElement<'_>) -> FixtureTarget {
    FixtureTarget {
        tag: node.value().name().to_string(),
        attributes: attributes_of(node),
        text: text_of(node),
        ancestors: node
            .ancestors()
            .filter_map(HtmlElement::wrap)
            .map(attributes_of)
            .collect(),
    }
}

#[async_trait]
impl<S: FixtureSite> Page for FixturePage<S> {
    async fn goto(&self, url: &str) -> Result<(), AdapterError> {
        let mut state = self.state.lock();
        state.site.on_navigate(url);
        state.url = url.to_string();
        state.html.clear();
        state.rerender();
        Ok(())
    }

    async fn current_url(&self) -> Result<String, AdapterError> {
        Ok(self.state.lock().url.clone())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementRef>, AdapterError> {
        let selector = parse_selector(selector)?;
        let mut state = self.state.lock();
        let indices = {
            let document = Html::parse_document(&state.html);
            document
                .select(&selector)
                .filter_map(|node| index_of(&document, node))
                .collect::<Vec<_>>()
        };
        Ok(state.allocate(indices))
    }

    async fn query_within(
        &self,
        scope: ElementRef,
        selector: &str,
    ) -> Result<Vec<ElementRef>, AdapterError> {
        let selector = parse_selector(selector)?;
        let mut state = self.state.lock();
        let scope_index = state.resolve(scope)?;
        let indices = {
            let document = Html::parse_document(&state.html);
            let scope = element_at(&document, scope_index)?;
            scope
                .select(&selector)
                .filter_map(|node| index_of(&document, node))
                .collect::<Vec<_>>()
        };
        Ok(state.allocate(indices))
    }

    async fn text(&self, element: ElementRef) -> Result<String, AdapterError> {
        self.with_element(element, text_of)
    }

    async fn attribute(
        &self,
        element: ElementRef,
        name: &str,
    ) -> Result<Option<String>, AdapterError> {
        self.with_element(element, |node| node.value().attr(name).map(str::to_string))
    }

    async fn is_visible(&self, element: ElementRef) -> Result<bool, AdapterError> {
        self.with_element(element, visible)
    }

    async fn click(&self, element: ElementRef) -> Result<(), AdapterError> {
        self.interact(element, |site, url, target| {
            let navigate = site.on_click(url, target);
            (navigate, Interaction::Click(target.clone()))
        })
    }

    async fn fill(&self, element: ElementRef, value: &str) -> Result<(), AdapterError> {
        self.interact(element, |site, url, target| {
            site.on_fill(url, target, value);
            (
                None,
                Interaction::Fill {
                    target: target.clone(),
                    value: value.to_string(),
                },
            )
        })
    }

    async fn body_text(&self) -> Result<String, AdapterError> {
        let state = self.state.lock();
        let document = Html::parse_document(&state.html);
        let body = parse_selector("body")?;
        let text = document
            .select(&body)
            .next()
            .map(text_of)
            .unwrap_or_else(|| text_of(document.root_element()));
        Ok(text)
    }

    async fn cookies(&self) -> Result<Vec<CookieInfo>, AdapterError> {
        Ok(self.state.lock().site.cookies())
    }

    async fn local_storage_keys(&self) -> Result<Vec<String>, AdapterError> {
        Ok(self.state.lock().site.local_storage_keys())
    }
}
