//! Strategy recipes
//!
//! A strategy is a pure description of one way to detect a condition, find an element
//! to act on, or read a value. Evaluating a strategy never mutates the page: it yields
//! a verdict, a [`Plan`] for the executor to carry out, or nothing.

use crate::{errors::LocatorError, types::Outcome};
use cdp_adapter::{CookieInfo, ElementRef, Page};
use tracing::debug;

/// Cookie names that indicate an authenticated session
const SESSION_COOKIE_HINTS: &[&str] = &["session", "auth", "token", "user", "jwt", "access", "login", "sid"];

/// Text predicate, always case-insensitive over whitespace-collapsed text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextMatch {
    Equals(String),
    Contains(String),
    /// Every needle must appear
    ContainsAll(Vec<String>),
    /// Any needle may appear
    ContainsAny(Vec<String>),
    /// Equal to the action parameter
    EqualsParam,
    /// Contains the action parameter
    ContainsParam,
}

impl TextMatch {
    pub fn contains(needle: &str) -> Self {
        TextMatch::Contains(needle.to_string())
    }

    pub fn equals(needle: &str) -> Self {
        TextMatch::Equals(needle.to_string())
    }

    /// Evaluate against `text`; `None` when a parameter is required but absent
    pub fn matches(&self, text: &str, param: Option<&str>) -> Option<bool> {
        let text = text.trim().to_lowercase();
        let hit = match self {
            TextMatch::Equals(needle) => text == needle.trim().to_lowercase(),
            TextMatch::Contains(needle) => text.contains(&needle.to_lowercase()),
            TextMatch::ContainsAll(needles) => needles
                .iter()
                .all(|needle| text.contains(&needle.to_lowercase())),
            TextMatch::ContainsAny(needles) => needles
                .iter()
                .any(|needle| text.contains(&needle.to_lowercase())),
            TextMatch::EqualsParam => text == param?.trim().to_lowercase(),
            TextMatch::ContainsParam => {
                let needle = param?.trim().to_lowercase();
                !needle.is_empty() && text.contains(&needle)
            }
        };
        Some(hit)
    }
}

/// How to find candidate elements
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finder {
    /// Visible elements matching a CSS selector
    Css(String),

    /// Visible elements matching a selector whose text satisfies a predicate
    CssWithText { selector: String, text: TextMatch },

    /// Visible elements whose attribute contains a needle (case-insensitive)
    AttrContains {
        selector: String,
        attr: String,
        needle: String,
    },

    /// Visible elements containing a descendant that matches, optionally by text
    HasDescendant {
        selector: String,
        descendant: String,
        text: Option<TextMatch>,
    },
}

impl Finder {
    pub fn css(selector: &str) -> Self {
        Finder::Css(selector.to_string())
    }

    pub fn with_text(selector: &str, text: TextMatch) -> Self {
        Finder::CssWithText {
            selector: selector.to_string(),
            text,
        }
    }

    pub fn attr_contains(selector: &str, attr: &str, needle: &str) -> Self {
        Finder::AttrContains {
            selector: selector.to_string(),
            attr: attr.to_string(),
            needle: needle.to_lowercase(),
        }
    }

    pub fn has_descendant(selector: &str, descendant: &str, text: Option<TextMatch>) -> Self {
        Finder::HasDescendant {
            selector: selector.to_string(),
            descendant: descendant.to_string(),
            text,
        }
    }

    fn selector(&self) -> &str {
        match self {
            Finder::Css(selector)
            | Finder::CssWithText { selector, .. }
            | Finder::AttrContains { selector, .. }
            | Finder::HasDescendant { selector, .. } => selector,
        }
    }

    async fn candidates(
        &self,
        page: &dyn Page,
        scope: Option<ElementRef>,
    ) -> Result<Vec<ElementRef>, LocatorError> {
        let found = match scope {
            Some(scope) => page.query_within(scope, self.selector()).await?,
            None => page.query_all(self.selector()).await?,
        };
        let mut visible = Vec::with_capacity(found.len());
        for element in found {
            if page.is_visible(element).await? {
                visible.push(element);
            }
        }
        Ok(visible)
    }

    /// All visible matches in document order, each paired with its text
    pub async fn find_all(
        &self,
        page: &dyn Page,
        scope: Option<ElementRef>,
        param: Option<&str>,
    ) -> Result<Vec<(ElementRef, String)>, LocatorError> {
        let mut matches = Vec::new();
        for element in self.candidates(page, scope).await? {
            let text = page.text(element).await?;
            let keep = match self {
                Finder::Css(_) => true,
                Finder::CssWithText { text: predicate, .. } => {
                    predicate.matches(&text, param).unwrap_or(false)
                }
                Finder::AttrContains { attr, needle, .. } => page
                    .attribute(element, attr)
                    .await?
                    .map(|value| value.to_lowercase().contains(needle.as_str()))
                    .unwrap_or(false),
                Finder::HasDescendant {
                    descendant,
                    text: predicate,
                    ..
                } => {
                    let mut hit = false;
                    for inner in page.query_within(element, descendant).await? {
                        let inner_hit = match predicate {
                            None => true,
                            Some(predicate) => {
                                let inner_text = page.text(inner).await?;
                                predicate.matches(&inner_text, param).unwrap_or(false)
                            }
                        };
                        if inner_hit {
                            hit = true;
                            break;
                        }
                    }
                    hit
                }
            };
            if keep {
                matches.push((element, text));
            }
        }
        Ok(matches)
    }

    /// The best single match: the first one, or for text predicates the tightest
    /// (shortest text) one so that wrappers lose to the control they contain
    pub async fn find_best(
        &self,
        page: &dyn Page,
        scope: Option<ElementRef>,
        param: Option<&str>,
    ) -> Result<Option<ElementRef>, LocatorError> {
        let matches = self.find_all(page, scope, param).await?;
        let best = match self {
            Finder::CssWithText { .. } => matches
                .iter()
                .min_by_key(|(_, text)| text.len())
                .map(|(element, _)| *element),
            _ => matches.first().map(|(element, _)| *element),
        };
        Ok(best)
    }
}

/// What a strategy does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipe {
    /// Report `on_hit` when the finder matches
    Detect { finder: Finder, on_hit: Outcome },

    /// Report `on_hit` when the page text contains any needle
    BodyText { needles: Vec<String>, on_hit: Outcome },

    /// Report `on_hit` when cookies carry a session for the site
    SessionCookie { on_hit: Outcome },

    /// Report `on_hit` when localStorage has a key containing any needle
    StorageKeys { needles: Vec<String>, on_hit: Outcome },

    /// Click the best match
    Click(Finder),

    /// Fill the best match with the action parameter
    Fill(Finder),

    /// Fill one single-character box per digit of the action parameter
    FillDigits { selector: String },

    /// Read the text of the first non-empty match
    Read(Finder),

    /// Enumerate every match
    Collect(Finder),
}

/// One ordered entry in an action's strategy list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strategy {
    pub name: &'static str,
    pub recipe: Recipe,
    /// Approximate matching, skipped under strict policies
    pub fuzzy: bool,
}

impl Strategy {
    pub fn new(name: &'static str, recipe: Recipe) -> Self {
        Self {
            name,
            recipe,
            fuzzy: false,
        }
    }

    pub fn fuzzy(mut self) -> Self {
        self.fuzzy = true;
        self
    }

    pub fn detect(name: &'static str, finder: Finder, on_hit: Outcome) -> Self {
        Self::new(name, Recipe::Detect { finder, on_hit })
    }

    pub fn click(name: &'static str, finder: Finder) -> Self {
        Self::new(name, Recipe::Click(finder))
    }

    pub fn fill(name: &'static str, finder: Finder) -> Self {
        Self::new(name, Recipe::Fill(finder))
    }

    pub fn read(name: &'static str, finder: Finder) -> Self {
        Self::new(name, Recipe::Read(finder))
    }

    pub fn collect(name: &'static str, finder: Finder) -> Self {
        Self::new(name, Recipe::Collect(finder))
    }

    /// Evaluate against the current page without mutating it
    pub async fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Located, LocatorError> {
        let page = ctx.page;
        match &self.recipe {
            Recipe::Detect { finder, on_hit } => {
                let hit = finder.find_best(page, ctx.scope, ctx.param).await?;
                Ok(hit.map_or(Located::Nothing, |_| Located::Verdict(*on_hit)))
            }
            Recipe::BodyText { needles, on_hit } => {
                let body = page.body_text().await?.to_lowercase();
                let hit = needles
                    .iter()
                    .any(|needle| body.contains(&needle.to_lowercase()));
                Ok(if hit {
                    Located::Verdict(*on_hit)
                } else {
                    Located::Nothing
                })
            }
            Recipe::SessionCookie { on_hit } => {
                let cookies = page.cookies().await?;
                Ok(if has_session_cookie(&cookies, ctx.session_domain) {
                    Located::Verdict(*on_hit)
                } else {
                    Located::Nothing
                })
            }
            Recipe::StorageKeys { needles, on_hit } => {
                let keys = page.local_storage_keys().await?;
                let hit = keys.iter().any(|key| {
                    let key = key.to_lowercase();
                    needles.iter().any(|needle| key.contains(needle.as_str()))
                });
                Ok(if hit {
                    Located::Verdict(*on_hit)
                } else {
                    Located::Nothing
                })
            }
            Recipe::Click(finder) => {
                let target = finder.find_best(page, ctx.scope, ctx.param).await?;
                Ok(target.map_or(Located::Nothing, |element| {
                    Located::Plan(Plan::Click(element))
                }))
            }
            Recipe::Fill(finder) => {
                let value = ctx.require_param(self.name)?;
                let target = finder.find_best(page, ctx.scope, ctx.param).await?;
                Ok(target.map_or(Located::Nothing, |element| {
                    Located::Plan(Plan::Fill(element, value.to_string()))
                }))
            }
            Recipe::FillDigits { selector } => {
                let value = ctx.require_param(self.name)?;
                let boxes = Finder::Css(selector.clone())
                    .find_all(page, ctx.scope, None)
                    .await?;
                let digits: Vec<char> = value.chars().collect();
                if digits.is_empty() || boxes.len() < digits.len() {
                    debug!(
                        strategy = self.name,
                        boxes = boxes.len(),
                        digits = digits.len(),
                        "not enough digit boxes"
                    );
                    return Ok(Located::Nothing);
                }
                let fills = boxes
                    .into_iter()
                    .zip(digits)
                    .map(|((element, _), digit)| (element, digit.to_string()))
                    .collect();
                Ok(Located::Plan(Plan::FillEach(fills)))
            }
            Recipe::Read(finder) => {
                for (_, text) in finder.find_all(page, ctx.scope, ctx.param).await? {
                    if !text.trim().is_empty() {
                        return Ok(Located::Text(text));
                    }
                }
                Ok(Located::Nothing)
            }
            Recipe::Collect(finder) => {
                let elements: Vec<ElementRef> = finder
                    .find_all(page, ctx.scope, ctx.param)
                    .await?
                    .into_iter()
                    .map(|(element, _)| element)
                    .collect();
                Ok(if elements.is_empty() {
                    Located::Nothing
                } else {
                    Located::Elements(elements)
                })
            }
        }
    }
}

/// Inputs a strategy is evaluated against
pub struct EvalContext<'a> {
    pub page: &'a dyn Page,
    pub scope: Option<ElementRef>,
    pub param: Option<&'a str>,
    pub session_domain: Option<&'a str>,
}

impl<'a> EvalContext<'a> {
    fn require_param(&self, strategy: &'static str) -> Result<&'a str, LocatorError> {
        self.param.ok_or_else(|| {
            LocatorError::InvalidAction(format!("strategy '{strategy}' needs a value to enter"))
        })
    }
}

/// Result of evaluating one strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located {
    Verdict(Outcome),
    Plan(Plan),
    Text(String),
    Elements(Vec<ElementRef>),
    Nothing,
}

/// The single state-mutating interaction an executor may issue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    Click(ElementRef),
    Fill(ElementRef, String),
    /// One logical entry spread over several boxes
    FillEach(Vec<(ElementRef, String)>),
}

fn has_session_cookie(cookies: &[CookieInfo], session_domain: Option<&str>) -> bool {
    cookies.iter().filter(|cookie| !cookie.value.is_empty()).any(|cookie| {
        let for_site = session_domain
            .map(|domain| cookie.domain.to_lowercase().contains(&domain.to_lowercase()))
            .unwrap_or(false);
        let name = cookie.name.to_lowercase();
        for_site || SESSION_COOKIE_HINTS.iter().any(|hint| name.contains(hint))
    })
}
