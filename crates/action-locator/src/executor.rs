//! Resilient action executor with fallback chain orchestration

use crate::catalog::StrategySet;
use crate::errors::LocatorError;
use crate::strategies::{EvalContext, Located, Plan, Strategy};
use crate::types::{AddressMatchPolicy, Collection, Outcome, Probe, SemanticAction};
use cdp_adapter::{ElementRef, Page};
use tracing::{debug, info, warn};

/// Executes semantic actions by walking their strategy lists in priority order
///
/// Guarantees at most one state-mutating interaction per `perform` call: once a
/// strategy yields a plan, the executor carries it out and returns, whatever the result.
#[derive(Debug, Clone)]
pub struct ActionExecutor {
    strategies: StrategySet,
    address_policy: AddressMatchPolicy,
    session_domain: Option<String>,
}

impl Default for ActionExecutor {
    fn default() -> Self {
        Self::new(StrategySet::standard())
    }
}

impl ActionExecutor {
    /// Create an executor over a strategy set
    pub fn new(strategies: StrategySet) -> Self {
        Self {
            strategies,
            address_policy: AddressMatchPolicy::default(),
            session_domain: None,
        }
    }

    /// Set the address label matching policy
    pub fn with_address_policy(mut self, policy: AddressMatchPolicy) -> Self {
        self.address_policy = policy;
        self
    }

    /// Domain whose cookies indicate an authenticated session
    pub fn with_session_domain(mut self, domain: impl Into<String>) -> Self {
        let domain = domain.into();
        self.session_domain = (!domain.trim().is_empty()).then_some(domain);
        self
    }

    pub fn strategies(&self) -> &StrategySet {
        &self.strategies
    }

    /// Perform an action against the whole page
    pub async fn perform(
        &self,
        action: &SemanticAction,
        page: &dyn Page,
    ) -> Result<Outcome, LocatorError> {
        self.run(action, page, None).await
    }

    /// Perform an action inside one element (e.g. a single cart line entry)
    pub async fn perform_scoped(
        &self,
        action: &SemanticAction,
        scope: ElementRef,
        page: &dyn Page,
    ) -> Result<Outcome, LocatorError> {
        self.run(action, page, Some(scope)).await
    }

    fn permitted(&self, strategy: &Strategy) -> bool {
        !(strategy.fuzzy && self.address_policy == AddressMatchPolicy::ExactOnly)
    }

    async fn run(
        &self,
        action: &SemanticAction,
        page: &dyn Page,
        scope: Option<ElementRef>,
    ) -> Result<Outcome, LocatorError> {
        let name = action.name();
        let ctx = EvalContext {
            page,
            scope,
            param: action.param(),
            session_domain: self.session_domain.as_deref(),
        };

        let mut tried = 0usize;
        for strategy in self
            .strategies
            .action(action.key())
            .iter()
            .filter(|strategy| self.permitted(strategy))
        {
            tried += 1;
            debug!(action = name, strategy = strategy.name, "trying strategy");

            match strategy.evaluate(&ctx).await {
                Ok(Located::Verdict(outcome)) if outcome.is_definitive() => {
                    debug!(action = name, strategy = strategy.name, ?outcome, "strategy decided");
                    return Ok(outcome);
                }
                Ok(Located::Plan(plan)) if !action.is_detection() => {
                    return match execute(page, plan).await {
                        Ok(()) => {
                            info!(action = name, strategy = strategy.name, "action performed");
                            Ok(Outcome::Matched)
                        }
                        Err(err) => {
                            warn!(action = name, strategy = strategy.name, %err, "interaction failed");
                            Err(LocatorError::InteractionFailed {
                                action: name,
                                strategy: strategy.name,
                                reason: err.to_string(),
                                retriable: err.retriable,
                            })
                        }
                    };
                }
                Ok(Located::Plan(_)) => {
                    warn!(action = name, strategy = strategy.name, "interaction recipe in a detection list; skipped");
                }
                Ok(_) => {
                    debug!(action = name, strategy = strategy.name, "strategy found nothing");
                }
                Err(err @ LocatorError::InvalidAction(_)) => return Err(err),
                Err(err) => {
                    warn!(action = name, strategy = strategy.name, %err, "strategy failed");
                }
            }
        }

        if action.is_detection() {
            let outcome = action.fail_safe();
            debug!(action = name, tried, ?outcome, "no strategy decided; using fail-safe");
            return Ok(outcome);
        }

        warn!(action = name, tried, "all strategies exhausted");
        Err(LocatorError::StrategiesExhausted { action: name, tried })
    }

    /// Read a value; `None` when no strategy finds non-empty text
    pub async fn read(&self, probe: Probe, page: &dyn Page) -> Result<Option<String>, LocatorError> {
        self.read_in(probe, page, None).await
    }

    pub async fn read_scoped(
        &self,
        probe: Probe,
        scope: ElementRef,
        page: &dyn Page,
    ) -> Result<Option<String>, LocatorError> {
        self.read_in(probe, page, Some(scope)).await
    }

    async fn read_in(
        &self,
        probe: Probe,
        page: &dyn Page,
        scope: Option<ElementRef>,
    ) -> Result<Option<String>, LocatorError> {
        let ctx = EvalContext {
            page,
            scope,
            param: None,
            session_domain: None,
        };
        for strategy in self.strategies.probe(probe) {
            match strategy.evaluate(&ctx).await {
                Ok(Located::Text(text)) => {
                    debug!(?probe, strategy = strategy.name, %text, "probe read");
                    return Ok(Some(text));
                }
                Ok(_) => {}
                Err(err) => warn!(?probe, strategy = strategy.name, %err, "probe strategy failed"),
            }
        }
        Ok(None)
    }

    /// Enumerate elements; empty when no strategy finds any
    pub async fn enumerate(
        &self,
        collection: Collection,
        page: &dyn Page,
    ) -> Result<Vec<ElementRef>, LocatorError> {
        let ctx = EvalContext {
            page,
            scope: None,
            param: None,
            session_domain: None,
        };
        for strategy in self.strategies.collection(collection) {
            match strategy.evaluate(&ctx).await {
                Ok(Located::Elements(elements)) => {
                    debug!(?collection, strategy = strategy.name, count = elements.len(), "enumerated");
                    return Ok(elements);
                }
                Ok(_) => {}
                Err(err) => warn!(?collection, strategy = strategy.name, %err, "collection strategy failed"),
            }
        }
        Ok(Vec::new())
    }
}

async fn execute(page: &dyn Page, plan: Plan) -> Result<(), cdp_adapter::AdapterError> {
    match plan {
        Plan::Click(element) => page.click(element).await,
        Plan::Fill(element, value) => page.fill(element, &value).await,
        Plan::FillEach(fills) => {
            for (element, value) in fills {
                page.fill(element, &value).await?;
            }
            Ok(())
        }
    }
}
